//! Shared fixtures for integration tests.
#![allow(dead_code)]

use std::sync::Arc;

use chrono::Utc;
use credit_risk_api::artifact::{TrainedArtifact, TrainingMetrics, ARTIFACT_FORMAT_VERSION};
use credit_risk_api::dataset::ClientDataset;
use credit_risk_api::features::{default_feature_list, CategoryLevels};
use credit_risk_api::handlers::AppState;
use credit_risk_api::models::{RawRow, RawValue};
use credit_risk_api::predictor::Predictor;
use credit_risk_api::scoring::{LogisticRegression, StandardScaler};
use credit_risk_api::stats::DatasetStatistics;

fn text(value: &str) -> RawValue {
    RawValue::Text(value.to_string())
}

/// Client 100002 from the public application_train.csv, reduced to the
/// columns the pipeline reads.
pub fn client_100002() -> RawRow {
    RawRow::new()
        .with("SK_ID_CURR", RawValue::Number(100002.0))
        .with("TARGET", RawValue::Number(1.0))
        .with("AMT_INCOME_TOTAL", RawValue::Number(202500.0))
        .with("AMT_CREDIT", RawValue::Number(406597.5))
        .with("AMT_ANNUITY", RawValue::Number(24700.5))
        .with("DAYS_EMPLOYED", RawValue::Number(-637.0))
        .with("DAYS_BIRTH", RawValue::Number(-9461.0))
        .with("CODE_GENDER", text("M"))
        .with("EMERGENCYSTATE_MODE", text("No"))
        .with("FLAG_OWN_CAR", text("N"))
        .with("FLAG_OWN_REALTY", text("Y"))
        .with("NAME_CONTRACT_TYPE", text("Cash loans"))
        .with("NAME_EDUCATION_TYPE", text("Secondary / secondary special"))
        .with("OCCUPATION_TYPE", text("Laborers"))
        .with("ORGANIZATION_TYPE", text("Business Entity Type 3"))
}

/// A test-file client (no TARGET) with a few nulls.
pub fn client_100001() -> RawRow {
    RawRow::new()
        .with("SK_ID_CURR", RawValue::Number(100001.0))
        .with("AMT_INCOME_TOTAL", RawValue::Number(135000.0))
        .with("AMT_CREDIT", RawValue::Number(568800.0))
        .with("AMT_ANNUITY", RawValue::Number(20560.5))
        .with("DAYS_EMPLOYED", RawValue::Number(-2329.0))
        .with("DAYS_BIRTH", RawValue::Number(-19241.0))
        .with("CODE_GENDER", text("F"))
        .with("EMERGENCYSTATE_MODE", RawValue::Null)
        .with("FLAG_OWN_CAR", text("N"))
        .with("FLAG_OWN_REALTY", text("Y"))
        .with("NAME_CONTRACT_TYPE", text("Cash loans"))
        .with("NAME_EDUCATION_TYPE", text("Higher education"))
        .with("OCCUPATION_TYPE", RawValue::Null)
        .with("ORGANIZATION_TYPE", text("Kindergarten"))
}

pub fn category_levels() -> CategoryLevels {
    let levels: [(&str, &[&str]); 8] = [
        ("CODE_GENDER", &["F", "M", "XNA"]),
        ("EMERGENCYSTATE_MODE", &["No", "Yes"]),
        ("FLAG_OWN_CAR", &["N", "Y"]),
        ("FLAG_OWN_REALTY", &["N", "Y"]),
        ("NAME_CONTRACT_TYPE", &["Cash loans", "Revolving loans"]),
        (
            "NAME_EDUCATION_TYPE",
            &[
                "Academic degree",
                "Higher education",
                "Secondary / secondary special",
            ],
        ),
        ("OCCUPATION_TYPE", &["Accountants", "Laborers"]),
        (
            "ORGANIZATION_TYPE",
            &["Advertising", "Business Entity Type 3", "Kindergarten"],
        ),
    ];
    levels
        .iter()
        .map(|(col, values)| {
            (
                col.to_string(),
                values.iter().map(|v| v.to_string()).collect(),
            )
        })
        .collect()
}

/// Hand-built artifact over the default 13-feature list.
pub fn artifact() -> TrainedArtifact {
    TrainedArtifact {
        format_version: ARTIFACT_FORMAT_VERSION,
        trained_at: Utc::now(),
        feature_list: default_feature_list(),
        category_levels: category_levels(),
        scaler: StandardScaler {
            mean: vec![
                0.18, 0.34, 0.0, 3.96, 21.6, 0.16, 0.01, 0.34, 0.69, 0.0, 0.71, 0.18, 0.22,
            ],
            scale: vec![
                0.09, 0.47, 1.0, 2.69, 7.8, 0.13, 0.1, 0.47, 0.46, 1.0, 0.45, 0.38, 0.41,
            ],
        },
        classifier: LogisticRegression {
            weights: vec![
                0.05, 0.17, 0.0, -0.04, 0.12, -0.21, 0.01, -0.08, 0.0, 0.0, 0.14, 0.1, 0.03,
            ],
            bias: -2.5,
        },
        metrics: TrainingMetrics {
            roc_auc: Some(0.62),
            train_rows: 246_008,
            validation_rows: 61_503,
        },
    }
}

pub fn predictor() -> Predictor {
    Predictor::new(Arc::new(artifact()))
}

pub fn dataset() -> ClientDataset {
    ClientDataset::from_parts(vec![client_100002()], vec![client_100001()])
}

pub fn app_state() -> Arc<AppState> {
    let dataset = dataset();
    let stats = DatasetStatistics::compute(dataset.train_rows());
    Arc::new(AppState {
        dataset,
        predictor: predictor(),
        stats,
    })
}

/// Deterministic synthetic training rows with both classes in every split.
pub fn synthetic_training_rows(n: usize) -> Vec<RawRow> {
    let genders = ["F", "M", "F", "XNA"];
    let contracts = ["Cash loans", "Revolving loans"];
    (0..n)
        .map(|i| {
            let income = 100_000.0 + (i % 7) as f64 * 25_000.0;
            let credit = 200_000.0 + (i % 11) as f64 * 50_000.0;
            let annuity = credit / (10 + i % 13) as f64;
            let target = if (i * 7) % 10 < 3 { 1.0 } else { 0.0 };
            RawRow::new()
                .with("SK_ID_CURR", RawValue::Number(100_000.0 + i as f64))
                .with("TARGET", RawValue::Number(target))
                .with("AMT_INCOME_TOTAL", RawValue::Number(income))
                .with("AMT_CREDIT", RawValue::Number(credit))
                .with(
                    "AMT_ANNUITY",
                    if i % 17 == 0 {
                        RawValue::Null
                    } else {
                        RawValue::Number(annuity)
                    },
                )
                .with("DAYS_EMPLOYED", RawValue::Number(-((100 + i * 13 % 4000) as f64)))
                .with("DAYS_BIRTH", RawValue::Number(-((8000 + i * 37 % 15000) as f64)))
                .with("CODE_GENDER", text(genders[i % genders.len()]))
                .with("EMERGENCYSTATE_MODE", text(if i % 9 == 0 { "Yes" } else { "No" }))
                .with("FLAG_OWN_CAR", text(if i % 2 == 0 { "Y" } else { "N" }))
                .with("FLAG_OWN_REALTY", text(if i % 3 == 0 { "N" } else { "Y" }))
                .with("NAME_CONTRACT_TYPE", text(contracts[i % 2]))
                .with(
                    "NAME_EDUCATION_TYPE",
                    text(if i % 4 == 0 {
                        "Higher education"
                    } else {
                        "Secondary / secondary special"
                    }),
                )
                .with(
                    "OCCUPATION_TYPE",
                    if i % 6 == 0 {
                        RawValue::Null
                    } else {
                        text(if i % 5 == 1 { "Accountants" } else { "Laborers" })
                    },
                )
                .with(
                    "ORGANIZATION_TYPE",
                    text(if i % 8 == 0 {
                        "Advertising"
                    } else {
                        "Business Entity Type 3"
                    }),
                )
        })
        .collect()
}
