/// Property-based tests using proptest
/// Tests invariants of the feature contract, the imputer and the retry loop
mod common;

use std::collections::BTreeSet;

use credit_risk_api::features::{align, default_feature_list, derive_features, DerivedRow};
use credit_risk_api::imputer::FeatureBatch;
use credit_risk_api::models::RawValue;
use credit_risk_api::predictor::PredictionOutcome;
use proptest::prelude::*;

fn amount() -> impl Strategy<Value = f64> {
    prop_oneof![Just(0.0), 1.0f64..5_000_000.0, -30_000.0f64..0.0]
}

fn maybe_missing() -> impl Strategy<Value = f64> {
    prop_oneof![3 => -1e6f64..1e6, 1 => Just(f64::NAN)]
}

// Property: derived + aligned vectors always follow the model feature list
proptest! {
    #[test]
    fn aligned_vector_matches_feature_list(
        income in amount(),
        credit in amount(),
        annuity in amount(),
        employed in amount(),
        birth in amount(),
        gender in prop::sample::select(vec!["F", "M", "XNA", "Unknown"]),
    ) {
        let row = common::client_100002()
            .with("AMT_INCOME_TOTAL", RawValue::Number(income))
            .with("AMT_CREDIT", RawValue::Number(credit))
            .with("AMT_ANNUITY", RawValue::Number(annuity))
            .with("DAYS_EMPLOYED", RawValue::Number(employed))
            .with("DAYS_BIRTH", RawValue::Number(birth))
            .with("CODE_GENDER", RawValue::Text(gender.to_string()));
        let list = default_feature_list();

        let derived = derive_features(&row, &common::category_levels(), &list, &BTreeSet::new())
            .expect("all raw columns present");
        let vector = align(&derived, &list);

        prop_assert_eq!(vector.len(), list.len());
        prop_assert_eq!(&vector.names, &list);
    }

    #[test]
    fn align_is_idempotent(
        values in prop::collection::vec(-1e6f64..1e6, 13),
        extra in -1e6f64..1e6,
    ) {
        let list = default_feature_list();
        let mut derived: DerivedRow = list.iter().cloned().zip(values).collect();
        derived.insert("UNRELATED".to_string(), extra);
        derived.remove(&list[3]);

        let once = align(&derived, &list);
        let twice = align(&once.to_row(), &list);
        prop_assert_eq!(once, twice);
    }
}

// Property: imputation leaves nothing missing when every column has a value
proptest! {
    #[test]
    fn impute_fills_every_gap(
        (width, rows) in (1usize..6).prop_flat_map(|w| {
            (Just(w), prop::collection::vec(prop::collection::vec(maybe_missing(), w), 1..12))
        }),
        anchor in prop::collection::vec(-1e6f64..1e6, 6),
    ) {
        let mut batch = FeatureBatch::new((0..width).map(|i| format!("f{}", i)).collect());
        for row in rows {
            batch.push(row);
        }
        // Guarantee at least one observed value per column
        batch.push(anchor[..width].to_vec());

        batch.impute();
        prop_assert_eq!(batch.missing_count(), 0);
    }

    #[test]
    fn impute_never_changes_observed_values(
        rows in prop::collection::vec(prop::collection::vec(maybe_missing(), 3), 1..10),
    ) {
        let mut batch = FeatureBatch::new(vec!["a".into(), "b".into(), "c".into()]);
        for row in rows.iter().cloned() {
            batch.push(row);
        }
        batch.impute();

        for (before, after) in rows.iter().zip(&batch.rows) {
            for (b, a) in before.iter().zip(after) {
                if !b.is_nan() {
                    prop_assert_eq!(b, a);
                }
            }
        }
    }
}

// Property: with a well-shaped artifact every retry ends in success by attempt 2
proptest! {
    #[test]
    fn retry_loop_heals_within_one_retry(
        drop_annuity in proptest::bool::ANY,
        drop_gender in proptest::bool::ANY,
        null_birth in proptest::bool::ANY,
        zero_income in proptest::bool::ANY,
        drop_car in proptest::bool::ANY,
    ) {
        let mut row = common::client_100002();
        if drop_annuity {
            row = row.without("AMT_ANNUITY");
        }
        if drop_gender {
            row = row.without("CODE_GENDER");
        }
        if null_birth {
            row = row.with("DAYS_BIRTH", RawValue::Null);
        }
        if zero_income {
            row = row.with("AMT_INCOME_TOTAL", RawValue::Number(0.0));
        }
        if drop_car {
            row = row.without("FLAG_OWN_CAR");
        }

        let outcome = common::predictor().predict(&row);
        prop_assert!(outcome.attempts() >= 1);
        prop_assert!(outcome.attempts() <= 2);
        prop_assert!(
            matches!(outcome, PredictionOutcome::Succeeded { .. }),
            "expected success, got {:?}",
            outcome
        );
    }
}
