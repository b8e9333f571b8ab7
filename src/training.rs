//! Model training over the labelled application file.
//!
//! Training reuses the serving feature code (`derive_features`, `align`,
//! `FeatureBatch::impute`) so both sides build identical vectors. The fitted
//! feature list and category levels are stored in the artifact.

use std::collections::BTreeSet;

use chrono::Utc;

use crate::artifact::{TrainedArtifact, TrainingMetrics, ARTIFACT_FORMAT_VERSION};
use crate::errors::AppError;
use crate::features::{align, collect_category_levels, derive_features};
use crate::imputer::FeatureBatch;
use crate::models::RawRow;
use crate::scoring::{sigmoid, BinaryClassifier, LogisticRegression, StandardScaler};

/// Hyperparameters for the logistic regression fit.
#[derive(Debug, Clone)]
pub struct TrainingOptions {
    pub feature_list: Vec<String>,
    pub max_iter: usize,
    pub learning_rate: f64,
    /// Inverse L2 regularisation strength.
    pub c: f64,
    /// Rows with `SK_ID_CURR % validation_modulus == 0` are held out.
    pub validation_modulus: i64,
}

impl Default for TrainingOptions {
    fn default() -> Self {
        Self {
            feature_list: crate::features::default_feature_list(),
            max_iter: 200,
            learning_rate: 0.5,
            c: 1.0,
            validation_modulus: 5,
        }
    }
}

/// Fits scaler and classifier on `rows` and returns the frozen artifact.
pub fn train(rows: &[RawRow], options: &TrainingOptions) -> Result<TrainedArtifact, AppError> {
    if rows.is_empty() {
        return Err(AppError::DatasetError("training dataset is empty".to_string()));
    }
    if options.feature_list.is_empty() {
        return Err(AppError::BadRequest("feature list is empty".to_string()));
    }

    let feature_list = &options.feature_list;
    let category_levels = collect_category_levels(rows);
    let no_pins = BTreeSet::new();

    let mut batch = FeatureBatch::new(feature_list.clone());
    let mut labels = Vec::new();
    let mut holdout = Vec::new();

    for (position, row) in rows.iter().enumerate() {
        let Some(label) = row.target() else {
            continue;
        };
        let derived = derive_features(row, &category_levels, feature_list, &no_pins)
            .map_err(|e| AppError::DatasetError(format!("training row {}: {}", position, e)))?;
        let mut vector = align(&derived, feature_list);
        for value in vector.values.iter_mut() {
            if value.is_infinite() {
                *value = f64::NAN;
            }
        }

        let id = row.client_id().unwrap_or(position as i64);
        holdout.push(options.validation_modulus > 0 && id % options.validation_modulus == 0);
        batch.push(vector.values);
        labels.push(label);
    }

    if batch.is_empty() {
        return Err(AppError::DatasetError(
            "training dataset has no labelled rows".to_string(),
        ));
    }
    tracing::info!("Prepared {} labelled rows for training", batch.len());

    batch.impute();
    let still_missing = batch.missing_columns();
    if !still_missing.is_empty() {
        tracing::warn!(
            "Columns with no observed values, filled with 0: {:?}",
            still_missing
        );
        for row in batch.rows.iter_mut() {
            for value in row.iter_mut().filter(|v| v.is_nan()) {
                *value = 0.0;
            }
        }
    }

    let scaler = StandardScaler::fit(&batch.rows, feature_list.len());
    let scaled: Vec<Vec<f64>> = batch
        .rows
        .iter()
        .map(|row| {
            scaler
                .transform(row)
                .map_err(|e| AppError::InternalError(e.to_string()))
        })
        .collect::<Result<_, _>>()?;

    let (mut train_x, mut train_y, mut val_x, mut val_y) = (vec![], vec![], vec![], vec![]);
    for ((x, y), is_holdout) in scaled.into_iter().zip(labels).zip(holdout) {
        if is_holdout {
            val_x.push(x);
            val_y.push(y);
        } else {
            train_x.push(x);
            train_y.push(y);
        }
    }

    let positives = train_y.iter().filter(|&&y| y == 1).count();
    if positives == 0 || positives == train_y.len() {
        return Err(AppError::DatasetError(
            "training split contains a single class".to_string(),
        ));
    }

    let classifier = fit_logistic_regression(&train_x, &train_y, options);

    let val_scores: Vec<f64> = val_x
        .iter()
        .filter_map(|x| classifier.predict_proba(x).ok().map(|[_, p1]| p1))
        .collect();
    let roc_auc = roc_auc(&val_scores, &val_y);
    match roc_auc {
        Some(auc) => tracing::info!("Model ROC-AUC Score: {:.4}", auc),
        None => tracing::warn!("Validation split has a single class, ROC-AUC undefined"),
    }

    Ok(TrainedArtifact {
        format_version: ARTIFACT_FORMAT_VERSION,
        trained_at: Utc::now(),
        feature_list: feature_list.clone(),
        category_levels,
        scaler,
        classifier,
        metrics: TrainingMetrics {
            roc_auc,
            train_rows: train_x.len(),
            validation_rows: val_x.len(),
        },
    })
}

/// Full-batch gradient descent on L2-regularised log loss.
pub fn fit_logistic_regression(
    x: &[Vec<f64>],
    y: &[u8],
    options: &TrainingOptions,
) -> LogisticRegression {
    let width = x.first().map_or(0, Vec::len);
    let n = x.len().max(1) as f64;
    let penalty = 1.0 / (options.c * n);
    let mut weights = vec![0.0; width];
    let mut bias = 0.0;

    for iter in 0..options.max_iter {
        let mut grad_w = vec![0.0; width];
        let mut grad_b = 0.0;
        let mut loss = 0.0;

        for (row, &label) in x.iter().zip(y) {
            let z = bias + weights.iter().zip(row).map(|(w, v)| w * v).sum::<f64>();
            let p = sigmoid(z);
            let err = p - label as f64;
            for (g, v) in grad_w.iter_mut().zip(row) {
                *g += err * v / n;
            }
            grad_b += err / n;
            let log_likelihood = if label == 1 {
                p.max(1e-15).ln()
            } else {
                (1.0 - p).max(1e-15).ln()
            };
            loss -= log_likelihood / n;
        }

        for (w, g) in weights.iter_mut().zip(&grad_w) {
            *w -= options.learning_rate * (g + penalty * *w);
        }
        bias -= options.learning_rate * grad_b;

        if iter % 50 == 0 {
            tracing::debug!("iteration {}: log loss {:.6}", iter, loss);
        }
    }

    LogisticRegression { weights, bias }
}

/// Area under the ROC curve via the rank statistic; ties share their average rank.
pub fn roc_auc(scores: &[f64], labels: &[u8]) -> Option<f64> {
    let positives = labels.iter().filter(|&&l| l == 1).count();
    let negatives = labels.len() - positives;
    if positives == 0 || negatives == 0 || scores.len() != labels.len() {
        return None;
    }

    let mut order: Vec<usize> = (0..scores.len()).collect();
    order.sort_by(|&a, &b| scores[a].total_cmp(&scores[b]));

    let mut ranks = vec![0.0; scores.len()];
    let mut i = 0;
    while i < order.len() {
        let mut j = i;
        while j + 1 < order.len() && scores[order[j + 1]] == scores[order[i]] {
            j += 1;
        }
        let average = (i + j) as f64 / 2.0 + 1.0;
        for &idx in &order[i..=j] {
            ranks[idx] = average;
        }
        i = j + 1;
    }

    let positive_rank_sum: f64 = ranks
        .iter()
        .zip(labels)
        .filter(|(_, &l)| l == 1)
        .map(|(r, _)| r)
        .sum();
    let p = positives as f64;
    Some((positive_rank_sum - p * (p + 1.0) / 2.0) / (p * negatives as f64))
}
