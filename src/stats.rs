use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::models::{RawRow, RawValue};

pub const LOAN_AMOUNT_BINS: usize = 30;
pub const INCOME_BINS: usize = 50;

/// One equal-width histogram bucket, `[start, end)` (the last bucket is closed).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistogramBin {
    pub start: f64,
    pub end: f64,
    pub count: usize,
}

/// Share of each outcome among labelled training rows.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DefaultRate {
    pub no_default: f64,
    pub default: f64,
    pub labelled_rows: usize,
}

/// Overall statistics shown by the dashboard.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatasetStatistics {
    pub total_rows: usize,
    pub loan_amount_distribution: Vec<HistogramBin>,
    pub default_rate: DefaultRate,
    pub gender_distribution: BTreeMap<String, usize>,
    pub income_distribution: Vec<HistogramBin>,
}

impl DatasetStatistics {
    /// Computes all dashboard aggregates over the training rows.
    pub fn compute(rows: &[RawRow]) -> Self {
        let stats = Self {
            total_rows: rows.len(),
            loan_amount_distribution: histogram(
                &numeric_column(rows, "AMT_CREDIT"),
                LOAN_AMOUNT_BINS,
            ),
            default_rate: default_rate(rows),
            gender_distribution: value_counts(rows, "CODE_GENDER"),
            income_distribution: histogram(
                &numeric_column(rows, "AMT_INCOME_TOTAL"),
                INCOME_BINS,
            ),
        };
        tracing::info!(
            "Dataset statistics computed over {} rows (default rate {:.4})",
            stats.total_rows,
            stats.default_rate.default
        );
        stats
    }
}

fn numeric_column(rows: &[RawRow], column: &str) -> Vec<f64> {
    rows.iter()
        .filter_map(|row| match row.get(column) {
            Some(RawValue::Number(v)) if v.is_finite() => Some(*v),
            _ => None,
        })
        .collect()
}

/// Equal-width histogram over the observed range.
pub fn histogram(values: &[f64], bins: usize) -> Vec<HistogramBin> {
    if values.is_empty() || bins == 0 {
        return Vec::new();
    }

    let min = values.iter().copied().fold(f64::INFINITY, f64::min);
    let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    if min == max {
        return vec![HistogramBin {
            start: min,
            end: max,
            count: values.len(),
        }];
    }

    let width = (max - min) / bins as f64;
    let mut counts = vec![0usize; bins];
    for v in values {
        let idx = (((v - min) / width) as usize).min(bins - 1);
        counts[idx] += 1;
    }

    counts
        .into_iter()
        .enumerate()
        .map(|(i, count)| HistogramBin {
            start: min + width * i as f64,
            end: if i + 1 == bins {
                max
            } else {
                min + width * (i + 1) as f64
            },
            count,
        })
        .collect()
}

fn default_rate(rows: &[RawRow]) -> DefaultRate {
    let labels: Vec<u8> = rows.iter().filter_map(RawRow::target).collect();
    let defaults = labels.iter().filter(|&&l| l == 1).count();
    let n = labels.len();
    if n == 0 {
        return DefaultRate {
            no_default: 0.0,
            default: 0.0,
            labelled_rows: 0,
        };
    }
    DefaultRate {
        no_default: (n - defaults) as f64 / n as f64,
        default: defaults as f64 / n as f64,
        labelled_rows: n,
    }
}

fn value_counts(rows: &[RawRow], column: &str) -> BTreeMap<String, usize> {
    let mut counts = BTreeMap::new();
    for category in rows
        .iter()
        .filter_map(|row| row.get(column).and_then(RawValue::as_category))
    {
        *counts.entry(category).or_insert(0) += 1;
    }
    counts
}
