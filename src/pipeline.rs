//! One pass of the scoring pipeline and its typed failures.
//!
//! Derive → align → impute → scale/classify. Every stage returns either its
//! output or a [`PipelineError`] naming what went wrong, so the retry loop in
//! [`crate::predictor`] can decide which features to pin without catching
//! anything generic.

use std::collections::BTreeSet;
use std::fmt;

use crate::artifact::TrainedArtifact;
use crate::features::{align, derive_features};
use crate::imputer::FeatureBatch;
use crate::models::{PredictionResult, RawRow};

/// Reason a pipeline attempt failed.
#[derive(Debug, Clone, PartialEq)]
pub enum PipelineError {
    /// Raw columns needed by the deriver are absent from the row.
    MissingColumns {
        columns: Vec<String>,
        /// Model features derived from the absent columns, plus any feature
        /// the rest of the derivation left `NaN` or `±inf`.
        affected: Vec<String>,
    },
    /// Features still missing after imputation, plus any `±inf` features
    /// in the same vector.
    MissingValues { features: Vec<String> },
    /// Features holding `±inf` (typically a zero denominator).
    NonFinite { features: Vec<String> },
    /// Vector width does not match the scaler or classifier.
    ShapeMismatch { expected: usize, actual: usize },
}

impl PipelineError {
    /// Model features this failure says should be forced to zero.
    pub fn healable_features(&self) -> &[String] {
        match self {
            PipelineError::MissingColumns { affected, .. } => affected,
            PipelineError::MissingValues { features } => features,
            PipelineError::NonFinite { features } => features,
            PipelineError::ShapeMismatch { .. } => &[],
        }
    }
}

impl fmt::Display for PipelineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PipelineError::MissingColumns { columns, .. } => {
                write!(f, "missing raw columns {}", columns.join(", "))
            }
            PipelineError::MissingValues { features } => {
                write!(f, "missing values in {}", features.join(", "))
            }
            PipelineError::NonFinite { features } => {
                write!(f, "non-finite values in {}", features.join(", "))
            }
            PipelineError::ShapeMismatch { expected, actual } => write!(
                f,
                "feature vector has {} columns, model expects {}",
                actual, expected
            ),
        }
    }
}

impl std::error::Error for PipelineError {}

/// Runs the full pipeline once over `row`, with `pinned` features forced to zero.
pub fn run_attempt(
    row: &RawRow,
    artifact: &TrainedArtifact,
    pinned: &BTreeSet<String>,
) -> Result<PredictionResult, PipelineError> {
    let derived = derive_features(
        row,
        &artifact.category_levels,
        &artifact.feature_list,
        pinned,
    )?;
    let vector = align(&derived, &artifact.feature_list);

    let mut batch = FeatureBatch::from_vector(vector);
    batch.impute();
    let vector = batch
        .into_vectors()
        .into_iter()
        .next()
        .ok_or(PipelineError::ShapeMismatch {
            expected: artifact.feature_list.len(),
            actual: 0,
        })?;

    artifact.score(&vector)
}
