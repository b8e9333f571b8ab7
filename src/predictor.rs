//! Bounded self-healing prediction loop.
//!
//! Each attempt runs the whole pipeline from feature derivation. When an
//! attempt fails, the features its failure names are pinned to zero and the
//! next attempt starts over. After `MAX_ATTEMPTS` failures the loop gives up
//! with an explicit `Exhausted` outcome.
//!
//! Pinning a missing ratio to zero is not neutral: a zero ratio is a real,
//! informative value for the model. Every pinned feature is logged and
//! returned to the caller in `zero_filled_features`.

use std::collections::BTreeSet;
use std::sync::Arc;

use crate::artifact::TrainedArtifact;
use crate::models::{PredictionResult, RawRow};
use crate::pipeline::{run_attempt, PipelineError};

pub const MAX_ATTEMPTS: usize = 10;

pub const EXHAUSTED_MESSAGE: &str = "Unable to make a prediction after multiple attempts";

/// Terminal state of the retry loop.
#[derive(Debug, Clone, PartialEq)]
pub enum PredictionOutcome {
    Succeeded {
        result: PredictionResult,
        attempts: usize,
    },
    Exhausted {
        attempts: usize,
        last_error: PipelineError,
    },
}

impl PredictionOutcome {
    pub fn attempts(&self) -> usize {
        match self {
            PredictionOutcome::Succeeded { attempts, .. } => *attempts,
            PredictionOutcome::Exhausted { attempts, .. } => *attempts,
        }
    }
}

/// Runs predictions against a shared, read-only artifact.
#[derive(Debug, Clone)]
pub struct Predictor {
    artifact: Arc<TrainedArtifact>,
    max_attempts: usize,
}

impl Predictor {
    pub fn new(artifact: Arc<TrainedArtifact>) -> Self {
        Self {
            artifact,
            max_attempts: MAX_ATTEMPTS,
        }
    }

    pub fn artifact(&self) -> &TrainedArtifact {
        &self.artifact
    }

    /// Predicts for one raw row, healing feature errors between attempts.
    pub fn predict(&self, row: &RawRow) -> PredictionOutcome {
        let mut pinned: BTreeSet<String> = BTreeSet::new();
        let mut attempt = 0;

        loop {
            attempt += 1;
            match run_attempt(row, &self.artifact, &pinned) {
                Ok(mut result) => {
                    if !pinned.is_empty() {
                        tracing::warn!(
                            "Prediction succeeded on attempt {} with zero-filled features: {:?}",
                            attempt,
                            pinned
                        );
                    }
                    result.zero_filled_features = self
                        .artifact
                        .feature_list
                        .iter()
                        .filter(|f| pinned.contains(*f))
                        .cloned()
                        .collect();
                    return PredictionOutcome::Succeeded {
                        result,
                        attempts: attempt,
                    };
                }
                Err(err) => {
                    tracing::warn!("Attempt {} failed: {}", attempt, err);
                    if attempt >= self.max_attempts {
                        tracing::error!(
                            "Giving up after {} attempts, last error: {}",
                            attempt,
                            err
                        );
                        return PredictionOutcome::Exhausted {
                            attempts: attempt,
                            last_error: err,
                        };
                    }
                    for feature in err.healable_features() {
                        if pinned.insert(feature.clone()) {
                            tracing::debug!("Forcing {} to zero", feature);
                        }
                    }
                }
            }
        }
    }
}
