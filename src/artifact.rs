use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::path::Path;

use crate::errors::{AppError, ResultExt};
use crate::features::{CategoryLevels, FeatureVector};
use crate::models::PredictionResult;
use crate::pipeline::PipelineError;
use crate::scoring::{BinaryClassifier, LogisticRegression, StandardScaler};

/// Bumped whenever the serialized layout changes.
pub const ARTIFACT_FORMAT_VERSION: u32 = 1;

/// Validation metrics recorded at training time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingMetrics {
    pub roc_auc: Option<f64>,
    pub train_rows: usize,
    pub validation_rows: usize,
}

/// Frozen scaler + classifier, plus the feature contract they were fit on.
///
/// Created once by the trainer, loaded read-only by the server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainedArtifact {
    pub format_version: u32,
    pub trained_at: DateTime<Utc>,
    /// Ordered feature names; the scaler and classifier use this order.
    pub feature_list: Vec<String>,
    pub category_levels: CategoryLevels,
    pub scaler: StandardScaler,
    pub classifier: LogisticRegression,
    pub metrics: TrainingMetrics,
}

impl TrainedArtifact {
    /// Checks that the scaler and classifier agree with the feature list.
    pub fn validate(&self) -> Result<(), AppError> {
        if self.format_version != ARTIFACT_FORMAT_VERSION {
            return Err(AppError::ArtifactError(format!(
                "unsupported artifact format version {} (expected {})",
                self.format_version, ARTIFACT_FORMAT_VERSION
            )));
        }

        let width = self.feature_list.len();
        if width == 0 {
            return Err(AppError::ArtifactError("feature list is empty".to_string()));
        }
        if self.scaler.mean.len() != width || self.scaler.scale.len() != width {
            return Err(AppError::ArtifactError(format!(
                "scaler width {} does not match {} features",
                self.scaler.mean.len(),
                width
            )));
        }
        if self.classifier.width() != width {
            return Err(AppError::ArtifactError(format!(
                "classifier width {} does not match {} features",
                self.classifier.width(),
                width
            )));
        }
        Ok(())
    }

    /// Scales a fully populated vector and classifies it.
    ///
    /// A rejected vector reports every unusable entry at once: `NaN` and
    /// `±inf` features are listed together in one error.
    pub fn score(&self, vector: &FeatureVector) -> Result<PredictionResult, PipelineError> {
        let unusable = named(vector, |v| !v.is_finite());
        if !unusable.is_empty() {
            return Err(if vector.values.iter().any(|v| v.is_nan()) {
                PipelineError::MissingValues { features: unusable }
            } else {
                PipelineError::NonFinite { features: unusable }
            });
        }

        let scaled = self.scaler.transform(&vector.values)?;
        let probability = self.classifier.predict_proba(&scaled)?;
        let prediction = self.classifier.predict(&scaled)?;

        Ok(PredictionResult {
            prediction,
            probability,
            zero_filled_features: Vec::new(),
        })
    }

    /// Writes the artifact together with its SHA-256 checksum.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), AppError> {
        let path = path.as_ref();
        let file = ArtifactFile::new(self)?;
        let serialized = serde_json::to_string_pretty(&file)?;
        std::fs::write(path, serialized)
            .with_context(|| format!("writing artifact to {}", path.display()))?;
        tracing::info!("Artifact written to {} ({})", path.display(), file.checksum);
        Ok(())
    }

    /// Reads, verifies and validates an artifact.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, AppError> {
        let path = path.as_ref();
        let serialized = std::fs::read_to_string(path)
            .with_context(|| format!("reading artifact from {}", path.display()))?;
        let artifact = ArtifactFile::deserialize_and_validate(&serialized)?;
        artifact.validate()?;

        tracing::info!(
            "Artifact loaded from {}: {} features, trained at {}",
            path.display(),
            artifact.feature_list.len(),
            artifact.trained_at
        );
        Ok(artifact)
    }
}

fn named(vector: &FeatureVector, predicate: fn(f64) -> bool) -> Vec<String> {
    vector
        .names
        .iter()
        .zip(&vector.values)
        .filter(|(_, v)| predicate(**v))
        .map(|(name, _)| name.clone())
        .collect()
}

/// On-disk wrapper: the artifact plus a checksum of its canonical JSON.
///
/// Loading recomputes the checksum and rejects files that were edited or
/// truncated after training.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArtifactFile {
    pub artifact: TrainedArtifact,
    /// SHA-256 of the artifact's compact JSON (hex encoded).
    pub checksum: String,
}

impl ArtifactFile {
    pub fn new(artifact: &TrainedArtifact) -> Result<Self, AppError> {
        Ok(Self {
            checksum: Self::compute_checksum(artifact)?,
            artifact: artifact.clone(),
        })
    }

    fn compute_checksum(artifact: &TrainedArtifact) -> Result<String, AppError> {
        let canonical = serde_json::to_string(artifact)?;
        let mut hasher = Sha256::new();
        hasher.update(canonical.as_bytes());
        Ok(hex::encode(hasher.finalize()))
    }

    /// Returns true if the checksum matches the artifact.
    pub fn is_valid(&self) -> bool {
        Self::compute_checksum(&self.artifact)
            .map(|computed| computed == self.checksum)
            .unwrap_or(false)
    }

    /// Parses a serialized artifact file and verifies its checksum.
    pub fn deserialize_and_validate(serialized: &str) -> Result<TrainedArtifact, AppError> {
        let file: ArtifactFile = serde_json::from_str(serialized)?;
        if !file.is_valid() {
            tracing::error!("Artifact checksum mismatch, refusing to load");
            return Err(AppError::ArtifactError(
                "checksum mismatch: artifact was modified after training".to_string(),
            ));
        }
        Ok(file.artifact)
    }
}
