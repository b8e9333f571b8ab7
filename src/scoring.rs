//! Frozen scaler and binary classifier used at serving time.

use serde::{Deserialize, Serialize};

use crate::pipeline::PipelineError;

/// Per-feature standardisation `(x - mean) / scale`, fit once at training time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StandardScaler {
    pub mean: Vec<f64>,
    pub scale: Vec<f64>,
}

impl StandardScaler {
    /// Fits population mean and standard deviation per column.
    ///
    /// Constant columns get a scale of 1.0 so they map to zero instead of NaN.
    pub fn fit(rows: &[Vec<f64>], width: usize) -> Self {
        let n = rows.len().max(1) as f64;
        let mut mean = vec![0.0; width];
        for row in rows {
            for (m, x) in mean.iter_mut().zip(row) {
                *m += x / n;
            }
        }

        let mut variance = vec![0.0; width];
        for row in rows {
            for ((v, x), m) in variance.iter_mut().zip(row).zip(&mean) {
                *v += (x - m).powi(2) / n;
            }
        }

        let scale = variance
            .into_iter()
            .map(|v| {
                let std = v.sqrt();
                if std > 0.0 && std.is_finite() {
                    std
                } else {
                    1.0
                }
            })
            .collect();

        Self { mean, scale }
    }

    pub fn width(&self) -> usize {
        self.mean.len()
    }

    /// Scales one vector.
    pub fn transform(&self, values: &[f64]) -> Result<Vec<f64>, PipelineError> {
        if values.len() != self.mean.len() || self.mean.len() != self.scale.len() {
            return Err(PipelineError::ShapeMismatch {
                expected: self.mean.len(),
                actual: values.len(),
            });
        }

        Ok(values
            .iter()
            .zip(self.mean.iter().zip(&self.scale))
            .map(|(x, (m, s))| (x - m) / s)
            .collect())
    }
}

/// A binary classifier treated as a black box by the pipeline.
pub trait BinaryClassifier {
    /// Number of inputs the classifier expects.
    fn width(&self) -> usize;

    /// Probability pair `[p(class 0), p(class 1)]`.
    fn predict_proba(&self, x: &[f64]) -> Result<[f64; 2], PipelineError>;

    /// Hard label in `{0, 1}`.
    fn predict(&self, x: &[f64]) -> Result<u8, PipelineError> {
        let [_, p1] = self.predict_proba(x)?;
        Ok(if p1 > 0.5 { 1 } else { 0 })
    }
}

/// Logistic regression: `p1 = sigmoid(w·x + b)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogisticRegression {
    pub weights: Vec<f64>,
    pub bias: f64,
}

impl LogisticRegression {
    pub fn decision_function(&self, x: &[f64]) -> Result<f64, PipelineError> {
        if x.len() != self.weights.len() {
            return Err(PipelineError::ShapeMismatch {
                expected: self.weights.len(),
                actual: x.len(),
            });
        }
        Ok(self.bias + self.weights.iter().zip(x).map(|(w, x)| w * x).sum::<f64>())
    }
}

impl BinaryClassifier for LogisticRegression {
    fn width(&self) -> usize {
        self.weights.len()
    }

    fn predict_proba(&self, x: &[f64]) -> Result<[f64; 2], PipelineError> {
        let p1 = sigmoid(self.decision_function(x)?);
        Ok([1.0 - p1, p1])
    }
}

/// Numerically stable logistic function.
pub fn sigmoid(z: f64) -> f64 {
    if z >= 0.0 {
        1.0 / (1.0 + (-z).exp())
    } else {
        let e = z.exp();
        e / (1.0 + e)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scaler_fit_and_transform() {
        let rows = vec![vec![1.0, 5.0], vec![3.0, 5.0]];
        let scaler = StandardScaler::fit(&rows, 2);

        assert_eq!(scaler.mean, vec![2.0, 5.0]);
        assert_eq!(scaler.scale, vec![1.0, 1.0]);
        assert_eq!(scaler.transform(&[3.0, 5.0]).unwrap(), vec![1.0, 0.0]);
    }

    #[test]
    fn test_scaler_rejects_wrong_width() {
        let scaler = StandardScaler {
            mean: vec![0.0; 3],
            scale: vec![1.0; 3],
        };
        assert_eq!(
            scaler.transform(&[1.0, 2.0]),
            Err(PipelineError::ShapeMismatch {
                expected: 3,
                actual: 2
            })
        );
    }

    #[test]
    fn test_probabilities_sum_to_one() {
        let model = LogisticRegression {
            weights: vec![0.5, -1.25],
            bias: 0.1,
        };
        let [p0, p1] = model.predict_proba(&[2.0, 1.0]).unwrap();
        assert!((p0 + p1 - 1.0).abs() < 1e-12);
        assert_eq!(model.predict(&[2.0, 1.0]).unwrap(), if p1 > 0.5 { 1 } else { 0 });
    }

    #[test]
    fn test_sigmoid_extremes() {
        assert_eq!(sigmoid(0.0), 0.5);
        assert!(sigmoid(-1000.0) >= 0.0);
        assert!(sigmoid(1000.0) <= 1.0);
    }
}
