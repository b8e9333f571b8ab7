use crate::features::FeatureVector;

/// A batch of feature vectors sharing one feature list.
///
/// Missing values are `NaN`. `±inf` is a value, not a missing entry.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureBatch {
    pub names: Vec<String>,
    pub rows: Vec<Vec<f64>>,
}

impl FeatureBatch {
    pub fn new(names: Vec<String>) -> Self {
        Self {
            names,
            rows: Vec::new(),
        }
    }

    pub fn from_vector(vector: FeatureVector) -> Self {
        Self {
            names: vector.names,
            rows: vec![vector.values],
        }
    }

    /// Appends one row; it must have one value per feature name.
    pub fn push(&mut self, values: Vec<f64>) {
        debug_assert_eq!(values.len(), self.names.len());
        self.rows.push(values);
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column(&self, idx: usize) -> impl Iterator<Item = f64> + '_ {
        self.rows.iter().map(move |row| row[idx])
    }

    pub fn into_vectors(self) -> Vec<FeatureVector> {
        let names = self.names;
        self.rows
            .into_iter()
            .map(|values| FeatureVector {
                names: names.clone(),
                values,
            })
            .collect()
    }

    /// Number of `NaN` entries left in the batch.
    pub fn missing_count(&self) -> usize {
        self.rows
            .iter()
            .flat_map(|row| row.iter())
            .filter(|v| v.is_nan())
            .count()
    }

    /// Names of the columns that still contain a `NaN`.
    pub fn missing_columns(&self) -> Vec<String> {
        (0..self.names.len())
            .filter(|&idx| self.column(idx).any(f64::is_nan))
            .map(|idx| self.names[idx].clone())
            .collect()
    }

    /// Fills missing entries: first with each column's median over the
    /// batch, then with each column's mode.
    ///
    /// Statistics come from the batch itself, not the training distribution.
    /// A column with no observed value has neither and stays `NaN`.
    pub fn impute(&mut self) {
        let width = self.names.len();

        let medians: Vec<Option<f64>> = (0..width)
            .map(|idx| median(&self.column(idx).filter(|v| !v.is_nan()).collect::<Vec<_>>()))
            .collect();
        self.fill_with(&medians);

        let modes: Vec<Option<f64>> = (0..width)
            .map(|idx| mode(&self.column(idx).filter(|v| !v.is_nan()).collect::<Vec<_>>()))
            .collect();
        self.fill_with(&modes);
    }

    fn fill_with(&mut self, fills: &[Option<f64>]) {
        for row in self.rows.iter_mut() {
            for (value, fill) in row.iter_mut().zip(fills) {
                if let (true, Some(fill)) = (value.is_nan(), fill) {
                    *value = *fill;
                }
            }
        }
    }
}

/// Median of the observed values; `inf` participates like any other value.
pub fn median(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        Some((sorted[mid - 1] + sorted[mid]) / 2.0)
    } else {
        Some(sorted[mid])
    }
}

/// Most frequent observed value, smallest first on ties.
pub fn mode(values: &[f64]) -> Option<f64> {
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));

    let mut best: Option<(f64, usize)> = None;
    let mut idx = 0;
    while idx < sorted.len() {
        let value = sorted[idx];
        let run = sorted[idx..].iter().take_while(|v| **v == value).count().max(1);
        if best.map_or(true, |(_, count)| run > count) {
            best = Some((value, run));
        }
        idx += run;
    }
    best.map(|(value, _)| value)
}
