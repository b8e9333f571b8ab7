use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;

// ============ Dataset Models ============

/// A single cell of a loan application.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawValue {
    /// Numeric cell.
    Number(f64),
    /// Non-numeric cell (categorical value).
    Text(String),
    /// Empty cell.
    Null,
}

impl RawValue {
    /// Parses a CSV cell. Empty cells are null, parseable floats are numbers.
    pub fn parse(cell: &str) -> Self {
        let trimmed = cell.trim();
        if trimmed.is_empty() {
            return RawValue::Null;
        }
        match trimmed.parse::<f64>() {
            Ok(value) => RawValue::Number(value),
            Err(_) => RawValue::Text(trimmed.to_string()),
        }
    }

    /// Numeric view of the cell. Null and text become `NaN`.
    pub fn as_f64(&self) -> f64 {
        match self {
            RawValue::Number(value) => *value,
            RawValue::Text(_) | RawValue::Null => f64::NAN,
        }
    }

    /// Categorical view of the cell. Numbers are rendered the way they
    /// appear in the dataset (`1` rather than `1.0`).
    pub fn as_category(&self) -> Option<String> {
        match self {
            RawValue::Text(value) => Some(value.clone()),
            RawValue::Number(value) if value.fract() == 0.0 && value.is_finite() => {
                Some(format!("{}", *value as i64))
            }
            RawValue::Number(value) => Some(value.to_string()),
            RawValue::Null => None,
        }
    }
}

/// Column name → cell position, shared by every row read from one file.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ColumnIndex {
    positions: HashMap<String, usize>,
}

impl ColumnIndex {
    /// Builds the index from a header line. A repeated name keeps its first position.
    pub fn from_headers<I, S>(headers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut positions = HashMap::new();
        for (position, name) in headers.into_iter().enumerate() {
            positions.entry(name.into()).or_insert(position);
        }
        Self { positions }
    }

    pub fn position(&self, column: &str) -> Option<usize> {
        self.positions.get(column).copied()
    }

    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }
}

/// One client's unprocessed application data.
///
/// Cells are stored positionally; names resolve through a [`ColumnIndex`]
/// that all rows of a file share. Rows are immutable once loaded; the
/// pipeline never writes back into them.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawRow {
    index: Arc<ColumnIndex>,
    values: Vec<RawValue>,
}

impl RawRow {
    pub fn new() -> Self {
        Self::default()
    }

    /// Row over a shared index; `values` follow the index positions.
    pub fn from_values(index: Arc<ColumnIndex>, values: Vec<RawValue>) -> Self {
        debug_assert!(index.positions.values().all(|&pos| pos < values.len()));
        Self { index, values }
    }

    pub fn column_index(&self) -> &Arc<ColumnIndex> {
        &self.index
    }

    /// Builder-style insert, mostly used by tests and fixtures.
    pub fn with(mut self, column: impl Into<String>, value: RawValue) -> Self {
        self.insert(column, value);
        self
    }

    /// Sets `column`. A column new to this row detaches it from the shared index.
    pub fn insert(&mut self, column: impl Into<String>, value: RawValue) {
        let column = column.into();
        match self.index.position(&column) {
            Some(pos) => self.values[pos] = value,
            None => {
                let pos = self.values.len();
                Arc::make_mut(&mut self.index).positions.insert(column, pos);
                self.values.push(value);
            }
        }
    }

    /// Returns a copy of this row without `column`.
    pub fn without(&self, column: &str) -> Self {
        let mut row = self.clone();
        if row.index.position(column).is_some() {
            Arc::make_mut(&mut row.index).positions.remove(column);
        }
        row
    }

    pub fn get(&self, column: &str) -> Option<&RawValue> {
        self.index
            .position(column)
            .and_then(|pos| self.values.get(pos))
    }

    pub fn contains(&self, column: &str) -> bool {
        self.get(column).is_some()
    }

    pub fn columns(&self) -> impl Iterator<Item = (&String, &RawValue)> {
        self.index
            .positions
            .iter()
            .filter_map(|(name, &pos)| self.values.get(pos).map(|value| (name, value)))
    }

    /// Client identifier (`SK_ID_CURR`), if present and integral.
    pub fn client_id(&self) -> Option<i64> {
        match self.get("SK_ID_CURR") {
            Some(RawValue::Number(id)) if id.fract() == 0.0 => Some(*id as i64),
            _ => None,
        }
    }

    /// Binary label (`TARGET >= 0.5`), if the row is labelled.
    pub fn target(&self) -> Option<u8> {
        match self.get("TARGET") {
            Some(RawValue::Number(target)) if !target.is_nan() => {
                Some(if *target >= 0.5 { 1 } else { 0 })
            }
            _ => None,
        }
    }
}

// ============ API Models ============

/// Body of `POST /predict`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PredictionRequest {
    #[serde(rename = "SK_ID_CURR")]
    pub client_id: Option<i64>,
}

/// Successful prediction returned to the caller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionResult {
    /// Hard label: 1 means predicted default.
    pub prediction: u8,
    /// Probability pair `[no-default, default]`.
    pub probability: [f64; 2],
    /// Features the retry loop forced to zero before this result was produced.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub zero_filled_features: Vec<String>,
}

/// Response of `GET /api/v1/clients/:id`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientOverview {
    #[serde(rename = "SK_ID_CURR")]
    pub client_id: i64,
    pub amt_credit: Option<f64>,
    pub amt_income_total: Option<f64>,
    pub code_gender: Option<String>,
    /// Known outcome for training clients, absent for test clients.
    pub target: Option<u8>,
    pub result: PredictionResult,
}
