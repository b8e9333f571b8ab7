//! Client dataset: the joined train + test application files.
//!
//! Loaded once at startup and only read afterwards. Lookup is by
//! `SK_ID_CURR`; when an id appears more than once the first row wins.

use std::collections::HashMap;
use std::io::Read;
use std::path::Path;
use std::sync::Arc;

use crate::errors::{AppError, ResultExt};
use crate::models::{ColumnIndex, RawRow, RawValue};

/// Reads every record of an application CSV file into raw rows.
pub fn read_rows<R: Read>(reader: R) -> Result<Vec<RawRow>, AppError> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(false)
        .from_reader(reader);

    let index = Arc::new(ColumnIndex::from_headers(csv_reader.headers()?.iter()));
    let mut rows = Vec::new();
    let mut record = csv::StringRecord::new();
    while csv_reader.read_record(&mut record)? {
        let values = record.iter().map(RawValue::parse).collect();
        rows.push(RawRow::from_values(Arc::clone(&index), values));
    }
    Ok(rows)
}

/// Reads an application CSV file from disk.
pub fn read_rows_from_path(path: impl AsRef<Path>) -> Result<Vec<RawRow>, AppError> {
    let path = path.as_ref();
    let file = std::fs::File::open(path)
        .with_context(|| format!("opening dataset {}", path.display()))?;
    let rows = read_rows(std::io::BufReader::new(file))
        .with_context(|| format!("parsing dataset {}", path.display()))?;
    tracing::info!("Loaded {} rows from {}", rows.len(), path.display());
    Ok(rows)
}

/// Read-only view of every known client, keyed by `SK_ID_CURR`.
#[derive(Debug, Default)]
pub struct ClientDataset {
    rows: Vec<RawRow>,
    index: HashMap<i64, usize>,
    train_len: usize,
}

impl ClientDataset {
    /// Joins the training rows (first) and test rows into one lookup table.
    pub fn from_parts(train: Vec<RawRow>, test: Vec<RawRow>) -> Self {
        let train_len = train.len();
        let rows: Vec<RawRow> = train.into_iter().chain(test).collect();

        let mut index = HashMap::with_capacity(rows.len());
        let mut skipped = 0usize;
        for (position, row) in rows.iter().enumerate() {
            match row.client_id() {
                Some(id) => {
                    index.entry(id).or_insert(position);
                }
                None => skipped += 1,
            }
        }
        if skipped > 0 {
            tracing::warn!("Skipped {} rows without a usable SK_ID_CURR", skipped);
        }

        Self {
            rows,
            index,
            train_len,
        }
    }

    /// Loads and joins both dataset files.
    pub fn load(
        train_path: impl AsRef<Path>,
        test_path: impl AsRef<Path>,
    ) -> Result<Self, AppError> {
        let train = read_rows_from_path(train_path)?;
        let test = read_rows_from_path(test_path)?;
        let dataset = Self::from_parts(train, test);
        tracing::info!(
            "Client dataset ready: {} rows, {} distinct clients",
            dataset.rows.len(),
            dataset.index.len()
        );
        Ok(dataset)
    }

    pub fn lookup(&self, client_id: i64) -> Option<&RawRow> {
        self.index.get(&client_id).map(|&pos| &self.rows[pos])
    }

    /// Rows that came from the training file.
    pub fn train_rows(&self) -> &[RawRow] {
        &self.rows[..self.train_len]
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Downloads `file_name` from `base_url` into `path` unless the file exists.
///
/// Returns `true` when a download happened.
pub async fn ensure_downloaded(
    client: &reqwest::Client,
    base_url: &str,
    file_name: &str,
    path: &Path,
) -> Result<bool, AppError> {
    if tokio::fs::try_exists(path).await.unwrap_or(false) {
        tracing::info!("Dataset {} already present", path.display());
        return Ok(false);
    }

    let url = format!("{}/{}", base_url.trim_end_matches('/'), file_name);
    tracing::info!("Downloading {} from {}", path.display(), url);

    let response = client
        .get(&url)
        .send()
        .await
        .map_err(|e| AppError::DatasetError(format!("Download of {} failed: {}", url, e)))?;

    if !response.status().is_success() {
        let status = response.status();
        tracing::error!("Dataset download returned {}", status);
        return Err(AppError::DatasetError(format!(
            "Download of {} returned status {}",
            url, status
        )));
    }

    let bytes = response
        .bytes()
        .await
        .map_err(|e| AppError::DatasetError(format!("Reading {} failed: {}", url, e)))?;

    // Write next to the target first so a failed download never leaves a
    // truncated file that the next start would treat as present.
    let partial = path.with_extension("part");
    tokio::fs::write(&partial, &bytes)
        .await
        .with_context(|| format!("writing {}", partial.display()))?;
    tokio::fs::rename(&partial, path)
        .await
        .with_context(|| format!("moving {} into place", path.display()))?;

    tracing::info!("✓ Downloaded {} ({} bytes)", path.display(), bytes.len());
    Ok(true)
}
