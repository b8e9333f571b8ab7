use crate::errors::AppError;
use crate::models::{ClientOverview, PredictionRequest, PredictionResult};
use crate::stats::DatasetStatistics;
use serde::de::DeserializeOwned;
use std::time::Duration;

/// Client the dashboard uses to talk to the prediction API.
#[derive(Clone)]
pub struct ScoringClient {
    client: reqwest::Client,
    base_url: String,
}

impl ScoringClient {
    /// Creates a new `ScoringClient`.
    ///
    /// # Arguments
    ///
    /// * `base_url` - Base URL of the prediction API, e.g. `http://127.0.0.1:3000`.
    pub fn new(base_url: String) -> Result<Self, AppError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| {
                AppError::ExternalApiError(format!("Failed to create scoring client: {}", e))
            })?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Requests a prediction for `client_id`.
    ///
    /// A 404 from the API becomes `AppError::NotFound`, a 422 becomes
    /// `AppError::PredictionExhausted`; both carry the API's error message.
    pub async fn predict(&self, client_id: i64) -> Result<PredictionResult, AppError> {
        let url = format!("{}/predict", self.base_url);
        tracing::info!("Requesting prediction for client {} from {}", client_id, url);

        let response = self
            .client
            .post(&url)
            .json(&PredictionRequest {
                client_id: Some(client_id),
            })
            .send()
            .await
            .map_err(|e| AppError::ExternalApiError(format!("Prediction request failed: {}", e)))?;

        Self::decode(response).await
    }

    /// Fetches the prediction together with the client's raw overview.
    pub async fn client_overview(&self, client_id: i64) -> Result<ClientOverview, AppError> {
        let url = format!("{}/api/v1/clients/{}", self.base_url, client_id);
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| AppError::ExternalApiError(format!("Overview request failed: {}", e)))?;

        Self::decode(response).await
    }

    /// Fetches the dataset statistics.
    pub async fn statistics(&self) -> Result<DatasetStatistics, AppError> {
        let url = format!("{}/api/v1/stats", self.base_url);
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| AppError::ExternalApiError(format!("Stats request failed: {}", e)))?;

        Self::decode(response).await
    }

    async fn decode<T: DeserializeOwned>(response: reqwest::Response) -> Result<T, AppError> {
        let status = response.status();
        if status.is_success() {
            return response.json::<T>().await.map_err(|e| {
                AppError::ExternalApiError(format!("Failed to parse API response: {}", e))
            });
        }

        let body: serde_json::Value = response.json().await.unwrap_or_default();
        let message = body
            .get("error")
            .and_then(|e| e.as_str())
            .unwrap_or("Unknown error")
            .to_string();
        tracing::warn!("Prediction API returned {}: {}", status, message);

        Err(match status.as_u16() {
            400 => AppError::BadRequest(message),
            404 => AppError::NotFound(message),
            422 => AppError::PredictionExhausted(message),
            _ => AppError::ExternalApiError(format!("API returned status {}: {}", status, message)),
        })
    }
}
