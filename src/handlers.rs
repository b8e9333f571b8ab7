use crate::dataset::ClientDataset;
use crate::errors::AppError;
use crate::models::*;
use crate::predictor::{PredictionOutcome, Predictor, EXHAUSTED_MESSAGE};
use crate::stats::DatasetStatistics;
use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde_json::json;
use std::sync::Arc;
use tower_http::{cors::CorsLayer, limit::RequestBodyLimitLayer, trace::TraceLayer};
use uuid::Uuid;

/// Shared application state injected into handlers.
///
/// Everything here is loaded before the server starts and never mutated.
pub struct AppState {
    /// Joined train + test clients.
    pub dataset: ClientDataset,
    /// Retry controller over the trained artifact.
    pub predictor: Predictor,
    /// Dashboard aggregates over the training rows.
    pub stats: DatasetStatistics,
}

/// Builds the HTTP routes without rate limiting.
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/predict", post(predict))
        .route("/api/v1/clients/:id", get(get_client))
        .route("/api/v1/stats", get(get_stats))
        .layer(RequestBodyLimitLayer::new(64 * 1024))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}

/// Health check endpoint.
pub async fn health(State(state): State<Arc<AppState>>) -> (StatusCode, Json<serde_json::Value>) {
    let artifact = state.predictor.artifact();
    (
        StatusCode::OK,
        Json(json!({
            "status": "healthy",
            "service": "credit-risk-api",
            "version": env!("CARGO_PKG_VERSION"),
            "clients": state.dataset.len(),
            "features": artifact.feature_list.len(),
            "trained_at": artifact.trained_at,
        })),
    )
}

/// Looks up a client and runs the retry loop for it.
fn score_client(state: &AppState, client_id: i64) -> Result<(&RawRow, PredictionResult), AppError> {
    let request_id = Uuid::new_v4();
    let span = tracing::info_span!("predict", %request_id, client_id);
    let _guard = span.enter();

    let row = state
        .dataset
        .lookup(client_id)
        .ok_or_else(|| AppError::NotFound("Client data not found".to_string()))?;

    match state.predictor.predict(row) {
        PredictionOutcome::Succeeded { result, attempts } => {
            tracing::info!(
                "Prediction {} (p_default={:.4}) after {} attempt(s)",
                result.prediction,
                result.probability[1],
                attempts
            );
            Ok((row, result))
        }
        PredictionOutcome::Exhausted { attempts, last_error } => {
            tracing::error!("No prediction after {} attempts: {}", attempts, last_error);
            Err(AppError::PredictionExhausted(EXHAUSTED_MESSAGE.to_string()))
        }
    }
}

/// POST /predict
///
/// Body: `{"SK_ID_CURR": <id>}`. Returns the label and probability pair.
/// A body that is not valid JSON or has a non-integer id is a 400.
pub async fn predict(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<PredictionRequest>, JsonRejection>,
) -> Result<Json<PredictionResult>, AppError> {
    let Json(request) = payload.map_err(|rejection| {
        tracing::warn!("Rejected /predict body: {}", rejection.body_text());
        AppError::BadRequest(format!("Invalid request body: {}", rejection.body_text()))
    })?;
    let client_id = request
        .client_id
        .ok_or_else(|| AppError::BadRequest("Client ID not provided".to_string()))?;
    tracing::info!("POST /predict - client {}", client_id);

    let (_, result) = score_client(&state, client_id)?;
    Ok(Json(result))
}

/// GET /api/v1/clients/:id
///
/// Prediction plus the few raw fields the dashboard shows next to it.
pub async fn get_client(
    State(state): State<Arc<AppState>>,
    Path(client_id): Path<i64>,
) -> Result<Json<ClientOverview>, AppError> {
    tracing::info!("GET /clients/{}", client_id);

    let (row, result) = score_client(&state, client_id)?;
    let number = |column: &str| match row.get(column) {
        Some(RawValue::Number(v)) => Some(*v),
        _ => None,
    };

    Ok(Json(ClientOverview {
        client_id,
        amt_credit: number("AMT_CREDIT"),
        amt_income_total: number("AMT_INCOME_TOTAL"),
        code_gender: row.get("CODE_GENDER").and_then(RawValue::as_category),
        target: row.target(),
        result,
    }))
}

/// GET /api/v1/stats
pub async fn get_stats(State(state): State<Arc<AppState>>) -> Json<DatasetStatistics> {
    Json(state.stats.clone())
}
