use axum::Json;
use axum::extract::State;
use axum::extract::rejection::JsonRejection;
use serde::Serialize;
use tracing::error;

use crate::app::SongServiceError;
use crate::domain::{
    ExtendRequest, ExtendResponse, GenerateResponse, GenerationRequest, ProvidersResponse,
};

use super::{ApiError, AppState};

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
}

/// GET /api/health
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse { status: "ok" })
}

/// GET /api/song/providers
pub async fn list_providers(State(state): State<AppState>) -> Json<ProvidersResponse> {
    Json(state.service.router().providers_summary())
}

/// POST /api/song/generate
pub async fn generate_song(
    State(state): State<AppState>,
    payload: Result<Json<GenerationRequest>, JsonRejection>,
) -> Result<Json<GenerateResponse>, ApiError> {
    let Json(request) = payload?;
    let service = state.service.clone();

    let response = run_blocking(move || service.generate(&request)).await?;
    Ok(Json(response))
}

/// POST /api/song/extend
pub async fn extend_song(
    State(state): State<AppState>,
    payload: Result<Json<ExtendRequest>, JsonRejection>,
) -> Result<Json<ExtendResponse>, ApiError> {
    let Json(request) = payload?;
    let service = state.service.clone();

    let response = run_blocking(move || service.extend(&request)).await?;
    Ok(Json(response))
}

pub async fn api_not_found() -> ApiError {
    ApiError::not_found()
}

/// Provider adapters use blocking HTTP clients, so service calls leave the async workers.
async fn run_blocking<T, F>(work: F) -> Result<T, ApiError>
where
    F: FnOnce() -> Result<T, SongServiceError> + Send + 'static,
    T: Send + 'static,
{
    let outcome = tokio::task::spawn_blocking(work).await.map_err(|err| {
        error!("song service task failed: {err}");
        ApiError::internal()
    })?;
    outcome.map_err(ApiError::from)
}
