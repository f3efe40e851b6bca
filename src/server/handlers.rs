//! HTTP trigger handlers

use crate::output::CsvBuffer;
use crate::pipeline::Orchestrator;
use crate::server::state::AppState;
use axum::{
    body::Bytes,
    extract::{Path, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

/// Request body of `POST /run-generator`
#[derive(Debug, Deserialize)]
pub struct RunRequest {
    /// Segment names to run; empty runs every configured segment
    #[serde(alias = "segments_to_run")]
    pub segments: Option<Vec<String>>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct RunResponse {
    pub job_id: String,
    pub leads: usize,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
}

type ApiError = (StatusCode, Json<ErrorResponse>);

fn api_error(status: StatusCode, message: impl Into<String>) -> ApiError {
    (
        status,
        Json(ErrorResponse {
            error: message.into(),
        }),
    )
}

pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
    })
}

/// Runs the pipeline for the requested segments and caches the CSV report
///
/// # Returns
///
/// * `200` - `{"job_id", "leads"}`; the report is downloadable from `/results/{job_id}`
/// * `204` - The run found no leads
/// * `400` - Malformed body, missing `segments` or an unknown segment name
/// * `401` / `403` - Missing or wrong `x-api-key`
/// * `500` - Services could not be built or the report could not be rendered
pub async fn run_generator(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Response, ApiError> {
    if let Err(status) = state.authorize(&headers) {
        tracing::warn!("Rejected run request: {}", status);
        return Err(api_error(status, "API key required or invalid."));
    }

    let request: RunRequest = serde_json::from_slice(&body)
        .map_err(|e| api_error(StatusCode::BAD_REQUEST, format!("Invalid request body: {}", e)))?;
    let segments = request
        .segments
        .ok_or_else(|| api_error(StatusCode::BAD_REQUEST, "Missing 'segments' in request."))?;

    let mut config = state.config().clone();
    config
        .retain_segments(&segments)
        .map_err(|e| api_error(StatusCode::BAD_REQUEST, e.to_string()))?;
    tracing::info!("Starting run for segments: {:?}", segments);

    let services = state.build_services(&config).map_err(|e| {
        tracing::error!("Failed to set up pipeline services: {}", e);
        api_error(StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
    })?;

    let buffer = CsvBuffer::new();
    let mut orchestrator = Orchestrator::new(Arc::new(config), services, Box::new(buffer.clone()));
    let report = orchestrator.run().await.map_err(|e| {
        tracing::error!("Run failed: {}", e);
        api_error(StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
    })?;

    if report.leads.is_empty() {
        tracing::warn!("Run produced no leads");
        return Ok(StatusCode::NO_CONTENT.into_response());
    }

    let csv = buffer
        .take()
        .map_err(|e| api_error(StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))?;
    let job_id = Uuid::new_v4().to_string();
    state.store_result(job_id.clone(), csv).await;
    tracing::info!("Cached {} lead(s) under job {}", report.leads.len(), job_id);

    Ok(Json(RunResponse {
        job_id,
        leads: report.leads.len(),
    })
    .into_response())
}

/// Serves a cached report as a CSV attachment
pub async fn get_result(
    State(state): State<Arc<AppState>>,
    Path(job_id): Path<String>,
) -> Result<Response, ApiError> {
    let csv = state
        .result(&job_id)
        .await
        .ok_or_else(|| api_error(StatusCode::NOT_FOUND, "Result not found or expired"))?;

    Ok((
        [
            (header::CONTENT_TYPE, "text/csv"),
            (header::CONTENT_DISPOSITION, "attachment; filename=\"leads.csv\""),
        ],
        csv,
    )
        .into_response())
}
