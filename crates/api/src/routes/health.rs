//! Health and Metrics Routes

use axum::{extract::State, http::header, response::IntoResponse, Json};
use serde::Serialize;
use std::sync::Arc;

use crate::{ApiError, AppState};

/// Health response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub message: &'static str,
    pub version: String,
    pub uptime_seconds: u64,
    pub model: ModelStatus,
}

/// Loaded model summary
#[derive(Debug, Serialize)]
pub struct ModelStatus {
    pub classifier: &'static str,
    pub features: usize,
    pub disease_classes: usize,
}

/// Health check handler
pub async fn health(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    let artifact = state.scorer.artifact();

    Json(HealthResponse {
        status: "healthy",
        message: "Smart Health Surveillance API is running",
        version: state.version.clone(),
        uptime_seconds: state.start_time.elapsed().as_secs(),
        model: ModelStatus {
            classifier: artifact.classifier().kind(),
            features: artifact.schema().len(),
            disease_classes: artifact.disease_classes().len(),
        },
    })
}

/// Prometheus text exposition
pub async fn metrics(State(state): State<Arc<AppState>>) -> Result<impl IntoResponse, ApiError> {
    let handle = state
        .metrics
        .as_ref()
        .ok_or_else(|| ApiError::NotFound("Metrics are disabled".to_string()))?;

    Ok((
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        handle.render(),
    ))
}
