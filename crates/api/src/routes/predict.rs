//! Risk Prediction Route

use axum::{
    extract::{rejection::JsonRejection, State},
    Json,
};
use feature_engine::SensorRecord;
use inference_engine::{DiseasePrediction, InferenceError, RiskTier};
use metrics::{counter, histogram};
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;
use std::time::Instant;
use storage::NewPrediction;
use tracing::{info, warn};

use crate::{ApiError, AppState, AuthUser};

/// Response for the predict endpoint
#[derive(Debug, Serialize)]
pub struct PredictResponse {
    pub overall_status: RiskTier,
    pub predictions: Vec<DiseasePrediction>,
    pub timestamp: String,
    /// Body as received
    pub sensor_data: Value,
    /// Stored record, when the caller is signed in
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prediction_id: Option<i64>,
}

/// Score one sensor record.
///
/// Anonymous callers get the result only; signed-in callers also have the
/// top prediction stored against their account.
pub async fn predict(
    State(state): State<Arc<AppState>>,
    user: Option<AuthUser>,
    payload: Result<Json<Value>, JsonRejection>,
) -> Result<Json<PredictResponse>, ApiError> {
    let start = Instant::now();

    let map = match payload {
        Ok(Json(Value::Object(map))) if !map.is_empty() => map,
        _ => {
            counter!("prediction_errors_total", "kind" => "invalid_input").increment(1);
            return Err(ApiError::BadRequest("No JSON data provided".to_string()));
        }
    };
    let record = SensorRecord::from(map.clone());
    let sensor_data = Value::Object(map);

    let scorer = state.scorer.clone();
    let scored = tokio::task::spawn_blocking(move || scorer.score(&record))
        .await
        .map_err(|e| ApiError::Internal(format!("scoring task failed: {}", e)))?;

    let result = match scored {
        Ok(result) => result,
        Err(err) => {
            counter!("prediction_errors_total", "kind" => error_kind(&err)).increment(1);
            return Err(err.into());
        }
    };

    counter!("predictions_total", "status" => result.overall_status.as_str()).increment(1);
    histogram!("prediction_latency_seconds").record(start.elapsed().as_secs_f64());
    info!("Prediction completed for status: {}", result.overall_status);

    let mut prediction_id = None;
    if let (Some(user), Some(top)) = (&user, result.top()) {
        let stored = state
            .repository
            .save_prediction(NewPrediction {
                user_id: user.user_id(),
                sensor_data: sensor_data.clone(),
                predicted_disease: top.disease.clone(),
                confidence: top.probability_pct,
                risk_level: top.risk_level.as_str().to_string(),
            })
            .await;
        match stored {
            Ok(id) => prediction_id = Some(id),
            Err(e) => warn!("Could not store prediction for user {}: {}", user.user_id(), e),
        }
    }

    Ok(Json(PredictResponse {
        overall_status: result.overall_status,
        predictions: result.predictions,
        timestamp: chrono::Utc::now().format("%Y-%m-%dT%H:%M:%S").to_string(),
        sensor_data,
        prediction_id,
    }))
}

fn error_kind(err: &InferenceError) -> &'static str {
    match err {
        InferenceError::InvalidInput(_) => "invalid_input",
        InferenceError::ModelError(_) => "model",
        InferenceError::SchemaMismatch { .. } => "schema_mismatch",
        InferenceError::ModelLoadError(_) => "model_load",
    }
}
