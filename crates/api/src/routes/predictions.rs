//! Prediction History Routes

use axum::{
    extract::{Query, State},
    Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use storage::PredictionRecord;

use crate::{ApiError, AppState, AuthUser};

/// Query parameters for predictions endpoint
#[derive(Debug, Deserialize)]
pub struct PredictionQuery {
    /// Maximum number of records
    #[serde(default = "default_limit")]
    pub limit: i64,
}

fn default_limit() -> i64 {
    50
}

/// Response for predictions endpoint
#[derive(Debug, Serialize)]
pub struct PredictionResponse {
    pub predictions: Vec<PredictionRecord>,
    pub count: usize,
}

/// Stored predictions of the signed-in user, newest first
pub async fn list_predictions(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Query(params): Query<PredictionQuery>,
) -> Result<Json<PredictionResponse>, ApiError> {
    let limit = params.limit.clamp(1, 500);

    let predictions = state
        .repository
        .predictions_for_user(user.user_id(), limit)
        .await?;

    Ok(Json(PredictionResponse {
        count: predictions.len(),
        predictions,
    }))
}

#[cfg(test)]
mod tests {
    use crate::test_support::*;
    use auth::Role;
    use axum::http::{Method, StatusCode};

    #[tokio::test]
    async fn test_empty_history() {
        let state = test_state().await;
        let token = token_for(&state, "asha", Role::Volunteer).await;

        let response = send(&state, Method::GET, "/predictions?limit=5", Some(&token), None).await;
        let body = expect_json(response, StatusCode::OK).await;
        assert_eq!(body["count"], 0);
    }

    #[tokio::test]
    async fn test_history_requires_token() {
        let state = test_state().await;
        let response = send(&state, Method::GET, "/predictions", None, None).await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }
}
