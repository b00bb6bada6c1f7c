//! Dashboard Statistics Route

use axum::{extract::State, Json};
use std::sync::Arc;
use storage::SystemStats;

use crate::{ApiError, AppState, AuthUser};

pub async fn stats(
    State(state): State<Arc<AppState>>,
    _user: AuthUser,
) -> Result<Json<SystemStats>, ApiError> {
    Ok(Json(state.repository.stats().await?))
}

#[cfg(test)]
mod tests {
    use crate::test_support::*;
    use auth::Role;
    use axum::http::{Method, StatusCode};
    use serde_json::json;

    #[tokio::test]
    async fn test_stats() {
        let state = test_state().await;
        let token = token_for(&state, "asha", Role::Volunteer).await;
        token_for(&state, "ravi", Role::Official).await;

        send(
            &state,
            Method::POST,
            "/surveys",
            Some(&token),
            Some(json!({"location": "Well 1"})),
        )
        .await;

        let response = send(&state, Method::GET, "/stats", Some(&token), None).await;
        let body = expect_json(response, StatusCode::OK).await;
        assert_eq!(body["total_users"], 2);
        assert_eq!(body["active_users"], 0);
        assert_eq!(body["pending_approvals"], 1);
        assert_eq!(body["total_submissions"], 1);
    }

    #[tokio::test]
    async fn test_stats_requires_token() {
        let state = test_state().await;
        let response = send(&state, Method::GET, "/stats", None, None).await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }
}
