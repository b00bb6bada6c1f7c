//! Alert Routes

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use storage::{Alert, AlertStatus, NewAlert};

use crate::{ApiError, AppState, AuthUser};

/// Response for the alert list
#[derive(Debug, Serialize)]
pub struct AlertList {
    pub alerts: Vec<Alert>,
    pub count: usize,
    pub active_count: usize,
}

#[derive(Debug, Serialize)]
pub struct AlertCreated {
    pub message: &'static str,
    pub alert_id: i64,
    pub alert: Alert,
}

#[derive(Debug, Deserialize)]
pub struct StatusUpdate {
    pub status: String,
}

#[derive(Debug, Serialize)]
pub struct AlertUpdated {
    pub message: &'static str,
    pub alert: Alert,
}

/// All alerts, newest first
pub async fn list_alerts(State(state): State<Arc<AppState>>) -> Result<Json<AlertList>, ApiError> {
    let alerts = state.repository.list_alerts().await?;
    let active = alerts
        .iter()
        .filter(|a| a.status == AlertStatus::Active.as_str())
        .count();

    Ok(Json(AlertList {
        count: alerts.len(),
        active_count: active,
        alerts,
    }))
}

/// Raise an alert as the signed-in user
pub async fn create_alert(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    payload: Result<Json<NewAlert>, JsonRejection>,
) -> Result<Json<AlertCreated>, ApiError> {
    let Json(mut alert) = payload?;
    alert.title = alert.title.trim().to_string();
    alert.location = alert.location.trim().to_string();
    if alert.title.is_empty() || alert.location.is_empty() {
        return Err(ApiError::BadRequest(
            "Title and location are required".to_string(),
        ));
    }

    let alert = state
        .repository
        .create_alert(alert, Some(user.user_id()))
        .await?;
    Ok(Json(AlertCreated {
        message: "Alert created successfully",
        alert_id: alert.id,
        alert,
    }))
}

/// Move an alert through its lifecycle; officials and admins only
pub async fn update_status(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Path(id): Path<i64>,
    payload: Result<Json<StatusUpdate>, JsonRejection>,
) -> Result<Json<AlertUpdated>, ApiError> {
    user.require_reviewer()?;
    let Json(update) = payload?;
    let status: AlertStatus = update.status.parse()?;

    let alert = state.repository.update_alert_status(id, status).await?;
    Ok(Json(AlertUpdated {
        message: "Alert status updated",
        alert,
    }))
}

#[cfg(test)]
mod tests {
    use crate::test_support::*;
    use auth::Role;
    use axum::http::{Method, StatusCode};
    use serde_json::{json, Value};

    fn outbreak() -> Value {
        json!({
            "title": "Cholera cluster",
            "description": "Six cases near the ghat",
            "severity": "critical",
            "location": "Majuli",
            "disease_type": "Cholera",
            "cases_count": 6
        })
    }

    #[tokio::test]
    async fn test_alerts_are_public_but_creation_is_not() {
        let state = test_state().await;

        let response = send(&state, Method::GET, "/alerts", None, None).await;
        let body = expect_json(response, StatusCode::OK).await;
        assert_eq!(body["count"], 0);

        let response = send(&state, Method::POST, "/alerts", None, Some(outbreak())).await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_alert_lifecycle() {
        let state = test_state().await;
        let volunteer = token_for(&state, "asha", Role::Volunteer).await;
        let admin = token_for(&state, "root", Role::Admin).await;

        let response = send(&state, Method::POST, "/alerts", Some(&volunteer), Some(outbreak())).await;
        let body = expect_json(response, StatusCode::OK).await;
        assert_eq!(body["alert"]["status"], "active");
        assert_eq!(body["alert"]["severity"], "critical");
        let uri = format!("/alerts/{}/status", body["alert_id"]);

        let response = send(&state, Method::GET, "/alerts", None, None).await;
        let body = expect_json(response, StatusCode::OK).await;
        assert_eq!(body["active_count"], 1);

        let response = send(
            &state,
            Method::PATCH,
            &uri,
            Some(&volunteer),
            Some(json!({"status": "resolved"})),
        )
        .await;
        let body = expect_json(response, StatusCode::FORBIDDEN).await;
        assert_eq!(body["error"], "Insufficient permissions");

        let response = send(
            &state,
            Method::PATCH,
            &uri,
            Some(&admin),
            Some(json!({"status": "investigating"})),
        )
        .await;
        let body = expect_json(response, StatusCode::OK).await;
        assert_eq!(body["alert"]["status"], "investigating");

        let response = send(&state, Method::GET, "/alerts", None, None).await;
        let body = expect_json(response, StatusCode::OK).await;
        assert_eq!(body["active_count"], 0);
    }

    #[tokio::test]
    async fn test_alert_validation() {
        let state = test_state().await;
        let token = token_for(&state, "asha", Role::Volunteer).await;

        let mut unknown_severity = outbreak();
        unknown_severity["severity"] = json!("apocalyptic");
        let response =
            send(&state, Method::POST, "/alerts", Some(&token), Some(unknown_severity)).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let mut blank_title = outbreak();
        blank_title["title"] = json!("  ");
        let response = send(&state, Method::POST, "/alerts", Some(&token), Some(blank_title)).await;
        let body = expect_json(response, StatusCode::BAD_REQUEST).await;
        assert_eq!(body["error"], "Title and location are required");
    }
}
