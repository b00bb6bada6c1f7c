//! Account Routes

use auth::{hash_password, verify_password, Role};
use axum::{
    extract::{rejection::JsonRejection, State},
    Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use storage::{NewUser, StorageError, User};
use tracing::{info, warn};

use crate::{ApiError, AppState};

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub username: Option<String>,
    pub password: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub token: String,
    pub user: UserInfo,
}

/// Public view of an account
#[derive(Debug, Serialize)]
pub struct UserInfo {
    pub id: i64,
    pub username: String,
    pub email: String,
    pub role: String,
    pub full_name: String,
}

impl From<User> for UserInfo {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            username: user.username,
            email: user.email,
            role: user.role,
            full_name: user.full_name,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub username: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
    pub full_name: Option<String>,
    pub role: Option<String>,
    pub phone: Option<String>,
    pub location: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct RegisterResponse {
    pub message: &'static str,
    pub user_id: i64,
}

/// Exchange username and password for a signed token
pub async fn login(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> Result<Json<LoginResponse>, ApiError> {
    let Json(request) = payload?;
    let (username, password) = match (non_empty(request.username), secret(request.password)) {
        (Some(username), Some(password)) => (username, password),
        _ => {
            return Err(ApiError::BadRequest(
                "Username and password required".to_string(),
            ))
        }
    };

    let user = state
        .repository
        .find_user_by_username(&username)
        .await?
        .ok_or(ApiError::InvalidCredentials)?;

    let stored_hash = user.password_hash.clone();
    let valid = tokio::task::spawn_blocking(move || verify_password(&password, &stored_hash))
        .await
        .map_err(|e| ApiError::Internal(format!("password check failed: {}", e)))?;
    match valid {
        Ok(true) => {}
        Ok(false) => return Err(ApiError::InvalidCredentials),
        Err(e) => {
            warn!("Stored password hash for {} is unusable: {}", user.username, e);
            return Err(ApiError::InvalidCredentials);
        }
    }

    let role: Role = user.role.parse()?;
    let token = state.tokens.issue(user.id, &user.username, role)?;
    state.repository.update_last_login(user.id).await?;

    info!("User {} logged in", user.username);
    Ok(Json(LoginResponse {
        token,
        user: user.into(),
    }))
}

/// Create an account; self-registration may not claim the admin role
pub async fn register(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<RegisterRequest>, JsonRejection>,
) -> Result<Json<RegisterResponse>, ApiError> {
    let Json(request) = payload?;

    let (username, email, password, full_name) = match (
        non_empty(request.username),
        non_empty(request.email),
        secret(request.password),
        non_empty(request.full_name),
    ) {
        (Some(u), Some(e), Some(p), Some(f)) => (u, e, p, f),
        _ => return Err(ApiError::BadRequest("Missing required fields".to_string())),
    };

    let role = match non_empty(request.role) {
        Some(role) => role.parse::<Role>()?,
        None => Role::default(),
    };
    if role == Role::Admin {
        return Err(ApiError::BadRequest(
            "Admin accounts cannot be self-registered".to_string(),
        ));
    }

    let password_hash = tokio::task::spawn_blocking(move || hash_password(&password))
        .await
        .map_err(|e| ApiError::Internal(format!("password hashing failed: {}", e)))??;

    let created = state
        .repository
        .create_user(NewUser {
            username,
            email,
            password_hash,
            role: role.as_str().to_string(),
            full_name,
            phone: non_empty(request.phone),
            location: non_empty(request.location),
        })
        .await;

    let user = match created {
        Ok(user) => user,
        Err(StorageError::Conflict(_)) => {
            return Err(ApiError::BadRequest(
                "Username or email already exists".to_string(),
            ))
        }
        Err(e) => return Err(e.into()),
    };

    info!("Registered {} account {}", user.role, user.username);
    Ok(Json(RegisterResponse {
        message: "User created successfully",
        user_id: user.id,
    }))
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Passwords are taken verbatim; only an empty one counts as missing
fn secret(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use crate::test_support::*;
    use axum::http::{Method, StatusCode};
    use serde_json::json;

    fn registration() -> serde_json::Value {
        json!({
            "username": "asha",
            "email": "asha@example.org",
            "password": "river-stone",
            "full_name": "Asha Devi",
            "location": "Majuli"
        })
    }

    #[tokio::test]
    async fn test_register_then_login() {
        let state = test_state().await;

        let response = send(&state, Method::POST, "/auth/register", None, Some(registration())).await;
        let body = expect_json(response, StatusCode::OK).await;
        assert_eq!(body["message"], "User created successfully");
        let user_id = body["user_id"].as_i64().unwrap();

        let response = send(
            &state,
            Method::POST,
            "/auth/login",
            None,
            Some(json!({"username": "asha", "password": "river-stone"})),
        )
        .await;
        let body = expect_json(response, StatusCode::OK).await;

        assert_eq!(body["user"]["id"], user_id);
        assert_eq!(body["user"]["role"], "volunteer");
        assert!(body["user"].get("password_hash").is_none());

        let claims = state.tokens.verify(body["token"].as_str().unwrap()).unwrap();
        assert_eq!(claims.username, "asha");

        let user = state.repository.find_user_by_id(user_id).await.unwrap().unwrap();
        assert!(user.last_login.is_some());
    }

    #[tokio::test]
    async fn test_login_wrong_password() {
        let state = test_state().await;
        send(&state, Method::POST, "/auth/register", None, Some(registration())).await;

        let response = send(
            &state,
            Method::POST,
            "/auth/login",
            None,
            Some(json!({"username": "asha", "password": "wrong"})),
        )
        .await;
        let body = expect_json(response, StatusCode::UNAUTHORIZED).await;
        assert_eq!(body["error"], "Invalid credentials");

        let response = send(
            &state,
            Method::POST,
            "/auth/login",
            None,
            Some(json!({"username": "ghost", "password": "wrong"})),
        )
        .await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_login_missing_fields() {
        let state = test_state().await;
        let response = send(
            &state,
            Method::POST,
            "/auth/login",
            None,
            Some(json!({"username": "asha"})),
        )
        .await;
        let body = expect_json(response, StatusCode::BAD_REQUEST).await;
        assert_eq!(body["error"], "Username and password required");
    }

    #[tokio::test]
    async fn test_register_validation() {
        let state = test_state().await;

        let mut missing = registration();
        missing.as_object_mut().unwrap().remove("full_name");
        let response = send(&state, Method::POST, "/auth/register", None, Some(missing)).await;
        let body = expect_json(response, StatusCode::BAD_REQUEST).await;
        assert_eq!(body["error"], "Missing required fields");

        let mut admin = registration();
        admin["role"] = json!("admin");
        let response = send(&state, Method::POST, "/auth/register", None, Some(admin)).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let mut bogus = registration();
        bogus["role"] = json!("mayor");
        let response = send(&state, Method::POST, "/auth/register", None, Some(bogus)).await;
        let body = expect_json(response, StatusCode::BAD_REQUEST).await;
        assert_eq!(body["error"], "Invalid role: mayor");
    }

    #[tokio::test]
    async fn test_password_whitespace_is_kept() {
        let state = test_state().await;
        let mut padded = registration();
        padded["password"] = json!("  river stone  ");
        let response = send(&state, Method::POST, "/auth/register", None, Some(padded)).await;
        expect_json(response, StatusCode::OK).await;

        let response = send(
            &state,
            Method::POST,
            "/auth/login",
            None,
            Some(json!({"username": "asha", "password": "river stone"})),
        )
        .await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

        let response = send(
            &state,
            Method::POST,
            "/auth/login",
            None,
            Some(json!({"username": "asha", "password": "  river stone  "})),
        )
        .await;
        expect_json(response, StatusCode::OK).await;
    }

    #[tokio::test]
    async fn test_blank_password_is_accepted_as_given() {
        let state = test_state().await;
        let mut blank = registration();
        blank["password"] = json!("   ");
        let response = send(&state, Method::POST, "/auth/register", None, Some(blank)).await;
        expect_json(response, StatusCode::OK).await;

        let mut empty = registration();
        empty["username"] = json!("ravi");
        empty["email"] = json!("ravi@example.org");
        empty["password"] = json!("");
        let response = send(&state, Method::POST, "/auth/register", None, Some(empty)).await;
        let body = expect_json(response, StatusCode::BAD_REQUEST).await;
        assert_eq!(body["error"], "Missing required fields");
    }

    #[tokio::test]
    async fn test_register_duplicate() {
        let state = test_state().await;
        send(&state, Method::POST, "/auth/register", None, Some(registration())).await;

        let mut dup = registration();
        dup["email"] = json!("second@example.org");
        let response = send(&state, Method::POST, "/auth/register", None, Some(dup)).await;
        let body = expect_json(response, StatusCode::BAD_REQUEST).await;
        assert_eq!(body["error"], "Username or email already exists");
    }

    #[tokio::test]
    async fn test_official_registration() {
        let state = test_state().await;
        let mut official = registration();
        official["role"] = json!("official");

        let response = send(&state, Method::POST, "/auth/register", None, Some(official)).await;
        let body = expect_json(response, StatusCode::OK).await;
        let user = state
            .repository
            .find_user_by_id(body["user_id"].as_i64().unwrap())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(user.role, "official");
    }
}
