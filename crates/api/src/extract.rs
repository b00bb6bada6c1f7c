//! Request authentication

use crate::error::ApiError;
use crate::AppState;
use auth::{Claims, Role};
use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts},
};
use std::sync::Arc;

/// Caller identity taken from a verified bearer token
#[derive(Debug, Clone)]
pub struct AuthUser(pub Claims);

impl AuthUser {
    pub fn user_id(&self) -> i64 {
        self.0.user_id
    }

    pub fn role(&self) -> Role {
        self.0.role
    }

    /// Require a role allowed to review surveys and manage alerts
    pub fn require_reviewer(&self) -> Result<(), ApiError> {
        if !self.role().can_review() {
            tracing::warn!(
                "Reviewer role required but user {} has role '{}'",
                self.0.username,
                self.role()
            );
            return Err(ApiError::Forbidden);
        }
        Ok(())
    }
}

#[async_trait]
impl FromRequestParts<Arc<AppState>> for AuthUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let token = bearer_token(parts).ok_or(ApiError::MissingToken)?;
        let claims = state.tokens.verify(token)?;
        Ok(AuthUser(claims))
    }
}

/// Token from the `Authorization` header, with or without the `Bearer ` prefix
fn bearer_token(parts: &Parts) -> Option<&str> {
    let value = parts.headers.get(AUTHORIZATION)?.to_str().ok()?;
    let token = value.strip_prefix("Bearer ").unwrap_or(value).trim();
    (!token.is_empty()).then_some(token)
}
