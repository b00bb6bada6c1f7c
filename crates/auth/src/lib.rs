//! Authentication Module
//!
//! Account credentials and session tokens:
//! - Argon2 password hashing
//! - User roles and permission checks
//! - HS256 signed tokens with expiry

mod password;
mod token;

pub use password::{hash_password, verify_password};
pub use token::{Claims, TokenService, DEFAULT_TOKEN_TTL_HOURS};

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Authentication error types
#[derive(Error, Debug)]
pub enum AuthError {
    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Invalid token")]
    InvalidToken,

    #[error("Token expired")]
    TokenExpired,

    #[error("Invalid role: {0}")]
    InvalidRole(String),

    #[error("Password hashing failed: {0}")]
    Hashing(String),

    #[error("Token signing failed: {0}")]
    Signing(String),

    #[error("Invalid configuration: {0}")]
    Config(String),
}

/// Account role
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Field volunteer submitting surveys and readings
    #[default]
    Volunteer,
    /// Health official reviewing surveys and alerts
    Official,
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Volunteer => "volunteer",
            Role::Official => "official",
            Role::Admin => "admin",
        }
    }

    /// Whether this role may approve surveys and change alert status
    pub fn can_review(&self) -> bool {
        matches!(self, Role::Official | Role::Admin)
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = AuthError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "volunteer" => Ok(Role::Volunteer),
            "official" => Ok(Role::Official),
            "admin" => Ok(Role::Admin),
            other => Err(AuthError::InvalidRole(other.to_string())),
        }
    }
}
