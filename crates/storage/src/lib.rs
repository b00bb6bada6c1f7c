//! Storage Layer
//!
//! SQLite persistence for user accounts, field surveys, persisted risk
//! predictions and public health alerts.

mod models;
mod repository;
mod schema;

pub use models::{
    Alert, AlertSeverity, AlertStatus, NewAlert, NewPrediction, NewSurvey, NewUser,
    PredictionRecord, Survey, SurveyStatus, SystemStats, User, WaterQuality,
};
pub use repository::Repository;

use thiserror::Error;

/// Storage errors
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Database error: {0}")]
    DatabaseError(String),
    #[error("Record not found")]
    NotFound,
    #[error("Conflict: {0}")]
    Conflict(String),
    #[error("Invalid value: {0}")]
    InvalidValue(String),
    #[error("Serialization error: {0}")]
    SerializationError(String),
}

impl From<sqlx::Error> for StorageError {
    fn from(err: sqlx::Error) -> Self {
        match &err {
            sqlx::Error::RowNotFound => StorageError::NotFound,
            sqlx::Error::Database(db) if db.is_unique_violation() => {
                StorageError::Conflict(db.message().to_string())
            }
            sqlx::Error::Database(db) if db.is_check_violation() => {
                StorageError::InvalidValue(db.message().to_string())
            }
            _ => StorageError::DatabaseError(err.to_string()),
        }
    }
}

impl From<serde_json::Error> for StorageError {
    fn from(err: serde_json::Error) -> Self {
        StorageError::SerializationError(err.to_string())
    }
}
