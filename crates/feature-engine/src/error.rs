//! Feature Assembly Error Types

use thiserror::Error;

/// Errors while building a schema or assembling a feature vector
#[derive(Debug, Clone, PartialEq, Error)]
pub enum FeatureError {
    /// A required feature was not supplied
    #[error("Missing required field: {0}")]
    MissingField(String),

    /// A supplied value is not a finite number
    #[error("Invalid value for {field}: must be a number")]
    InvalidValue { field: String, value: String },

    /// The schema definition itself is malformed
    #[error("Invalid feature schema: {0}")]
    InvalidSchema(String),

    /// Vector length disagrees with the schema
    #[error("Schema mismatch: expected {expected} features, got {actual}")]
    SchemaMismatch { expected: usize, actual: usize },
}

impl FeatureError {
    /// Whether the caller can fix this by correcting the request
    pub fn is_input_error(&self) -> bool {
        matches!(self, FeatureError::MissingField(_) | FeatureError::InvalidValue { .. })
    }
}
