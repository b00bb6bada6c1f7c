//! Disease Risk Inference Engine
//!
//! Loads a trained classifier together with its feature schema and scores
//! sensor records into ranked, tiered disease risks.

mod artifact;
mod classifier;
mod engine;
mod guidance;
mod imputer;
mod tier;

pub use artifact::{ImputerSpec, ModelArtifact, ModelManifest, DEFAULT_DISEASE_CLASSES, MANIFEST_FILE};
pub use classifier::{Classifier, MockClassifier, OnnxClassifier};
pub use engine::{DiseasePrediction, RiskScorer, ScoreResult};
pub use guidance::{hygiene_tips, GENERAL_TIPS};
pub use imputer::MedianImputer;
pub use tier::{RiskThresholds, RiskTier};

use feature_engine::FeatureError;
use thiserror::Error;

/// Errors during model loading or scoring
#[derive(Debug, Error)]
pub enum InferenceError {
    /// The request cannot be scored as supplied
    #[error("{0}")]
    InvalidInput(String),
    /// The classifier failed or produced malformed output
    #[error("Model error: {0}")]
    ModelError(String),
    /// Artifact parts disagree on the feature count
    #[error("Schema mismatch: expected {expected} features, got {actual}")]
    SchemaMismatch { expected: usize, actual: usize },
    /// The artifact could not be read or is malformed
    #[error("Model load failed: {0}")]
    ModelLoadError(String),
}

impl InferenceError {
    /// Whether the caller should treat this as a bad request
    pub fn is_client_error(&self) -> bool {
        matches!(self, InferenceError::InvalidInput(_))
    }
}

impl From<FeatureError> for InferenceError {
    fn from(err: FeatureError) -> Self {
        match err {
            FeatureError::MissingField(_) | FeatureError::InvalidValue { .. } => {
                InferenceError::InvalidInput(err.to_string())
            }
            FeatureError::InvalidSchema(msg) => InferenceError::ModelLoadError(msg),
            // Only reachable per request, where it means a broken artifact
            FeatureError::SchemaMismatch { .. } => InferenceError::ModelError(err.to_string()),
        }
    }
}
