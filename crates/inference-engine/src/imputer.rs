//! Missing Value Imputation

use crate::InferenceError;
use feature_engine::FeatureVector;
use serde::{Deserialize, Serialize};

/// Fills missing slots with per-slot values learned at training time
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MedianImputer {
    statistics: Vec<f64>,
}

impl MedianImputer {
    /// Create an imputer from learned fill values, one per schema slot
    pub fn new(statistics: Vec<f64>) -> Result<Self, InferenceError> {
        if let Some(pos) = statistics.iter().position(|v| !v.is_finite()) {
            return Err(InferenceError::ModelLoadError(format!(
                "imputer statistic at position {} is not finite",
                pos
            )));
        }
        Ok(Self { statistics })
    }

    /// Number of slots this imputer covers
    pub fn len(&self) -> usize {
        self.statistics.len()
    }

    /// Whether the imputer covers no slots
    pub fn is_empty(&self) -> bool {
        self.statistics.is_empty()
    }

    /// Learned fill values
    pub fn statistics(&self) -> &[f64] {
        &self.statistics
    }

    /// Replace missing sentinels with the learned values
    pub fn transform(&self, mut features: FeatureVector) -> Result<FeatureVector, InferenceError> {
        features.fill_missing(&self.statistics)?;
        Ok(features)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use feature_engine::MISSING;

    #[test]
    fn test_fills_only_missing() {
        let imputer = MedianImputer::new(vec![7.0, 2.5, 40.0]).unwrap();
        let features = FeatureVector::new(vec![6.5, MISSING, 12.0]);

        let out = imputer.transform(features).unwrap();
        assert_eq!(out.values, vec![6.5, 2.5, 12.0]);
    }

    #[test]
    fn test_length_mismatch_is_model_error() {
        let imputer = MedianImputer::new(vec![7.0]).unwrap();
        let err = imputer.transform(FeatureVector::new(vec![1.0, 2.0])).unwrap_err();
        assert!(matches!(err, InferenceError::ModelError(_)));
    }

    #[test]
    fn test_rejects_non_finite_statistics() {
        assert!(MedianImputer::new(vec![1.0, f64::NAN]).is_err());
    }
}
