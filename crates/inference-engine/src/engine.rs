//! Risk Scoring

use crate::artifact::ModelArtifact;
use crate::guidance::hygiene_tips;
use crate::tier::{RiskThresholds, RiskTier};
use crate::InferenceError;
use feature_engine::SensorRecord;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Instant;
use tracing::debug;

/// How many classes a result reports
pub const TOP_PREDICTIONS: usize = 3;

/// Allowed drift of the probability sum from 1.0
const PROBABILITY_SUM_TOLERANCE: f64 = 1e-3;

/// One ranked disease in a score result
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiseasePrediction {
    /// Disease class label
    pub disease: String,
    /// Probability as a percentage rounded to two decimals
    #[serde(rename = "probability")]
    pub probability_pct: f64,
    /// Tier of the raw probability
    pub risk_level: RiskTier,
    /// Guidance for this disease
    pub hygiene_tips: Vec<String>,
    /// Raw classifier probability
    #[serde(skip)]
    pub probability: f64,
}

/// Ranked, annotated outcome of scoring one record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreResult {
    /// Tier of the most probable class
    pub overall_status: RiskTier,
    /// Up to three most probable classes, most probable first
    pub predictions: Vec<DiseasePrediction>,
}

impl ScoreResult {
    /// Most probable class
    pub fn top(&self) -> Option<&DiseasePrediction> {
        self.predictions.first()
    }
}

/// Stateless scorer over an immutable model artifact
#[derive(Debug, Clone)]
pub struct RiskScorer {
    artifact: Arc<ModelArtifact>,
    thresholds: RiskThresholds,
}

impl RiskScorer {
    /// Create a scorer with the default tier thresholds
    pub fn new(artifact: Arc<ModelArtifact>) -> Self {
        Self {
            artifact,
            thresholds: RiskThresholds::default(),
        }
    }

    /// Override the tier thresholds
    pub fn with_thresholds(mut self, thresholds: RiskThresholds) -> Self {
        self.thresholds = thresholds;
        self
    }

    /// Loaded model artifact
    pub fn artifact(&self) -> &ModelArtifact {
        &self.artifact
    }

    /// Tier thresholds in use
    pub fn thresholds(&self) -> RiskThresholds {
        self.thresholds
    }

    /// Score a sensor record: assemble, impute, classify once and rank
    pub fn score(&self, record: &SensorRecord) -> Result<ScoreResult, InferenceError> {
        let start = Instant::now();

        let features = self.artifact.prepare(record)?;
        let probabilities = self.artifact.classifier().predict_proba(&features)?;
        let result = self.rank(&probabilities)?;

        debug!(
            "Scored record with {} classifier in {}us: {}",
            self.artifact.classifier().kind(),
            start.elapsed().as_micros(),
            result.overall_status
        );
        Ok(result)
    }

    /// Validate a class probability vector and turn it into a ranked result.
    ///
    /// Ties keep the lower class index first.
    pub fn rank(&self, probabilities: &[f64]) -> Result<ScoreResult, InferenceError> {
        let classes = self.artifact.disease_classes();
        validate_probabilities(probabilities, classes.len())?;

        let mut order: Vec<usize> = (0..probabilities.len()).collect();
        order.sort_by(|&a, &b| {
            probabilities[b]
                .partial_cmp(&probabilities[a])
                .unwrap_or(std::cmp::Ordering::Equal)
        });

        let max_probability = probabilities[order[0]];
        let predictions = order
            .into_iter()
            .take(TOP_PREDICTIONS)
            .map(|idx| {
                let disease = &classes[idx];
                let probability = probabilities[idx];
                DiseasePrediction {
                    disease: disease.clone(),
                    probability_pct: round_pct(probability),
                    risk_level: self.thresholds.tier(probability),
                    hygiene_tips: hygiene_tips(disease).iter().map(|t| t.to_string()).collect(),
                    probability,
                }
            })
            .collect();

        Ok(ScoreResult {
            overall_status: self.thresholds.tier(max_probability),
            predictions,
        })
    }
}

fn validate_probabilities(probabilities: &[f64], n_classes: usize) -> Result<(), InferenceError> {
    if probabilities.len() != n_classes {
        return Err(InferenceError::ModelError(format!(
            "classifier returned {} probabilities for {} classes",
            probabilities.len(),
            n_classes
        )));
    }
    if let Some(bad) = probabilities.iter().find(|p| !p.is_finite() || **p < 0.0) {
        return Err(InferenceError::ModelError(format!(
            "classifier returned invalid probability {}",
            bad
        )));
    }
    let sum: f64 = probabilities.iter().sum();
    if (sum - 1.0).abs() > PROBABILITY_SUM_TOLERANCE {
        return Err(InferenceError::ModelError(format!(
            "class probabilities sum to {}",
            sum
        )));
    }
    Ok(())
}

fn round_pct(probability: f64) -> f64 {
    (probability * 100.0 * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn scorer() -> RiskScorer {
        RiskScorer::new(Arc::new(ModelArtifact::mock()))
    }

    fn clean_record() -> SensorRecord {
        SensorRecord::new()
            .with("pH", 7.0)
            .with("turbidity", 0.5)
            .with("conductivity", 250.0)
            .with("water_temp", 22.0)
            .with("dissolved_oxygen", 8.0)
            .with("orp", 400.0)
            .with("ecoli_cfu", 0.0)
            .with("rainfall_mm", 5.0)
            .with("water_level", 2.0)
            .with("ambient_temp", 26.0)
            .with("ambient_humidity", 55.0)
            .with("gps_lat", 26.1)
            .with("gps_lon", 91.7)
    }

    fn contaminated_record() -> SensorRecord {
        clean_record()
            .with("ecoli_cfu", 800.0)
            .with("turbidity", 15.2)
            .with("pH", 5.8)
    }

    #[test]
    fn test_clean_water_is_safe() {
        let result = scorer().score(&clean_record()).unwrap();
        assert_eq!(result.overall_status, RiskTier::Safe);
        assert_eq!(result.predictions.len(), TOP_PREDICTIONS);
        assert!(result.predictions.iter().all(|p| p.risk_level == RiskTier::Safe));
    }

    #[test]
    fn test_contaminated_water_is_danger() {
        let result = scorer().score(&contaminated_record()).unwrap();
        let top = result.top().unwrap();

        assert_eq!(result.overall_status, RiskTier::Danger);
        assert_eq!(top.disease, "Cholera");
        assert!(top.probability >= 0.70);
        assert_eq!(top.hygiene_tips[0], "Boil water before drinking");
    }

    #[test]
    fn test_scoring_is_idempotent() {
        let scorer = scorer();
        let first = scorer.score(&contaminated_record()).unwrap();
        let second = scorer.score(&contaminated_record()).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_missing_required_field_is_invalid_input() {
        let mut record = SensorRecord::new();
        for (name, value) in [("turbidity", 0.5), ("ecoli_cfu", 0.0)] {
            record.insert(name, value);
        }

        let err = scorer().score(&record).unwrap_err();
        assert!(err.is_client_error());
        assert_eq!(err.to_string(), "Missing required field: pH");
    }

    #[test]
    fn test_non_numeric_value_is_invalid_input() {
        let record = clean_record().with("pH", "high");
        let err = scorer().score(&record).unwrap_err();
        assert!(matches!(err, InferenceError::InvalidInput(_)));
    }

    #[test]
    fn test_rank_ties_prefer_lower_index() {
        let result = scorer().rank(&[0.1, 0.3, 0.3, 0.0, 0.3]).unwrap();
        let diseases: Vec<&str> = result.predictions.iter().map(|p| p.disease.as_str()).collect();
        assert_eq!(diseases, vec!["Typhoid", "Diarrhea", "Safe"]);
    }

    #[test]
    fn test_rank_danger_boundary() {
        let result = scorer().rank(&[0.0, 0.30, 0.70, 0.0, 0.0]).unwrap();
        assert_eq!(result.overall_status, RiskTier::Danger);
        assert_eq!(result.predictions[0].disease, "Diarrhea");
        assert_eq!(result.predictions[0].probability_pct, 70.0);
        assert_eq!(result.predictions[1].risk_level, RiskTier::Safe);
    }

    #[test]
    fn test_rank_warning_boundary() {
        let result = scorer().rank(&[0.25, 0.40, 0.35, 0.0, 0.0]).unwrap();
        assert_eq!(result.overall_status, RiskTier::Warning);
        assert_eq!(result.predictions[0].risk_level, RiskTier::Warning);
        assert_eq!(result.predictions[1].risk_level, RiskTier::Safe);
    }

    #[test]
    fn test_rank_rounds_percentages() {
        let result = scorer().rank(&[0.123456, 0.876544, 0.0, 0.0, 0.0]).unwrap();
        assert_eq!(result.predictions[0].probability_pct, 87.65);
        assert_eq!(result.predictions[1].probability_pct, 12.35);
    }

    #[test]
    fn test_rank_rejects_wrong_length() {
        let err = scorer().rank(&[0.5, 0.5]).unwrap_err();
        assert!(matches!(err, InferenceError::ModelError(_)));
    }

    #[test]
    fn test_rank_rejects_non_finite() {
        let err = scorer().rank(&[f64::NAN, 0.25, 0.25, 0.25, 0.25]).unwrap_err();
        assert!(matches!(err, InferenceError::ModelError(_)));
    }

    #[test]
    fn test_rank_rejects_bad_sum() {
        let err = scorer().rank(&[0.5, 0.5, 0.5, 0.0, 0.0]).unwrap_err();
        assert!(matches!(err, InferenceError::ModelError(_)));
    }

    #[test]
    fn test_custom_thresholds() {
        let scorer = scorer().with_thresholds(RiskThresholds {
            danger: 0.9,
            warning: 0.5,
        });
        let result = scorer.rank(&[0.8, 0.2, 0.0, 0.0, 0.0]).unwrap();
        assert_eq!(result.overall_status, RiskTier::Warning);
    }

    #[test]
    fn test_serialized_shape() {
        let result = scorer().rank(&[0.8, 0.2, 0.0, 0.0, 0.0]).unwrap();
        let json = serde_json::to_value(&result).unwrap();

        assert_eq!(json["overall_status"], "danger");
        assert_eq!(json["predictions"][0]["disease"], "Cholera");
        assert_eq!(json["predictions"][0]["probability"], 80.0);
        assert_eq!(json["predictions"][0]["risk_level"], "danger");
        assert!(json["predictions"][0].get("probability_pct").is_none());
    }

    fn trained_scorer(dir: &std::path::Path) -> RiskScorer {
        RiskScorer::new(Arc::new(ModelArtifact::load(dir).unwrap()))
    }

    #[test]
    fn test_trained_model_scores_imputed_record() {
        let scorer = trained_scorer(&crate::test_fixtures::water_model_dir());
        let record: SensorRecord =
            serde_json::from_value(serde_json::json!({"pH": 7.1, "turbidity": null})).unwrap();

        let result = scorer.score(&record).unwrap();
        assert_eq!(result.predictions.len(), 2);
        let sum: f64 = result.predictions.iter().map(|p| p.probability).sum();
        assert!((sum - 1.0).abs() < 1e-3);
        assert_eq!(result.top().unwrap().disease, "Safe");
    }

    #[test]
    fn test_trained_model_flags_contamination() {
        let scorer = trained_scorer(&crate::test_fixtures::water_model_dir());
        let record = SensorRecord::new()
            .with("pH", 5.8)
            .with("turbidity", 15.2)
            .with("ecoli_cfu", 800.0);

        let result = scorer.score(&record).unwrap();
        let top = result.top().unwrap();
        assert_eq!(top.disease, "Cholera");
        assert_eq!(top.risk_level, RiskTier::Danger);
        assert_eq!(result.overall_status, RiskTier::Danger);
    }

    #[test]
    fn test_class_count_disagreeing_with_model_output() {
        let fixture = crate::test_fixtures::water_model_dir();
        let dir = tempfile::tempdir().unwrap();
        std::fs::copy(fixture.join("classifier.onnx"), dir.path().join("classifier.onnx")).unwrap();

        let manifest: String = std::fs::read_to_string(fixture.join(crate::MANIFEST_FILE)).unwrap();
        let mut manifest: serde_json::Value = serde_json::from_str(&manifest).unwrap();
        manifest["disease_classes"] = serde_json::json!(["Cholera", "Typhoid", "Safe"]);
        std::fs::write(dir.path().join(crate::MANIFEST_FILE), manifest.to_string()).unwrap();

        let record = SensorRecord::new().with("pH", 7.0);
        let err = trained_scorer(dir.path()).score(&record).unwrap_err();
        assert!(matches!(err, InferenceError::ModelError(_)));
    }

    fn distribution() -> impl Strategy<Value = Vec<f64>> {
        proptest::collection::vec(0u32..20, 5).prop_filter_map("all zero", |weights| {
            let total: u32 = weights.iter().sum();
            (total > 0).then(|| {
                weights
                    .iter()
                    .map(|w| *w as f64 / total as f64)
                    .collect::<Vec<f64>>()
            })
        })
    }

    proptest! {
        #[test]
        fn prop_ranking_is_non_increasing_and_stable(probs in distribution()) {
            let result = scorer().rank(&probs).unwrap();
            let classes = ModelArtifact::mock().disease_classes().to_vec();
            let index_of = |name: &str| classes.iter().position(|c| c == name).unwrap();

            prop_assert_eq!(result.predictions.len(), TOP_PREDICTIONS);
            for pair in result.predictions.windows(2) {
                prop_assert!(pair[0].probability >= pair[1].probability);
                if pair[0].probability == pair[1].probability {
                    prop_assert!(index_of(&pair[0].disease) < index_of(&pair[1].disease));
                }
            }

            let max = probs.iter().copied().fold(0.0, f64::max);
            prop_assert_eq!(result.predictions[0].probability, max);
            prop_assert_eq!(result.overall_status, RiskThresholds::default().tier(max));
        }

        #[test]
        fn prop_tier_matches_thresholds(p in 0.0f64..=1.0) {
            let tier = RiskThresholds::default().tier(p);
            let expected = if p >= 0.70 {
                RiskTier::Danger
            } else if p >= 0.40 {
                RiskTier::Warning
            } else {
                RiskTier::Safe
            };
            prop_assert_eq!(tier, expected);
        }
    }
}
