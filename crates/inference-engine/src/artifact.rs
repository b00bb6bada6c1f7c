//! Model Artifact Loading

use crate::classifier::{Classifier, MockClassifier, OnnxClassifier};
use crate::imputer::MedianImputer;
use crate::InferenceError;
use feature_engine::{FeatureAssembler, FeatureSchema, FeatureVector, SensorRecord};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Manifest file expected inside a model directory
pub const MANIFEST_FILE: &str = "manifest.json";

/// Disease classes of the development model, in probability order
pub const DEFAULT_DISEASE_CLASSES: [&str; 5] = ["Cholera", "Typhoid", "Diarrhea", "HepatitisA", "Safe"];

fn default_probability_output() -> usize {
    1
}

/// Imputation section of a manifest
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImputerSpec {
    /// Strategy used at training time (informational)
    #[serde(default = "default_strategy")]
    pub strategy: String,
    /// Learned fill value per feature slot
    pub statistics: Vec<f64>,
}

fn default_strategy() -> String {
    "median".to_string()
}

/// On-disk description of a trained model
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelManifest {
    /// Feature names in the order the classifier consumes them
    pub feature_names: Vec<String>,
    /// Features a request must supply explicitly
    #[serde(default)]
    pub required_features: Vec<String>,
    /// Per-feature default for absent optional features
    #[serde(default)]
    pub defaults: HashMap<String, f64>,
    /// Class labels, index-aligned with classifier output
    pub disease_classes: Vec<String>,
    /// ONNX graph, relative to the manifest
    pub classifier: PathBuf,
    /// Which graph output holds class probabilities
    #[serde(default = "default_probability_output")]
    pub probability_output: usize,
    /// Optional missing-value imputer
    #[serde(default)]
    pub imputer: Option<ImputerSpec>,
}

impl ModelManifest {
    /// Read a manifest from a JSON file
    pub fn from_file(path: &Path) -> Result<Self, InferenceError> {
        let raw = std::fs::read_to_string(path).map_err(|e| {
            InferenceError::ModelLoadError(format!("{}: {}", path.display(), e))
        })?;
        serde_json::from_str(&raw).map_err(|e| {
            InferenceError::ModelLoadError(format!("{}: {}", path.display(), e))
        })
    }
}

/// Everything needed to score a request, fixed at startup
#[derive(Debug)]
pub struct ModelArtifact {
    assembler: FeatureAssembler,
    disease_classes: Vec<String>,
    classifier: Classifier,
    imputer: Option<MedianImputer>,
}

impl ModelArtifact {
    /// Assemble an artifact from parts, checking they agree with each other
    pub fn new(
        schema: FeatureSchema,
        disease_classes: Vec<String>,
        classifier: Classifier,
        imputer: Option<MedianImputer>,
    ) -> Result<Self, InferenceError> {
        validate_classes(&disease_classes)?;

        if let Some(imputer) = &imputer {
            if imputer.len() != schema.len() {
                return Err(InferenceError::SchemaMismatch {
                    expected: schema.len(),
                    actual: imputer.len(),
                });
            }
        }

        Ok(Self {
            assembler: FeatureAssembler::new(schema),
            disease_classes,
            classifier,
            imputer,
        })
    }

    /// Development artifact: water-quality schema, default classes, mock
    /// classifier and no imputer
    pub fn mock() -> Self {
        let schema = FeatureSchema::water_quality();
        let classes: Vec<String> = DEFAULT_DISEASE_CLASSES.iter().map(|c| c.to_string()).collect();
        let classifier = Classifier::Mock(MockClassifier::new(&schema, &classes));

        Self {
            assembler: FeatureAssembler::new(schema),
            disease_classes: classes,
            classifier,
            imputer: None,
        }
    }

    /// Load a trained artifact from a model directory
    pub fn load(dir: &Path) -> Result<Self, InferenceError> {
        let manifest_path = dir.join(MANIFEST_FILE);
        info!("Loading model manifest from {}", manifest_path.display());

        let manifest = ModelManifest::from_file(&manifest_path)?;
        let schema = FeatureSchema::from_names(
            &manifest.feature_names,
            &manifest.required_features,
            &manifest.defaults,
        )?;

        let imputer = match manifest.imputer {
            Some(spec) => {
                debug!("Manifest imputer strategy: {}", spec.strategy);
                Some(MedianImputer::new(spec.statistics)?)
            }
            None => None,
        };
        if let Some(imputer) = &imputer {
            if imputer.len() != schema.len() {
                return Err(InferenceError::SchemaMismatch {
                    expected: schema.len(),
                    actual: imputer.len(),
                });
            }
        }
        validate_classes(&manifest.disease_classes)?;

        let classifier = OnnxClassifier::load(
            &dir.join(&manifest.classifier),
            schema.len(),
            manifest.probability_output,
        )?;

        let artifact = Self::new(
            schema,
            manifest.disease_classes,
            Classifier::Onnx(classifier),
            imputer,
        )?;
        info!(
            "Model loaded: {} features, {} classes, imputer={}",
            artifact.schema().len(),
            artifact.disease_classes.len(),
            artifact.imputer.is_some()
        );
        Ok(artifact)
    }

    /// Load a trained artifact, or fall back to the mock artifact when the
    /// directory holds no manifest. A manifest that exists but is broken is
    /// still an error.
    pub fn load_or_mock(dir: &Path) -> Result<Self, InferenceError> {
        if dir.join(MANIFEST_FILE).is_file() {
            Self::load(dir)
        } else {
            warn!(
                "No model manifest in {}, using mock classifier",
                dir.display()
            );
            Ok(Self::mock())
        }
    }

    /// Feature schema the classifier was trained on
    pub fn schema(&self) -> &FeatureSchema {
        self.assembler.schema()
    }

    /// Disease classes, index-aligned with classifier output
    pub fn disease_classes(&self) -> &[String] {
        &self.disease_classes
    }

    /// Classifier backend
    pub fn classifier(&self) -> &Classifier {
        &self.classifier
    }

    /// Attached imputer, if any
    pub fn imputer(&self) -> Option<&MedianImputer> {
        self.imputer.as_ref()
    }

    /// Whether this artifact runs the development stand-in
    pub fn is_mock(&self) -> bool {
        matches!(self.classifier, Classifier::Mock(_))
    }

    /// Assemble a record and resolve missing slots, yielding the exact
    /// vector handed to the classifier
    pub fn prepare(&self, record: &SensorRecord) -> Result<FeatureVector, InferenceError> {
        let mut features = self.assembler.assemble(record)?;

        if features.has_missing() {
            features = match &self.imputer {
                Some(imputer) => imputer.transform(features)?,
                None => {
                    let defaults: Vec<f64> = self.schema().slots().iter().map(|s| s.default).collect();
                    features.fill_missing(&defaults)?;
                    features
                }
            };
        }

        if features.len() != self.schema().len() {
            return Err(InferenceError::ModelError(format!(
                "feature vector has {} values for a {}-slot schema",
                features.len(),
                self.schema().len()
            )));
        }
        Ok(features)
    }
}

fn validate_classes(classes: &[String]) -> Result<(), InferenceError> {
    if classes.is_empty() {
        return Err(InferenceError::ModelLoadError("model has no disease classes".to_string()));
    }
    let mut seen = HashSet::with_capacity(classes.len());
    if let Some(dup) = classes.iter().find(|c| !seen.insert(c.as_str())) {
        return Err(InferenceError::ModelLoadError(format!("duplicate disease class: {}", dup)));
    }
    Ok(())
}
