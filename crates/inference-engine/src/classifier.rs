//! Classifier Backends

use crate::InferenceError;
use feature_engine::{FeatureSchema, FeatureVector};
use std::fmt;
use std::path::{Path, PathBuf};
use tracing::{debug, info};
use tract_onnx::prelude::*;

type OnnxPlan = SimplePlan<TypedFact, Box<dyn TypedOp>, Graph<TypedFact, Box<dyn TypedOp>>>;

/// Probabilistic multi-class classifier selected once at startup
#[derive(Debug)]
pub enum Classifier {
    /// Trained model exported to ONNX
    Onnx(OnnxClassifier),
    /// Heuristic stand-in for development without a trained artifact
    Mock(MockClassifier),
}

impl Classifier {
    /// Class probabilities for one feature vector, index-aligned with the
    /// artifact's disease classes
    pub fn predict_proba(&self, features: &FeatureVector) -> Result<Vec<f64>, InferenceError> {
        match self {
            Classifier::Onnx(model) => model.predict_proba(features),
            Classifier::Mock(model) => Ok(model.predict_proba(features)),
        }
    }

    /// Short backend name for logs and health output
    pub fn kind(&self) -> &'static str {
        match self {
            Classifier::Onnx(_) => "onnx",
            Classifier::Mock(_) => "mock",
        }
    }
}

/// ONNX classifier executed with tract
pub struct OnnxClassifier {
    plan: OnnxPlan,
    path: PathBuf,
    n_features: usize,
    probability_output: usize,
}

impl OnnxClassifier {
    /// Load and optimize an ONNX graph taking a `[1, n_features]` f32 input
    pub fn load(
        path: &Path,
        n_features: usize,
        probability_output: usize,
    ) -> Result<Self, InferenceError> {
        info!("Loading ONNX classifier from {}", path.display());

        let plan = tract_onnx::onnx()
            .model_for_path(path)
            .and_then(|model| model.with_input_fact(0, f32::fact([1, n_features]).into()))
            .and_then(|model| model.into_optimized())
            .and_then(|model| model.into_runnable())
            .map_err(|e| {
                InferenceError::ModelLoadError(format!("{}: {}", path.display(), e))
            })?;

        let outputs = plan.model().outputs.len();
        if probability_output >= outputs {
            return Err(InferenceError::ModelLoadError(format!(
                "probability output {} requested but model has {} outputs",
                probability_output, outputs
            )));
        }

        Ok(Self {
            plan,
            path: path.to_path_buf(),
            n_features,
            probability_output,
        })
    }

    /// Path the graph was loaded from
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn predict_proba(&self, features: &FeatureVector) -> Result<Vec<f64>, InferenceError> {
        if features.len() != self.n_features {
            return Err(InferenceError::ModelError(format!(
                "classifier expects {} features, got {}",
                self.n_features,
                features.len()
            )));
        }

        let input = Tensor::from_shape(&[1, self.n_features], &features.to_f32())
            .map_err(|e| InferenceError::ModelError(e.to_string()))?;

        let outputs = self
            .plan
            .run(tvec!(input.into()))
            .map_err(|e| InferenceError::ModelError(format!("Inference failed: {}", e)))?;

        let tensor = outputs.get(self.probability_output).ok_or_else(|| {
            InferenceError::ModelError(format!("missing output {}", self.probability_output))
        })?;

        let probabilities = tensor
            .cast_to::<f32>()
            .map_err(|e| InferenceError::ModelError(e.to_string()))?;
        let values = probabilities
            .as_slice::<f32>()
            .map_err(|e| InferenceError::ModelError(e.to_string()))?
            .iter()
            .map(|p| *p as f64)
            .collect();

        Ok(values)
    }
}

impl fmt::Debug for OnnxClassifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OnnxClassifier")
            .field("path", &self.path)
            .field("n_features", &self.n_features)
            .field("probability_output", &self.probability_output)
            .finish()
    }
}

/// Deterministic heuristic classifier.
///
/// Contamination signals add to per-class logits which are then softmaxed,
/// so a clean sample yields a flat distribution. Classes and readings it does
/// not know by name are left at the baseline.
#[derive(Debug, Clone)]
pub struct MockClassifier {
    classes: Vec<String>,
    ph: Option<usize>,
    turbidity: Option<usize>,
    ecoli: Option<usize>,
    water_temp: Option<usize>,
}

impl MockClassifier {
    /// Bind the heuristics to a schema and class list
    pub fn new(schema: &FeatureSchema, classes: &[String]) -> Self {
        info!("Creating mock classifier over {} classes", classes.len());
        Self {
            classes: classes.to_vec(),
            ph: schema.position("pH"),
            turbidity: schema.position("turbidity"),
            ecoli: schema.position("ecoli_cfu"),
            water_temp: schema.position("water_temp"),
        }
    }

    fn predict_proba(&self, features: &FeatureVector) -> Vec<f64> {
        let read = |slot: Option<usize>| {
            slot.and_then(|i| features.as_slice().get(i).copied())
                .filter(|v| v.is_finite())
        };

        let mut logits = vec![0.0; self.classes.len()];

        if let Some(coliform) = read(self.ecoli) {
            if coliform > 5.0 {
                self.bump(&mut logits, "Cholera", 1.5);
                self.bump(&mut logits, "Diarrhea", 1.0);
                self.bump(&mut logits, "HepatitisA", 0.5);
            }
            if coliform > 100.0 {
                self.bump(&mut logits, "Cholera", 2.0);
            }
        }

        if read(self.turbidity).is_some_and(|ntu| ntu > 4.0) {
            self.bump(&mut logits, "Cholera", 0.5);
            self.bump(&mut logits, "HepatitisA", 0.8);
        }

        if read(self.ph).is_some_and(|ph| !(6.5..=8.5).contains(&ph)) {
            self.bump(&mut logits, "Typhoid", 0.8);
            self.bump(&mut logits, "Diarrhea", 0.4);
        }

        if read(self.water_temp).is_some_and(|t| t > 30.0) {
            self.bump(&mut logits, "Cholera", 0.6);
            self.bump(&mut logits, "Diarrhea", 0.4);
        }

        debug!("Mock logits: {:?}", logits);
        softmax(&logits)
    }

    fn bump(&self, logits: &mut [f64], class: &str, amount: f64) {
        if let Some(i) = self.classes.iter().position(|c| c == class) {
            logits[i] += amount;
        }
    }
}

fn softmax(logits: &[f64]) -> Vec<f64> {
    let max = logits.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let exps: Vec<f64> = logits.iter().map(|z| (z - max).exp()).collect();
    let sum: f64 = exps.iter().sum();
    exps.into_iter().map(|e| e / sum).collect()
}
