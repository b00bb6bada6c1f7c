//! Feature Schema

use crate::error::FeatureError;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

/// Prefix marking a presence indicator slot (`has_pH` means "was pH supplied")
pub const PRESENCE_PREFIX: &str = "has_";

/// Core water-quality sensor readings, in training order
pub const CORE_SENSOR_FEATURES: [&str; 13] = [
    "pH",
    "turbidity",
    "conductivity",
    "water_temp",
    "dissolved_oxygen",
    "orp",
    "ecoli_cfu",
    "rainfall_mm",
    "water_level",
    "ambient_temp",
    "ambient_humidity",
    "gps_lat",
    "gps_lon",
];

/// A single named position in the feature vector
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureSlot {
    /// Feature name as the model was trained on it
    pub name: String,
    /// Value used when the record does not mention this feature
    #[serde(default)]
    pub default: f64,
    /// Whether a record must supply this feature explicitly
    #[serde(default)]
    pub required: bool,
}

impl FeatureSlot {
    /// Optional slot with a zero default
    pub fn optional(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            default: 0.0,
            required: false,
        }
    }

    /// Slot the record must supply
    pub fn required(name: impl Into<String>) -> Self {
        Self {
            required: true,
            ..Self::optional(name)
        }
    }

    /// Base feature name if this slot is a presence indicator
    pub fn presence_base(&self) -> Option<&str> {
        self.name
            .strip_prefix(PRESENCE_PREFIX)
            .filter(|base| !base.is_empty())
    }
}

/// Ordered feature slots fixed when a model is loaded
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureSchema {
    slots: Vec<FeatureSlot>,
}

impl FeatureSchema {
    /// Build a schema, rejecting empty or duplicated slot lists
    pub fn new(slots: Vec<FeatureSlot>) -> Result<Self, FeatureError> {
        if slots.is_empty() {
            return Err(FeatureError::InvalidSchema("schema has no features".to_string()));
        }

        let mut seen = HashSet::with_capacity(slots.len());
        for slot in &slots {
            if slot.name.is_empty() {
                return Err(FeatureError::InvalidSchema("empty feature name".to_string()));
            }
            if !seen.insert(slot.name.as_str()) {
                return Err(FeatureError::InvalidSchema(format!(
                    "duplicate feature name: {}",
                    slot.name
                )));
            }
            if !slot.default.is_finite() {
                return Err(FeatureError::InvalidSchema(format!(
                    "non-finite default for {}",
                    slot.name
                )));
            }
        }

        Ok(Self { slots })
    }

    /// Build a schema from ordered names plus required and default overrides.
    ///
    /// Every required name must appear in `names`.
    pub fn from_names(
        names: &[String],
        required: &[String],
        defaults: &HashMap<String, f64>,
    ) -> Result<Self, FeatureError> {
        let known: HashSet<&str> = names.iter().map(String::as_str).collect();
        if let Some(unknown) = required.iter().find(|r| !known.contains(r.as_str())) {
            return Err(FeatureError::InvalidSchema(format!(
                "required feature {} is not in the schema",
                unknown
            )));
        }
        if let Some(unknown) = defaults.keys().find(|d| !known.contains(d.as_str())) {
            return Err(FeatureError::InvalidSchema(format!(
                "default given for unknown feature {}",
                unknown
            )));
        }

        let slots = names
            .iter()
            .map(|name| FeatureSlot {
                name: name.clone(),
                default: defaults.get(name).copied().unwrap_or(0.0),
                required: required.contains(name),
            })
            .collect();

        Self::new(slots)
    }

    /// Schema used by the development model: every core sensor reading is
    /// required, followed by one presence indicator per reading.
    pub fn water_quality() -> Self {
        let readings = CORE_SENSOR_FEATURES.iter().map(|name| FeatureSlot::required(*name));
        let indicators = CORE_SENSOR_FEATURES
            .iter()
            .map(|name| FeatureSlot::optional(format!("{}{}", PRESENCE_PREFIX, name)));

        Self {
            slots: readings.chain(indicators).collect(),
        }
    }

    /// Number of slots (and feature vector length)
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// Always false for a constructed schema
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Slots in vector order
    pub fn slots(&self) -> &[FeatureSlot] {
        &self.slots
    }

    /// Slot names in vector order
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.slots.iter().map(|s| s.name.as_str())
    }

    /// Vector position of a named feature
    pub fn position(&self, name: &str) -> Option<usize> {
        self.slots.iter().position(|s| s.name == name)
    }
}
