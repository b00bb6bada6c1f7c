//! Sensor Record

use crate::error::FeatureError;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Sensor readings keyed by feature name, as received from a client.
///
/// Values stay untyped until assembly so that bad input can be reported
/// per field instead of failing the whole body.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SensorRecord {
    values: Map<String, Value>,
}

impl SensorRecord {
    /// Empty record
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a reading
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        self.values.insert(name.into(), value.into());
    }

    /// Builder-style insert
    pub fn with(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert(name, value);
        self
    }

    /// Raw value for a feature
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.values.get(name)
    }

    /// Whether the key exists at all, even with a null value
    pub fn contains(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }

    /// Whether the feature was supplied with a non-null value
    pub fn is_supplied(&self, name: &str) -> bool {
        matches!(self.values.get(name), Some(v) if !v.is_null())
    }

    /// Numeric reading for a feature.
    ///
    /// `Ok(None)` when the key is absent or null. Numbers and numeric strings
    /// are accepted; everything else is rejected, as is any value that is not
    /// finite once narrowed to the f32 the classifier consumes.
    pub fn numeric(&self, name: &str) -> Result<Option<f64>, FeatureError> {
        let value = match self.values.get(name) {
            None | Some(Value::Null) => return Ok(None),
            Some(v) => v,
        };

        let parsed = match value {
            Value::Number(n) => n.as_f64(),
            Value::String(s) => s.trim().parse::<f64>().ok(),
            _ => None,
        };

        match parsed {
            Some(v) if v.is_finite() && v.abs() <= f32::MAX as f64 => Ok(Some(v)),
            _ => Err(FeatureError::InvalidValue {
                field: name.to_string(),
                value: value.to_string(),
            }),
        }
    }

    /// Number of keys in the record
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Whether the record has no keys
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl From<Map<String, Value>> for SensorRecord {
    fn from(values: Map<String, Value>) -> Self {
        Self { values }
    }
}

impl<K: Into<String>> FromIterator<(K, f64)> for SensorRecord {
    fn from_iter<I: IntoIterator<Item = (K, f64)>>(iter: I) -> Self {
        let mut record = SensorRecord::new();
        for (name, value) in iter {
            record.insert(name, value);
        }
        record
    }
}
