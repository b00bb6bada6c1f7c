//! Feature Vector Assembly

use crate::error::FeatureError;
use crate::record::SensorRecord;
use crate::schema::FeatureSchema;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Sentinel for a slot the record explicitly left empty
pub const MISSING: f64 = f64::NAN;

/// Feature vector for ML inference, positionally aligned to a schema
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureVector {
    /// Raw feature values
    pub values: Vec<f64>,
}

impl FeatureVector {
    /// Wrap raw values
    pub fn new(values: Vec<f64>) -> Self {
        Self { values }
    }

    /// Number of features
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Whether the vector is empty
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Values as a slice
    pub fn as_slice(&self) -> &[f64] {
        &self.values
    }

    /// Whether any slot still holds the missing sentinel
    pub fn has_missing(&self) -> bool {
        self.values.iter().any(|v| v.is_nan())
    }

    /// Replace every missing sentinel with the fill value at the same position
    pub fn fill_missing(&mut self, fills: &[f64]) -> Result<(), FeatureError> {
        if fills.len() != self.values.len() {
            return Err(FeatureError::SchemaMismatch {
                expected: self.values.len(),
                actual: fills.len(),
            });
        }

        for (value, fill) in self.values.iter_mut().zip(fills) {
            if value.is_nan() {
                *value = *fill;
            }
        }
        Ok(())
    }

    /// Values narrowed to f32 for tensor input
    pub fn to_f32(&self) -> Vec<f32> {
        self.values.iter().map(|v| *v as f32).collect()
    }
}

/// Maps sensor records onto a fixed feature schema
#[derive(Debug, Clone)]
pub struct FeatureAssembler {
    schema: FeatureSchema,
}

impl FeatureAssembler {
    /// Create an assembler for a schema
    pub fn new(schema: FeatureSchema) -> Self {
        Self { schema }
    }

    /// Schema this assembler targets
    pub fn schema(&self) -> &FeatureSchema {
        &self.schema
    }

    /// Build the feature vector for a record.
    ///
    /// Supplied values win; `has_<base>` slots report whether `base` was
    /// supplied; required slots must hold a number; explicit nulls in other
    /// slots become [`MISSING`]; anything else takes the slot default.
    pub fn assemble(&self, record: &SensorRecord) -> Result<FeatureVector, FeatureError> {
        let mut values = Vec::with_capacity(self.schema.len());

        for slot in self.schema.slots() {
            let value = match record.numeric(&slot.name)? {
                Some(v) => v,
                None => match slot.presence_base() {
                    Some(base) => {
                        if record.is_supplied(base) {
                            1.0
                        } else {
                            0.0
                        }
                    }
                    None if slot.required => {
                        return Err(if record.contains(&slot.name) {
                            FeatureError::InvalidValue {
                                field: slot.name.clone(),
                                value: "null".to_string(),
                            }
                        } else {
                            FeatureError::MissingField(slot.name.clone())
                        });
                    }
                    None if record.contains(&slot.name) => MISSING,
                    None => slot.default,
                },
            };
            values.push(value);
        }

        let vector = FeatureVector::new(values);
        debug!(
            "Assembled {} features from {} readings (missing={})",
            vector.len(),
            record.len(),
            vector.has_missing()
        );
        Ok(vector)
    }
}
