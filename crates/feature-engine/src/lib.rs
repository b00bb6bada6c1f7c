//! Feature Engineering Engine
//!
//! Turns loosely-typed water-quality sensor records into the fixed-order
//! numeric vectors a trained classifier expects.

mod error;
mod features;
mod record;
mod schema;

pub use error::FeatureError;
pub use features::{FeatureAssembler, FeatureVector, MISSING};
pub use record::SensorRecord;
pub use schema::{FeatureSchema, FeatureSlot, CORE_SENSOR_FEATURES, PRESENCE_PREFIX};
