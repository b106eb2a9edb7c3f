pub mod resolver;
pub mod schema;
pub mod source;
pub mod value;

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

pub use resolver::{Extractor, SyntheticField, VariableResolver};
pub use schema::{FieldDefinition, FieldKind, TelemetrySchema};
pub use source::{ChannelSampleSource, JsonLinesSampleSource, MemorySampleSource, SampleSource};
pub use value::Value;

/// A raw telemetry field as reported by the sim.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum FieldValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    Array(Vec<f64>),
}

impl FieldValue {
    /// Numeric reading of the field, booleans read as 1 or 0. Arrays have no scalar reading.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            FieldValue::Bool(b) => Some(if *b { 1. } else { 0. }),
            FieldValue::Int(i) => Some(*i as f64),
            FieldValue::Float(f) => Some(*f),
            FieldValue::Array(_) => None,
        }
    }

    pub fn as_list(&self) -> Vec<f64> {
        match self {
            FieldValue::Array(values) => values.clone(),
            other => other.as_f64().into_iter().collect(),
        }
    }
}

impl From<f64> for FieldValue {
    fn from(value: f64) -> Self {
        FieldValue::Float(value)
    }
}

impl From<i64> for FieldValue {
    fn from(value: i64) -> Self {
        FieldValue::Int(value)
    }
}

impl From<bool> for FieldValue {
    fn from(value: bool) -> Self {
        FieldValue::Bool(value)
    }
}

impl From<Vec<f64>> for FieldValue {
    fn from(value: Vec<f64>) -> Self {
        FieldValue::Array(value)
    }
}

/// Values derived per sample by the lap, stint and gap trackers.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SyntheticFields {
    /// Lap on which the car last left the pits
    pub last_pit_lap: Option<f64>,
    /// Speed estimated from lap distance progress, m/s
    pub estimated_speed: Option<f64>,
    /// Precipitation on track, 0-1
    pub track_precipitation: Option<f64>,
    /// Mandatory repair time left, s
    pub repairs_remaining: Option<f64>,
    /// Optional repair time left, s
    pub optional_repairs_remaining: Option<f64>,
    /// Fuel used since the start of the current lap
    pub lap_fuel_used: Option<f64>,
    /// Laps completed in the current stint
    pub stint_lap: Option<f64>,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
pub struct Sample {
    /// Seconds since the session started
    pub session_time: f64,
    /// Completed laps plus the fraction of the current lap
    pub driver_distance: f32,
    #[serde(default)]
    pub raw: HashMap<String, FieldValue>,
    #[serde(default)]
    pub synthetic: SyntheticFields,
}

impl Sample {
    pub fn new(session_time: f64, driver_distance: f32) -> Self {
        Self {
            session_time,
            driver_distance,
            ..Default::default()
        }
    }

    pub fn with_field(mut self, raw_key: &str, value: impl Into<FieldValue>) -> Self {
        self.raw.insert(raw_key.to_string(), value.into());
        self
    }

    pub fn with_synthetic(mut self, synthetic: SyntheticFields) -> Self {
        self.synthetic = synthetic;
        self
    }

    /// Scalar reading of a raw field, 0 when the sample does not carry it.
    pub fn raw_f64(&self, raw_key: &str) -> f64 {
        self.raw
            .get(raw_key)
            .and_then(FieldValue::as_f64)
            .unwrap_or(0.)
    }

    pub fn raw_list(&self, raw_key: &str) -> Vec<f64> {
        self.raw
            .get(raw_key)
            .map(FieldValue::as_list)
            .unwrap_or_default()
    }
}

/// One processor output, stamped with the position of the sample that produced it.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct ResultPoint {
    pub session_time: f64,
    pub driver_distance: f32,
    pub value: Value,
}

impl ResultPoint {
    pub fn at(sample: &Sample, value: Value) -> Self {
        Self {
            session_time: sample.session_time,
            driver_distance: sample.driver_distance,
            value,
        }
    }
}
