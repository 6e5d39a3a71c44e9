//! Value types shared by both databroker protocol generations

use serde::{Deserialize, Serialize};

/// A typed signal value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Value {
    String(String),
    Bool(bool),
    Int32(i32),
    Int64(i64),
    Uint32(u32),
    Uint64(u64),
    Float(f32),
    Double(f64),
}

impl Value {
    pub fn as_float(&self) -> Option<f32> {
        match self {
            Value::Float(v) => Some(*v),
            _ => None,
        }
    }
}

/// A value sample. `value` is absent when the signal has never been set.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Datapoint {
    /// Milliseconds since the Unix epoch
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp_ms: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<Value>,
}

impl Datapoint {
    pub fn new(value: Value) -> Self {
        Self {
            timestamp_ms: None,
            value: Some(value),
        }
    }

    pub fn float(value: f32) -> Self {
        Self::new(Value::Float(value))
    }

    pub fn as_float(&self) -> Option<f32> {
        self.value.as_ref().and_then(Value::as_float)
    }
}
