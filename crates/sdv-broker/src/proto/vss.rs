//! Typed VSS signal models
//!
//! A model binds a signal path to a Rust value type so callers never touch
//! raw datapoints.

use super::{Datapoint, Value};

/// A VSS signal with a fixed path and typed value
pub trait VssSignal: Sized + Send + 'static {
    /// Dotted VSS path, e.g. `"Vehicle.Speed"`
    const PATH: &'static str;

    fn to_datapoint(&self) -> Datapoint;

    /// Decode from a datapoint; `None` if the value is absent or mistyped
    fn from_datapoint(datapoint: &Datapoint) -> Option<Self>;
}

/// Vehicle speed in km/h
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct VssSpeed {
    pub value: f32,
}

impl VssSpeed {
    pub fn new(value: f32) -> Self {
        Self { value }
    }
}

impl VssSignal for VssSpeed {
    const PATH: &'static str = "Vehicle.Speed";

    fn to_datapoint(&self) -> Datapoint {
        Datapoint::new(Value::Float(self.value))
    }

    fn from_datapoint(datapoint: &Datapoint) -> Option<Self> {
        datapoint.as_float().map(Self::new)
    }
}
