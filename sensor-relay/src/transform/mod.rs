use std::str::FromStr;

use serde_json::Value;

use crate::SensorMessage;

mod dew_point;
mod error;
mod numeric;
mod unit_conversion;

pub use dew_point::DewPoint;
pub use error::TransformError;
pub use numeric::{NumberPolicy, read_number, to_fixed};
pub use unit_conversion::UnitConversion;

/// The `data` section of a sensor message.
pub type Payload = serde_json::Map<String, Value>;

pub const TEMPERATURE: &str = "temperature";
pub const HUMIDITY: &str = "humidity";

/// Reduce-and-derive over a flat numeric payload.
///
/// Implementors only describe which fields they produce and how to compute
/// them. [`PayloadTransform::apply`] builds the output message from scratch,
/// so no input field can leak into it.
pub trait PayloadTransform {
    fn name(&self) -> &'static str;

    /// Keys of the output payload, in the order `derive` yields them.
    fn output_fields(&self) -> &'static [&'static str];

    /// Reads the required inputs and computes every output field.
    fn derive(&self, data: &Payload) -> Result<Vec<(&'static str, f64)>, TransformError>;

    fn apply(&self, message: &SensorMessage) -> Result<SensorMessage, TransformError> {
        let derived = self.derive(&message.data)?;
        debug_assert!(
            derived.iter().map(|(k, _)| *k).eq(self.output_fields().iter().copied()),
            "{} derived fields out of step with its output set",
            self.name()
        );

        let data: Payload = derived
            .into_iter()
            .map(|(field, value)| (field.to_string(), Value::String(to_fixed(value))))
            .collect();

        Ok(SensorMessage {
            timestamp: message.timestamp,
            data,
            envelope: message.envelope.clone(),
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransformKind {
    UnitConversion,
    DewPoint,
}

impl TransformKind {
    pub fn build(self, policy: NumberPolicy) -> Transformer {
        match self {
            TransformKind::UnitConversion => Transformer::UnitConversion(UnitConversion::new(policy)),
            TransformKind::DewPoint => Transformer::DewPoint(DewPoint::new(policy)),
        }
    }
}

impl FromStr for TransformKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "unit-conversion" | "c-to-f" => Ok(TransformKind::UnitConversion),
            "dew-point" | "dewpoint" => Ok(TransformKind::DewPoint),
            other => Err(format!(
                "unknown transform '{other}', expected 'unit-conversion' or 'dew-point'"
            )),
        }
    }
}

/// Runtime-selected variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transformer {
    UnitConversion(UnitConversion),
    DewPoint(DewPoint),
}

impl PayloadTransform for Transformer {
    fn name(&self) -> &'static str {
        match self {
            Transformer::UnitConversion(t) => t.name(),
            Transformer::DewPoint(t) => t.name(),
        }
    }

    fn output_fields(&self) -> &'static [&'static str] {
        match self {
            Transformer::UnitConversion(t) => t.output_fields(),
            Transformer::DewPoint(t) => t.output_fields(),
        }
    }

    fn derive(&self, data: &Payload) -> Result<Vec<(&'static str, f64)>, TransformError> {
        match self {
            Transformer::UnitConversion(t) => t.derive(data),
            Transformer::DewPoint(t) => t.derive(data),
        }
    }
}

pub(crate) fn celsius_to_fahrenheit(celsius: f64) -> f64 {
    celsius * 9.0 / 5.0 + 32.0
}
