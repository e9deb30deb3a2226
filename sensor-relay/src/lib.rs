use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

pub mod config;
pub mod error;
pub mod filter;
pub mod mqtt;
pub mod telemetry;
pub mod transform;

use transform::{Payload, TransformError};

/// A sensor reading as it travels between publisher, relay and consumers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SensorMessage {
    /// Milliseconds since the epoch, carried through untouched.
    pub timestamp: i64,
    pub data: Payload,
    /// Any other top-level keys, passed along as received.
    #[serde(flatten)]
    pub envelope: Map<String, Value>,
}

impl SensorMessage {
    pub fn from_slice(bytes: &[u8]) -> Result<Self, TransformError> {
        Ok(serde_json::from_slice(bytes)?)
    }

    pub fn to_vec(&self) -> Result<Vec<u8>, serde_json::Error> {
        serde_json::to_vec(self)
    }

    pub fn datetime(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp_millis(self.timestamp)
    }
}

impl std::fmt::Display for SensorMessage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.datetime() {
            Some(datetime) => write!(f, "{}", datetime.to_rfc3339())?,
            None => write!(f, "{}", self.timestamp)?,
        }
        write!(f, " -")?;
        for (i, (name, value)) in self.data.iter().enumerate() {
            let sep = if i == 0 { " " } else { ", " };
            match value {
                Value::String(s) => write!(f, "{sep}{name}: {s}")?,
                other => write!(f, "{sep}{name}: {other}")?,
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn parses_sample_message() {
        let raw = br#"{"timestamp": 1519609945872, "data": {"range": 511, "degrees": 222.0, "temperature": 19.0, "humidity": 47.0}}"#;
        let message = SensorMessage::from_slice(raw).unwrap();
        assert_eq!(message.timestamp, 1519609945872);
        assert_eq!(message.data.len(), 4);
        assert_eq!(message.data["range"], json!(511));
    }

    #[test]
    fn missing_data_is_malformed() {
        let err = SensorMessage::from_slice(br#"{"timestamp": 1}"#).unwrap_err();
        assert!(matches!(err, TransformError::Malformed(ref m) if m.contains("data")));

        let err = SensorMessage::from_slice(br#"{"timestamp": 1, "data": null}"#).unwrap_err();
        assert!(matches!(err, TransformError::Malformed(_)));

        let err = SensorMessage::from_slice(b"not json").unwrap_err();
        assert!(matches!(err, TransformError::Malformed(_)));
    }

    #[test]
    fn extra_top_level_keys_are_kept() {
        let raw = br#"{"timestamp": 1, "device": "abc", "seq": 7, "data": {"temperature": 19.0}}"#;
        let message = SensorMessage::from_slice(raw).unwrap();
        assert_eq!(message.envelope["device"], json!("abc"));
        assert!(!message.envelope.contains_key("timestamp"));
        assert!(!message.envelope.contains_key("data"));

        let body: Value = serde_json::from_slice(&message.to_vec().unwrap()).unwrap();
        assert_eq!(body["device"], json!("abc"));
        assert_eq!(body["seq"], json!(7));
    }

    #[test]
    fn display_sorts_keys_and_renders_datetime() {
        let message: SensorMessage = serde_json::from_value(json!({
            "timestamp": 1519609945872_i64,
            "data": {"temperature_f": "66.2", "humidity": 47.0, "degrees": 222}
        }))
        .unwrap();

        assert_eq!(
            message.to_string(),
            "2018-02-26T01:52:25.872+00:00 - degrees: 222, humidity: 47.0, temperature_f: 66.2"
        );
    }

    #[test]
    fn display_falls_back_to_raw_timestamp() {
        let message = SensorMessage {
            timestamp: i64::MAX,
            data: Payload::new(),
            envelope: Map::new(),
        };
        assert_eq!(message.to_string(), format!("{} -", i64::MAX));
    }
}
