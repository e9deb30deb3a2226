use std::path::PathBuf;
use std::time::Duration;

use crate::error::RelayError;
use crate::mqtt::topic::{matches_filter, output_topic};
use crate::transform::{NumberPolicy, TransformKind, Transformer};

#[derive(Debug, Clone)]
pub struct RelayConfig {
    pub broker_address: String,
    pub broker_port: u16,
    pub client_id: String,
    pub input_topic: String,
    pub output_topic: String,
    pub transform: TransformKind,
    pub number_policy: NumberPolicy,
    pub keep_alive_secs: u16,
    pub reconnect_delay: Duration,
    pub log_dir: Option<PathBuf>,
    pub log_filter: String,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            broker_address: "127.0.0.1".to_string(),
            broker_port: 1883,
            client_id: "sensor-relay".to_string(),
            input_topic: "sensor/data/+".to_string(),
            output_topic: "sensor/derived/{device}".to_string(),
            transform: TransformKind::UnitConversion,
            number_policy: NumberPolicy::Strict,
            keep_alive_secs: 120,
            reconnect_delay: Duration::from_secs(5),
            log_dir: None,
            log_filter: "info".to_string(),
        }
    }
}

impl RelayConfig {
    /// Loads `.env` (or the file named by `RELAY_ENV_FILE`) and reads the
    /// process environment.
    pub fn from_env() -> Result<Self, RelayError> {
        match std::env::var("RELAY_ENV_FILE") {
            Ok(path) => {
                dotenvy::from_filename(path)?;
            }
            Err(_) => {
                dotenvy::dotenv().ok();
            }
        }
        Self::from_lookup(|key| dotenvy::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, RelayError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(address) = lookup("RELAY_BROKER_ADDRESS") {
            config.broker_address = address;
        }
        if let Some(port) = lookup("RELAY_BROKER_PORT") {
            config.broker_port = parse("RELAY_BROKER_PORT", &port)?;
        }
        if let Some(id) = lookup("RELAY_CLIENT_ID") {
            config.client_id = id;
        }
        if let Some(topic) = lookup("RELAY_INPUT_TOPIC") {
            config.input_topic = topic;
        }
        if let Some(topic) = lookup("RELAY_OUTPUT_TOPIC") {
            config.output_topic = topic;
        }
        if let Some(transform) = lookup("RELAY_TRANSFORM") {
            config.transform = transform.parse().map_err(RelayError::InvalidConfig)?;
        }
        if let Some(lenient) = lookup("RELAY_ACCEPT_NUMERIC_STRINGS") {
            config.number_policy = if is_truthy(&lenient) {
                NumberPolicy::AcceptNumericStrings
            } else {
                NumberPolicy::Strict
            };
        }
        if let Some(secs) = lookup("RELAY_KEEP_ALIVE_SECS") {
            config.keep_alive_secs = parse("RELAY_KEEP_ALIVE_SECS", &secs)?;
        }
        if let Some(secs) = lookup("RELAY_RECONNECT_DELAY_SECS") {
            config.reconnect_delay =
                Duration::from_secs(parse("RELAY_RECONNECT_DELAY_SECS", &secs)?);
        }
        if let Some(dir) = lookup("RELAY_LOG_DIR") {
            config.log_dir = Some(PathBuf::from(dir));
        }
        if let Some(filter) = lookup("RELAY_LOG_FILTER") {
            config.log_filter = filter;
        }

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), RelayError> {
        if self.broker_address.is_empty() {
            return Err(RelayError::InvalidConfig(
                "RELAY_BROKER_ADDRESS must not be empty".to_string(),
            ));
        }
        if self.client_id.is_empty() {
            return Err(RelayError::InvalidConfig(
                "RELAY_CLIENT_ID must not be empty".to_string(),
            ));
        }
        if self.keep_alive_secs == 0 {
            return Err(RelayError::InvalidConfig(
                "RELAY_KEEP_ALIVE_SECS must be greater than 0".to_string(),
            ));
        }
        if self.input_topic.is_empty() || self.output_topic.is_empty() {
            return Err(RelayError::InvalidConfig(
                "input and output topics must not be empty".to_string(),
            ));
        }
        if self.output_topic.contains(['+', '#']) {
            return Err(RelayError::InvalidConfig(format!(
                "output topic '{}' must not contain wildcards",
                self.output_topic
            )));
        }

        // Would the relay receive what it publishes? The device id comes from
        // the last level of a received topic, so any literal level of the
        // input filter may end up in the output topic.
        let feeds_back = std::iter::once("device")
            .chain(
                self.input_topic
                    .split('/')
                    .filter(|level| !matches!(*level, "+" | "#")),
            )
            .any(|device| {
                matches_filter(&self.input_topic, &output_topic(&self.output_topic, device))
            });
        if feeds_back {
            return Err(RelayError::InvalidConfig(format!(
                "input filter '{}' matches output topic '{}'",
                self.input_topic, self.output_topic
            )));
        }
        Ok(())
    }

    pub fn broker_socket_address(&self) -> String {
        format!("{}:{}", self.broker_address, self.broker_port)
    }

    pub fn transformer(&self) -> Transformer {
        self.transform.build(self.number_policy)
    }
}

fn parse<T: std::str::FromStr>(key: &str, value: &str) -> Result<T, RelayError> {
    value
        .trim()
        .parse()
        .map_err(|_| RelayError::InvalidConfig(format!("invalid {key}: '{value}'")))
}

fn is_truthy(value: &str) -> bool {
    value.eq_ignore_ascii_case("true") || value == "1" || value.eq_ignore_ascii_case("yes")
}
