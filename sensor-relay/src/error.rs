#[derive(Debug, thiserror::Error)]
pub enum RelayError {
    #[error("Error communicating with MQTT broker: {0}")]
    Network(#[from] std::io::Error),
    #[error("Error processing packet: {0}")]
    Mqtt(#[from] mqttrs::Error),
    #[error("Mqtt protocol error: {0}")]
    Protocol(String),
    #[error("Processing timeout")]
    Timeout,
    #[error("Config loading error: {0}")]
    Config(#[from] dotenvy::Error),
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
    #[error("Threading error: {0}")]
    Threading(#[from] tokio::task::JoinError),
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
