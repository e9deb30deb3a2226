use sensor_relay::{
    config::RelayConfig,
    error::RelayError,
    mqtt::MqttClient,
    telemetry::{self, Console},
    transform::PayloadTransform,
};
use tracing::{error, info};

#[tokio::main]
async fn main() -> Result<(), RelayError> {
    let config = RelayConfig::from_env()?;
    let _guard = telemetry::init(
        "sensor-relay",
        &config.log_filter,
        config.log_dir.as_deref(),
        Console::Stdout,
    );

    let transformer = config.transformer();
    info!(
        broker = %config.broker_socket_address(),
        input = %config.input_topic,
        output = %config.output_topic,
        transform = transformer.name(),
        number_policy = ?config.number_policy,
        "Starting sensor relay"
    );

    let (mqtt_client, handle) = MqttClient::run_forever(&config, transformer).await;

    let shutdown_client = mqtt_client.clone();
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                info!("Ctrl-C received");
                shutdown_client.shutdown();
            }
            Err(e) => error!(error = %e, "Unable to listen for shutdown signal"),
        }
    });

    let setup_client = mqtt_client.clone();
    tokio::spawn(async move {
        setup_client.wait_for_server_setup().await;
        info!("Relay is up and subscribed");
    });

    handle.await?;
    info!("Sensor relay stopped");
    Ok(())
}
