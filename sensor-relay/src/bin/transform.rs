use std::process::ExitCode;

use sensor_relay::{
    config::RelayConfig,
    error::RelayError,
    filter::transform_lines,
    telemetry::{self, Console},
};
use tokio::io::BufReader;
use tracing::info;

/// Applies the configured transform to newline-delimited JSON on stdin.
#[tokio::main]
async fn main() -> Result<ExitCode, RelayError> {
    let config = RelayConfig::from_env()?;
    let _guard = telemetry::init(
        "sensor-transform",
        &config.log_filter,
        config.log_dir.as_deref(),
        Console::Stderr,
    );
    let transformer = config.transformer();

    let summary = transform_lines(
        &transformer,
        BufReader::new(tokio::io::stdin()),
        &mut tokio::io::stdout(),
        &mut tokio::io::stderr(),
    )
    .await?;

    info!(lines = summary.lines, failed = summary.failed, "Done");
    Ok(if summary.failed == 0 {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}
