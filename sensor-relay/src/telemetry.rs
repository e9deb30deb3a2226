use std::path::Path;

use tracing_appender::non_blocking::WorkerGuard;
use tracing_bunyan_formatter::{BunyanFormattingLayer, JsonStorageLayer};
use tracing_subscriber::fmt::writer::BoxMakeWriter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Registry};

/// Where console log records go. The stdin filter keeps stdout for data.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Console {
    Stdout,
    Stderr,
}

/// Installs the global subscriber: bunyan JSON on the console and, with a
/// `log_dir`, a daily rolling file as well.
///
/// `RUST_LOG` wins over `default_filter`. Keep the returned guard alive for
/// as long as records should reach the file.
pub fn init(
    name: &str,
    default_filter: &str,
    log_dir: Option<&Path>,
    console: Console,
) -> Option<WorkerGuard> {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    let console_writer = match console {
        Console::Stdout => BoxMakeWriter::new(std::io::stdout),
        Console::Stderr => BoxMakeWriter::new(std::io::stderr),
    };
    let console_layer = BunyanFormattingLayer::new(name.to_string(), console_writer);

    let (file_layer, guard) = match log_dir {
        Some(dir) => {
            let appender = tracing_appender::rolling::daily(dir, format!("{name}.log"));
            let (writer, guard) = tracing_appender::non_blocking(appender);
            (
                Some(BunyanFormattingLayer::new(name.to_string(), writer)),
                Some(guard),
            )
        }
        None => (None, None),
    };

    if Registry::default()
        .with(filter)
        .with(JsonStorageLayer)
        .with(console_layer)
        .with(file_layer)
        .try_init()
        .is_err()
    {
        tracing::warn!("global subscriber already installed, keeping it");
    }

    guard
}
