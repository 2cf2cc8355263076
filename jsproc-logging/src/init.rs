use super::{LogFormat, LoggingConfig};
use anyhow::Result;
use tracing_subscriber::EnvFilter;

/// Install the global `tracing` subscriber described by `config`
///
/// An invalid filter expression falls back to `RUST_LOG`, then to `info`.
/// Returns `Ok(false)` when another subscriber was already installed, which
/// happens when an embedder configured tracing itself.
pub fn init_logging_from_config(config: &LoggingConfig) -> Result<bool> {
    let filter = EnvFilter::try_new(config.filter_expression())
        .or_else(|_| EnvFilter::try_from_default_env())
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_thread_ids(config.thread_ids)
        .with_thread_names(config.thread_ids)
        .with_file(config.include_location)
        .with_line_number(config.include_location);

    let installed = match config.format {
        LogFormat::Json => builder.json().try_init(),
        LogFormat::Compact => builder.compact().try_init(),
        LogFormat::Pretty => builder.pretty().try_init(),
        LogFormat::Text => builder.try_init(),
    }
    .is_ok();

    if !installed {
        tracing::debug!("tracing subscriber already set; keeping it");
    }
    Ok(installed)
}

/// Subscriber for test binaries: output goes through the test harness
/// capture, filtered by `RUST_LOG` (default `warn`). Safe to call from every test.
pub fn init_test_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_test_writer()
        .with_thread_names(true)
        .try_init();
}
