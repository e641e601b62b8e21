// Tracing initialization for the foreman binary

use anyhow::Result;
use tracing_subscriber::{fmt, EnvFilter};

use crate::config::ObservabilityConfig;

/// Initialize the global tracing subscriber.
///
/// RUST_LOG takes precedence; otherwise the configured log level applies.
pub fn init_telemetry(config: &ObservabilityConfig) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.log_level.clone()));

    if config.json_logs {
        fmt().with_env_filter(filter).json().try_init()
    } else {
        fmt().with_env_filter(filter).try_init()
    }
    .map_err(|e| anyhow::anyhow!("Failed to initialize tracing subscriber: {e}"))?;

    Ok(())
}
