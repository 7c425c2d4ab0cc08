use crate::config::{LogFormat, ObservabilityEnvConfig};
use anyhow::{Result, anyhow};
use tracing::Level;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{EnvFilter, fmt};

/// Install the global subscriber. Logs go to stderr so stdout stays free for
/// report output.
pub fn init_tracing(config: &ObservabilityEnvConfig) -> Result<()> {
    let filter = EnvFilter::from_default_env().add_directive(Level::INFO.into());
    let registry = tracing_subscriber::registry().with(filter);

    let result = match config.log_format {
        LogFormat::Pretty => registry
            .with(fmt::layer().with_target(false).with_writer(std::io::stderr).pretty())
            .try_init(),
        LogFormat::Json => registry
            .with(fmt::layer().with_target(false).with_writer(std::io::stderr).json())
            .try_init(),
    };
    result.map_err(|e| anyhow!("Failed to install tracing subscriber: {}", e))
}
