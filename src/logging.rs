//! Tracing subscriber setup
//!
//! Logs go to stderr; stdout is reserved for hook responses and command
//! output. `RUST_LOG` overrides the configured level when set.

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::{LogFormat, LoggingConfig};
use crate::error::{GuardrailError, Result};

/// Install the global subscriber. Fails if one is already installed.
pub fn init_logging(config: &LoggingConfig) -> Result<()> {
    let filter = build_filter(&config.level)?;

    match config.format {
        LogFormat::Json => init_json_subscriber(filter),
        LogFormat::Pretty => init_pretty_subscriber(filter),
    }
}

fn build_filter(level: &str) -> Result<EnvFilter> {
    if let Ok(filter) = EnvFilter::try_from_default_env() {
        return Ok(filter);
    }
    EnvFilter::try_new(level)
        .map_err(|err| GuardrailError::Logging(format!("invalid filter {level:?}: {err}")))
}

fn init_json_subscriber(filter: EnvFilter) -> Result<()> {
    let layer = fmt::layer()
        .json()
        .with_current_span(false)
        .with_target(true)
        .with_writer(std::io::stderr);

    tracing_subscriber::registry()
        .with(filter)
        .with(layer)
        .try_init()
        .map_err(|_| already_initialized())
}

fn init_pretty_subscriber(filter: EnvFilter) -> Result<()> {
    let layer = fmt::layer()
        .with_target(false)
        .compact()
        .with_writer(std::io::stderr);

    tracing_subscriber::registry()
        .with(filter)
        .with(layer)
        .try_init()
        .map_err(|_| already_initialized())
}

fn already_initialized() -> GuardrailError {
    GuardrailError::Logging("subscriber already initialized".to_string())
}
