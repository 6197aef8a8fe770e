use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use crate::config::LoggingConfig;
use crate::error::{NavError, NavResult};

/// Installs the process-wide subscriber used by the `secnav` binary.
///
/// `RUST_LOG` wins over the configured filter. The library itself never calls
/// this; embedding applications bring their own subscriber.
pub fn init_tracing(config: &LoggingConfig) -> NavResult<()> {
    let filter = build_filter(config)?;
    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_ansi(config.ansi)
                .with_writer(std::io::stderr),
        )
        .try_init()
        .map_err(|err| NavError::invalid_argument(format!("tracing already initialized: {err}")))
}

fn build_filter(config: &LoggingConfig) -> NavResult<EnvFilter> {
    if let Ok(filter) = EnvFilter::try_from_default_env() {
        return Ok(filter);
    }
    EnvFilter::try_new(&config.filter).map_err(|err| {
        NavError::invalid_argument(format!("invalid log filter '{}': {err}", config.filter))
    })
}
