use std::io;

use tracing_subscriber::{fmt, EnvFilter};

use crate::config::{Config, LogFormat};

/// Failure to install the global subscriber, usually because one is already set
pub type TelemetryError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Install the global tracing subscriber
///
/// `RUST_LOG` takes precedence over the configured filter. Logs go to stderr so they never
/// mix with responses written to stdout.
pub fn init_logging(config: &Config) -> Result<(), TelemetryError> {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.log_filter));
    let builder = fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_writer(io::stderr);
    match config.log_format {
        LogFormat::Compact => builder.compact().try_init(),
        LogFormat::Json => builder.json().try_init(),
    }
}
