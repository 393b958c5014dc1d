//! Tracing setup
//!
//! The terminal is in raw mode for the whole session, so anything written to
//! stderr lands in the middle of the remote output. With a `log_file`
//! configured, events go there instead.

use crate::config::LoggingConfig;
use crate::errors::{ClientError, ClientResult, ConfigError};

use std::fs::OpenOptions;
use std::sync::Mutex;
use tracing_subscriber::EnvFilter;

/// Install the global subscriber
///
/// `RUST_LOG` takes precedence over the configured level.
pub fn init_logging(config: &LoggingConfig) -> ClientResult<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.level))
        .map_err(|e| {
            ClientError::Configuration(ConfigError::InvalidValue("level".into(), e.to_string()))
        })?;

    let builder = tracing_subscriber::fmt().with_env_filter(filter);

    let installed = match &config.log_file {
        Some(path) => {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .map_err(|e| ClientError::Configuration(ConfigError::Io(e)))?;
            builder
                .with_writer(Mutex::new(file))
                .with_ansi(false)
                .try_init()
        }
        None => builder.with_writer(std::io::stderr).try_init(),
    };

    // A subscriber installed earlier (tests, embedding) keeps precedence
    if let Err(e) = installed {
        tracing::debug!("tracing subscriber already set: {}", e);
    }
    Ok(())
}
