//! Logging setup for the template service.
//!
//! Log verbosity comes from `RUST_LOG` (default `info`); the output format is
//! chosen by `log.format` in the configuration.
//!
//! | Format | Output |
//! |--------|--------|
//! | `text` | Human-readable lines (default) |
//! | `json` | One JSON object per event |

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::{LogConfig, LogFormat};

/// Default filter when `RUST_LOG` is not set
pub const DEFAULT_FILTER: &str = "info";

fn env_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER))
}

/// Install the global tracing subscriber.
///
/// Returns an error if a global subscriber is already set.
pub fn init_logging(config: &LogConfig) -> Result<(), tracing_subscriber::util::TryInitError> {
    match config.format {
        LogFormat::Text => tracing_subscriber::registry()
            .with(env_filter())
            .with(tracing_subscriber::fmt::layer())
            .try_init()?,
        LogFormat::Json => tracing_subscriber::registry()
            .with(env_filter())
            .with(tracing_subscriber::fmt::layer().json())
            .try_init()?,
    }

    tracing::info!(format = ?config.format, "Logging initialized");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = LogConfig::default();
        assert_eq!(config.format, LogFormat::Text);
    }

    #[test]
    fn test_second_init_fails() {
        let config = LogConfig::default();
        // Whichever call wins, the global subscriber can only be set once
        let first = init_logging(&config);
        let second = init_logging(&config);
        assert!(first.is_err() || second.is_err());
    }
}
