//! Logging initialisation

use std::fmt;
use std::str::FromStr;

use tracing_subscriber::EnvFilter;

use interpose_core::ConfigurationError;

/// Environment variable holding the log filter directives
pub const LOG_ENV: &str = "INTERPOSE_LOG";

/// Default filter when [`LOG_ENV`] is unset or invalid
pub const DEFAULT_FILTER: &str = "info";

/// Log output format
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

impl FromStr for LogFormat {
    type Err = ConfigurationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "text" => Ok(LogFormat::Text),
            "json" => Ok(LogFormat::Json),
            _ => Err(ConfigurationError::InvalidValue {
                key: "log".to_string(),
                value: s.to_string(),
            }),
        }
    }
}

impl fmt::Display for LogFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LogFormat::Text => f.write_str("text"),
            LogFormat::Json => f.write_str("json"),
        }
    }
}

fn filter() -> EnvFilter {
    EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER))
}

/// Install the global subscriber
///
/// Returns false if a global subscriber was already installed, in which
/// case nothing changes.
pub fn init_logging(format: LogFormat) -> bool {
    let installed = match format {
        LogFormat::Text => tracing_subscriber::fmt()
            .with_env_filter(filter())
            .with_thread_names(true)
            .try_init()
            .is_ok(),
        LogFormat::Json => tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter())
            .with_thread_names(true)
            .try_init()
            .is_ok(),
    };
    if installed {
        tracing::debug!("[Agent] logging initialised ({})", format);
    }
    installed
}
