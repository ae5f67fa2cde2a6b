use crate::config::{AppEnvironment, TelemetryConfig};
use std::fmt;
use tracing_subscriber::filter::ParseError;
use tracing_subscriber::EnvFilter;

#[derive(Debug)]
pub enum TelemetryError {
    EnvFilter { value: String, source: ParseError },
    Subscriber(Box<dyn std::error::Error + Send + Sync>),
}

impl fmt::Display for TelemetryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TelemetryError::EnvFilter { value, .. } => {
                write!(f, "invalid log filter '{}' for assessment service", value)
            }
            TelemetryError::Subscriber(err) => write!(f, "subscriber install failed: {err}"),
        }
    }
}

impl std::error::Error for TelemetryError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            TelemetryError::EnvFilter { source, .. } => Some(source),
            TelemetryError::Subscriber(err) => Some(&**err),
        }
    }
}

/// Output shape of the fmt layer. Logs stay plain text in every environment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct LogFormat {
    targets: bool,
    ansi: bool,
}

impl LogFormat {
    fn for_environment(environment: AppEnvironment) -> Self {
        Self {
            targets: environment == AppEnvironment::Development,
            ansi: false,
        }
    }
}

/// Installs the global subscriber. `RUST_LOG` wins over the configured level.
pub fn init(config: &TelemetryConfig, environment: AppEnvironment) -> Result<(), TelemetryError> {
    let env_filter = EnvFilter::try_from_default_env().or_else(|_| {
        EnvFilter::try_new(&config.log_level).map_err(|source| TelemetryError::EnvFilter {
            value: config.log_level.clone(),
            source,
        })
    })?;

    let format = LogFormat::for_environment(environment);

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(format.targets)
        .compact()
        .with_ansi(format.ansi)
        .try_init()
        .map_err(TelemetryError::Subscriber)
}
