//! Logging setup shared by the `tvhepg` binaries.
//!
//! One-shot commands log compact lines to stderr; the daemon can switch to
//! JSON so the output can be shipped to a log collector:
//!
//! ```ignore
//! use tvhepg_core::tracing::{init_tracing, TracingConfig};
//!
//! init_tracing(TracingConfig::daemon())?;
//! ```

use thiserror::Error;
use tracing::Level;
use tracing_subscriber::{EnvFilter, Layer, Registry, fmt, prelude::*};

/// Errors that can occur during tracing initialization
#[derive(Debug, Error)]
pub enum TracingError {
    /// Failed to set global subscriber
    #[error("failed to set global tracing subscriber: {0}")]
    SetGlobalSubscriber(#[from] tracing::subscriber::SetGlobalDefaultError),

    /// Failed to parse env filter directive
    #[error("failed to parse env filter: {0}")]
    EnvFilter(#[from] tracing_subscriber::filter::ParseError),
}

/// Output format for log lines
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum TracingOutputFormat {
    /// Compact single-line format
    #[default]
    Compact,
    /// JSON lines (`--json-logs`)
    Json,
}

/// Configuration for tracing initialization
#[derive(Debug, Clone)]
pub struct TracingConfig {
    /// Level for `tvhepg*` targets when RUST_LOG is not set
    pub default_level: Level,
    pub output_format: TracingOutputFormat,
    /// Whether to include file/line information in logs
    pub include_location: bool,
    /// Whether to include target (module path) in logs
    pub include_target: bool,
    /// Ignored by the JSON format, which always carries a timestamp
    pub include_timestamp: bool,
}

impl TracingConfig {
    /// Quiet config for one-shot commands: warnings and errors only.
    #[must_use]
    pub fn cli() -> Self {
        Self {
            default_level: Level::WARN,
            output_format: TracingOutputFormat::Compact,
            include_location: false,
            include_target: false,
            include_timestamp: false,
        }
    }

    /// One-shot commands with `--debug`.
    #[must_use]
    pub fn cli_debug() -> Self {
        Self {
            default_level: Level::DEBUG,
            output_format: TracingOutputFormat::Compact,
            include_location: true,
            include_target: true,
            include_timestamp: false,
        }
    }

    /// The refresh daemon.
    #[must_use]
    pub fn daemon() -> Self {
        Self {
            default_level: Level::INFO,
            output_format: TracingOutputFormat::Compact,
            include_location: false,
            include_target: true,
            include_timestamp: true,
        }
    }

    /// Set the output format
    #[must_use]
    pub fn with_format(mut self, format: TracingOutputFormat) -> Self {
        self.output_format = format;
        self
    }

    fn layer(&self) -> Box<dyn Layer<Registry> + Send + Sync> {
        match self.output_format {
            TracingOutputFormat::Compact => {
                let layer = fmt::layer()
                    .compact()
                    .with_writer(std::io::stderr)
                    .with_file(self.include_location)
                    .with_line_number(self.include_location)
                    .with_target(self.include_target);
                if self.include_timestamp {
                    layer.boxed()
                } else {
                    layer.without_time().boxed()
                }
            }
            TracingOutputFormat::Json => fmt::layer()
                .json()
                .with_writer(std::io::stderr)
                .with_file(self.include_location)
                .with_line_number(self.include_location)
                .with_target(self.include_target)
                .boxed(),
        }
    }
}

/// Initialize tracing with the given configuration.
///
/// `RUST_LOG` overrides the default level. An unparsable `RUST_LOG` falls
/// back to the default directive.
///
/// # Errors
///
/// Returns an error if the global subscriber has already been set.
pub fn init_tracing(config: TracingConfig) -> Result<(), TracingError> {
    let env_filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(default_directive(config.default_level))?,
    };

    let subscriber = tracing_subscriber::registry()
        .with(config.layer())
        .with(env_filter);
    tracing::subscriber::set_global_default(subscriber)?;

    Ok(())
}

/// All workspace crates share the `tvhepg` target prefix.
fn default_directive(level: Level) -> String {
    format!("tvhepg={}", level)
}
