//! Tracing subscriber setup with format selection.

use anyhow::{Context, Result};
use std::str::FromStr;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    /// JSON format for structured logging.
    Json,
    /// Human-readable pretty format with colors.
    Pretty,
    /// Compact single-line format.
    #[default]
    Compact,
}

impl FromStr for LogFormat {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s.to_lowercase().as_str() {
            "json" => Self::Json,
            "pretty" => Self::Pretty,
            "compact" => Self::Compact,
            _ => Self::default(),
        })
    }
}

/// Settings for the stderr subscriber.
#[derive(Debug, Clone)]
pub struct LoggingConfig {
    /// Output format.
    pub format: LogFormat,
    /// Filter directive, e.g. `"info"` or `"warn,ringlog_core=trace"`.
    pub filter: String,
    /// Include thread names, useful when a producer and consumer share a log.
    pub thread_names: bool,
}

impl LoggingConfig {
    /// Build the configuration for a `-v` count.
    ///
    /// `RINGLOG_LOG_FORMAT` picks the format, otherwise pretty on a terminal
    /// and compact elsewhere. `RUST_LOG` overrides the verbosity.
    pub fn from_verbosity(verbosity: u8) -> Self {
        let level = match verbosity {
            0 => "warn",
            1 => "info",
            2 => "debug",
            _ => "trace",
        };

        let format = std::env::var("RINGLOG_LOG_FORMAT")
            .ok()
            .and_then(|s| s.parse::<LogFormat>().ok())
            .unwrap_or_else(|| {
                if std::io::IsTerminal::is_terminal(&std::io::stderr()) {
                    LogFormat::Pretty
                } else {
                    LogFormat::Compact
                }
            });

        let filter = std::env::var("RUST_LOG").unwrap_or_else(|_| level.to_string());

        Self {
            format,
            filter,
            thread_names: verbosity >= 3,
        }
    }
}

/// Install the global subscriber. Logs go to stderr so stdout stays
/// machine-readable.
pub fn init_tracing(config: &LoggingConfig) -> Result<()> {
    let filter = EnvFilter::try_new(&config.filter).unwrap_or_else(|_| EnvFilter::new("warn"));

    match config.format {
        LogFormat::Json => tracing_subscriber::registry()
            .with(filter)
            .with(
                fmt::layer()
                    .json()
                    .with_writer(std::io::stderr)
                    .with_thread_names(config.thread_names)
                    .flatten_event(true),
            )
            .try_init(),
        LogFormat::Pretty => tracing_subscriber::registry()
            .with(filter)
            .with(
                fmt::layer()
                    .pretty()
                    .with_writer(std::io::stderr)
                    .with_thread_names(config.thread_names),
            )
            .try_init(),
        LogFormat::Compact => tracing_subscriber::registry()
            .with(filter)
            .with(
                fmt::layer()
                    .compact()
                    .with_writer(std::io::stderr)
                    .with_thread_names(config.thread_names),
            )
            .try_init(),
    }
    .context("Failed to initialize tracing subscriber")
}
