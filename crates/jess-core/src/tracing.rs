//! Tracing setup for jess
//!
//! One call at process start installs the global subscriber:
//!
//! ```ignore
//! use jess_core::tracing::{init_tracing, TracingConfig};
//!
//! let config = if debug { TracingConfig::cli_debug() } else { TracingConfig::cli() };
//! init_tracing(config)?;
//! ```
//!
//! `RUST_LOG` overrides the configured level when set.

use std::str::FromStr;

use thiserror::Error;
use tracing::Level;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

/// Crate targets that receive the default level.
const JESS_TARGETS: [&str; 3] = ["jess_core", "jess_providers", "jess_client"];

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

/// Log line format on stderr.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum TracingOutputFormat {
    /// One line per event (default)
    #[default]
    Compact,
    /// JSON lines, for piping into log collectors
    Json,
}

impl FromStr for TracingOutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "compact" | "text" => Ok(Self::Compact),
            "json" => Ok(Self::Json),
            other => Err(format!("unknown log format {other:?} (expected compact or json)")),
        }
    }
}

/// Configuration for tracing initialization
#[derive(Debug, Clone)]
pub struct TracingConfig {
    /// The level for jess crates when RUST_LOG is not set
    pub default_level: Level,
    pub output_format: TracingOutputFormat,
    /// Whether to include file/line and module path
    pub include_location: bool,
    pub include_timestamp: bool,
}

impl Default for TracingConfig {
    fn default() -> Self {
        Self::cli()
    }
}

impl TracingConfig {
    /// Quiet config for normal CLI use: warnings and errors only.
    #[must_use]
    pub fn cli() -> Self {
        Self {
            default_level: Level::WARN,
            output_format: TracingOutputFormat::Compact,
            include_location: false,
            include_timestamp: false,
        }
    }

    /// Verbose config for `--debug`.
    #[must_use]
    pub fn cli_debug() -> Self {
        Self {
            default_level: Level::DEBUG,
            output_format: TracingOutputFormat::Compact,
            include_location: true,
            include_timestamp: true,
        }
    }

    #[must_use]
    pub fn with_format(mut self, format: TracingOutputFormat) -> Self {
        self.output_format = format;
        self
    }

    /// The filter directive used when RUST_LOG is not set.
    ///
    /// Other crates (reqwest, hyper) stay at `warn`.
    pub fn default_directive(&self) -> String {
        let level = self.default_level.to_string().to_lowercase();
        JESS_TARGETS
            .iter()
            .fold(String::from("warn"), |mut directive, target| {
                directive.push_str(&format!(",{target}={level}"));
                directive
            })
    }
}

/// Installs the global subscriber. Logs go to stderr so results on stdout
/// stay parseable.
///
/// # Errors
///
/// Returns an error if a global subscriber is already set or `RUST_LOG`
/// holds an invalid directive.
pub fn init_tracing(config: TracingConfig) -> Result<(), TracingError> {
    let env_filter = match std::env::var(EnvFilter::DEFAULT_ENV) {
        Ok(directive) if !directive.trim().is_empty() => EnvFilter::try_new(directive)?,
        _ => EnvFilter::try_new(config.default_directive())?,
    };

    let layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_file(config.include_location)
        .with_line_number(config.include_location)
        .with_target(config.include_location);

    let layer = match (config.output_format, config.include_timestamp) {
        (TracingOutputFormat::Json, _) => layer.json().boxed(),
        (TracingOutputFormat::Compact, true) => layer.compact().boxed(),
        (TracingOutputFormat::Compact, false) => layer.compact().without_time().boxed(),
    };

    let subscriber = tracing_subscriber::registry().with(env_filter).with(layer);
    tracing::subscriber::set_global_default(subscriber)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_is_quiet() {
        let config = TracingConfig::cli();
        assert_eq!(config.default_level, Level::WARN);
        assert_eq!(config.output_format, TracingOutputFormat::Compact);
        assert!(!config.include_location);
        assert!(!config.include_timestamp);
    }

    #[test]
    fn debug_directive_covers_all_crates() {
        let directive = TracingConfig::cli_debug().default_directive();
        assert_eq!(
            directive,
            "warn,jess_core=debug,jess_providers=debug,jess_client=debug"
        );
        assert!(EnvFilter::try_new(&directive).is_ok());
    }

    #[test]
    fn log_format_parsing() {
        assert_eq!("JSON".parse(), Ok(TracingOutputFormat::Json));
        assert_eq!("text".parse(), Ok(TracingOutputFormat::Compact));
        assert!("pretty".parse::<TracingOutputFormat>().is_err());

        let config = TracingConfig::cli().with_format(TracingOutputFormat::Json);
        assert_eq!(config.output_format, TracingOutputFormat::Json);
    }
}
