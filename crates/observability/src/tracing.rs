//! Tracing/logging initialization.
//!
//! Filtering follows `RUST_LOG`; the output format follows
//! `CMDGRAPH_LOG_FORMAT` (`json`, the default, or `pretty`). Spans such as
//! `remote.round_trip` carry the request id of each remote call.

use std::str::FromStr;

use thiserror::Error;
use tracing_subscriber::EnvFilter;

/// Environment variable selecting the output format.
pub const FORMAT_ENV: &str = "CMDGRAPH_LOG_FORMAT";

const DEFAULT_FILTER: &str = "info";

#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
pub enum LogFormat {
    /// One JSON object per event, for log collectors.
    #[default]
    Json,
    /// Human-readable multi-line output, for terminals.
    Pretty,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("unknown log format {0:?} (expected \"json\" or \"pretty\")")]
pub struct UnknownLogFormat(pub String);

impl FromStr for LogFormat {
    type Err = UnknownLogFormat;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "json" => Ok(LogFormat::Json),
            "pretty" | "text" => Ok(LogFormat::Pretty),
            _ => Err(UnknownLogFormat(s.to_string())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogConfig {
    /// `EnvFilter` directives, e.g. `info,cmdgraph_infra=debug`
    pub filter: String,
    pub format: LogFormat,
    /// Write through the test harness so output is captured per test.
    pub test_writer: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            filter: DEFAULT_FILTER.to_string(),
            format: LogFormat::default(),
            test_writer: false,
        }
    }
}

impl LogConfig {
    /// Defaults, overridden by `RUST_LOG` and `CMDGRAPH_LOG_FORMAT`.
    pub fn from_env() -> Self {
        Self::from_vars(
            std::env::var("RUST_LOG").ok(),
            std::env::var(FORMAT_ENV).ok(),
        )
    }

    fn from_vars(filter: Option<String>, format: Option<String>) -> Self {
        let mut config = Self::default();
        if let Some(filter) = filter.filter(|f| !f.trim().is_empty()) {
            config.filter = filter;
        }
        if let Some(raw) = format {
            match raw.parse() {
                Ok(format) => config.format = format,
                // No subscriber yet, so this cannot go through tracing.
                Err(err) => eprintln!("ignoring {FORMAT_ENV}: {err}"),
            }
        }
        config
    }

    /// Settings for unit/integration tests: pretty output, captured by the
    /// harness, `debug` for this workspace's crates.
    pub fn for_tests() -> Self {
        Self {
            filter: "warn,cmdgraph_infra=debug".to_string(),
            format: LogFormat::Pretty,
            test_writer: true,
        }
    }

    fn env_filter(&self) -> EnvFilter {
        EnvFilter::try_new(&self.filter).unwrap_or_else(|err| {
            eprintln!("invalid log filter {:?}: {err}; using {DEFAULT_FILTER:?}", self.filter);
            EnvFilter::new(DEFAULT_FILTER)
        })
    }
}

/// Initialize tracing/logging for the process.
///
/// Safe to call multiple times (subsequent calls are no-ops).
pub fn init(config: LogConfig) {
    let builder = tracing_subscriber::fmt()
        .with_env_filter(config.env_filter())
        .with_timer(tracing_subscriber::fmt::time::SystemTime);

    let _ = match (config.format, config.test_writer) {
        (LogFormat::Json, false) => builder.json().with_target(false).try_init(),
        (LogFormat::Json, true) => builder.json().with_target(false).with_test_writer().try_init(),
        (LogFormat::Pretty, false) => builder.pretty().try_init(),
        (LogFormat::Pretty, true) => builder.pretty().with_test_writer().try_init(),
    };
}

/// Initialize tracing for a test binary. Every test may call this.
pub fn init_for_tests() {
    init(LogConfig::for_tests());
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn format_parses_case_insensitively() {
        assert_eq!("JSON".parse::<LogFormat>().unwrap(), LogFormat::Json);
        assert_eq!(" pretty ".parse::<LogFormat>().unwrap(), LogFormat::Pretty);
        assert!("xml".parse::<LogFormat>().is_err());
    }

    #[test]
    fn vars_override_defaults() {
        let config = LogConfig::from_vars(
            Some("debug,cmdgraph_infra=trace".to_string()),
            Some("pretty".to_string()),
        );
        assert_eq!(config.filter, "debug,cmdgraph_infra=trace");
        assert_eq!(config.format, LogFormat::Pretty);
    }

    #[test]
    fn bad_or_empty_vars_keep_defaults() {
        let config = LogConfig::from_vars(Some("  ".to_string()), Some("xml".to_string()));
        assert_eq!(config, LogConfig::default());
    }

    #[test]
    fn init_is_idempotent() {
        init_for_tests();
        init_for_tests();
        tracing::info!("still logging");
    }
}
