//! Logging setup for tidy-tweet.
//!
//! The library only emits `tracing` events. The binary installs a subscriber
//! once at startup with [`init_cli_logging`]; everything goes to stderr so
//! diagnostics never mix with command output such as `tidy-tweet schema`.
//!
//! ```rust
//! use tidy_tweet::logging::{LogConfig, init_logging};
//!
//! init_logging(&LogConfig::default());
//! tracing::warn!("visible at the default level");
//! ```

use serde::{Deserialize, Serialize};
use std::time::Instant;
use tracing::{error, info};
use tracing_subscriber::{
    EnvFilter, Layer, Registry,
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};

/// How much to log, and how.
#[derive(Debug, Clone)]
pub struct LogConfig {
    pub level: LogLevel,
    pub format: LogFormat,
    pub timestamps: bool,
    /// Show the module path of each event.
    pub target: bool,
    pub colors: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self::at(LogLevel::Warn, LogFormat::Compact)
    }
}

impl LogConfig {
    const fn at(level: LogLevel, format: LogFormat) -> Self {
        Self {
            level,
            format,
            timestamps: true,
            target: false,
            colors: true,
        }
    }

    /// Errors only, without timestamps (`--quiet`).
    #[must_use]
    pub const fn quiet() -> Self {
        Self {
            timestamps: false,
            ..Self::at(LogLevel::Error, LogFormat::Compact)
        }
    }

    /// Debug events with module paths (`-v`).
    #[must_use]
    pub const fn verbose() -> Self {
        Self {
            target: true,
            ..Self::at(LogLevel::Debug, LogFormat::Pretty)
        }
    }

    /// Every event with span timings and source locations (`-vv`).
    #[must_use]
    pub const fn trace() -> Self {
        Self {
            target: true,
            ..Self::at(LogLevel::Trace, LogFormat::Full)
        }
    }

    fn filter(&self) -> EnvFilter {
        if std::env::var_os("RUST_LOG").is_some() {
            EnvFilter::from_default_env()
        } else {
            EnvFilter::new(format!("tidy_tweet={}", self.level))
        }
    }

    /// The stderr formatting layer for this configuration.
    fn layer(&self) -> Box<dyn Layer<Registry> + Send + Sync> {
        let base = fmt::layer()
            .with_writer(std::io::stderr)
            .with_ansi(self.colors)
            .with_target(self.target);

        match (self.format, self.timestamps) {
            (LogFormat::Pretty, true) => base.pretty().boxed(),
            (LogFormat::Pretty, false) => base.pretty().without_time().boxed(),
            (LogFormat::Compact, true) => base.compact().boxed(),
            (LogFormat::Compact, false) => base.compact().without_time().boxed(),
            (LogFormat::Full, _) => base
                .with_span_events(FmtSpan::CLOSE)
                .with_thread_names(true)
                .with_file(true)
                .with_line_number(true)
                .boxed(),
        }
    }
}

/// Minimum level of events to show.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
    Off,
}

impl LogLevel {
    /// The `EnvFilter` directive for this level.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Error => "error",
            Self::Warn => "warn",
            Self::Info => "info",
            Self::Debug => "debug",
            Self::Trace => "trace",
            Self::Off => "off",
        }
    }
}

impl std::fmt::Display for LogLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for LogLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "error" => Ok(Self::Error),
            "warn" | "warning" => Ok(Self::Warn),
            "info" => Ok(Self::Info),
            "debug" => Ok(Self::Debug),
            "trace" => Ok(Self::Trace),
            "off" | "none" => Ok(Self::Off),
            other => Err(format!(
                "unknown log level '{other}' (expected error, warn, info, debug, trace or off)"
            )),
        }
    }
}

/// Layout of each log line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Multi-line, for reading during `-v` runs.
    Pretty,
    Compact,
    /// Compact plus thread, file, line and span close timings.
    Full,
}

impl std::str::FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "pretty" => Ok(Self::Pretty),
            "compact" => Ok(Self::Compact),
            "full" => Ok(Self::Full),
            other => Err(format!(
                "unknown log format '{other}' (expected pretty, compact or full)"
            )),
        }
    }
}

/// Install the global subscriber. Later calls are no-ops.
///
/// `RUST_LOG`, when set, replaces the configured level.
pub fn init_logging(config: &LogConfig) {
    tracing_subscriber::registry()
        .with(config.layer())
        .with(config.filter())
        .try_init()
        .ok();
}

/// Pick the logging config for a CLI run.
///
/// `--quiet` wins over `--verbose`; one `-v` means debug, two or more mean
/// trace. Without either flag the configured `base` is used. The configured
/// color choice is kept in every case.
#[must_use]
pub fn cli_log_config(base: LogConfig, quiet: bool, verbose: u8) -> LogConfig {
    let colors = base.colors;
    let config = match (quiet, verbose) {
        (true, _) => LogConfig::quiet(),
        (false, 0) => base,
        (false, 1) => LogConfig::verbose(),
        (false, _) => LogConfig::trace(),
    };
    LogConfig { colors, ..config }
}

/// Install the subscriber for a CLI run; see [`cli_log_config`].
pub fn init_cli_logging(base: LogConfig, quiet: bool, verbose: u8) {
    init_logging(&cli_log_config(base, quiet, verbose));
}

/// Times one unit of work (loading one file) and logs how it ended.
pub struct OperationGuard {
    name: String,
    start: Instant,
}

impl OperationGuard {
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        info!(operation = %name, "started");
        Self {
            name,
            start: Instant::now(),
        }
    }

    pub fn complete(self) {
        info!(
            operation = %self.name,
            duration_ms = self.start.elapsed().as_millis(),
            "completed"
        );
    }

    pub fn fail(self, err: &dyn std::error::Error) {
        error!(
            operation = %self.name,
            duration_ms = self.start.elapsed().as_millis(),
            error = %err,
            "failed"
        );
    }
}
