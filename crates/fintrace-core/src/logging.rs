//! Structured logging
//!
//! The engine only emits `tracing` events and spans (`analysis` per run,
//! `detector` per detector call). Binaries pick a [`LogConfig`] and call
//! [`LogConfig::init`] once. Output always goes to stderr so that reports
//! written to stdout stay machine-readable.
//!
//! # Example
//!
//! ```rust,ignore
//! use fintrace_core::logging::{LogConfig, LogFormat};
//!
//! LogConfig::default()
//!     .with_format(LogFormat::Json)
//!     .with_directive("fintrace_detection=debug")
//!     .init()?;
//! ```

use crate::error::{EngineError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Minimum level for FinTrace events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    /// Per-expansion detail
    Trace,
    /// Detector summaries and graph build details
    Debug,
    /// Run start and completion
    #[default]
    Info,
    /// Truncated searches, dropped rows, failed detectors
    Warn,
    /// Errors only
    Error,
}

impl LogLevel {
    /// Directive name understood by `EnvFilter`.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Trace => "trace",
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LogLevel {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self> {
        let level = match s.trim().to_ascii_lowercase().as_str() {
            "trace" => LogLevel::Trace,
            "debug" => LogLevel::Debug,
            "info" => LogLevel::Info,
            "warn" | "warning" => LogLevel::Warn,
            "error" => LogLevel::Error,
            other => return Err(EngineError::config(format!("unknown log level {:?}", other))),
        };
        Ok(level)
    }
}

/// Event rendering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Multi-line, human oriented
    Pretty,
    /// One line per event
    #[default]
    Compact,
    /// One JSON object per event
    Json,
}

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogConfig {
    /// Default level.
    pub level: LogLevel,
    /// Rendering.
    pub format: LogFormat,
    /// Extra `EnvFilter` directives, e.g. `fintrace_detection::cycles=trace`.
    #[serde(default)]
    pub directives: Vec<String>,
    /// Include file and line.
    pub include_location: bool,
    /// Include thread IDs (useful when detectors run on the rayon pool).
    pub include_thread_ids: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: LogLevel::Info,
            format: LogFormat::Compact,
            directives: Vec::new(),
            include_location: false,
            include_thread_ids: false,
        }
    }
}

impl LogConfig {
    /// Debug level with source locations.
    pub fn development() -> Self {
        Self {
            level: LogLevel::Debug,
            format: LogFormat::Pretty,
            include_location: true,
            ..Default::default()
        }
    }

    /// JSON at info level with thread IDs.
    pub fn production() -> Self {
        Self {
            format: LogFormat::Json,
            include_thread_ids: true,
            ..Default::default()
        }
    }

    /// Set the level.
    pub fn with_level(mut self, level: LogLevel) -> Self {
        self.level = level;
        self
    }

    /// Set the rendering.
    pub fn with_format(mut self, format: LogFormat) -> Self {
        self.format = format;
        self
    }

    /// Add an `EnvFilter` directive.
    pub fn with_directive(mut self, directive: impl Into<String>) -> Self {
        self.directives.push(directive.into());
        self
    }

    /// Filter string built from the level and extra directives.
    pub fn filter_directives(&self) -> String {
        std::iter::once(self.level.as_str().to_string())
            .chain(self.directives.iter().map(|d| d.trim().to_string()))
            .filter(|d| !d.is_empty())
            .collect::<Vec<_>>()
            .join(",")
    }

    /// Install the global subscriber.
    ///
    /// `RUST_LOG`, when set, replaces the configured filter. If a subscriber
    /// is already installed this is a no-op.
    pub fn init(&self) -> Result<()> {
        use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer, Registry};

        let filter = match EnvFilter::try_from_default_env() {
            Ok(filter) => filter,
            Err(_) => EnvFilter::try_new(self.filter_directives())
                .map_err(|e| EngineError::config(format!("invalid log filter: {}", e)))?,
        };

        let base = fmt::layer()
            .with_writer(std::io::stderr)
            .with_thread_ids(self.include_thread_ids)
            .with_file(self.include_location)
            .with_line_number(self.include_location);

        let layer: Box<dyn Layer<Registry> + Send + Sync> = match self.format {
            LogFormat::Pretty => base.pretty().boxed(),
            LogFormat::Compact => base.compact().boxed(),
            LogFormat::Json => base.json().boxed(),
        };

        if tracing_subscriber::registry().with(layer).with(filter).try_init().is_err() {
            tracing::debug!("Global subscriber already installed, keeping it");
        }
        Ok(())
    }
}
