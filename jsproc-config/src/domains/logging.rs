//! Logging configuration

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use crate::validation::Validatable;
use crate::error::ConfigResult;

/// How the `jsproc` binary and embedders configure `tracing`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Base verbosity for every target
    pub level: LogLevel,

    pub format: LogFormat,

    /// Per-target directives appended to the level, e.g. `jsproc_runtime=trace`
    #[serde(default)]
    pub directives: Vec<String>,

    /// Whether to include source location in logs
    #[serde(default = "crate::domains::utils::default_false")]
    pub include_location: bool,

    /// Whether to include thread ids (useful to see which process thread logged)
    #[serde(default = "crate::domains::utils::default_true")]
    pub thread_ids: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Error,
    Warn,
    #[default]
    Info,
    Debug,
    Trace,
}

/// Output layout of the fmt layer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Json,
    #[default]
    Text,
    Compact,
    Pretty,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: LogLevel::Info,
            format: LogFormat::Text,
            directives: Vec::new(),
            include_location: false,
            thread_ids: true,
        }
    }
}

impl LoggingConfig {
    /// Render the level and directives as an `EnvFilter` expression
    pub fn filter_expression(&self) -> String {
        let mut parts = vec![self.level.to_string()];
        parts.extend(self.directives.iter().cloned());
        parts.join(",")
    }
}

impl LogLevel {
    const NAMES: [(LogLevel, &'static str); 5] = [
        (LogLevel::Error, "error"),
        (LogLevel::Warn, "warn"),
        (LogLevel::Info, "info"),
        (LogLevel::Debug, "debug"),
        (LogLevel::Trace, "trace"),
    ];

    pub fn as_str(self) -> &'static str {
        Self::NAMES
            .iter()
            .find(|(level, _)| *level == self)
            .map_or("info", |(_, name)| name)
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LogLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.to_ascii_lowercase();
        let wanted = if wanted == "warning" { "warn" } else { wanted.as_str() };
        Self::NAMES
            .iter()
            .find(|(_, name)| *name == wanted)
            .map(|(level, _)| *level)
            .ok_or_else(|| format!("unknown log level '{}'", s))
    }
}

impl FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        [LogFormat::Json, LogFormat::Text, LogFormat::Compact, LogFormat::Pretty]
            .into_iter()
            .find(|format| format!("{:?}", format).eq_ignore_ascii_case(s))
            .ok_or_else(|| format!("unknown log format '{}'", s))
    }
}

impl Validatable for LoggingConfig {
    fn validate(&self) -> ConfigResult<()> {
        for directive in &self.directives {
            let valid = match directive.split_once('=') {
                Some((target, level)) => !target.is_empty() && LogLevel::from_str(level).is_ok(),
                None => !directive.is_empty(),
            };
            if !valid {
                return Err(self.validation_error(format!("Invalid log directive: '{}'", directive)));
            }
        }

        Ok(())
    }

    fn domain_name(&self) -> &'static str {
        "logging"
    }
}
