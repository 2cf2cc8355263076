//! Configuration loading and environment variable handling

use crate::domains::logging::{LogFormat, LogLevel, LoggingConfig};
use crate::domains::process::ProcessConfig;
use crate::domains::JsprocConfig;
use crate::error::{ConfigError, ConfigResult};
use std::path::Path;
use std::str::FromStr;
use tracing::debug;

/// Configuration loader with environment variable support
pub struct ConfigLoader {
    /// Environment variable prefix
    prefix: String,
}

impl ConfigLoader {
    /// Create a new config loader with default prefix
    pub fn new() -> Self {
        Self {
            prefix: "JSPROC".to_string(),
        }
    }

    /// Create a new config loader with custom prefix
    pub fn with_prefix(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }

    /// Load configuration from a YAML file with environment overrides
    pub fn from_file(&self, path: impl AsRef<Path>) -> ConfigResult<JsprocConfig> {
        let path = path.as_ref();
        debug!("Loading configuration from {:?}", path);
        let content = std::fs::read_to_string(path)?;
        let mut config: JsprocConfig =
            serde_yaml::from_str(&content).map_err(|source| ConfigError::ParseError {
                path: path.to_path_buf(),
                source,
            })?;

        self.apply_env_overrides(&mut config)?;
        config.validate_all()?;
        Ok(config)
    }

    /// Load configuration from environment variables only
    pub fn from_env(&self) -> ConfigResult<JsprocConfig> {
        let mut config = JsprocConfig::default();
        self.apply_env_overrides(&mut config)?;
        config.validate_all()?;
        Ok(config)
    }

    /// Load configuration with fallback chain
    pub fn load(&self, config_path: Option<impl AsRef<Path>>) -> ConfigResult<JsprocConfig> {
        match config_path {
            Some(path) => self.from_file(path),
            None => self.from_env(),
        }
    }

    /// Environment variables win over file values
    fn apply_env_overrides(&self, config: &mut JsprocConfig) -> ConfigResult<()> {
        self.apply_process_overrides(&mut config.process)?;
        self.apply_logging_overrides(&mut config.logging)?;
        Ok(())
    }

    fn apply_process_overrides(&self, config: &mut ProcessConfig) -> ConfigResult<()> {
        if let Some(prefix) = self.var("THREAD_NAME_PREFIX") {
            config.thread_name_prefix = prefix;
        }
        if let Some(bytes) = self.parsed_var::<usize>("THREAD_STACK_SIZE")? {
            config.thread_stack_size = Some(bytes);
        }
        if let Some(strict) = self.parsed_var("STRICT_PRESERVERS")? {
            config.strict_preservers = strict;
        }
        if let Some(console) = self.parsed_var("ENABLE_CONSOLE")? {
            config.enable_console = console;
        }
        if let Some(timers) = self.parsed_var("ENABLE_TIMERS")? {
            config.enable_timers = timers;
        }
        if let Some(seconds) = self.var("START_TIMEOUT") {
            config.start_timeout = parse_seconds("START_TIMEOUT", &seconds)?;
        }
        if let Some(seconds) = self.var("EXIT_TIMEOUT") {
            config.exit_timeout = parse_seconds("EXIT_TIMEOUT", &seconds)?;
        }
        Ok(())
    }

    fn apply_logging_overrides(&self, config: &mut LoggingConfig) -> ConfigResult<()> {
        if let Some(level) = self.parsed_var::<LogLevel>("LOG_LEVEL")? {
            config.level = level;
        }
        if let Some(format) = self.parsed_var::<LogFormat>("LOG_FORMAT")? {
            config.format = format;
        }
        Ok(())
    }

    /// `{prefix}_{name}`, if set and valid unicode
    fn var(&self, name: &str) -> Option<String> {
        std::env::var(format!("{}_{}", self.prefix, name)).ok()
    }

    fn parsed_var<T>(&self, name: &str) -> ConfigResult<Option<T>>
    where
        T: FromStr,
        T::Err: std::fmt::Display,
    {
        self.var(name)
            .map(|raw| {
                raw.parse::<T>().map_err(|e| {
                    ConfigError::EnvError(format!("Invalid {}_{} '{}': {}", self.prefix, name, raw, e))
                })
            })
            .transpose()
    }
}

/// Parse a timeout given in (possibly fractional) seconds
fn parse_seconds(name: &str, value: &str) -> ConfigResult<std::time::Duration> {
    let seconds: f64 = value
        .parse()
        .map_err(|e| ConfigError::EnvError(format!("Invalid {}: {}", name, e)))?;
    std::time::Duration::try_from_secs_f64(seconds)
        .map_err(|e| ConfigError::EnvError(format!("Invalid {}: {}", name, e)))
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}
