//! Process lifecycle configuration

use serde::{Deserialize, Serialize};
use std::time::Duration;
use crate::validation::{Validatable, validate_identifier, validate_positive};
use crate::error::ConfigResult;

/// Configuration applied to every process started from it
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProcessConfig {
    /// Prefix for the dedicated process thread name
    #[serde(default = "default_thread_name_prefix")]
    pub thread_name_prefix: String,

    /// Stack size of the process thread in bytes (platform default when unset)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thread_stack_size: Option<usize>,

    /// Install the `console` global
    #[serde(default = "crate::domains::utils::default_true")]
    pub enable_console: bool,

    /// Install `setTimeout` and friends
    #[serde(default = "crate::domains::utils::default_true")]
    pub enable_timers: bool,

    /// Panic when a loop preserver is dropped without being released
    #[serde(default = "crate::domains::utils::default_false")]
    pub strict_preservers: bool,

    /// Script evaluated while the process is starting
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bootstrap_script: Option<String>,

    /// How long callers wait for the start notification
    #[serde(with = "crate::domains::utils::serde_duration", default = "default_start_timeout")]
    pub start_timeout: Duration,

    /// How long callers wait for the process to complete
    #[serde(with = "crate::domains::utils::serde_duration", default = "default_exit_timeout")]
    pub exit_timeout: Duration,
}

impl Default for ProcessConfig {
    fn default() -> Self {
        Self {
            thread_name_prefix: default_thread_name_prefix(),
            thread_stack_size: None,
            enable_console: true,
            enable_timers: true,
            strict_preservers: false,
            bootstrap_script: None,
            start_timeout: default_start_timeout(),
            exit_timeout: default_exit_timeout(),
        }
    }
}

impl Validatable for ProcessConfig {
    fn validate(&self) -> ConfigResult<()> {
        validate_identifier(&self.thread_name_prefix, "thread_name_prefix", self.domain_name())?;

        if let Some(stack_size) = self.thread_stack_size {
            if stack_size < MIN_THREAD_STACK_SIZE {
                return Err(self.validation_error(format!(
                    "thread_stack_size must be at least {} bytes, got {}",
                    MIN_THREAD_STACK_SIZE, stack_size
                )));
            }
        }

        validate_positive(self.start_timeout.as_secs_f64(), "start_timeout", self.domain_name())?;
        validate_positive(self.exit_timeout.as_secs_f64(), "exit_timeout", self.domain_name())?;

        Ok(())
    }

    fn domain_name(&self) -> &'static str {
        "process"
    }
}

/// Boa needs a reasonably deep native stack for its parser and interpreter.
const MIN_THREAD_STACK_SIZE: usize = 256 * 1024;

fn default_thread_name_prefix() -> String {
    "jsproc".to_string()
}

fn default_start_timeout() -> Duration {
    Duration::from_secs(10)
}

fn default_exit_timeout() -> Duration {
    Duration::from_secs(10)
}
