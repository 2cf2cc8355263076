//! Runtime error types

use crate::state::ProcessState;
use jsproc_config::ConfigError;
use jsproc_js::JsExecutionError;
use jsproc_logging::ErrorSeverity;
use thiserror::Error;

/// Errors of the process lifecycle
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProcessError {
    /// The engine or its context could not be created
    #[error("Initialization failure: {0}")]
    InitializationFailure(String),

    /// The operation is not allowed in the current state
    #[error("Cannot {operation} while the process is {state}")]
    InvalidState {
        operation: &'static str,
        state: ProcessState,
    },

    /// Uncaught script error, panicking task or engine fault
    #[error("Runtime fault: {0}")]
    RuntimeFault(String),

    /// A listener callback returned an error or panicked
    #[error("Listener fault in {callback}: {message}")]
    ListenerFault {
        callback: &'static str,
        message: String,
    },

    #[error("Configuration error: {0}")]
    Configuration(String),
}

impl ProcessError {
    /// Listener faults fail the process they happened in
    pub fn escalate(self) -> Self {
        match self {
            ProcessError::ListenerFault { callback, message } => {
                ProcessError::RuntimeFault(format!("listener {} failed: {}", callback, message))
            }
            other => other,
        }
    }

    pub fn severity(&self) -> ErrorSeverity {
        match self {
            ProcessError::InvalidState { .. } => ErrorSeverity::Low,
            ProcessError::Configuration(_) => ErrorSeverity::Medium,
            ProcessError::InitializationFailure(_)
            | ProcessError::RuntimeFault(_)
            | ProcessError::ListenerFault { .. } => ErrorSeverity::High,
        }
    }
}

impl From<ConfigError> for ProcessError {
    fn from(err: ConfigError) -> Self {
        ProcessError::Configuration(err.to_string())
    }
}

/// Errors of calls marshalled onto the process thread
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ContextError {
    #[error(transparent)]
    Process(#[from] ProcessError),

    /// The script failed; reported to this caller only
    #[error("Script error: {0}")]
    Script(#[from] JsExecutionError),

    #[error("Blocking context call made from the process thread")]
    WouldBlockProcessThread,

    #[error("Process terminated before the call ran")]
    Abandoned,
}

pub type ProcessResult<T> = Result<T, ProcessError>;
