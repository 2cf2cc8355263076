//! JavaScript execution context for jsproc
//!
//! This crate wraps a Boa engine instance as the execution context owned by a
//! jsproc process: script evaluation, JSON conversion, Node-style timers and
//! the `process` global. A [`JsEngine`] is not `Send`; it lives on the thread
//! that created it.

pub mod conversion;
pub mod engine;
pub mod error_handling;
pub mod permissions;
pub mod timers;
pub mod types;

// Re-export main types for convenience
pub use conversion::{js_to_json, json_to_js};
pub use engine::JsEngine;
pub use error_handling::parse_js_error;
pub use permissions::AccessPermissions;
pub use types::{validate_workspace_id, EngineOptions};

// JavaScript error types
use thiserror::Error;

/// JavaScript error types thrown from script code
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum JsErrorType {
    #[error("TypeError: {0}")]
    TypeError(String),

    #[error("RangeError: {0}")]
    RangeError(String),

    #[error("ReferenceError: {0}")]
    ReferenceError(String),

    #[error("SyntaxError: {0}")]
    SyntaxError(String),

    #[error("EvalError: {0}")]
    EvalError(String),

    #[error("URIError: {0}")]
    UriError(String),

    #[error("Error: {0}")]
    Error(String),

    /// A user-defined error class such as `class ValidationError extends Error`
    #[error("{name}: {message}")]
    Custom { name: String, message: String },

    /// A thrown value that is not an error object, e.g. `throw 42`
    #[error("Uncaught {0}")]
    Thrown(String),
}

impl JsErrorType {
    /// The error's message without its type prefix
    pub fn message(&self) -> &str {
        match self {
            JsErrorType::TypeError(message)
            | JsErrorType::RangeError(message)
            | JsErrorType::ReferenceError(message)
            | JsErrorType::SyntaxError(message)
            | JsErrorType::EvalError(message)
            | JsErrorType::UriError(message)
            | JsErrorType::Error(message)
            | JsErrorType::Thrown(message) => message,
            JsErrorType::Custom { message, .. } => message,
        }
    }
}

/// JavaScript execution errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum JsExecutionError {
    #[error("Compile error: {0}")]
    CompileError(String),

    #[error("Execution error: {0}")]
    ExecutionError(String),

    #[error("JavaScript error: {0}")]
    TypedJsError(JsErrorType),

    #[error("Input preparation error: {0}")]
    InputError(String),

    #[error("Output conversion error: {0}")]
    OutputError(String),

    #[error("Context error: {0}")]
    ContextError(String),

    #[error("Invalid workspace identity '{workspace}': {reason}")]
    InvalidWorkspace { workspace: String, reason: String },
}
