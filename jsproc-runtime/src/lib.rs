//! Process lifecycle manager for jsproc
//!
//! A [`Process`] runs one script engine on a dedicated thread with its own
//! single-threaded event loop. Callers observe the lifecycle through a
//! [`ProcessListener`], run code through a [`ContextHandle`], and keep the
//! loop alive past its natural end by holding [`LoopPreserver`]s.

pub mod context;
pub mod error;
mod event_loop;
pub mod listener;
pub mod preserver;
pub mod process;
pub mod state;

// Re-export commonly used types
pub use context::ContextHandle;
pub use error::{ContextError, ProcessError, ProcessResult};
pub use listener::{NoopListener, ProcessEvent, ProcessListener};
pub use preserver::LoopPreserver;
pub use process::{Process, ProcessOptions, ProcessOutcome, ProcessStats};
pub use state::ProcessState;

pub use jsproc_config::ProcessConfig;
pub use jsproc_js::{AccessPermissions, JsEngine, JsErrorType, JsExecutionError};
