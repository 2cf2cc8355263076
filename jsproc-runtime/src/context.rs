//! Marshalling calls onto the process thread

use crate::error::ContextError;
use crate::event_loop::{Command, Task};
use crate::process::Process;
use jsproc_js::{JsEngine, JsExecutionError};
use serde_json::Value as JsonValue;
use std::fmt;
use std::sync::mpsc as std_mpsc;
use tokio::sync::oneshot;
use tracing::trace;

/// Handle to the execution context of a running process
///
/// Every call is queued on the process thread and counts as pending work
/// until it has run. Handles stay safe to use after the process ends: calls
/// then fail with [`ContextError::Process`].
#[derive(Clone)]
pub struct ContextHandle {
    process: Process,
}

impl fmt::Debug for ContextHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ContextHandle")
            .field("process", &self.process.id())
            .field("valid", &self.is_valid())
            .finish()
    }
}

impl ContextHandle {
    pub(crate) fn new(process: Process) -> Self {
        Self { process }
    }

    pub fn process(&self) -> &Process {
        &self.process
    }

    /// Whether calls can still be queued
    pub fn is_valid(&self) -> bool {
        self.process.state().accepts_work()
    }

    fn submit(&self, operation: &'static str, task: Task) -> Result<(), ContextError> {
        let shared = &self.process.shared;
        {
            let mut lifecycle = shared.lifecycle();
            lifecycle.enqueue(operation)?;
            // Sent under the lock so the count and the queue agree.
            if !shared.send(Command::Run { operation, task }) {
                lifecycle.task_finished();
                return Err(ContextError::Abandoned);
            }
        }
        trace!(process = %self.process.id(), operation, "Queued context call");
        Ok(())
    }

    /// Run `f` against the engine and block until it returns
    ///
    /// Fails with [`ContextError::WouldBlockProcessThread`] when called from
    /// the process thread itself.
    pub fn with_context<R, F>(&self, f: F) -> Result<R, ContextError>
    where
        R: Send + 'static,
        F: FnOnce(&mut JsEngine) -> Result<R, JsExecutionError> + Send + 'static,
    {
        if self.process.is_process_thread() {
            return Err(ContextError::WouldBlockProcessThread);
        }

        let (reply_tx, reply_rx) = std_mpsc::channel();
        self.submit(
            "with_context",
            Box::new(move |engine| {
                let _ = reply_tx.send(f(engine));
                Ok(())
            }),
        )?;

        reply_rx
            .recv()
            .map_err(|_| ContextError::Abandoned)?
            .map_err(ContextError::Script)
    }

    /// Run `f` against the engine and await its result
    pub async fn with_context_async<R, F>(&self, f: F) -> Result<R, ContextError>
    where
        R: Send + 'static,
        F: FnOnce(&mut JsEngine) -> Result<R, JsExecutionError> + Send + 'static,
    {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.submit(
            "with_context_async",
            Box::new(move |engine| {
                let _ = reply_tx.send(f(engine));
                Ok(())
            }),
        )?;

        reply_rx
            .await
            .map_err(|_| ContextError::Abandoned)?
            .map_err(ContextError::Script)
    }

    /// Evaluate script source and return its completion value as JSON
    pub fn eval(&self, code: impl Into<String>) -> Result<JsonValue, ContextError> {
        let code = code.into();
        self.with_context(move |engine| engine.eval_json(&code))
    }

    pub async fn eval_async(&self, code: impl Into<String>) -> Result<JsonValue, ContextError> {
        let code = code.into();
        self.with_context_async(move |engine| engine.eval_json(&code))
            .await
    }

    /// Read a global binding (`null` when undefined)
    pub fn global(&self, name: impl Into<String>) -> Result<JsonValue, ContextError> {
        let name = name.into();
        self.with_context(move |engine| engine.get_global(&name))
    }

    pub fn set_global(&self, name: impl Into<String>, value: JsonValue) -> Result<(), ContextError> {
        let name = name.into();
        self.with_context(move |engine| engine.set_global(&name, &value))
    }

    /// Queue a task without waiting for it
    ///
    /// An `Err` from the task is uncaught and fails the process.
    pub fn schedule<F>(&self, task: F) -> Result<(), ContextError>
    where
        F: FnOnce(&mut JsEngine) -> Result<(), JsExecutionError> + Send + 'static,
    {
        self.submit("schedule", Box::new(task))
    }

    /// Queue script source without waiting for it
    pub fn schedule_script(&self, source: impl Into<String>) -> Result<(), ContextError> {
        let source = source.into();
        self.submit(
            "schedule_script",
            Box::new(move |engine| engine.eval(&source).map(|_| ())),
        )
    }
}
