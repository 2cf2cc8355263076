//! Lifecycle notifications

use crate::context::ContextHandle;
use crate::error::ProcessError;
use crate::process::Process;
use tokio::sync::mpsc;
use tracing::debug;

/// Receives the lifecycle notifications of one process
///
/// Every callback runs on the process thread and never concurrently with
/// engine work. Returning `Err` (or panicking) from one of the fallible
/// callbacks fails the process.
pub trait ProcessListener: Send + 'static {
    /// The engine is ready; `context` becomes usable from here on
    fn on_process_start(&mut self, process: &Process, context: &ContextHandle) -> anyhow::Result<()> {
        let _ = (process, context);
        Ok(())
    }

    /// The loop drained; acquiring a preserver or queueing work here keeps
    /// the process alive
    fn on_process_about_to_exit(&mut self, process: &Process, exit_code: i32) -> anyhow::Result<()> {
        let _ = (process, exit_code);
        Ok(())
    }

    /// Terminal; the context is no longer valid
    fn on_process_exit(&mut self, process: &Process, exit_code: i32) -> anyhow::Result<()> {
        let _ = (process, exit_code);
        Ok(())
    }

    /// Terminal; never follows `on_process_exit`
    fn on_process_failed(&mut self, process: &Process, error: &ProcessError) {
        let _ = (process, error);
    }
}

/// Lifecycle notification as a value
#[derive(Debug, Clone)]
pub enum ProcessEvent {
    Started {
        process: Process,
        context: ContextHandle,
    },
    AboutToExit {
        process: Process,
        exit_code: i32,
    },
    Exited {
        process: Process,
        exit_code: i32,
    },
    Failed {
        process: Process,
        error: ProcessError,
    },
}

impl ProcessEvent {
    pub fn process(&self) -> &Process {
        match self {
            ProcessEvent::Started { process, .. }
            | ProcessEvent::AboutToExit { process, .. }
            | ProcessEvent::Exited { process, .. }
            | ProcessEvent::Failed { process, .. } => process,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            ProcessEvent::Started { .. } => "started",
            ProcessEvent::AboutToExit { .. } => "about_to_exit",
            ProcessEvent::Exited { .. } => "exited",
            ProcessEvent::Failed { .. } => "failed",
        }
    }
}

fn forward(tx: &mpsc::UnboundedSender<ProcessEvent>, event: ProcessEvent) {
    let name = event.name();
    if tx.send(event).is_err() {
        debug!("Dropping {} event, receiver is gone", name);
    }
}

/// Forwards every notification into a channel
impl ProcessListener for mpsc::UnboundedSender<ProcessEvent> {
    fn on_process_start(&mut self, process: &Process, context: &ContextHandle) -> anyhow::Result<()> {
        forward(
            self,
            ProcessEvent::Started {
                process: process.clone(),
                context: context.clone(),
            },
        );
        Ok(())
    }

    fn on_process_about_to_exit(&mut self, process: &Process, exit_code: i32) -> anyhow::Result<()> {
        forward(
            self,
            ProcessEvent::AboutToExit {
                process: process.clone(),
                exit_code,
            },
        );
        Ok(())
    }

    fn on_process_exit(&mut self, process: &Process, exit_code: i32) -> anyhow::Result<()> {
        forward(
            self,
            ProcessEvent::Exited {
                process: process.clone(),
                exit_code,
            },
        );
        Ok(())
    }

    fn on_process_failed(&mut self, process: &Process, error: &ProcessError) {
        forward(
            self,
            ProcessEvent::Failed {
                process: process.clone(),
                error: error.clone(),
            },
        );
    }
}

/// Listener that ignores every notification
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopListener;

impl ProcessListener for NoopListener {}
