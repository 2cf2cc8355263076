//! Shared fixtures for the lifecycle tests

#![allow(dead_code)]

use jsproc_runtime::{ContextHandle, Process, ProcessConfig, ProcessError, ProcessListener, ProcessOptions};
use std::sync::{Arc, Mutex};
use std::time::Instant;

type StartHook = Box<dyn FnMut(&Process, &ContextHandle) -> anyhow::Result<()> + Send>;
type AboutToExitHook = Box<dyn FnMut(&Process, i32) -> anyhow::Result<()> + Send>;

/// Ordered, timestamped record of the notifications a process delivered
#[derive(Clone, Default)]
pub struct EventLog(Arc<Mutex<Vec<(String, Instant)>>>);

impl EventLog {
    pub fn push(&self, event: impl Into<String>) {
        self.0.lock().unwrap().push((event.into(), Instant::now()));
    }

    pub fn names(&self) -> Vec<String> {
        self.0.lock().unwrap().iter().map(|(name, _)| name.clone()).collect()
    }

    /// When `event` was first recorded
    pub fn at(&self, event: &str) -> Option<Instant> {
        self.0
            .lock()
            .unwrap()
            .iter()
            .find(|(name, _)| name == event)
            .map(|(_, at)| *at)
    }
}

/// Listener that records every callback and can run test hooks
#[derive(Default)]
pub struct RecordingListener {
    log: EventLog,
    context: Option<ContextHandle>,
    on_start: Option<StartHook>,
    on_about_to_exit: Option<AboutToExitHook>,
}

impl RecordingListener {
    pub fn new(log: &EventLog) -> Self {
        Self {
            log: log.clone(),
            ..Self::default()
        }
    }

    pub fn on_start(
        mut self,
        hook: impl FnMut(&Process, &ContextHandle) -> anyhow::Result<()> + Send + 'static,
    ) -> Self {
        self.on_start = Some(Box::new(hook));
        self
    }

    pub fn on_about_to_exit(mut self, hook: impl FnMut(&Process, i32) -> anyhow::Result<()> + Send + 'static) -> Self {
        self.on_about_to_exit = Some(Box::new(hook));
        self
    }
}

impl ProcessListener for RecordingListener {
    fn on_process_start(&mut self, process: &Process, context: &ContextHandle) -> anyhow::Result<()> {
        self.log.push("start");
        self.context = Some(context.clone());
        match self.on_start.as_mut() {
            Some(hook) => hook(process, context),
            None => Ok(()),
        }
    }

    fn on_process_about_to_exit(&mut self, process: &Process, exit_code: i32) -> anyhow::Result<()> {
        self.log.push(format!("about_to_exit:{}", exit_code));
        match self.on_about_to_exit.as_mut() {
            Some(hook) => hook(process, exit_code),
            None => Ok(()),
        }
    }

    fn on_process_exit(&mut self, _process: &Process, exit_code: i32) -> anyhow::Result<()> {
        self.log.push(format!("exit:{}", exit_code));
        if let Some(context) = &self.context {
            self.log.push(format!("context_valid:{}", context.is_valid()));
        }
        Ok(())
    }

    fn on_process_failed(&mut self, _process: &Process, error: &ProcessError) {
        let kind = match error {
            ProcessError::InitializationFailure(_) => "initialization",
            ProcessError::RuntimeFault(_) => "runtime",
            ProcessError::ListenerFault { .. } => "listener",
            ProcessError::InvalidState { .. } => "invalid_state",
            ProcessError::Configuration(_) => "configuration",
        };
        self.log.push(format!("failed:{}", kind));
    }
}

/// Options with console output switched off
pub fn quiet_options(workspace: &str) -> ProcessOptions {
    ProcessOptions::new(workspace).with_config(ProcessConfig {
        enable_console: false,
        ..ProcessConfig::default()
    })
}

/// Create and start a process with quiet options
pub fn spawn(workspace: &str, listener: RecordingListener) -> Process {
    jsproc_logging::init_test_tracing();
    let process = Process::create(quiet_options(workspace), listener).unwrap();
    process.start().unwrap();
    process
}
