//! The process handle and its shared state

use crate::error::{ProcessError, ProcessResult};
use crate::event_loop::{self, Command};
use crate::listener::ProcessListener;
use crate::preserver::LoopPreserver;
use crate::state::{Lifecycle, ProcessState};
use jsproc_config::{ProcessConfig, Validatable};
use jsproc_js::{AccessPermissions, EngineOptions};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, OnceLock, PoisonError};
use std::thread::ThreadId;
use tokio::sync::{mpsc, watch};
use tracing::{debug, error, info};
use uuid::Uuid;

/// Everything needed to create a [`Process`]
#[derive(Debug, Clone)]
pub struct ProcessOptions {
    pub workspace: String,
    pub permissions: AccessPermissions,
    pub config: ProcessConfig,
}

impl ProcessOptions {
    pub fn new(workspace: impl Into<String>) -> Self {
        Self {
            workspace: workspace.into(),
            permissions: AccessPermissions::default(),
            config: ProcessConfig::default(),
        }
    }

    pub fn with_permissions(mut self, permissions: AccessPermissions) -> Self {
        self.permissions = permissions;
        self
    }

    pub fn with_config(mut self, config: ProcessConfig) -> Self {
        self.config = config;
        self
    }

    pub(crate) fn engine_options(&self) -> EngineOptions {
        let mut options = EngineOptions::new(self.workspace.clone())
            .with_permissions(self.permissions)
            .with_console(self.config.enable_console)
            .with_timers(self.config.enable_timers);
        if let Some(bootstrap) = &self.config.bootstrap_script {
            options = options.with_bootstrap(bootstrap.clone());
        }
        options
    }
}

/// Snapshot of a process's lifecycle counters
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessStats {
    pub state: ProcessState,
    pub outstanding_preservers: usize,
    pub preservers_issued: u64,
    pub preservers_dropped_unreleased: u64,
    pub queued_tasks: usize,
}

/// How a process ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProcessOutcome {
    Exited(i32),
    Failed(ProcessError),
}

impl ProcessOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, ProcessOutcome::Exited(0))
    }

    pub fn exit_code(&self) -> Option<i32> {
        match self {
            ProcessOutcome::Exited(code) => Some(*code),
            ProcessOutcome::Failed(_) => None,
        }
    }
}

pub(crate) struct ProcessShared {
    pub(crate) id: Uuid,
    pub(crate) options: ProcessOptions,
    lifecycle: Mutex<Lifecycle>,
    commands: mpsc::UnboundedSender<Command>,
    thread_parts: Mutex<Option<ThreadParts>>,
    state_tx: watch::Sender<ProcessState>,
    thread_id: OnceLock<ThreadId>,
}

/// What the process thread takes ownership of when it starts
pub(crate) struct ThreadParts {
    pub(crate) commands: mpsc::UnboundedReceiver<Command>,
    pub(crate) listener: Box<dyn ProcessListener>,
}

impl ProcessShared {
    pub(crate) fn lifecycle(&self) -> MutexGuard<'_, Lifecycle> {
        self.lifecycle.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub(crate) fn take_thread_parts(&self) -> Option<ThreadParts> {
        self.thread_parts.lock().unwrap_or_else(PoisonError::into_inner).take()
    }

    pub(crate) fn send(&self, command: Command) -> bool {
        self.commands.send(command).is_ok()
    }

    /// Publish a state change to `wait_for_*` callers
    pub(crate) fn publish(&self, state: ProcessState) {
        self.state_tx.send_replace(state);
    }

    pub(crate) fn bind_thread(&self) {
        let _ = self.thread_id.set(std::thread::current().id());
    }
}

/// One script engine running its event loop on a dedicated thread
///
/// `Process` is a cheap handle; clones refer to the same process.
#[derive(Clone)]
pub struct Process {
    pub(crate) shared: Arc<ProcessShared>,
}

impl fmt::Debug for Process {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Process")
            .field("id", &self.shared.id)
            .field("workspace", &self.shared.options.workspace)
            .field("state", &self.state())
            .finish()
    }
}

impl PartialEq for Process {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.shared, &other.shared)
    }
}

impl Eq for Process {}

impl Process {
    /// Create a process with the default configuration and start it
    pub fn new(
        workspace: impl Into<String>,
        permissions: AccessPermissions,
        listener: impl ProcessListener,
    ) -> ProcessResult<Self> {
        let options = ProcessOptions::new(workspace).with_permissions(permissions);
        let process = Self::create(options, listener)?;
        process.start()?;
        Ok(process)
    }

    /// Create a process in the `Created` state
    ///
    /// Only the configuration is checked here; the workspace identity is
    /// validated while starting and reported through `on_process_failed`.
    pub fn create(options: ProcessOptions, listener: impl ProcessListener) -> ProcessResult<Self> {
        options.config.validate()?;

        let (commands_tx, commands_rx) = mpsc::unbounded_channel();
        let (state_tx, _) = watch::channel(ProcessState::Created);
        let id = Uuid::new_v4();

        debug!(process = %id, workspace = %options.workspace, "Creating process");

        Ok(Self {
            shared: Arc::new(ProcessShared {
                id,
                options,
                lifecycle: Mutex::new(Lifecycle::default()),
                commands: commands_tx,
                thread_parts: Mutex::new(Some(ThreadParts {
                    commands: commands_rx,
                    listener: Box::new(listener),
                })),
                state_tx,
                thread_id: OnceLock::new(),
            }),
        })
    }

    /// Spawn the process thread
    ///
    /// If the thread cannot be spawned the process fails: the listener is
    /// notified on the calling thread and the error is also returned.
    pub fn start(&self) -> ProcessResult<()> {
        self.shared.lifecycle().begin_start()?;
        self.shared.publish(ProcessState::Starting);
        info!(process = %self.id(), workspace = %self.workspace(), "Starting process");

        if let Err(e) = event_loop::spawn(self.clone()) {
            let error = ProcessError::InitializationFailure(format!("Failed to spawn process thread: {}", e));
            error!(process = %self.id(), "{}", error);
            self.shared.lifecycle().fail(error.clone());
            if let Some(mut parts) = self.shared.take_thread_parts() {
                parts.listener.on_process_failed(self, &error);
            }
            self.shared.publish(ProcessState::Failed);
            return Err(error);
        }

        Ok(())
    }

    pub fn id(&self) -> Uuid {
        self.shared.id
    }

    pub fn workspace(&self) -> &str {
        &self.shared.options.workspace
    }

    pub fn permissions(&self) -> AccessPermissions {
        self.shared.options.permissions
    }

    pub fn config(&self) -> &ProcessConfig {
        &self.shared.options.config
    }

    pub fn state(&self) -> ProcessState {
        self.shared.lifecycle().state()
    }

    /// Set once the process has exited
    pub fn exit_code(&self) -> Option<i32> {
        self.shared.lifecycle().exit_code()
    }

    /// Set once the process has failed
    pub fn failure(&self) -> Option<ProcessError> {
        self.shared.lifecycle().failure().cloned()
    }

    /// Acquire a loop preserver
    pub fn keep_alive(&self) -> ProcessResult<LoopPreserver> {
        LoopPreserver::acquire(self)
    }

    pub fn stats(&self) -> ProcessStats {
        let lifecycle = self.shared.lifecycle();
        ProcessStats {
            state: lifecycle.state(),
            outstanding_preservers: lifecycle.preservers(),
            preservers_issued: lifecycle.preservers_issued(),
            preservers_dropped_unreleased: lifecycle.preservers_dropped_unreleased(),
            queued_tasks: lifecycle.queued(),
        }
    }

    /// Wait until `on_process_start` has been delivered
    ///
    /// Returns the failure if the process failed before it started.
    pub async fn wait_for_start(&self) -> ProcessResult<()> {
        let mut rx = self.shared.state_tx.subscribe();
        if *rx.borrow_and_update() == ProcessState::Created {
            return Err(ProcessError::InvalidState {
                operation: "wait_for_start",
                state: ProcessState::Created,
            });
        }
        let _ = rx
            .wait_for(|state| !matches!(state, ProcessState::Created | ProcessState::Starting))
            .await;

        let lifecycle = self.shared.lifecycle();
        if lifecycle.has_started() {
            Ok(())
        } else {
            Err(lifecycle
                .failure()
                .cloned()
                .unwrap_or_else(|| ProcessError::InitializationFailure("process did not start".to_string())))
        }
    }

    /// Wait until the final notification has been delivered
    pub async fn wait_for_completion(&self) -> ProcessResult<ProcessOutcome> {
        let mut rx = self.shared.state_tx.subscribe();
        if *rx.borrow_and_update() == ProcessState::Created {
            return Err(ProcessError::InvalidState {
                operation: "wait_for_completion",
                state: ProcessState::Created,
            });
        }
        let _ = rx.wait_for(ProcessState::is_terminal).await;

        let lifecycle = self.shared.lifecycle();
        match (lifecycle.exit_code(), lifecycle.failure()) {
            (Some(code), _) => Ok(ProcessOutcome::Exited(code)),
            (None, Some(error)) => Ok(ProcessOutcome::Failed(error.clone())),
            (None, None) => Err(ProcessError::InvalidState {
                operation: "wait_for_completion",
                state: lifecycle.state(),
            }),
        }
    }

    /// Whether the caller is running on this process's thread
    pub fn is_process_thread(&self) -> bool {
        self.shared.thread_id.get() == Some(&std::thread::current().id())
    }
}
