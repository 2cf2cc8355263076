//! Process states and the lifecycle record guarded by the process lock

use crate::error::ProcessError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Lifecycle state of a [`crate::Process`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProcessState {
    Created,
    Starting,
    Active,
    AboutToExit,
    Exited,
    Failed,
}

impl ProcessState {
    /// `Exited` and `Failed` are final
    pub fn is_terminal(&self) -> bool {
        matches!(self, ProcessState::Exited | ProcessState::Failed)
    }

    /// States in which work can be queued and preservers acquired
    pub fn accepts_work(&self) -> bool {
        matches!(
            self,
            ProcessState::Starting | ProcessState::Active | ProcessState::AboutToExit
        )
    }
}

impl fmt::Display for ProcessState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ProcessState::Created => "created",
            ProcessState::Starting => "starting",
            ProcessState::Active => "active",
            ProcessState::AboutToExit => "about_to_exit",
            ProcessState::Exited => "exited",
            ProcessState::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// Everything the lifecycle lock protects
///
/// All transitions go through these methods, so the invariants (preserver
/// count never negative, no AboutToExit while work or preservers remain,
/// exactly one terminal state) hold regardless of which thread calls them.
#[derive(Debug, Clone)]
pub(crate) struct Lifecycle {
    state: ProcessState,
    started: bool,
    preservers: usize,
    queued: usize,
    exit_code: Option<i32>,
    failure: Option<ProcessError>,
    preservers_issued: u64,
    preservers_dropped_unreleased: u64,
}

impl Default for Lifecycle {
    fn default() -> Self {
        Self {
            state: ProcessState::Created,
            started: false,
            preservers: 0,
            queued: 0,
            exit_code: None,
            failure: None,
            preservers_issued: 0,
            preservers_dropped_unreleased: 0,
        }
    }
}

impl Lifecycle {
    pub fn state(&self) -> ProcessState {
        self.state
    }

    pub fn has_started(&self) -> bool {
        self.started
    }

    pub fn preservers(&self) -> usize {
        self.preservers
    }

    pub fn queued(&self) -> usize {
        self.queued
    }

    pub fn exit_code(&self) -> Option<i32> {
        self.exit_code
    }

    pub fn failure(&self) -> Option<&ProcessError> {
        self.failure.as_ref()
    }

    pub fn preservers_issued(&self) -> u64 {
        self.preservers_issued
    }

    pub fn preservers_dropped_unreleased(&self) -> u64 {
        self.preservers_dropped_unreleased
    }

    fn invalid(&self, operation: &'static str) -> ProcessError {
        ProcessError::InvalidState {
            operation,
            state: self.state,
        }
    }

    /// Created -> Starting
    pub fn begin_start(&mut self) -> Result<(), ProcessError> {
        if self.state != ProcessState::Created {
            return Err(self.invalid("start"));
        }
        self.state = ProcessState::Starting;
        Ok(())
    }

    /// Starting -> Active
    pub fn activate(&mut self) -> Result<(), ProcessError> {
        if self.state != ProcessState::Starting {
            return Err(self.invalid("activate"));
        }
        self.state = ProcessState::Active;
        self.started = true;
        Ok(())
    }

    /// New work observed during the exit checkpoint vetoes the exit
    fn veto_exit(&mut self) {
        if self.state == ProcessState::AboutToExit {
            self.state = ProcessState::Active;
        }
    }

    pub fn acquire_preserver(&mut self) -> Result<(), ProcessError> {
        if !self.state.accepts_work() {
            return Err(self.invalid("acquire_preserver"));
        }
        self.veto_exit();
        self.preservers += 1;
        self.preservers_issued += 1;
        Ok(())
    }

    /// Returns `true` when this release brought the count to zero
    pub fn release_preserver(&mut self) -> bool {
        if self.preservers == 0 {
            return false;
        }
        self.preservers -= 1;
        self.preservers == 0
    }

    pub fn record_unreleased_drop(&mut self) {
        self.preservers_dropped_unreleased += 1;
    }

    pub fn enqueue(&mut self, operation: &'static str) -> Result<(), ProcessError> {
        if !self.state.accepts_work() {
            return Err(self.invalid(operation));
        }
        self.veto_exit();
        self.queued += 1;
        Ok(())
    }

    pub fn task_finished(&mut self) {
        self.queued = self.queued.saturating_sub(1);
    }

    pub fn is_idle(&self, timers_pending: bool) -> bool {
        self.queued == 0 && self.preservers == 0 && !timers_pending
    }

    /// Active -> AboutToExit when nothing keeps the loop alive
    pub fn enter_about_to_exit(&mut self, timers_pending: bool) -> bool {
        if self.state != ProcessState::Active || !self.is_idle(timers_pending) {
            return false;
        }
        self.state = ProcessState::AboutToExit;
        true
    }

    /// AboutToExit -> Exited, unless the checkpoint was vetoed
    pub fn commit_exit(&mut self, exit_code: i32, timers_pending: bool) -> bool {
        if self.state != ProcessState::AboutToExit || !self.is_idle(timers_pending) {
            self.veto_exit();
            return false;
        }
        self.state = ProcessState::Exited;
        self.exit_code = Some(exit_code);
        true
    }

    /// Any non-terminal state -> Failed; returns `false` if already terminal
    pub fn fail(&mut self, error: ProcessError) -> bool {
        if self.state.is_terminal() {
            return false;
        }
        self.state = ProcessState::Failed;
        self.failure = Some(error);
        true
    }
}
