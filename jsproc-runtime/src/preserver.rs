//! Loop preservers: tokens that keep a process's event loop alive

use crate::error::ProcessResult;
use crate::event_loop::Command;
use crate::process::Process;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{trace, warn};

/// Keeps the owning process from exiting while it is held
///
/// Release is idempotent. A preserver dropped without being released is
/// released on drop with a warning, or panics when the process was
/// configured with `strict_preservers`.
pub struct LoopPreserver {
    process: Process,
    released: AtomicBool,
}

impl LoopPreserver {
    /// Valid while the process is starting, active or about to exit
    pub fn acquire(process: &Process) -> ProcessResult<Self> {
        process.shared.lifecycle().acquire_preserver()?;
        trace!(process = %process.id(), "Loop preserver acquired");

        Ok(Self {
            process: process.clone(),
            released: AtomicBool::new(false),
        })
    }

    pub fn release(&self) {
        if self.released.swap(true, Ordering::AcqRel) {
            return;
        }

        let reached_zero = self.process.shared.lifecycle().release_preserver();
        trace!(process = %self.process.id(), reached_zero, "Loop preserver released");

        if reached_zero {
            // The loop re-runs its idle check on its own thread.
            self.process.shared.send(Command::Wake);
        }
    }

    pub fn is_released(&self) -> bool {
        self.released.load(Ordering::Acquire)
    }

    pub fn process(&self) -> &Process {
        &self.process
    }
}

impl fmt::Debug for LoopPreserver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoopPreserver")
            .field("process", &self.process.id())
            .field("released", &self.is_released())
            .finish()
    }
}

impl Drop for LoopPreserver {
    fn drop(&mut self) {
        if self.is_released() {
            return;
        }

        warn!(
            process = %self.process.id(),
            workspace = %self.process.workspace(),
            "Loop preserver dropped without being released"
        );
        self.process.shared.lifecycle().record_unreleased_drop();
        self.release();

        if self.process.config().strict_preservers && !std::thread::panicking() {
            panic!(
                "loop preserver for process {} dropped without being released",
                self.process.id()
            );
        }
    }
}
