//! `jsproc run`: execute a script file as a process

use anyhow::{Context, Result};
use jsproc_config::ProcessConfig;
use jsproc_runtime::{
    AccessPermissions, ContextHandle, Process, ProcessError, ProcessListener, ProcessOptions, ProcessOutcome,
};
use std::path::Path;
use tokio::time::timeout;
use tracing::{debug, error, info};

/// Exit status used when the process fails or times out
pub const FAILURE_EXIT_CODE: i32 = 1;

/// Queues the script once the engine is up
struct ScriptListener {
    source: Option<String>,
}

impl ProcessListener for ScriptListener {
    fn on_process_start(&mut self, process: &Process, context: &ContextHandle) -> anyhow::Result<()> {
        if let Some(source) = self.source.take() {
            debug!(process = %process.id(), "Scheduling main script");
            context.schedule_script(source)?;
        }
        Ok(())
    }

    fn on_process_exit(&mut self, process: &Process, exit_code: i32) -> anyhow::Result<()> {
        info!(process = %process.id(), exit_code, "Script finished");
        Ok(())
    }

    fn on_process_failed(&mut self, process: &Process, error: &ProcessError) {
        error!(process = %process.id(), "Script failed: {}", error);
    }
}

/// Run `script` to completion and return the exit status for the binary
pub async fn run_script(
    script: &Path,
    workspace: &str,
    read_only: bool,
    config: ProcessConfig,
) -> Result<i32> {
    let source = std::fs::read_to_string(script)
        .with_context(|| format!("Failed to read script {:?}", script))?;

    let permissions = if read_only {
        AccessPermissions::READ
    } else {
        AccessPermissions::READ_WRITE
    };
    let start_timeout = config.start_timeout;
    let exit_timeout = config.exit_timeout;

    let options = ProcessOptions::new(workspace)
        .with_permissions(permissions)
        .with_config(config);
    let process = Process::create(options, ScriptListener { source: Some(source) })?;

    info!(process = %process.id(), "Running {:?} in workspace '{}'", script, workspace);
    process.start()?;

    match timeout(start_timeout, process.wait_for_start()).await {
        Ok(Ok(())) => {}
        Ok(Err(e)) => {
            eprintln!("jsproc: {}", e);
            return Ok(FAILURE_EXIT_CODE);
        }
        Err(_) => {
            eprintln!("jsproc: process did not start within {:?}", start_timeout);
            return Ok(FAILURE_EXIT_CODE);
        }
    }

    match timeout(exit_timeout, process.wait_for_completion()).await {
        Ok(Ok(ProcessOutcome::Exited(code))) => Ok(code),
        Ok(Ok(ProcessOutcome::Failed(e))) | Ok(Err(e)) => {
            eprintln!("jsproc: {}", e);
            Ok(FAILURE_EXIT_CODE)
        }
        Err(_) => {
            eprintln!("jsproc: process did not exit within {:?}", exit_timeout);
            Ok(FAILURE_EXIT_CODE)
        }
    }
}
