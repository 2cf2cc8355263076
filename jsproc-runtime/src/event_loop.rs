//! The process thread: engine ownership, task dispatch and the exit checkpoint

use crate::context::ContextHandle;
use crate::error::ProcessError;
use crate::listener::ProcessListener;
use crate::process::Process;
use crate::state::ProcessState;
use jsproc_js::{JsEngine, JsExecutionError};
use jsproc_logging::log_with_severity;
use std::any::Any;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::time::Instant;
use tokio::sync::mpsc;
use tracing::{debug, error, info, info_span, trace};

pub(crate) type Task = Box<dyn FnOnce(&mut JsEngine) -> Result<(), JsExecutionError> + Send>;

/// Messages posted to the process thread
pub(crate) enum Command {
    /// Queued work, already counted in the lifecycle record
    Run { operation: &'static str, task: Task },
    /// Re-run the idle check
    Wake,
}

/// Spawn the dedicated thread for `process`
pub(crate) fn spawn(process: Process) -> std::io::Result<()> {
    let config = process.config();
    let id = process.id().simple().to_string();
    let mut builder = std::thread::Builder::new().name(format!("{}-{}", config.thread_name_prefix, &id[..8]));
    if let Some(stack_size) = config.thread_stack_size {
        builder = builder.stack_size(stack_size);
    }

    builder.spawn(move || thread_main(process)).map(|_| ())
}

fn thread_main(process: Process) {
    let span = info_span!("process", process = %process.id(), workspace = %process.workspace());
    let _guard = span.enter();

    process.shared.bind_thread();

    let Some(parts) = process.shared.take_thread_parts() else {
        error!("Process thread started twice");
        return;
    };

    let mut event_loop = EventLoop {
        process,
        listener: parts.listener,
        commands: parts.commands,
        engine: None,
    };

    let runtime = match tokio::runtime::Builder::new_current_thread().enable_time().build() {
        Ok(runtime) => runtime,
        Err(e) => {
            event_loop.fail(ProcessError::InitializationFailure(format!(
                "Failed to build the event loop runtime: {}",
                e
            )));
            return;
        }
    };

    let started = catch_unwind(AssertUnwindSafe(|| event_loop.start())).unwrap_or_else(|panic| {
        let started = event_loop.process.shared.lifecycle().has_started();
        Err(panic_fault(started, "start", panic.as_ref()))
    });
    if let Err(error) = started {
        event_loop.fail(error);
        return;
    }

    // Engine code outside a task (timers, the exit checkpoint) can panic too.
    if let Err(panic) = catch_unwind(AssertUnwindSafe(|| runtime.block_on(event_loop.run()))) {
        let started = event_loop.process.shared.lifecycle().has_started();
        event_loop.fail(panic_fault(started, "the event loop", panic.as_ref()));
    }
    debug!("Process thread finished");
}

/// A panic that escaped the engine, classified by how far the process got
fn panic_fault(started: bool, place: &str, panic: &(dyn Any + Send)) -> ProcessError {
    let message = format!("Panic in {}: {}", place, panic_message(panic));
    if started {
        ProcessError::RuntimeFault(message)
    } else {
        ProcessError::InitializationFailure(message)
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(message) = panic.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}

struct EventLoop {
    process: Process,
    listener: Box<dyn ProcessListener>,
    commands: mpsc::UnboundedReceiver<Command>,
    engine: Option<JsEngine>,
}

impl EventLoop {
    fn engine(&mut self) -> Result<&mut JsEngine, ProcessError> {
        self.engine
            .as_mut()
            .ok_or_else(|| ProcessError::RuntimeFault("engine is gone".to_string()))
    }

    /// Run one listener callback, turning errors and panics into a fault
    fn notify<F>(&mut self, callback: &'static str, f: F) -> Result<(), ProcessError>
    where
        F: FnOnce(&mut dyn ProcessListener, &Process) -> anyhow::Result<()>,
    {
        trace!(callback, "Notifying listener");
        let process = self.process.clone();
        let listener = self.listener.as_mut();

        match catch_unwind(AssertUnwindSafe(|| f(listener, &process))) {
            Ok(Ok(())) => Ok(()),
            Ok(Err(e)) => Err(ProcessError::ListenerFault {
                callback,
                message: format!("{:#}", e),
            }),
            Err(panic) => Err(ProcessError::ListenerFault {
                callback,
                message: format!("panicked: {}", panic_message(panic.as_ref())),
            }),
        }
    }

    /// Starting -> Active, then `on_process_start`
    fn start(&mut self) -> Result<(), ProcessError> {
        let engine = JsEngine::new(self.process.shared.options.engine_options())
            .map_err(|e| ProcessError::InitializationFailure(e.to_string()))?;
        self.engine = Some(engine);

        self.process.shared.lifecycle().activate()?;
        info!("Process started");

        let context = ContextHandle::new(self.process.clone());
        self.notify("on_process_start", |listener, process| {
            listener.on_process_start(process, &context)
        })?;
        self.process.shared.publish(ProcessState::Active);
        Ok(())
    }

    /// Move to `Failed` and deliver `on_process_failed`, unless already terminal
    fn fail(&mut self, error: ProcessError) {
        let error = error.escalate();
        if !self.process.shared.lifecycle().fail(error.clone()) {
            debug!("Ignoring failure of a finished process: {}", error);
            let state = self.process.state();
            self.process.shared.publish(state);
            return;
        }

        log_with_severity!(error.severity(), "Process failed: {}", error);
        self.engine = None;

        let process = self.process.clone();
        let listener = self.listener.as_mut();
        if let Err(panic) = catch_unwind(AssertUnwindSafe(|| listener.on_process_failed(&process, &error))) {
            error!("on_process_failed panicked: {}", panic_message(panic.as_ref()));
        }
        self.process.shared.publish(ProcessState::Failed);
    }

    async fn run(&mut self) {
        loop {
            match self.turn().await {
                Ok(true) => return,
                Ok(false) => {}
                Err(error) => {
                    self.fail(error);
                    return;
                }
            }
        }
    }

    /// One loop iteration; `Ok(true)` once the process has exited
    async fn turn(&mut self) -> Result<bool, ProcessError> {
        self.fire_due_timers()?;

        while let Ok(command) = self.commands.try_recv() {
            self.dispatch(command)?;
        }

        if self.checkpoint()? {
            return Ok(true);
        }

        let deadline = self.engine()?.next_timer_deadline();
        let command = tokio::select! {
            command = self.commands.recv() => command,
            _ = sleep_until(deadline), if deadline.is_some() => None,
        };
        if let Some(command) = command {
            self.dispatch(command)?;
        }

        Ok(false)
    }

    fn dispatch(&mut self, command: Command) -> Result<(), ProcessError> {
        match command {
            Command::Run { operation, task } => self.run_task(operation, task),
            Command::Wake => {
                trace!("Woken up");
                Ok(())
            }
        }
    }

    fn run_task(&mut self, operation: &'static str, task: Task) -> Result<(), ProcessError> {
        let engine = self.engine()?;
        let result = catch_unwind(AssertUnwindSafe(|| task(engine)));
        if result.is_ok() {
            engine.run_jobs();
        }
        self.process.shared.lifecycle().task_finished();

        match result {
            Ok(Ok(())) => Ok(()),
            Ok(Err(e)) => Err(ProcessError::RuntimeFault(format!("Uncaught error in {}: {}", operation, e))),
            Err(panic) => Err(ProcessError::RuntimeFault(format!(
                "Task {} panicked: {}",
                operation,
                panic_message(panic.as_ref())
            ))),
        }
    }

    fn fire_due_timers(&mut self) -> Result<(), ProcessError> {
        let fired = self
            .engine()?
            .run_due_timers(Instant::now())
            .map_err(|e| ProcessError::RuntimeFault(format!("Uncaught error in timer: {}", e)))?;
        if fired > 0 {
            trace!(fired, "Timers fired");
        }
        Ok(())
    }

    /// The exit checkpoint; `Ok(true)` once `Exited` has been committed
    fn checkpoint(&mut self) -> Result<bool, ProcessError> {
        let engine = self.engine()?;
        let exit_code = engine.exit_code();
        let timers_pending = engine.has_pending_timers();

        if !self.process.shared.lifecycle().enter_about_to_exit(timers_pending) {
            return Ok(false);
        }

        debug!(exit_code, "Process is about to exit");
        self.process.shared.publish(ProcessState::AboutToExit);
        self.notify("on_process_about_to_exit", |listener, process| {
            listener.on_process_about_to_exit(process, exit_code)
        })?;

        let engine = self.engine()?;
        let exit_code = engine.exit_code();
        let timers_pending = engine.has_pending_timers();

        if !self.process.shared.lifecycle().commit_exit(exit_code, timers_pending) {
            debug!("Exit vetoed, process is active again");
            self.process.shared.publish(ProcessState::Active);
            return Ok(false);
        }

        info!(exit_code, "Process exited");
        self.engine = None;

        if let Err(fault) = self.notify("on_process_exit", |listener, process| {
            listener.on_process_exit(process, exit_code)
        }) {
            log_with_severity!(fault.severity(), "Listener fault after exit: {}", fault);
        }
        self.process.shared.publish(ProcessState::Exited);
        Ok(true)
    }
}

async fn sleep_until(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(tokio::time::Instant::from_std(deadline)).await,
        None => std::future::pending().await,
    }
}
