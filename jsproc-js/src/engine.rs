//! The execution context owned by a process

use crate::conversion::{js_to_json, json_to_js};
use crate::error_handling::parse_js_error;
use crate::permissions::AccessPermissions;
use crate::types::{validate_workspace_id, EngineOptions};
use crate::{timers, JsExecutionError};
use boa_engine::{
    js_string, property::PropertyKey, Context as BoaContext, JsObject, JsString, JsValue, Script, Source,
};
use serde_json::Value as JsonValue;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;
use tracing::{debug, trace};

static NEXT_ENGINE_ID: AtomicU64 = AtomicU64::new(1);

/// One isolated Boa environment
///
/// The engine is created on, and must stay on, the thread that runs its
/// event loop. Dropping it discards its pending timers.
pub struct JsEngine {
    id: u64,
    context: BoaContext,
    workspace: String,
    permissions: AccessPermissions,
}

impl std::fmt::Debug for JsEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JsEngine")
            .field("id", &self.id)
            .field("workspace", &self.workspace)
            .field("permissions", &self.permissions)
            .finish_non_exhaustive()
    }
}

impl JsEngine {
    /// Build an engine: validate the workspace, install the globals, then run
    /// the bootstrap script if one is configured
    pub fn new(options: EngineOptions) -> Result<Self, JsExecutionError> {
        validate_workspace_id(&options.workspace)?;

        let context = BoaContext::builder()
            .build()
            .map_err(|e| JsExecutionError::ContextError(format!("Failed to create context: {}", e)))?;

        let mut engine = Self {
            id: NEXT_ENGINE_ID.fetch_add(1, Ordering::Relaxed),
            context,
            workspace: options.workspace,
            permissions: options.permissions,
        };

        if options.enable_console {
            engine.install_console()?;
        }
        engine.install_process_global()?;
        if options.enable_timers {
            timers::install(&mut engine.context, engine.id)?;
        }

        if let Some(bootstrap) = options.bootstrap_script.as_deref() {
            debug!(workspace = %engine.workspace, "Running bootstrap script");
            engine
                .eval(bootstrap)
                .map_err(|e| JsExecutionError::ContextError(format!("Bootstrap script failed: {}", e)))?;
            engine.run_jobs();
        }

        debug!(engine = engine.id, workspace = %engine.workspace, "Engine ready");
        Ok(engine)
    }

    #[cfg(feature = "console")]
    fn install_console(&mut self) -> Result<(), JsExecutionError> {
        let console = boa_runtime::Console::init(&mut self.context);
        self.context
            .register_global_property(js_string!("console"), console, boa_engine::property::Attribute::all())
            .map_err(|e| JsExecutionError::ContextError(format!("Failed to install console: {}", e)))
    }

    #[cfg(not(feature = "console"))]
    fn install_console(&mut self) -> Result<(), JsExecutionError> {
        trace!("Console support not compiled in");
        Ok(())
    }

    fn install_process_global(&mut self) -> Result<(), JsExecutionError> {
        let workspace = serde_json::to_string(&self.workspace)
            .map_err(|e| JsExecutionError::InputError(e.to_string()))?;

        let code = format!(
            "Object.defineProperty(globalThis, 'process', {{ value: {{ \
                workspace: {}, \
                permissions: Object.freeze({{ read: {}, write: {} }}), \
                exitCode: 0 \
            }} }});",
            workspace,
            self.permissions.can_read(),
            self.permissions.can_write()
        );

        self.context
            .eval(Source::from_bytes(&code))
            .map(|_| ())
            .map_err(|e| JsExecutionError::ContextError(format!("Failed to install process global: {}", e)))
    }

    /// Unique id of this engine instance
    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn workspace(&self) -> &str {
        &self.workspace
    }

    pub fn permissions(&self) -> AccessPermissions {
        self.permissions
    }

    /// Compile and evaluate script source
    pub fn eval(&mut self, code: &str) -> Result<JsValue, JsExecutionError> {
        trace!(engine = self.id, "Evaluating {} bytes of script", code.len());
        let script = Script::parse(Source::from_bytes(code), None, &mut self.context)
            .map_err(|e| JsExecutionError::CompileError(e.to_string()))?;

        script
            .evaluate(&mut self.context)
            .map_err(|e| JsExecutionError::TypedJsError(parse_js_error(&e.to_string())))
    }

    /// Evaluate script source and convert the completion value to JSON
    pub fn eval_json(&mut self, code: &str) -> Result<JsonValue, JsExecutionError> {
        let value = self.eval(code)?;
        js_to_json(&mut self.context, value)
    }

    pub fn global_object(&self) -> JsObject {
        self.context.global_object()
    }

    /// Read a global binding as JSON (`null` when it is not defined)
    pub fn get_global(&mut self, name: &str) -> Result<JsonValue, JsExecutionError> {
        let value = self
            .context
            .global_object()
            .get(PropertyKey::from(JsString::from(name)), &mut self.context)
            .map_err(|e| JsExecutionError::TypedJsError(parse_js_error(&e.to_string())))?;
        js_to_json(&mut self.context, value)
    }

    /// Write a JSON value into a global binding
    pub fn set_global(&mut self, name: &str, value: &JsonValue) -> Result<(), JsExecutionError> {
        let value = json_to_js(&mut self.context, value)?;
        self.context
            .global_object()
            .set(PropertyKey::from(JsString::from(name)), value, true, &mut self.context)
            .map(|_| ())
            .map_err(|e| JsExecutionError::TypedJsError(parse_js_error(&e.to_string())))
    }

    /// Direct access to the underlying Boa context
    pub fn context(&mut self) -> &mut BoaContext {
        &mut self.context
    }

    /// Drain pending promise jobs
    pub fn run_jobs(&mut self) {
        self.context.run_jobs();
    }

    pub fn pending_timers(&self) -> usize {
        timers::pending(self.id)
    }

    pub fn has_pending_timers(&self) -> bool {
        self.pending_timers() > 0
    }

    pub fn next_timer_deadline(&self) -> Option<Instant> {
        timers::next_deadline(self.id)
    }

    /// Fire every timer due at `now`, draining promise jobs after each one
    ///
    /// Stops at the first callback that throws and returns its error.
    pub fn run_due_timers(&mut self, now: Instant) -> Result<usize, JsExecutionError> {
        let due = timers::take_due(self.id, now);
        if due.is_empty() {
            return Ok(0);
        }

        let fire = self
            .context
            .global_object()
            .get(js_string!("__jsprocFireTimer"), &mut self.context)
            .map_err(|e| JsExecutionError::ContextError(e.to_string()))?;
        let fire = fire
            .as_callable()
            .cloned()
            .ok_or_else(|| JsExecutionError::ContextError("timer dispatcher is missing".to_string()))?;

        for (fired, timer_id) in due.iter().enumerate() {
            trace!(engine = self.id, timer_id, "Firing timer");
            if let Err(e) = fire.call(&JsValue::undefined(), &[JsValue::from(*timer_id)], &mut self.context) {
                // Timers still due stay armed for the next turn.
                for rest in &due[fired + 1..] {
                    timers::rearm_now(self.id, *rest);
                }
                return Err(JsExecutionError::TypedJsError(parse_js_error(&e.to_string())));
            }
            self.run_jobs();
        }

        Ok(due.len())
    }

    /// Current value of `process.exitCode`, or 0 when it is absent or not a number
    pub fn exit_code(&mut self) -> i32 {
        let Ok(process) = self.context.global_object().get(js_string!("process"), &mut self.context) else {
            return 0;
        };
        let Some(process) = process.as_object() else {
            return 0;
        };
        match process.get(js_string!("exitCode"), &mut self.context) {
            Ok(code) => code
                .as_number()
                .filter(|n| n.is_finite())
                .map(|n| n.trunc() as i32)
                .unwrap_or(0),
            Err(_) => 0,
        }
    }
}

impl Drop for JsEngine {
    fn drop(&mut self) {
        timers::remove_engine(self.id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::JsErrorType;
    use serde_json::json;
    use std::time::Duration;

    fn engine() -> JsEngine {
        JsEngine::new(EngineOptions::new("test-workspace").with_console(false)).unwrap()
    }

    #[test]
    fn test_eval_json() {
        let mut engine = engine();
        assert_eq!(engine.eval_json("1 + 2").unwrap(), json!(3));
        assert_eq!(engine.eval_json("({ a: [1, 'b'] })").unwrap(), json!({ "a": [1, "b"] }));
    }

    #[test]
    fn test_compile_error() {
        let mut engine = engine();
        let err = engine.eval("function (").unwrap_err();
        assert!(matches!(err, JsExecutionError::CompileError(_)));
    }

    #[test]
    fn test_thrown_error_is_typed() {
        let mut engine = engine();
        let err = engine.eval("throw new TypeError('bad input')").unwrap_err();
        assert_eq!(err, JsExecutionError::TypedJsError(JsErrorType::TypeError("bad input".to_string())));
    }

    #[test]
    fn test_globals_round_trip() {
        let mut engine = engine();
        engine.set_global("config", &json!({ "retries": 3 })).unwrap();
        assert_eq!(engine.eval_json("config.retries * 2").unwrap(), json!(6));
        assert_eq!(engine.get_global("config").unwrap(), json!({ "retries": 3 }));
        assert_eq!(engine.get_global("missing").unwrap(), JsonValue::Null);
    }

    #[test]
    fn test_process_global() {
        let mut engine = JsEngine::new(
            EngineOptions::new("ws-1")
                .with_permissions(AccessPermissions::READ)
                .with_console(false),
        )
        .unwrap();

        assert_eq!(engine.eval_json("process.workspace").unwrap(), json!("ws-1"));
        assert_eq!(
            engine.eval_json("process.permissions").unwrap(),
            json!({ "read": true, "write": false })
        );
        assert_eq!(engine.exit_code(), 0);

        engine.eval("process.exitCode = 7").unwrap();
        assert_eq!(engine.exit_code(), 7);

        engine.eval("process.exitCode = 'nope'").unwrap();
        assert_eq!(engine.exit_code(), 0);
    }

    #[test]
    fn test_invalid_workspace_is_rejected() {
        let err = JsEngine::new(EngineOptions::new("../escape")).unwrap_err();
        assert!(matches!(err, JsExecutionError::InvalidWorkspace { .. }));
    }

    #[test]
    fn test_bootstrap_script() {
        let mut engine = JsEngine::new(
            EngineOptions::new("_")
                .with_console(false)
                .with_bootstrap("globalThis.greeting = 'hello';"),
        )
        .unwrap();
        assert_eq!(engine.eval_json("greeting").unwrap(), json!("hello"));

        let err = JsEngine::new(EngineOptions::new("_").with_bootstrap("throw new Error('no')")).unwrap_err();
        assert!(matches!(err, JsExecutionError::ContextError(_)));
    }

    #[test]
    fn test_promise_jobs_run_on_demand() {
        let mut engine = engine();
        engine
            .eval("globalThis.done = false; Promise.resolve().then(() => { globalThis.done = true; });")
            .unwrap();
        engine.run_jobs();
        assert_eq!(engine.eval_json("done").unwrap(), json!(true));
    }

    #[test]
    fn test_timers_fire_in_order() {
        let mut engine = engine();
        engine
            .eval(
                "globalThis.log = [];
                 setTimeout(() => log.push('late'), 20);
                 setTimeout((x) => log.push(x), 0, 'early');
                 const cancelled = setTimeout(() => log.push('never'), 0);
                 clearTimeout(cancelled);",
            )
            .unwrap();

        assert_eq!(engine.pending_timers(), 2);
        let later = Instant::now() + Duration::from_millis(50);
        assert_eq!(engine.run_due_timers(later).unwrap(), 2);
        assert_eq!(engine.eval_json("log").unwrap(), json!(["early", "late"]));
        assert!(!engine.has_pending_timers());
    }

    #[test]
    fn test_interval_rearms_until_cleared() {
        let mut engine = engine();
        engine
            .eval(
                "globalThis.ticks = 0;
                 const handle = setInterval(() => { if (++ticks === 3) clearInterval(handle); }, 5);",
            )
            .unwrap();

        for _ in 0..3 {
            let deadline = engine.next_timer_deadline().unwrap();
            engine.run_due_timers(deadline).unwrap();
        }

        assert_eq!(engine.eval_json("ticks").unwrap(), json!(3));
        assert!(!engine.has_pending_timers());
    }

    #[test]
    fn test_throwing_timer_reports_error() {
        let mut engine = engine();
        engine
            .eval("setImmediate(() => { throw new RangeError('tick failed'); });")
            .unwrap();

        let err = engine.run_due_timers(Instant::now()).unwrap_err();
        assert_eq!(err, JsExecutionError::TypedJsError(JsErrorType::RangeError("tick failed".to_string())));
    }

    #[test]
    fn test_extreme_delay_fires_soon() {
        let mut engine = engine();
        engine
            .eval("globalThis.fired = false; setTimeout(() => { fired = true; }, 1e300);")
            .unwrap();

        let deadline = engine.next_timer_deadline().unwrap();
        assert!(deadline <= Instant::now() + Duration::from_millis(5));
        engine.run_due_timers(deadline).unwrap();
        assert_eq!(engine.eval_json("fired").unwrap(), json!(true));
    }

    #[test]
    fn test_timer_hooks_are_bound_to_their_engine() {
        let mut first = engine();
        let mut second = engine();

        // Sloppy-mode assignment to a read-only global is silently ignored.
        first.eval("__jsprocScheduleTimer = null;").unwrap();

        assert_eq!(
            first
                .eval_json("typeof __jsprocScheduleTimer + ':' + Object.keys(globalThis).includes('__jsprocCancelTimer')")
                .unwrap(),
            json!("function:false")
        );

        first.eval("__jsprocScheduleTimer(42, 0)").unwrap();
        assert_eq!(first.pending_timers(), 1);
        assert_eq!(second.pending_timers(), 0);
        assert_eq!(second.eval_json("__jsprocCancelTimer(42)").unwrap(), json!(false));
    }

    #[test]
    fn test_timers_can_be_disabled() {
        let mut engine = JsEngine::new(EngineOptions::new("_").with_console(false).with_timers(false)).unwrap();
        assert_eq!(engine.eval_json("typeof setTimeout").unwrap(), json!("undefined"));
    }

    #[test]
    fn test_drop_discards_timers() {
        let mut engine = engine();
        engine.eval("setTimeout(() => {}, 1000)").unwrap();
        let id = engine.id();
        drop(engine);
        assert_eq!(timers::pending(id), 0);
    }
}
