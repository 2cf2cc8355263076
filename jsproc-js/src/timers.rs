//! Node-style timers backed by a per-engine deadline queue
//!
//! Callbacks stay in script land (a `Map` inside the timer bootstrap); Rust
//! only tracks `(deadline, id)` pairs so the owning event loop knows when to
//! wake up and which timers are due. Queues are kept per thread and keyed by
//! engine id, which matches engines never leaving their thread.

use crate::JsExecutionError;
use boa_engine::{js_string, Context as BoaContext, JsResult, JsValue, NativeFunction, Source};
use std::cell::RefCell;
use std::collections::{BTreeSet, HashMap};
use std::time::{Duration, Instant};
use tracing::trace;

thread_local! {
    static TIMER_QUEUES: RefCell<HashMap<u64, TimerQueue>> = RefCell::new(HashMap::new());
}

/// Pending timer deadlines of one engine
#[derive(Debug, Default)]
pub struct TimerQueue {
    deadlines: BTreeSet<(Instant, u32)>,
    by_id: HashMap<u32, Instant>,
}

impl TimerQueue {
    /// Arm (or re-arm) a timer
    pub fn schedule(&mut self, id: u32, deadline: Instant) {
        self.cancel(id);
        self.deadlines.insert((deadline, id));
        self.by_id.insert(id, deadline);
    }

    /// Disarm a timer, returning whether it was armed
    pub fn cancel(&mut self, id: u32) -> bool {
        match self.by_id.remove(&id) {
            Some(deadline) => self.deadlines.remove(&(deadline, id)),
            None => false,
        }
    }

    pub fn next_deadline(&self) -> Option<Instant> {
        self.deadlines.first().map(|(deadline, _)| *deadline)
    }

    /// Remove and return every timer due at `now`, earliest first
    pub fn take_due(&mut self, now: Instant) -> Vec<u32> {
        let mut due = Vec::new();
        while let Some(&(deadline, id)) = self.deadlines.first() {
            if deadline > now {
                break;
            }
            self.deadlines.pop_first();
            self.by_id.remove(&id);
            due.push(id);
        }
        due
    }

    pub fn len(&self) -> usize {
        self.by_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_id.is_empty()
    }
}

fn with_queue<R>(engine_id: u64, f: impl FnOnce(&mut TimerQueue) -> R) -> R {
    TIMER_QUEUES.with(|queues| f(queues.borrow_mut().entry(engine_id).or_default()))
}

pub(crate) fn pending(engine_id: u64) -> usize {
    TIMER_QUEUES.with(|queues| queues.borrow().get(&engine_id).map_or(0, TimerQueue::len))
}

pub(crate) fn next_deadline(engine_id: u64) -> Option<Instant> {
    TIMER_QUEUES.with(|queues| queues.borrow().get(&engine_id).and_then(TimerQueue::next_deadline))
}

pub(crate) fn take_due(engine_id: u64, now: Instant) -> Vec<u32> {
    with_queue(engine_id, |queue| queue.take_due(now))
}

pub(crate) fn rearm_now(engine_id: u64, timer_id: u32) {
    with_queue(engine_id, |queue| queue.schedule(timer_id, Instant::now()));
}

pub(crate) fn remove_engine(engine_id: u64) {
    TIMER_QUEUES.with(|queues| {
        queues.borrow_mut().remove(&engine_id);
    });
}

/// Largest delay honoured as given; longer ones fire after 1 ms, as in Node
const TIMEOUT_MAX_MS: f64 = 2_147_483_647.0;

/// Turn a script-supplied delay into a `Duration` without ever panicking
pub(crate) fn clamp_delay(delay_ms: f64) -> Duration {
    if !(delay_ms > 0.0) {
        Duration::ZERO
    } else if delay_ms > TIMEOUT_MAX_MS {
        Duration::from_millis(1)
    } else {
        Duration::try_from_secs_f64(delay_ms / 1000.0).unwrap_or(Duration::from_millis(1))
    }
}

fn deadline_after(now: Instant, delay: Duration) -> Instant {
    now.checked_add(delay).unwrap_or(now)
}

fn number_arg(args: &[JsValue], index: usize, context: &mut BoaContext) -> JsResult<f64> {
    args.get(index).cloned().unwrap_or_default().to_number(context)
}

fn timer_id_arg(args: &[JsValue], context: &mut BoaContext) -> JsResult<u32> {
    Ok(number_arg(args, 0, context)? as u32)
}

/// Script half of the timer API
const TIMER_BOOTSTRAP: &str = r#"
(function (global) {
    const schedule = global.__jsprocScheduleTimer;
    const cancel = global.__jsprocCancelTimer;
    for (const hook of ['__jsprocScheduleTimer', '__jsprocCancelTimer']) {
        Object.defineProperty(global, hook, { writable: false, enumerable: false, configurable: false });
    }
    const timers = new Map();
    let nextId = 1;

    function arm(callback, delay, args, repeat) {
        if (typeof callback !== 'function') {
            throw new TypeError('Callback must be a function');
        }
        const id = nextId++;
        let ms = Number(delay);
        if (!(ms > 0)) {
            ms = 0;
        } else if (ms > 2147483647) {
            ms = 1;
        }
        if (repeat && ms < 1) {
            ms = 1;
        }
        timers.set(id, { callback: callback, args: args, ms: ms, repeat: repeat });
        schedule(id, ms);
        return id;
    }

    function disarm(id) {
        if (timers.delete(id)) {
            cancel(id);
        }
    }

    global.setTimeout = function (callback, delay, ...args) {
        return arm(callback, delay, args, false);
    };
    global.setInterval = function (callback, delay, ...args) {
        return arm(callback, delay, args, true);
    };
    global.setImmediate = function (callback, ...args) {
        return arm(callback, 0, args, false);
    };
    global.clearTimeout = disarm;
    global.clearInterval = disarm;
    global.clearImmediate = disarm;

    Object.defineProperty(global, '__jsprocFireTimer', {
        value: function (id) {
            const timer = timers.get(id);
            if (timer === undefined) {
                return;
            }
            if (timer.repeat) {
                schedule(id, timer.ms);
            } else {
                timers.delete(id);
            }
            timer.callback.apply(undefined, timer.args);
        },
    });
})(globalThis);
"#;

/// Install the timer globals into a context
///
/// The native hooks are bound to `engine_id`, so scripts cannot reach the
/// queue of another engine living on the same thread.
pub(crate) fn install(context: &mut BoaContext, engine_id: u64) -> Result<(), JsExecutionError> {
    let register_error = |e: boa_engine::JsError| JsExecutionError::ContextError(format!("Failed to register timers: {}", e));

    // __jsprocScheduleTimer(timerId, delayMs)
    let schedule = NativeFunction::from_copy_closure(move |_this, args, context| {
        let timer_id = timer_id_arg(args, context)?;
        let delay = clamp_delay(number_arg(args, 1, context)?);
        trace!(engine_id, timer_id, ?delay, "Arming timer");
        with_queue(engine_id, |queue| {
            queue.schedule(timer_id, deadline_after(Instant::now(), delay))
        });
        Ok(JsValue::undefined())
    });
    context
        .register_global_callable(js_string!("__jsprocScheduleTimer"), 2, schedule)
        .map_err(register_error)?;

    // __jsprocCancelTimer(timerId)
    let cancel = NativeFunction::from_copy_closure(move |_this, args, context| {
        let timer_id = timer_id_arg(args, context)?;
        Ok(JsValue::from(with_queue(engine_id, |queue| queue.cancel(timer_id))))
    });
    context
        .register_global_callable(js_string!("__jsprocCancelTimer"), 1, cancel)
        .map_err(register_error)?;

    context
        .eval(Source::from_bytes(TIMER_BOOTSTRAP))
        .map_err(|e| JsExecutionError::ContextError(format!("Failed to install timers: {}", e)))?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_queue_orders_by_deadline() {
        let now = Instant::now();
        let mut queue = TimerQueue::default();
        queue.schedule(1, now + Duration::from_millis(30));
        queue.schedule(2, now + Duration::from_millis(10));
        queue.schedule(3, now + Duration::from_millis(20));

        assert_eq!(queue.len(), 3);
        assert_eq!(queue.next_deadline(), Some(now + Duration::from_millis(10)));
        assert_eq!(queue.take_due(now + Duration::from_millis(25)), vec![2, 3]);
        assert_eq!(queue.len(), 1);
        assert_eq!(queue.take_due(now + Duration::from_millis(25)), Vec::<u32>::new());
        assert_eq!(queue.take_due(now + Duration::from_millis(30)), vec![1]);
        assert!(queue.is_empty());
    }

    #[test]
    fn test_reschedule_replaces_deadline() {
        let now = Instant::now();
        let mut queue = TimerQueue::default();
        queue.schedule(7, now);
        queue.schedule(7, now + Duration::from_secs(60));

        assert_eq!(queue.len(), 1);
        assert!(queue.take_due(now).is_empty());
    }

    #[test]
    fn test_cancel() {
        let now = Instant::now();
        let mut queue = TimerQueue::default();
        queue.schedule(1, now);

        assert!(queue.cancel(1));
        assert!(!queue.cancel(1));
        assert!(queue.take_due(now).is_empty());
        assert_eq!(queue.next_deadline(), None);
    }

    #[test]
    fn test_clamp_delay() {
        assert_eq!(clamp_delay(0.0), Duration::ZERO);
        assert_eq!(clamp_delay(-5.0), Duration::ZERO);
        assert_eq!(clamp_delay(f64::NAN), Duration::ZERO);
        assert_eq!(clamp_delay(250.0), Duration::from_millis(250));
        assert_eq!(clamp_delay(1e300), Duration::from_millis(1));
        assert_eq!(clamp_delay(f64::INFINITY), Duration::from_millis(1));
        assert!(clamp_delay(TIMEOUT_MAX_MS) > Duration::from_secs(2_000_000));
    }

    #[test]
    fn test_deadline_never_overflows() {
        let now = Instant::now();
        assert_eq!(deadline_after(now, Duration::MAX), now);
        assert_eq!(deadline_after(now, Duration::from_millis(5)), now + Duration::from_millis(5));
    }

    #[test]
    fn test_queues_are_per_engine() {
        with_queue(9001, |queue| queue.schedule(1, Instant::now()));
        assert_eq!(pending(9001), 1);
        assert_eq!(pending(9002), 0);

        remove_engine(9001);
        assert_eq!(pending(9001), 0);
    }
}
