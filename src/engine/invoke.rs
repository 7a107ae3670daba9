//! The invocation wrapper around every call into user code.
//!
//! Each call runs under `catch_unwind`. A process-wide panic hook, installed once, records the panic
//! location and (optionally) a backtrace into a thread-local slot while an invocation on that thread is
//! armed; panics on other threads, or outside an invocation, go to the previously installed hook untouched.
//!
//! The recorded trace is trimmed to the frames between the panic machinery and the engine boundary, so a
//! failure report shows the user's own call stack and nothing of ours.

use std::any::Any;
use std::backtrace::Backtrace;
use std::cell::RefCell;
use std::io::{self, Write};
use std::panic::{self, AssertUnwindSafe, PanicHookInfo};
use std::sync::Once;

use paramtest_core::errors::NO_LIVE_SUBJECT;

use crate::config::RunConfig;
use crate::model::class::{Invoker, SetterDecl, Subject};
use crate::model::parameter::Parameter;
use crate::model::result::{ExecutionResult, Fault};

/// Fault kind of an aborted invocation.
pub const ABORT_KIND: &str = "aborted";

/// Marker frame; everything from here outward belongs to the engine.
const BOUNDARY_FRAME: &str = "__paramtest_begin_short_backtrace";
const PANIC_MACHINERY_END: &str = "__rust_end_short_backtrace";

/// Panic payload used to abort the current hook or test on purpose.
#[derive(Debug, Clone)]
pub struct AbortSignal {
    pub reason: String,
}

/// Abort the running hook or test. The node is reported as aborted rather than failed.
pub fn abort(reason: impl Into<String>) -> ! {
    panic::panic_any(AbortSignal { reason: reason.into() })
}

/// Abort the running hook or test unless `condition` holds.
pub fn assume(condition: bool, reason: impl Into<String>) {
    if !condition {
        abort(reason)
    }
}

/// The part of [`RunConfig`] the wrapper needs.
#[derive(Debug, Clone, Copy)]
pub struct InvokeSettings {
    pub capture_backtrace: bool,
    pub trace_depth: usize,
    pub flush_output: bool,
}

impl Default for InvokeSettings {
    fn default() -> Self {
        Self::from(&RunConfig::default())
    }
}

impl From<&RunConfig> for InvokeSettings {
    fn from(config: &RunConfig) -> Self {
        Self {
            capture_backtrace: config.capture_backtrace,
            trace_depth: config.trace_depth,
            flush_output: config.flush_output,
        }
    }
}

struct PanicRecord {
    location: Option<String>,
    backtrace: Option<Backtrace>,
}

enum Slot {
    Idle,
    Armed { backtrace: bool },
    Captured(PanicRecord),
}

thread_local! {
    static SLOT: RefCell<Slot> = const { RefCell::new(Slot::Idle) };
}

fn install_hook() {
    static INSTALL: Once = Once::new();
    INSTALL.call_once(|| {
        let previous = panic::take_hook();
        panic::set_hook(Box::new(move |info: &PanicHookInfo<'_>| {
            if !capture(info) {
                previous(info);
            }
        }));
    });
}

/// Record the panic into this thread's slot if an invocation is armed.
fn capture(info: &PanicHookInfo<'_>) -> bool {
    SLOT.try_with(|slot| {
        let Ok(mut slot) = slot.try_borrow_mut() else {
            return false;
        };
        let backtrace = match *slot {
            Slot::Armed { backtrace } => backtrace,
            Slot::Idle | Slot::Captured(_) => return false,
        };
        *slot = Slot::Captured(PanicRecord {
            location: info.location().map(|l| l.to_string()),
            backtrace: backtrace.then(Backtrace::force_capture),
        });
        true
    })
    .unwrap_or(false)
}

#[inline(never)]
fn __paramtest_begin_short_backtrace<T>(f: impl FnOnce() -> T) -> T {
    let result = f();
    std::hint::black_box(());
    result
}

/// Run `f`, turning a panic into an aborted or failed result.
pub fn guarded<T>(settings: &InvokeSettings, f: impl FnOnce() -> T) -> Result<T, ExecutionResult> {
    install_hook();
    let armed = Slot::Armed {
        backtrace: settings.capture_backtrace,
    };
    let outer = SLOT.with(|slot| slot.replace(armed));
    let outcome = panic::catch_unwind(AssertUnwindSafe(|| __paramtest_begin_short_backtrace(f)));
    let record = SLOT.with(|slot| match slot.replace(outer) {
        Slot::Captured(record) => Some(record),
        Slot::Idle | Slot::Armed { .. } => None,
    });
    outcome.map_err(|payload| from_payload(payload, record, settings))
}

/// Invoke a lifecycle method; instance methods need the live subject.
pub fn invoke(invoker: &Invoker, subject: Option<&mut Subject>, settings: &InvokeSettings) -> ExecutionResult {
    let outcome = match (invoker, subject) {
        (Invoker::Static(f), _) => guarded(settings, || f()),
        (Invoker::Instance(f), Some(subject)) => guarded(settings, || f(subject)),
        (Invoker::Instance(_), None) => Ok(Err(Fault::engine(NO_LIVE_SUBJECT))),
    };
    settle(outcome, settings)
}

/// Hand one parameter value to the class's setter.
pub fn invoke_setter(
    setter: &SetterDecl,
    subject: Option<&mut Subject>,
    parameter: &Parameter,
    settings: &InvokeSettings,
) -> ExecutionResult {
    let outcome = match subject {
        Some(subject) => guarded(settings, || (setter.invoke)(subject, parameter)),
        None => Ok(Err(Fault::engine(NO_LIVE_SUBJECT))),
    };
    settle(outcome, settings)
}

fn settle(outcome: Result<Result<(), Fault>, ExecutionResult>, settings: &InvokeSettings) -> ExecutionResult {
    if settings.flush_output {
        flush_output();
    }
    match outcome {
        Ok(returned) => ExecutionResult::from(returned),
        Err(caught) => caught,
    }
}

/// Flush both standard streams so user output lands before the next engine line.
///
/// Flush errors are ignored; they only affect how output interleaves.
pub fn flush_output() {
    let _ = io::stdout().flush();
    let _ = io::stderr().flush();
}

/// Text of a panic payload, for the common `&str` / `String` cases.
pub fn payload_message(payload: &(dyn Any + Send)) -> String {
    if let Some(text) = payload.downcast_ref::<&str>() {
        (*text).to_string()
    } else if let Some(text) = payload.downcast_ref::<String>() {
        text.clone()
    } else if let Some(signal) = payload.downcast_ref::<AbortSignal>() {
        signal.reason.clone()
    } else {
        "Box<dyn Any>".to_string()
    }
}

fn from_payload(
    payload: Box<dyn Any + Send>,
    record: Option<PanicRecord>,
    settings: &InvokeSettings,
) -> ExecutionResult {
    let (location, backtrace) = match record {
        Some(record) => (record.location, record.backtrace),
        None => (None, None),
    };
    let aborted = payload.is::<AbortSignal>();
    let mut fault = if aborted {
        Fault::new(ABORT_KIND, payload_message(&*payload))
    } else {
        Fault::panic(payload_message(&*payload))
    };
    if let Some(location) = location {
        fault = fault.with_location(location);
    }
    if let Some(backtrace) = backtrace.filter(|_| !aborted) {
        fault = fault.with_trace(trim_trace(&backtrace.to_string(), settings.trace_depth));
    }
    if aborted {
        ExecutionResult::Aborted(fault)
    } else {
        ExecutionResult::Failed(fault)
    }
}

/// Keep the frames between the panic machinery and the engine boundary, at most `depth` of them.
///
/// Input is the `Display` form of a [`Backtrace`]: numbered symbol lines, each optionally followed by an
/// indented `at file:line:col` line.
pub fn trim_trace(rendered: &str, depth: usize) -> Vec<String> {
    let frames = parse_frames(rendered);
    let start = frames
        .iter()
        .rposition(|(symbol, _)| is_panic_machinery(symbol))
        .map_or(0, |i| i + 1);
    frames[start..]
        .iter()
        .take_while(|(symbol, _)| !is_engine_frame(symbol))
        .take(depth)
        .map(|(symbol, at)| match at {
            Some(at) => format!("{symbol} at {at}"),
            None => symbol.clone(),
        })
        .collect()
}

fn parse_frames(rendered: &str) -> Vec<(String, Option<String>)> {
    let mut frames: Vec<(String, Option<String>)> = Vec::new();
    for line in rendered.lines().map(str::trim) {
        if let Some(at) = line.strip_prefix("at ") {
            if let Some(last) = frames.last_mut().filter(|(_, loc)| loc.is_none()) {
                last.1 = Some(at.to_string());
            }
        } else if let Some((index, symbol)) = line.split_once(": ") {
            if index.chars().all(|c| c.is_ascii_digit()) && !index.is_empty() {
                frames.push((symbol.to_string(), None));
            }
        }
    }
    frames
}

fn is_panic_machinery(symbol: &str) -> bool {
    symbol.contains(PANIC_MACHINERY_END)
        || symbol.starts_with("core::panicking::")
        || symbol.starts_with("std::panicking::")
        || symbol == "rust_begin_unwind"
        || symbol.starts_with("paramtest::engine::invoke::abort")
}

fn is_engine_frame(symbol: &str) -> bool {
    if symbol.contains(BOUNDARY_FRAME) {
        return true;
    }
    let internal = symbol.starts_with("paramtest::engine::") || symbol.starts_with("paramtest::model::");
    internal && !symbol.contains("::tests::")
}
