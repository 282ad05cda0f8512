//! The host-to-engine edge of a native call.
//!
//! A dispatcher body runs under [`guard`], which turns panics and bridge
//! errors into a [`DispatchOutcome`]. [`deliver`] writes that outcome into
//! the engine's frame; only the returned [`NativeStatus`] crosses back.

use std::any::Any;
use std::panic::{catch_unwind, AssertUnwindSafe};

use ren_cell::{Cell, EngineHandle, NativeStatus, RawFrame};

use crate::engine::Engine;
use crate::error::{Error, Result};
use crate::sys;
use crate::types::ErrorValue;
use crate::value::Value;

/// How one native invocation ended.
#[derive(Debug)]
pub(crate) enum DispatchOutcome {
    Returned(Value),
    /// Host code failed or panicked; the message becomes an engine error.
    HostException(String),
    /// An engine error passes through unchanged.
    EngineError(ErrorValue),
    EngineThrow {
        value: Value,
        name: Option<Value>,
    },
    Cancelled,
    ExitRequested(i32),
}

impl From<Error> for DispatchOutcome {
    fn from(err: Error) -> Self {
        match err {
            Error::Load(error)
            | Error::Construct(error)
            | Error::Apply(error)
            | Error::Evaluation(error) => DispatchOutcome::EngineError(error),
            Error::Thrown { value, name } => DispatchOutcome::EngineThrow { value, name },
            Error::Cancelled => DispatchOutcome::Cancelled,
            Error::ExitRequested(code) => DispatchOutcome::ExitRequested(code),
            other => DispatchOutcome::HostException(other.to_string()),
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(text) = payload.downcast_ref::<&str>() {
        format!("host panic: {text}")
    } else if let Some(text) = payload.downcast_ref::<String>() {
        format!("host panic: {text}")
    } else {
        "host panic".to_string()
    }
}

/// Run a dispatcher body, catching panics.
pub(crate) fn guard(body: impl FnOnce() -> Result<Value>) -> DispatchOutcome {
    match catch_unwind(AssertUnwindSafe(body)) {
        Ok(Ok(value)) => DispatchOutcome::Returned(value),
        Ok(Err(err)) => err.into(),
        Err(payload) => {
            let message = panic_message(payload.as_ref());
            tracing::warn!(%message, "extension panicked");
            DispatchOutcome::HostException(message)
        }
    }
}

/// Engine a frame belongs to.
pub(crate) fn frame_engine(frame: *mut RawFrame) -> EngineHandle {
    if frame.is_null() {
        return EngineHandle::INVALID;
    }
    // SAFETY: the engine passes a live frame for the dispatcher call.
    unsafe { (*frame).engine }
}

/// Argument cells of a frame.
pub(crate) fn frame_args<'f>(frame: *mut RawFrame) -> &'f [Cell] {
    if frame.is_null() {
        return &[];
    }
    // SAFETY: the engine passes a live frame whose `args` holds `argc` cells
    // for the duration of the dispatcher call.
    let frame = unsafe { &*frame };
    if frame.args.is_null() || frame.argc == 0 {
        return &[];
    }
    // SAFETY: as above.
    unsafe { std::slice::from_raw_parts(frame.args, frame.argc) }
}

fn write_frame(frame: *mut RawFrame, out: Cell, label: Cell) {
    if frame.is_null() {
        return;
    }
    // SAFETY: `out` and `label` point at cells owned by the engine's caller
    // stack, valid until the dispatcher returns.
    unsafe {
        let frame = &*frame;
        if !frame.out.is_null() {
            *frame.out = out;
        }
        if !frame.label.is_null() {
            *frame.label = label;
        }
    }
}

/// Write `outcome` into the frame and pick the status code.
///
/// Values written here lose their host root when `outcome` drops; the
/// collector does not run until the evaluation in flight finishes.
pub(crate) fn deliver(engine: &Engine, frame: *mut RawFrame, outcome: DispatchOutcome) -> NativeStatus {
    match outcome {
        DispatchOutcome::Returned(value) => {
            write_frame(frame, value.cell(), Cell::VOID);
            NativeStatus::Return
        }
        DispatchOutcome::HostException(message) => {
            let error = sys::make_error(engine.handle(), &message).unwrap_or(Cell::VOID);
            write_frame(frame, error, Cell::VOID);
            NativeStatus::Error
        }
        DispatchOutcome::EngineError(error) => {
            write_frame(frame, error.cell(), Cell::VOID);
            NativeStatus::Error
        }
        DispatchOutcome::EngineThrow { value, name } => {
            let label = name.as_ref().map_or(Cell::VOID, Value::cell);
            write_frame(frame, value.cell(), label);
            NativeStatus::Throw
        }
        DispatchOutcome::Cancelled => NativeStatus::Halt,
        DispatchOutcome::ExitRequested(code) => {
            write_frame(frame, Cell::integer(i64::from(code)), Cell::VOID);
            NativeStatus::Quit
        }
    }
}
