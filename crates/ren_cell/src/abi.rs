//! Types that cross the C boundary between engine and host.

use std::ffi::c_void;
use std::fmt;

use crate::cell::Cell;

/// Construct-kind byte meaning "do not construct".
pub const NO_CONSTRUCT: u8 = 0xFF;

/// Identifies an engine sandbox. Zero is never a valid handle.
#[repr(transparent)]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct EngineHandle(pub u32);

impl EngineHandle {
    pub const INVALID: EngineHandle = EngineHandle(0);

    #[inline]
    pub fn is_valid(self) -> bool {
        self.0 != 0
    }
}

/// Status returned by every engine entry point.
#[repr(u32)]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ResultCode {
    Success = 0,
    /// Source text could not be scanned.
    LoadError,
    /// Aggregate did not match the requested arity or type.
    ConstructError,
    /// Apply was misused (arity, residual input, illegal applicand).
    ApplyError,
    /// An error was raised while running well-formed code.
    EvaluationError,
    /// A non-error throw escaped; value and name are in the out cells.
    Thrown,
    /// Evaluation was halted.
    Cancelled,
    /// Evaluation requested process exit; the code is in the error cell.
    ExitRequested,
    /// Output buffer too small; the required size was written back.
    BufferTooSmall,
    NoSuchContext,
    /// An engine already exists in this process.
    EngineExists,
    /// Handle does not name a live engine.
    BadEngine,
    /// A pointer or size argument was malformed.
    BadArgument,
    /// Release of a cell that holds no root.
    NotRooted,
}

impl ResultCode {
    #[inline]
    pub fn is_success(self) -> bool {
        self == ResultCode::Success
    }
}

impl fmt::Display for ResultCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            ResultCode::Success => "success",
            ResultCode::LoadError => "load error",
            ResultCode::ConstructError => "construct error",
            ResultCode::ApplyError => "apply error",
            ResultCode::EvaluationError => "evaluation error",
            ResultCode::Thrown => "thrown",
            ResultCode::Cancelled => "cancelled",
            ResultCode::ExitRequested => "exit requested",
            ResultCode::BufferTooSmall => "buffer too small",
            ResultCode::NoSuchContext => "no such context",
            ResultCode::EngineExists => "engine already exists",
            ResultCode::BadEngine => "bad engine handle",
            ResultCode::BadArgument => "bad argument",
            ResultCode::NotRooted => "cell not rooted",
        };
        f.write_str(text)
    }
}

/// One element of a loadable sequence.
///
/// A null `source` means the element is the pre-built value in `cell`;
/// otherwise `source[..source_len]` is UTF-8 text scanned at aggregation
/// time. Hosts may embed this struct at the head of a larger record and pass
/// the record size as the stride.
#[repr(C)]
#[derive(Clone, Copy, Debug)]
pub struct RawLoadable {
    pub cell: Cell,
    pub source: *const u8,
    pub source_len: usize,
}

impl RawLoadable {
    pub fn value(cell: Cell) -> Self {
        RawLoadable {
            cell,
            source: std::ptr::null(),
            source_len: 0,
        }
    }

    /// Borrow `text`; the caller keeps it alive for the duration of the call.
    pub fn source(text: &str) -> Self {
        RawLoadable {
            cell: Cell::VOID,
            source: text.as_ptr(),
            source_len: text.len(),
        }
    }

    #[inline]
    pub fn is_source(&self) -> bool {
        !self.source.is_null()
    }
}

/// Call frame handed to a native dispatcher.
///
/// `args` holds one cell per declared parameter slot (refinements included).
/// The dispatcher writes its result into `out`; for a throw it also writes
/// the throw name (or void) into `label`.
#[repr(C)]
#[derive(Debug)]
pub struct RawFrame {
    pub engine: EngineHandle,
    pub args: *const Cell,
    pub argc: usize,
    pub out: *mut Cell,
    pub label: *mut Cell,
}

/// Outcome of a native dispatcher, the only thing that crosses back.
#[repr(u32)]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NativeStatus {
    /// `out` holds the result (void for no value).
    Return = 0,
    /// `out` holds an error value (or void for a generic failure).
    Error,
    /// `out` holds the thrown value, `label` its name or void.
    Throw,
    /// Halt the evaluation.
    Halt,
    /// Quit; `out` holds an integer exit code.
    Quit,
}

/// Fixed-signature entry point for host-implemented natives.
pub type NativeDispatcher = extern "C" fn(frame: *mut RawFrame, user_data: *mut c_void) -> NativeStatus;

/// Releases a native's user data when the engine reclaims the native.
pub type NativeDeleter = extern "C" fn(user_data: *mut c_void);
