//! Bridge errors.
//!
//! Engine failures keep the engine's own error value so hosts can inspect
//! it or hand it back to the engine unchanged. `Cancelled` and
//! `ExitRequested` are not errors in the engine's sense; they stop the whole
//! driver and are kept apart from evaluation failures.

use ren_cell::{Kind, ResultCode};
use thiserror::Error;

use crate::types::ErrorValue;
use crate::value::Value;

#[derive(Error, Debug, Clone)]
pub enum Error {
    /// Source text could not be scanned.
    #[error("load error: {0}")]
    Load(ErrorValue),

    /// The aggregate did not fit the requested kind or count.
    #[error("construct error: {0}")]
    Construct(ErrorValue),

    /// Apply was misused: wrong argument count, leftovers, bad applicand.
    #[error("apply error: {0}")]
    Apply(ErrorValue),

    /// An error raised while running well-formed code.
    #[error("{0}")]
    Evaluation(ErrorValue),

    /// A throw nobody caught.
    #[error("{}", thrown_message(.value, .name.as_ref()))]
    Thrown { value: Value, name: Option<Value> },

    #[error("[interrupted]")]
    Cancelled,

    #[error("exit requested (code {0})")]
    ExitRequested(i32),

    #[error("expected {expected}, got {actual}")]
    BadValueCast { expected: &'static str, actual: Kind },

    #[error("no context named {0:?}")]
    NoSuchContext(String),

    /// Values from different engines mixed in one call.
    #[error("values belong to different engines")]
    EngineMismatch,

    #[error("engine unavailable: {0}")]
    EngineUnavailable(ResultCode),

    /// The engine rejected a call's arguments.
    #[error("engine call failed: {0}")]
    Abi(ResultCode),

    /// Host callable and spec disagree on the number of parameters.
    #[error("spec declares {spec} parameters, callable takes {callable}")]
    ArityMismatch { spec: usize, callable: usize },

    /// A failure raised by host code.
    #[error("{0}")]
    Host(String),
}

impl Error {
    /// Shorthand for a host failure.
    pub fn host(message: impl Into<String>) -> Self {
        Error::Host(message.into())
    }

    /// Whether the driver, rather than the caller, should handle this.
    pub fn is_halting(&self) -> bool {
        matches!(self, Error::Cancelled | Error::ExitRequested(_))
    }

    /// The engine error value behind this failure, if there is one.
    pub fn error_value(&self) -> Option<&ErrorValue> {
        match self {
            Error::Load(error)
            | Error::Construct(error)
            | Error::Apply(error)
            | Error::Evaluation(error) => Some(error),
            _ => None,
        }
    }

    /// The result code this error travels as.
    pub fn code(&self) -> ResultCode {
        match self {
            Error::Load(_) => ResultCode::LoadError,
            Error::Construct(_) => ResultCode::ConstructError,
            Error::Apply(_) | Error::BadValueCast { .. } | Error::ArityMismatch { .. } => {
                ResultCode::ApplyError
            }
            Error::Evaluation(_) | Error::Host(_) => ResultCode::EvaluationError,
            Error::Thrown { .. } => ResultCode::Thrown,
            Error::Cancelled => ResultCode::Cancelled,
            Error::ExitRequested(_) => ResultCode::ExitRequested,
            Error::NoSuchContext(_) => ResultCode::NoSuchContext,
            Error::EngineMismatch | Error::EngineUnavailable(_) => ResultCode::BadEngine,
            Error::Abi(code) => *code,
        }
    }
}

fn thrown_message(value: &Value, name: Option<&Value>) -> String {
    match name {
        Some(name) => format!("no catch for throw: {value} named {name}"),
        None => format!("no catch for throw: {value}"),
    }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use ren_cell::{Kind, ResultCode};

    use super::Error;

    #[test]
    fn halting_errors_render_as_notices() {
        assert_eq!(Error::Cancelled.to_string(), "[interrupted]");
        assert_eq!(Error::ExitRequested(3).to_string(), "exit requested (code 3)");
        assert!(Error::Cancelled.is_halting());
        assert!(Error::ExitRequested(0).is_halting());
        assert!(!Error::host("boom").is_halting());
    }

    #[test]
    fn cast_errors_name_both_kinds() {
        let err = Error::BadValueCast {
            expected: "integer!",
            actual: Kind::Text,
        };
        assert_eq!(err.to_string(), "expected integer!, got text!");
        assert_eq!(err.code(), ResultCode::ApplyError);
    }
}
