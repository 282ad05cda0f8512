//! Centralized constructors for engine error values.
//!
//! Each function builds the [`ErrorData`] for one error id. The evaluator
//! allocates it on the heap when raising (`Engine::raise`).

use ren_cell::Kind;

pub use crate::heap::ErrorData;

fn error(id: &'static str, message: String) -> ErrorData {
    ErrorData {
        id,
        message,
        near: None,
    }
}

// Load

#[cold]
pub fn scan_error(line: usize, message: &str) -> ErrorData {
    error("scan", format!("{message} (line {line})"))
}

// Variables

#[cold]
pub fn no_value(word: &str) -> ErrorData {
    error("no-value", format!("{word} has no value"))
}

#[cold]
pub fn not_bound(word: &str) -> ErrorData {
    error("not-bound", format!("{word} is not bound to a context"))
}

#[cold]
pub fn need_value(word: &str) -> ErrorData {
    error("need-value", format!("{word} needs a value"))
}

// Calls

#[cold]
pub fn no_arg(action: &str, param: &str) -> ErrorData {
    error("no-arg", format!("{action} is missing its {param} argument"))
}

#[cold]
pub fn expect_arg(action: &str, param: &str, actual: Kind) -> ErrorData {
    error(
        "expect-arg",
        format!("{action} does not allow {actual} for its {param} argument"),
    )
}

#[cold]
pub fn too_many_args(count: usize, expected: usize) -> ErrorData {
    error(
        "apply-too-many",
        format!("too many arguments: got {count}, expected {expected}"),
    )
}

#[cold]
pub fn not_enough_args(count: usize, expected: usize) -> ErrorData {
    error(
        "apply-too-few",
        format!("not enough arguments: got {count}, expected {expected}"),
    )
}

#[cold]
pub fn leftover_args(count: usize) -> ErrorData {
    error(
        "apply-too-many",
        format!("too many arguments: {count} left over after one expression"),
    )
}

#[cold]
pub fn no_left_arg(action: &str) -> ErrorData {
    error("no-left-arg", format!("{action} has no left-hand argument"))
}

#[cold]
pub fn stack_overflow(depth: usize) -> ErrorData {
    error("stack-overflow", format!("call depth exceeded {depth}"))
}

#[cold]
pub fn return_outside_function() -> ErrorData {
    error("no-function", "return used outside of a function".to_string())
}

#[cold]
pub fn native_failed(action: &str) -> ErrorData {
    error("native", format!("{action} failed"))
}

// Construct and apply

#[cold]
pub fn construct_mismatch(expected: Kind, count: usize, actual: Option<Kind>) -> ErrorData {
    let message = match actual {
        Some(actual) if count == 1 => format!("expected {expected} value, got {actual}"),
        _ => format!("expected one {expected} value, got {count} values"),
    };
    error("construct", message)
}

#[cold]
pub fn cannot_apply(kind: Kind) -> ErrorData {
    error("apply", format!("cannot apply {kind} to arguments"))
}

#[cold]
pub fn bad_context(kind: Kind) -> ErrorData {
    error("bad-context", format!("{kind} is not a context"))
}

// Values

#[cold]
pub fn math_overflow() -> ErrorData {
    error("overflow", "math or number overflow".to_string())
}

#[cold]
pub fn zero_divide() -> ErrorData {
    error("zero-divide", "attempt to divide by zero".to_string())
}

#[cold]
pub fn cannot_compare(left: Kind, right: Kind) -> ErrorData {
    error("invalid-compare", format!("cannot compare {left} with {right}"))
}

#[cold]
pub fn bad_make(kind: Kind, spec: Kind) -> ErrorData {
    error("bad-make", format!("cannot make {kind} from {spec}"))
}

#[cold]
pub fn bad_path(element: &str) -> ErrorData {
    error("bad-path", format!("cannot select {element} in path"))
}

#[cold]
pub fn no_field(field: &str) -> ErrorData {
    error("no-field", format!("object has no field {field}"))
}

#[cold]
pub fn bad_spec(detail: &str) -> ErrorData {
    error("bad-spec", format!("invalid function spec: {detail}"))
}

#[cold]
pub fn invalid_arg(kind: Kind) -> ErrorData {
    error("invalid-arg", format!("invalid argument of type {kind}"))
}

#[cold]
pub fn out_of_range(index: i64) -> ErrorData {
    error("out-of-range", format!("index {index} is out of range"))
}

/// Raised by `fail` and by hosts.
#[cold]
pub fn user(message: &str) -> ErrorData {
    error("user", message.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_name_their_subjects() {
        assert_eq!(no_value("x").message, "x has no value");
        assert_eq!(
            expect_arg("add", "value1", Kind::Text).message,
            "add does not allow text! for its value1 argument"
        );
        assert!(too_many_args(3, 1).message.starts_with("too many arguments"));
        assert_eq!(scan_error(4, "missing ]").message, "missing ] (line 4)");
    }

    #[test]
    fn construct_mismatch_reports_count_or_kind() {
        let wrong_kind = construct_mismatch(Kind::Integer, 1, Some(Kind::Text));
        assert_eq!(wrong_kind.message, "expected integer! value, got text!");
        let wrong_count = construct_mismatch(Kind::Integer, 2, None);
        assert_eq!(wrong_count.message, "expected one integer! value, got 2 values");
    }
}
