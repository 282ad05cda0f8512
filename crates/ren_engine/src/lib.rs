//! Ren Engine - a small Rebol-family interpreter behind a C-ABI surface.
//!
//! Hosts talk to the engine only through the `extern "C"` entry points in
//! [`ffi`]: allocate the engine, run construct-or-apply requests, root and
//! release cells, render values, and register native functions.
//!
//! # Architecture
//!
//! - [`scan`]: source text to items, no heap access
//! - `heap`: generational arena, host roots, guards, mark-and-sweep
//! - `context`: binding of words to contexts, copying
//! - `eval`: the DO evaluator and non-local exit signals
//! - `natives`: built-in actions installed in `lib`
//! - [`apply`]: aggregation plus construct-or-apply for one host request
//! - `mold`: FORM and MOLD
//!
//! The evaluator never collects garbage mid-evaluation. Collection happens
//! at quiescent points: explicitly (`ren_recycle`) or after a top-level
//! request once enough has been allocated.

pub mod aggregate;
pub mod apply;
mod config;
mod context;
mod engine;
pub mod errors;
mod eval;
#[allow(unsafe_code, reason = "C-ABI entry points read and write host pointers")]
pub mod ffi;
mod heap;
mod mold;
mod natives;
pub mod scan;
mod spec;
mod stack;
mod symbols;
mod typeset;

pub use aggregate::Loadable;
pub use apply::{Failure, Outcome, Request};
pub use config::{CaptureBuffer, EngineConfig, OutputSink, DEFAULT_MAX_CALL_DEPTH, DEFAULT_RECYCLE_THRESHOLD};
pub use engine::Engine;
pub use errors::ErrorData;
pub use eval::{request_cancel, EvalResult, Signal};
pub use ffi::{alloc_engine_with, registered_threads, set_output, with_engine};
pub use natives::NativeFn;
pub use symbols::Symbol;
pub use typeset::TypeSet;
