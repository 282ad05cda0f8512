//! Ren Bridge - typed host access to the Ren engine.
//!
//! The bridge sits on top of the engine's C-ABI surface and gives Rust hosts
//! three things:
//!
//! - [`Value`]: an engine value the host owns. Values backed by collected
//!   storage carry one engine root shared by their clones, released when the
//!   last clone drops. Typed wrappers ([`Integer`], [`Block`], ...) narrow a
//!   value after checking its kind.
//! - [`Call`] / [`evaluate`]: construct-or-apply over a mixed list of source
//!   text and values ([`Loadable`]).
//! - [`Engine::register`]: expose Rust closures as engine natives. Panics and
//!   errors in host code surface as engine errors.
//!
//! # Example
//!
//! ```ignore
//! use ren_bridge::{loadables, Engine, Integer};
//!
//! let engine = Engine::new()?;
//! let add5 = engine.register("value [integer!]", |x: i64| x + 5)?;
//! let result = add5.apply(&loadables![Integer::new(100)])?;
//! assert_eq!(result.cast::<Integer>()?.get(), 105);
//! ```
//!
//! # Engines and contexts
//!
//! A call that names no engine uses the one returned by the engine finder
//! ([`set_engine_finder`]); by default a single engine created on first use.
//! Source text is bound into the context returned by the context finder
//! ([`set_context_finder`]); by default the engine's `user` context.

mod apply;
#[allow(unsafe_code, reason = "reads and writes the engine's native call frame")]
mod boundary;
mod context;
mod engine;
mod error;
#[allow(unsafe_code, reason = "native user data is a leaked box owned by the engine")]
mod extension;
mod loadable;
mod runtime;
mod sys;
mod types;
mod value;

pub use apply::{evaluate, Call, Outcome};
pub use context::{find_context, set_context_finder, user_context, Context, ContextFinder};
pub use engine::{default_engine, find_engine, set_engine_finder, Engine, EngineFinder};
pub use error::{Error, Result};
pub use extension::{FromArg, HostFunction, IntoReturn};
pub use loadable::Loadable;
pub use runtime::{cancel, ensure_thread_registered, init_tracing};
pub use types::{
    Action, AnyArray, AnyNumber, AnySeries, AnyWord, Blank, Block, Char, Datatype, Decimal,
    ErrorValue, GetWord, Group, Integer, LitWord, Logic, Object, Path, Refinement, SetWord, Text,
    Word,
};
pub use value::{PendingValue, Value};

pub use ren_cell::Kind;
pub use ren_engine::{CaptureBuffer, EngineConfig, OutputSink};
