//! Ren Cell - the value representation shared by the engine and its hosts.
//!
//! Every interpreter value crosses the C boundary as a fixed-size [`Cell`].
//! Scalars live inline in the payload; series, objects, actions and errors
//! carry a generational [`ObjectId`] into the engine's collected heap.
//!
//! This crate has no dependencies and no behavior beyond bit layout: the
//! engine (`ren_engine`) owns the meaning of object ids and bindings, and the
//! host bridge (`ren_bridge`) only reads scalar payloads directly.
//!
//! # ABI Types
//!
//! - [`EngineHandle`]: identifies the engine sandbox
//! - [`ResultCode`]: status of every engine entry point
//! - [`RawLoadable`]: a value or pending source text handed to an evaluation
//! - [`RawFrame`], [`NativeStatus`], [`NativeDispatcher`]: native call protocol

mod abi;
mod cell;
mod kind;

pub use abi::{
    EngineHandle, NativeDeleter, NativeDispatcher, NativeStatus, RawFrame, RawLoadable,
    ResultCode, NO_CONSTRUCT,
};
pub use cell::{Cell, ObjectId, CELL_SIZE};
pub use kind::Kind;

#[cfg(test)]
mod tests;
