//! Host functions the engine can call.
//!
//! [`Engine::register`] turns a Rust callable plus a function spec into an
//! engine action. The callable is boxed and handed to the engine as the
//! native's user data; the engine calls [`delete_callable`] when it reclaims
//! the action. [`Engine::register_once`] keeps the callable in the engine's
//! [`ExtensionTable`] instead, under a key the native carries as its user
//! data, and the first invocation claims it.
//!
//! Both dispatchers run the callable under [`boundary::guard`], so a panic
//! or a bridge error becomes an engine error rather than unwinding into the
//! engine.

mod args;
mod table;

use std::ffi::c_void;
use std::sync::atomic::{AtomicUsize, Ordering};

use ren_cell::{Cell, NativeStatus, RawFrame, ResultCode};
use smallvec::SmallVec;

pub use args::{FromArg, IntoReturn};
pub(crate) use table::ExtensionTable;

use crate::boundary::{self, DispatchOutcome};
use crate::engine::Engine;
use crate::error::{Error, Result};
use crate::runtime::ensure_thread_registered;
use crate::sys;
use crate::types::{Action, ErrorValue};
use crate::value::Value;

/// A type-erased host function.
pub(crate) type Callable = dyn Fn(&Engine, &[Value]) -> Result<Value> + Send + Sync;

/// A Rust callable usable as an engine native.
///
/// Implemented for every `Fn(A1, .., An) -> R` up to eight arguments where
/// each `Ai: FromArg` and `R: IntoReturn`. `Args` is the argument tuple and
/// only serves to keep the impls apart.
pub trait HostFunction<Args>: Send + Sync + 'static {
    /// Number of parameter slots the callable takes.
    const ARITY: usize;

    fn invoke(&self, engine: &Engine, args: &[Value]) -> Result<Value>;
}

macro_rules! count {
    () => { 0usize };
    ($head:ident $($tail:ident)*) => { 1usize + count!($($tail)*) };
}

macro_rules! host_function {
    ($($arg:ident),*) => {
        impl<F, R, $($arg,)*> HostFunction<($($arg,)*)> for F
        where
            F: Fn($($arg),*) -> R + Send + Sync + 'static,
            R: IntoReturn,
            $($arg: FromArg,)*
        {
            const ARITY: usize = count!($($arg)*);

            #[allow(non_snake_case, unused_variables, unused_mut)]
            fn invoke(&self, engine: &Engine, args: &[Value]) -> Result<Value> {
                let mut args = args.iter().cloned();
                $(let $arg = $arg::from_arg(args.next().unwrap_or_else(Value::void))?;)*
                (self)($($arg),*).into_return(engine)
            }
        }
    };
}

host_function!();
host_function!(A1);
host_function!(A1, A2);
host_function!(A1, A2, A3);
host_function!(A1, A2, A3, A4);
host_function!(A1, A2, A3, A4, A5);
host_function!(A1, A2, A3, A4, A5, A6);
host_function!(A1, A2, A3, A4, A5, A6, A7);
host_function!(A1, A2, A3, A4, A5, A6, A7, A8);

fn erase<F, Args>(function: F) -> Box<Callable>
where
    F: HostFunction<Args>,
{
    Box::new(move |engine: &Engine, args: &[Value]| function.invoke(engine, args))
}

/// Root each argument cell for the host.
fn unpack(engine: &Engine, cells: &[Cell]) -> Result<SmallVec<[Value; 8]>> {
    cells
        .iter()
        .map(|&cell| Value::pending(cell).finish_init(Some(engine)))
        .collect()
}

fn run(engine: &Engine, frame: *mut RawFrame, callable: &Callable) -> NativeStatus {
    let outcome = boundary::guard(|| {
        let args = unpack(engine, boundary::frame_args(frame))?;
        callable(engine, &args)
    });
    boundary::deliver(engine, frame, outcome)
}

/// Dispatcher for long-lived registrations; `user_data` is the boxed callable.
extern "C" fn dispatch(frame: *mut RawFrame, user_data: *mut c_void) -> NativeStatus {
    let Some(engine) = Engine::from_handle(boundary::frame_engine(frame)) else {
        return NativeStatus::Error;
    };
    if user_data.is_null() {
        return NativeStatus::Error;
    }
    // SAFETY: `user_data` is the `Box<Box<Callable>>` leaked by `register`;
    // the engine keeps it alive until it calls `delete_callable`.
    let callable = unsafe { &*user_data.cast::<Box<Callable>>() };
    tracing::trace!(handle = engine.handle().0, "extension dispatch");
    run(&engine, frame, callable.as_ref())
}

/// Keys for one-shot registrations. Zero is never issued.
static NEXT_ONE_SHOT: AtomicUsize = AtomicUsize::new(1);

/// Dispatcher for one-shot registrations; `user_data` carries the table key.
extern "C" fn dispatch_once(frame: *mut RawFrame, user_data: *mut c_void) -> NativeStatus {
    let Some(engine) = Engine::from_handle(boundary::frame_engine(frame)) else {
        return NativeStatus::Error;
    };
    let Some(callable) = engine.extensions().claim(user_data as usize) else {
        let outcome = DispatchOutcome::HostException("one-shot extension already used".to_string());
        return boundary::deliver(&engine, frame, outcome);
    };
    tracing::trace!(handle = engine.handle().0, "one-shot extension dispatch");
    run(&engine, frame, callable.as_ref())
}

extern "C" fn delete_callable(user_data: *mut c_void) {
    if user_data.is_null() {
        return;
    }
    // SAFETY: called once by the engine with the pointer `register` leaked.
    drop(unsafe { Box::from_raw(user_data.cast::<Box<Callable>>()) });
}

fn registration_error(engine: &Engine, code: ResultCode, error: Cell) -> Error {
    match code {
        ResultCode::LoadError => Error::Load(ErrorValue::from_engine(Value::adopt(engine, error))),
        ResultCode::BadEngine => Error::EngineUnavailable(code),
        code => Error::Abi(code),
    }
}

fn check_arity(action: &Action, callable: usize) -> Result<()> {
    let spec = action.arity()?;
    if spec == callable {
        Ok(())
    } else {
        Err(Error::ArityMismatch { spec, callable })
    }
}

impl Engine {
    /// Register `function` as a native with the given spec.
    ///
    /// ```ignore
    /// let add5 = engine.register("value [integer!]", |x: i64| x + 5)?;
    /// ```
    ///
    /// The spec's parameter slots (refinements included) must match the
    /// callable's arity. The callable lives until the engine reclaims the
    /// returned action.
    #[tracing::instrument(level = "debug", skip(self, function))]
    pub fn register<F, Args>(&self, spec: &str, function: F) -> Result<Action>
    where
        F: HostFunction<Args>,
    {
        ensure_thread_registered();
        let user_data = Box::into_raw(Box::new(erase(function))).cast::<c_void>();
        let cell = match sys::make_native(self.handle(), spec, dispatch, user_data, Some(delete_callable)) {
            Ok(cell) => cell,
            Err((code, error)) => {
                // SAFETY: the engine did not take ownership of `user_data`.
                drop(unsafe { Box::from_raw(user_data.cast::<Box<Callable>>()) });
                return Err(registration_error(self, code, error));
            }
        };
        let action: Action = Value::adopt(self, cell).cast()?;
        check_arity(&action, F::ARITY)?;
        Ok(action)
    }

    /// Register `function` for a single invocation.
    ///
    /// Later invocations of the action fail with an engine error. Each
    /// registration owns its own entry, so actions built from the same
    /// closure type never run each other's callable.
    #[tracing::instrument(level = "debug", skip(self, function))]
    pub fn register_once<F, Args>(&self, spec: &str, function: F) -> Result<Action>
    where
        F: HostFunction<Args>,
    {
        ensure_thread_registered();
        let key = NEXT_ONE_SHOT.fetch_add(1, Ordering::Relaxed);
        let cell = sys::make_native(self.handle(), spec, dispatch_once, key as *mut c_void, None)
            .map_err(|(code, error)| registration_error(self, code, error))?;
        let action: Action = Value::adopt(self, cell).cast()?;
        check_arity(&action, F::ARITY)?;
        self.extensions().insert(key, erase(function));
        Ok(action)
    }

    /// One-shot registrations not yet invoked.
    pub fn pending_extensions(&self) -> usize {
        self.extensions().pending()
    }
}
