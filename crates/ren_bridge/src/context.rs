//! Binding contexts and the default-context finder.

use parking_lot::Mutex;
use ren_cell::Kind;

use crate::apply::Call;
use crate::engine::Engine;
use crate::error::{Error, Result};
use crate::loadable::Loadable;
use crate::value::Value;

/// An object that words are bound into when source text is scanned.
#[derive(Clone, Debug)]
pub struct Context {
    engine: Engine,
    object: Value,
}

impl Context {
    pub(crate) fn from_object(engine: &Engine, object: Value) -> Context {
        Context {
            engine: engine.clone(),
            object,
        }
    }

    /// Use an engine object as a binding context.
    pub fn from_value(object: Value) -> Result<Context> {
        match object.origin() {
            Some(engine) if object.kind() == Kind::Object => Ok(Context::from_object(engine, object.clone())),
            _ => Err(Error::BadValueCast {
                expected: "object!",
                actual: object.kind(),
            }),
        }
    }

    pub fn engine(&self) -> Engine {
        self.engine.clone()
    }

    pub fn as_value(&self) -> &Value {
        &self.object
    }

    /// Evaluate with words bound here.
    pub fn evaluate(&self, loadables: &[Loadable<'_>]) -> Result<Value> {
        Call::new(loadables).context(self).evaluate()
    }

    /// Current value of `name`, or `None` if the context lacks it.
    pub fn get(&self, name: &str) -> Result<Option<Value>> {
        self.object.field(name)
    }

    /// Set `name` to `value`, adding the word if needed.
    pub fn define(&self, name: &str, value: impl Into<Loadable<'static>>) -> Result<()> {
        let target = format!("{name}: quote");
        let value: Loadable<'_> = value.into();
        self.evaluate(&[Loadable::from(target.as_str()), value])?;
        Ok(())
    }
}

/// Supplies the context for calls that name none.
pub type ContextFinder = fn(&Engine) -> Result<Context>;

static CONTEXT_FINDER: Mutex<ContextFinder> = Mutex::new(user_context);

/// The stock finder: the engine's `user` context.
pub fn user_context(engine: &Engine) -> Result<Context> {
    engine.find_context("user")
}

/// Replace the context finder, returning the previous one.
pub fn set_context_finder(finder: ContextFinder) -> ContextFinder {
    std::mem::replace(&mut *CONTEXT_FINDER.lock(), finder)
}

/// Resolve the default context of `engine` through the current finder.
pub fn find_context(engine: &Engine) -> Result<Context> {
    let finder = *CONTEXT_FINDER.lock();
    finder(engine)
}
