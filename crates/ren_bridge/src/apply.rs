//! Construct-or-apply from the host side.
//!
//! A [`Call`] collects an optional engine, context and applicand plus the
//! loadables, resolves which engine runs it, and translates the engine's
//! result code into values or an [`Error`].
//!
//! Engine resolution order: explicit engine, the context's engine, the
//! applicand's origin, the first value loadable with an origin, then the
//! engine finder. Every value involved must come from that engine.

use ren_cell::{Cell, Kind, RawLoadable, ResultCode};
use smallvec::SmallVec;

use crate::context::{find_context, Context};
use crate::engine::{find_engine, Engine};
use crate::error::{Error, Result};
use crate::loadable::Loadable;
use crate::runtime::ensure_thread_registered;
use crate::sys::{self, RawCall, RawOutcome};
use crate::types::ErrorValue;
use crate::value::Value;

/// Values produced by a successful call.
#[derive(Debug, Default)]
pub struct Outcome {
    pub constructed: Option<Value>,
    pub applied: Option<Value>,
}

/// One construct-or-apply request.
#[derive(Clone, Copy, Debug)]
pub struct Call<'a> {
    engine: Option<&'a Engine>,
    context: Option<&'a Context>,
    applicand: Option<&'a Value>,
    loadables: &'a [Loadable<'a>],
    construct: Option<Kind>,
    apply: bool,
    only: bool,
}

impl<'a> Call<'a> {
    pub fn new(loadables: &'a [Loadable<'a>]) -> Self {
        Call {
            engine: None,
            context: None,
            applicand: None,
            loadables,
            construct: None,
            apply: false,
            only: false,
        }
    }

    #[must_use]
    pub fn engine(mut self, engine: &'a Engine) -> Self {
        self.engine = Some(engine);
        self
    }

    #[must_use]
    pub(crate) fn engine_opt(mut self, engine: Option<&'a Engine>) -> Self {
        self.engine = engine;
        self
    }

    /// Bind newly scanned words into `context`.
    #[must_use]
    pub fn context(mut self, context: &'a Context) -> Self {
        self.context = Some(context);
        self
    }

    #[must_use]
    pub fn applicand(mut self, applicand: &'a Value) -> Self {
        self.applicand = Some(applicand);
        self.apply = true;
        self
    }

    /// Pass the loadables to an action without evaluating them.
    #[must_use]
    pub fn only(mut self) -> Self {
        self.only = true;
        self
    }

    /// Also construct a value of `kind` from the aggregate.
    #[must_use]
    pub fn construct(mut self, kind: Kind) -> Self {
        self.construct = Some(kind);
        self
    }

    /// Also apply (DO the aggregate when there is no applicand).
    #[must_use]
    pub fn apply(mut self) -> Self {
        self.apply = true;
        self
    }

    /// Apply and return the result.
    pub fn evaluate(self) -> Result<Value> {
        let outcome = self.apply().run()?;
        Ok(outcome.applied.unwrap_or_else(Value::void))
    }

    /// Construct a value of `kind` and return it.
    pub fn construct_as(self, kind: Kind) -> Result<Value> {
        let outcome = self.construct(kind).run()?;
        Ok(outcome.constructed.unwrap_or_else(Value::void))
    }

    fn resolve_engine(&self) -> Result<Engine> {
        let named = self
            .engine
            .cloned()
            .or_else(|| self.context.map(Context::engine))
            .or_else(|| self.applicand.and_then(Value::origin).cloned())
            .or_else(|| self.loadables.iter().find_map(Loadable::origin).cloned());
        match named {
            Some(engine) => Ok(engine),
            None => find_engine(),
        }
    }

    fn check_origins(&self, engine: &Engine) -> Result<()> {
        let origins = self
            .context
            .map(|context| context.as_value().origin())
            .into_iter()
            .chain(self.applicand.map(Value::origin))
            .chain(self.loadables.iter().map(Loadable::origin));
        for origin in origins.flatten() {
            if origin != engine {
                return Err(Error::EngineMismatch);
            }
        }
        Ok(())
    }

    /// Run the request.
    #[tracing::instrument(
        level = "debug",
        skip_all,
        fields(loadables = self.loadables.len(), construct = ?self.construct, apply = self.apply)
    )]
    pub fn run(self) -> Result<Outcome> {
        ensure_thread_registered();
        let engine = self.resolve_engine()?;
        self.check_origins(&engine)?;
        let default_context;
        let context = match self.context {
            Some(context) => context,
            None => {
                default_context = find_context(&engine)?;
                &default_context
            }
        };
        let raw: SmallVec<[RawLoadable; 8]> = self.loadables.iter().map(Loadable::to_raw).collect();
        let outcome = sys::construct_or_apply(&RawCall {
            engine: engine.handle(),
            context: Some(context.as_value().cell()),
            applicand: self.applicand.map(Value::cell),
            loadables: &raw,
            construct: self.construct,
            apply: self.apply,
            only: self.only,
        });
        translate(&engine, &outcome, self.construct.is_some(), self.apply)
    }
}

/// Turn the engine's answer into owned values or an error.
fn translate(engine: &Engine, outcome: &RawOutcome, constructed: bool, applied: bool) -> Result<Outcome> {
    let failure = |cell: Cell| ErrorValue::from_engine(Value::adopt(engine, cell));
    match outcome.code {
        ResultCode::Success => Ok(Outcome {
            constructed: constructed.then(|| Value::adopt(engine, outcome.constructed)),
            applied: applied.then(|| Value::adopt(engine, outcome.applied)),
        }),
        ResultCode::LoadError => Err(Error::Load(failure(outcome.error))),
        ResultCode::ConstructError => Err(Error::Construct(failure(outcome.error))),
        ResultCode::ApplyError => Err(Error::Apply(failure(outcome.error))),
        ResultCode::EvaluationError => Err(Error::Evaluation(failure(outcome.error))),
        ResultCode::Thrown => Err(Error::Thrown {
            value: Value::adopt(engine, outcome.error),
            // The engine does not root the label.
            name: if outcome.label.is_void() {
                None
            } else {
                Some(Value::pending(outcome.label).finish_init(Some(engine))?)
            },
        }),
        ResultCode::Cancelled => Err(Error::Cancelled),
        ResultCode::ExitRequested => {
            let code = outcome.error.as_integer().unwrap_or_default();
            Err(Error::ExitRequested(i32::try_from(code).unwrap_or(i32::MAX)))
        }
        code @ (ResultCode::BadEngine | ResultCode::EngineExists) => {
            Err(Error::EngineUnavailable(code))
        }
        code => Err(Error::Abi(code)),
    }
}

/// Evaluate with the default engine and context.
pub fn evaluate(loadables: &[Loadable<'_>]) -> Result<Value> {
    Call::new(loadables).evaluate()
}

impl Engine {
    /// Evaluate in this engine's default context.
    pub fn evaluate(&self, loadables: &[Loadable<'_>]) -> Result<Value> {
        Call::new(loadables).engine(self).evaluate()
    }

    /// Construct a value of `kind` in this engine.
    pub fn construct(&self, kind: Kind, loadables: &[Loadable<'_>]) -> Result<Value> {
        Call::new(loadables).engine(self).construct_as(kind)
    }
}
