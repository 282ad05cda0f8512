//! Owned values.
//!
//! A [`Value`] is a cell plus, for kinds the collector tracks and for words
//! bound to a context, one engine root shared by every clone. The root is taken before the value is handed
//! out and released when the last clone drops, so the collector can never
//! reclaim storage a host still sees.

use std::fmt;
use std::sync::Arc;

use ren_cell::{Cell, Kind, ResultCode};

use crate::apply::Call;
use crate::engine::{find_engine, Engine};
use crate::error::{Error, Result};
use crate::loadable::Loadable;
use crate::sys;

/// One root on one cell. Dropping it releases the root.
struct Root {
    engine: Engine,
    cell: Cell,
}

impl Drop for Root {
    fn drop(&mut self) {
        match sys::release(self.engine.handle(), self.cell) {
            ResultCode::Success | ResultCode::BadEngine => {}
            code => {
                tracing::error!(cell = ?self.cell, %code, "releasing a value root failed");
                std::process::abort();
            }
        }
    }
}

/// An engine value owned by the host.
#[derive(Clone)]
pub struct Value {
    cell: Cell,
    origin: Option<Engine>,
    root: Option<Arc<Root>>,
}

/// A cell that is not yet rooted. [`PendingValue::finish_init`] is the only
/// way to turn it into a [`Value`].
#[must_use = "a pending value does nothing until finish_init"]
pub struct PendingValue {
    cell: Cell,
}

impl PendingValue {
    /// Root the cell if its kind is collected, and take ownership.
    pub fn finish_init(self, engine: Option<&Engine>) -> Result<Value> {
        if !sys::needs_root(self.cell) {
            return Ok(Value::scalar(self.cell, engine.cloned()));
        }
        let Some(engine) = engine else {
            return Err(Error::EngineUnavailable(ResultCode::BadEngine));
        };
        match sys::root(engine.handle(), self.cell) {
            ResultCode::Success => Ok(Value::adopt(engine, self.cell)),
            ResultCode::BadEngine => Err(Error::EngineUnavailable(ResultCode::BadEngine)),
            code => Err(Error::Abi(code)),
        }
    }
}

impl Value {
    pub(crate) fn pending(cell: Cell) -> PendingValue {
        PendingValue { cell }
    }

    fn scalar(cell: Cell, origin: Option<Engine>) -> Value {
        Value {
            cell,
            origin,
            root: None,
        }
    }

    /// Take over a cell the engine already rooted for us.
    pub(crate) fn adopt(engine: &Engine, cell: Cell) -> Value {
        let root = cell.root_target().is_some().then(|| {
            Arc::new(Root {
                engine: engine.clone(),
                cell,
            })
        });
        Value {
            cell,
            origin: Some(engine.clone()),
            root,
        }
    }

    pub(crate) fn literal(cell: Cell) -> Value {
        Value::scalar(cell, None)
    }

    pub fn void() -> Value {
        Value::literal(Cell::VOID)
    }

    pub fn blank() -> Value {
        Value::literal(Cell::blank())
    }

    pub fn kind(&self) -> Kind {
        self.cell.kind()
    }

    /// The raw cell. Valid for as long as this value is alive.
    pub fn cell(&self) -> Cell {
        self.cell
    }

    /// Engine this value came from; `None` for literals built without one.
    pub fn origin(&self) -> Option<&Engine> {
        self.origin.as_ref()
    }

    /// This value's engine, or the default one.
    pub(crate) fn engine(&self) -> Result<Engine> {
        match &self.origin {
            Some(engine) => Ok(engine.clone()),
            None => find_engine(),
        }
    }

    pub fn is_void(&self) -> bool {
        self.kind() == Kind::Void
    }

    pub fn is_blank(&self) -> bool {
        self.kind() == Kind::Blank
    }

    pub fn is_series(&self) -> bool {
        self.kind().is_series()
    }

    pub fn is_word(&self) -> bool {
        self.kind().is_word()
    }

    pub fn is_number(&self) -> bool {
        self.kind().is_number()
    }

    /// Engine truth: everything but void, blank and `false`.
    pub fn is_truthy(&self) -> bool {
        self.cell.is_truthy()
    }

    /// Same instance: equal scalars, or the same series at the same position.
    pub fn is_same_as(&self, other: &Value) -> bool {
        self.cell.same_as(&other.cell)
    }

    /// Engine equality (`=`).
    pub fn is_equal_to(&self, other: &Value) -> Result<bool> {
        let engine = match (&self.origin, &other.origin) {
            (Some(a), Some(b)) if a != b => return Err(Error::EngineMismatch),
            (Some(engine), _) | (None, Some(engine)) => engine.clone(),
            (None, None) => find_engine()?,
        };
        Ok(sys::is_equal(engine.handle(), self.cell, other.cell))
    }

    /// Human-readable text.
    pub fn form(&self) -> Result<String> {
        self.render(false)
    }

    /// Source text that loads back to an equal value.
    pub fn mold(&self) -> Result<String> {
        self.render(true)
    }

    fn render(&self, mold: bool) -> Result<String> {
        let engine = self.engine()?;
        sys::render(engine.handle(), self.cell, mold).map_err(Error::Abi)
    }

    /// An independent copy made by the engine's `copy`. Clone shares.
    pub fn copy(&self, deep: bool) -> Result<Value> {
        let word = if deep { "copy/deep quote" } else { "copy quote" };
        Call::new(&[Loadable::from(word), Loadable::from(self)])
            .engine_opt(self.origin.as_ref())
            .evaluate()
    }

    /// Apply this value to the loadables (arguments are evaluated).
    pub fn apply(&self, loadables: &[Loadable<'_>]) -> Result<Value> {
        Call::new(loadables).applicand(self).evaluate()
    }

    /// Apply without evaluating the loadables first.
    pub fn apply_only(&self, loadables: &[Loadable<'_>]) -> Result<Value> {
        Call::new(loadables).applicand(self).only().evaluate()
    }

    /// Narrow to a typed wrapper.
    pub fn cast<T>(self) -> Result<T>
    where
        T: TryFrom<Value, Error = Error>,
    {
        T::try_from(self)
    }

    // Series access, shared by the typed series wrappers.

    pub(crate) fn series_len(&self) -> Result<usize> {
        let engine = self.engine()?;
        sys::series_len(engine.handle(), self.cell).map_err(Error::Abi)
    }

    pub(crate) fn series_at(&self, index: usize) -> Result<Option<Value>> {
        let engine = self.engine()?;
        match sys::series_at(engine.handle(), self.cell, index) {
            Ok(cell) => Ok(Some(Value::adopt(&engine, cell))),
            Err(ResultCode::ApplyError) => Ok(None),
            Err(code) => Err(Error::Abi(code)),
        }
    }

    pub(crate) fn field(&self, name: &str) -> Result<Option<Value>> {
        let engine = self.engine()?;
        match sys::object_get(engine.handle(), self.cell, name) {
            Ok(cell) => Ok(Some(Value::adopt(&engine, cell))),
            Err(ResultCode::ApplyError) => Ok(None),
            Err(code) => Err(Error::Abi(code)),
        }
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Literals are shown raw rather than creating an engine to mold them.
        let molded = self
            .origin
            .as_ref()
            .and_then(|engine| sys::render(engine.handle(), self.cell, true).ok());
        match molded {
            Some(text) => write!(f, "Value({text})"),
            None => write!(f, "Value({:?})", self.cell),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.form() {
            Ok(text) => f.write_str(&text),
            Err(_) => write!(f, "{:?}", self.cell),
        }
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::literal(Cell::integer(n))
    }
}

impl From<f64> for Value {
    fn from(d: f64) -> Self {
        Value::literal(Cell::decimal(d))
    }
}

impl From<bool> for Value {
    fn from(flag: bool) -> Self {
        Value::literal(Cell::logic(flag))
    }
}

impl From<char> for Value {
    fn from(c: char) -> Self {
        Value::literal(Cell::char(c))
    }
}

impl From<Kind> for Value {
    fn from(kind: Kind) -> Self {
        Value::literal(Cell::datatype(kind))
    }
}
