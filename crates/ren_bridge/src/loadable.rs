//! Loadables: host values and pending source text for one call.

use std::borrow::Cow;

use ren_cell::RawLoadable;

use crate::engine::Engine;
use crate::value::Value;

/// One element of an evaluation: a value spliced as-is, or source text
/// scanned when the call aggregates its loadables.
#[derive(Clone, Debug)]
pub enum Loadable<'a> {
    Value(Value),
    Source(Cow<'a, str>),
}

impl<'a> Loadable<'a> {
    pub fn source(text: impl Into<Cow<'a, str>>) -> Self {
        Loadable::Source(text.into())
    }

    /// Engine of a value loadable.
    pub fn origin(&self) -> Option<&Engine> {
        match self {
            Loadable::Value(value) => value.origin(),
            Loadable::Source(_) => None,
        }
    }

    /// Borrowed form for the engine; valid while `self` is.
    pub(crate) fn to_raw(&self) -> RawLoadable {
        match self {
            Loadable::Value(value) => RawLoadable::value(value.cell()),
            Loadable::Source(text) => RawLoadable::source(text),
        }
    }
}

impl<'a> From<&'a str> for Loadable<'a> {
    fn from(text: &'a str) -> Self {
        Loadable::Source(Cow::Borrowed(text))
    }
}

impl From<String> for Loadable<'_> {
    fn from(text: String) -> Self {
        Loadable::Source(Cow::Owned(text))
    }
}

impl From<Value> for Loadable<'_> {
    fn from(value: Value) -> Self {
        Loadable::Value(value)
    }
}

impl From<&Value> for Loadable<'_> {
    fn from(value: &Value) -> Self {
        Loadable::Value(value.clone())
    }
}

macro_rules! scalar_loadable {
    ($($ty:ty),*) => {
        $(
            impl From<$ty> for Loadable<'_> {
                fn from(scalar: $ty) -> Self {
                    Loadable::Value(Value::from(scalar))
                }
            }
        )*
    };
}

scalar_loadable!(i64, f64, bool, char);

/// Build a loadable array from mixed source text and values.
///
/// ```ignore
/// let x = Integer::new(10);
/// ren_bridge::evaluate(&loadables!["add", x, "20"])?;
/// ```
#[macro_export]
macro_rules! loadables {
    ($($item:expr),* $(,)?) => {
        [$($crate::Loadable::from($item)),*]
    };
}
