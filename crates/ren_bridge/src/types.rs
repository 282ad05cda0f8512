//! Typed views over [`Value`].
//!
//! Each wrapper holds a value whose kind it has checked, derefs to the
//! value, and converts back into a value or a loadable for free.

use std::fmt;
use std::ops::Deref;

use ren_cell::Kind;

use crate::apply::Call;
use crate::engine::{find_engine, Engine};
use crate::error::{Error, Result};
use crate::loadable::Loadable;
use crate::sys;
use crate::value::Value;

macro_rules! value_wrapper {
    ($(#[$meta:meta])* $name:ident, $label:literal, |$kind:ident| $accepts:expr) => {
        $(#[$meta])*
        #[derive(Clone, Debug)]
        pub struct $name(Value);

        impl $name {
            /// Datatype name used in cast errors.
            pub const NAME: &'static str = $label;

            pub fn accepts($kind: Kind) -> bool {
                $accepts
            }

            pub fn as_value(&self) -> &Value {
                &self.0
            }

            pub fn into_value(self) -> Value {
                self.0
            }
        }

        impl TryFrom<Value> for $name {
            type Error = Error;

            fn try_from(value: Value) -> Result<Self> {
                if Self::accepts(value.kind()) {
                    Ok($name(value))
                } else {
                    Err(Error::BadValueCast {
                        expected: $label,
                        actual: value.kind(),
                    })
                }
            }
        }

        impl From<$name> for Value {
            fn from(wrapper: $name) -> Value {
                wrapper.0
            }
        }

        impl From<$name> for Loadable<'_> {
            fn from(wrapper: $name) -> Self {
                Loadable::Value(wrapper.0)
            }
        }

        impl From<&$name> for Loadable<'_> {
            fn from(wrapper: &$name) -> Self {
                Loadable::Value(wrapper.0.clone())
            }
        }

        impl Deref for $name {
            type Target = Value;

            fn deref(&self) -> &Value {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                fmt::Display::fmt(&self.0, f)
            }
        }
    };
}

macro_rules! kind_wrapper {
    ($(#[$meta:meta])* $name:ident, $kind:ident, $label:literal) => {
        value_wrapper!($(#[$meta])* $name, $label, |kind| kind == Kind::$kind);

        impl $name {
            pub const KIND: Kind = Kind::$kind;

            /// Construct from loadables in the default engine.
            pub fn construct(loadables: &[Loadable<'_>]) -> Result<Self> {
                Call::new(loadables).construct_as(Kind::$kind)?.cast()
            }
        }
    };
}

kind_wrapper!(Blank, Blank, "blank!");
kind_wrapper!(Logic, Logic, "logic!");
kind_wrapper!(Integer, Integer, "integer!");
kind_wrapper!(Decimal, Decimal, "decimal!");
kind_wrapper!(Char, Char, "char!");
kind_wrapper!(Datatype, Datatype, "datatype!");
kind_wrapper!(Word, Word, "word!");
kind_wrapper!(SetWord, SetWord, "set-word!");
kind_wrapper!(GetWord, GetWord, "get-word!");
kind_wrapper!(LitWord, LitWord, "lit-word!");
kind_wrapper!(Refinement, Refinement, "refinement!");
kind_wrapper!(Text, Text, "text!");
kind_wrapper!(Block, Block, "block!");
kind_wrapper!(Group, Group, "group!");
kind_wrapper!(Path, Path, "path!");
kind_wrapper!(Object, Object, "object!");
kind_wrapper!(Action, Action, "action!");
kind_wrapper!(ErrorValue, Error, "error!");

value_wrapper!(
    /// Any of the five word kinds.
    AnyWord, "any-word!", |kind| kind.is_word()
);
value_wrapper!(
    /// Block, group or path.
    AnyArray, "any-array!", |kind| kind.is_array()
);
value_wrapper!(
    /// Any kind backed by collected storage.
    AnySeries, "any-series!", |kind| kind.is_series()
);
value_wrapper!(AnyNumber, "any-number!", |kind| kind.is_number());

impl Blank {
    pub fn new() -> Self {
        Blank(Value::blank())
    }
}

impl Default for Blank {
    fn default() -> Self {
        Blank::new()
    }
}

impl Logic {
    pub fn new(flag: bool) -> Self {
        Logic(Value::from(flag))
    }

    pub fn get(&self) -> bool {
        self.cell().as_logic().unwrap_or_default()
    }
}

impl Integer {
    pub fn new(n: i64) -> Self {
        Integer(Value::from(n))
    }

    pub fn get(&self) -> i64 {
        self.cell().as_integer().unwrap_or_default()
    }
}

impl Decimal {
    pub fn new(d: f64) -> Self {
        Decimal(Value::from(d))
    }

    pub fn get(&self) -> f64 {
        self.cell().as_decimal().unwrap_or_default()
    }
}

impl AnyNumber {
    /// The number as a decimal.
    pub fn to_f64(&self) -> f64 {
        let cell = self.cell();
        #[allow(clippy::cast_precision_loss, reason = "engine math widens the same way")]
        let widened = cell.as_integer().map(|n| n as f64);
        widened.or_else(|| cell.as_decimal()).unwrap_or_default()
    }
}

impl Char {
    pub fn new(c: char) -> Self {
        Char(Value::from(c))
    }

    pub fn get(&self) -> char {
        self.cell().as_char().unwrap_or_default()
    }
}

impl Datatype {
    pub fn new(kind: Kind) -> Self {
        Datatype(Value::from(kind))
    }

    pub fn get(&self) -> Kind {
        self.cell().as_datatype().unwrap_or(Kind::Void)
    }
}

/// Scan `source` as exactly one value of `kind` in `engine`.
fn construct_in(engine: &Engine, kind: Kind, source: &str) -> Result<Value> {
    Call::new(&[Loadable::from(source)]).engine(engine).construct_as(kind)
}

macro_rules! word_constructor {
    ($name:ident, $kind:ident, $prefix:literal, $suffix:literal) => {
        impl $name {
            /// Intern `spelling` in the default engine.
            pub fn new(spelling: &str) -> Result<Self> {
                Self::new_in(&find_engine()?, spelling)
            }

            pub fn new_in(engine: &Engine, spelling: &str) -> Result<Self> {
                let source = format!(concat!($prefix, "{}", $suffix), spelling);
                construct_in(engine, Kind::$kind, &source)?.cast()
            }

            /// The bare spelling, without decoration.
            pub fn spelling(&self) -> Result<String> {
                self.form()
            }
        }
    };
}

word_constructor!(Word, Word, "", "");
word_constructor!(SetWord, SetWord, "", ":");
word_constructor!(GetWord, GetWord, ":", "");
word_constructor!(LitWord, LitWord, "'", "");
word_constructor!(Refinement, Refinement, "/", "");

impl AnyWord {
    pub fn spelling(&self) -> Result<String> {
        self.form()
    }
}

impl Text {
    /// A new text value in the default engine.
    pub fn new(text: &str) -> Result<Self> {
        Text::new_in(&find_engine()?, text)
    }

    pub fn new_in(engine: &Engine, text: &str) -> Result<Self> {
        let cell = sys::make_text(engine.handle(), text).map_err(Error::Abi)?;
        Ok(Text(Value::adopt(engine, cell)))
    }

    /// Character count from the text's position on.
    pub fn len(&self) -> Result<usize> {
        self.series_len()
    }

    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }

    pub fn to_text(&self) -> Result<String> {
        self.form()
    }
}

/// Element access shared by the array wrappers.
macro_rules! array_access {
    ($($name:ident),*) => {
        $(
            impl $name {
                pub fn len(&self) -> Result<usize> {
                    self.series_len()
                }

                pub fn is_empty(&self) -> Result<bool> {
                    Ok(self.len()? == 0)
                }

                /// Element `index`, or `None` past the tail.
                pub fn at(&self, index: usize) -> Result<Option<Value>> {
                    self.series_at(index)
                }

                /// Elements in order.
                pub fn iter(&self) -> impl Iterator<Item = Result<Value>> + '_ {
                    (0..self.len().unwrap_or_default()).filter_map(move |index| self.at(index).transpose())
                }

                /// Every element, in order.
                pub fn to_vec(&self) -> Result<Vec<Value>> {
                    let len = self.len()?;
                    let mut items = Vec::with_capacity(len);
                    for index in 0..len {
                        if let Some(item) = self.at(index)? {
                            items.push(item);
                        }
                    }
                    Ok(items)
                }
            }
        )*
    };
}

array_access!(Block, Group, Path, AnyArray);

impl Object {
    /// Field `name`, or `None` if the object has no such field.
    pub fn get(&self, name: &str) -> Result<Option<Value>> {
        self.field(name)
    }

    pub fn len(&self) -> Result<usize> {
        self.series_len()
    }

    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }
}

impl Action {
    /// A function built with the engine's `func`.
    pub fn func(spec: &str, body: &str) -> Result<Self> {
        let spec = format!("[{spec}]");
        let body = format!("[{body}]");
        Call::new(&[Loadable::from(spec), Loadable::from(body)])
            .construct_as(Kind::Action)?
            .cast()
    }

    /// Parameter slots, refinements included.
    pub fn arity(&self) -> Result<usize> {
        let engine = self.engine()?;
        sys::action_arity(engine.handle(), self.cell()).map_err(Error::Abi)
    }
}

impl ErrorValue {
    /// A `user` error in the default engine.
    pub fn new(message: &str) -> Result<Self> {
        let engine = find_engine()?;
        let cell = sys::make_error(engine.handle(), message).map_err(Error::Abi)?;
        Value::pending(cell).finish_init(Some(&engine))?.cast()
    }

    /// Wrap an error cell the engine handed back.
    pub(crate) fn from_engine(value: Value) -> Self {
        ErrorValue(value)
    }

    pub fn message(&self) -> Result<String> {
        self.form()
    }

    /// Error id (`no-value`, `zero-divide`, `user`, ...).
    pub fn id(&self) -> Result<String> {
        let engine = self.engine()?;
        sys::error_id(engine.handle(), self.cell()).map_err(Error::Abi)
    }
}

impl From<i64> for Integer {
    fn from(n: i64) -> Self {
        Integer::new(n)
    }
}

impl From<f64> for Decimal {
    fn from(d: f64) -> Self {
        Decimal::new(d)
    }
}

impl From<bool> for Logic {
    fn from(flag: bool) -> Self {
        Logic::new(flag)
    }
}
