//! Conversions at the native call boundary.

use crate::engine::Engine;
use crate::error::{Error, Result};
use crate::types::{
    Action, AnyArray, AnyNumber, AnySeries, AnyWord, Blank, Block, Char, Datatype, Decimal,
    ErrorValue, GetWord, Group, Integer, LitWord, Logic, Object, Path, Refinement, SetWord, Text,
    Word,
};
use crate::value::Value;

/// A native argument the host can receive.
pub trait FromArg: Sized {
    fn from_arg(value: Value) -> Result<Self>;
}

/// A host result the engine can receive.
pub trait IntoReturn {
    fn into_return(self, engine: &Engine) -> Result<Value>;
}

impl FromArg for Value {
    fn from_arg(value: Value) -> Result<Self> {
        Ok(value)
    }
}

/// Refinement slots and their arguments arrive as blank when unused.
impl<T: FromArg> FromArg for Option<T> {
    fn from_arg(value: Value) -> Result<Self> {
        if value.is_blank() || value.is_void() {
            Ok(None)
        } else {
            T::from_arg(value).map(Some)
        }
    }
}

impl FromArg for i64 {
    fn from_arg(value: Value) -> Result<Self> {
        value.cast::<Integer>().map(|n| n.get())
    }
}

impl FromArg for f64 {
    fn from_arg(value: Value) -> Result<Self> {
        value.cast::<AnyNumber>().map(|n| n.to_f64())
    }
}

/// A logic value. An unused refinement slot arrives as blank and reads as
/// `false`.
impl FromArg for bool {
    fn from_arg(value: Value) -> Result<Self> {
        if value.is_blank() || value.is_void() {
            Ok(false)
        } else {
            value.cast::<Logic>().map(|flag| flag.get())
        }
    }
}

impl FromArg for char {
    fn from_arg(value: Value) -> Result<Self> {
        value.cast::<Char>().map(|c| c.get())
    }
}

impl FromArg for String {
    fn from_arg(value: Value) -> Result<Self> {
        value.cast::<Text>()?.to_text()
    }
}

macro_rules! wrapper_args {
    ($($name:ident),*) => {
        $(
            impl FromArg for $name {
                fn from_arg(value: Value) -> Result<Self> {
                    value.cast()
                }
            }

            impl IntoReturn for $name {
                fn into_return(self, _engine: &Engine) -> Result<Value> {
                    Ok(self.into_value())
                }
            }
        )*
    };
}

wrapper_args!(
    Blank, Logic, Integer, Decimal, Char, Datatype, Word, SetWord, GetWord, LitWord, Refinement,
    Text, Block, Group, Path, Object, Action, ErrorValue, AnyWord, AnyArray, AnySeries, AnyNumber
);

impl IntoReturn for () {
    fn into_return(self, _engine: &Engine) -> Result<Value> {
        Ok(Value::void())
    }
}

impl IntoReturn for Value {
    fn into_return(self, _engine: &Engine) -> Result<Value> {
        Ok(self)
    }
}

/// `None` returns blank.
impl<T: IntoReturn> IntoReturn for Option<T> {
    fn into_return(self, engine: &Engine) -> Result<Value> {
        match self {
            Some(value) => value.into_return(engine),
            None => Ok(Value::blank()),
        }
    }
}

impl<T: IntoReturn> IntoReturn for Result<T, Error> {
    fn into_return(self, engine: &Engine) -> Result<Value> {
        self?.into_return(engine)
    }
}

macro_rules! scalar_returns {
    ($($ty:ty),*) => {
        $(
            impl IntoReturn for $ty {
                fn into_return(self, _engine: &Engine) -> Result<Value> {
                    Ok(Value::from(self))
                }
            }
        )*
    };
}

scalar_returns!(i64, f64, bool, char);

impl IntoReturn for String {
    fn into_return(self, engine: &Engine) -> Result<Value> {
        self.as_str().into_return(engine)
    }
}

impl IntoReturn for &str {
    fn into_return(self, engine: &Engine) -> Result<Value> {
        Text::new_in(engine, self).map(Text::into_value)
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use ren_cell::Kind;

    use super::FromArg;
    use crate::error::Error;
    use crate::value::Value;

    #[test]
    fn flags_accept_logic_and_unused_refinements() {
        assert!(bool::from_arg(Value::from(true)).unwrap_or_default());
        assert!(!bool::from_arg(Value::from(false)).unwrap_or(true));
        assert!(!bool::from_arg(Value::blank()).unwrap_or(true));
    }

    #[test]
    fn flags_reject_other_kinds() {
        let err = bool::from_arg(Value::from(1_i64));
        assert!(matches!(
            err,
            Err(Error::BadValueCast {
                expected: "logic!",
                actual: Kind::Integer
            })
        ));
    }

    #[test]
    fn options_map_blank_to_none() {
        let Ok(none) = Option::<i64>::from_arg(Value::blank()) else {
            panic!("blank option");
        };
        assert_eq!(none, None);
        let Ok(some) = Option::<i64>::from_arg(Value::from(3_i64)) else {
            panic!("integer option");
        };
        assert_eq!(some, Some(3));
    }
}
