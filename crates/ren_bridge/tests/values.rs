//! Owned values against the default engine.

use pretty_assertions::assert_eq;
use proptest::prelude::*;
use ren_bridge::{
    default_engine, evaluate, loadables, AnyWord, Block, Char, Datatype, Decimal, Engine, Error,
    ErrorValue, Integer, Kind, LitWord, Logic, Object, Refinement, SetWord, Text, Value, Word,
};

fn engine() -> Engine {
    default_engine().unwrap_or_else(|err| panic!("no engine: {err}"))
}

fn eval(source: &str) -> Value {
    evaluate(&loadables![source]).unwrap_or_else(|err| panic!("{source}: {err}"))
}

/// Load molded text back as a single value.
fn reload(molded: &str, kind: Kind) -> Value {
    engine()
        .construct(kind, &loadables![molded])
        .unwrap_or_else(|err| panic!("{molded}: {err}"))
}

#[test]
fn roots_follow_the_last_clone() {
    let engine = engine();
    let block = eval("[1 2 3]");
    let inner = block.clone();
    assert_eq!(engine.root_count(&block), 1);

    drop(block);
    assert_eq!(engine.root_count(&inner), 1);
    assert_eq!(inner.mold().unwrap_or_default(), "[1 2 3]");

    let extra = Block::construct(&loadables![&inner]).unwrap_or_else(|err| panic!("{err}"));
    assert_eq!(engine.root_count(&extra), 1);
    assert_eq!(extra.mold().unwrap_or_default(), "[[1 2 3]]");
}

#[test]
fn scalar_wrappers() {
    assert_eq!(Integer::new(-7).mold().unwrap_or_default(), "-7");
    assert_eq!(Decimal::new(2.5).form().unwrap_or_default(), "2.5");
    assert_eq!(Logic::new(false).form().unwrap_or_default(), "false");
    assert_eq!(Char::new('x').mold().unwrap_or_default(), "#\"x\"");
    assert_eq!(Datatype::new(Kind::Block).form().unwrap_or_default(), "block!");
    assert_eq!(Datatype::new(Kind::Block).get(), Kind::Block);
}

#[test]
fn word_constructors_decorate_their_spelling() {
    let Ok(word) = Word::new("alpha") else {
        panic!("word");
    };
    assert_eq!(word.mold().unwrap_or_default(), "alpha");
    let Ok(set) = SetWord::new("alpha") else {
        panic!("set-word");
    };
    assert_eq!(set.mold().unwrap_or_default(), "alpha:");
    assert_eq!(set.spelling().unwrap_or_default(), "alpha");
    let Ok(lit) = LitWord::new("alpha") else {
        panic!("lit-word");
    };
    assert_eq!(lit.mold().unwrap_or_default(), "'alpha");
    let Ok(refinement) = Refinement::new("deep") else {
        panic!("refinement");
    };
    assert_eq!(refinement.mold().unwrap_or_default(), "/deep");

    let any = Value::from(set).cast::<AnyWord>().unwrap_or_else(|err| panic!("{err}"));
    assert_eq!(any.spelling().unwrap_or_default(), "alpha");

    assert!(matches!(Word::new("two words"), Err(Error::Construct(_))));
}

#[test]
fn text_values() {
    let Ok(text) = Text::new("héllo") else {
        panic!("text");
    };
    assert_eq!(text.len().unwrap_or_default(), 5);
    assert_eq!(text.to_string(), "héllo");
    assert_eq!(engine().root_count(&text), 1);

    let upper = evaluate(&loadables!["length-of", &text]).unwrap_or_else(|err| panic!("{err}"));
    assert_eq!(upper.cell().as_integer(), Some(5));
}

#[test]
fn block_access() {
    let Ok(block) = eval("[10 \"two\" [3]]").cast::<Block>() else {
        panic!("block");
    };
    assert_eq!(block.len().unwrap_or_default(), 3);
    let items: Vec<String> = block
        .iter()
        .map(|item| item.and_then(|item| item.mold()).unwrap_or_default())
        .collect();
    assert_eq!(items, ["10", "\"two\"", "[3]"]);
    assert!(matches!(block.at(3), Ok(None)));
    let Ok(Some(nested)) = block.at(2) else {
        panic!("nested block");
    };
    assert_eq!(engine().root_count(&nested), 1);
}

#[test]
fn object_fields() {
    let Ok(object) = eval("make object! [name: \"ren\" size: 3]").cast::<Object>() else {
        panic!("object");
    };
    let Ok(Some(size)) = object.get("size") else {
        panic!("size field");
    };
    assert_eq!(size.cell().as_integer(), Some(3));
    assert!(matches!(object.get("missing"), Ok(None)));
    assert_eq!(object.len().unwrap_or_default(), 2);
}

#[test]
fn error_values() {
    let Ok(error) = ErrorValue::new("disk full") else {
        panic!("error");
    };
    assert_eq!(error.message().unwrap_or_default(), "disk full");
    assert_eq!(error.id().unwrap_or_default(), "user");
    assert_eq!(engine().root_count(&error), 1);

    let raised = error.apply(&[]);
    let Err(Error::Evaluation(again)) = raised else {
        panic!("re-raise expected, got {raised:?}");
    };
    assert!(again.is_same_as(&error));
}

#[test]
fn logic_blank_and_datatypes_survive_mold() {
    for flag in [true, false] {
        let molded = Logic::new(flag).mold().unwrap_or_default();
        assert_eq!(reload(&molded, Kind::Logic).cell().as_logic(), Some(flag), "{molded}");
    }
    let molded = Value::blank().mold().unwrap_or_default();
    assert!(reload(&molded, Kind::Blank).is_blank(), "{molded}");

    for kind in Kind::ALL {
        let molded = Datatype::new(kind).mold().unwrap_or_default();
        let back = reload(&molded, Kind::Datatype);
        assert_eq!(back.cell().as_datatype(), Some(kind), "{molded}");
    }
}

proptest! {
    #[test]
    fn decimals_survive_mold(d in proptest::num::f64::NORMAL | proptest::num::f64::ZERO | proptest::num::f64::SUBNORMAL) {
        let molded = Decimal::new(d).mold().unwrap_or_default();
        let back = reload(&molded, Kind::Decimal);
        prop_assert_eq!(back.cell().as_decimal(), Some(d), "{}", molded);
    }

    #[test]
    fn chars_survive_mold(s in "[ -~\t\nλ€]") {
        let Some(c) = s.chars().next() else {
            panic!("empty char sample");
        };
        let molded = Char::new(c).mold().unwrap_or_default();
        let back = reload(&molded, Kind::Char);
        prop_assert_eq!(back.cell().as_char(), Some(c), "{}", molded);
    }

    #[test]
    fn integers_survive_mold(n in any::<i64>()) {
        let molded = Integer::new(n).mold().unwrap_or_default();
        let back = reload(&molded, Kind::Integer);
        prop_assert_eq!(back.cell().as_integer(), Some(n));
    }

    #[test]
    fn text_survives_mold(s in "[ -~\t\n]{0,24}") {
        let text = Text::new(&s).unwrap_or_else(|err| panic!("{err}"));
        let molded = text.mold().unwrap_or_default();
        let back = reload(&molded, Kind::Text);
        prop_assert!(back.is_equal_to(&text).unwrap_or_default(), "{} -> {}", s, molded);
        prop_assert_eq!(back.form().unwrap_or_default(), s);
    }

    #[test]
    fn blocks_survive_mold(items in proptest::collection::vec(any::<i32>(), 0..12)) {
        let source = items.iter().map(ToString::to_string).collect::<Vec<_>>().join(" ");
        let block = Block::construct(&loadables![source.as_str()]).unwrap_or_else(|err| panic!("{err}"));
        let molded = block.mold().unwrap_or_default();
        let back = reload(&molded, Kind::Block);
        // Molding a block wraps it in brackets, so the reload nests one level.
        let back = back.cast::<Block>().unwrap_or_else(|err| panic!("{err}"));
        let Ok(Some(inner)) = back.at(0) else {
            panic!("reloaded block is empty");
        };
        prop_assert!(inner.is_equal_to(&block).unwrap_or_default(), "{}", molded);
    }
}
