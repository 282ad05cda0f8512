//! Cancellation. Kept in its own test binary: the cancel flag is process-wide.

use pretty_assertions::assert_eq;
use ren_bridge::{cancel, default_engine, evaluate, loadables, Error};

#[test]
fn cancellation_is_distinct_and_leaks_nothing() {
    let Ok(engine) = default_engine() else {
        panic!("no engine");
    };
    let Ok(stop) = engine.register("", cancel) else {
        panic!("register failed");
    };
    let Ok(user) = engine.find_context("user") else {
        panic!("user context");
    };
    user.define("stop", &stop).unwrap_or_else(|err| panic!("{err}"));

    let before = engine.total_roots().unwrap_or_default();
    let result = evaluate(&loadables!["data: [1 2 3] stop length-of data"]);
    let Err(err) = result else {
        panic!("evaluation should have been cancelled");
    };
    assert!(matches!(err, Error::Cancelled), "{err:?}");
    assert!(err.is_halting());
    assert!(err.error_value().is_none());
    assert_eq!(err.to_string(), "[interrupted]");
    drop(err);
    assert_eq!(engine.total_roots().unwrap_or_default(), before);

    let swallowed = evaluate(&loadables!["try [stop]"]);
    assert!(matches!(swallowed, Err(Error::Cancelled)), "{swallowed:?}");

    // The flag is cleared when the next top-level call starts.
    let Ok(sum) = evaluate(&loadables!["1 + 1"]) else {
        panic!("engine unusable after cancel");
    };
    assert_eq!(sum.cell().as_integer(), Some(2));
    assert_eq!(engine.total_roots().unwrap_or_default(), before);
}
