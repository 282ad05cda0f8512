use pretty_assertions::assert_eq;
use ren_cell::{Cell, EngineHandle, Kind};

use crate::aggregate::Loadable;
use crate::apply::{Failure, Request};
use crate::config::{CaptureBuffer, EngineConfig, OutputSink};
use crate::engine::Engine;

fn engine() -> Engine {
    Engine::new(EngineHandle(1), EngineConfig::new())
}

fn run(engine: &Engine, source: &str) -> Result<Cell, Failure> {
    let loadables = [Loadable::Source(source.into())];
    let request = Request {
        context: engine.find_context("user"),
        loadables: &loadables,
        apply: true,
        ..Request::default()
    };
    engine
        .construct_or_apply(&request)
        .map(|outcome| outcome.applied.unwrap_or_default())
}

fn molded(engine: &Engine, source: &str) -> String {
    match run(engine, source) {
        Ok(cell) => engine.mold(cell),
        Err(failure) => panic!("{source:?} failed: {}", describe(engine, failure)),
    }
}

fn describe(engine: &Engine, failure: Failure) -> String {
    format!("{:?}: {}", failure.code(), engine.form(failure.cell()))
}

/// Id of the error an evaluation failed with.
fn error_id(engine: &Engine, source: &str) -> &'static str {
    match run(engine, source) {
        Err(Failure::Evaluation(cell)) => engine.error_data(cell).map_or("?", |e| e.id),
        other => panic!("{source:?} gave {other:?}"),
    }
}

#[test]
fn enfix_is_strictly_left_to_right() {
    let engine = engine();
    assert_eq!(molded(&engine, "1 + 2 * 3"), "9");
    assert_eq!(molded(&engine, "add 1 2 + 3"), "6");
    assert_eq!(molded(&engine, "2 * (1 + 2)"), "6");
}

#[test]
fn division_stays_exact_when_it_can() {
    let engine = engine();
    assert_eq!(molded(&engine, "10 / 5"), "2");
    assert_eq!(molded(&engine, "10 / 4"), "2.5");
    assert_eq!(molded(&engine, "1.5 * 2"), "3.0");
    assert_eq!(error_id(&engine, "1 / 0"), "zero-divide");
    assert_eq!(error_id(&engine, "9223372036854775807 + 1"), "overflow");
}

#[test]
fn words_set_get_and_quote() {
    let engine = engine();
    assert_eq!(molded(&engine, "x: 10 x + 1"), "11");
    assert_eq!(molded(&engine, "y: :add y 2 3"), "5");
    assert_eq!(molded(&engine, "'foo"), "foo");
    assert_eq!(molded(&engine, "X: 1 x: 2 X"), "1");
    assert_eq!(error_id(&engine, "undefined-thing"), "no-value");
    assert_eq!(error_id(&engine, "z:"), "need-value");
    assert_eq!(error_id(&engine, "+ 1 2"), "no-left-arg");
}

#[test]
fn comparison_and_logic() {
    let engine = engine();
    assert_eq!(molded(&engine, "1 < 2"), "#[true]");
    assert_eq!(molded(&engine, "1 = 1.0"), "#[true]");
    assert_eq!(molded(&engine, "{abc} = {abc}"), "#[true]");
    assert_eq!(molded(&engine, "[1 [2]] = [1 [2]]"), "#[true]");
    assert_eq!(molded(&engine, "not 1 <> 1"), "#[true]");
    assert_eq!(molded(&engine, "all [1 none 3]"), "_");
    assert_eq!(molded(&engine, "any [none false 7]"), "7");
    assert_eq!(error_id(&engine, "{a} < 1"), "invalid-compare");
}

#[test]
fn control_flow() {
    let engine = engine();
    assert_eq!(molded(&engine, "either 1 > 2 [{yes}] [{no}]"), "\"no\"");
    assert_eq!(molded(&engine, "if false [1]"), "#[void]");
    assert_eq!(molded(&engine, "n: 0 loop 5 [n: n + 1] n"), "5");
    assert_eq!(molded(&engine, "i: 0 while [i < 3] [i: i + 1] i"), "3");
    assert_eq!(molded(&engine, "reduce [1 + 1 if false [0] {x}]"), "[2 \"x\"]");
    assert_eq!(molded(&engine, "do {3 * 3}"), "9");
}

#[test]
fn functions_bind_their_arguments() {
    let engine = engine();
    assert_eq!(molded(&engine, "f: func [a b] [a + b] f 2 3"), "5");
    assert_eq!(
        molded(&engine, "g: func [x] [if x > 1 [return 100] x] g 5"),
        "100"
    );
    assert_eq!(
        molded(
            &engine,
            "fact: func [n] [either n <= 1 [1] [n * fact n - 1]] fact 10"
        ),
        "3628800"
    );
    // The argument shadows the user variable only inside the call.
    assert_eq!(molded(&engine, "a: 1 h: func [a] [a * 10] h 5 a"), "1");
    assert_eq!(molded(&engine, "k: does [42] k"), "42");
}

#[test]
fn typed_parameters_reject_other_kinds() {
    let engine = engine();
    assert_eq!(error_id(&engine, "add {a} 1"), "expect-arg");
    assert_eq!(
        error_id(&engine, "f: func [n [integer!]] [n] f 1.5"),
        "expect-arg"
    );
    assert_eq!(molded(&engine, "f 7"), "7");
    assert_eq!(error_id(&engine, "add 1"), "no-arg");
}

#[test]
fn refinements_through_paths() {
    let engine = engine();
    assert_eq!(molded(&engine, "length-of append [1] [2 3]"), "3");
    assert_eq!(molded(&engine, "length-of append/only [1] [2 3]"), "2");
    assert_eq!(
        molded(&engine, "b: [1 [2]] c: copy/deep b append pick c 2 3 b"),
        "[1 [2]]"
    );
    assert_eq!(error_id(&engine, "copy/shallow [1]"), "bad-path");
}

#[test]
fn objects_and_selection() {
    let engine = engine();
    assert_eq!(molded(&engine, "o: make object! [a: 1 b: a + 1] o/b"), "2");
    assert_eq!(molded(&engine, "p: make o [a: 10] p/a + o/a"), "11");
    assert_eq!(molded(&engine, "b: [10 20 30] b/2"), "20");
    assert_eq!(molded(&engine, "pick b 4"), "_");
    assert_eq!(molded(&engine, "length-of context [x: 1 y: 2]"), "2");
    assert_eq!(error_id(&engine, "o/c"), "no-field");
}

#[test]
fn try_catches_errors_only() {
    let engine = engine();
    let result = run(&engine, "try [fail {boom}]");
    let Ok(error) = result else {
        panic!("try let the error escape: {result:?}");
    };
    assert_eq!(error.kind(), Kind::Error);
    assert_eq!(engine.form(error), "boom");
    assert_eq!(error_id(&engine, "fail {loud}"), "user");
}

#[test]
fn throw_and_catch() {
    let engine = engine();
    assert_eq!(molded(&engine, "catch [throw 5 0]"), "5");
    assert_eq!(molded(&engine, "catch/name [throw/name 1 'foo] 'foo"), "1");
    assert_eq!(
        molded(&engine, "catch [catch/name [throw 2] 'foo]"),
        "2"
    );

    match run(&engine, "throw/name 1 'bar") {
        Err(Failure::Thrown { value, name }) => {
            assert_eq!(value.as_integer(), Some(1));
            assert_eq!(engine.form(name), "bar");
        }
        other => panic!("expected a throw, got {other:?}"),
    }
    match run(&engine, "catch/name [throw 3] 'foo") {
        Err(Failure::Thrown { name, .. }) => assert!(name.is_void()),
        other => panic!("expected an unnamed throw, got {other:?}"),
    }
}

#[test]
fn quit_and_halt_are_not_errors() {
    let engine = engine();
    assert_eq!(run(&engine, "quit/with 3"), Err(Failure::ExitRequested(3)));
    assert_eq!(run(&engine, "quit"), Err(Failure::ExitRequested(0)));
    assert_eq!(run(&engine, "try [halt]"), Err(Failure::Cancelled));
}

#[test]
fn deep_recursion_is_a_stack_overflow_error() {
    let engine = Engine::new(EngineHandle(1), EngineConfig::new().max_call_depth(50));
    assert_eq!(error_id(&engine, "f: func [] [f] f"), "stack-overflow");
    assert_eq!(engine.depth.get(), 0);
    assert_eq!(molded(&engine, "1 + 1"), "2");
}

#[test]
fn return_at_top_level_is_an_error() {
    let engine = engine();
    assert_eq!(error_id(&engine, "return 1"), "no-function");
}

#[test]
fn print_goes_to_the_output_sink() {
    let buffer = CaptureBuffer::new();
    let engine = Engine::new(
        EngineHandle(1),
        EngineConfig::new().output(OutputSink::Buffer(buffer.clone())),
    );
    run(&engine, "print [1 + 1 {x}] print {done}").unwrap_or_default();
    assert_eq!(buffer.take(), "2 x\ndone\n");
}

#[test]
fn mold_and_form_natives() {
    let engine = engine();
    assert_eq!(molded(&engine, "mold [a {b}]"), "\"[a ^\"b^\"]\"");
    assert_eq!(molded(&engine, "form [a {b}]"), "\"a b\"");
    assert_eq!(molded(&engine, "type-of 1.5"), "#[datatype! decimal!]");
    assert_eq!(molded(&engine, "form type-of 1.5"), "\"decimal!\"");
}
