use pretty_assertions::assert_eq;
use ren_cell::{Cell, EngineHandle, Kind, ResultCode};

use super::{Failure, Outcome, Request};
use crate::aggregate::Loadable;
use crate::config::EngineConfig;
use crate::engine::Engine;

fn engine() -> Engine {
    Engine::new(EngineHandle(1), EngineConfig::new())
}

fn source(text: &str) -> Loadable<'_> {
    Loadable::Source(text.into())
}

fn request<'a>(engine: &Engine, loadables: &'a [Loadable<'a>]) -> Request<'a> {
    Request {
        context: engine.find_context("user"),
        loadables,
        ..Request::default()
    }
}

fn construct(engine: &Engine, kind: Kind, loadables: &[Loadable<'_>]) -> Result<Cell, Failure> {
    let request = Request {
        construct: Some(kind),
        ..request(engine, loadables)
    };
    engine
        .construct_or_apply(&request)
        .map(|outcome| outcome.constructed.unwrap_or_default())
}

fn apply(
    engine: &Engine,
    applicand: Option<Cell>,
    loadables: &[Loadable<'_>],
    only: bool,
) -> Result<Cell, Failure> {
    let request = Request {
        applicand,
        apply: true,
        only,
        ..request(engine, loadables)
    };
    engine
        .construct_or_apply(&request)
        .map(|outcome| outcome.applied.unwrap_or_default())
}

fn lib(engine: &Engine, name: &str) -> Cell {
    engine
        .find_context("lib")
        .and_then(|lib| engine.object_get(lib, name))
        .unwrap_or_default()
}

fn error_id(engine: &Engine, failure: &Failure) -> &'static str {
    engine.error_data(failure.cell()).map_or("?", |e| e.id)
}

#[test]
fn construct_block_aggregates_everything() {
    let engine = engine();
    let block = construct(
        &engine,
        Kind::Block,
        &[source("1 2"), Loadable::Value(Cell::integer(3))],
    );
    let Ok(block) = block else {
        panic!("construct failed: {block:?}");
    };
    assert_eq!(engine.mold(block), "[1 2 3]");
    assert_eq!(engine.root_count(block), 1);
}

#[test]
fn construct_scalar_needs_exactly_one_matching_element() {
    let engine = engine();
    assert_eq!(
        construct(&engine, Kind::Integer, &[source("42")]).map(|c| c.as_integer()),
        Ok(Some(42))
    );

    let two = construct(&engine, Kind::Integer, &[source("1 2")]);
    let Err(failure) = two else {
        panic!("two values constructed an integer");
    };
    assert_eq!(failure.code(), ResultCode::ConstructError);
    assert_eq!(error_id(&engine, &failure), "construct");

    let wrong = construct(&engine, Kind::Integer, &[source("{a}")]);
    assert!(matches!(wrong, Err(Failure::Construct(_))));

    assert_eq!(construct(&engine, Kind::Void, &[]), Ok(Cell::VOID));
}

#[test]
fn construct_makes_objects_errors_and_actions() {
    let engine = engine();
    let object = construct(&engine, Kind::Object, &[source("a: 1 b: a + 1")]);
    let Ok(object) = object else {
        panic!("object construct failed: {object:?}");
    };
    assert_eq!(
        engine.object_get(object, "b").and_then(|b| b.as_integer()),
        Some(2)
    );

    let error = construct(&engine, Kind::Error, &[source("{bad}")]);
    assert_eq!(error.map(|e| engine.form(e)), Ok("bad".to_string()));

    let action = construct(&engine, Kind::Action, &[source("[x] [x * 2]")]);
    let Ok(action) = action else {
        panic!("action construct failed: {action:?}");
    };
    let doubled = apply(&engine, Some(action), &[source("21")], false);
    assert_eq!(doubled.map(|c| c.as_integer()), Ok(Some(42)));
}

#[test]
fn construct_and_apply_in_one_request() {
    let engine = engine();
    let loadables = [source("1 + 2")];
    let request = Request {
        construct: Some(Kind::Block),
        apply: true,
        ..request(&engine, &loadables)
    };
    let Ok(Outcome {
        constructed: Some(block),
        applied: Some(sum),
    }) = engine.construct_or_apply(&request)
    else {
        panic!("request failed");
    };
    assert_eq!(engine.series_len(block), Some(3));
    assert_eq!(sum.as_integer(), Some(3));
}

#[test]
fn applying_an_action_checks_arity() {
    let engine = engine();
    let add = lib(&engine, "add");
    assert_eq!(
        apply(&engine, Some(add), &[source("1 2")], false).map(|c| c.as_integer()),
        Ok(Some(3))
    );
    // Arguments are reduced before counting.
    assert_eq!(
        apply(&engine, Some(add), &[source("1 + 1 2")], false).map(|c| c.as_integer()),
        Ok(Some(4))
    );

    let too_many = apply(&engine, Some(add), &[source("1 2 3")], false);
    let Err(failure) = too_many else {
        panic!("three arguments applied to add");
    };
    assert_eq!(failure.code(), ResultCode::ApplyError);
    assert_eq!(error_id(&engine, &failure), "apply-too-many");

    let too_few = apply(&engine, Some(add), &[source("1")], false);
    assert!(matches!(too_few, Err(Failure::Apply(_))));

    let mistyped = apply(&engine, Some(add), &[source("{a} 1")], false);
    assert!(matches!(mistyped, Err(Failure::Evaluation(_))));
}

#[test]
fn apply_only_passes_values_unevaluated() {
    let engine = engine();
    let type_of = lib(&engine, "type-of");
    let quoted = apply(&engine, Some(type_of), &[source("nowhere")], true);
    assert_eq!(quoted.map(|c| c.as_datatype()), Ok(Some(Kind::Word)));

    let evaluated = apply(&engine, Some(type_of), &[source("nowhere")], false);
    assert!(matches!(evaluated, Err(Failure::Evaluation(_))));
}

#[test]
fn applying_an_object_runs_code_in_its_context() {
    let engine = engine();
    let object = construct(&engine, Kind::Object, &[source("a: 5")]).unwrap_or_default();
    let result = apply(&engine, Some(object), &[source("a + 1")], false);
    assert_eq!(result.map(|c| c.as_integer()), Ok(Some(6)));
}

#[test]
fn applying_an_error_raises_it_only_without_arguments() {
    let engine = engine();
    let error = construct(&engine, Kind::Error, &[source("{nope}")]).unwrap_or_default();
    assert_eq!(
        apply(&engine, Some(error), &[], false),
        Err(Failure::Evaluation(error))
    );
    let with_args = apply(&engine, Some(error), &[source("1")], false);
    assert!(matches!(with_args, Err(Failure::Apply(_))));
}

#[test]
fn applying_a_plain_value_evaluates_one_expression() {
    let engine = engine();
    let sum = apply(&engine, Some(Cell::integer(1)), &[source("+ 2")], false);
    assert_eq!(sum.map(|c| c.as_integer()), Ok(Some(3)));

    let leftover = apply(&engine, Some(Cell::integer(1)), &[source("2")], false);
    let Err(failure) = leftover else {
        panic!("leftover argument accepted");
    };
    assert_eq!(failure.code(), ResultCode::ApplyError);
}

#[test]
fn no_applicand_means_do() {
    let engine = engine();
    let result = apply(&engine, None, &[source("x: 2"), source("x * 10")], false);
    assert_eq!(result.map(|c| c.as_integer()), Ok(Some(20)));
    let empty = apply(&engine, None, &[], false);
    assert_eq!(empty, Ok(Cell::VOID));
}

#[test]
fn malformed_source_is_a_load_error() {
    let engine = engine();
    let result = apply(&engine, None, &[source("1"), source("[2")], false);
    let Err(failure) = result else {
        panic!("malformed source evaluated");
    };
    assert_eq!(failure.code(), ResultCode::LoadError);
    assert_eq!(engine.root_count(failure.cell()), 1);
}

#[test]
fn context_must_be_an_object() {
    let engine = engine();
    let loadables = [source("1")];
    let request = Request {
        context: Some(Cell::integer(1)),
        apply: true,
        ..Request::default()
    };
    let request = Request {
        loadables: &loadables,
        ..request
    };
    let result = engine.construct_or_apply(&request);
    assert!(matches!(result, Err(Failure::Apply(_))));
}

#[test]
fn failures_report_their_codes() {
    let engine = engine();
    let thrown = apply(&engine, None, &[source("throw 1")], false);
    assert_eq!(thrown.map_err(|f| f.code()), Err(ResultCode::Thrown));
    let quit = apply(&engine, None, &[source("quit/with 2")], false);
    assert_eq!(quit, Err(Failure::ExitRequested(2)));
    assert_eq!(Failure::ExitRequested(2).cell().as_integer(), Some(2));
    let halted = apply(&engine, None, &[source("halt")], false);
    assert_eq!(halted.map_err(|f| f.code()), Err(ResultCode::Cancelled));
}

#[test]
fn guards_are_released_and_outputs_survive_recycle() {
    let engine = engine();
    let block = construct(&engine, Kind::Block, &[source("[nested] {text}")]).unwrap_or_default();
    assert_eq!(engine.heap.borrow().guard_count(), 0);

    engine.recycle();
    assert_eq!(engine.mold(block), "[[nested] \"text\"]");

    assert!(engine.release_cell(block));
    assert!(!engine.release_cell(block));
    assert!(engine.recycle() >= 3);
    assert_eq!(engine.series_len(block), None);
}

#[test]
fn automatic_recycle_runs_at_quiescent_points() {
    let engine = Engine::new(EngineHandle(1), EngineConfig::new().recycle_threshold(8));
    let before = engine.live_objects();
    let result = apply(
        &engine,
        None,
        &[source("loop 20 [copy [1 2 3]] 0")],
        false,
    );
    assert_eq!(result.map(|c| c.as_integer()), Ok(Some(0)));
    assert!(engine.heap.borrow().allocations_since_recycle() < 8);
    assert!(engine.live_objects() < before + 20);
}
