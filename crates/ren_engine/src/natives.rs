//! Built-in actions and system words of `lib`.

use std::cmp::Ordering;

use ren_cell::{Cell, Kind};

use crate::engine::Engine;
use crate::errors;
use crate::eval::{EvalResult, Feed, Signal};
use crate::heap::{ActionBody, ActionData, Object};

/// Native implementation: receives one cell per parameter slot.
pub type NativeFn = fn(&Engine, &[Cell]) -> EvalResult;

struct NativeDef {
    name: &'static str,
    spec: &'static str,
    native: NativeFn,
    enfix: bool,
}

const fn prefix(name: &'static str, spec: &'static str, native: NativeFn) -> NativeDef {
    NativeDef {
        name,
        spec,
        native,
        enfix: false,
    }
}

const fn enfix(name: &'static str, spec: &'static str, native: NativeFn) -> NativeDef {
    NativeDef {
        name,
        spec,
        native,
        enfix: true,
    }
}

const MATH: &str = "value1 [any-number!] value2 [any-number!]";
const COMPARE: &str = "value1 [any-value!] value2 [any-value!]";

const NATIVES: &[NativeDef] = &[
    // Math
    enfix("+", MATH, add),
    enfix("-", MATH, subtract),
    enfix("*", MATH, multiply),
    enfix("/", MATH, divide),
    prefix("add", MATH, add),
    prefix("subtract", MATH, subtract),
    prefix("multiply", MATH, multiply),
    prefix("divide", MATH, divide),
    // Comparison
    enfix("=", COMPARE, equal),
    enfix("<>", COMPARE, not_equal),
    enfix("<", COMPARE, lesser),
    enfix(">", COMPARE, greater),
    enfix("<=", COMPARE, lesser_or_equal),
    enfix(">=", COMPARE, greater_or_equal),
    // Logic and control
    prefix("not", "value [any-value! void!]", not),
    prefix("if", "condition [any-value! void!] branch [block!]", if_native),
    prefix(
        "either",
        "condition [any-value! void!] true-branch [block!] false-branch [block!]",
        either,
    ),
    prefix("all", "block [block!]", all),
    prefix("any", "block [block!]", any),
    prefix("while", "condition [block!] body [block!]", while_native),
    prefix("loop", "count [integer!] body [block!]", loop_native),
    prefix("do", "value [any-value!]", do_native),
    prefix("reduce", "block [block! group!]", reduce),
    prefix("quote", "'value [any-value! void!]", quote),
    // Functions and objects
    prefix("func", "spec [block!] body [block!]", func),
    prefix("does", "body [block!]", does),
    prefix("make", "type [datatype! object!] spec [any-value!]", make),
    prefix("context", "spec [block!]", context),
    prefix("return", "value [any-value! void!]", return_native),
    // Series
    prefix("copy", "value [any-value!] /deep", copy),
    prefix("length-of", "series [any-series! object!]", length_of),
    prefix("first", "series [any-series!]", first),
    prefix("last", "series [any-series!]", last),
    prefix("pick", "series [any-series!] index [integer!]", pick),
    prefix(
        "append",
        "series [block! group! text!] value [any-value!] /only",
        append,
    ),
    // Values
    prefix("type-of", "value [any-value! void!]", type_of),
    prefix("form", "value [any-value! void!]", form),
    prefix("mold", "value [any-value! void!]", mold),
    prefix("print", "value [any-value!]", print),
    // Errors and non-local exits
    prefix("fail", "reason [text! error!]", fail),
    prefix("try", "block [block!]", try_native),
    prefix("throw", "value [any-value! void!] /name word [word!]", throw),
    prefix("catch", "block [block!] /name word [word! block!]", catch),
    prefix("quit", "/with code [integer!]", quit),
    prefix("halt", "", halt),
];

/// Define every native and system word in `lib`.
pub(crate) fn install(engine: &Engine) {
    for def in NATIVES {
        let spec = match engine.parse_spec_text(def.spec) {
            Ok(spec) => spec,
            Err(err) => {
                tracing::error!(native = def.name, message = %err.message, "bad native spec");
                continue;
            }
        };
        let name = engine.intern(def.name);
        let id = engine.alloc(Object::Action(ActionData {
            name: Some(name),
            doc: spec.doc,
            params: spec.params,
            body: ActionBody::Native(def.native),
            enfix: def.enfix,
        }));
        engine.define_lib(def.name, Cell::series(Kind::Action, id, 0));
    }
    for kind in Kind::ALL {
        engine.define_lib(kind.name(), Cell::datatype(kind));
    }
    engine.define_lib("none", Cell::blank());
    engine.define_lib("true", Cell::logic(true));
    engine.define_lib("false", Cell::logic(false));
    tracing::trace!(count = NATIVES.len(), "natives installed");
}

fn arg(args: &[Cell], i: usize) -> Cell {
    args.get(i).copied().unwrap_or_default()
}

// Math

#[derive(Clone, Copy)]
enum Num {
    Int(i64),
    Dec(f64),
}

fn num(cell: Cell) -> Option<Num> {
    cell.as_integer()
        .map(Num::Int)
        .or_else(|| cell.as_decimal().map(Num::Dec))
}

#[expect(clippy::cast_precision_loss, reason = "mixed arithmetic promotes to decimal")]
fn to_f64(n: Num) -> f64 {
    match n {
        Num::Int(i) => i as f64,
        Num::Dec(d) => d,
    }
}

fn arith(
    engine: &Engine,
    args: &[Cell],
    int_op: fn(i64, i64) -> Option<i64>,
    dec_op: fn(f64, f64) -> f64,
) -> EvalResult {
    let (Some(a), Some(b)) = (num(arg(args, 0)), num(arg(args, 1))) else {
        return engine.raise(errors::invalid_arg(arg(args, 1).kind()));
    };
    match (a, b) {
        (Num::Int(a), Num::Int(b)) => match int_op(a, b) {
            Some(n) => Ok(Cell::integer(n)),
            None => engine.raise(errors::math_overflow()),
        },
        _ => {
            let d = dec_op(to_f64(a), to_f64(b));
            if d.is_finite() {
                Ok(Cell::decimal(d))
            } else {
                engine.raise(errors::math_overflow())
            }
        }
    }
}

fn add(engine: &Engine, args: &[Cell]) -> EvalResult {
    arith(engine, args, i64::checked_add, |a, b| a + b)
}

fn subtract(engine: &Engine, args: &[Cell]) -> EvalResult {
    arith(engine, args, i64::checked_sub, |a, b| a - b)
}

fn multiply(engine: &Engine, args: &[Cell]) -> EvalResult {
    arith(engine, args, i64::checked_mul, |a, b| a * b)
}

fn divide(engine: &Engine, args: &[Cell]) -> EvalResult {
    let divisor = num(arg(args, 1));
    let zero = match divisor {
        Some(Num::Int(0)) => true,
        Some(Num::Dec(d)) => d == 0.0,
        _ => false,
    };
    if zero {
        return engine.raise(errors::zero_divide());
    }
    match (num(arg(args, 0)), divisor) {
        // Inexact integer division yields a decimal.
        (Some(Num::Int(a)), Some(Num::Int(b))) if a.checked_rem(b) != Some(0) => {
            Ok(Cell::decimal(to_f64(Num::Int(a)) / to_f64(Num::Int(b))))
        }
        _ => arith(engine, args, i64::checked_div, |a, b| a / b),
    }
}

// Comparison

/// Value equality: numbers across kinds, series by content, words by spelling.
pub(crate) fn values_equal(engine: &Engine, a: Cell, b: Cell) -> bool {
    if let (Some(x), Some(y)) = (num(a), num(b)) {
        return match (x, y) {
            (Num::Int(x), Num::Int(y)) => x == y,
            _ => to_f64(x) == to_f64(y),
        };
    }
    let (ka, kb) = (a.kind(), b.kind());
    if ka != kb {
        return false;
    }
    match ka {
        Kind::Text => engine.text_of(a) == engine.text_of(b),
        k if k.is_word() => a.symbol() == b.symbol(),
        k if k.is_array() => {
            let (xs, ys) = (engine.array_cells(a), engine.array_cells(b));
            xs.len() == ys.len()
                && xs
                    .iter()
                    .zip(&ys)
                    .all(|(x, y)| x.same_as(y) || values_equal(engine, *x, *y))
        }
        _ => a.same_as(&b),
    }
}

fn compare(engine: &Engine, a: Cell, b: Cell) -> EvalResult<Ordering> {
    let ordering = match (num(a), num(b)) {
        (Some(Num::Int(x)), Some(Num::Int(y))) => Some(x.cmp(&y)),
        (Some(x), Some(y)) => to_f64(x).partial_cmp(&to_f64(y)),
        _ => match (a.kind(), b.kind()) {
            (Kind::Text, Kind::Text) => Some(engine.text_of(a).cmp(&engine.text_of(b))),
            (Kind::Char, Kind::Char) => a.as_char().partial_cmp(&b.as_char()),
            _ => None,
        },
    };
    match ordering {
        Some(ordering) => Ok(ordering),
        None => engine.raise(errors::cannot_compare(a.kind(), b.kind())),
    }
}

fn equal(engine: &Engine, args: &[Cell]) -> EvalResult {
    Ok(Cell::logic(values_equal(engine, arg(args, 0), arg(args, 1))))
}

fn not_equal(engine: &Engine, args: &[Cell]) -> EvalResult {
    Ok(Cell::logic(!values_equal(engine, arg(args, 0), arg(args, 1))))
}

fn lesser(engine: &Engine, args: &[Cell]) -> EvalResult {
    Ok(Cell::logic(compare(engine, arg(args, 0), arg(args, 1))?.is_lt()))
}

fn greater(engine: &Engine, args: &[Cell]) -> EvalResult {
    Ok(Cell::logic(compare(engine, arg(args, 0), arg(args, 1))?.is_gt()))
}

fn lesser_or_equal(engine: &Engine, args: &[Cell]) -> EvalResult {
    Ok(Cell::logic(compare(engine, arg(args, 0), arg(args, 1))?.is_le()))
}

fn greater_or_equal(engine: &Engine, args: &[Cell]) -> EvalResult {
    Ok(Cell::logic(compare(engine, arg(args, 0), arg(args, 1))?.is_ge()))
}

// Logic and control

fn not(_engine: &Engine, args: &[Cell]) -> EvalResult {
    Ok(Cell::logic(!arg(args, 0).is_truthy()))
}

fn if_native(engine: &Engine, args: &[Cell]) -> EvalResult {
    if arg(args, 0).is_truthy() {
        engine.do_block(arg(args, 1))
    } else {
        Ok(Cell::VOID)
    }
}

fn either(engine: &Engine, args: &[Cell]) -> EvalResult {
    let branch = if arg(args, 0).is_truthy() { 1 } else { 2 };
    engine.do_block(arg(args, branch))
}

fn all(engine: &Engine, args: &[Cell]) -> EvalResult {
    let mut feed = Feed::new(engine.array_cells(arg(args, 0)));
    let mut last = Cell::logic(true);
    while !feed.at_end() {
        last = engine.eval_step(&mut feed)?;
        if !last.is_truthy() {
            return Ok(Cell::blank());
        }
    }
    Ok(last)
}

fn any(engine: &Engine, args: &[Cell]) -> EvalResult {
    let mut feed = Feed::new(engine.array_cells(arg(args, 0)));
    while !feed.at_end() {
        let value = engine.eval_step(&mut feed)?;
        if value.is_truthy() {
            return Ok(value);
        }
    }
    Ok(Cell::blank())
}

fn while_native(engine: &Engine, args: &[Cell]) -> EvalResult {
    let mut result = Cell::VOID;
    while engine.do_block(arg(args, 0))?.is_truthy() {
        result = engine.do_block(arg(args, 1))?;
    }
    Ok(result)
}

fn loop_native(engine: &Engine, args: &[Cell]) -> EvalResult {
    let count = arg(args, 0).as_integer().unwrap_or_default();
    let mut result = Cell::VOID;
    for _ in 0..count.max(0) {
        result = engine.do_block(arg(args, 1))?;
    }
    Ok(result)
}

fn do_native(engine: &Engine, args: &[Cell]) -> EvalResult {
    let value = arg(args, 0);
    match value.kind() {
        Kind::Block | Kind::Group => engine.do_block(value),
        Kind::Text => match engine.load(&engine.text_of(value), Some(engine.user)) {
            Ok(cells) => engine.do_cells(cells),
            Err(err) => engine.raise(err),
        },
        Kind::Error => match value.object_id() {
            Some(id) => Err(Signal::Error(id)),
            None => Ok(value),
        },
        _ => Ok(value),
    }
}

fn reduce(engine: &Engine, args: &[Cell]) -> EvalResult {
    let mut feed = Feed::new(engine.array_cells(arg(args, 0)));
    let mut out = Vec::with_capacity(feed.remaining());
    while !feed.at_end() {
        let value = engine.eval_step(&mut feed)?;
        if !value.is_void() {
            out.push(value);
        }
    }
    Ok(engine.make_array(Kind::Block, out))
}

fn quote(_engine: &Engine, args: &[Cell]) -> EvalResult {
    Ok(arg(args, 0))
}

// Functions and objects

/// Build an interpreted function from spec and body blocks.
pub(crate) fn make_function(engine: &Engine, spec: Cell, body: Cell) -> EvalResult {
    let parsed = match engine.parse_spec(&engine.array_cells(spec)) {
        Ok(parsed) => parsed,
        Err(err) => return engine.raise(err),
    };
    let body = engine.copy_array(body, true);
    let Some(body) = body.object_id() else {
        return engine.raise(errors::invalid_arg(Kind::Block));
    };
    let id = engine.alloc(Object::Action(ActionData {
        name: None,
        doc: parsed.doc,
        params: parsed.params,
        body: ActionBody::User { body },
        enfix: false,
    }));
    Ok(Cell::series(Kind::Action, id, 0))
}

fn func(engine: &Engine, args: &[Cell]) -> EvalResult {
    make_function(engine, arg(args, 0), arg(args, 1))
}

fn does(engine: &Engine, args: &[Cell]) -> EvalResult {
    let spec = engine.make_array(Kind::Block, Vec::new());
    make_function(engine, spec, arg(args, 0))
}

fn make(engine: &Engine, args: &[Cell]) -> EvalResult {
    let (target, spec) = (arg(args, 0), arg(args, 1));
    if target.kind() == Kind::Object {
        if spec.kind() != Kind::Block {
            return engine.raise(errors::bad_make(Kind::Object, spec.kind()));
        }
        return engine.make_object(engine.array_cells(spec), target.object_id());
    }
    let kind = target.as_datatype().unwrap_or(Kind::Void);
    match (kind, spec.kind()) {
        (Kind::Object, Kind::Block) => engine.make_object(engine.array_cells(spec), None),
        (Kind::Error, Kind::Text) => Ok(engine.make_error(errors::user(&engine.text_of(spec)))),
        (Kind::Block | Kind::Group, Kind::Integer) => Ok(engine.make_array(kind, Vec::new())),
        (Kind::Block | Kind::Group, k) if k.is_array() => {
            Ok(engine.make_array(kind, engine.array_cells(spec)))
        }
        (Kind::Text, Kind::Integer) => Ok(engine.make_text(String::new())),
        (Kind::Text, _) => Ok(engine.make_text(engine.form(spec))),
        (Kind::Action, Kind::Block) => {
            let parts = engine.array_cells(spec);
            match parts.as_slice() {
                [spec, body] if spec.kind() == Kind::Block && body.kind() == Kind::Block => {
                    make_function(engine, *spec, *body)
                }
                _ => engine.raise(errors::bad_make(kind, Kind::Block)),
            }
        }
        (kind, spec_kind) => engine.raise(errors::bad_make(kind, spec_kind)),
    }
}

fn context(engine: &Engine, args: &[Cell]) -> EvalResult {
    engine.make_object(engine.array_cells(arg(args, 0)), None)
}

fn return_native(_engine: &Engine, args: &[Cell]) -> EvalResult {
    Err(Signal::Return(arg(args, 0)))
}

// Series

fn copy(engine: &Engine, args: &[Cell]) -> EvalResult {
    Ok(engine.copy_value(arg(args, 0), arg(args, 1).is_truthy()))
}

fn length_of(engine: &Engine, args: &[Cell]) -> EvalResult {
    let len = engine.series_len(arg(args, 0)).unwrap_or_default();
    Ok(Cell::integer(i64::try_from(len).unwrap_or(i64::MAX)))
}

fn first(engine: &Engine, args: &[Cell]) -> EvalResult {
    Ok(engine.pick(arg(args, 0), 1))
}

fn last(engine: &Engine, args: &[Cell]) -> EvalResult {
    let series = arg(args, 0);
    let len = engine.series_len(series).unwrap_or_default();
    Ok(engine.pick(series, i64::try_from(len).unwrap_or(i64::MAX)))
}

fn pick(engine: &Engine, args: &[Cell]) -> EvalResult {
    let index = arg(args, 1).as_integer().unwrap_or_default();
    Ok(engine.pick(arg(args, 0), index))
}

fn append(engine: &Engine, args: &[Cell]) -> EvalResult {
    let (series, value, only) = (arg(args, 0), arg(args, 1), arg(args, 2).is_truthy());
    let Some(id) = series.object_id() else {
        return engine.raise(errors::invalid_arg(series.kind()));
    };
    if series.kind() == Kind::Text {
        let text = engine.form(value);
        if let Some(target) = engine.heap.borrow_mut().text_mut(id) {
            target.push_str(&text);
        }
        return Ok(series);
    }
    let spliced = if value.kind().is_array() && value.kind() != Kind::Path && !only {
        engine.array_cells(value)
    } else {
        vec![value]
    };
    if let Some(target) = engine.heap.borrow_mut().array_mut(id) {
        target.extend(spliced);
    }
    Ok(series)
}

// Values

fn type_of(_engine: &Engine, args: &[Cell]) -> EvalResult {
    Ok(Cell::datatype(arg(args, 0).kind()))
}

fn form(engine: &Engine, args: &[Cell]) -> EvalResult {
    Ok(engine.make_text(engine.form(arg(args, 0))))
}

fn mold(engine: &Engine, args: &[Cell]) -> EvalResult {
    Ok(engine.make_text(engine.mold(arg(args, 0))))
}

fn print(engine: &Engine, args: &[Cell]) -> EvalResult {
    let value = arg(args, 0);
    let shown = if value.kind() == Kind::Block {
        reduce(engine, args)?
    } else {
        value
    };
    engine.println(&engine.form(shown));
    Ok(Cell::VOID)
}

// Errors and non-local exits

fn fail(engine: &Engine, args: &[Cell]) -> EvalResult {
    let reason = arg(args, 0);
    match (reason.kind(), reason.object_id()) {
        (Kind::Error, Some(id)) => Err(Signal::Error(id)),
        _ => engine.raise(errors::user(&engine.form(reason))),
    }
}

fn try_native(engine: &Engine, args: &[Cell]) -> EvalResult {
    match engine.do_block(arg(args, 0)) {
        Err(Signal::Error(id)) => Ok(Cell::series(Kind::Error, id, 0)),
        other => other,
    }
}

fn throw(_engine: &Engine, args: &[Cell]) -> EvalResult {
    let name = if arg(args, 1).is_truthy() {
        arg(args, 2)
    } else {
        Cell::VOID
    };
    Err(Signal::Throw {
        value: arg(args, 0),
        name,
    })
}

fn catch(engine: &Engine, args: &[Cell]) -> EvalResult {
    let named = arg(args, 1).is_truthy();
    let wanted = arg(args, 2);
    match engine.do_block(arg(args, 0)) {
        Err(Signal::Throw { value, name }) => {
            let caught = if named {
                let names = if wanted.kind() == Kind::Block {
                    engine.array_cells(wanted)
                } else {
                    vec![wanted]
                };
                !name.is_void() && names.iter().any(|n| n.symbol() == name.symbol())
            } else {
                name.is_void()
            };
            if caught {
                Ok(value)
            } else {
                Err(Signal::Throw { value, name })
            }
        }
        other => other,
    }
}

fn quit(_engine: &Engine, args: &[Cell]) -> EvalResult {
    let code = if arg(args, 0).is_truthy() {
        arg(args, 1).as_integer().unwrap_or_default()
    } else {
        0
    };
    Err(Signal::Quit(code))
}

fn halt(_engine: &Engine, _args: &[Cell]) -> EvalResult {
    Err(Signal::Halt)
}
