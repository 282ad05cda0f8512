//! The DO evaluator.
//!
//! Evaluation walks a [`Feed`] of cells one expression at a time:
//! - words look up their variable; actions gather arguments from the feed
//! - enfix actions take the value to their left, strictly left to right
//!   (`1 + 2 * 3` is 9)
//! - set-words assign the next expression, get-words fetch without calling,
//!   lit-words evaluate to words
//! - groups evaluate their contents, paths select or pass refinements
//! - everything else evaluates to itself
//!
//! Non-local exits travel as [`Signal`]s in the error channel.

use std::sync::atomic::{AtomicBool, Ordering};

use ren_cell::{Cell, Kind, NativeStatus, ObjectId, RawFrame};
use smallvec::SmallVec;

use crate::engine::Engine;
use crate::errors;
use crate::heap::{ActionBody, ActionData, ContextData, Object, Param, ParamClass};
use crate::stack::ensure_sufficient_stack;
use crate::symbols::Symbol;

/// Non-local exit from an evaluation.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Signal {
    /// An error value was raised.
    Error(ObjectId),
    /// `throw`; `name` is a word or void.
    Throw { value: Cell, name: Cell },
    /// `return` from the innermost function.
    Return(Cell),
    /// Evaluation was cancelled.
    Halt,
    /// `quit` with an exit code.
    Quit(i64),
}

pub type EvalResult<T = Cell> = Result<T, Signal>;

static CANCEL: AtomicBool = AtomicBool::new(false);

/// Ask the running evaluation to halt at its next step.
pub fn request_cancel() {
    CANCEL.store(true, Ordering::SeqCst);
}

pub(crate) fn clear_cancel() {
    CANCEL.store(false, Ordering::SeqCst);
}

fn poll_cancel() -> EvalResult<()> {
    if CANCEL.swap(false, Ordering::SeqCst) {
        tracing::debug!("evaluation halted by cancel request");
        return Err(Signal::Halt);
    }
    Ok(())
}

/// Cursor over a snapshot of cells.
pub(crate) struct Feed {
    cells: Vec<Cell>,
    pos: usize,
}

impl Feed {
    pub(crate) fn new(cells: Vec<Cell>) -> Self {
        Feed { cells, pos: 0 }
    }

    pub(crate) fn at_end(&self) -> bool {
        self.pos >= self.cells.len()
    }

    fn peek(&self) -> Option<Cell> {
        self.cells.get(self.pos).copied()
    }

    fn next(&mut self) -> Option<Cell> {
        let cell = self.peek()?;
        self.pos += 1;
        Some(cell)
    }

    pub(crate) fn remaining(&self) -> usize {
        self.cells.len().saturating_sub(self.pos)
    }
}

impl Engine {
    /// Evaluate every expression; the last value is the result.
    pub(crate) fn do_cells(&self, cells: Vec<Cell>) -> EvalResult {
        let mut feed = Feed::new(cells);
        let mut result = Cell::VOID;
        while !feed.at_end() {
            result = self.eval_step(&mut feed)?;
        }
        Ok(result)
    }

    pub(crate) fn do_block(&self, block: Cell) -> EvalResult {
        self.do_cells(self.array_cells(block))
    }

    /// One full expression, including any enfix continuation.
    pub(crate) fn eval_step(&self, feed: &mut Feed) -> EvalResult {
        let mut value = self.eval_term(feed)?;
        while let Some(action) = self.enfix_next(feed) {
            feed.next();
            value = self.gather(feed, action, Some(value), &[])?;
        }
        Ok(value)
    }

    fn enfix_next(&self, feed: &Feed) -> Option<Cell> {
        let word = feed.peek().filter(|c| c.kind() == Kind::Word)?;
        let value = self.peek_var(word)?;
        (value.kind() == Kind::Action && self.is_enfix(value)).then_some(value)
    }

    /// One expression without enfix continuation.
    fn eval_term(&self, feed: &mut Feed) -> EvalResult {
        poll_cancel()?;
        let Some(cell) = feed.next() else {
            return Ok(Cell::VOID);
        };
        match cell.kind() {
            Kind::Word => {
                let value = self.get_var(cell)?;
                match value.kind() {
                    Kind::Action if self.is_enfix(value) => {
                        self.raise(errors::no_left_arg(&self.word_spelling(cell)))
                    }
                    Kind::Action => self.gather(feed, value, None, &[]),
                    Kind::Void => self.raise(errors::no_value(&self.word_spelling(cell))),
                    _ => Ok(value),
                }
            }
            Kind::SetWord => {
                if feed.at_end() {
                    return self.raise(errors::need_value(&self.word_spelling(cell)));
                }
                let value = self.eval_step(feed)?;
                self.set_var(cell, value)?;
                Ok(value)
            }
            Kind::GetWord => self.get_var(cell),
            Kind::LitWord => Ok(cell.with_kind(Kind::Word).with_newline_before(false)),
            Kind::Group => self.do_block(cell),
            Kind::Path => self.eval_path(feed, cell),
            Kind::Action => self.gather(feed, cell, None, &[]),
            _ => Ok(cell.with_newline_before(false)),
        }
    }

    fn eval_path(&self, feed: &mut Feed, path: Cell) -> EvalResult {
        let parts = self.array_cells(path);
        let Some((&head, rest)) = parts.split_first() else {
            return Ok(Cell::VOID);
        };
        let mut value = match head.kind() {
            Kind::Word => self.get_var(head)?,
            _ => head,
        };
        if value.kind() == Kind::Action {
            let mut refinements: SmallVec<[Symbol; 4]> = SmallVec::new();
            for part in rest {
                match part.symbol() {
                    Some(sym) if part.kind() == Kind::Word => refinements.push(Symbol(sym)),
                    _ => return self.raise(errors::bad_path(&self.mold(*part))),
                }
            }
            return self.gather(feed, value, None, &refinements);
        }
        for &part in rest {
            value = self.select(value, part)?;
        }
        if value.kind() == Kind::Action {
            return self.gather(feed, value, None, &[]);
        }
        Ok(value)
    }

    fn select(&self, value: Cell, part: Cell) -> EvalResult {
        match (value.kind(), part.kind()) {
            (Kind::Object, Kind::Word) => {
                let spelling = self.word_spelling(part);
                match self.object_get(value, &spelling) {
                    Some(field) => Ok(field),
                    None => self.raise(errors::no_field(&spelling)),
                }
            }
            (kind, Kind::Integer) if kind.is_array() || kind == Kind::Text => {
                let n = part.as_integer().unwrap_or_default();
                Ok(self.pick(value, n))
            }
            _ => self.raise(errors::bad_path(&self.mold(part))),
        }
    }

    /// One-based pick; blank when out of range.
    pub(crate) fn pick(&self, series: Cell, n: i64) -> Cell {
        usize::try_from(n)
            .ok()
            .and_then(|n| n.checked_sub(1))
            .and_then(|i| self.series_at(series, i))
            .unwrap_or_else(Cell::blank)
    }

    /// Gather arguments for `action` from the feed and invoke it.
    pub(crate) fn gather(
        &self,
        feed: &mut Feed,
        action: Cell,
        mut left: Option<Cell>,
        refinements: &[Symbol],
    ) -> EvalResult {
        let Some(data) = self.action_data(action) else {
            return self.raise(errors::invalid_arg(Kind::Action));
        };
        let label = self.action_label(&data);
        for sym in refinements {
            let known = data
                .params
                .iter()
                .any(|p| p.class == ParamClass::Refinement && p.symbol == *sym);
            if !known {
                return self.raise(errors::bad_path(&self.spelling(*sym)));
            }
        }

        let mut args: SmallVec<[Cell; 8]> = SmallVec::with_capacity(data.params.len());
        let mut active = true;
        for param in &data.params {
            if param.class == ParamClass::Refinement {
                active = refinements.contains(&param.symbol);
                args.push(if active { Cell::logic(true) } else { Cell::blank() });
                continue;
            }
            if !active {
                args.push(Cell::blank());
                continue;
            }
            let arg = if let Some(value) = left.take() {
                value
            } else if feed.at_end() {
                return self.raise(errors::no_arg(&label, &self.spelling(param.symbol)));
            } else if param.class == ParamClass::Quoted {
                feed.next().unwrap_or_default()
            } else if data.enfix {
                self.eval_term(feed)?
            } else {
                self.eval_step(feed)?
            };
            self.check_arg(&label, param, arg)?;
            args.push(arg);
        }
        self.invoke(action, &data, &args)
    }

    pub(crate) fn action_label(&self, data: &ActionData) -> String {
        data.name
            .map_or_else(|| "action".to_string(), |sym| self.spelling(sym))
    }

    pub(crate) fn check_arg(&self, label: &str, param: &Param, arg: Cell) -> EvalResult<()> {
        if param.types.contains(arg.kind()) {
            return Ok(());
        }
        self.raise(errors::expect_arg(
            label,
            &self.spelling(param.symbol),
            arg.kind(),
        ))
    }

    /// Run an action with a complete argument frame.
    pub(crate) fn invoke(&self, action: Cell, data: &ActionData, args: &[Cell]) -> EvalResult {
        let depth = self.depth.get();
        if depth >= self.max_call_depth {
            return self.raise(errors::stack_overflow(self.max_call_depth));
        }
        self.depth.set(depth + 1);
        let result = ensure_sufficient_stack(|| match data.body {
            ActionBody::Native(native) => native(self, args),
            ActionBody::User { body } => self.call_user(data, body, args),
            ActionBody::Extern {
                dispatcher,
                user_data,
                ..
            } => {
                tracing::trace!(action = ?action, "extern dispatch");
                let mut out = Cell::VOID;
                let mut label = Cell::VOID;
                let mut frame = RawFrame {
                    engine: self.handle(),
                    args: args.as_ptr(),
                    argc: args.len(),
                    out: &mut out,
                    label: &mut label,
                };
                let status = dispatcher(&mut frame, user_data.0);
                poll_cancel()?;
                self.native_outcome(data, status, out, label)
            }
        });
        self.depth.set(depth);
        result
    }

    fn native_outcome(
        &self,
        data: &ActionData,
        status: NativeStatus,
        out: Cell,
        label: Cell,
    ) -> EvalResult {
        match status {
            NativeStatus::Return => Ok(out),
            NativeStatus::Error => match out.object_id() {
                Some(id) if out.kind() == Kind::Error => Err(Signal::Error(id)),
                _ => self.raise(errors::native_failed(&self.action_label(data))),
            },
            NativeStatus::Throw => Err(Signal::Throw { value: out, name: label }),
            NativeStatus::Halt => Err(Signal::Halt),
            NativeStatus::Quit => Err(Signal::Quit(out.as_integer().unwrap_or_default())),
        }
    }

    fn call_user(&self, data: &ActionData, body: ObjectId, args: &[Cell]) -> EvalResult {
        let mut frame = ContextData::new();
        for (param, arg) in data.params.iter().zip(args) {
            frame.define(param.symbol, *arg);
        }
        let frame = self.alloc(Object::Context(frame));
        let body = self.copy_array(Cell::series(Kind::Block, body, 0), true);
        if let Some(id) = body.object_id() {
            self.bind_deep(id, frame);
        }
        match self.do_block(body) {
            Err(Signal::Return(value)) => Ok(value),
            other => other,
        }
    }
}

#[cfg(test)]
mod tests;
