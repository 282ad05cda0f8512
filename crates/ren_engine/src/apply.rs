//! Construct-or-apply: the one entry point for running host requests.

use ren_cell::{Cell, Kind, ObjectId, ResultCode};

use crate::aggregate::Loadable;
use crate::engine::Engine;
use crate::errors::{self, ErrorData};
use crate::eval::{clear_cancel, Feed, Signal};
use crate::natives::make_function;

/// A host request.
#[derive(Debug, Default)]
pub struct Request<'a> {
    /// Object whose context receives newly scanned words.
    pub context: Option<Cell>,
    pub applicand: Option<Cell>,
    pub loadables: &'a [Loadable<'a>],
    pub construct: Option<Kind>,
    pub apply: bool,
    /// Pass aggregate elements to an action without evaluating them.
    pub only: bool,
}

/// Results of a successful request. Series-class cells here carry one host
/// root each.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Outcome {
    pub constructed: Option<Cell>,
    pub applied: Option<Cell>,
}

/// Why a request failed. Error and thrown cells carry one host root each.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Failure {
    Load(Cell),
    Construct(Cell),
    Apply(Cell),
    Evaluation(Cell),
    Thrown { value: Cell, name: Cell },
    Cancelled,
    ExitRequested(i64),
}

impl Failure {
    pub fn code(&self) -> ResultCode {
        match self {
            Failure::Load(_) => ResultCode::LoadError,
            Failure::Construct(_) => ResultCode::ConstructError,
            Failure::Apply(_) => ResultCode::ApplyError,
            Failure::Evaluation(_) => ResultCode::EvaluationError,
            Failure::Thrown { .. } => ResultCode::Thrown,
            Failure::Cancelled => ResultCode::Cancelled,
            Failure::ExitRequested(_) => ResultCode::ExitRequested,
        }
    }

    /// Cell reported in the error slot.
    pub fn cell(&self) -> Cell {
        match *self {
            Failure::Load(cell)
            | Failure::Construct(cell)
            | Failure::Apply(cell)
            | Failure::Evaluation(cell) => cell,
            Failure::Thrown { value, .. } => value,
            Failure::Cancelled => Cell::VOID,
            Failure::ExitRequested(code) => Cell::integer(code),
        }
    }
}

impl Engine {
    pub fn construct_or_apply(&self, request: &Request<'_>) -> Result<Outcome, Failure> {
        let nesting = self.nesting.get();
        if nesting == 0 {
            clear_cancel();
        }
        self.nesting.set(nesting + 1);
        let mark = self.heap.borrow().guard_mark();

        let result = self.run_request(request);

        self.heap.borrow_mut().release_guards(mark);
        match &result {
            Ok(outcome) => {
                for cell in [outcome.constructed, outcome.applied].into_iter().flatten() {
                    self.root_cell(cell);
                }
            }
            Err(failure) => {
                self.root_cell(failure.cell());
                tracing::debug!(code = %failure.code(), "request failed");
            }
        }
        self.nesting.set(nesting);
        if nesting == 0 {
            self.maybe_recycle();
        }
        result
    }

    fn run_request(&self, request: &Request<'_>) -> Result<Outcome, Failure> {
        let context = match request.context {
            None => None,
            Some(cell) if cell.kind() == Kind::Object => cell.object_id(),
            Some(cell) => return Err(self.usage(errors::bad_context(cell.kind()))),
        };
        let cells = self
            .aggregate(request.loadables, context)
            .map_err(|err| Failure::Load(self.make_error(err)))?;
        {
            let mut heap = self.heap.borrow_mut();
            for cell in &cells {
                heap.guard(*cell);
            }
        }
        tracing::trace!(elements = cells.len(), "aggregated");

        let mut outcome = Outcome::default();
        if let Some(kind) = request.construct {
            let constructed = self.construct(kind, &cells)?;
            self.heap.borrow_mut().guard(constructed);
            outcome.constructed = Some(constructed);
        }
        if request.apply {
            outcome.applied = Some(self.apply_aggregate(request.applicand, cells, request.only)?);
        }
        Ok(outcome)
    }

    fn usage(&self, data: ErrorData) -> Failure {
        Failure::Apply(self.make_error(data))
    }

    fn failure(&self, signal: Signal) -> Failure {
        match signal {
            Signal::Error(id) => Failure::Evaluation(Cell::series(Kind::Error, id, 0)),
            Signal::Throw { value, name } => Failure::Thrown { value, name },
            Signal::Return(_) => {
                Failure::Evaluation(self.make_error(errors::return_outside_function()))
            }
            Signal::Halt => Failure::Cancelled,
            Signal::Quit(code) => Failure::ExitRequested(code),
        }
    }

    /// Array kinds take the whole aggregate; `object!`, `error!` and
    /// `action!` are made from their spec; other kinds need exactly one
    /// element of that kind.
    fn construct(&self, kind: Kind, cells: &[Cell]) -> Result<Cell, Failure> {
        if kind.is_array() {
            return Ok(self.make_array(kind, cells.to_vec()));
        }
        let mismatch = |actual: Option<Kind>| {
            Failure::Construct(self.make_error(errors::construct_mismatch(
                kind,
                cells.len(),
                actual,
            )))
        };
        match (kind, cells) {
            (_, [one]) if one.kind() == kind => Ok(one.with_newline_before(false)),
            (Kind::Void, []) => Ok(Cell::VOID),
            (Kind::Object, _) => self
                .make_object(cells.to_vec(), None)
                .map_err(|signal| self.failure(signal)),
            (Kind::Error, [message]) if message.kind() == Kind::Text => {
                Ok(self.make_error(errors::user(&self.text_of(*message))))
            }
            (Kind::Action, [spec, body])
                if spec.kind() == Kind::Block && body.kind() == Kind::Block =>
            {
                make_function(self, *spec, *body).map_err(|signal| self.failure(signal))
            }
            (_, [one]) => Err(mismatch(Some(one.kind()))),
            _ => Err(mismatch(None)),
        }
    }

    fn apply_aggregate(
        &self,
        applicand: Option<Cell>,
        cells: Vec<Cell>,
        only: bool,
    ) -> Result<Cell, Failure> {
        let Some(applicand) = applicand else {
            return self.do_cells(cells).map_err(|signal| self.failure(signal));
        };
        match applicand.kind() {
            Kind::Action => self.apply_action(applicand, cells, only),
            Kind::Object => match applicand.object_id() {
                Some(ctx) => self.run_in(self.make_array(Kind::Block, cells), ctx),
                None => Err(self.usage(errors::cannot_apply(Kind::Object))),
            },
            Kind::Error if cells.is_empty() => Err(Failure::Evaluation(applicand)),
            Kind::Error => Err(self.usage(errors::cannot_apply(Kind::Error))),
            _ => {
                let mut all = Vec::with_capacity(cells.len() + 1);
                all.push(applicand);
                all.extend(cells);
                let mut feed = Feed::new(all);
                let value = self
                    .eval_step(&mut feed)
                    .map_err(|signal| self.failure(signal))?;
                if feed.at_end() {
                    Ok(value)
                } else {
                    Err(self.usage(errors::leftover_args(feed.remaining())))
                }
            }
        }
    }

    /// Copy `block`, bind it to the object's context, and run it.
    fn run_in(&self, block: Cell, ctx: ObjectId) -> Result<Cell, Failure> {
        let copy = self.copy_array(block, true);
        if let Some(id) = copy.object_id() {
            self.bind_deep(id, ctx);
        }
        self.do_block(copy).map_err(|signal| self.failure(signal))
    }

    fn apply_action(&self, action: Cell, cells: Vec<Cell>, only: bool) -> Result<Cell, Failure> {
        let Some(data) = self.action_data(action) else {
            return Err(self.usage(errors::cannot_apply(Kind::Action)));
        };
        let mut args = if only {
            cells
        } else {
            let mut feed = Feed::new(cells);
            let mut reduced = Vec::new();
            while !feed.at_end() {
                reduced.push(
                    self.eval_step(&mut feed)
                        .map_err(|signal| self.failure(signal))?,
                );
            }
            reduced
        };
        let required = data.required_arity();
        if args.len() > required {
            return Err(self.usage(errors::too_many_args(args.len(), required)));
        }
        if args.len() < required {
            return Err(self.usage(errors::not_enough_args(args.len(), required)));
        }
        let label = self.action_label(&data);
        for (param, arg) in data.params.iter().zip(&args) {
            self.check_arg(&label, param, *arg)
                .map_err(|signal| self.failure(signal))?;
        }
        args.resize(data.slot_count(), Cell::blank());
        self.invoke(action, &data, &args)
            .map_err(|signal| self.failure(signal))
    }
}

#[cfg(test)]
mod tests;
