//! The engine: heap, symbols, system contexts and output.
//!
//! All state sits behind `RefCell`s and every method takes `&self`, so an
//! extension dispatcher can call back into the same engine while an
//! evaluation is in flight. No borrow is ever held across a native call.

use std::cell::{Cell as Counter, RefCell};

use ren_cell::{Cell, EngineHandle, Kind, ObjectId};

use crate::config::{EngineConfig, OutputSink};
use crate::errors::{self, ErrorData};
use crate::eval::{EvalResult, Signal};
use crate::heap::{ActionData, ContextData, Heap, Object};
use crate::natives;
use crate::symbols::{Symbol, SymbolTable};

pub struct Engine {
    handle: EngineHandle,
    pub(crate) heap: RefCell<Heap>,
    pub(crate) symbols: RefCell<SymbolTable>,
    output: RefCell<OutputSink>,
    pub(crate) max_call_depth: usize,
    recycle_threshold: usize,
    /// Natives and system words.
    pub(crate) lib: ObjectId,
    /// Default context for host code.
    pub(crate) user: ObjectId,
    /// Nested action invocations.
    pub(crate) depth: Counter<usize>,
    /// Nested construct-or-apply requests; zero means quiescent.
    pub(crate) nesting: Counter<usize>,
}

impl Engine {
    pub fn new(handle: EngineHandle, config: EngineConfig) -> Engine {
        let mut heap = Heap::new();
        let lib = heap.alloc(Object::Context(ContextData::new()));
        let user = heap.alloc(Object::Context(ContextData::new()));
        let engine = Engine {
            handle,
            heap: RefCell::new(heap),
            symbols: RefCell::new(SymbolTable::new()),
            output: RefCell::new(config.output),
            max_call_depth: config.max_call_depth,
            recycle_threshold: config.recycle_threshold,
            lib,
            user,
            depth: Counter::new(0),
            nesting: Counter::new(0),
        };
        natives::install(&engine);
        engine
    }

    pub fn handle(&self) -> EngineHandle {
        self.handle
    }

    pub fn set_output(&self, sink: OutputSink) {
        *self.output.borrow_mut() = sink;
    }

    pub(crate) fn println(&self, text: &str) {
        let sink = self.output.borrow().clone();
        sink.println(text);
    }

    // Symbols

    pub fn intern(&self, spelling: &str) -> Symbol {
        self.symbols.borrow_mut().intern(spelling)
    }

    pub fn spelling(&self, sym: Symbol) -> String {
        self.symbols.borrow().spelling(sym).to_string()
    }

    /// Spelling of a word-class cell.
    pub(crate) fn word_spelling(&self, word: Cell) -> String {
        word.symbol()
            .map_or_else(|| "?".to_string(), |sym| self.spelling(Symbol(sym)))
    }

    // Allocation

    pub(crate) fn alloc(&self, object: Object) -> ObjectId {
        self.heap.borrow_mut().alloc(object)
    }

    pub fn make_text(&self, text: impl Into<String>) -> Cell {
        let id = self.alloc(Object::Text(text.into()));
        Cell::series(Kind::Text, id, 0)
    }

    pub fn make_array(&self, kind: Kind, cells: Vec<Cell>) -> Cell {
        let id = self.alloc(Object::Array(cells));
        Cell::series(kind, id, 0)
    }

    pub fn make_error(&self, data: ErrorData) -> Cell {
        let id = self.alloc(Object::Error(data));
        Cell::series(Kind::Error, id, 0)
    }

    /// Allocate `data` and raise it.
    pub(crate) fn raise<T>(&self, data: ErrorData) -> EvalResult<T> {
        let id = self.alloc(Object::Error(data));
        Err(Signal::Error(id))
    }

    // Access

    /// Cells of an array value from its position on (empty if stale).
    pub(crate) fn array_cells(&self, array: Cell) -> Vec<Cell> {
        let heap = self.heap.borrow();
        let start = array.index() as usize;
        array
            .object_id()
            .and_then(|id| heap.array(id))
            .map(|cells| cells.get(start..).unwrap_or_default().to_vec())
            .unwrap_or_default()
    }

    /// Text of a text value from its position on (empty if stale).
    pub(crate) fn text_of(&self, text: Cell) -> String {
        let heap = self.heap.borrow();
        text.object_id()
            .and_then(|id| heap.text(id))
            .map(|s| s.chars().skip(text.index() as usize).collect())
            .unwrap_or_default()
    }

    pub(crate) fn action_data(&self, action: Cell) -> Option<ActionData> {
        let id = action.object_id()?;
        self.heap.borrow().action(id).cloned()
    }

    pub(crate) fn error_data(&self, error: Cell) -> Option<ErrorData> {
        let id = error.object_id()?;
        self.heap.borrow().error(id).cloned()
    }

    pub(crate) fn is_enfix(&self, action: Cell) -> bool {
        let heap = self.heap.borrow();
        action
            .object_id()
            .and_then(|id| heap.action(id))
            .is_some_and(|a| a.enfix)
    }

    /// Number of elements from the value's position on.
    pub fn series_len(&self, series: Cell) -> Option<usize> {
        let heap = self.heap.borrow();
        let id = series.object_id()?;
        let start = series.index() as usize;
        let len = match heap.get(id)? {
            Object::Array(cells) if series.kind().is_array() => cells.len(),
            Object::Text(text) => text.chars().count(),
            Object::Context(ctx) => return Some(ctx.len()),
            _ => return None,
        };
        Some(len.saturating_sub(start))
    }

    /// Element `index` (zero-based, relative to the value's position).
    pub fn series_at(&self, series: Cell, index: usize) -> Option<Cell> {
        let heap = self.heap.borrow();
        let id = series.object_id()?;
        let at = (series.index() as usize).checked_add(index)?;
        match heap.get(id)? {
            Object::Array(cells) if series.kind().is_array() => cells.get(at).copied(),
            Object::Text(text) => text.chars().nth(at).map(Cell::char),
            _ => None,
        }
    }

    // Variables

    pub(crate) fn get_var(&self, word: Cell) -> EvalResult {
        let found = {
            let heap = self.heap.borrow();
            match (word.binding(), word.symbol()) {
                (Some(ctx), Some(sym)) => heap.context(ctx).and_then(|c| c.get(Symbol(sym))),
                _ => None,
            }
        };
        match found {
            Some(value) => Ok(value),
            None => self.raise(errors::not_bound(&self.word_spelling(word))),
        }
    }

    /// Lookup without raising; `None` if unbound.
    pub(crate) fn peek_var(&self, word: Cell) -> Option<Cell> {
        let heap = self.heap.borrow();
        let ctx = heap.context(word.binding()?)?;
        ctx.get(Symbol(word.symbol()?))
    }

    pub(crate) fn set_var(&self, word: Cell, value: Cell) -> EvalResult<()> {
        let stored = {
            let mut heap = self.heap.borrow_mut();
            match (word.binding(), word.symbol()) {
                (Some(ctx), Some(sym)) => heap
                    .context_mut(ctx)
                    .is_some_and(|c| c.set(Symbol(sym), value)),
                _ => false,
            }
        };
        if stored {
            Ok(())
        } else {
            self.raise(errors::not_bound(&self.word_spelling(word)))
        }
    }

    pub(crate) fn define_lib(&self, name: &str, value: Cell) {
        let sym = self.intern(name);
        if let Some(ctx) = self.heap.borrow_mut().context_mut(self.lib) {
            ctx.define(sym, value);
        }
    }

    /// System context by name (`lib` or `user`).
    pub fn find_context(&self, name: &str) -> Option<Cell> {
        let id = match name {
            "lib" => self.lib,
            "user" => self.user,
            _ => return None,
        };
        Some(Cell::series(Kind::Object, id, 0))
    }

    /// Field of an object value.
    pub fn object_get(&self, object: Cell, field: &str) -> Option<Cell> {
        let sym = self.symbols.borrow().find(field)?;
        let heap = self.heap.borrow();
        heap.context(object.object_id()?)?.get(sym)
    }

    // Roots

    /// Add a host root for a series or a bound word. Scalars are ignored.
    pub fn root_cell(&self, cell: Cell) -> bool {
        match cell.root_target() {
            Some(id) => self.heap.borrow_mut().root(id),
            None => true,
        }
    }

    /// Drop a host root. `false` if the cell held none.
    pub fn release_cell(&self, cell: Cell) -> bool {
        match cell.root_target() {
            Some(id) => self.heap.borrow_mut().unroot(id).is_some(),
            None => true,
        }
    }

    pub fn root_count(&self, cell: Cell) -> u32 {
        cell.root_target()
            .map_or(0, |id| self.heap.borrow().root_count(id))
    }

    pub fn total_roots(&self) -> u64 {
        self.heap.borrow().total_roots()
    }

    pub fn live_objects(&self) -> usize {
        self.heap.borrow().live_count()
    }

    // Collection

    /// Collect garbage. A no-op while an evaluation is in flight.
    pub fn recycle(&self) -> usize {
        if self.nesting.get() > 0 {
            tracing::trace!("recycle skipped during evaluation");
            return 0;
        }
        let sweep = self.heap.borrow_mut().recycle(&[self.lib, self.user]);
        tracing::debug!(freed = sweep.freed, natives = sweep.deleters.len(), "recycled");
        for (deleter, data) in sweep.deleters {
            deleter(data.0);
        }
        sweep.freed
    }

    /// Collect if enough has been allocated since the last collection.
    pub(crate) fn maybe_recycle(&self) {
        let due = self.recycle_threshold > 0
            && self.heap.borrow().allocations_since_recycle() >= self.recycle_threshold;
        if due {
            self.recycle();
        }
    }
}

impl Drop for Engine {
    fn drop(&mut self) {
        let deleters = self.heap.get_mut().drain_deleters();
        tracing::debug!(natives = deleters.len(), "engine dropped");
        for (deleter, data) in deleters {
            deleter(data.0);
        }
    }
}
