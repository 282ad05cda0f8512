//! Binding and copying.
//!
//! Words find their variables through the context id in their binding slot.
//! Three binding passes exist:
//! - load binding: newly scanned words join a target context (`bind_loaded`)
//! - deep rebinding: words whose key exists in a context are retargeted to it
//!   (function frames, objects, apply to an object)
//! - none: pre-built values keep whatever binding they had

use ren_cell::{Cell, Kind, ObjectId};

use crate::engine::Engine;
use crate::eval::EvalResult;
use crate::heap::{ContextData, Object};
use crate::symbols::Symbol;

impl Engine {
    /// Binding for a freshly scanned word.
    ///
    /// Set-words add a key to `ctx`. Other words bind to `ctx` if it has the
    /// key, else to `lib` if `lib` has it, else a new key is added to `ctx`.
    pub(crate) fn bind_loaded(&self, kind: Kind, sym: Symbol, ctx: ObjectId) -> Option<ObjectId> {
        if kind == Kind::Refinement {
            return None;
        }
        let mut heap = self.heap.borrow_mut();
        if kind != Kind::SetWord {
            if heap.context(ctx)?.find(sym).is_some() {
                return Some(ctx);
            }
            if ctx != self.lib && heap.context(self.lib).and_then(|l| l.find(sym)).is_some() {
                return Some(self.lib);
            }
        }
        heap.context_mut(ctx)?.ensure(sym);
        Some(ctx)
    }

    /// Retarget every word under `array` whose key exists in `ctx`.
    pub(crate) fn bind_deep(&self, array: ObjectId, ctx: ObjectId) {
        let mut heap = self.heap.borrow_mut();
        let Some(keys) = heap.context(ctx).map(|c| c.keys().to_vec()) else {
            return;
        };
        let mut pending = vec![array];
        let mut seen = Vec::new();
        while let Some(id) = pending.pop() {
            if seen.contains(&id) {
                continue;
            }
            seen.push(id);
            let Some(cells) = heap.array_mut(id) else {
                continue;
            };
            for cell in cells.iter_mut() {
                let kind = cell.kind();
                if kind.is_word() {
                    if cell.symbol().is_some_and(|s| keys.contains(&Symbol(s))) {
                        *cell = cell.with_binding(Some(ctx));
                    }
                } else if kind.is_array() {
                    if let Some(child) = cell.object_id() {
                        pending.push(child);
                    }
                }
            }
        }
    }

    /// Copy an array value from its position on; `deep` copies nested
    /// arrays and texts too.
    pub(crate) fn copy_array(&self, array: Cell, deep: bool) -> Cell {
        let cells = self.array_cells(array);
        let copied = if deep {
            cells.into_iter().map(|c| self.copy_nested(c)).collect()
        } else {
            cells
        };
        self.make_array(array.kind(), copied)
    }

    fn copy_nested(&self, cell: Cell) -> Cell {
        match cell.kind() {
            k if k.is_array() => self.copy_array(cell, true),
            Kind::Text => self.make_text(self.text_of(cell)),
            _ => cell,
        }
    }

    /// Copy any value; series get fresh storage, other values are returned.
    pub(crate) fn copy_value(&self, value: Cell, deep: bool) -> Cell {
        match value.kind() {
            k if k.is_array() => self.copy_array(value, deep),
            Kind::Text => self.make_text(self.text_of(value)),
            Kind::Object => {
                let data = value
                    .object_id()
                    .and_then(|id| self.heap.borrow().context(id).cloned());
                match data {
                    Some(ctx) => {
                        let id = self.alloc(Object::Context(ctx));
                        Cell::series(Kind::Object, id, 0)
                    }
                    None => value,
                }
            }
            _ => value,
        }
    }

    /// Build an object: collect top-level set-words as fields (on top of
    /// `parent`'s), bind a copy of the body to it, and run the body.
    pub(crate) fn make_object(&self, body: Vec<Cell>, parent: Option<ObjectId>) -> EvalResult {
        let mut data = parent
            .and_then(|id| self.heap.borrow().context(id).cloned())
            .unwrap_or_else(ContextData::new);
        for cell in &body {
            if cell.kind() == Kind::SetWord {
                if let Some(sym) = cell.symbol() {
                    data.ensure(Symbol(sym));
                }
            }
        }
        let ctx = self.alloc(Object::Context(data));
        let source = self.make_array(Kind::Block, body);
        let copy = self.copy_array(source, true);
        if let Some(copy_id) = copy.object_id() {
            self.bind_deep(copy_id, ctx);
        }
        self.do_cells(self.array_cells(copy))?;
        Ok(Cell::series(Kind::Object, ctx, 0))
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use ren_cell::{Cell, EngineHandle, Kind};

    use crate::config::EngineConfig;
    use crate::engine::Engine;
    use crate::symbols::Symbol;

    fn engine() -> Engine {
        Engine::new(EngineHandle(1), EngineConfig::new())
    }

    #[test]
    fn loaded_words_prefer_context_then_lib() {
        let engine = engine();
        let user = engine.user;
        let append = engine.intern("append");
        let fresh = engine.intern("fresh-word");
        assert_eq!(engine.bind_loaded(Kind::Word, append, user), Some(engine.lib));
        assert_eq!(engine.bind_loaded(Kind::Word, fresh, user), Some(user));
        assert_eq!(engine.bind_loaded(Kind::SetWord, append, user), Some(user));
        assert_eq!(engine.bind_loaded(Kind::Word, append, user), Some(user));
        assert_eq!(engine.bind_loaded(Kind::Refinement, fresh, user), None);
    }

    #[test]
    fn bind_deep_only_retargets_existing_keys() {
        let engine = engine();
        let a = engine.intern("a");
        let b = engine.intern("b");
        let mut data = crate::heap::ContextData::new();
        data.define(a, Cell::integer(1));
        let ctx = engine.alloc(crate::heap::Object::Context(data));
        let inner = engine.make_array(Kind::Group, vec![Cell::word(Kind::Word, a.0)]);
        let outer = engine.make_array(
            Kind::Block,
            vec![Cell::word(Kind::Word, b.0), inner],
        );
        let Some(outer_id) = outer.object_id() else {
            panic!("block without id");
        };
        engine.bind_deep(outer_id, ctx);
        let cells = engine.array_cells(outer);
        assert_eq!(cells[0].binding(), None);
        let nested = engine.array_cells(cells[1]);
        assert_eq!(nested[0].binding(), Some(ctx));
        assert_eq!(engine.peek_var(nested[0]), Some(Cell::integer(1)));
        assert_eq!(Symbol(nested[0].symbol().unwrap_or_default()), a);
    }

    #[test]
    fn deep_copy_detaches_nested_arrays() {
        let engine = engine();
        let inner = engine.make_array(Kind::Block, vec![Cell::integer(1)]);
        let outer = engine.make_array(Kind::Block, vec![inner]);
        let shallow = engine.copy_array(outer, false);
        let deep = engine.copy_array(outer, true);
        assert!(engine.array_cells(shallow)[0].same_as(&inner));
        assert!(!engine.array_cells(deep)[0].same_as(&inner));
        assert_eq!(
            engine.array_cells(engine.array_cells(deep)[0]),
            vec![Cell::integer(1)]
        );
    }
}
