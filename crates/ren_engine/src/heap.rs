//! Arena heap with generational ids, host roots, and mark-and-sweep.
//!
//! Every series-class cell points at a slot here. A slot survives a
//! collection if it is reachable from:
//! - a host root (`root`/`unroot`, counted per slot)
//! - a temporary guard (cells pinned for the duration of one call)
//! - the extra roots the engine passes in (system contexts)
//!
//! Collection only runs at quiescent points, so cells held on the Rust stack
//! during evaluation never need guarding against a sweep.

use std::ffi::c_void;

use ren_cell::{Cell, NativeDeleter, NativeDispatcher, ObjectId};
use rustc_hash::FxHashMap;

use crate::natives::NativeFn;
use crate::symbols::Symbol;
use crate::typeset::TypeSet;

/// Variables of an object, `lib`, `user`, or a function frame.
#[derive(Clone, Debug, Default)]
pub struct ContextData {
    keys: Vec<Symbol>,
    vars: Vec<Cell>,
    index: FxHashMap<Symbol, usize>,
}

impl ContextData {
    pub fn new() -> Self {
        ContextData::default()
    }

    pub fn find(&self, sym: Symbol) -> Option<usize> {
        self.index.get(&sym).copied()
    }

    pub fn get(&self, sym: Symbol) -> Option<Cell> {
        self.find(sym).and_then(|i| self.vars.get(i).copied())
    }

    /// Set an existing variable. Returns `false` if the key is absent.
    pub fn set(&mut self, sym: Symbol, value: Cell) -> bool {
        match self.find(sym).and_then(|i| self.vars.get_mut(i)) {
            Some(slot) => {
                *slot = value;
                true
            }
            None => false,
        }
    }

    /// Add a key (void) if absent; returns its slot.
    pub fn ensure(&mut self, sym: Symbol) -> usize {
        if let Some(i) = self.find(sym) {
            return i;
        }
        self.keys.push(sym);
        self.vars.push(Cell::VOID);
        let i = self.keys.len() - 1;
        self.index.insert(sym, i);
        i
    }

    pub fn define(&mut self, sym: Symbol, value: Cell) {
        let i = self.ensure(sym);
        self.vars[i] = value;
    }

    pub fn keys(&self) -> &[Symbol] {
        &self.keys
    }

    pub fn vars(&self) -> &[Cell] {
        &self.vars
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}

/// How an argument is gathered at a call site.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ParamClass {
    /// Evaluated argument.
    Normal,
    /// Next cell taken literally (`'name` in a spec).
    Quoted,
    /// Optional flag; following normal params belong to it (`/name`).
    Refinement,
}

#[derive(Clone, Debug)]
pub struct Param {
    pub symbol: Symbol,
    pub class: ParamClass,
    pub types: TypeSet,
    pub doc: Option<String>,
}

/// Opaque host pointer carried by an extern native.
#[derive(Clone, Copy, Debug)]
pub struct UserData(pub *mut c_void);

// SAFETY: the engine never dereferences user data; it only hands the pointer
// back to the host dispatcher and deleter, which own its thread-safety.
#[allow(unsafe_code, reason = "opaque host pointer is moved, never dereferenced")]
unsafe impl Send for UserData {}

#[derive(Clone, Copy)]
pub enum ActionBody {
    Native(NativeFn),
    /// Interpreted function; body block is copied and bound per call.
    User { body: ObjectId },
    /// Host-implemented native reached through the C dispatcher.
    Extern {
        dispatcher: NativeDispatcher,
        user_data: UserData,
        deleter: Option<NativeDeleter>,
    },
}

#[derive(Clone)]
pub struct ActionData {
    pub name: Option<Symbol>,
    pub doc: Option<String>,
    pub params: Vec<Param>,
    pub body: ActionBody,
    /// Takes its first argument from the left (`1 + 2`).
    pub enfix: bool,
}

impl ActionData {
    /// Number of parameters gathered without refinements.
    pub fn required_arity(&self) -> usize {
        self.params
            .iter()
            .take_while(|p| p.class != ParamClass::Refinement)
            .count()
    }

    /// Number of argument slots, refinements included.
    pub fn slot_count(&self) -> usize {
        self.params.len()
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct ErrorData {
    /// Error id (`no-value`, `zero-divide`, `user`, ...).
    pub id: &'static str,
    pub message: String,
    /// Source text near the failure, if known.
    pub near: Option<String>,
}

pub enum Object {
    Array(Vec<Cell>),
    Text(String),
    Context(ContextData),
    Action(ActionData),
    Error(ErrorData),
}

struct Slot {
    object: Option<Object>,
    generation: u32,
    roots: u32,
    marked: bool,
}

/// Result of one collection.
pub struct Sweep {
    pub freed: usize,
    /// Deleters of reclaimed extern natives; run them after releasing any
    /// heap borrow, since they call back into host code.
    pub deleters: Vec<(NativeDeleter, UserData)>,
}

#[derive(Default)]
pub struct Heap {
    slots: Vec<Slot>,
    free: Vec<u32>,
    live: usize,
    guards: Vec<Cell>,
    since_recycle: usize,
}

impl Heap {
    pub fn new() -> Self {
        Heap::default()
    }

    pub fn alloc(&mut self, object: Object) -> ObjectId {
        self.live += 1;
        self.since_recycle += 1;
        if let Some(index) = self.free.pop() {
            let slot = &mut self.slots[index as usize];
            slot.object = Some(object);
            slot.roots = 0;
            slot.marked = false;
            return ObjectId {
                index,
                generation: slot.generation,
            };
        }
        let index = u32::try_from(self.slots.len()).unwrap_or(u32::MAX);
        self.slots.push(Slot {
            object: Some(object),
            generation: 1,
            roots: 0,
            marked: false,
        });
        ObjectId {
            index,
            generation: 1,
        }
    }

    fn slot(&self, id: ObjectId) -> Option<&Slot> {
        self.slots
            .get(id.index as usize)
            .filter(|s| s.generation == id.generation && s.object.is_some())
    }

    fn slot_mut(&mut self, id: ObjectId) -> Option<&mut Slot> {
        self.slots
            .get_mut(id.index as usize)
            .filter(|s| s.generation == id.generation && s.object.is_some())
    }

    pub fn is_live(&self, id: ObjectId) -> bool {
        self.slot(id).is_some()
    }

    pub fn get(&self, id: ObjectId) -> Option<&Object> {
        self.slot(id).and_then(|s| s.object.as_ref())
    }

    pub fn get_mut(&mut self, id: ObjectId) -> Option<&mut Object> {
        self.slot_mut(id).and_then(|s| s.object.as_mut())
    }

    pub fn array(&self, id: ObjectId) -> Option<&Vec<Cell>> {
        match self.get(id)? {
            Object::Array(cells) => Some(cells),
            _ => None,
        }
    }

    pub fn array_mut(&mut self, id: ObjectId) -> Option<&mut Vec<Cell>> {
        match self.get_mut(id)? {
            Object::Array(cells) => Some(cells),
            _ => None,
        }
    }

    pub fn text(&self, id: ObjectId) -> Option<&String> {
        match self.get(id)? {
            Object::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn text_mut(&mut self, id: ObjectId) -> Option<&mut String> {
        match self.get_mut(id)? {
            Object::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn context(&self, id: ObjectId) -> Option<&ContextData> {
        match self.get(id)? {
            Object::Context(ctx) => Some(ctx),
            _ => None,
        }
    }

    pub fn context_mut(&mut self, id: ObjectId) -> Option<&mut ContextData> {
        match self.get_mut(id)? {
            Object::Context(ctx) => Some(ctx),
            _ => None,
        }
    }

    pub fn action(&self, id: ObjectId) -> Option<&ActionData> {
        match self.get(id)? {
            Object::Action(action) => Some(action),
            _ => None,
        }
    }

    pub fn error(&self, id: ObjectId) -> Option<&ErrorData> {
        match self.get(id)? {
            Object::Error(err) => Some(err),
            _ => None,
        }
    }

    // Roots

    /// Add one host root. Returns `false` for a dead id.
    pub fn root(&mut self, id: ObjectId) -> bool {
        match self.slot_mut(id) {
            Some(slot) => {
                slot.roots += 1;
                true
            }
            None => false,
        }
    }

    /// Drop one host root. `None` if the slot is dead or was not rooted.
    pub fn unroot(&mut self, id: ObjectId) -> Option<u32> {
        let slot = self.slot_mut(id)?;
        if slot.roots == 0 {
            return None;
        }
        slot.roots -= 1;
        Some(slot.roots)
    }

    pub fn root_count(&self, id: ObjectId) -> u32 {
        self.slot(id).map_or(0, |s| s.roots)
    }

    /// Total host roots across all slots.
    pub fn total_roots(&self) -> u64 {
        self.slots
            .iter()
            .filter(|s| s.object.is_some())
            .map(|s| u64::from(s.roots))
            .sum()
    }

    // Guards

    pub fn guard_mark(&self) -> usize {
        self.guards.len()
    }

    pub fn guard(&mut self, cell: Cell) {
        if cell.object_id().is_some() || cell.binding().is_some() {
            self.guards.push(cell);
        }
    }

    pub fn release_guards(&mut self, mark: usize) {
        self.guards.truncate(mark);
    }

    pub fn guard_count(&self) -> usize {
        self.guards.len()
    }

    // Collection

    pub fn live_count(&self) -> usize {
        self.live
    }

    pub fn allocations_since_recycle(&self) -> usize {
        self.since_recycle
    }

    /// Mark from roots, guards and `extra_roots`, then sweep.
    pub fn recycle(&mut self, extra_roots: &[ObjectId]) -> Sweep {
        let mut work: Vec<ObjectId> = extra_roots.to_vec();
        for (index, slot) in self.slots.iter().enumerate() {
            if slot.object.is_some() && slot.roots > 0 {
                work.push(ObjectId {
                    index: u32::try_from(index).unwrap_or(u32::MAX),
                    generation: slot.generation,
                });
            }
        }
        for cell in &self.guards {
            push_refs(cell, &mut work);
        }

        while let Some(id) = work.pop() {
            let Some(slot) = self.slot_mut(id) else {
                continue;
            };
            if slot.marked {
                continue;
            }
            slot.marked = true;
            match &slot.object {
                Some(Object::Array(cells)) => cells.iter().for_each(|c| push_refs(c, &mut work)),
                Some(Object::Context(ctx)) => ctx.vars.iter().for_each(|c| push_refs(c, &mut work)),
                Some(Object::Action(action)) => {
                    if let ActionBody::User { body } = action.body {
                        work.push(body);
                    }
                }
                Some(Object::Text(_) | Object::Error(_)) | None => {}
            }
        }

        let mut sweep = Sweep {
            freed: 0,
            deleters: Vec::new(),
        };
        for (index, slot) in self.slots.iter_mut().enumerate() {
            if slot.object.is_none() {
                continue;
            }
            if slot.marked {
                slot.marked = false;
                continue;
            }
            if let Some(Object::Action(ActionData {
                body:
                    ActionBody::Extern {
                        user_data,
                        deleter: Some(deleter),
                        ..
                    },
                ..
            })) = slot.object.take()
            {
                sweep.deleters.push((deleter, user_data));
            }
            slot.object = None;
            slot.generation = slot.generation.wrapping_add(1).max(1);
            slot.roots = 0;
            self.free.push(u32::try_from(index).unwrap_or(u32::MAX));
            sweep.freed += 1;
        }
        self.live -= sweep.freed;
        self.since_recycle = 0;
        sweep
    }

    /// Take the deleters of every extern native still alive (engine teardown).
    pub fn drain_deleters(&mut self) -> Vec<(NativeDeleter, UserData)> {
        let mut out = Vec::new();
        for slot in &mut self.slots {
            if let Some(Object::Action(action)) = &mut slot.object {
                if let ActionBody::Extern {
                    user_data, deleter, ..
                } = &mut action.body
                {
                    if let Some(deleter) = deleter.take() {
                        out.push((deleter, *user_data));
                    }
                }
            }
        }
        out
    }
}

fn push_refs(cell: &Cell, work: &mut Vec<ObjectId>) {
    if let Some(id) = cell.object_id() {
        work.push(id);
    }
    if let Some(ctx) = cell.binding() {
        work.push(ctx);
    }
}

#[cfg(test)]
#[expect(clippy::unwrap_used, reason = "tests use unwrap for brevity")]
mod tests;
