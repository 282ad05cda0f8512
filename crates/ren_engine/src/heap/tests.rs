use std::ffi::c_void;
use std::sync::atomic::{AtomicUsize, Ordering};

use pretty_assertions::assert_eq;
use ren_cell::{Kind, NativeStatus, RawFrame};

use super::*;

fn block(heap: &mut Heap, cells: Vec<Cell>) -> Cell {
    let id = heap.alloc(Object::Array(cells));
    Cell::series(Kind::Block, id, 0)
}

#[test]
fn unrooted_objects_are_collected() {
    let mut heap = Heap::new();
    let id = heap.alloc(Object::Text("gone".into()));
    let sweep = heap.recycle(&[]);
    assert_eq!(sweep.freed, 1);
    assert!(!heap.is_live(id));
    assert_eq!(heap.live_count(), 0);
}

#[test]
fn rooted_objects_and_their_children_survive() {
    let mut heap = Heap::new();
    let text = heap.alloc(Object::Text("kept".into()));
    let outer = block(&mut heap, vec![Cell::series(Kind::Text, text, 0)]);
    let Some(outer_id) = outer.object_id() else {
        panic!("block has no object id");
    };
    assert!(heap.root(outer_id));

    assert_eq!(heap.recycle(&[]).freed, 0);
    assert!(heap.is_live(text));

    assert_eq!(heap.unroot(outer_id), Some(0));
    assert_eq!(heap.recycle(&[]).freed, 2);
}

#[test]
fn unroot_without_root_is_reported() {
    let mut heap = Heap::new();
    let id = heap.alloc(Object::Text(String::new()));
    assert_eq!(heap.unroot(id), None);
    heap.root(id);
    heap.root(id);
    assert_eq!(heap.root_count(id), 2);
    assert_eq!(heap.unroot(id), Some(1));
    assert_eq!(heap.total_roots(), 1);
}

#[test]
fn stale_ids_do_not_resolve_after_reuse() {
    let mut heap = Heap::new();
    let old = heap.alloc(Object::Text("a".into()));
    heap.recycle(&[]);
    let new = heap.alloc(Object::Text("b".into()));
    assert_eq!(old.index, new.index);
    assert_ne!(old.generation, new.generation);
    assert!(heap.text(old).is_none());
    assert_eq!(heap.text(new).map(String::as_str), Some("b"));
}

#[test]
fn guards_pin_until_released() {
    let mut heap = Heap::new();
    let mark = heap.guard_mark();
    let cell = block(&mut heap, Vec::new());
    heap.guard(cell);
    assert_eq!(heap.recycle(&[]).freed, 0);
    heap.release_guards(mark);
    assert_eq!(heap.guard_count(), 0);
    assert_eq!(heap.recycle(&[]).freed, 1);
}

#[test]
fn context_bindings_keep_contexts_alive() {
    let mut heap = Heap::new();
    let ctx = heap.alloc(Object::Context(ContextData::new()));
    let word = Cell::word(Kind::Word, 0).with_binding(Some(ctx));
    let holder = block(&mut heap, vec![word]);
    let Some(holder_id) = holder.object_id() else {
        panic!("block has no object id");
    };
    heap.root(holder_id);
    heap.recycle(&[]);
    assert!(heap.is_live(ctx));
}

static DELETED: AtomicUsize = AtomicUsize::new(0);

extern "C" fn noop_dispatch(_frame: *mut RawFrame, _data: *mut c_void) -> NativeStatus {
    NativeStatus::Return
}

extern "C" fn count_delete(_data: *mut c_void) {
    DELETED.fetch_add(1, Ordering::SeqCst);
}

#[test]
fn sweeping_an_extern_native_yields_its_deleter() {
    let mut heap = Heap::new();
    heap.alloc(Object::Action(ActionData {
        name: None,
        doc: None,
        params: Vec::new(),
        body: ActionBody::Extern {
            dispatcher: noop_dispatch,
            user_data: UserData(std::ptr::null_mut()),
            deleter: Some(count_delete),
        },
        enfix: false,
    }));
    let sweep = heap.recycle(&[]);
    assert_eq!(sweep.deleters.len(), 1);
    let before = DELETED.load(Ordering::SeqCst);
    for (deleter, data) in sweep.deleters {
        deleter(data.0);
    }
    assert_eq!(DELETED.load(Ordering::SeqCst), before + 1);
}

#[test]
fn context_data_define_and_set() {
    let mut ctx = ContextData::new();
    let a = Symbol(1);
    assert!(!ctx.set(a, Cell::integer(1)));
    ctx.define(a, Cell::integer(2));
    assert_eq!(ctx.get(a), Some(Cell::integer(2)));
    assert!(ctx.set(a, Cell::integer(3)));
    assert_eq!(ctx.get(a), Some(Cell::integer(3)));
    assert_eq!(ctx.ensure(a), 0);
    assert_eq!(ctx.len(), 1);
}
