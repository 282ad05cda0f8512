//! C-ABI surface.
//!
//! One engine may exist per process. It lives in a global slot behind a
//! reentrant lock: the thread running an evaluation can call back in from an
//! extension dispatcher, other threads block until it finishes.
//!
//! Every entry point returns a [`ResultCode`]; output goes through pointers.
//! Null output pointers are `BadArgument`.

use std::borrow::Cow;
use std::collections::hash_map::Entry;
use std::ffi::c_void;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::thread::ThreadId;

use parking_lot::{Mutex, ReentrantMutex};
use ren_cell::{
    Cell, EngineHandle, Kind, NativeDeleter, NativeDispatcher, RawLoadable, ResultCode,
    NO_CONSTRUCT,
};
use rustc_hash::FxHashMap;

use crate::aggregate::Loadable;
use crate::apply::Request;
use crate::config::{EngineConfig, OutputSink};
use crate::engine::Engine;
use crate::errors;
use crate::eval::request_cancel;
use crate::heap::{ActionBody, ActionData, Object, UserData};

struct Slot {
    handle: EngineHandle,
    engine: Arc<ReentrantMutex<Engine>>,
}

static SLOT: Mutex<Option<Slot>> = Mutex::new(None);
static NEXT_HANDLE: AtomicU32 = AtomicU32::new(1);
static THREADS: Mutex<Option<FxHashMap<ThreadId, u32>>> = Mutex::new(None);

/// Allocate the process engine with `config`.
pub fn alloc_engine_with(config: EngineConfig) -> Result<EngineHandle, ResultCode> {
    let mut slot = SLOT.lock();
    if slot.is_some() {
        return Err(ResultCode::EngineExists);
    }
    let handle = EngineHandle(NEXT_HANDLE.fetch_add(1, Ordering::Relaxed));
    *slot = Some(Slot {
        handle,
        engine: Arc::new(ReentrantMutex::new(Engine::new(handle, config))),
    });
    tracing::debug!(handle = handle.0, "engine allocated");
    Ok(handle)
}

/// Run `f` with the engine named by `handle`.
pub fn with_engine<R>(handle: EngineHandle, f: impl FnOnce(&Engine) -> R) -> Result<R, ResultCode> {
    let engine = {
        let slot = SLOT.lock();
        match slot.as_ref() {
            Some(slot) if slot.handle == handle => Arc::clone(&slot.engine),
            _ => return Err(ResultCode::BadEngine),
        }
    };
    let guard = engine.lock();
    Ok(f(&guard))
}

/// Redirect the engine's output.
pub fn set_output(handle: EngineHandle, sink: OutputSink) -> ResultCode {
    code(with_engine(handle, |engine| engine.set_output(sink)))
}

fn code(result: Result<(), ResultCode>) -> ResultCode {
    match result {
        Ok(()) => ResultCode::Success,
        Err(code) => code,
    }
}

fn flatten(result: Result<ResultCode, ResultCode>) -> ResultCode {
    match result {
        Ok(code) | Err(code) => code,
    }
}

#[allow(unsafe_code, reason = "caller passes a valid cell pointer or null")]
fn read_cell(cell: *const Cell) -> Option<Cell> {
    if cell.is_null() {
        return None;
    }
    // SAFETY: non-null pointers point at a readable cell, possibly unaligned
    // inside a host record.
    Some(unsafe { cell.read_unaligned() })
}

#[allow(unsafe_code, reason = "caller passes a writable cell pointer or null")]
fn write<T>(out: *mut T, value: T) -> bool {
    if out.is_null() {
        return false;
    }
    // SAFETY: non-null output pointers are writable for one `T`.
    unsafe { out.write_unaligned(value) };
    true
}

/// Read `count` records of `stride` bytes, each starting with a `T`.
#[allow(unsafe_code, reason = "caller declares count and stride of its array")]
fn read_strided<T: Copy>(base: *const T, count: usize, stride: usize) -> Option<Vec<T>> {
    if count == 0 {
        return Some(Vec::new());
    }
    if base.is_null() || stride < std::mem::size_of::<T>() {
        return None;
    }
    let bytes = base.cast::<u8>();
    let mut out = Vec::with_capacity(count);
    for i in 0..count {
        let offset = i.checked_mul(stride)?;
        // SAFETY: the caller guarantees `count` records of `stride` bytes.
        out.push(unsafe { bytes.add(offset).cast::<T>().read_unaligned() });
    }
    Some(out)
}

#[allow(unsafe_code, reason = "caller passes a UTF-8 buffer of the given length")]
fn read_text<'a>(text: *const u8, len: usize) -> Option<Cow<'a, str>> {
    if len == 0 {
        return Some(Cow::Borrowed(""));
    }
    if text.is_null() {
        return None;
    }
    // SAFETY: the caller keeps `len` readable bytes alive for the call.
    let bytes = unsafe { std::slice::from_raw_parts(text, len) };
    Some(String::from_utf8_lossy(bytes))
}

// Engine lifetime

#[no_mangle]
pub extern "C" fn ren_alloc_engine(out: *mut EngineHandle) -> ResultCode {
    if out.is_null() {
        return ResultCode::BadArgument;
    }
    match alloc_engine_with(EngineConfig::default()) {
        Ok(handle) => {
            write(out, handle);
            ResultCode::Success
        }
        Err(code) => code,
    }
}

#[no_mangle]
pub extern "C" fn ren_free_engine(handle: EngineHandle) {
    let taken = {
        let mut slot = SLOT.lock();
        match slot.as_ref() {
            Some(current) if current.handle == handle => slot.take(),
            _ => None,
        }
    };
    if taken.is_some() {
        tracing::debug!(handle = handle.0, "engine freed");
    }
    // Dropped outside the slot lock: native deleters may call back in.
    drop(taken);
}

#[no_mangle]
pub extern "C" fn ren_find_context(
    engine: EngineHandle,
    name: *const u8,
    len: usize,
    out: *mut Cell,
) -> ResultCode {
    let Some(name) = read_text(name, len) else {
        return ResultCode::BadArgument;
    };
    flatten(with_engine(engine, |engine| match engine.find_context(&name) {
        Some(context) if write(out, context) => ResultCode::Success,
        Some(_) => ResultCode::BadArgument,
        None => ResultCode::NoSuchContext,
    }))
}

/// Build an aggregate from `loadables` and construct and/or apply it.
///
/// - `construct_kind`: a `Kind` byte, or `NO_CONSTRUCT`
/// - `construct_out`: receives the constructed value (rooted)
/// - `apply_out`: non-null requests apply; receives the result (rooted)
/// - `error_out`: on failure, the error or thrown value (rooted), or the
///   exit code as an integer
/// - `label_out`: on `Thrown`, the throw name or void
#[no_mangle]
#[allow(clippy::too_many_arguments, reason = "flat C signature")]
pub extern "C" fn ren_construct_or_apply(
    engine: EngineHandle,
    context: *const Cell,
    applicand: *const Cell,
    loadables: *const RawLoadable,
    count: usize,
    stride: usize,
    construct_kind: u8,
    construct_out: *mut Cell,
    apply_out: *mut Cell,
    apply_only: bool,
    error_out: *mut Cell,
    label_out: *mut Cell,
) -> ResultCode {
    let construct = match construct_kind {
        NO_CONSTRUCT => None,
        byte => match Kind::from_u8(byte) {
            Some(kind) if !construct_out.is_null() => Some(kind),
            _ => return ResultCode::BadArgument,
        },
    };
    let Some(raw) = read_strided(loadables, count, stride) else {
        return ResultCode::BadArgument;
    };
    let mut items = Vec::with_capacity(raw.len());
    for loadable in &raw {
        if loadable.is_source() {
            match read_text(loadable.source, loadable.source_len) {
                Some(text) => items.push(Loadable::Source(text)),
                None => return ResultCode::BadArgument,
            }
        } else {
            items.push(Loadable::Value(loadable.cell));
        }
    }
    let request = Request {
        context: read_cell(context),
        applicand: read_cell(applicand),
        loadables: &items,
        construct,
        apply: !apply_out.is_null(),
        only: apply_only,
    };
    flatten(with_engine(engine, |engine| {
        match engine.construct_or_apply(&request) {
            Ok(outcome) => {
                if let Some(cell) = outcome.constructed {
                    write(construct_out, cell);
                }
                if let Some(cell) = outcome.applied {
                    write(apply_out, cell);
                }
                ResultCode::Success
            }
            Err(failure) => {
                let cell = failure.cell();
                if !write(error_out, cell) {
                    engine.release_cell(cell);
                }
                if let crate::apply::Failure::Thrown { name, .. } = failure {
                    write(label_out, name);
                }
                failure.code()
            }
        }
    }))
}

// Roots

#[no_mangle]
pub extern "C" fn ren_root_cells(
    engine: EngineHandle,
    cells: *const Cell,
    count: usize,
    stride: usize,
) -> ResultCode {
    let Some(cells) = read_strided(cells, count, stride) else {
        return ResultCode::BadArgument;
    };
    code(with_engine(engine, |engine| {
        for cell in cells {
            engine.root_cell(cell);
        }
    }))
}

#[no_mangle]
pub extern "C" fn ren_release_cells(
    engine: EngineHandle,
    cells: *const Cell,
    count: usize,
    stride: usize,
) -> ResultCode {
    let Some(cells) = read_strided(cells, count, stride) else {
        return ResultCode::BadArgument;
    };
    flatten(with_engine(engine, |engine| {
        let mut result = ResultCode::Success;
        for cell in cells {
            if !engine.release_cell(cell) {
                tracing::warn!(cell = ?cell, "release of unrooted cell");
                result = ResultCode::NotRooted;
            }
        }
        result
    }))
}

#[no_mangle]
pub extern "C" fn ren_root_count(engine: EngineHandle, cell: *const Cell) -> u32 {
    let Some(cell) = read_cell(cell) else {
        return 0;
    };
    with_engine(engine, |engine| engine.root_count(cell)).unwrap_or_default()
}

/// Host roots held across the whole heap (diagnostics).
#[no_mangle]
pub extern "C" fn ren_total_roots(engine: EngineHandle, out: *mut u64) -> ResultCode {
    flatten(with_engine(engine, |engine| {
        if write(out, engine.total_roots()) {
            ResultCode::Success
        } else {
            ResultCode::BadArgument
        }
    }))
}

#[no_mangle]
pub extern "C" fn ren_cell_needs_root(cell: *const Cell) -> bool {
    read_cell(cell).is_some_and(|cell| cell.root_target().is_some())
}

// Rendering and inspection

/// Write FORM (or MOLD) of a cell as UTF-8, without a terminator.
///
/// `written` receives the byte length; on `BufferTooSmall` it receives the
/// size needed and nothing is copied.
#[no_mangle]
#[allow(unsafe_code, reason = "copies into the caller's buffer")]
pub extern "C" fn ren_form_as_utf8(
    engine: EngineHandle,
    cell: *const Cell,
    mold: bool,
    buf: *mut u8,
    size: usize,
    written: *mut usize,
) -> ResultCode {
    let Some(cell) = read_cell(cell) else {
        return ResultCode::BadArgument;
    };
    flatten(with_engine(engine, |engine| {
        let text = engine.render(cell, mold);
        let needed = text.len();
        write(written, needed);
        if needed > size || (needed > 0 && buf.is_null()) {
            return ResultCode::BufferTooSmall;
        }
        if needed > 0 {
            // SAFETY: `buf` holds at least `size >= needed` writable bytes.
            unsafe { std::ptr::copy_nonoverlapping(text.as_ptr(), buf, needed) };
        }
        ResultCode::Success
    }))
}

#[no_mangle]
pub extern "C" fn ren_series_len(engine: EngineHandle, cell: *const Cell, out: *mut usize) -> ResultCode {
    let Some(cell) = read_cell(cell) else {
        return ResultCode::BadArgument;
    };
    flatten(with_engine(engine, |engine| match engine.series_len(cell) {
        Some(len) if write(out, len) => ResultCode::Success,
        Some(_) => ResultCode::BadArgument,
        None => ResultCode::ApplyError,
    }))
}

/// Element `index` (zero-based). Series elements are rooted for the caller.
#[no_mangle]
pub extern "C" fn ren_series_at(
    engine: EngineHandle,
    cell: *const Cell,
    index: usize,
    out: *mut Cell,
) -> ResultCode {
    let Some(cell) = read_cell(cell) else {
        return ResultCode::BadArgument;
    };
    flatten(with_engine(engine, |engine| match engine.series_at(cell, index) {
        Some(element) if write(out, element) => {
            engine.root_cell(element);
            ResultCode::Success
        }
        Some(_) => ResultCode::BadArgument,
        None => ResultCode::ApplyError,
    }))
}

/// Field of an object (rooted for the caller).
#[no_mangle]
pub extern "C" fn ren_object_get(
    engine: EngineHandle,
    object: *const Cell,
    name: *const u8,
    len: usize,
    out: *mut Cell,
) -> ResultCode {
    let (Some(object), Some(name)) = (read_cell(object), read_text(name, len)) else {
        return ResultCode::BadArgument;
    };
    flatten(with_engine(engine, |engine| match engine.object_get(object, &name) {
        Some(value) if write(out, value) => {
            engine.root_cell(value);
            ResultCode::Success
        }
        Some(_) => ResultCode::BadArgument,
        None => ResultCode::ApplyError,
    }))
}

#[no_mangle]
pub extern "C" fn ren_is_equal(engine: EngineHandle, a: *const Cell, b: *const Cell) -> bool {
    let (Some(a), Some(b)) = (read_cell(a), read_cell(b)) else {
        return false;
    };
    with_engine(engine, |engine| crate::natives::values_equal(engine, a, b)).unwrap_or_default()
}

// Natives

/// Register a host native. On failure the engine does not call `deleter`;
/// the caller still owns `user_data`.
#[no_mangle]
#[allow(clippy::too_many_arguments, reason = "flat C signature")]
pub extern "C" fn ren_make_native(
    engine: EngineHandle,
    spec: *const u8,
    len: usize,
    dispatcher: NativeDispatcher,
    user_data: *mut c_void,
    deleter: Option<NativeDeleter>,
    out: *mut Cell,
    error_out: *mut Cell,
) -> ResultCode {
    let Some(spec) = read_text(spec, len) else {
        return ResultCode::BadArgument;
    };
    if out.is_null() {
        return ResultCode::BadArgument;
    }
    flatten(with_engine(engine, |engine| match engine.parse_spec_text(&spec) {
        Ok(parsed) => {
            let id = engine.alloc(Object::Action(ActionData {
                name: None,
                doc: parsed.doc,
                params: parsed.params,
                body: ActionBody::Extern {
                    dispatcher,
                    user_data: UserData(user_data),
                    deleter,
                },
                enfix: false,
            }));
            let action = Cell::series(Kind::Action, id, 0);
            engine.root_cell(action);
            write(out, action);
            ResultCode::Success
        }
        Err(err) => {
            let error = engine.make_error(err);
            if write(error_out, error) {
                engine.root_cell(error);
            }
            ResultCode::LoadError
        }
    }))
}

/// Parameter slots of an action, refinements included.
#[no_mangle]
pub extern "C" fn ren_action_arity(engine: EngineHandle, cell: *const Cell, out: *mut usize) -> ResultCode {
    let Some(cell) = read_cell(cell) else {
        return ResultCode::BadArgument;
    };
    flatten(with_engine(engine, |engine| match engine.action_data(cell) {
        Some(action) if write(out, action.slot_count()) => ResultCode::Success,
        Some(_) => ResultCode::BadArgument,
        None => ResultCode::ApplyError,
    }))
}

/// Make an error value for a dispatcher to return. The cell is not rooted;
/// it is only valid until the dispatcher returns.
#[no_mangle]
pub extern "C" fn ren_make_error(
    engine: EngineHandle,
    message: *const u8,
    len: usize,
    out: *mut Cell,
) -> ResultCode {
    let Some(message) = read_text(message, len) else {
        return ResultCode::BadArgument;
    };
    flatten(with_engine(engine, |engine| {
        let error = engine.make_error(errors::user(&message));
        if write(out, error) {
            ResultCode::Success
        } else {
            ResultCode::BadArgument
        }
    }))
}

/// Write an error's id (`no-value`, `user`, ...) with the same buffer
/// protocol as [`ren_form_as_utf8`].
#[no_mangle]
#[allow(unsafe_code, reason = "copies into the caller's buffer")]
pub extern "C" fn ren_error_id(
    engine: EngineHandle,
    error: *const Cell,
    buf: *mut u8,
    size: usize,
    written: *mut usize,
) -> ResultCode {
    let Some(error) = read_cell(error) else {
        return ResultCode::BadArgument;
    };
    flatten(with_engine(engine, |engine| {
        let Some(data) = engine.error_data(error) else {
            return ResultCode::ApplyError;
        };
        let needed = data.id.len();
        write(written, needed);
        if needed > size || buf.is_null() {
            return ResultCode::BufferTooSmall;
        }
        // SAFETY: `buf` holds at least `size >= needed` writable bytes.
        unsafe { std::ptr::copy_nonoverlapping(data.id.as_ptr(), buf, needed) };
        ResultCode::Success
    }))
}

/// Make a text value (rooted for the caller).
#[no_mangle]
pub extern "C" fn ren_make_text(
    engine: EngineHandle,
    text: *const u8,
    len: usize,
    out: *mut Cell,
) -> ResultCode {
    let Some(text) = read_text(text, len) else {
        return ResultCode::BadArgument;
    };
    if out.is_null() {
        return ResultCode::BadArgument;
    }
    flatten(with_engine(engine, |engine| {
        let cell = engine.make_text(text);
        engine.root_cell(cell);
        write(out, cell);
        ResultCode::Success
    }))
}

// Process-wide controls

#[no_mangle]
pub extern "C" fn ren_cancel() {
    request_cancel();
}

#[no_mangle]
pub extern "C" fn ren_recycle(engine: EngineHandle, out_freed: *mut usize) -> ResultCode {
    flatten(with_engine(engine, |engine| {
        let freed = engine.recycle();
        write(out_freed, freed);
        ResultCode::Success
    }))
}

/// Record the calling thread. Returns `true` the first time per thread.
#[no_mangle]
pub extern "C" fn ren_register_thread() -> bool {
    let id = std::thread::current().id();
    let mut threads = THREADS.lock();
    match threads.get_or_insert_with(FxHashMap::default).entry(id) {
        Entry::Occupied(mut seen) => {
            *seen.get_mut() += 1;
            false
        }
        Entry::Vacant(slot) => {
            slot.insert(1);
            tracing::trace!(thread = ?id, "thread registered");
            true
        }
    }
}

/// Threads registered so far.
pub fn registered_threads() -> usize {
    THREADS.lock().as_ref().map_or(0, |threads| threads.len())
}
