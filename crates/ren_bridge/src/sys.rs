//! Thin wrappers over the engine's C entry points.
//!
//! Everything here speaks cells, handles and result codes. Ownership (roots)
//! and error translation happen in the layers above.

use std::ffi::c_void;
use std::mem::size_of;
use std::ptr::{null, null_mut};

use ren_cell::{
    Cell, EngineHandle, Kind, NativeDeleter, NativeDispatcher, RawLoadable, ResultCode,
    NO_CONSTRUCT,
};
use ren_engine::ffi;

fn check(code: ResultCode) -> Result<(), ResultCode> {
    if code.is_success() {
        Ok(())
    } else {
        Err(code)
    }
}

pub(crate) fn free_engine(engine: EngineHandle) {
    ffi::ren_free_engine(engine);
}

pub(crate) fn find_context(engine: EngineHandle, name: &str) -> Result<Cell, ResultCode> {
    let mut out = Cell::VOID;
    check(ffi::ren_find_context(engine, name.as_ptr(), name.len(), &mut out))?;
    Ok(out)
}

pub(crate) fn needs_root(cell: Cell) -> bool {
    ffi::ren_cell_needs_root(&cell)
}

pub(crate) fn root(engine: EngineHandle, cell: Cell) -> ResultCode {
    ffi::ren_root_cells(engine, &cell, 1, size_of::<Cell>())
}

pub(crate) fn release(engine: EngineHandle, cell: Cell) -> ResultCode {
    ffi::ren_release_cells(engine, &cell, 1, size_of::<Cell>())
}

pub(crate) fn root_count(engine: EngineHandle, cell: Cell) -> u32 {
    ffi::ren_root_count(engine, &cell)
}

pub(crate) fn total_roots(engine: EngineHandle) -> Result<u64, ResultCode> {
    let mut out = 0;
    check(ffi::ren_total_roots(engine, &mut out))?;
    Ok(out)
}

/// Run a buffer-filling entry point, growing the buffer once if the first
/// guess is short.
fn read_utf8(mut fill: impl FnMut(*mut u8, usize, &mut usize) -> ResultCode) -> Result<String, ResultCode> {
    let mut buf = vec![0u8; 64];
    loop {
        let mut written = 0;
        match fill(buf.as_mut_ptr(), buf.len(), &mut written) {
            ResultCode::Success => {
                buf.truncate(written);
                return Ok(String::from_utf8_lossy(&buf).into_owned());
            }
            ResultCode::BufferTooSmall if written > buf.len() => buf.resize(written, 0),
            code => return Err(code),
        }
    }
}

/// FORM or MOLD.
pub(crate) fn render(engine: EngineHandle, cell: Cell, mold: bool) -> Result<String, ResultCode> {
    read_utf8(|buf, size, written| ffi::ren_form_as_utf8(engine, &cell, mold, buf, size, written))
}

pub(crate) fn error_id(engine: EngineHandle, error: Cell) -> Result<String, ResultCode> {
    read_utf8(|buf, size, written| ffi::ren_error_id(engine, &error, buf, size, written))
}

pub(crate) fn series_len(engine: EngineHandle, cell: Cell) -> Result<usize, ResultCode> {
    let mut out = 0;
    check(ffi::ren_series_len(engine, &cell, &mut out))?;
    Ok(out)
}

/// Element `index`, rooted for the caller.
pub(crate) fn series_at(engine: EngineHandle, cell: Cell, index: usize) -> Result<Cell, ResultCode> {
    let mut out = Cell::VOID;
    check(ffi::ren_series_at(engine, &cell, index, &mut out))?;
    Ok(out)
}

/// Object field, rooted for the caller.
pub(crate) fn object_get(engine: EngineHandle, object: Cell, field: &str) -> Result<Cell, ResultCode> {
    let mut out = Cell::VOID;
    check(ffi::ren_object_get(engine, &object, field.as_ptr(), field.len(), &mut out))?;
    Ok(out)
}

pub(crate) fn is_equal(engine: EngineHandle, a: Cell, b: Cell) -> bool {
    ffi::ren_is_equal(engine, &a, &b)
}

/// Text value, rooted for the caller.
pub(crate) fn make_text(engine: EngineHandle, text: &str) -> Result<Cell, ResultCode> {
    let mut out = Cell::VOID;
    check(ffi::ren_make_text(engine, text.as_ptr(), text.len(), &mut out))?;
    Ok(out)
}

/// Error value, not rooted.
pub(crate) fn make_error(engine: EngineHandle, message: &str) -> Result<Cell, ResultCode> {
    let mut out = Cell::VOID;
    check(ffi::ren_make_error(engine, message.as_ptr(), message.len(), &mut out))?;
    Ok(out)
}

pub(crate) fn action_arity(engine: EngineHandle, action: Cell) -> Result<usize, ResultCode> {
    let mut out = 0;
    check(ffi::ren_action_arity(engine, &action, &mut out))?;
    Ok(out)
}

/// Register a native. On failure the error cell (rooted) comes back with the
/// code and `user_data` still belongs to the caller.
pub(crate) fn make_native(
    engine: EngineHandle,
    spec: &str,
    dispatcher: NativeDispatcher,
    user_data: *mut c_void,
    deleter: Option<NativeDeleter>,
) -> Result<Cell, (ResultCode, Cell)> {
    let mut out = Cell::VOID;
    let mut error = Cell::VOID;
    let code = ffi::ren_make_native(
        engine,
        spec.as_ptr(),
        spec.len(),
        dispatcher,
        user_data,
        deleter,
        &mut out,
        &mut error,
    );
    if code.is_success() {
        Ok(out)
    } else {
        Err((code, error))
    }
}

/// Raw form of one construct-or-apply call.
pub(crate) struct RawCall<'a> {
    pub engine: EngineHandle,
    pub context: Option<Cell>,
    pub applicand: Option<Cell>,
    pub loadables: &'a [RawLoadable],
    pub construct: Option<Kind>,
    pub apply: bool,
    pub only: bool,
}

/// Cells written back by the engine. Which ones are meaningful depends on
/// the code.
pub(crate) struct RawOutcome {
    pub code: ResultCode,
    pub constructed: Cell,
    pub applied: Cell,
    pub error: Cell,
    pub label: Cell,
}

pub(crate) fn construct_or_apply(call: &RawCall<'_>) -> RawOutcome {
    let mut outcome = RawOutcome {
        code: ResultCode::Success,
        constructed: Cell::VOID,
        applied: Cell::VOID,
        error: Cell::VOID,
        label: Cell::VOID,
    };
    let context = call.context.as_ref().map_or(null(), |cell| cell as *const Cell);
    let applicand = call.applicand.as_ref().map_or(null(), |cell| cell as *const Cell);
    let construct_out: *mut Cell = if call.construct.is_some() {
        &mut outcome.constructed
    } else {
        null_mut()
    };
    let apply_out: *mut Cell = if call.apply {
        &mut outcome.applied
    } else {
        null_mut()
    };
    outcome.code = ffi::ren_construct_or_apply(
        call.engine,
        context,
        applicand,
        call.loadables.as_ptr(),
        call.loadables.len(),
        size_of::<RawLoadable>(),
        call.construct.map_or(NO_CONSTRUCT, |kind| kind as u8),
        construct_out,
        apply_out,
        call.only,
        &mut outcome.error,
        &mut outcome.label,
    );
    outcome
}

pub(crate) fn cancel() {
    ffi::ren_cancel();
}

pub(crate) fn recycle(engine: EngineHandle) -> Result<usize, ResultCode> {
    let mut freed = 0;
    check(ffi::ren_recycle(engine, &mut freed))?;
    Ok(freed)
}

pub(crate) fn register_thread() -> bool {
    ffi::ren_register_thread()
}
