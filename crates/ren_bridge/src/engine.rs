//! Engine handles and the default-engine finder.
//!
//! An [`Engine`] is a shared handle to the process engine. The last clone to
//! drop frees it; values hold a clone, so an engine outlives every value it
//! produced. The finder supplies the engine used when a call names none.

use std::fmt;
use std::sync::{Arc, Weak};

use parking_lot::Mutex;
use ren_cell::{EngineHandle, ResultCode};
use ren_engine::{CaptureBuffer, EngineConfig, OutputSink};
use rustc_hash::FxHashMap;

use crate::context::Context;
use crate::error::{Error, Result};
use crate::extension::ExtensionTable;
use crate::runtime::ensure_thread_registered;
use crate::sys;
use crate::value::Value;

pub(crate) struct EngineInner {
    handle: EngineHandle,
    pub(crate) extensions: ExtensionTable,
}

impl Drop for EngineInner {
    fn drop(&mut self) {
        if let Some(engines) = ENGINES.lock().as_mut() {
            engines.remove(&self.handle.0);
        }
        tracing::debug!(handle = self.handle.0, "freeing engine");
        sys::free_engine(self.handle);
    }
}

/// Shared handle to an engine.
#[derive(Clone)]
pub struct Engine {
    inner: Arc<EngineInner>,
}

/// Live engines by handle, for dispatchers that only see the raw handle.
static ENGINES: Mutex<Option<FxHashMap<u32, Weak<EngineInner>>>> = Mutex::new(None);

impl Engine {
    /// Allocate the process engine with default configuration.
    pub fn new() -> Result<Engine> {
        Engine::with_config(EngineConfig::default())
    }

    pub fn with_config(config: EngineConfig) -> Result<Engine> {
        ensure_thread_registered();
        let handle = ren_engine::alloc_engine_with(config).map_err(Error::EngineUnavailable)?;
        let engine = Engine::adopt_handle(handle);
        tracing::debug!(handle = handle.0, "engine created");
        Ok(engine)
    }

    fn adopt_handle(handle: EngineHandle) -> Engine {
        let inner = Arc::new(EngineInner {
            handle,
            extensions: ExtensionTable::default(),
        });
        ENGINES
            .lock()
            .get_or_insert_with(FxHashMap::default)
            .insert(handle.0, Arc::downgrade(&inner));
        Engine { inner }
    }

    /// The live engine behind a raw handle.
    pub(crate) fn from_handle(handle: EngineHandle) -> Option<Engine> {
        let engines = ENGINES.lock();
        let inner = engines.as_ref()?.get(&handle.0)?.upgrade()?;
        Some(Engine { inner })
    }

    pub fn handle(&self) -> EngineHandle {
        self.inner.handle
    }

    pub(crate) fn extensions(&self) -> &ExtensionTable {
        &self.inner.extensions
    }

    /// Redirect `print` and other engine output.
    pub fn set_output(&self, sink: OutputSink) -> Result<()> {
        match ren_engine::set_output(self.handle(), sink) {
            ResultCode::Success => Ok(()),
            code => Err(Error::EngineUnavailable(code)),
        }
    }

    /// Send engine output to a fresh buffer and return it.
    pub fn capture_output(&self) -> Result<Arc<CaptureBuffer>> {
        let buffer = CaptureBuffer::new();
        self.set_output(OutputSink::Buffer(Arc::clone(&buffer)))?;
        Ok(buffer)
    }

    /// A named system context (`user`, `lib`).
    pub fn find_context(&self, name: &str) -> Result<Context> {
        let cell = sys::find_context(self.handle(), name).map_err(|code| match code {
            ResultCode::NoSuchContext => Error::NoSuchContext(name.to_string()),
            code => Error::EngineUnavailable(code),
        })?;
        let object = Value::pending(cell).finish_init(Some(self))?;
        Ok(Context::from_object(self, object))
    }

    /// Collect garbage now. Returns how many objects were freed.
    pub fn recycle(&self) -> Result<usize> {
        sys::recycle(self.handle()).map_err(Error::EngineUnavailable)
    }

    /// Host roots held on `value`'s storage or a bound word's context (zero
    /// for scalars).
    pub fn root_count(&self, value: &Value) -> u32 {
        sys::root_count(self.handle(), value.cell())
    }

    /// Host roots held across the engine.
    pub fn total_roots(&self) -> Result<u64> {
        sys::total_roots(self.handle()).map_err(Error::EngineUnavailable)
    }
}

impl PartialEq for Engine {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl Eq for Engine {}

impl fmt::Debug for Engine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Engine").field(&self.handle().0).finish()
    }
}

/// Supplies the engine for calls that name none.
pub type EngineFinder = fn() -> Result<Engine>;

static ENGINE_FINDER: Mutex<EngineFinder> = Mutex::new(default_engine);
static DEFAULT_ENGINE: Mutex<Option<Engine>> = Mutex::new(None);

/// The stock finder: one engine, created on first use and kept for the life
/// of the process.
pub fn default_engine() -> Result<Engine> {
    let mut slot = DEFAULT_ENGINE.lock();
    if let Some(engine) = slot.as_ref() {
        return Ok(engine.clone());
    }
    let engine = Engine::new()?;
    *slot = Some(engine.clone());
    Ok(engine)
}

/// Replace the engine finder, returning the previous one.
pub fn set_engine_finder(finder: EngineFinder) -> EngineFinder {
    std::mem::replace(&mut *ENGINE_FINDER.lock(), finder)
}

/// Resolve the default engine through the current finder.
pub fn find_engine() -> Result<Engine> {
    let finder = *ENGINE_FINDER.lock();
    finder()
}

#[cfg(test)]
impl Engine {
    /// An engine handle the process engine does not know about.
    pub(crate) fn detached(handle: EngineHandle) -> Engine {
        Engine {
            inner: Arc::new(EngineInner {
                handle,
                extensions: ExtensionTable::default(),
            }),
        }
    }
}
