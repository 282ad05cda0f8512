//! Process-wide plumbing: thread registration, cancellation, tracing.

use std::cell::Cell as StdCell;
use std::sync::Once;
use std::thread::ThreadId;

use parking_lot::Mutex;
use rustc_hash::FxHashSet;

use crate::sys;

thread_local! {
    static REGISTERED: StdCell<bool> = const { StdCell::new(false) };
}

static SEEN: Mutex<Option<FxHashSet<ThreadId>>> = Mutex::new(None);

/// Register the calling thread with the engine, once per thread.
pub fn ensure_thread_registered() {
    if REGISTERED.with(StdCell::get) {
        return;
    }
    let id = std::thread::current().id();
    let first = SEEN.lock().get_or_insert_with(FxHashSet::default).insert(id);
    if first {
        sys::register_thread();
        tracing::trace!(thread = ?id, "thread registered with engine");
    }
    REGISTERED.with(|flag| flag.set(true));
}

/// Ask the running evaluation to stop. Callable from any thread; the call
/// in flight fails with [`Error::Cancelled`](crate::Error::Cancelled).
pub fn cancel() {
    sys::cancel();
}

static TRACING_INIT: Once = Once::new();

/// Initialize tracing for debug output.
///
/// Safe to call multiple times. Enable with `RUST_LOG=ren_bridge=debug` or
/// `RUST_LOG=ren_engine=trace`.
pub fn init_tracing() {
    TRACING_INIT.call_once(|| {
        use tracing_subscriber::{fmt, prelude::*, EnvFilter};

        // Only initialize if RUST_LOG is set
        if std::env::var("RUST_LOG").is_ok() {
            let filter = EnvFilter::from_default_env();
            let _ = tracing_subscriber::registry()
                .with(fmt::layer().with_target(true).with_level(true))
                .with(filter)
                .try_init();
        }
    });
}
