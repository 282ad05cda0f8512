use parking_lot::Mutex;
use rustc_hash::FxHashMap;

use super::Callable;

/// One-shot callables waiting for their first invocation, per engine.
///
/// Each registration gets its own key, which the native carries as user
/// data. Claiming removes the entry, so a key is served at most once.
#[derive(Default)]
pub(crate) struct ExtensionTable {
    pending: Mutex<FxHashMap<usize, Box<Callable>>>,
}

impl ExtensionTable {
    pub(crate) fn insert(&self, key: usize, callable: Box<Callable>) {
        self.pending.lock().insert(key, callable);
    }

    /// Find and remove the entry for `key`.
    pub(crate) fn claim(&self, key: usize) -> Option<Box<Callable>> {
        self.pending.lock().remove(&key)
    }

    /// Entries not yet claimed.
    pub(crate) fn pending(&self) -> usize {
        self.pending.lock().len()
    }
}
