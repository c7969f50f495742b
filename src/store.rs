use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use serde_json::{Map, Value};

/// A stored record: whatever fields the client sent, plus an `id`.
pub type Item = Map<String, Value>;

/// In-memory collections keyed by collection path.
///
/// Cloning hands out another handle to the same collections. Every access holds the
/// lock for its whole duration, so one request's read-modify-write never interleaves
/// with another's.
#[derive(Clone, Default, Debug)]
pub struct Store {
    collections: Arc<Mutex<HashMap<String, Vec<Item>>>>,
}

impl Store {
    pub fn new() -> Self {
        Self::default()
    }

    /// Resets `key` to an empty collection.
    pub fn init_collection(&self, key: &str) {
        self.lock().insert(key.to_string(), Vec::new());
    }

    /// Runs `f` against the collection at `key`, creating it empty if absent.
    /// The collection stays in the store afterwards whether or not `f` changed it.
    pub fn with_collection<R>(&self, key: &str, f: impl FnOnce(&mut Vec<Item>) -> R) -> R {
        let mut collections = self.lock();
        let data = collections.entry(key.to_string()).or_default();
        f(data)
    }

    /// A copy of the collection at `key`, if it has been created.
    #[cfg(test)]
    pub fn snapshot(&self, key: &str) -> Option<Vec<Item>> {
        self.lock().get(key).cloned()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, Vec<Item>>> {
        // Every mutation completes before the guard drops, so a poisoned map is still consistent.
        self.collections.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
