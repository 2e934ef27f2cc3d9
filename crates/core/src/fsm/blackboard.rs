//! Typed key/value scratch space shared between state nodes.
//!
//! Nodes use the blackboard to hand data to later nodes without referencing
//! each other. Values of any `Send` type can be stored; reads are typed and
//! clone the stored value out.

use std::any::{type_name, Any};
use std::collections::HashMap;
use std::fmt;
use tracing::warn;

/// Per-run key/value store.
///
/// Reading a missing key (or a key holding a different type) is not an
/// error: it logs a warning and yields nothing, or the type's default.
#[derive(Default)]
pub struct Blackboard {
    entries: HashMap<String, Box<dyn Any + Send>>,
}

impl Blackboard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store `value` under `key`, replacing any previous entry.
    pub fn set<T: Any + Send>(&mut self, key: impl Into<String>, value: T) {
        self.entries.insert(key.into(), Box::new(value));
    }

    /// Read the value stored under `key`, or `T::default()` if it is missing.
    pub fn get<T: Any + Clone + Default>(&self, key: &str) -> T {
        self.try_get(key).unwrap_or_default()
    }

    /// Read the value stored under `key`.
    ///
    /// Returns `None` and logs a warning when the key is missing or holds a
    /// value of another type.
    pub fn try_get<T: Any + Clone>(&self, key: &str) -> Option<T> {
        let Some(value) = self.entries.get(key) else {
            warn!(key, "blackboard entry not found");
            return None;
        };

        match value.downcast_ref::<T>() {
            Some(value) => Some(value.clone()),
            None => {
                warn!(
                    key,
                    expected = type_name::<T>(),
                    "blackboard entry holds a different type"
                );
                None
            }
        }
    }

    pub fn contains(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    /// Remove `key`, returning whether it was present.
    pub fn remove(&mut self, key: &str) -> bool {
        self.entries.remove(key).is_some()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl fmt::Debug for Blackboard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut keys: Vec<&str> = self.entries.keys().map(String::as_str).collect();
        keys.sort_unstable();
        f.debug_struct("Blackboard").field("keys", &keys).finish()
    }
}
