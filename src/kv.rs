//! Host key-value store seam.
//!
//! DESIGN
//! ======
//! The embedding host supplies a flat, synchronous string store (browser
//! `localStorage` or equivalent): size-limited, no transactions, no
//! namespacing. Everything above this trait must tolerate `set` refusing a
//! write — callers treat storage as best-effort cache, never as a database.

use std::collections::BTreeMap;
use std::sync::Mutex;

/// Flat string key-value store as provided by the embedding host.
///
/// Implementations must be infallible at the API level: a failed read is
/// `None`, a failed write returns `false`. Nothing here may panic.
pub trait KeyValueStore: Send + Sync {
    /// Read a value, `None` when absent or unreadable.
    fn get(&self, key: &str) -> Option<String>;

    /// Write a value. Returns `false` when the store refuses the write
    /// (quota exceeded, backend failure).
    fn set(&self, key: &str, value: &str) -> bool;

    /// Remove a key. Removing an absent key is a no-op.
    fn remove(&self, key: &str);

    /// Snapshot of all stored keys, used for prefix-scan clears.
    fn keys(&self) -> Vec<String>;
}

// =============================================================================
// IN-MEMORY STORE
// =============================================================================

/// In-memory [`KeyValueStore`] with an optional byte budget.
///
/// Used in tests and host-less embeddings. The byte budget emulates the
/// size-limited stores this crate targets: a write that would push the total
/// of keys + values past the budget is refused.
pub struct MemoryStore {
    entries: Mutex<BTreeMap<String, String>>,
    capacity_bytes: Option<usize>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self { entries: Mutex::new(BTreeMap::new()), capacity_bytes: None }
    }

    /// Store that refuses writes past a total byte budget.
    #[must_use]
    pub fn with_capacity_bytes(capacity_bytes: usize) -> Self {
        Self { entries: Mutex::new(BTreeMap::new()), capacity_bytes: Some(capacity_bytes) }
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Option<String> {
        let entries = self.entries.lock().ok()?;
        entries.get(key).cloned()
    }

    fn set(&self, key: &str, value: &str) -> bool {
        let Ok(mut entries) = self.entries.lock() else {
            return false;
        };
        if let Some(capacity) = self.capacity_bytes {
            let current: usize = entries
                .iter()
                .filter(|(k, _)| k.as_str() != key)
                .map(|(k, v)| k.len() + v.len())
                .sum();
            if current + key.len() + value.len() > capacity {
                return false;
            }
        }
        entries.insert(key.to_string(), value.to_string());
        true
    }

    fn remove(&self, key: &str) {
        if let Ok(mut entries) = self.entries.lock() {
            entries.remove(key);
        }
    }

    fn keys(&self) -> Vec<String> {
        self.entries
            .lock()
            .map(|entries| entries.keys().cloned().collect())
            .unwrap_or_default()
    }
}
