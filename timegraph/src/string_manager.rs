//! Key → string table shared by the producer, the tracks and the serializer.
//!
//! The capture pipeline refers to strings (GPU timeline names, instrumented
//! string payloads) by a 64-bit key. The table is append-mostly: a key is
//! bound once and never rebound.

use parking_lot::RwLock;
use rustc_hash::{FxHashMap, FxHasher};
use std::hash::{Hash, Hasher};

#[derive(Debug, Default)]
pub struct StringManager {
    key_to_string: RwLock<FxHashMap<u64, String>>,
}

impl StringManager {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Key the producer side derives for `value`
    #[must_use]
    pub fn key_for(value: &str) -> u64 {
        let mut hasher = FxHasher::default();
        value.hash(&mut hasher);
        hasher.finish()
    }

    /// Bind `key` to `value` unless the key is already known.
    ///
    /// Returns true if the binding was inserted.
    pub fn add_if_not_present(&self, key: u64, value: impl Into<String>) -> bool {
        let mut map = self.key_to_string.write();
        if map.contains_key(&key) {
            return false;
        }
        map.insert(key, value.into());
        true
    }

    #[must_use]
    pub fn get(&self, key: u64) -> Option<String> {
        self.key_to_string.read().get(&key).cloned()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.key_to_string.read().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Copy of the whole table
    #[must_use]
    pub fn key_to_string_map(&self) -> FxHashMap<u64, String> {
        self.key_to_string.read().clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_binding_wins() {
        let strings = StringManager::new();
        assert!(strings.add_if_not_present(7, "gfx"));
        assert!(!strings.add_if_not_present(7, "sdma0"));
        assert_eq!(strings.get(7).as_deref(), Some("gfx"));
        assert_eq!(strings.get(8), None);
    }

    #[test]
    fn test_producer_key_binds_once() {
        let strings = StringManager::new();
        let key = StringManager::key_for("frame");
        assert_eq!(StringManager::key_for("frame"), key);
        assert!(strings.add_if_not_present(key, "frame"));
        assert!(!strings.add_if_not_present(key, "frame"));
        assert_eq!(strings.len(), 1);
    }
}
