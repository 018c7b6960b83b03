//! Reference cache: source URL to fully resolved schema document.

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

use serde_json::Value;

/// Shared cache of resolved documents.
///
/// Cloning the handle shares the underlying map. Entries are never evicted;
/// [`ReferenceCache::clear`] empties it. Stored documents are templates:
/// every read hands out a clone, so one cached document can be spliced into
/// several hosts without aliasing.
///
/// Two resolutions of the same URL racing each other both fetch; the first
/// one to finish is stored and the later insert is ignored.
#[derive(Debug, Clone, Default)]
pub struct ReferenceCache {
    entries: Arc<RwLock<HashMap<String, Value>>>,
}

impl ReferenceCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// A copy of the resolved document for `url`, if one is stored.
    pub fn get(&self, url: &str) -> Option<Value> {
        let entries = self.entries.read().unwrap_or_else(PoisonError::into_inner);
        entries.get(url).cloned()
    }

    pub fn contains(&self, url: &str) -> bool {
        let entries = self.entries.read().unwrap_or_else(PoisonError::into_inner);
        entries.contains_key(url)
    }

    /// Store `document` for `url`. Returns false if an entry already existed,
    /// in which case the existing entry is kept.
    pub fn insert(&self, url: &str, document: Value) -> bool {
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        if entries.contains_key(url) {
            return false;
        }
        entries.insert(url.to_string(), document);
        true
    }

    /// Cached URLs, in no particular order.
    pub fn urls(&self) -> Vec<String> {
        let entries = self.entries.read().unwrap_or_else(PoisonError::into_inner);
        entries.keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        let entries = self.entries.read().unwrap_or_else(PoisonError::into_inner);
        entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drop every entry.
    pub fn clear(&self) {
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        entries.clear();
    }
}
