//! Persisted preferences.
//!
//! Preferences survive across pages in a key-value store as one JSON object
//! mapping preference identifier to the last selected option. Saving merges
//! into the stored record: keys belonging to other pages are never dropped,
//! whatever their value type.

use std::collections::HashMap;

use rw_prefs::SelectionMap;
use serde_json::{Map, Value};

/// Default storage key of the preference record.
pub const DEFAULT_STORAGE_KEY: &str = "content-prefs";

/// String key-value store (browser local storage or equivalent).
pub trait KeyValueStore {
    /// Read a value.
    fn get(&self, key: &str) -> Option<String>;

    /// Write a value.
    fn set(&mut self, key: &str, value: String);
}

/// In-memory [`KeyValueStore`].
#[derive(Debug, Default, Clone)]
pub struct MemoryStore {
    values: HashMap<String, String>,
}

impl MemoryStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style [`KeyValueStore::set`].
    #[must_use]
    pub fn with_value(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.values.insert(key.into(), value.into());
        self
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Option<String> {
        self.values.get(key).cloned()
    }

    fn set(&mut self, key: &str, value: String) {
        self.values.insert(key.to_owned(), value);
    }
}

/// The persisted preference record.
///
/// Entries that are not strings are kept verbatim so that saving never
/// drops keys written by other pages or tools.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct StoredPrefs {
    entries: Map<String, Value>,
}

impl StoredPrefs {
    /// String entries, usable as selection overrides.
    #[must_use]
    pub fn selections(&self) -> SelectionMap {
        self.entries
            .iter()
            .filter_map(|(k, v)| v.as_str().map(|v| (k.clone(), v.to_owned())))
            .collect()
    }

    /// Raw value of an entry.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.entries.get(key)
    }

    /// Number of entries, including non-string ones.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check whether the record has no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Overwrite entries with the given selection, keeping every other key.
    pub fn merge(&mut self, selections: &SelectionMap) {
        for (pref_id, value) in selections {
            self.entries.insert(pref_id.clone(), Value::String(value.clone()));
        }
    }
}

/// Read the stored preference record.
///
/// A missing record, or one that is not a JSON object, is treated as empty.
pub fn load_stored_prefs<K: KeyValueStore + ?Sized>(store: &K, key: &str) -> StoredPrefs {
    let Some(raw) = store.get(key) else {
        return StoredPrefs::default();
    };
    match serde_json::from_str(&raw) {
        Ok(entries) => StoredPrefs { entries },
        Err(e) => {
            tracing::warn!(key, error = %e, "Ignoring undecodable stored preferences");
            StoredPrefs::default()
        }
    }
}

/// Merge `selections` into `stored` and write the result back.
pub fn save_stored_prefs<K: KeyValueStore + ?Sized>(
    store: &mut K,
    key: &str,
    stored: &mut StoredPrefs,
    selections: &SelectionMap,
) {
    stored.merge(selections);
    match serde_json::to_string(&stored.entries) {
        Ok(json) => store.set(key, json),
        Err(e) => tracing::warn!(key, error = %e, "Failed to encode stored preferences"),
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn selection(pairs: &[(&str, &str)]) -> SelectionMap {
        pairs
            .iter()
            .map(|(k, v)| ((*k).to_owned(), (*v).to_owned()))
            .collect()
    }

    #[test]
    fn test_load_missing_record() {
        assert!(load_stored_prefs(&MemoryStore::new(), DEFAULT_STORAGE_KEY).is_empty());
    }

    #[test]
    fn test_load_record() {
        let store = MemoryStore::new().with_value(DEFAULT_STORAGE_KEY, r#"{"os":"mac"}"#);
        assert_eq!(
            load_stored_prefs(&store, DEFAULT_STORAGE_KEY).selections(),
            selection(&[("os", "mac")])
        );
    }

    #[test]
    fn test_load_undecodable_record_is_empty() {
        let store = MemoryStore::new()
            .with_value("a", "not json")
            .with_value("b", r#"["os", "mac"]"#);
        assert!(load_stored_prefs(&store, "a").is_empty());
        assert!(load_stored_prefs(&store, "b").is_empty());
    }

    #[test]
    fn test_load_mixed_record_uses_string_entries() {
        let store = MemoryStore::new().with_value(
            DEFAULT_STORAGE_KEY,
            r#"{"os":"mac","theme":{"dark":true},"size":3}"#,
        );
        let stored = load_stored_prefs(&store, DEFAULT_STORAGE_KEY);
        assert_eq!(stored.len(), 3);
        assert_eq!(stored.selections(), selection(&[("os", "mac")]));
    }

    #[test]
    fn test_save_merges_with_stored_record() {
        let mut store = MemoryStore::new().with_value(
            DEFAULT_STORAGE_KEY,
            r#"{"lang":"python","os":"linux"}"#,
        );
        let mut stored = load_stored_prefs(&store, DEFAULT_STORAGE_KEY);
        save_stored_prefs(
            &mut store,
            DEFAULT_STORAGE_KEY,
            &mut stored,
            &selection(&[("os", "mac")]),
        );

        let expected = selection(&[("lang", "python"), ("os", "mac")]);
        assert_eq!(stored.selections(), expected);
        assert_eq!(
            load_stored_prefs(&store, DEFAULT_STORAGE_KEY).selections(),
            expected
        );
    }

    #[test]
    fn test_save_keeps_non_string_entries() {
        let mut store = MemoryStore::new().with_value(
            DEFAULT_STORAGE_KEY,
            r#"{"lang":"python","theme":{"dark":true}}"#,
        );
        let mut stored = load_stored_prefs(&store, DEFAULT_STORAGE_KEY);
        save_stored_prefs(
            &mut store,
            DEFAULT_STORAGE_KEY,
            &mut stored,
            &selection(&[("os", "linux")]),
        );

        let reloaded = load_stored_prefs(&store, DEFAULT_STORAGE_KEY);
        assert_eq!(reloaded.get("theme"), Some(&serde_json::json!({"dark": true})));
        assert_eq!(
            reloaded.selections(),
            selection(&[("lang", "python"), ("os", "linux")])
        );
    }
}
