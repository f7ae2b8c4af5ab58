use std::collections::{BTreeMap, BTreeSet};
use std::sync::Mutex;

use super::ConfigStore;
use crate::error::StoreError;
use crate::setting::SettingValue;

/// In-process [`ConfigStore`].
///
/// Keys compare case-insensitively, like registry paths. Individual keys can
/// be marked read-only to simulate a non-elevated process, and individual
/// values can be marked unreadable. Every successful write and delete is
/// counted so callers can assert that nothing was touched.
#[derive(Debug, Default)]
pub struct MemoryStore {
    keys: Mutex<BTreeMap<String, BTreeMap<String, SettingValue>>>,
    denied: BTreeSet<String>,
    unreadable: BTreeSet<(String, String)>,
    mutations: Mutex<usize>,
}

fn norm(key: &str) -> String {
    key.to_ascii_lowercase()
}

impl MemoryStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty key.
    #[must_use]
    pub fn with_key(self, key: &str) -> Self {
        if let Ok(mut keys) = self.keys.lock() {
            keys.entry(norm(key)).or_default();
        }
        self
    }

    /// Seed a value (creates the key).
    #[must_use]
    pub fn with_value(self, key: &str, name: &str, value: SettingValue) -> Self {
        if let Ok(mut keys) = self.keys.lock() {
            keys.entry(norm(key))
                .or_default()
                .insert(name.to_string(), value);
        }
        self
    }

    /// Refuse writes and deletes under `key` with `PermissionDenied`.
    #[must_use]
    pub fn deny_writes(mut self, key: &str) -> Self {
        self.denied.insert(norm(key));
        self
    }

    /// Make reads of `key\name` fail with `Unreadable`.
    #[must_use]
    pub fn with_unreadable(mut self, key: &str, name: &str) -> Self {
        self.unreadable.insert((norm(key), name.to_string()));
        self
    }

    /// Current value without going through the trait.
    #[must_use]
    pub fn get(&self, key: &str, name: &str) -> Option<SettingValue> {
        self.keys
            .lock()
            .ok()?
            .get(&norm(key))?
            .get(name)
            .cloned()
    }

    /// Number of successful writes and deletes.
    #[must_use]
    pub fn mutation_count(&self) -> usize {
        self.mutations.lock().map_or(0, |m| *m)
    }

    fn check_writable(&self, key: &str, name: &str) -> Result<(), StoreError> {
        if self.denied.contains(&norm(key)) {
            return Err(StoreError::PermissionDenied {
                key: key.to_string(),
                name: name.to_string(),
            });
        }
        Ok(())
    }

    fn bump(&self) {
        if let Ok(mut m) = self.mutations.lock() {
            *m += 1;
        }
    }
}

impl ConfigStore for MemoryStore {
    fn name(&self) -> &'static str {
        "memory"
    }

    fn read(&self, key: &str, name: &str) -> Result<Option<SettingValue>, StoreError> {
        if self.unreadable.contains(&(norm(key), name.to_string())) {
            return Err(StoreError::Unreadable {
                key: key.to_string(),
                name: name.to_string(),
                reason: "unsupported value type".to_string(),
            });
        }
        let keys = self.keys.lock().map_err(|_| StoreError::Unreadable {
            key: key.to_string(),
            name: name.to_string(),
            reason: "store lock poisoned".to_string(),
        })?;
        let values = keys.get(&norm(key)).ok_or_else(|| StoreError::NotFound {
            key: key.to_string(),
            name: name.to_string(),
        })?;
        Ok(values.get(name).cloned())
    }

    fn write(&self, key: &str, name: &str, value: &SettingValue) -> Result<(), StoreError> {
        self.check_writable(key, name)?;
        if let Ok(mut keys) = self.keys.lock() {
            keys.entry(norm(key))
                .or_default()
                .insert(name.to_string(), value.clone());
        }
        self.bump();
        Ok(())
    }

    fn delete(&self, key: &str, name: &str) -> Result<(), StoreError> {
        self.check_writable(key, name)?;
        let removed = self
            .keys
            .lock()
            .ok()
            .and_then(|mut keys| keys.get_mut(&norm(key))?.remove(name));
        if removed.is_none() {
            return Err(StoreError::NotFound {
                key: key.to_string(),
                name: name.to_string(),
            });
        }
        self.bump();
        Ok(())
    }

    fn key_exists(&self, key: &str) -> bool {
        self.keys
            .lock()
            .is_ok_and(|keys| keys.contains_key(&norm(key)))
    }
}
