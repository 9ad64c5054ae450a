//! Key-value store shared by the steps of one run.

use crate::errors::ContextError;
use parking_lot::RwLock;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::collections::BTreeMap;

/// A thread-safe key-value store holding JSON values.
///
/// Values go in and come out through serde, so anything a step keeps here
/// survives a snapshot round trip.
#[derive(Debug, Default)]
pub struct ContextStore {
    data: RwLock<BTreeMap<String, serde_json::Value>>,
}

impl ContextStore {
    /// Creates a new empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store from existing data.
    #[must_use]
    pub fn from_map(data: BTreeMap<String, serde_json::Value>) -> Self {
        Self {
            data: RwLock::new(data),
        }
    }

    /// Gets a typed value. Returns `Ok(None)` if the key is absent.
    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, ContextError> {
        let Some(value) = self.get_value(key) else {
            return Ok(None);
        };
        serde_json::from_value(value)
            .map(Some)
            .map_err(|source| ContextError::Serialization {
                key: key.to_string(),
                source,
            })
    }

    /// Gets a typed value, falling back to `default` when the key is absent.
    pub fn get_or<T: DeserializeOwned>(&self, key: &str, default: T) -> Result<T, ContextError> {
        Ok(self.get(key)?.unwrap_or(default))
    }

    /// Gets a typed value that must be present.
    pub fn require<T: DeserializeOwned>(&self, key: &str) -> Result<T, ContextError> {
        self.get(key)?
            .ok_or_else(|| ContextError::MissingKey(key.to_string()))
    }

    /// Gets the raw JSON value.
    #[must_use]
    pub fn get_value(&self, key: &str) -> Option<serde_json::Value> {
        self.data.read().get(key).cloned()
    }

    /// Sets a typed value, overwriting any previous one.
    pub fn set<T: Serialize + ?Sized>(&self, key: impl Into<String>, value: &T) -> Result<(), ContextError> {
        let key = key.into();
        let value = serde_json::to_value(value).map_err(|source| ContextError::Serialization {
            key: key.clone(),
            source,
        })?;
        self.data.write().insert(key, value);
        Ok(())
    }

    /// Sets a raw JSON value.
    pub fn set_value(&self, key: impl Into<String>, value: serde_json::Value) {
        self.data.write().insert(key.into(), value);
    }

    /// Removes a key, returning its previous value.
    pub fn remove(&self, key: &str) -> Option<serde_json::Value> {
        self.data.write().remove(key)
    }

    /// Checks if a key exists.
    #[must_use]
    pub fn contains_key(&self, key: &str) -> bool {
        self.data.read().contains_key(key)
    }

    /// Returns all keys in sorted order.
    #[must_use]
    pub fn keys(&self) -> Vec<String> {
        self.data.read().keys().cloned().collect()
    }

    /// Returns the number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.data.read().len()
    }

    /// Returns true if the store is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.data.read().is_empty()
    }

    /// Returns a copy of all data.
    #[must_use]
    pub fn to_map(&self) -> BTreeMap<String, serde_json::Value> {
        self.data.read().clone()
    }

    /// Consumes the store and returns its data.
    #[must_use]
    pub fn into_map(self) -> BTreeMap<String, serde_json::Value> {
        self.data.into_inner()
    }
}

impl Clone for ContextStore {
    fn clone(&self) -> Self {
        Self::from_map(self.to_map())
    }
}
