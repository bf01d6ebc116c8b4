//! store::persistent
//!
//! Serialization boundary between values and byte-oriented backends.
//!
//! `PersistentStore` implements [`ValueStore`] on top of any
//! [`StoreBackend`]: it encodes values with serde_json before handing the
//! bytes down, and decodes on the way up. A `save(None)` routes to the
//! backend's `remove_bytes`. Absent or empty bytes load as `Ok(None)`;
//! bytes that fail to decode are reported as [`StoreError::Corrupted`].

use std::marker::PhantomData;

use super::traits::{StoreBackend, StoreError, ValueStore};
use crate::value::PersistableValue;

/// A [`ValueStore`] wrapping a byte-oriented backend.
///
/// # Example
///
/// ```
/// use keylens::store::{FileBackend, PersistentStore, ValueStore};
/// use serde_json::{json, Value};
///
/// let dir = tempfile::tempdir().unwrap();
/// let store: PersistentStore<_, Value> =
///     PersistentStore::new(FileBackend::new(dir.path().join("root.json")));
///
/// assert_eq!(store.load().unwrap(), None);
/// store.save(Some(&json!({"a": 1}))).unwrap();
/// assert_eq!(store.load().unwrap(), Some(json!({"a": 1})));
/// ```
#[derive(Debug)]
pub struct PersistentStore<B, V> {
    backend: B,
    _value: PhantomData<fn() -> V>,
}

impl<B: StoreBackend, V: PersistableValue> PersistentStore<B, V> {
    /// Wrap the given backend.
    pub fn new(backend: B) -> Self {
        Self {
            backend,
            _value: PhantomData,
        }
    }

    /// Access the wrapped backend.
    pub fn backend(&self) -> &B {
        &self.backend
    }
}

impl<B: StoreBackend, V: PersistableValue> ValueStore<V> for PersistentStore<B, V> {
    fn load(&self) -> Result<Option<V>, StoreError> {
        let bytes = match self.backend.load_bytes()? {
            None => return Ok(None),
            Some(bytes) if bytes.is_empty() => return Ok(None),
            Some(bytes) => bytes,
        };
        let value = serde_json::from_slice(&bytes)
            .map_err(|e| StoreError::Corrupted(format!("cannot decode stored value: {}", e)))?;
        Ok(Some(value))
    }

    fn save(&self, value: Option<&V>) -> Result<(), StoreError> {
        match value {
            Some(value) => {
                let bytes = serde_json::to_vec(value).map_err(|e| {
                    StoreError::Corrupted(format!("cannot encode value: {}", e))
                })?;
                self.backend.save_bytes(&bytes)
            }
            None => self.backend.remove_bytes(),
        }
    }

    fn remove(&self) -> Result<(), StoreError> {
        self.backend.remove_bytes()
    }
}
