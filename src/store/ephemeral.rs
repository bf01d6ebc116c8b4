//! store::ephemeral
//!
//! In-memory value store.
//!
//! Holds the root value in a mutex-guarded slot with no byte boundary at
//! all. Useful for tests and for lens consumers that want lens semantics
//! (copy-on-write, notifications, exclusion) without persistence.

use std::sync::{Mutex, PoisonError};

use super::traits::{StoreError, ValueStore};
use crate::value::LensValue;

/// An in-memory [`ValueStore`].
///
/// # Example
///
/// ```
/// use keylens::store::{EphemeralStore, ValueStore};
/// use serde_json::json;
///
/// let store = EphemeralStore::new(Some(json!({"a": 1})));
/// assert_eq!(store.load().unwrap(), Some(json!({"a": 1})));
/// ```
#[derive(Debug)]
pub struct EphemeralStore<V> {
    value: Mutex<Option<V>>,
}

impl<V: LensValue> EphemeralStore<V> {
    /// Create a store holding the given initial value.
    pub fn new(value: Option<V>) -> Self {
        Self {
            value: Mutex::new(value),
        }
    }
}

impl<V: LensValue> ValueStore<V> for EphemeralStore<V> {
    fn load(&self) -> Result<Option<V>, StoreError> {
        let slot = self.value.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(slot.clone())
    }

    fn save(&self, value: Option<&V>) -> Result<(), StoreError> {
        let mut slot = self.value.lock().unwrap_or_else(PoisonError::into_inner);
        *slot = value.cloned();
        Ok(())
    }

    fn remove(&self) -> Result<(), StoreError> {
        self.save(None)
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn initial_value_is_loadable() {
        let store = EphemeralStore::new(Some(json!(7)));
        assert_eq!(store.load().unwrap(), Some(json!(7)));
    }

    #[test]
    fn starts_empty_without_initial_value() {
        let store: EphemeralStore<serde_json::Value> = EphemeralStore::new(None);
        assert_eq!(store.load().unwrap(), None);
    }

    #[test]
    fn save_replaces_and_remove_clears() {
        let store = EphemeralStore::new(Some(json!(1)));

        store.save(Some(&json!(2))).unwrap();
        assert_eq!(store.load().unwrap(), Some(json!(2)));

        store.remove().unwrap();
        assert_eq!(store.load().unwrap(), None);

        // Removing again is fine
        store.remove().unwrap();
    }
}
