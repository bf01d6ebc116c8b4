//! store::traits
//!
//! Store trait definitions.
//!
//! # Design
//!
//! A store persists exactly one root value (or none). Modifications follow
//! an all-or-nothing rule: if a save fails, the previously persisted value
//! is left unchanged. `Ok(None)` from [`ValueStore::load`] means nobody has
//! persisted a value yet - absence is not an error.
//!
//! Byte-oriented backends do not implement [`ValueStore`] directly. They
//! implement the three primitives of [`StoreBackend`] and plug into
//! [`PersistentStore`](super::PersistentStore), which owns the
//! serialize/deserialize boundary.
//!
//! # Concurrency
//!
//! Implementations MUST:
//! - Be thread-safe (`Send + Sync`)
//! - Treat `save_bytes`/`remove_bytes` as atomic swaps, so a reader never
//!   observes a half-written state

use thiserror::Error;

/// Errors from store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// I/O failure in the underlying storage.
    #[error("store system error: {0}")]
    System(String),

    /// Persisted bytes could not be decoded into a value.
    #[error("store data corrupted: {0}")]
    Corrupted(String),
}

/// Atomic persistence of one root value.
///
/// # Example
///
/// ```
/// use keylens::store::{EphemeralStore, ValueStore};
/// use serde_json::json;
///
/// let store = EphemeralStore::new(Some(json!({"a": 1})));
/// assert_eq!(store.load().unwrap(), Some(json!({"a": 1})));
///
/// store.save(Some(&json!({"a": 2}))).unwrap();
/// assert_eq!(store.load().unwrap(), Some(json!({"a": 2})));
///
/// store.remove().unwrap();
/// assert_eq!(store.load().unwrap(), None);
/// ```
pub trait ValueStore<V>: Send + Sync {
    /// Load the current root value.
    ///
    /// Returns `Ok(None)` if nothing has been persisted yet.
    fn load(&self) -> Result<Option<V>, StoreError>;

    /// Persist the given root value atomically.
    ///
    /// `None` clears the store. On failure the previously persisted value
    /// must remain intact.
    fn save(&self, value: Option<&V>) -> Result<(), StoreError>;

    /// Remove the persisted value.
    ///
    /// Equivalent to `save(None)` at the byte-storage layer; kept distinct
    /// so backends can optimize deletion. Idempotent.
    fn remove(&self) -> Result<(), StoreError>;
}

/// The three byte primitives a persistent backend supplies.
///
/// Backends store an opaque blob and know nothing about its encoding.
pub trait StoreBackend: Send + Sync {
    /// Persist the given bytes atomically.
    fn save_bytes(&self, bytes: &[u8]) -> Result<(), StoreError>;

    /// Load the persisted bytes, `Ok(None)` if nothing is stored.
    fn load_bytes(&self) -> Result<Option<Vec<u8>>, StoreError>;

    /// Remove the persisted bytes. Idempotent.
    fn remove_bytes(&self) -> Result<(), StoreError>;
}

impl<B: StoreBackend + ?Sized> StoreBackend for std::sync::Arc<B> {
    fn save_bytes(&self, bytes: &[u8]) -> Result<(), StoreError> {
        (**self).save_bytes(bytes)
    }

    fn load_bytes(&self) -> Result<Option<Vec<u8>>, StoreError> {
        (**self).load_bytes()
    }

    fn remove_bytes(&self) -> Result<(), StoreError> {
        (**self).remove_bytes()
    }
}
