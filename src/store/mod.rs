//! store
//!
//! Persistence abstraction: atomic load/save/remove of one root value.
//!
//! # Architecture
//!
//! Values reach durable storage through the [`ValueStore`] trait, which has
//! multiple implementations:
//!
//! - [`EphemeralStore`]: in-memory, no byte boundary (default for tests)
//! - [`PersistentStore`]: serde boundary around any [`StoreBackend`]
//!
//! Byte-oriented backends implement only the three [`StoreBackend`]
//! primitives:
//!
//! - [`FileBackend`]: one blob per file, atomic rename + fs2 lock
//! - [`KeychainBackend`]: OS keychain entry (feature-gated)
//! - [`PreferencesBackend`]: one key of a shared [`Preferences`] document
//!
//! # Atomicity
//!
//! Every store follows the all-or-nothing rule: an interrupted or failed
//! save leaves the previously persisted value untouched, and a reader never
//! observes a half-written state.

mod ephemeral;
mod file;
mod keychain;
mod persistent;
mod preferences;
mod traits;

pub use ephemeral::EphemeralStore;
pub use file::FileBackend;
pub use keychain::KeychainBackend;
pub use persistent::PersistentStore;
pub use preferences::{Preferences, PreferencesBackend};
pub use traits::{StoreBackend, StoreError, ValueStore};
