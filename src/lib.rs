//! Keylens - path-addressed lenses over persisted immutable value graphs
//!
//! A lens is a read/write addressable view into one node of an immutable,
//! possibly nested value graph, backed by a pluggable persistence mechanism.
//! Consumers observe and atomically mutate a named subtree of a larger
//! settings/state object without holding a direct reference to that object,
//! and without races when independent lens instances address the same value.
//!
//! # Architecture
//!
//! The codebase follows a strict layered architecture:
//!
//! - [`value`] - Contracts for immutable, copyable domain values
//! - [`store`] - Atomic load/save/remove of one root value per storage
//! - [`lens`] - Path resolution, copy-on-write updates, change notification
//! - [`error`] - Crate-wide error type
//!
//! # Correctness Invariants
//!
//! Keylens maintains the following invariants:
//!
//! 1. Resolving a lens path never mutates the store
//! 2. All mutations flow through a single per-store critical section
//! 3. Saves are all-or-nothing - a failed update leaves the old value intact
//! 4. A successful update notifies the written path and every ancestor path
//!
//! # Example
//!
//! ```
//! use keylens::lens::MutableLens;
//! use serde_json::json;
//!
//! let settings = MutableLens::ephemeral(Some(json!({})));
//! let age = settings
//!     .at_with_default("profile", Some(json!({})))
//!     .at_with_default("age", Some(json!(0)));
//!
//! assert_eq!(age.value(), Some(json!(0)));
//! age.update_value(Some(json!(30))).unwrap();
//! assert_eq!(age.value(), Some(json!(30)));
//! assert_eq!(settings.at("profile").value(), Some(json!({"age": 30})));
//! ```

pub mod error;
pub mod lens;
pub mod store;
pub mod value;
