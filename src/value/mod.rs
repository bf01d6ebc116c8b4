//! value
//!
//! Contracts for the immutable domain values a lens addresses.
//!
//! # Architecture
//!
//! Values form a tree. A lens walks that tree by string keys, so every
//! node type must answer two questions: "what is your child at this key?"
//! ([`LensValue::get`]) and "what would you look like with this child
//! replaced?" ([`LensValue::with_value`]). Both are total - unknown keys
//! resolve to absence, never to errors - and neither ever mutates the
//! receiver.
//!
//! Persistable values additionally encode to and decode from bytes through
//! serde ([`PersistableValue`]), which is what the byte-oriented store
//! backends require.
//!
//! # Adapters
//!
//! - [`serde_json::Value`] is the built-in keyed-mapping adapter: objects
//!   expose their entries as children, every other shape is a leaf.
//! - Domain types implement [`LensValue`] explicitly per type, usually as an
//!   enum closed over the node shapes of the domain. No reflection.

mod json;
mod traits;

pub use traits::{LensValue, PersistableValue};
