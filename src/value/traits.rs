//! value::traits
//!
//! The `LensValue` and `PersistableValue` capability contracts.

use serde::de::DeserializeOwned;
use serde::Serialize;

/// An immutable, copyable value addressable by string keys.
///
/// Implementations must treat `self` as frozen: [`LensValue::with_value`]
/// returns a fresh value and leaves the receiver untouched. Deep structural
/// equality (`PartialEq`) is required so stores and tests can compare whole
/// subtrees.
///
/// # Contract
///
/// - `get` with an unknown key returns `None`, never an error.
/// - `with_value(Some(v), key)` returns a copy with the child at `key`
///   replaced by `v`.
/// - `with_value(None, key)` returns a copy with the child at `key` removed.
/// - A leaf (a value that cannot hold children) returns `None` from `get`
///   and returns itself unchanged from `with_value`.
///
/// # Example
///
/// ```
/// use keylens::value::LensValue;
/// use serde_json::json;
///
/// // serde_json::Value has an inherent `get`; qualify the call to reach
/// // the trait method.
/// let person = json!({"name": "Ada", "age": 36});
/// assert_eq!(LensValue::get(&person, "name"), Some(json!("Ada")));
/// assert_eq!(LensValue::get(&person, "email"), None);
///
/// let older = person.with_value(Some(json!(37)), "age");
/// assert_eq!(LensValue::get(&older, "age"), Some(json!(37)));
/// assert_eq!(LensValue::get(&person, "age"), Some(json!(36)));
/// ```
pub trait LensValue: Clone + PartialEq + Send + Sync + 'static {
    /// Structural read of the child at `key`.
    ///
    /// Returns `None` if the value has no such child or cannot hold
    /// children at all.
    fn get(&self, key: &str) -> Option<Self>;

    /// Copy-on-write replacement of the child at `key`.
    ///
    /// `Some(value)` inserts or replaces the child; `None` removes it.
    /// The receiver is never mutated.
    fn with_value(&self, value: Option<Self>, key: &str) -> Self;
}

/// A [`LensValue`] with a lossless byte encoding.
///
/// The byte-oriented store backends serialize root values through serde,
/// so any serde-capable lens value is persistable. The blanket impl means
/// no type opts in manually.
pub trait PersistableValue: LensValue + Serialize + DeserializeOwned {}

impl<T> PersistableValue for T where T: LensValue + Serialize + DeserializeOwned {}
