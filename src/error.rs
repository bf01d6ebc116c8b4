//! error
//!
//! Crate-wide error type for lens operations.
//!
//! # Design
//!
//! Three error kinds cover the whole surface:
//!
//! - [`LensError::System`] - I/O failure in a store backend
//! - [`LensError::Update`] - a mutation could not be applied (missing
//!   ancestor without a default, or a caller-supplied update block failed)
//! - [`LensError::Internal`] - persisted bytes do not satisfy the value
//!   contract (data corruption)
//!
//! Factory methods and write operations surface these errors explicitly.
//! The read path never does: once a lens is constructed, a failing store
//! degrades reads to the configured default (or `None`) instead of erroring.
//! That asymmetry is intentional - observers should not crash on transient
//! read trouble, while writers must be able to branch on failure.

use thiserror::Error;

use crate::store::StoreError;

/// Errors from lens construction and mutation.
#[derive(Debug, Error)]
pub enum LensError {
    /// I/O failure in a store backend.
    #[error("system error: {0}")]
    System(String),

    /// A mutation could not be applied.
    ///
    /// Either an ancestor of the written path is absent and has no default
    /// value to materialize it from, or a caller-supplied update block
    /// reported failure.
    #[error("update error: {0}")]
    Update(String),

    /// Persisted bytes do not satisfy the value contract.
    #[error("internal error: {0}")]
    Internal(String),
}

impl From<StoreError> for LensError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::System(msg) => LensError::System(msg),
            StoreError::Corrupted(msg) => LensError::Internal(msg),
        }
    }
}
