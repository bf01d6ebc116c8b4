//! store::keychain
//!
//! Keychain-based byte backend using the OS keychain.
//!
//! # Platform Support
//!
//! This module uses the `keyring` crate which supports:
//! - macOS: Keychain
//! - Windows: Credential Manager
//! - Linux: Secret Service (via D-Bus)
//!
//! # Feature Flag
//!
//! This module is only available with the `keychain` feature flag:
//!
//! ```toml
//! keylens = { version = "0.1", features = ["keychain"] }
//! ```
//!
//! The keychain entry is addressed by a service identifier plus a value
//! key, with optional access-group scoping for platforms that share
//! entries between applications.

#[cfg(feature = "keychain")]
use keyring::Entry;

use super::traits::{StoreBackend, StoreError};

/// Keychain-based [`StoreBackend`].
///
/// Stores the value blob as a single keychain secret addressed by
/// (service, value key). Only available with the `keychain` feature.
///
/// # Example
///
/// ```ignore
/// use keylens::store::{KeychainBackend, StoreBackend};
///
/// let backend = KeychainBackend::new("com.example.app", "settings", None);
/// backend.save_bytes(b"{}")?;
/// ```
#[cfg(feature = "keychain")]
#[derive(Debug, Clone)]
pub struct KeychainBackend {
    /// Service identifier for the keychain entry.
    service: String,
    /// Account name identifying the value within the service.
    value_key: String,
    /// Optional access-group scoping, mapped to the platform target.
    access_group: Option<String>,
}

#[cfg(feature = "keychain")]
impl KeychainBackend {
    /// Create a backend addressing one keychain entry.
    pub fn new(
        service: impl Into<String>,
        value_key: impl Into<String>,
        access_group: Option<&str>,
    ) -> Self {
        Self {
            service: service.into(),
            value_key: value_key.into(),
            access_group: access_group.map(str::to_string),
        }
    }

    /// Service identifier.
    pub fn service(&self) -> &str {
        &self.service
    }

    /// Value key within the service.
    pub fn value_key(&self) -> &str {
        &self.value_key
    }

    /// Create the keyring entry for this backend.
    fn entry(&self) -> Result<Entry, StoreError> {
        let entry = match &self.access_group {
            Some(group) => Entry::new_with_target(group, &self.service, &self.value_key),
            None => Entry::new(&self.service, &self.value_key),
        };
        entry.map_err(|e| StoreError::System(format!("cannot create keyring entry: {}", e)))
    }
}

#[cfg(feature = "keychain")]
impl StoreBackend for KeychainBackend {
    fn save_bytes(&self, bytes: &[u8]) -> Result<(), StoreError> {
        let entry = self.entry()?;
        entry
            .set_secret(bytes)
            .map_err(|e| StoreError::System(format!("cannot write to keychain: {}", e)))
    }

    fn load_bytes(&self) -> Result<Option<Vec<u8>>, StoreError> {
        let entry = self.entry()?;

        match entry.get_secret() {
            Ok(bytes) => Ok(Some(bytes)),
            Err(keyring::Error::NoEntry) => Ok(None),
            Err(keyring::Error::Ambiguous(_)) => Err(StoreError::System(
                "ambiguous keychain entry".to_string(),
            )),
            Err(e) => Err(StoreError::System(format!(
                "cannot read from keychain: {}",
                e
            ))),
        }
    }

    fn remove_bytes(&self) -> Result<(), StoreError> {
        let entry = self.entry()?;

        match entry.delete_credential() {
            Ok(()) => Ok(()),
            Err(keyring::Error::NoEntry) => Ok(()), // Already gone, that's fine
            Err(e) => Err(StoreError::System(format!(
                "cannot delete from keychain: {}",
                e
            ))),
        }
    }
}

// Stub implementation when the keychain feature is disabled
#[cfg(not(feature = "keychain"))]
#[derive(Debug, Clone)]
pub struct KeychainBackend {
    _private: (),
}

#[cfg(not(feature = "keychain"))]
impl KeychainBackend {
    /// Create a keychain backend.
    ///
    /// Always fails when compiled without the `keychain` feature; the
    /// constructor shape is kept so callers get a runtime error instead of
    /// a missing symbol.
    pub fn new(
        _service: impl Into<String>,
        _value_key: impl Into<String>,
        _access_group: Option<&str>,
    ) -> Self {
        Self { _private: () }
    }
}

#[cfg(not(feature = "keychain"))]
impl StoreBackend for KeychainBackend {
    fn save_bytes(&self, _bytes: &[u8]) -> Result<(), StoreError> {
        Err(StoreError::System(
            "keychain support not enabled (compile with --features keychain)".into(),
        ))
    }

    fn load_bytes(&self) -> Result<Option<Vec<u8>>, StoreError> {
        Err(StoreError::System(
            "keychain support not enabled (compile with --features keychain)".into(),
        ))
    }

    fn remove_bytes(&self) -> Result<(), StoreError> {
        Err(StoreError::System(
            "keychain support not enabled (compile with --features keychain)".into(),
        ))
    }
}

#[cfg(all(test, feature = "keychain"))]
mod tests {
    use super::*;

    // Note: These tests interact with the real system keychain.
    // They use a unique service name to avoid conflicts.

    fn test_service() -> String {
        format!("keylens-test-{}", std::process::id())
    }

    fn cleanup_test_entry(service: &str, key: &str) {
        if let Ok(entry) = Entry::new(service, key) {
            let _ = entry.delete_credential();
        }
    }

    #[test]
    fn accessors() {
        let backend = KeychainBackend::new("svc", "key", None);
        assert_eq!(backend.service(), "svc");
        assert_eq!(backend.value_key(), "key");
    }

    #[test]
    fn load_nonexistent_returns_none() {
        let service = test_service();
        cleanup_test_entry(&service, "nonexistent");

        let backend = KeychainBackend::new(&service, "nonexistent", None);
        assert_eq!(backend.load_bytes().expect("load"), None);
    }

    #[test]
    fn save_load_remove() {
        let service = test_service();
        let key = "roundtrip";
        cleanup_test_entry(&service, key);

        let backend = KeychainBackend::new(&service, key, None);
        backend.save_bytes(b"payload").expect("save");
        assert_eq!(backend.load_bytes().expect("load"), Some(b"payload".to_vec()));

        backend.remove_bytes().expect("remove");
        assert_eq!(backend.load_bytes().expect("load after remove"), None);

        // Removing again is fine
        backend.remove_bytes().expect("remove again");
    }
}
