//! store::preferences
//!
//! Preferences-based byte backend.
//!
//! # Storage
//!
//! A [`Preferences`] handle names one keyed preferences document: a TOML
//! table of string keys to UTF-8 payload strings, by default at
//! `<config_dir>/keylens/preferences.toml`. Many stores can share a single
//! document, each owning one key - the moral equivalent of a per-user
//! defaults database.
//!
//! All rewrites of the document are atomic (temp file + rename) and
//! serialized in-process through the handle's mutex; handles are cheap to
//! clone and share.

use std::collections::BTreeMap;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};

use super::traits::{StoreBackend, StoreError};

/// A shared, keyed preferences document.
///
/// # Example
///
/// ```
/// use keylens::store::Preferences;
///
/// let dir = tempfile::tempdir().unwrap();
/// let prefs = Preferences::with_path(dir.path().join("preferences.toml"));
///
/// prefs.set("greeting", "hello").unwrap();
/// assert_eq!(prefs.get("greeting").unwrap(), Some("hello".to_string()));
/// ```
#[derive(Debug, Clone)]
pub struct Preferences {
    inner: Arc<PreferencesInner>,
}

#[derive(Debug)]
struct PreferencesInner {
    /// Path to the preferences document.
    path: PathBuf,
    /// Serializes in-process read-modify-write cycles on the document.
    guard: Mutex<()>,
}

impl Preferences {
    /// Open the standard per-user preferences document.
    ///
    /// Located at `<config_dir>/keylens/preferences.toml`.
    ///
    /// # Errors
    ///
    /// Returns an error if the user's config directory cannot be determined.
    pub fn standard() -> Result<Self, StoreError> {
        let config = dirs::config_dir()
            .ok_or_else(|| StoreError::System("cannot determine config directory".into()))?;
        Ok(Self::with_path(
            config.join("keylens").join("preferences.toml"),
        ))
    }

    /// Open a preferences document at a custom path.
    ///
    /// This is primarily useful for testing.
    pub fn with_path(path: impl Into<PathBuf>) -> Self {
        Self {
            inner: Arc::new(PreferencesInner {
                path: path.into(),
                guard: Mutex::new(()),
            }),
        }
    }

    /// Path to the preferences document.
    pub fn path(&self) -> &Path {
        &self.inner.path
    }

    /// Read the payload stored under `key`.
    pub fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let table = self.read_table()?;
        Ok(table.get(key).cloned())
    }

    /// Store `payload` under `key`, replacing any previous payload.
    pub fn set(&self, key: &str, payload: &str) -> Result<(), StoreError> {
        let _guard = self.inner.guard.lock().unwrap_or_else(PoisonError::into_inner);
        let mut table = self.read_table()?;
        table.insert(key.to_string(), payload.to_string());
        self.write_table(&table)
    }

    /// Remove the payload stored under `key`. Idempotent.
    pub fn remove(&self, key: &str) -> Result<(), StoreError> {
        let _guard = self.inner.guard.lock().unwrap_or_else(PoisonError::into_inner);
        let mut table = self.read_table()?;
        if table.remove(key).is_some() {
            self.write_table(&table)?;
        }
        Ok(())
    }

    fn read_table(&self) -> Result<BTreeMap<String, String>, StoreError> {
        if !self.inner.path.exists() {
            return Ok(BTreeMap::new());
        }

        let content = fs::read_to_string(&self.inner.path).map_err(|e| {
            StoreError::System(format!("cannot read preferences file: {}", e))
        })?;

        toml::from_str(&content)
            .map_err(|e| StoreError::Corrupted(format!("cannot parse preferences file: {}", e)))
    }

    fn write_table(&self, table: &BTreeMap<String, String>) -> Result<(), StoreError> {
        if let Some(parent) = self.inner.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).map_err(|e| {
                    StoreError::System(format!("cannot create directory: {}", e))
                })?;
            }
        }

        let content = toml::to_string_pretty(table).map_err(|e| {
            StoreError::System(format!("cannot serialize preferences: {}", e))
        })?;

        // Write to a temp file first for atomicity
        let temp_path = self.inner.path.with_extension("tmp");
        {
            let mut file = OpenOptions::new()
                .write(true)
                .create(true)
                .truncate(true)
                .open(&temp_path)
                .map_err(|e| StoreError::System(format!("cannot create temp file: {}", e)))?;

            file.write_all(content.as_bytes())
                .map_err(|e| StoreError::System(format!("cannot write preferences: {}", e)))?;

            file.sync_all()
                .map_err(|e| StoreError::System(format!("cannot sync to disk: {}", e)))?;
        }

        fs::rename(&temp_path, &self.inner.path)
            .map_err(|e| StoreError::System(format!("cannot rename temp file: {}", e)))
    }
}

/// Preferences-backed [`StoreBackend`] owning one key of a document.
///
/// Payload bytes must be valid UTF-8; the serde_json encoding used by
/// [`PersistentStore`](super::PersistentStore) always is.
#[derive(Debug, Clone)]
pub struct PreferencesBackend {
    preferences: Preferences,
    value_key: String,
}

impl PreferencesBackend {
    /// Bind one key of the given preferences document.
    pub fn new(preferences: Preferences, value_key: impl Into<String>) -> Self {
        Self {
            preferences,
            value_key: value_key.into(),
        }
    }

    /// The key this backend owns.
    pub fn value_key(&self) -> &str {
        &self.value_key
    }
}

impl StoreBackend for PreferencesBackend {
    fn save_bytes(&self, bytes: &[u8]) -> Result<(), StoreError> {
        let payload = std::str::from_utf8(bytes).map_err(|e| {
            StoreError::Corrupted(format!("preferences payload is not utf-8: {}", e))
        })?;
        self.preferences.set(&self.value_key, payload)
    }

    fn load_bytes(&self) -> Result<Option<Vec<u8>>, StoreError> {
        Ok(self
            .preferences
            .get(&self.value_key)?
            .map(String::into_bytes))
    }

    fn remove_bytes(&self) -> Result<(), StoreError> {
        self.preferences.remove(&self.value_key)
    }
}
