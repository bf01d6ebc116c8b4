//! lens
//!
//! Read and write handles into a keyed path of a stored value graph.
//!
//! # Architecture
//!
//! A [`Lens`] is an immutable handle: shared per-store state plus a key
//! path from the store's root value down to the addressed node, with an
//! optional default at each level. It resolves the current value lazily on
//! demand and exposes a change-notification stream. A [`MutableLens`] adds
//! copy-on-write updates that clone every ancestor up to the root and
//! persist the new root atomically.
//!
//! # Update propagation
//!
//! Updates propagate from children to parents: writing a node notifies the
//! lenses addressing that node and every ancestor of it, up to the root.
//! The opposite direction stays quiet, as do siblings - given a root with
//! subtrees `a` and `b`, writing `b.b2` notifies `b.b2`, `b`, and the
//! root, while `a` and everything under it hears nothing.
//!
//! # Concurrency
//!
//! All mutations on one store serialize through a single critical section
//! keyed by the store instance, spanning the whole load-transform-save
//! cycle. [`MutableLens::update_value_with`] runs its block inside that
//! section, so read-modify-write sequences (counters and the like) cannot
//! lose updates, even across independent lens instances on the same store.
//! Notifications are resolved and delivered before the section is left,
//! so each subscriber's channel orders emissions exactly like the
//! serialized write order; subscription itself is pinned inside the same
//! section, so no save can land between a subscriber's initial value and
//! its registration. The section is not reentrant: an update block must
//! not operate on lenses of the same store.
//!
//! # Read-path degradation
//!
//! Factory methods validate the store with one load and surface failures
//! as errors. After construction, [`Lens::value`] has no error channel:
//! a failing store degrades the read to the configured default (or
//! `None`). Write operations always surface errors.

mod path;
mod shared;
mod updates;

pub use updates::ValueUpdates;

use std::ops::Deref;
use std::path::PathBuf;
use std::sync::{Arc, PoisonError};

use path::Segment;
use shared::{state_for, StoreState};

use crate::error::LensError;
use crate::store::{
    EphemeralStore, FileBackend, KeychainBackend, PersistentStore, Preferences,
    PreferencesBackend, ValueStore,
};
use crate::value::{LensValue, PersistableValue};

/// Read-only handle to one node of a stored value graph.
///
/// Lenses are cheap to clone and hold no exclusive resource; the store
/// they wrap may outlive them and be shared by other lenses.
#[derive(Clone)]
pub struct Lens<V: LensValue> {
    state: Arc<StoreState<V>>,
    root_default: Option<V>,
    segments: Vec<Segment<V>>,
}

impl<V: LensValue> Lens<V> {
    /// Derive a lens for a child key, without a default value.
    ///
    /// Use this only when there is no default for the child, or when its
    /// subgraph will not be modified - a write through the derived lens
    /// cannot materialize missing ancestors without defaults.
    pub fn at(&self, key: impl Into<String>) -> Lens<V> {
        self.at_with_default(key, None)
    }

    /// Derive a lens for a child key with a default value.
    ///
    /// The default is used both as the resolved value while the child is
    /// absent and as the materialized node when a descendant is first
    /// written.
    pub fn at_with_default(&self, key: impl Into<String>, default: Option<V>) -> Lens<V> {
        let mut segments = self.segments.clone();
        segments.push(Segment {
            key: key.into(),
            default,
        });
        Lens {
            state: Arc::clone(&self.state),
            root_default: self.root_default.clone(),
            segments,
        }
    }

    /// The key path from the root to the addressed node.
    pub fn path(&self) -> Vec<&str> {
        self.segments.iter().map(|s| s.key.as_str()).collect()
    }

    /// Resolve the currently stored value at this path.
    ///
    /// Loads the root from the store and walks the key path. An absent
    /// node - or a store read failure - resolves to the configured default,
    /// or `None` when there is none. Resolution never mutates the store.
    pub fn value(&self) -> Option<V> {
        let root = self.state.store.load().unwrap_or(None);
        path::resolve_path(&root, &self.keys(), &self.leaf_default().cloned())
    }

    /// Subscribe to value changes at this path.
    ///
    /// The stream emits the currently resolved value immediately, then a
    /// new value after every successful save affecting this path or a
    /// descendant of it. Emissions happen synchronously on the thread that
    /// performed the triggering update.
    ///
    /// Registration runs inside the store's update section, so the initial
    /// emission and the saves delivered after it form a gapless sequence:
    /// no save can land between the initial resolution and registration.
    /// For the same reason this must not be called from inside an
    /// [`MutableLens::update_value_with`] block on the same store.
    pub fn value_updates(&self) -> ValueUpdates<V> {
        let (id, receiver) = {
            let _guard = self
                .state
                .update_lock
                .lock()
                .unwrap_or_else(PoisonError::into_inner);
            let current = self.value();
            self.state
                .observers
                .subscribe(self.keys(), self.leaf_default().cloned(), current)
        };
        ValueUpdates::new(id, Arc::downgrade(&self.state), receiver)
    }

    fn from_state(state: Arc<StoreState<V>>, root_default: Option<V>) -> Self {
        Self {
            state,
            root_default,
            segments: Vec::new(),
        }
    }

    fn keys(&self) -> Vec<String> {
        self.segments.iter().map(|s| s.key.clone()).collect()
    }

    /// Default for the addressed node itself.
    fn leaf_default(&self) -> Option<&V> {
        match self.segments.last() {
            Some(segment) => segment.default.as_ref(),
            None => self.root_default.as_ref(),
        }
    }

    /// Default for the node at `depth` keys below the root.
    fn default_at(&self, depth: usize) -> Option<&V> {
        if depth == 0 {
            self.root_default.as_ref()
        } else {
            self.segments[depth - 1].default.as_ref()
        }
    }
}

/// Read-write handle to one node of a stored value graph.
///
/// Dereferences to [`Lens`] for the read surface. All mutating operations
/// are atomic: they persist a freshly built root through the store's
/// all-or-nothing save, and a failure leaves the previously persisted
/// value unchanged and triggers no notifications.
#[derive(Clone)]
pub struct MutableLens<V: LensValue> {
    lens: Lens<V>,
}

impl<V: LensValue> std::fmt::Debug for MutableLens<V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MutableLens")
            .field("path", &self.lens.path())
            .finish_non_exhaustive()
    }
}

impl<V: LensValue> Deref for MutableLens<V> {
    type Target = Lens<V>;

    fn deref(&self) -> &Lens<V> {
        &self.lens
    }
}

impl<V: LensValue> MutableLens<V> {
    /// Create a lens over an in-memory store holding `initial`.
    pub fn ephemeral(initial: Option<V>) -> Self {
        let store: Arc<dyn ValueStore<V>> = Arc::new(EphemeralStore::new(initial));
        Self {
            lens: Lens::from_state(state_for(store), None),
        }
    }

    /// Create a lens over an explicitly supplied store.
    ///
    /// Validates the store by performing one load; a load failure is
    /// surfaced here instead of constructing the lens.
    ///
    /// `default` is the resolved value while the store is empty.
    pub fn with_store(
        default: Option<V>,
        store: Arc<dyn ValueStore<V>>,
    ) -> Result<Self, LensError> {
        store.load()?;
        Ok(Self {
            lens: Lens::from_state(state_for(store), default),
        })
    }

    /// Derive a mutable lens for a child key, without a default value.
    pub fn at(&self, key: impl Into<String>) -> MutableLens<V> {
        MutableLens {
            lens: self.lens.at(key),
        }
    }

    /// Derive a mutable lens for a child key with a default value.
    pub fn at_with_default(&self, key: impl Into<String>, default: Option<V>) -> MutableLens<V> {
        MutableLens {
            lens: self.lens.at_with_default(key, default),
        }
    }

    /// A read-only view of this lens.
    pub fn read_only(&self) -> Lens<V> {
        self.lens.clone()
    }

    /// Force a fresh load from the store, surfacing I/O errors.
    ///
    /// Lenses keep no cache, so this is primarily a health probe: it is
    /// the one post-construction way to learn that the store has become
    /// unreadable, since `value()` degrades silently.
    pub fn reset_value(&self) -> Result<(), LensError> {
        self.lens.state.store.load()?;
        Ok(())
    }

    /// Atomically replace the value at this path.
    ///
    /// Loads the current root, clones every ancestor with the new child
    /// inserted - materializing missing ancestors from their configured
    /// defaults - and persists the new root. Fails with
    /// [`LensError::Update`] if an ancestor is missing and has no default,
    /// or if an ancestor exists but is a leaf that cannot hold the child;
    /// fails with the store's error if persistence fails.
    ///
    /// A value structurally equal to the current one is written and
    /// notified like any other; redundant notifications are not
    /// suppressed.
    pub fn update_value(&self, value: Option<V>) -> Result<(), LensError> {
        self.write(move |_| Ok(value))
    }

    /// Atomically replace the value with one computed from the current.
    ///
    /// The block runs inside the store's exclusive critical section: no
    /// other writer can change the value between the block's read and the
    /// final save, even through independent lens instances on the same
    /// store. The block receives the currently resolved value (or the
    /// default while absent) and returns the replacement; a block error
    /// is passed through verbatim and nothing is written.
    ///
    /// This is the primitive for read-modify-write sequences such as
    /// counters.
    ///
    /// The critical section is not reentrant: the block must not mutate or
    /// subscribe through any lens on the same store, or it will deadlock.
    pub fn update_value_with<F>(&self, block: F) -> Result<(), LensError>
    where
        F: FnOnce(Option<V>) -> Result<Option<V>, LensError>,
    {
        self.write(block)
    }

    /// Remove the value at this path.
    ///
    /// Equivalent to `update_value(None)`. Afterwards resolution yields
    /// the configured default (or `None`). Idempotent: removing an
    /// already-absent value succeeds.
    pub fn remove_value(&self) -> Result<(), LensError> {
        self.write(|_| Ok(None))
    }

    /// The load-transform-save cycle every mutation goes through.
    ///
    /// Holds the per-store update lock across load, block, copy-on-write
    /// rebuild, save, and notification delivery. Delivery is a set of
    /// non-blocking channel sends, so keeping it under the lock cannot
    /// deadlock - and it pins each subscriber's emission order to the
    /// serialized write order.
    fn write<F>(&self, make: F) -> Result<(), LensError>
    where
        F: FnOnce(Option<V>) -> Result<Option<V>, LensError>,
    {
        let state = &self.lens.state;
        let keys = self.lens.keys();
        let ancestor_label = |depth: usize| {
            if depth == 0 {
                "<root>".to_string()
            } else {
                keys[..depth].join(".")
            }
        };

        let _guard = state
            .update_lock
            .lock()
            .unwrap_or_else(PoisonError::into_inner);

        let root = state.store.load()?;

        // Snapshot of the ancestor chain: chain[d] is the value at
        // depth d, chain[0] the root.
        let mut chain: Vec<Option<V>> = Vec::with_capacity(keys.len() + 1);
        chain.push(root);
        for key in &keys {
            let next = chain
                .last()
                .and_then(|value| value.as_ref())
                .and_then(|value| value.get(key));
            chain.push(next);
        }

        let current = chain[keys.len()]
            .clone()
            .or_else(|| self.lens.leaf_default().cloned());
        let mut child = make(current)?;

        // Rebuild bottom-up: insert the new child into a clone of its
        // parent, materializing absent parents from their defaults.
        let mut untouched = false;
        for depth in (0..keys.len()).rev() {
            let parent = chain[depth]
                .clone()
                .or_else(|| self.lens.default_at(depth).cloned());
            match parent {
                Some(parent) => {
                    let rebuilt = parent.with_value(child.clone(), &keys[depth]);
                    // A leaf parent hands itself back unchanged; reading
                    // the child back catches that before a silent save.
                    if LensValue::get(&rebuilt, &keys[depth]) != child {
                        return Err(LensError::Update(format!(
                            "cannot write below '{}' in '{}': value holds no children",
                            ancestor_label(depth),
                            keys.join(".")
                        )));
                    }
                    child = Some(rebuilt);
                }
                // Removing below a parent that never existed leaves
                // the root as it was.
                None if child.is_none() => {
                    untouched = true;
                    break;
                }
                None => {
                    return Err(LensError::Update(format!(
                        "cannot materialize missing ancestor '{}' of '{}': no default value",
                        ancestor_label(depth),
                        keys.join(".")
                    )));
                }
            }
        }

        let new_root = if untouched { chain.swap_remove(0) } else { child };
        state.store.save(new_root.as_ref())?;
        state.observers.emit(&keys, &new_root);
        Ok(())
    }
}

impl<V: PersistableValue> MutableLens<V> {
    /// Create a lens over a file-backed store.
    ///
    /// `default` is the resolved value while the file is absent or empty.
    /// Surfaces load and decode errors at construction.
    pub fn with_file(default: Option<V>, path: impl Into<PathBuf>) -> Result<Self, LensError> {
        let store: Arc<dyn ValueStore<V>> =
            Arc::new(PersistentStore::new(FileBackend::new(path)));
        Self::with_store(default, store)
    }

    /// Create a lens over a keychain-backed store.
    ///
    /// The value lives in the keychain entry addressed by `service` and
    /// `value_key`, optionally scoped to an access group. Requires the
    /// `keychain` cargo feature; without it construction fails with a
    /// system error.
    pub fn with_keychain(
        default: Option<V>,
        service: impl Into<String>,
        value_key: impl Into<String>,
        access_group: Option<&str>,
    ) -> Result<Self, LensError> {
        let backend = KeychainBackend::new(service, value_key, access_group);
        let store: Arc<dyn ValueStore<V>> = Arc::new(PersistentStore::new(backend));
        Self::with_store(default, store)
    }

    /// Create a lens over one key of a preferences document.
    pub fn with_preferences(
        default: Option<V>,
        preferences: Preferences,
        value_key: impl Into<String>,
    ) -> Result<Self, LensError> {
        let backend = PreferencesBackend::new(preferences, value_key);
        let store: Arc<dyn ValueStore<V>> = Arc::new(PersistentStore::new(backend));
        Self::with_store(default, store)
    }
}

#[cfg(test)]
mod tests {
    use serde_json::{json, Value};

    use super::*;

    #[test]
    fn empty_store_resolves_default() {
        let lens: MutableLens<Value> = MutableLens::ephemeral(None);
        let age = lens.at("profile").at_with_default("age", Some(json!(0)));
        assert_eq!(age.value(), Some(json!(0)));
    }

    #[test]
    fn empty_store_without_default_resolves_none() {
        let lens: MutableLens<Value> = MutableLens::ephemeral(None);
        assert_eq!(lens.at("anything").value(), None);
    }

    #[test]
    fn root_lens_update_and_read() {
        let lens = MutableLens::ephemeral(Some(json!({"a": 1})));
        lens.update_value(Some(json!({"a": 2}))).unwrap();
        assert_eq!(lens.value(), Some(json!({"a": 2})));
    }

    #[test]
    fn nested_update_clones_ancestors() {
        let lens = MutableLens::ephemeral(Some(json!({"a": {"x": 1}, "b": {"y": 2}})));
        lens.at("a").at("x").update_value(Some(json!(9))).unwrap();

        assert_eq!(
            lens.value(),
            Some(json!({"a": {"x": 9}, "b": {"y": 2}}))
        );
        // Sibling subtree is structurally untouched
        assert_eq!(lens.at("b").value(), Some(json!({"y": 2})));
    }

    #[test]
    fn missing_ancestors_materialize_from_defaults() {
        let store: Arc<dyn ValueStore<Value>> = Arc::new(EphemeralStore::new(None));
        let lens = MutableLens::with_store(Some(json!({})), store).unwrap();
        let age = lens
            .at_with_default("profile", Some(json!({})))
            .at_with_default("age", Some(json!(0)));

        age.update_value(Some(json!(30))).unwrap();
        assert_eq!(lens.at("profile").value(), Some(json!({"age": 30})));
    }

    #[test]
    fn update_below_leaf_parent_fails() {
        let lens = MutableLens::ephemeral(Some(json!(5)));
        let child = lens.at("a");

        let err = child.update_value(Some(json!(1))).unwrap_err();
        assert!(matches!(err, LensError::Update(_)));
        assert_eq!(lens.value(), Some(json!(5)));
        assert_eq!(child.value(), None);
    }

    #[test]
    fn update_below_nested_leaf_fails() {
        let lens = MutableLens::ephemeral(Some(json!({"a": 5})));
        let err = lens
            .at("a")
            .at("b")
            .update_value(Some(json!(1)))
            .unwrap_err();
        assert!(matches!(err, LensError::Update(_)));
        assert_eq!(lens.value(), Some(json!({"a": 5})));
    }

    #[test]
    fn remove_below_leaf_parent_is_noop_success() {
        let lens = MutableLens::ephemeral(Some(json!(5)));
        let child = lens.at("a");
        let mut updates = lens.value_updates();
        updates.recv().unwrap();

        child.remove_value().unwrap();
        assert_eq!(lens.value(), Some(json!(5)));
        assert_eq!(updates.try_recv(), Some(Some(json!(5))));
    }

    #[test]
    fn missing_ancestor_without_default_fails_update() {
        let lens: MutableLens<Value> = MutableLens::ephemeral(None);
        let err = lens
            .at("profile")
            .at("age")
            .update_value(Some(json!(30)))
            .unwrap_err();
        assert!(matches!(err, LensError::Update(_)));
        // Nothing was persisted
        assert_eq!(lens.value(), None);
    }

    #[test]
    fn remove_resolves_back_to_default() {
        let lens = MutableLens::ephemeral(Some(json!({"n": 5})));
        let n = lens.at_with_default("n", Some(json!(0)));

        n.remove_value().unwrap();
        assert_eq!(n.value(), Some(json!(0)));
        assert_eq!(lens.value(), Some(json!({})));
    }

    #[test]
    fn remove_under_absent_ancestors_is_noop_success() {
        let lens: MutableLens<Value> = MutableLens::ephemeral(None);
        lens.at("ghost").at("deeper").remove_value().unwrap();
        assert_eq!(lens.value(), None);
    }

    #[test]
    fn update_with_block_sees_current_value() {
        let lens = MutableLens::ephemeral(Some(json!({"count": 1})));
        let count = lens.at_with_default("count", Some(json!(0)));

        count
            .update_value_with(|current| {
                let n = current.and_then(|v| v.as_i64()).unwrap_or(0);
                Ok(Some(json!(n + 1)))
            })
            .unwrap();
        assert_eq!(count.value(), Some(json!(2)));
    }

    #[test]
    fn block_error_passes_through_and_writes_nothing() {
        let lens = MutableLens::ephemeral(Some(json!({"n": 1})));
        let err = lens
            .at("n")
            .update_value_with(|_| Err(LensError::Update("caller said no".into())))
            .unwrap_err();

        assert!(matches!(err, LensError::Update(ref msg) if msg == "caller said no"));
        assert_eq!(lens.value(), Some(json!({"n": 1})));
    }

    #[test]
    fn equal_value_save_still_notifies() {
        let lens = MutableLens::ephemeral(Some(json!({"n": 1})));
        let n = lens.at("n");
        let mut updates = n.value_updates();
        assert_eq!(updates.recv(), Some(Some(json!(1))));

        n.update_value(Some(json!(1))).unwrap();
        assert_eq!(updates.try_recv(), Some(Some(json!(1))));
    }

    #[test]
    fn updates_notify_ancestors_not_siblings() {
        let lens = MutableLens::ephemeral(Some(json!({"a": {"b": 1}, "z": 0})));
        let mut root_updates = lens.value_updates();
        let mut parent_updates = lens.at("a").value_updates();
        let mut leaf_updates = lens.at("a").at("b").value_updates();
        let mut sibling_updates = lens.at("z").value_updates();

        // Drain the subscription-time emissions
        root_updates.recv().unwrap();
        parent_updates.recv().unwrap();
        leaf_updates.recv().unwrap();
        sibling_updates.recv().unwrap();

        lens.at("a").at("b").update_value(Some(json!(2))).unwrap();

        assert_eq!(leaf_updates.try_recv(), Some(Some(json!(2))));
        assert_eq!(parent_updates.try_recv(), Some(Some(json!({"b": 2}))));
        assert_eq!(
            root_updates.try_recv(),
            Some(Some(json!({"a": {"b": 2}, "z": 0})))
        );
        assert_eq!(sibling_updates.try_recv(), None);
    }

    #[test]
    fn co_addressed_lenses_share_notifications() {
        let store: Arc<dyn ValueStore<Value>> =
            Arc::new(EphemeralStore::new(Some(json!({"n": 1}))));

        let writer = MutableLens::with_store(None, Arc::clone(&store)).unwrap();
        let watcher = MutableLens::with_store(None, store).unwrap();

        let mut updates = watcher.at("n").value_updates();
        assert_eq!(updates.recv(), Some(Some(json!(1))));

        writer.at("n").update_value(Some(json!(2))).unwrap();
        assert_eq!(updates.try_recv(), Some(Some(json!(2))));
    }

    #[test]
    fn reset_value_surfaces_store_errors() {
        struct BrokenStore;

        impl ValueStore<Value> for BrokenStore {
            fn load(&self) -> Result<Option<Value>, crate::store::StoreError> {
                Err(crate::store::StoreError::System("offline".into()))
            }
            fn save(&self, _: Option<&Value>) -> Result<(), crate::store::StoreError> {
                Err(crate::store::StoreError::System("offline".into()))
            }
            fn remove(&self) -> Result<(), crate::store::StoreError> {
                Err(crate::store::StoreError::System("offline".into()))
            }
        }

        // Construction surfaces the load failure
        let err = MutableLens::<Value>::with_store(None, Arc::new(BrokenStore)).unwrap_err();
        assert!(matches!(err, LensError::System(_)));
    }

    #[test]
    fn degraded_read_falls_back_to_default() {
        struct FlakyStore {
            healthy: std::sync::atomic::AtomicBool,
        }

        impl ValueStore<Value> for FlakyStore {
            fn load(&self) -> Result<Option<Value>, crate::store::StoreError> {
                if self.healthy.load(std::sync::atomic::Ordering::SeqCst) {
                    Ok(Some(json!({"n": 1})))
                } else {
                    Err(crate::store::StoreError::System("offline".into()))
                }
            }
            fn save(&self, _: Option<&Value>) -> Result<(), crate::store::StoreError> {
                Ok(())
            }
            fn remove(&self) -> Result<(), crate::store::StoreError> {
                Ok(())
            }
        }

        let store = Arc::new(FlakyStore {
            healthy: std::sync::atomic::AtomicBool::new(true),
        });
        let store_dyn: Arc<dyn ValueStore<Value>> = store.clone();
        let lens = MutableLens::with_store(None, store_dyn).unwrap();
        let n = lens.at_with_default("n", Some(json!(0)));
        assert_eq!(n.value(), Some(json!(1)));

        store
            .healthy
            .store(false, std::sync::atomic::Ordering::SeqCst);
        assert_eq!(n.value(), Some(json!(0)));
        assert!(matches!(lens.reset_value(), Err(LensError::System(_))));
    }
}
