//! lens::shared
//!
//! Per-store shared state and its process-wide interning table.
//!
//! # Design
//!
//! Every mutation on a store must pass through one exclusive critical
//! section keyed by that store instance - not by path - because any update
//! may read-modify-write the whole root. Likewise, lenses over the same
//! store must share one observer registry so co-addressed lenses observe
//! each other's mutations.
//!
//! Both live in [`StoreState`]. States are interned in a process-wide table
//! keyed by store instance identity (the `Arc` allocation address), so
//! independently constructed lenses over the same store handle end up on
//! the same lock and registry. Entries are weak; a state dies with its last
//! lens and dead entries are swept on the next interning.
//!
//! Cross-process exclusivity is the store backend's job (the file backend
//! holds an OS-level lock around writes); this table only serializes
//! writers within the process.

use std::any::Any;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, OnceLock, PoisonError, Weak};

use super::updates::ObserverRegistry;
use crate::store::ValueStore;
use crate::value::LensValue;

/// State shared by every lens addressing one store instance.
pub(crate) struct StoreState<V: LensValue> {
    /// The store itself.
    pub store: Arc<dyn ValueStore<V>>,
    /// Critical section serializing load-transform-save cycles.
    pub update_lock: Mutex<()>,
    /// Observers subscribed to paths under this store.
    pub observers: ObserverRegistry<V>,
}

/// Type-erased table entry; the value type is recovered by downcast.
trait InternEntry: Send {
    fn alive(&self) -> bool;
    fn as_any(&self) -> &dyn Any;
}

impl<V: LensValue> InternEntry for Weak<StoreState<V>> {
    fn alive(&self) -> bool {
        self.strong_count() > 0
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

static INTERNED: OnceLock<Mutex<HashMap<usize, Box<dyn InternEntry>>>> = OnceLock::new();

/// Shared state for the given store instance, creating it on first use.
///
/// Two calls with clones of the same `Arc` return the same state. A
/// recycled allocation address cannot collide: the old entry dies with its
/// state and is swept or replaced here.
pub(crate) fn state_for<V: LensValue>(store: Arc<dyn ValueStore<V>>) -> Arc<StoreState<V>> {
    let key = Arc::as_ptr(&store) as *const () as usize;

    let table = INTERNED.get_or_init(|| Mutex::new(HashMap::new()));
    let mut table = table.lock().unwrap_or_else(PoisonError::into_inner);
    table.retain(|_, entry| entry.alive());

    if let Some(state) = table
        .get(&key)
        .and_then(|entry| entry.as_any().downcast_ref::<Weak<StoreState<V>>>())
        .and_then(Weak::upgrade)
    {
        return state;
    }

    let state = Arc::new(StoreState {
        store,
        update_lock: Mutex::new(()),
        observers: ObserverRegistry::new(),
    });
    table.insert(key, Box::new(Arc::downgrade(&state)));
    state
}

#[cfg(test)]
mod tests {
    use serde_json::{json, Value};

    use super::*;
    use crate::store::EphemeralStore;

    #[test]
    fn same_store_instance_interns_to_same_state() {
        let store: Arc<dyn ValueStore<Value>> = Arc::new(EphemeralStore::new(Some(json!(1))));
        let first = state_for(Arc::clone(&store));
        let second = state_for(store);
        assert!(Arc::ptr_eq(&first, &second));
    }

    #[test]
    fn distinct_store_instances_get_distinct_states() {
        let a: Arc<dyn ValueStore<Value>> = Arc::new(EphemeralStore::new(None));
        let b: Arc<dyn ValueStore<Value>> = Arc::new(EphemeralStore::new(None));
        let state_a = state_for(a);
        let state_b = state_for(b);
        assert!(!Arc::ptr_eq(&state_a, &state_b));
    }

    #[test]
    fn dead_states_are_swept() {
        let store: Arc<dyn ValueStore<Value>> = Arc::new(EphemeralStore::new(None));
        let state = state_for(Arc::clone(&store));
        let weak = Arc::downgrade(&state);
        drop(state);
        assert!(weak.upgrade().is_none());

        // A fresh request builds a fresh state rather than resurrecting
        let fresh = state_for(store);
        assert_eq!(fresh.observers.observer_count(), 0);
    }
}
