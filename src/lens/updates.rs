//! lens::updates
//!
//! Change-notification stream: an explicit observer registry with
//! synchronous fan-out.
//!
//! # Design
//!
//! Each subscriber registers its path and default with the per-store
//! registry and receives values over an unbounded channel. On every
//! successful save, the writer resolves the new value for each observer
//! whose path is a prefix of the written path (the written node and all of
//! its ancestors) and delivers synchronously on its own thread, while it
//! still holds the store's update lock. Channel sends never block, so
//! holding the lock across delivery cannot deadlock - and it pins each
//! subscriber's emission order to the serialized write order. Sibling
//! paths stay quiet.
//!
//! A subscription deregisters itself on drop (RAII pattern). The stream
//! never terminates on its own; it ends when every lens on its store is
//! gone.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::mpsc::{channel, Receiver, Sender};
use std::sync::{Mutex, PoisonError, Weak};

use super::path::{is_path_prefix, resolve_path};
use super::shared::StoreState;
use crate::value::LensValue;

struct Observer<V> {
    id: u64,
    path: Vec<String>,
    default: Option<V>,
    sender: Sender<Option<V>>,
}

/// Registry of the observers subscribed to one store.
pub(crate) struct ObserverRegistry<V> {
    next_id: AtomicU64,
    observers: Mutex<Vec<Observer<V>>>,
}

impl<V: LensValue> ObserverRegistry<V> {
    pub fn new() -> Self {
        Self {
            next_id: AtomicU64::new(1),
            observers: Mutex::new(Vec::new()),
        }
    }

    /// Register an observer and emit its current value immediately.
    pub fn subscribe(
        &self,
        path: Vec<String>,
        default: Option<V>,
        current: Option<V>,
    ) -> (u64, Receiver<Option<V>>) {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let (sender, receiver) = channel();
        let _ = sender.send(current);

        let mut observers = self.lock();
        observers.push(Observer {
            id,
            path,
            default,
            sender,
        });
        (id, receiver)
    }

    pub fn unsubscribe(&self, id: u64) {
        self.lock().retain(|observer| observer.id != id);
    }

    /// Resolve and deliver the emissions triggered by a save at `affected`.
    ///
    /// Called while the writer still holds the update lock: the sends are
    /// unbounded and never block, and delivering before the lock is
    /// released keeps each subscriber's channel ordered exactly like the
    /// serialized write order. Dead subscribers are pruned in passing.
    pub fn emit(&self, affected: &[String], new_root: &Option<V>) {
        let mut observers = self.lock();
        observers.retain(|observer| {
            if !is_path_prefix(&observer.path, affected) {
                return true;
            }
            let value = resolve_path(new_root, &observer.path, &observer.default);
            observer.sender.send(value).is_ok()
        });
    }

    #[cfg(test)]
    pub(crate) fn observer_count(&self) -> usize {
        self.lock().len()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<Observer<V>>> {
        self.observers.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// A multicast stream of resolved values for one lens path.
///
/// Emits the currently resolved value immediately at subscription, then a
/// new value after every successful save that affects the path or one of
/// its descendants. `None` items mean the addressed value is absent and
/// the lens has no default.
///
/// # Example
///
/// ```
/// use keylens::lens::MutableLens;
/// use serde_json::json;
///
/// let lens = MutableLens::ephemeral(Some(json!({"n": 1}))).at("n");
/// let mut updates = lens.value_updates();
///
/// assert_eq!(updates.recv(), Some(Some(json!(1))));
/// lens.update_value(Some(json!(2))).unwrap();
/// assert_eq!(updates.recv(), Some(Some(json!(2))));
/// ```
pub struct ValueUpdates<V: LensValue> {
    id: u64,
    state: Weak<StoreState<V>>,
    receiver: Receiver<Option<V>>,
}

impl<V: LensValue> ValueUpdates<V> {
    pub(crate) fn new(id: u64, state: Weak<StoreState<V>>, receiver: Receiver<Option<V>>) -> Self {
        Self {
            id,
            state,
            receiver,
        }
    }

    /// Block until the next emission, `None` once the stream is closed.
    ///
    /// The stream closes when every lens on the underlying store has been
    /// dropped.
    pub fn recv(&mut self) -> Option<Option<V>> {
        self.receiver.recv().ok()
    }

    /// Take the next emission if one is already queued.
    pub fn try_recv(&mut self) -> Option<Option<V>> {
        self.receiver.try_recv().ok()
    }
}

impl<V: LensValue> Iterator for ValueUpdates<V> {
    type Item = Option<V>;

    fn next(&mut self) -> Option<Self::Item> {
        self.recv()
    }
}

impl<V: LensValue> Drop for ValueUpdates<V> {
    fn drop(&mut self) {
        if let Some(state) = self.state.upgrade() {
            state.observers.unsubscribe(self.id);
        }
    }
}
