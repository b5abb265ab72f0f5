//! EventEmitter<T>: typed synchronous fan-out for binding state changes.
//!
//! Every emission runs against a snapshot of the listener set taken under
//! the lock. A listener removed mid-emission still sees the current event;
//! one added mid-emission first hears the next. The lock is released before
//! any listener runs, so listeners may register, remove or emit again.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;

/// Handle for a registered listener.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ListenerId(u64);

type Listener<T> = Arc<dyn Fn(&T) + Send + Sync>;

pub struct EventEmitter<T> {
    /// Keyed by id, so emission order is registration order.
    listeners: Mutex<BTreeMap<ListenerId, Listener<T>>>,
    next_id: AtomicU64,
}

impl<T> EventEmitter<T> {
    pub fn new() -> Self {
        Self {
            listeners: Mutex::new(BTreeMap::new()),
            next_id: AtomicU64::new(0),
        }
    }

    pub fn on(&self, callback: impl Fn(&T) + Send + Sync + 'static) -> ListenerId {
        let id = ListenerId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.listeners.lock().insert(id, Arc::new(callback));
        id
    }

    /// Returns whether `id` was still registered.
    pub fn off(&self, id: ListenerId) -> bool {
        self.listeners.lock().remove(&id).is_some()
    }

    /// Deliver `event` to the current listeners; returns how many ran.
    pub fn emit(&self, event: &T) -> usize {
        let snapshot: Vec<Listener<T>> = self.listeners.lock().values().cloned().collect();
        for listener in &snapshot {
            listener(event);
        }
        snapshot.len()
    }

    pub fn size(&self) -> usize {
        self.listeners.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.listeners.lock().is_empty()
    }

    /// Drop every listener. Used when the owning binding stops.
    pub fn clear(&self) {
        self.listeners.lock().clear();
    }
}

impl<T> Default for EventEmitter<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> fmt::Debug for EventEmitter<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventEmitter")
            .field("listeners", &self.size())
            .finish()
    }
}
