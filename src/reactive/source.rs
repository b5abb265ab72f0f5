//! Source<T>: a shared reactive cell.
//!
//! A `Source` is the input side of every binding: bindings read it when they
//! evaluate and `watch` it to re-evaluate after a write. Clones share the
//! same cell and the same watchers.

use std::fmt;
use std::sync::Arc;

use parking_lot::Mutex;

use super::emitter::EventEmitter;
use crate::types::Unsubscribe;

struct Cell<T> {
    value: Mutex<T>,
    watchers: EventEmitter<T>,
}

pub struct Source<T> {
    cell: Arc<Cell<T>>,
}

impl<T: Clone + Send + Sync + 'static> Source<T> {
    pub fn new(value: T) -> Self {
        Self {
            cell: Arc::new(Cell {
                value: Mutex::new(value),
                watchers: EventEmitter::new(),
            }),
        }
    }

    /// Current value (cloned).
    pub fn get(&self) -> T {
        self.cell.value.lock().clone()
    }

    /// Borrow the current value without cloning it. `f` runs under the
    /// cell's lock and must not touch this source.
    pub fn with<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        f(&self.cell.value.lock())
    }

    /// Replace the value and notify watchers.
    pub fn set(&self, value: T) {
        self.set_quiet(value);
        self.notify();
    }

    /// Mutate a copy of the value, store it and notify watchers. `f` runs
    /// without the lock held, so it may read this source.
    pub fn update(&self, f: impl FnOnce(&mut T)) {
        let mut value = self.get();
        f(&mut value);
        self.set_quiet(value);
        self.notify();
    }

    /// Replace the value without notifying. Several quiet writes followed by
    /// one [`notify`](Self::notify) are observed as a single change.
    pub fn set_quiet(&self, value: T) {
        *self.cell.value.lock() = value;
    }

    /// Notify watchers with the current value.
    pub fn notify(&self) {
        let value = self.get();
        self.cell.watchers.emit(&value);
    }

    /// Call `callback` after every notified write. The returned closure
    /// removes the watcher.
    pub fn watch(&self, callback: impl Fn(&T) + Send + Sync + 'static) -> Unsubscribe {
        let id = self.cell.watchers.on(callback);
        let cell = Arc::clone(&self.cell);
        Box::new(move || {
            cell.watchers.off(id);
        })
    }

    pub fn watcher_count(&self) -> usize {
        self.cell.watchers.size()
    }
}

impl<T> Clone for Source<T> {
    fn clone(&self) -> Self {
        Self {
            cell: Arc::clone(&self.cell),
        }
    }
}

impl<T: Clone + Send + Sync + 'static> From<T> for Source<T> {
    fn from(value: T) -> Self {
        Source::new(value)
    }
}

impl<T: Clone + Send + Sync + Default + 'static> Default for Source<T> {
    fn default() -> Self {
        Source::new(T::default())
    }
}

impl<T: fmt::Debug> fmt::Debug for Source<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Source").field(&*self.cell.value.lock()).finish()
    }
}
