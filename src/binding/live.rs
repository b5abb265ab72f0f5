//! LiveValue<T>: the generation-guarded cell behind the smaller bindings.
//!
//! Same discipline as the query binding, minus fingerprints: `begin` bumps
//! the generation and releases whatever the previous round subscribed,
//! `install` keeps a new handle only if its round is still current, and
//! `update` applies a delivery only if its generation is current.

use std::sync::Arc;

use parking_lot::Mutex;

use crate::reactive::EventEmitter;
use crate::types::Unsubscribe;

struct LiveInner<T> {
    value: T,
    generation: u64,
    stopped: bool,
    handles: Vec<Unsubscribe>,
}

pub(crate) struct LiveValue<T> {
    inner: Mutex<LiveInner<T>>,
    emitter: EventEmitter<T>,
}

impl<T: Clone + Send + Sync + 'static> LiveValue<T> {
    pub(crate) fn new(value: T) -> Self {
        Self {
            inner: Mutex::new(LiveInner {
                value,
                generation: 0,
                stopped: false,
                handles: Vec::new(),
            }),
            emitter: EventEmitter::new(),
        }
    }

    pub(crate) fn get(&self) -> T {
        self.inner.lock().value.clone()
    }

    pub(crate) fn generation(&self) -> u64 {
        self.inner.lock().generation
    }

    /// Whether round `generation` is still the live one. `begin` emits the
    /// seed to listeners, which may start a newer round or stop the value;
    /// callers check this before subscribing.
    pub(crate) fn is_current(&self, generation: u64) -> bool {
        let inner = self.inner.lock();
        !inner.stopped && inner.generation == generation
    }

    /// Start a new round: release the previous round's handles, optionally
    /// reseed the value, and return the new generation. `None` once stopped.
    pub(crate) fn begin(&self, seed: Option<T>) -> Option<u64> {
        let (previous, generation, value) = {
            let mut inner = self.inner.lock();
            if inner.stopped {
                return None;
            }
            inner.generation += 1;
            let reseeded = seed.is_some();
            if let Some(seed) = seed {
                inner.value = seed;
            }
            let value = reseeded.then(|| inner.value.clone());
            (std::mem::take(&mut inner.handles), inner.generation, value)
        };
        for release in previous {
            release();
        }
        if let Some(value) = value {
            self.emitter.emit(&value);
        }
        Some(generation)
    }

    /// Keep `handle` for round `generation`, or release it right away if the
    /// round is over.
    pub(crate) fn install(&self, generation: u64, handle: Unsubscribe) {
        let stale = {
            let mut inner = self.inner.lock();
            if inner.stopped || inner.generation != generation {
                Some(handle)
            } else {
                inner.handles.push(handle);
                None
            }
        };
        if let Some(release) = stale {
            release();
        }
    }

    /// Apply `f` if `generation` is current. Returns whether it was applied.
    pub(crate) fn update(&self, generation: u64, f: impl FnOnce(&mut T)) -> bool {
        let value = {
            let mut inner = self.inner.lock();
            if inner.stopped || inner.generation != generation {
                tracing::trace!(generation, current = inner.generation, "dropping stale delivery");
                return false;
            }
            f(&mut inner.value);
            inner.value.clone()
        };
        self.emitter.emit(&value);
        true
    }

    pub(crate) fn on_change(
        self: &Arc<Self>,
        callback: impl Fn(&T) + Send + Sync + 'static,
    ) -> Unsubscribe {
        let id = self.emitter.on(callback);
        let weak = Arc::downgrade(self);
        Box::new(move || {
            if let Some(live) = weak.upgrade() {
                live.emitter.off(id);
            }
        })
    }

    pub(crate) fn is_stopped(&self) -> bool {
        self.inner.lock().stopped
    }

    /// Release everything and refuse further updates. Idempotent.
    pub(crate) fn stop(&self) {
        let handles = {
            let mut inner = self.inner.lock();
            if inner.stopped {
                return;
            }
            inner.stopped = true;
            inner.generation += 1;
            std::mem::take(&mut inner.handles)
        };
        for release in handles {
            release();
        }
        self.emitter.clear();
    }
}
