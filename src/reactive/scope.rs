//! Scope: owns cleanups and runs each of them exactly once.
//!
//! A scope stands in for a component's lifetime: bindings created for the
//! component are added to it, and disposing the scope (explicitly or by
//! dropping it) stops them all, newest first.

use std::sync::Arc;

use parking_lot::Mutex;

use crate::types::Unsubscribe;

/// Anything that can be stopped. Stopping twice must be harmless.
pub trait Disposable: Send + Sync {
    fn stop(&self);
}

struct ScopeState {
    cleanups: Vec<Unsubscribe>,
    disposed: bool,
}

pub struct Scope {
    state: Mutex<ScopeState>,
}

impl Scope {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(ScopeState {
                cleanups: Vec::new(),
                disposed: false,
            }),
        }
    }

    /// Run `cleanup` when the scope is disposed. Runs it right away if the
    /// scope is already gone.
    pub fn on_dispose(&self, cleanup: impl FnOnce() + Send + Sync + 'static) {
        let mut st = self.state.lock();
        if st.disposed {
            drop(st);
            cleanup();
            return;
        }
        st.cleanups.push(Box::new(cleanup));
    }

    /// Stop `handle` when the scope is disposed.
    pub fn add<D: Disposable + 'static>(&self, handle: Arc<D>) {
        self.on_dispose(move || handle.stop());
    }

    pub fn dispose(&self) {
        let cleanups = {
            let mut st = self.state.lock();
            if st.disposed {
                return;
            }
            st.disposed = true;
            std::mem::take(&mut st.cleanups)
        };
        for cleanup in cleanups.into_iter().rev() {
            cleanup();
        }
    }

    pub fn is_disposed(&self) -> bool {
        self.state.lock().disposed
    }
}

impl Default for Scope {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for Scope {
    fn drop(&mut self) {
        self.dispose();
    }
}
