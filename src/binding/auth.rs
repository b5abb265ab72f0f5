//! Auth and connection-status bindings.
//!
//! Both seed from the client's cached value so the first read never waits,
//! then follow the client's subscription until stopped.

use std::sync::Arc;

use crate::{
    client::AuthClient,
    reactive::Disposable,
    types::{AuthResponse, AuthState, ConnectionStatus, Unsubscribe, User},
};

use super::live::LiveValue;

// ============================================================================
// AuthBinding
// ============================================================================

/// The client's auth state, kept current by an auth subscription.
pub struct AuthBinding {
    live: Arc<LiveValue<AuthState>>,
}

impl AuthBinding {
    /// Seed from the cached auth state and subscribe for changes.
    pub fn bind(client: &dyn AuthClient) -> Self {
        let live = Arc::new(LiveValue::new(client.current_user_cached()));
        let generation = live.generation();
        let weak = Arc::downgrade(&live);
        let handle = client.subscribe_auth(Arc::new(move |resp: AuthResponse| {
            if let Some(live) = weak.upgrade() {
                live.update(generation, |state| {
                    state.is_loading = false;
                    state.user = resp.user.clone();
                    state.error = resp.error.clone();
                });
            }
        }));
        live.install(generation, handle);
        Self { live }
    }

    /// Snapshot of the current state.
    pub fn state(&self) -> AuthState {
        self.live.get()
    }

    /// The signed-in user, if any.
    pub fn user(&self) -> Option<User> {
        self.live.get().user
    }

    /// Call `callback` with every new state. The returned closure removes it.
    pub fn on_change(&self, callback: impl Fn(&AuthState) + Send + Sync + 'static) -> Unsubscribe {
        self.live.on_change(callback)
    }

    /// Release the subscription; later auth changes are ignored. Idempotent.
    pub fn stop(&self) {
        self.live.stop();
    }
}

impl Disposable for AuthBinding {
    fn stop(&self) {
        self.live.stop();
    }
}

impl Drop for AuthBinding {
    fn drop(&mut self) {
        self.live.stop();
    }
}

// ============================================================================
// ConnectionStatusBinding
// ============================================================================

/// The client's connection status.
pub struct ConnectionStatusBinding {
    live: Arc<LiveValue<ConnectionStatus>>,
}

impl ConnectionStatusBinding {
    pub fn bind(client: &dyn AuthClient) -> Self {
        let live = Arc::new(LiveValue::new(client.connection_status()));
        let generation = live.generation();
        let weak = Arc::downgrade(&live);
        let handle = client.subscribe_connection_status(Arc::new(move |status| {
            if let Some(live) = weak.upgrade() {
                live.update(generation, |current| *current = status);
            }
        }));
        live.install(generation, handle);
        Self { live }
    }

    pub fn status(&self) -> ConnectionStatus {
        self.live.get()
    }

    pub fn on_change(
        &self,
        callback: impl Fn(&ConnectionStatus) + Send + Sync + 'static,
    ) -> Unsubscribe {
        self.live.on_change(callback)
    }

    pub fn stop(&self) {
        self.live.stop();
    }
}

impl Disposable for ConnectionStatusBinding {
    fn stop(&self) {
        self.live.stop();
    }
}

impl Drop for ConnectionStatusBinding {
    fn drop(&mut self) {
        self.live.stop();
    }
}
