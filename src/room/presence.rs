//! Presence bindings: observe peers in a room, and keep our own presence in
//! sync with a reactive value.

use std::sync::{Arc, Weak};

use parking_lot::Mutex;
use serde_json::Value;
use tracing::debug;

use crate::{
    binding::live::LiveValue,
    reactive::{Disposable, Source},
    types::{PresenceOpts, PresenceSnapshot, PresenceState, Unsubscribe},
};

use super::Room;

// ============================================================================
// PresenceBinding
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
struct PresenceKey {
    room_type: String,
    room_id: String,
    opts: PresenceOpts,
}

struct PresenceShared {
    room: Room,
    opts: Source<PresenceOpts>,
    live: Arc<LiveValue<PresenceState>>,
    key: Mutex<Option<PresenceKey>>,
}

impl PresenceShared {
    fn evaluate(&self) {
        let key = PresenceKey {
            room_type: self.room.room_type(),
            room_id: self.room.id(),
            opts: self.opts.get(),
        };
        {
            let mut current = self.key.lock();
            if current.as_ref() == Some(&key) {
                return;
            }
            *current = Some(key.clone());
        }

        let client = self.room.client();
        let seed = client
            .get_presence(&key.room_type, &key.room_id, &key.opts)
            .map(PresenceState::from)
            .unwrap_or_else(PresenceState::loading);
        let Some(generation) = self.live.begin(Some(seed)) else {
            return;
        };
        if !self.live.is_current(generation) {
            debug!(generation, "presence key changed during seed emit");
            return;
        }

        debug!(room_type = %key.room_type, room_id = %key.room_id, generation, "subscribing to presence");
        let weak = Arc::downgrade(&self.live);
        let handle = client.subscribe_presence(
            &key.room_type,
            &key.room_id,
            &key.opts,
            Arc::new(move |snapshot: PresenceSnapshot| {
                if let Some(live) = weak.upgrade() {
                    live.update(generation, |state| *state = snapshot.into());
                }
            }),
        );
        self.live.install(generation, handle);
    }

    fn on_change(weak: &Weak<Self>) {
        if let Some(shared) = weak.upgrade() {
            shared.evaluate();
        }
    }
}

/// Peers' presence in a room, following the room and the options.
pub struct PresenceBinding {
    shared: Arc<PresenceShared>,
    watchers: Mutex<Vec<Unsubscribe>>,
}

impl PresenceBinding {
    /// Subscribe to presence for the room's current key. Writes to the room
    /// or to `opts` move the subscription; the previous one is released
    /// first.
    pub fn bind(room: Room, opts: Source<PresenceOpts>) -> Self {
        let shared = Arc::new(PresenceShared {
            room,
            opts,
            live: Arc::new(LiveValue::new(PresenceState::loading())),
            key: Mutex::new(None),
        });
        shared.evaluate();

        let mut watchers = {
            let weak = Arc::downgrade(&shared);
            shared.room.watch(move || PresenceShared::on_change(&weak))
        };
        let weak = Arc::downgrade(&shared);
        watchers.push(shared.opts.watch(move |_| PresenceShared::on_change(&weak)));

        Self {
            shared,
            watchers: Mutex::new(watchers),
        }
    }

    /// Snapshot of the current peers.
    pub fn state(&self) -> PresenceState {
        self.shared.live.get()
    }

    /// Call `callback` with every new state. The returned closure removes it.
    pub fn on_change(
        &self,
        callback: impl Fn(&PresenceState) + Send + Sync + 'static,
    ) -> Unsubscribe {
        self.shared.live.on_change(callback)
    }

    /// Publish our presence to the room's current type and id.
    pub fn publish_presence(&self, data: &Value) {
        let room = &self.shared.room;
        room.client()
            .publish_presence(&room.room_type(), &room.id(), data);
    }

    /// Stop following the room and release the subscription. Idempotent.
    pub fn stop(&self) {
        let watchers = std::mem::take(&mut *self.watchers.lock());
        for unwatch in watchers {
            unwatch();
        }
        self.shared.live.stop();
    }
}

impl Disposable for PresenceBinding {
    fn stop(&self) {
        PresenceBinding::stop(self);
    }
}

impl Drop for PresenceBinding {
    fn drop(&mut self) {
        PresenceBinding::stop(self);
    }
}

// ============================================================================
// SyncPresence
// ============================================================================

struct SyncShared {
    room: Room,
    data: Source<Option<Value>>,
    /// Room membership; one round per joined room id.
    joined: LiveValue<Option<String>>,
}

impl SyncShared {
    fn join(&self) {
        let room_id = self.room.id();
        if self.joined.get().as_deref() == Some(room_id.as_str()) {
            return;
        }
        let Some(generation) = self.joined.begin(Some(Some(room_id.clone()))) else {
            return;
        };
        if !self.joined.is_current(generation) {
            return;
        }
        debug!(%room_id, "joining room");
        let initial = self.data.get();
        let leave = self.room.client().join_room(&room_id, initial.as_ref());
        self.joined.install(generation, leave);
    }

    fn publish(&self) {
        if self.joined.is_stopped() {
            return;
        }
        if let Some(data) = self.data.get() {
            self.room
                .client()
                .publish_presence(&self.room.room_type(), &self.room.id(), &data);
        }
    }

    fn on_change(weak: &Weak<Self>) {
        if let Some(shared) = weak.upgrade() {
            shared.join();
            shared.publish();
        }
    }
}

/// Keeps our presence in a room equal to a reactive value.
///
/// Joins the room (rejoining when its id changes) and publishes the value
/// on every change of the value or the room. `None` publishes nothing.
pub struct SyncPresence {
    shared: Arc<SyncShared>,
    watchers: Mutex<Vec<Unsubscribe>>,
}

impl SyncPresence {
    /// Join the room now and publish the current value, if any.
    pub fn bind(room: Room, data: Source<Option<Value>>) -> Self {
        let shared = Arc::new(SyncShared {
            room,
            data,
            joined: LiveValue::new(None),
        });
        shared.join();
        shared.publish();

        let mut watchers = {
            let weak = Arc::downgrade(&shared);
            shared.room.watch(move || SyncShared::on_change(&weak))
        };
        let weak = Arc::downgrade(&shared);
        watchers.push(shared.data.watch(move |_| SyncShared::on_change(&weak)));

        Self {
            shared,
            watchers: Mutex::new(watchers),
        }
    }

    pub fn stop(&self) {
        let watchers = std::mem::take(&mut *self.watchers.lock());
        for unwatch in watchers {
            unwatch();
        }
        self.shared.joined.stop();
    }
}

impl Disposable for SyncPresence {
    fn stop(&self) {
        SyncPresence::stop(self);
    }
}

impl Drop for SyncPresence {
    fn drop(&mut self) {
        SyncPresence::stop(self);
    }
}
