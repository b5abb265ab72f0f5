//! Rooms: presence, topics and typing indicators.
//!
//! A [`Room`] is a handle on a (type, id) pair whose parts may change; every
//! room binding follows those changes, releasing and re-establishing its
//! client subscriptions when they do.

pub mod presence;
pub mod timeout;
pub mod topic;
pub mod typing;

use std::sync::Arc;

use crate::{
    client::RoomClient,
    reactive::Source,
    types::{Unsubscribe, DEFAULT_ROOM_ID, DEFAULT_ROOM_TYPE},
};

pub use presence::{PresenceBinding, SyncPresence};
pub use timeout::Timeout;
pub use topic::{TopicEffect, TopicHandler, TopicPublisher};
pub use typing::{TypingIndicator, TypingIndicatorOpts, TypingTimeout};

/// A room addressed by reactive type and id. Clones share both sources.
#[derive(Clone)]
pub struct Room {
    client: Arc<dyn RoomClient>,
    room_type: Source<Option<String>>,
    room_id: Source<Option<String>>,
}

impl Room {
    /// Missing parts fall back to `_defaultRoomType` / `_defaultRoomId`.
    pub fn new(
        client: Arc<dyn RoomClient>,
        room_type: Source<Option<String>>,
        room_id: Source<Option<String>>,
    ) -> Self {
        Self {
            client,
            room_type,
            room_id,
        }
    }

    /// Current type, or the default when unset or empty.
    pub fn room_type(&self) -> String {
        resolve(&self.room_type, DEFAULT_ROOM_TYPE)
    }

    /// Current id, or the default when unset or empty.
    pub fn id(&self) -> String {
        resolve(&self.room_id, DEFAULT_ROOM_ID)
    }

    pub fn client(&self) -> &Arc<dyn RoomClient> {
        &self.client
    }

    /// Run `callback` whenever the type or the id is written.
    pub(crate) fn watch(&self, callback: impl Fn() + Send + Sync + Clone + 'static) -> Vec<Unsubscribe> {
        let on_type = callback.clone();
        vec![
            self.room_type.watch(move |_| on_type()),
            self.room_id.watch(move |_| callback()),
        ]
    }

    /// Run `callback` whenever the id is written.
    pub(crate) fn watch_id(&self, callback: impl Fn() + Send + Sync + 'static) -> Unsubscribe {
        self.room_id.watch(move |_| callback())
    }
}

impl std::fmt::Debug for Room {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Room")
            .field("type", &self.room_type())
            .field("id", &self.id())
            .finish()
    }
}

fn resolve(source: &Source<Option<String>>, default: &str) -> String {
    source.with(|v| match v.as_deref() {
        Some(s) if !s.is_empty() => s.to_string(),
        _ => default.to_string(),
    })
}
