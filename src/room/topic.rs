//! Topic bindings: react to broadcast events, and publish them.

use std::sync::{Arc, Weak};

use parking_lot::Mutex;
use serde_json::Value;
use tracing::debug;

use crate::{
    binding::live::LiveValue,
    reactive::{Disposable, Source},
    types::{TopicMessage, Unsubscribe},
};

use super::Room;

/// Handler for topic events: `(event, peer, topic)`.
pub type TopicHandler = Arc<dyn Fn(&Value, &Value, &str) + Send + Sync>;

// ============================================================================
// TopicEffect
// ============================================================================

struct EffectShared {
    room: Room,
    topics: Source<Vec<String>>,
    handler: TopicHandler,
    /// One round per (room id, topic list); holds one handle per topic.
    subscribed: LiveValue<Option<(String, Vec<String>)>>,
}

impl EffectShared {
    fn evaluate(&self) {
        let room_id = self.room.id();
        let topics = self.topics.get();
        let key = Some((room_id.clone(), topics.clone()));
        if self.subscribed.get() == key {
            return;
        }
        let Some(generation) = self.subscribed.begin(Some(key)) else {
            return;
        };
        if !self.subscribed.is_current(generation) {
            return;
        }

        let client = self.room.client();
        for topic in topics {
            debug!(%room_id, %topic, generation, "subscribing to topic");
            let handler = Arc::clone(&self.handler);
            let name = topic.clone();
            let handle = client.subscribe_topic(
                &room_id,
                &topic,
                Arc::new(move |event: &Value, peer: &Value| handler(event, peer, &name)),
            );
            self.subscribed.install(generation, handle);
        }
    }

    fn on_change(weak: &Weak<Self>) {
        if let Some(shared) = weak.upgrade() {
            shared.evaluate();
        }
    }
}

/// Runs a handler for every event broadcast on the given topics of a room.
pub struct TopicEffect {
    shared: Arc<EffectShared>,
    watchers: Mutex<Vec<Unsubscribe>>,
}

impl TopicEffect {
    /// Subscribe `handler` to every topic in `topics` for the room's current
    /// id. A new id or topic list releases all handles before resubscribing.
    pub fn bind(room: Room, topics: Source<Vec<String>>, handler: TopicHandler) -> Self {
        let shared = Arc::new(EffectShared {
            room,
            topics,
            handler,
            subscribed: LiveValue::new(None),
        });
        shared.evaluate();

        let watchers = {
            let on_id = {
                let weak = Arc::downgrade(&shared);
                shared.room.watch_id(move || EffectShared::on_change(&weak))
            };
            let weak = Arc::downgrade(&shared);
            let on_topics = shared.topics.watch(move |_| EffectShared::on_change(&weak));
            vec![on_id, on_topics]
        };

        Self {
            shared,
            watchers: Mutex::new(watchers),
        }
    }

    /// Release every topic handle; the handler is not called again.
    pub fn stop(&self) {
        let watchers = std::mem::take(&mut *self.watchers.lock());
        for unwatch in watchers {
            unwatch();
        }
        self.shared.subscribed.stop();
    }
}

impl Disposable for TopicEffect {
    fn stop(&self) {
        TopicEffect::stop(self);
    }
}

impl Drop for TopicEffect {
    fn drop(&mut self) {
        TopicEffect::stop(self);
    }
}

// ============================================================================
// TopicPublisher
// ============================================================================

struct PublisherShared {
    room: Room,
    topic: Source<String>,
    joined: LiveValue<Option<String>>,
}

impl PublisherShared {
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
        let leave = self.room.client().join_room(&room_id, None);
        self.joined.install(generation, leave);
    }
}

/// Publishes to one topic of a room; stays joined while alive.
pub struct TopicPublisher {
    shared: Arc<PublisherShared>,
    unwatch: Mutex<Option<Unsubscribe>>,
}

impl TopicPublisher {
    /// Join the room's current id, rejoining when it changes.
    pub fn bind(room: Room, topic: Source<String>) -> Self {
        let shared = Arc::new(PublisherShared {
            room,
            topic,
            joined: LiveValue::new(None),
        });
        shared.join();

        let unwatch = {
            let weak = Arc::downgrade(&shared);
            shared.room.watch_id(move || {
                if let Some(shared) = weak.upgrade() {
                    shared.join();
                }
            })
        };

        Self {
            shared,
            unwatch: Mutex::new(Some(unwatch)),
        }
    }

    /// Broadcast `data`. Room and topic are resolved at call time; after
    /// `stop` this does nothing.
    pub fn publish(&self, data: Value) {
        if self.shared.joined.is_stopped() {
            return;
        }
        let room = &self.shared.room;
        room.client().publish_topic(TopicMessage {
            room_type: room.room_type(),
            room_id: room.id(),
            topic: self.shared.topic.get(),
            data,
        });
    }

    /// Leave the room. Idempotent.
    pub fn stop(&self) {
        if let Some(unwatch) = self.unwatch.lock().take() {
            unwatch();
        }
        self.shared.joined.stop();
    }
}

impl Disposable for TopicPublisher {
    fn stop(&self) {
        TopicPublisher::stop(self);
    }
}

impl Drop for TopicPublisher {
    fn drop(&mut self) {
        TopicPublisher::stop(self);
    }
}
