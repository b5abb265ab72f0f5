//! Topic effects and publishers.

use std::sync::Arc;

use live_bind::{
    config::BindingConfig,
    reactive::Source,
    types::TopicMessage,
    LiveDb,
};
use parking_lot::Mutex;
use serde_json::{json, Value};

use crate::common::MockClient;

type Log = Arc<Mutex<Vec<(Value, Value, String)>>>;

fn db() -> (Arc<MockClient>, LiveDb<MockClient>) {
    let client = Arc::new(MockClient::new());
    (Arc::clone(&client), LiveDb::new(client, BindingConfig::default()))
}

fn recorder() -> (Log, impl Fn(&Value, &Value, &str) + Send + Sync + 'static) {
    let log: Log = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&log);
    let handler = move |event: &Value, peer: &Value, topic: &str| {
        sink.lock().push((event.clone(), peer.clone(), topic.to_string()));
    };
    (log, handler)
}

fn topics(names: &[&str]) -> Vec<String> {
    names.iter().map(|s| s.to_string()).collect()
}

// ============================================================================
// TopicEffect
// ============================================================================

#[test]
fn effect_receives_events_with_topic_name() {
    let (client, db) = db();
    let room = db.room(Some("chat".to_string()), Some("r1".to_string()));
    let (log, handler) = recorder();
    let _effect = db.use_topic_effect(&room, topics(&["emoji", "wave"]), handler);

    assert_eq!(client.topic_subs().len(), 2);
    client.broadcast("r1", "wave", json!({"hand": "left"}), json!({"id": "p2"}));

    let log = log.lock();
    assert_eq!(log.len(), 1);
    assert_eq!(log[0].0, json!({"hand": "left"}));
    assert_eq!(log[0].1, json!({"id": "p2"}));
    assert_eq!(log[0].2, "wave");
}

#[test]
fn changing_topics_replaces_subscriptions() {
    let (client, db) = db();
    let room = db.room(Some("chat".to_string()), Some("r1".to_string()));
    let list = Source::new(topics(&["emoji"]));
    let (log, handler) = recorder();
    let _effect = db.use_topic_effect(&room, list.clone(), handler);

    list.set(topics(&["emoji"]));
    assert_eq!(client.topic_subs().len(), 1);

    list.set(topics(&["wave"]));
    let subs = client.topic_subs();
    assert_eq!(subs.len(), 2);
    assert!(subs[0].2, "previous topic released");
    assert_eq!(subs[1].1, "wave");

    client.broadcast("r1", "emoji", json!("🎉"), json!({}));
    assert!(log.lock().is_empty());
}

#[test]
fn room_change_resubscribes_topics() {
    let (client, db) = db();
    let room_id = Source::new(Some("r1".to_string()));
    let room = db.room(Some("chat".to_string()), room_id.clone());
    let (_log, handler) = recorder();
    let _effect = db.use_topic_effect(&room, topics(&["emoji"]), handler);

    room_id.set(Some("r2".to_string()));

    let subs = client.topic_subs();
    assert_eq!(subs.len(), 2);
    assert_eq!((subs[1].0.as_str(), subs[1].2), ("r2", false));
    assert!(subs[0].2);
}

#[test]
fn stopped_effect_hears_nothing() {
    let (client, db) = db();
    let room = db.room(Some("chat".to_string()), Some("r1".to_string()));
    let (log, handler) = recorder();
    let effect = db.use_topic_effect(&room, topics(&["emoji"]), handler);

    effect.stop();
    client.broadcast("r1", "emoji", json!("late"), json!({}));

    assert!(log.lock().is_empty());
    assert!(client.topic_subs().iter().all(|(_, _, released)| *released));
}

// ============================================================================
// TopicPublisher
// ============================================================================

#[test]
fn publisher_joins_and_publishes_to_current_topic() {
    let (client, db) = db();
    let room = db.room(Some("chat".to_string()), Some("r1".to_string()));
    let topic = Source::new("emoji".to_string());
    let publish = db.use_publish_topic(&room, topic.clone());

    assert_eq!(client.joins(), vec![("r1".to_string(), None)]);

    publish.publish(json!("👍"));
    topic.set("wave".to_string());
    publish.publish(json!({"hand": "right"}));

    assert_eq!(
        client.published_topics(),
        vec![
            TopicMessage {
                room_type: "chat".into(),
                room_id: "r1".into(),
                topic: "emoji".into(),
                data: json!("👍"),
            },
            TopicMessage {
                room_type: "chat".into(),
                room_id: "r1".into(),
                topic: "wave".into(),
                data: json!({"hand": "right"}),
            },
        ]
    );
}

#[test]
fn publisher_follows_room_and_goes_quiet_after_stop() {
    let (client, db) = db();
    let room_id = Source::new(Some("r1".to_string()));
    let room = db.room(Some("chat".to_string()), room_id.clone());
    let publish = db.use_publish_topic(&room, "emoji".to_string());

    room_id.set(Some("r2".to_string()));
    assert_eq!(client.leaves(), vec!["r1".to_string()]);
    assert_eq!(client.joins().len(), 2);

    publish.stop();
    publish.publish(json!("ignored"));

    assert!(client.published_topics().is_empty());
    assert_eq!(client.leaves(), vec!["r1".to_string(), "r2".to_string()]);
}
