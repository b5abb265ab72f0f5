//! Presence bindings follow the room and keep one subscription per key.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use live_bind::{
    config::BindingConfig,
    reactive::Source,
    types::{PresenceOpts, PresenceSnapshot, DEFAULT_ROOM_ID, DEFAULT_ROOM_TYPE},
    LiveDb,
};
use serde_json::{json, Value};

use crate::common::MockClient;

// ============================================================================
// Helpers
// ============================================================================

fn db() -> (Arc<MockClient>, LiveDb<MockClient>) {
    let client = Arc::new(MockClient::new());
    (Arc::clone(&client), LiveDb::new(client, BindingConfig::default()))
}

fn snapshot(peers: &[(&str, Value)]) -> PresenceSnapshot {
    PresenceSnapshot {
        peers: peers
            .iter()
            .map(|(id, data)| (id.to_string(), data.clone()))
            .collect::<BTreeMap<_, _>>(),
        is_loading: false,
        user: None,
        error: None,
    }
}

// ============================================================================
// PresenceBinding
// ============================================================================

#[test]
fn presence_starts_loading_and_follows_snapshots() {
    let (client, db) = db();
    let room = db.room(Some("chat".to_string()), Some("r1".to_string()));
    let presence = db.use_presence(&room, PresenceOpts::default());

    assert!(presence.state().is_loading);
    let subs = client.presence_subs();
    assert_eq!(subs.len(), 1);
    assert_eq!((subs[0].0.as_str(), subs[0].1.as_str()), ("chat", "r1"));

    client.emit_presence("chat", "r1", snapshot(&[("p1", json!({"name": "ann"}))]));

    let state = presence.state();
    assert!(!state.is_loading);
    assert_eq!(state.peers.get("p1"), Some(&json!({"name": "ann"})));
}

#[test]
fn presence_seeds_from_client_snapshot() {
    let (client, db) = db();
    client.set_presence("chat", "r1", snapshot(&[("p1", json!({}))]));
    let room = db.room(Some("chat".to_string()), Some("r1".to_string()));

    let presence = db.use_presence(&room, PresenceOpts::default());
    let state = presence.state();
    assert!(!state.is_loading);
    assert_eq!(state.peers.len(), 1);
}

#[test]
fn missing_room_parts_use_defaults() {
    let (client, db) = db();
    let room = db.room(None::<String>, Some(String::new()));
    assert_eq!(room.room_type(), DEFAULT_ROOM_TYPE);
    assert_eq!(room.id(), DEFAULT_ROOM_ID);

    let _presence = db.use_presence(&room, PresenceOpts::default());
    assert_eq!(client.presence_subs()[0].1, DEFAULT_ROOM_ID);
}

#[test]
fn room_change_moves_the_subscription() {
    let (client, db) = db();
    let room_id = Source::new(Some("r1".to_string()));
    let room = db.room(Some("chat".to_string()), room_id.clone());
    let presence = db.use_presence(&room, PresenceOpts::default());

    room_id.set(Some("r2".to_string()));

    let subs = client.presence_subs();
    assert_eq!(subs.len(), 2);
    assert!(subs[0].3, "old room subscription released");
    assert_eq!(subs[1].1, "r2");
    assert!(presence.state().is_loading);

    // Late snapshot from the old room is ignored.
    client.deliver_presence(0, snapshot(&[("ghost", json!({}))]));
    assert!(presence.state().peers.is_empty());
}

#[test]
fn listener_changing_opts_during_seed_subscribes_once() {
    let (client, db) = db();
    let room_id = Source::new(Some("r1".to_string()));
    let opts = Source::new(PresenceOpts::default());
    let room = db.room(Some("chat".to_string()), room_id.clone());
    let presence = db.use_presence(&room, opts.clone());
    {
        let opts = opts.clone();
        let narrowed = AtomicBool::new(false);
        let _ = presence.on_change(move |state| {
            if state.is_loading && !narrowed.swap(true, Ordering::SeqCst) {
                opts.set(PresenceOpts::keys(["b"]));
            }
        });
    }

    room_id.set(Some("r2".to_string()));

    let subs = client.presence_subs();
    assert_eq!(subs.len(), 2);
    assert!(subs[0].3, "r1 subscription released");
    assert_eq!(subs[1].1, "r2");
    assert_eq!(subs[1].2.keys, Some(vec!["b".to_string()]));
    assert!(!subs[1].3);
}

#[test]
fn unchanged_key_does_not_resubscribe() {
    let (client, db) = db();
    let room_id = Source::new(Some("r1".to_string()));
    let opts = Source::new(PresenceOpts::keys(["cursor"]));
    let room = db.room(Some("chat".to_string()), room_id.clone());
    let _presence = db.use_presence(&room, opts.clone());

    room_id.set(Some("r1".to_string()));
    opts.set(PresenceOpts::keys(["cursor"]));
    assert_eq!(client.presence_subs().len(), 1);

    opts.set(PresenceOpts::keys(["cursor", "status"]));
    let subs = client.presence_subs();
    assert_eq!(subs.len(), 2);
    assert_eq!(
        subs[1].2.keys,
        Some(vec!["cursor".to_string(), "status".to_string()])
    );
}

#[test]
fn publish_goes_to_current_room() {
    let (client, db) = db();
    let room_id = Source::new(Some("r1".to_string()));
    let room = db.room(Some("chat".to_string()), room_id.clone());
    let presence = db.use_presence(&room, PresenceOpts::default());

    room_id.set(Some("r2".to_string()));
    presence.publish_presence(&json!({"status": "away"}));

    assert_eq!(
        client.published_presence(),
        vec![("chat".to_string(), "r2".to_string(), json!({"status": "away"}))]
    );
}

#[test]
fn stop_releases_and_freezes_presence() {
    let (client, db) = db();
    let room = db.room(Some("chat".to_string()), Some("r1".to_string()));
    let presence = db.use_presence(&room, PresenceOpts::default());

    presence.stop();
    presence.stop();
    assert!(client.presence_subs()[0].3);

    client.deliver_presence(0, snapshot(&[("p1", json!({}))]));
    assert!(presence.state().is_loading);
}

// ============================================================================
// SyncPresence
// ============================================================================

#[test]
fn sync_presence_joins_and_publishes_changes() {
    let (client, db) = db();
    let room = db.room(Some("chat".to_string()), Some("r1".to_string()));
    let data = Source::new(Some(json!({"status": "here"})));
    let sync = db.use_sync_presence(&room, data.clone());

    assert_eq!(
        client.joins(),
        vec![("r1".to_string(), Some(json!({"status": "here"})))]
    );
    assert_eq!(client.published_presence().len(), 1);

    data.set(Some(json!({"status": "busy"})));
    assert_eq!(client.joins().len(), 1);
    let published = client.published_presence();
    assert_eq!(published.len(), 2);
    assert_eq!(published[1].2, json!({"status": "busy"}));

    data.set(None);
    assert_eq!(client.published_presence().len(), 2);

    sync.stop();
    assert_eq!(client.leaves(), vec!["r1".to_string()]);
    data.set(Some(json!({"status": "gone"})));
    assert_eq!(client.published_presence().len(), 2);
}

#[test]
fn sync_presence_rejoins_on_room_change() {
    let (client, db) = db();
    let room_id = Source::new(Some("r1".to_string()));
    let room = db.room(Some("chat".to_string()), room_id.clone());
    let _sync = db.use_sync_presence(&room, Some(json!({"status": "here"})));

    room_id.set(Some("r2".to_string()));

    assert_eq!(client.leaves(), vec!["r1".to_string()]);
    let joins = client.joins();
    assert_eq!(joins.len(), 2);
    assert_eq!(joins[1].0, "r2");
    let published = client.published_presence();
    assert_eq!(published.last().map(|p| p.1.as_str()), Some("r2"));
}
