use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::QueryError;

/// An owned one-shot closure that releases a subscription when called.
///
/// `FnOnce` means a handle can be invoked at most once.
pub type Unsubscribe = Box<dyn FnOnce() + Send + Sync>;

// ============================================================================
// Queries
// ============================================================================

/// Options accompanying a query.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryOptions {
    /// Parameters made available to permission rules. Merged into the query
    /// under `$$ruleParams`, so they take part in the fingerprint.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rule_params: Option<Value>,
}

impl QueryOptions {
    pub fn with_rule_params(rule_params: Value) -> Self {
        Self {
            rule_params: Some(rule_params),
        }
    }
}

/// A result snapshot delivered by the client for a subscribed query.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryResult {
    #[serde(default)]
    pub data: Option<Value>,
    #[serde(default)]
    pub page_info: Option<Value>,
    #[serde(default)]
    pub error: Option<QueryError>,
}

impl QueryResult {
    pub fn data(data: Value) -> Self {
        Self {
            data: Some(data),
            ..Default::default()
        }
    }

    pub fn error(error: QueryError) -> Self {
        Self {
            error: Some(error),
            ..Default::default()
        }
    }

    pub fn with_page_info(mut self, page_info: Value) -> Self {
        self.page_info = Some(page_info);
        self
    }
}

/// Result of a one-shot query.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryOnceResult {
    pub data: Value,
    #[serde(default)]
    pub page_info: Option<Value>,
}

/// Acknowledgement of a committed transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactResult {
    pub tx_id: Option<u64>,
}

/// Deterministic dedup key derived from a normalized query.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Fingerprint(pub String);

impl Fingerprint {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// ============================================================================
// Binding state
// ============================================================================

/// The externally observed projection of a query binding.
#[derive(Debug, Clone, PartialEq)]
pub struct BindingState {
    pub is_loading: bool,
    pub data: Option<Value>,
    pub page_info: Option<Value>,
    pub error: Option<QueryError>,
}

impl BindingState {
    /// Waiting for a first result.
    pub fn loading() -> Self {
        Self {
            is_loading: true,
            data: None,
            page_info: None,
            error: None,
        }
    }

    /// Nothing requested, nothing loading.
    pub fn idle() -> Self {
        Self {
            is_loading: false,
            ..Self::loading()
        }
    }

    /// Project a delivered (or cached) result.
    pub fn from_result(result: QueryResult) -> Self {
        Self {
            is_loading: false,
            data: result.data,
            page_info: result.page_info,
            error: result.error,
        }
    }
}

impl Default for BindingState {
    fn default() -> Self {
        Self::loading()
    }
}

/// Lifecycle position of a query binding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BindingStatus {
    /// No query, no subscription.
    Idle,
    /// Subscription requested, no result received on it yet.
    Pending,
    /// Subscription active and at least one result received.
    Live,
    /// Released. Terminal.
    Stopped,
}

// ============================================================================
// Auth & connection
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub refresh_token: Option<String>,
}

/// Payload of an auth subscription delivery.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AuthResponse {
    pub user: Option<User>,
    pub error: Option<QueryError>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AuthState {
    pub is_loading: bool,
    pub user: Option<User>,
    pub error: Option<QueryError>,
}

impl AuthState {
    /// Render gate: loaded, no error and a user present.
    pub fn is_signed_in(&self) -> bool {
        !self.is_loading && self.error.is_none() && self.user.is_some()
    }

    /// Render gate: loaded, no error and no user.
    pub fn is_signed_out(&self) -> bool {
        !self.is_loading && self.error.is_none() && self.user.is_none()
    }
}

impl Default for AuthState {
    fn default() -> Self {
        Self {
            is_loading: true,
            user: None,
            error: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionStatus {
    Connecting,
    Opened,
    Authenticated,
    Closed,
    Errored,
}

impl ConnectionStatus {
    /// User-facing summary: still handshaking, connected, or down.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Connecting | Self::Opened => "authenticating",
            Self::Authenticated => "connected",
            Self::Closed => "closed",
            Self::Errored => "errored",
        }
    }
}

// ============================================================================
// Rooms, presence & topics
// ============================================================================

pub const DEFAULT_ROOM_TYPE: &str = "_defaultRoomType";
pub const DEFAULT_ROOM_ID: &str = "_defaultRoomId";

/// Peers keyed by peer id; each value is that peer's presence object.
pub type PeerMap = BTreeMap<String, Value>;

/// Which presence keys to observe.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PresenceOpts {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub keys: Option<Vec<String>>,
    #[serde(default)]
    pub user: bool,
    #[serde(default)]
    pub peers: Option<Vec<String>>,
}

impl PresenceOpts {
    pub fn keys<I, S>(keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            keys: Some(keys.into_iter().map(Into::into).collect()),
            ..Default::default()
        }
    }
}

/// Snapshot of a room's presence as reported by the client.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PresenceSnapshot {
    pub peers: PeerMap,
    pub is_loading: bool,
    pub user: Option<Value>,
    pub error: Option<QueryError>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PresenceState {
    pub peers: PeerMap,
    pub is_loading: bool,
    pub user: Option<Value>,
    pub error: Option<QueryError>,
}

impl PresenceState {
    /// Seed used when the client has no snapshot for the room.
    pub fn loading() -> Self {
        Self {
            peers: PeerMap::new(),
            is_loading: true,
            user: None,
            error: None,
        }
    }
}

impl From<PresenceSnapshot> for PresenceState {
    fn from(s: PresenceSnapshot) -> Self {
        Self {
            peers: s.peers,
            is_loading: s.is_loading,
            user: s.user,
            error: s.error,
        }
    }
}

/// A message broadcast to a room topic.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TopicMessage {
    pub room_type: String,
    pub room_id: String,
    pub topic: String,
    pub data: Value,
}
