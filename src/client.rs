//! The contract of the wrapped real-time client.
//!
//! Split by concern the way the client itself is: queries, auth/connection,
//! rooms, and the async one-shot operations. Bindings are generic over
//! [`CoreClient`], which every type implementing all four gets for free.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use crate::{
    error::{ClientError, QuerySpecError},
    query,
    types::{
        AuthResponse, AuthState, ConnectionStatus, Fingerprint, PresenceOpts, PresenceSnapshot,
        QueryOnceResult, QueryOptions, QueryResult, TopicMessage, TransactResult, Unsubscribe,
        User,
    },
};

/// Callback receiving query result snapshots.
pub type QueryCallback = Arc<dyn Fn(QueryResult) + Send + Sync>;
/// Callback receiving auth changes.
pub type AuthCallback = Arc<dyn Fn(AuthResponse) + Send + Sync>;
/// Callback receiving connection status changes.
pub type StatusCallback = Arc<dyn Fn(ConnectionStatus) + Send + Sync>;
/// Callback receiving presence snapshots.
pub type PresenceCallback = Arc<dyn Fn(PresenceSnapshot) + Send + Sync>;
/// Callback receiving `(event, peer)` for a topic.
pub type TopicCallback = Arc<dyn Fn(&Value, &Value) + Send + Sync>;

// ============================================================================
// QueryClient
// ============================================================================

pub trait QueryClient: Send + Sync {
    /// Register `callback` for live results of `normalized`.
    fn subscribe_query(&self, normalized: &Value, callback: QueryCallback) -> Unsubscribe;

    /// Synchronous cache peek for a previously seen query.
    fn get_previous_result(&self, normalized: &Value) -> Option<QueryResult>;

    fn coerce_query(&self, spec: &Value) -> Result<Value, QuerySpecError> {
        query::coerce_query(spec)
    }

    fn fingerprint(&self, normalized: &Value) -> Fingerprint {
        query::fingerprint(normalized)
    }
}

// ============================================================================
// AuthClient
// ============================================================================

pub trait AuthClient: Send + Sync {
    /// Last auth state the client knows about, without waiting.
    fn current_user_cached(&self) -> AuthState;

    fn subscribe_auth(&self, callback: AuthCallback) -> Unsubscribe;

    fn connection_status(&self) -> ConnectionStatus;

    fn subscribe_connection_status(&self, callback: StatusCallback) -> Unsubscribe;
}

// ============================================================================
// RoomClient
// ============================================================================

pub trait RoomClient: Send + Sync {
    /// Join a room, optionally with initial presence. The returned closure
    /// leaves it.
    fn join_room(&self, room_id: &str, initial_presence: Option<&Value>) -> Unsubscribe;

    fn get_presence(
        &self,
        room_type: &str,
        room_id: &str,
        opts: &PresenceOpts,
    ) -> Option<PresenceSnapshot>;

    fn subscribe_presence(
        &self,
        room_type: &str,
        room_id: &str,
        opts: &PresenceOpts,
        callback: PresenceCallback,
    ) -> Unsubscribe;

    fn publish_presence(&self, room_type: &str, room_id: &str, data: &Value);

    fn subscribe_topic(&self, room_id: &str, topic: &str, callback: TopicCallback) -> Unsubscribe;

    fn publish_topic(&self, message: TopicMessage);
}

// ============================================================================
// AsyncClient: one-shot operations
// ============================================================================

#[async_trait]
pub trait AsyncClient: Send + Sync {
    /// Run a query once. Fails when there is no live connection.
    async fn query_once(
        &self,
        normalized: &Value,
        opts: Option<&QueryOptions>,
    ) -> Result<QueryOnceResult, ClientError>;

    async fn transact(&self, chunks: Vec<Value>) -> Result<TransactResult, ClientError>;

    /// Stable per-device id for `name`.
    async fn get_local_id(&self, name: &str) -> Result<String, ClientError>;

    async fn get_auth(&self) -> Result<Option<User>, ClientError>;
}

// ============================================================================
// CoreClient
// ============================================================================

/// Everything the bindings need from the client.
pub trait CoreClient: QueryClient + AuthClient + RoomClient + AsyncClient + 'static {}

impl<T> CoreClient for T where T: QueryClient + AuthClient + RoomClient + AsyncClient + 'static {}
