//! LiveDb: the entry point: a client plus binding configuration.

use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;

use crate::{
    binding::{AuthBinding, ConnectionStatusBinding, LocalIdBinding, QueryBinding},
    client::{AsyncClient, AuthClient, CoreClient, QueryClient, RoomClient},
    config::BindingConfig,
    error::{BindError, Result},
    query,
    reactive::Source,
    room::{
        PresenceBinding, Room, SyncPresence, TopicEffect, TopicHandler, TopicPublisher,
        TypingIndicator, TypingIndicatorOpts,
    },
    types::{PresenceOpts, QueryOnceResult, QueryOptions, TransactResult, User},
};

pub struct LiveDb<C: CoreClient> {
    client: Arc<C>,
    config: BindingConfig,
}

impl<C: CoreClient> Clone for LiveDb<C> {
    fn clone(&self) -> Self {
        Self {
            client: Arc::clone(&self.client),
            config: self.config.clone(),
        }
    }
}

impl<C: CoreClient> LiveDb<C> {
    pub fn new(client: Arc<C>, config: BindingConfig) -> Self {
        Self { client, config }
    }

    pub fn client(&self) -> &Arc<C> {
        &self.client
    }

    pub fn config(&self) -> &BindingConfig {
        &self.config
    }

    // -----------------------------------------------------------------------
    // Queries & transactions
    // -----------------------------------------------------------------------

    /// Subscribe to a query that follows `spec` and `opts`.
    ///
    /// ```ignore
    /// let spec = Source::new(Some(json!({ "goals": {} })));
    /// let goals = db.use_query(spec.clone(), None)?;
    /// // Skip while signed out:
    /// spec.set(None);
    /// ```
    pub fn use_query(
        &self,
        spec: impl Into<Source<Option<Value>>>,
        opts: impl Into<Source<Option<QueryOptions>>>,
    ) -> Result<QueryBinding> {
        QueryBinding::bind(
            self.query_client(),
            spec.into(),
            opts.into(),
            self.config.null_query,
        )
    }

    /// Run a query once against the server.
    pub async fn query_once(
        &self,
        spec: &Value,
        opts: Option<&QueryOptions>,
    ) -> Result<QueryOnceResult> {
        let merged = query::merge_options(Some(spec), opts)
            .ok_or(crate::error::QuerySpecError::NotAnObject("null"))?;
        let normalized = self.client.coerce_query(&merged)?;
        Ok(self.client.query_once(&normalized, opts).await?)
    }

    /// Commit a batch of transaction chunks.
    pub async fn transact(&self, chunks: Vec<Value>) -> Result<TransactResult> {
        Ok(self.client.transact(chunks).await?)
    }

    // -----------------------------------------------------------------------
    // Auth & connection
    // -----------------------------------------------------------------------

    pub fn use_auth(&self) -> AuthBinding {
        AuthBinding::bind(self.client.as_ref())
    }

    /// The signed-in user, or [`BindError::NotSignedIn`].
    pub fn use_user(&self) -> Result<User> {
        self.client
            .current_user_cached()
            .user
            .ok_or(BindError::NotSignedIn)
    }

    pub async fn get_auth(&self) -> Result<Option<User>> {
        Ok(self.client.get_auth().await?)
    }

    pub fn use_connection_status(&self) -> ConnectionStatusBinding {
        ConnectionStatusBinding::bind(self.client.as_ref())
    }

    // -----------------------------------------------------------------------
    // Local ids
    // -----------------------------------------------------------------------

    pub async fn get_local_id(&self, name: &str) -> Result<String> {
        Ok(self.client.get_local_id(name).await?)
    }

    pub fn use_local_id(&self, name: impl Into<Source<String>>) -> LocalIdBinding {
        LocalIdBinding::bind(self.async_client(), name.into())
    }

    // -----------------------------------------------------------------------
    // Rooms
    // -----------------------------------------------------------------------

    pub fn room(
        &self,
        room_type: impl Into<Source<Option<String>>>,
        room_id: impl Into<Source<Option<String>>>,
    ) -> Room {
        Room::new(self.room_client(), room_type.into(), room_id.into())
    }

    pub fn use_presence(&self, room: &Room, opts: impl Into<Source<PresenceOpts>>) -> PresenceBinding {
        PresenceBinding::bind(room.clone(), opts.into())
    }

    pub fn use_sync_presence(
        &self,
        room: &Room,
        data: impl Into<Source<Option<Value>>>,
    ) -> SyncPresence {
        SyncPresence::bind(room.clone(), data.into())
    }

    pub fn use_topic_effect(
        &self,
        room: &Room,
        topics: impl Into<Source<Vec<String>>>,
        handler: impl Fn(&Value, &Value, &str) + Send + Sync + 'static,
    ) -> TopicEffect {
        let handler: TopicHandler = Arc::new(handler);
        TopicEffect::bind(room.clone(), topics.into(), handler)
    }

    pub fn use_publish_topic(&self, room: &Room, topic: impl Into<Source<String>>) -> TopicPublisher {
        TopicPublisher::bind(room.clone(), topic.into())
    }

    pub fn use_typing_indicator(
        &self,
        room: &Room,
        input_name: impl Into<Source<String>>,
        opts: impl Into<Source<TypingIndicatorOpts>>,
    ) -> TypingIndicator {
        TypingIndicator::bind(
            room.clone(),
            input_name.into(),
            opts.into(),
            Some(Duration::from_millis(self.config.typing_timeout_ms)),
        )
    }

    // -----------------------------------------------------------------------
    // Internal
    // -----------------------------------------------------------------------

    fn query_client(&self) -> Arc<dyn QueryClient> {
        self.client.clone()
    }

    fn room_client(&self) -> Arc<dyn RoomClient> {
        self.client.clone()
    }

    fn async_client(&self) -> Arc<dyn AsyncClient> {
        self.client.clone()
    }
}
