//! Reactive bindings over a real-time database client.
//!
//! The client owns networking, caching and conflict resolution. This crate
//! ties its subscriptions to reactive inputs ([`Source`]) and lifetimes
//! ([`Scope`]): one deduplicated subscription per distinct query, released
//! before the next one is created, and nothing applied after a binding stops.

pub mod error;
pub mod types;

pub mod binding;
pub mod client;
pub mod config;
pub mod db;
pub mod query;
pub mod reactive;
pub mod room;

pub use binding::{AuthBinding, ConnectionStatusBinding, LocalIdBinding, QueryBinding};
pub use client::{AsyncClient, AuthClient, CoreClient, QueryClient, RoomClient};
pub use config::{BindingConfig, NullQueryPolicy};
pub use db::LiveDb;
pub use error::{BindError, ClientError, QueryError, QuerySpecError, Result};
pub use reactive::{Disposable, Scope, Source};
pub use room::Room;
pub use types::{BindingState, BindingStatus, Fingerprint, QueryOptions, QueryResult, Unsubscribe};
