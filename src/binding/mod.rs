//! Bindings: client subscriptions tied to reactive inputs and a lifetime.
//!
//! - [`query`]: [`QueryBinding`], one deduplicated subscription per query.
//! - [`auth`]: [`AuthBinding`] and [`ConnectionStatusBinding`].
//! - [`local_id`]: [`LocalIdBinding`], async lookups guarded by generation.

pub mod auth;
pub(crate) mod live;
pub mod local_id;
pub mod query;

pub use auth::{AuthBinding, ConnectionStatusBinding};
pub use local_id::LocalIdBinding;
pub use query::QueryBinding;
