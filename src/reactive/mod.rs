//! Reactive primitives the bindings are built from.
//!
//! - [`emitter`]: [`EventEmitter<T>`], typed synchronous pub/sub.
//! - [`source`]: [`Source<T>`], a writable cell that notifies watchers.
//! - [`scope`]: [`Scope`] and the [`Disposable`] trait for scoped cleanup.

pub mod emitter;
pub mod scope;
pub mod source;

pub use emitter::{EventEmitter, ListenerId};
pub use scope::{Disposable, Scope};
pub use source::Source;
