//! QueryBinding: keeps exactly one live client subscription for the current
//! query and projects its results into a [`BindingState`].
//!
//! # Lifecycle
//!
//! ```text
//!   Idle ──non-null query──▶ Pending ──first result──▶ Live
//!    ▲                          ▲                        │
//!    └──────null query──────────┴──fingerprint change────┘
//!   (any) ──stop()──▶ Stopped (terminal)
//! ```
//!
//! Every (re-)evaluation that yields a new fingerprint bumps a generation
//! counter, releases the previous handle and only then subscribes again.
//! Deliveries carry the generation they were subscribed under and are
//! dropped unless it is still current. The state lock is never held while
//! calling into the client or into `on_change` listeners.

use std::sync::{Arc, Weak};

use parking_lot::Mutex;
use serde_json::Value;
use tracing::{debug, trace, warn};

use crate::{
    client::{QueryCallback, QueryClient},
    config::NullQueryPolicy,
    error::{BindError, QueryError, Result},
    query,
    reactive::{Disposable, EventEmitter, Source},
    types::{BindingState, BindingStatus, Fingerprint, QueryOptions, QueryResult, Unsubscribe},
};

/// What the last evaluation produced.
#[derive(Debug, Clone, PartialEq)]
enum Evaluated {
    Never,
    /// Normalization failed; the next evaluation always re-applies.
    Invalid,
    /// `None` for a null query.
    Key(Option<Fingerprint>),
}

struct Inner {
    state: BindingState,
    status: BindingStatus,
    evaluated: Evaluated,
    query: Option<Value>,
    generation: u64,
    handle: Option<Unsubscribe>,
}

struct Shared {
    client: Arc<dyn QueryClient>,
    spec: Source<Option<Value>>,
    options: Source<Option<QueryOptions>>,
    null_query: NullQueryPolicy,
    inner: Mutex<Inner>,
    emitter: EventEmitter<BindingState>,
    /// Source watchers, removed on stop.
    watchers: Mutex<Vec<Unsubscribe>>,
}

/// A live query binding. Dropping it stops it.
pub struct QueryBinding {
    shared: Arc<Shared>,
}

impl QueryBinding {
    /// Bind `spec` (and `options`) to a client subscription.
    ///
    /// The first evaluation happens before this returns; a malformed query
    /// is reported here as [`BindError::InvalidQuery`]. Later writes to either
    /// source re-evaluate automatically.
    pub fn bind(
        client: Arc<dyn QueryClient>,
        spec: Source<Option<Value>>,
        options: Source<Option<QueryOptions>>,
        null_query: NullQueryPolicy,
    ) -> Result<Self> {
        let shared = Arc::new(Shared {
            client,
            spec,
            options,
            null_query,
            inner: Mutex::new(Inner {
                state: BindingState::loading(),
                status: BindingStatus::Idle,
                evaluated: Evaluated::Never,
                query: None,
                generation: 0,
                handle: None,
            }),
            emitter: EventEmitter::new(),
            watchers: Mutex::new(Vec::new()),
        });

        let normalized = shared.normalize()?;
        Shared::transition(&shared, normalized);
        Shared::attach(&shared);

        Ok(Self { shared })
    }

    /// Snapshot of the current state.
    pub fn state(&self) -> BindingState {
        self.shared.inner.lock().state.clone()
    }

    pub fn status(&self) -> BindingStatus {
        self.shared.inner.lock().status
    }

    /// Fingerprint of the query currently subscribed, if any.
    pub fn fingerprint(&self) -> Option<Fingerprint> {
        match &self.shared.inner.lock().evaluated {
            Evaluated::Key(fp) => fp.clone(),
            _ => None,
        }
    }

    /// The normalized query currently subscribed, if any.
    pub fn query(&self) -> Option<Value> {
        self.shared.inner.lock().query.clone()
    }

    /// Call `callback` with every new state. The returned closure removes it.
    pub fn on_change(
        &self,
        callback: impl Fn(&BindingState) + Send + Sync + 'static,
    ) -> Unsubscribe {
        let id = self.shared.emitter.on(callback);
        let shared = Arc::downgrade(&self.shared);
        Box::new(move || {
            if let Some(shared) = shared.upgrade() {
                shared.emitter.off(id);
            }
        })
    }

    /// Re-read the sources and re-evaluate. A no-op when the fingerprint is
    /// unchanged.
    pub fn refresh(&self) -> Result<()> {
        Shared::reevaluate(&self.shared)
    }

    /// Release the subscription and freeze the state. Idempotent.
    pub fn stop(&self) {
        self.shared.stop();
    }

    pub fn is_stopped(&self) -> bool {
        self.status() == BindingStatus::Stopped
    }
}

impl Disposable for QueryBinding {
    fn stop(&self) {
        self.shared.stop();
    }
}

impl Drop for QueryBinding {
    fn drop(&mut self) {
        self.shared.stop();
    }
}

impl std::fmt::Debug for QueryBinding {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let inner = self.shared.inner.lock();
        f.debug_struct("QueryBinding")
            .field("status", &inner.status)
            .field("generation", &inner.generation)
            .field("state", &inner.state)
            .finish()
    }
}

impl Shared {
    fn attach(this: &Arc<Self>) {
        let on_spec = {
            let weak = Arc::downgrade(this);
            this.spec.watch(move |_| Self::on_source_change(&weak))
        };
        let on_options = {
            let weak = Arc::downgrade(this);
            this.options.watch(move |_| Self::on_source_change(&weak))
        };
        this.watchers.lock().extend([on_spec, on_options]);
    }

    fn on_source_change(weak: &Weak<Self>) {
        if let Some(shared) = weak.upgrade() {
            // Failures are already reflected in the state.
            let _ = Self::reevaluate(&shared);
        }
    }

    fn normalize(&self) -> Result<Option<Value>> {
        let spec = self.spec.get();
        let opts = self.options.get();
        match query::merge_options(spec.as_ref(), opts.as_ref()) {
            None => Ok(None),
            Some(merged) => Ok(Some(self.client.coerce_query(&merged)?)),
        }
    }

    fn reevaluate(this: &Arc<Self>) -> Result<()> {
        match this.normalize() {
            Ok(normalized) => {
                Self::transition(this, normalized);
                Ok(())
            }
            Err(err) => {
                this.invalidate(&err);
                Err(err)
            }
        }
    }

    /// Move to the binding for `normalized`, unless it is what we already have.
    fn transition(this: &Arc<Self>, normalized: Option<Value>) {
        let fingerprint = normalized.as_ref().map(|q| this.client.fingerprint(q));
        let key = Evaluated::Key(fingerprint.clone());
        {
            let inner = this.inner.lock();
            if inner.status == BindingStatus::Stopped || inner.evaluated == key {
                return;
            }
        }

        let cached = normalized
            .as_ref()
            .and_then(|q| this.client.get_previous_result(q));

        let (previous, generation, state) = {
            let mut inner = this.inner.lock();
            if inner.status == BindingStatus::Stopped {
                return;
            }
            inner.generation += 1;
            let previous = inner.handle.take();
            inner.state = match (&normalized, cached) {
                (None, _) => match this.null_query {
                    NullQueryPolicy::Reset => BindingState::idle(),
                    NullQueryPolicy::KeepLast => BindingState {
                        is_loading: false,
                        ..inner.state.clone()
                    },
                },
                (Some(_), Some(result)) => BindingState::from_result(result),
                (Some(_), None) => BindingState::loading(),
            };
            inner.status = if normalized.is_some() {
                BindingStatus::Pending
            } else {
                BindingStatus::Idle
            };
            inner.evaluated = key;
            inner.query = normalized.clone();
            (previous, inner.generation, inner.state.clone())
        };

        if let Some(release) = previous {
            debug!(generation, "releasing previous query subscription");
            release();
        }
        this.emitter.emit(&state);

        let Some(normalized) = normalized else {
            return;
        };
        // A listener may have stopped the binding or moved it to another
        // query while the seed was emitted.
        if !this.is_current(generation) {
            debug!(generation, "query superseded during seed emit, not subscribing");
            return;
        }
        // `fingerprint` is `Some` whenever `normalized` is.
        let fp = fingerprint.map(|f| f.0).unwrap_or_default();

        let weak = Arc::downgrade(this);
        let callback: QueryCallback = Arc::new(move |result: QueryResult| {
            if let Some(shared) = weak.upgrade() {
                shared.deliver(generation, result);
            }
        });
        debug!(fingerprint = %fp, generation, "subscribing to query");
        let handle = this.client.subscribe_query(&normalized, callback);

        let stale = {
            let mut inner = this.inner.lock();
            if inner.status == BindingStatus::Stopped || inner.generation != generation {
                Some(handle)
            } else {
                inner.handle = Some(handle);
                None
            }
        };
        if let Some(release) = stale {
            debug!(fingerprint = %fp, generation, "query changed while subscribing, releasing");
            release();
        }
    }

    fn is_current(&self, generation: u64) -> bool {
        let inner = self.inner.lock();
        inner.status != BindingStatus::Stopped && inner.generation == generation
    }

    /// Apply a result delivered under `generation`.
    fn deliver(&self, generation: u64, result: QueryResult) {
        let state = {
            let mut inner = self.inner.lock();
            if inner.status == BindingStatus::Stopped || inner.generation != generation {
                trace!(
                    generation,
                    current = inner.generation,
                    "dropping stale query result"
                );
                return;
            }
            inner.state = BindingState::from_result(result);
            inner.status = BindingStatus::Live;
            inner.state.clone()
        };
        self.emitter.emit(&state);
    }

    /// A reactive write produced a query that does not normalize.
    fn invalidate(&self, err: &BindError) {
        warn!(error = %err, "query failed to normalize, dropping subscription");
        let (previous, state) = {
            let mut inner = self.inner.lock();
            if inner.status == BindingStatus::Stopped {
                return;
            }
            inner.generation += 1;
            inner.evaluated = Evaluated::Invalid;
            inner.query = None;
            inner.status = BindingStatus::Idle;
            inner.state = BindingState {
                error: Some(QueryError::from(err)),
                ..BindingState::idle()
            };
            (inner.handle.take(), inner.state.clone())
        };
        if let Some(release) = previous {
            release();
        }
        self.emitter.emit(&state);
    }

    fn stop(&self) {
        let previous = {
            let mut inner = self.inner.lock();
            if inner.status == BindingStatus::Stopped {
                return;
            }
            inner.status = BindingStatus::Stopped;
            inner.generation += 1;
            inner.handle.take()
        };
        let watchers = std::mem::take(&mut *self.watchers.lock());
        for unwatch in watchers {
            unwatch();
        }
        if let Some(release) = previous {
            debug!("releasing query subscription on stop");
            release();
        }
        self.emitter.clear();
    }
}
