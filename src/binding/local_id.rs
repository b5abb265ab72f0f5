use std::sync::Arc;

use tokio::runtime::Handle;
use tracing::warn;

use crate::{
    client::AsyncClient,
    reactive::{Disposable, Source},
    types::Unsubscribe,
};

use super::live::LiveValue;

/// The device-local id for a (possibly changing) name.
///
/// Starts as `None`. Each name change kicks off a lookup on the current
/// tokio runtime; a lookup only lands if no newer name was requested since.
pub struct LocalIdBinding {
    live: Arc<LiveValue<Option<String>>>,
    unwatch: parking_lot::Mutex<Option<Unsubscribe>>,
}

impl LocalIdBinding {
    pub fn bind(client: Arc<dyn AsyncClient>, name: Source<String>) -> Self {
        let live = Arc::new(LiveValue::new(None));
        Self::lookup(&client, &live, name.get());

        let unwatch = {
            let weak = Arc::downgrade(&live);
            name.watch(move |name| {
                if let Some(live) = weak.upgrade() {
                    Self::lookup(&client, &live, name.clone());
                }
            })
        };

        Self {
            live,
            unwatch: parking_lot::Mutex::new(Some(unwatch)),
        }
    }

    fn lookup(client: &Arc<dyn AsyncClient>, live: &Arc<LiveValue<Option<String>>>, name: String) {
        // The previous id stays visible until the new one arrives.
        let Some(generation) = live.begin(None) else {
            return;
        };
        let Ok(runtime) = Handle::try_current() else {
            warn!(%name, "no tokio runtime available, local id lookup skipped");
            return;
        };
        let client = Arc::clone(client);
        let weak = Arc::downgrade(live);
        runtime.spawn(async move {
            match client.get_local_id(&name).await {
                Ok(id) => {
                    if let Some(live) = weak.upgrade() {
                        live.update(generation, |current| *current = Some(id));
                    }
                }
                Err(err) => warn!(%name, error = %err, "local id lookup failed"),
            }
        });
    }

    pub fn get(&self) -> Option<String> {
        self.live.get()
    }

    pub fn on_change(
        &self,
        callback: impl Fn(&Option<String>) + Send + Sync + 'static,
    ) -> Unsubscribe {
        self.live.on_change(callback)
    }

    pub fn stop(&self) {
        if let Some(unwatch) = self.unwatch.lock().take() {
            unwatch();
        }
        self.live.stop();
    }
}

impl Disposable for LocalIdBinding {
    fn stop(&self) {
        LocalIdBinding::stop(self);
    }
}

impl Drop for LocalIdBinding {
    fn drop(&mut self) {
        LocalIdBinding::stop(self);
    }
}
