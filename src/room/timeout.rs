use std::time::Duration;

use parking_lot::Mutex;
use tokio::{runtime::Handle, task::AbortHandle};
use tracing::warn;

/// A single replaceable timer on the current tokio runtime.
///
/// `set` cancels whatever was pending; dropping the timer cancels it too.
#[derive(Default)]
pub struct Timeout {
    pending: Mutex<Option<AbortHandle>>,
}

impl Timeout {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run `f` after `delay`, replacing any pending call. Without a tokio
    /// runtime nothing is scheduled.
    pub fn set(&self, delay: Duration, f: impl FnOnce() + Send + 'static) {
        self.clear();
        let Ok(runtime) = Handle::try_current() else {
            warn!(?delay, "no tokio runtime available, timeout not scheduled");
            return;
        };
        let task = runtime.spawn(async move {
            tokio::time::sleep(delay).await;
            f();
        });
        *self.pending.lock() = Some(task.abort_handle());
    }

    /// Cancel the pending call, if any.
    pub fn clear(&self) {
        if let Some(task) = self.pending.lock().take() {
            task.abort();
        }
    }

    pub fn is_pending(&self) -> bool {
        self.pending
            .lock()
            .as_ref()
            .is_some_and(|task| !task.is_finished())
    }
}

impl Drop for Timeout {
    fn drop(&mut self) {
        self.clear();
    }
}
