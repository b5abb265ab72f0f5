use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use serde_json::{Map, Value};

use crate::{
    config::DEFAULT_TYPING_TIMEOUT_MS,
    reactive::{Disposable, Source},
    types::{PresenceOpts, Unsubscribe},
};

use super::{presence::PresenceBinding, timeout::Timeout, Room};

/// When an active typing flag clears itself.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum TypingTimeout {
    /// The binding's configured default.
    #[default]
    Default,
    /// Stay active until explicitly deactivated.
    Never,
    After(Duration),
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TypingIndicatorOpts {
    pub timeout: TypingTimeout,
    /// Enter deactivates instead of activating.
    pub stop_on_enter: bool,
    /// Only publish; `active()` is always empty.
    pub write_only: bool,
}

/// Typing state for one input, published through presence.
///
/// The input's name is used as the presence key: `true` while typing, `null`
/// once the timeout clears it.
pub struct TypingIndicator {
    room: Room,
    input_name: Source<String>,
    opts: Source<TypingIndicatorOpts>,
    default_timeout: Duration,
    presence: PresenceBinding,
    timeout: Timeout,
    unwatch: Mutex<Option<Unsubscribe>>,
}

impl TypingIndicator {
    pub fn bind(
        room: Room,
        input_name: Source<String>,
        opts: Source<TypingIndicatorOpts>,
        default_timeout: Option<Duration>,
    ) -> Self {
        let presence_opts = Source::new(PresenceOpts::keys([input_name.get()]));
        let unwatch = {
            let presence_opts = presence_opts.clone();
            input_name.watch(move |name| presence_opts.set(PresenceOpts::keys([name.clone()])))
        };
        let presence = PresenceBinding::bind(room.clone(), presence_opts);

        Self {
            room,
            input_name,
            opts,
            default_timeout: default_timeout
                .unwrap_or(Duration::from_millis(DEFAULT_TYPING_TIMEOUT_MS)),
            presence,
            timeout: Timeout::new(),
            unwatch: Mutex::new(Some(unwatch)),
        }
    }

    /// Peers currently typing in this input.
    pub fn active(&self) -> Vec<Value> {
        if self.opts.with(|o| o.write_only) {
            return Vec::new();
        }
        let name = self.input_name.get();
        self.presence
            .state()
            .peers
            .into_values()
            .filter(|peer| peer.get(&name) == Some(&Value::Bool(true)))
            .collect()
    }

    /// Publish `{name: is_active}`. Activation also (re)starts the clear
    /// timer unless the timeout is `Never` or zero.
    pub fn set_active(&self, is_active: bool) {
        let name = self.input_name.get();
        let room_type = self.room.room_type();
        let room_id = self.room.id();
        let client = Arc::clone(self.room.client());

        client.publish_presence(&room_type, &room_id, &flag(&name, Value::Bool(is_active)));

        if !is_active {
            return;
        }
        let delay = match self.opts.with(|o| o.timeout) {
            TypingTimeout::Never => return,
            TypingTimeout::Default => self.default_timeout,
            TypingTimeout::After(d) => d,
        };
        if delay.is_zero() {
            return;
        }
        self.timeout.set(delay, move || {
            client.publish_presence(&room_type, &room_id, &flag(&name, Value::Null));
        });
    }

    /// Any key activates; with `stop_on_enter`, Enter deactivates.
    pub fn on_key_down(&self, key: &str) {
        let is_enter = self.opts.with(|o| o.stop_on_enter) && key == "Enter";
        self.set_active(!is_enter);
    }

    pub fn on_blur(&self) {
        self.set_active(false);
    }

    pub fn presence(&self) -> &PresenceBinding {
        &self.presence
    }

    /// Cancel the pending clear and stop the presence binding.
    pub fn stop(&self) {
        self.timeout.clear();
        if let Some(unwatch) = self.unwatch.lock().take() {
            unwatch();
        }
        self.presence.stop();
    }
}

impl Disposable for TypingIndicator {
    fn stop(&self) {
        TypingIndicator::stop(self);
    }
}

impl Drop for TypingIndicator {
    fn drop(&mut self) {
        TypingIndicator::stop(self);
    }
}

fn flag(name: &str, value: Value) -> Value {
    let mut map = Map::with_capacity(1);
    map.insert(name.to_string(), value);
    Value::Object(map)
}
