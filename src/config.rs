use serde::{Deserialize, Serialize};

use crate::error::Result;

/// What a query binding does with its last result when the query becomes
/// `None`. Either way `is_loading` turns false.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NullQueryPolicy {
    /// Clear `data`, `page_info` and `error`.
    #[default]
    Reset,
    /// Leave the previous values in place.
    KeepLast,
}

/// Binding behaviour knobs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BindingConfig {
    pub null_query: NullQueryPolicy,
    /// Default delay before a typing indicator clears itself.
    pub typing_timeout_ms: u64,
}

pub const DEFAULT_TYPING_TIMEOUT_MS: u64 = 1_000;

impl Default for BindingConfig {
    fn default() -> Self {
        Self {
            null_query: NullQueryPolicy::Reset,
            typing_timeout_ms: DEFAULT_TYPING_TIMEOUT_MS,
        }
    }
}

impl BindingConfig {
    /// Parse from JSON; missing fields take their defaults.
    pub fn from_json(raw: &str) -> Result<Self> {
        Ok(serde_json::from_str(raw)?)
    }
}
