//! Query normalization and fingerprinting.
//!
//! These are the default implementations behind [`QueryClient::coerce_query`]
//! and [`QueryClient::fingerprint`]; a client with its own normalization
//! overrides them.
//!
//! [`QueryClient::coerce_query`]: crate::client::QueryClient::coerce_query
//! [`QueryClient::fingerprint`]: crate::client::QueryClient::fingerprint

use serde_json::{Map, Value};
use sha2::{Digest, Sha256};

use crate::error::QuerySpecError;
use crate::types::{Fingerprint, QueryOptions};

/// Key under which rule params ride along with the query.
pub const RULE_PARAMS_KEY: &str = "$$ruleParams";

/// Merge `opts.rule_params` into `spec`.
///
/// `None` / JSON `null` specs stay `None`: there is nothing to subscribe to.
pub fn merge_options(spec: Option<&Value>, opts: Option<&QueryOptions>) -> Option<Value> {
    let spec = match spec {
        None | Some(Value::Null) => return None,
        Some(spec) => spec,
    };
    match (spec, opts.and_then(|o| o.rule_params.as_ref())) {
        (Value::Object(map), Some(params)) => {
            let mut merged = Map::with_capacity(map.len() + 1);
            merged.insert(RULE_PARAMS_KEY.to_string(), params.clone());
            for (k, v) in map {
                merged.insert(k.clone(), v.clone());
            }
            Some(Value::Object(merged))
        }
        _ => Some(spec.clone()),
    }
}

/// Validate and normalize a query.
///
/// Top-level keys are namespaces mapping to objects. `null` members are
/// dropped at every depth so `{a: {x: null}}` and `{a: {}}` share a
/// fingerprint.
pub fn coerce_query(spec: &Value) -> Result<Value, QuerySpecError> {
    let map = match spec {
        Value::Object(map) => map,
        other => return Err(QuerySpecError::NotAnObject(kind(other))),
    };

    let mut out = Map::with_capacity(map.len());
    for (key, value) in map {
        if key == RULE_PARAMS_KEY {
            if !value.is_null() {
                out.insert(key.clone(), strip_nulls(value));
            }
            continue;
        }
        if key.starts_with('$') {
            return Err(QuerySpecError::ReservedKey(key.clone()));
        }
        match value {
            Value::Object(_) => {
                out.insert(key.clone(), strip_nulls(value));
            }
            other => {
                return Err(QuerySpecError::InvalidNamespace {
                    namespace: key.clone(),
                    received: kind(other),
                })
            }
        }
    }
    Ok(Value::Object(out))
}

fn strip_nulls(value: &Value) -> Value {
    match value {
        Value::Object(map) => Value::Object(
            map.iter()
                .filter(|(_, v)| !v.is_null())
                .map(|(k, v)| (k.clone(), strip_nulls(v)))
                .collect(),
        ),
        Value::Array(items) => Value::Array(items.iter().map(strip_nulls).collect()),
        other => other.clone(),
    }
}

fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Stable fingerprint of a normalized query.
///
/// Object keys are hashed in sorted order, so key order never matters.
pub fn fingerprint(normalized: &Value) -> Fingerprint {
    let mut hasher = Sha256::new();
    feed(&mut hasher, normalized);
    let digest = hasher.finalize();
    // 16 bytes is plenty for a dedup key.
    let hex: String = digest[..16].iter().map(|b| format!("{b:02x}")).collect();
    Fingerprint(hex)
}

fn feed(hasher: &mut Sha256, value: &Value) {
    match value {
        Value::Null => hasher.update([0u8]),
        Value::Bool(b) => hasher.update([1u8, u8::from(*b)]),
        Value::Number(n) => {
            hasher.update([2u8]);
            feed_str(hasher, &n.to_string());
        }
        Value::String(s) => {
            hasher.update([3u8]);
            feed_str(hasher, s);
        }
        Value::Array(items) => {
            hasher.update([4u8]);
            hasher.update((items.len() as u64).to_le_bytes());
            for item in items {
                feed(hasher, item);
            }
        }
        Value::Object(map) => {
            hasher.update([5u8]);
            hasher.update((map.len() as u64).to_le_bytes());
            let mut keys: Vec<&String> = map.keys().collect();
            keys.sort();
            for key in keys {
                feed_str(hasher, key);
                feed(hasher, &map[key.as_str()]);
            }
        }
    }
}

fn feed_str(hasher: &mut Sha256, s: &str) {
    hasher.update((s.len() as u64).to_le_bytes());
    hasher.update(s.as_bytes());
}
