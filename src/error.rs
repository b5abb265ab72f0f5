use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

// ---------------------------------------------------------------------------
// QueryError: delivered by the client inside a result
// ---------------------------------------------------------------------------

/// An error the client attaches to a query result instead of failing the
/// subscription. Surfaced verbatim in `BindingState::error`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryError {
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hint: Option<Value>,
}

impl QueryError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            hint: None,
        }
    }

    pub fn with_hint(message: impl Into<String>, hint: Value) -> Self {
        Self {
            message: message.into(),
            hint: Some(hint),
        }
    }
}

impl fmt::Display for QueryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for QueryError {}

// ---------------------------------------------------------------------------
// ClientError: failures of one-shot client operations
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Error)]
#[error("Client error: {message}")]
pub struct ClientError {
    pub message: String,
    pub hint: Option<Value>,
}

impl ClientError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            hint: None,
        }
    }
}

// ---------------------------------------------------------------------------
// QuerySpecError: malformed query shapes
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum QuerySpecError {
    #[error("Query must be an object, received {0}")]
    NotAnObject(&'static str),

    #[error("Namespace \"{namespace}\" must map to an object, received {received}")]
    InvalidNamespace {
        namespace: String,
        received: &'static str,
    },

    #[error("Reserved key \"{0}\" cannot be used as a namespace")]
    ReservedKey(String),
}

// ---------------------------------------------------------------------------
// BindError: top-level rollup
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum BindError {
    #[error(transparent)]
    InvalidQuery(#[from] QuerySpecError),

    #[error(transparent)]
    Client(#[from] ClientError),

    #[error("use_user must be used within an auth-protected scope")]
    NotSignedIn,

    #[error("Invalid configuration: {0}")]
    Config(#[from] serde_json::Error),
}

impl From<&BindError> for QueryError {
    fn from(err: &BindError) -> Self {
        QueryError::new(err.to_string())
    }
}

/// Convenience alias: the default error type is `BindError`.
pub type Result<T, E = BindError> = std::result::Result<T, E>;

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
