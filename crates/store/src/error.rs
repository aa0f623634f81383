//! Error types for the document store layer.
//!
//! Every backend maps its native failures onto [`StoreError`], so callers can
//! react to "not found" or "already exists" without knowing which store they
//! are talking to.

// Error enum variant fields are self-documenting via their #[error(...)] messages
#![allow(missing_docs)]

use thiserror::Error;

/// The primary error type for all document store operations.
#[derive(Error, Debug)]
pub enum StoreError {
    /// The addressed database, container or document does not exist.
    #[error("resource not found: {resource_link}")]
    NotFound { resource_link: String },

    /// A resource with the same id already exists.
    #[error("resource already exists: {resource_link}")]
    Conflict { resource_link: String },

    /// The request was rejected as malformed (HTTP 400).
    #[error("bad request against {resource_link}: {message}")]
    BadRequest {
        resource_link: String,
        message: String,
    },

    /// The store rate-limited the request (HTTP 429).
    #[error("request throttled by {backend_name}")]
    Throttled {
        backend_name: String,
        retry_after_ms: Option<u64>,
    },

    /// Credentials were rejected (HTTP 401/403).
    #[error("authorization rejected by {backend_name}: {message}")]
    Unauthorized {
        backend_name: String,
        message: String,
    },

    /// The store is reachable but not serving requests (HTTP 5xx, timeouts).
    #[error("backend unavailable: {backend_name}: {message}")]
    Unavailable {
        backend_name: String,
        message: String,
    },

    /// The store could not be reached at all.
    #[error("connection failed to {backend_name}: {message}")]
    ConnectionFailed {
        backend_name: String,
        message: String,
    },

    /// The store configuration is unusable.
    #[error("invalid store configuration: {message}")]
    InvalidConfig { message: String },

    /// A request or response body could not be (de)serialized.
    #[error("serialization error: {message}")]
    Serialization { message: String },

    /// Anything else.
    #[error("internal error in {backend_name}: {message}")]
    Internal {
        backend_name: String,
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },
}

impl StoreError {
    /// Returns true when the error reports a missing resource.
    pub fn is_not_found(&self) -> bool {
        matches!(self, StoreError::NotFound { .. })
    }

    /// Returns true when the error reports an id collision.
    pub fn is_conflict(&self) -> bool {
        matches!(self, StoreError::Conflict { .. })
    }

    pub(crate) fn invalid_config(message: impl Into<String>) -> Self {
        StoreError::InvalidConfig {
            message: message.into(),
        }
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(err: serde_json::Error) -> Self {
        StoreError::Serialization {
            message: err.to_string(),
        }
    }
}

/// Result type for document store operations.
pub type StoreResult<T> = Result<T, StoreError>;
