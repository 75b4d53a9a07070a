//! Error Types
//!
//! This module defines the error taxonomy for the sync core. Every failure
//! below the dispatcher is recovered locally (cache rollback) and re-thrown
//! as one of these variants.
//!
//! # Error Categories
//!
//! - `Transport` - no response was received (DNS, timeout, connection refused)
//! - `Http` - the server answered with a non-2xx status
//! - `Storage` - the local outbox database failed
//! - `Serialization` - JSON encoding/decoding failures
//!
//! # Usage
//!
//! ```rust
//! use marksync::error::ApiError;
//!
//! let error = ApiError::http(404, "Not found.", None);
//! assert!(error.is_not_found());
//! ```

use thiserror::Error;

/// Errors surfaced by the sync core
#[derive(Debug, Error, Clone)]
pub enum ApiError {
    /// Network-level failure, no response received
    #[error("network error: {message}")]
    Transport {
        /// Human-readable error message
        message: String,
    },

    /// Non-2xx HTTP response from the remote API
    #[error("HTTP {status}: {message}")]
    Http {
        /// HTTP status code
        status: u16,
        /// Decoded or synthesized error message
        message: String,
        /// Raw decoded response body, when one was present
        body: Option<serde_json::Value>,
    },

    /// Local persistence failure (outbox database)
    #[error("storage error: {message}")]
    Storage {
        /// Human-readable error message
        message: String,
    },

    /// JSON serialization or deserialization error
    #[error("serialization error: {message}")]
    Serialization {
        /// Human-readable error message
        message: String,
    },
}

impl ApiError {
    /// Create a new transport error
    pub fn transport(message: impl Into<String>) -> Self {
        Self::Transport {
            message: message.into(),
        }
    }

    /// Create a new HTTP error
    pub fn http(status: u16, message: impl Into<String>, body: Option<serde_json::Value>) -> Self {
        Self::Http {
            status,
            message: message.into(),
            body,
        }
    }

    /// Create a new storage error
    pub fn storage(message: impl Into<String>) -> Self {
        Self::Storage {
            message: message.into(),
        }
    }

    /// Create a new serialization error
    pub fn serialization(message: impl Into<String>) -> Self {
        Self::Serialization {
            message: message.into(),
        }
    }

    /// HTTP status code, when the error is an HTTP error
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Http { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Whether this error is an HTTP 404
    ///
    /// Callers treat "resource does not exist" distinctly from other
    /// failures: a 404 short-circuits retries.
    pub fn is_not_found(&self) -> bool {
        self.status() == Some(404)
    }
}

impl From<reqwest::Error> for ApiError {
    fn from(err: reqwest::Error) -> Self {
        Self::transport(err.to_string())
    }
}

impl From<sqlx::Error> for ApiError {
    fn from(err: sqlx::Error) -> Self {
        Self::storage(err.to_string())
    }
}

impl From<serde_json::Error> for ApiError {
    fn from(err: serde_json::Error) -> Self {
        Self::serialization(format!("JSON error: {}", err))
    }
}
