//! Error types for retrieval strategies.
//!
//! Per-attempt errors never reach the client: the runner logs them and moves
//! on to the next strategy. [`RetrievalError`] covers setup failures that
//! prevent a runner from being built at all.

use thiserror::Error;

use crate::validator::ValidationError;

/// Why a single strategy attempt produced no payload.
#[derive(Debug, Error)]
pub enum AttemptError {
    /// Network-level failure (DNS, connect, TLS, timeout, body read).
    #[error("transport error requesting {url}: {source}")]
    Transport {
        /// The endpoint URL that failed.
        url: String,
        /// The underlying client error.
        #[source]
        source: reqwest::Error,
    },

    /// The endpoint answered but the response was not a usable PDF.
    #[error("rejected response from {url}: {reason}")]
    Rejected {
        /// The endpoint URL that answered.
        url: String,
        /// The validation failure.
        #[source]
        reason: ValidationError,
    },
}

impl AttemptError {
    /// Creates a transport error.
    pub fn transport(url: impl Into<String>, source: reqwest::Error) -> Self {
        Self::Transport {
            url: url.into(),
            source,
        }
    }

    /// Creates a validation rejection.
    pub fn rejected(url: impl Into<String>, reason: ValidationError) -> Self {
        Self::Rejected {
            url: url.into(),
            reason,
        }
    }

    /// Returns true if the attempt failed before any response arrived.
    #[must_use]
    pub fn is_transport(&self) -> bool {
        matches!(self, Self::Transport { .. })
    }
}

/// Errors building the retrieval stack.
#[derive(Debug, Error)]
pub enum RetrievalError {
    /// HTTP client construction failed.
    #[error("HTTP client construction failed: {source}")]
    ClientBuild {
        /// The underlying builder error.
        #[source]
        source: reqwest::Error,
    },

    /// The configured base URL is unusable.
    #[error("invalid base URL '{url}': {reason}\n  Suggestion: use an absolute http(s) URL such as https://www.scribd.com")]
    InvalidBaseUrl {
        /// The rejected base URL.
        url: String,
        /// Why it was rejected.
        reason: String,
    },
}

impl RetrievalError {
    /// Creates an invalid base URL error.
    #[must_use]
    pub fn invalid_base_url(url: &str, reason: &str) -> Self {
        Self::InvalidBaseUrl {
            url: url.to_string(),
            reason: reason.to_string(),
        }
    }
}
