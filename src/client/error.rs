//! Error types for the companion client.

use thiserror::Error;

use crate::api::FailureMetadata;

/// Errors from one proxy call.
#[derive(Debug, Error)]
pub enum ClientError {
    /// The URL was rejected locally before any request was made.
    #[error(
        "not a recognised document URL: {url}\n  Suggestion: use a URL like https://www.scribd.com/document/123456789/Title"
    )]
    InvalidUrl {
        /// The rejected URL.
        url: String,
    },

    /// The proxy could not be reached or the body could not be read.
    #[error("network error calling proxy at {endpoint}: {source}")]
    Network {
        /// Proxy endpoint.
        endpoint: String,
        /// The underlying network error.
        #[source]
        source: reqwest::Error,
    },

    /// The proxy answered with a non-success status.
    #[error("proxy returned HTTP {status}: {message}")]
    Rejected {
        /// HTTP status from the proxy.
        status: u16,
        /// The `error` field of the body, or a generic status text.
        message: String,
        /// Metadata echoed on retrieval failure.
        metadata: Option<FailureMetadata>,
    },

    /// The proxy answered 200 but the body is not a PDF.
    #[error("proxy returned a non-PDF body ({bytes} bytes)")]
    InvalidPayload {
        /// Body length.
        bytes: usize,
    },

    /// HTTP client construction failed.
    #[error("HTTP client construction failed: {source}")]
    ClientBuild {
        /// The underlying builder error.
        #[source]
        source: reqwest::Error,
    },
}

impl ClientError {
    /// Creates an invalid URL error.
    pub fn invalid_url(url: impl Into<String>) -> Self {
        Self::InvalidUrl { url: url.into() }
    }

    /// Creates a network error.
    pub fn network(endpoint: impl Into<String>, source: reqwest::Error) -> Self {
        Self::Network {
            endpoint: endpoint.into(),
            source,
        }
    }

    /// Creates a rejection error.
    pub fn rejected(
        status: u16,
        message: impl Into<String>,
        metadata: Option<FailureMetadata>,
    ) -> Self {
        Self::Rejected {
            status,
            message: message.into(),
            metadata,
        }
    }

    /// HTTP status from the proxy, if one was received.
    #[must_use]
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Rejected { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Whether re-running the whole request may succeed.
    ///
    /// Transport errors, 5xx and 422 (exhaustion) are retryable. Input errors
    /// (400, 405) and local failures are not.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Network { .. } => true,
            Self::Rejected { status, .. } => *status == 422 || (500..=599).contains(status),
            Self::InvalidUrl { .. } | Self::InvalidPayload { .. } | Self::ClientBuild { .. } => {
                false
            }
        }
    }
}
