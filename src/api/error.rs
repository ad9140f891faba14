//! Error types for the proxy boundary.
//!
//! Every variant maps to one HTTP status and one user-facing message. The
//! `Display` text is for logs; [`ApiError::public_message`] is what callers
//! see.

use http::StatusCode;
use thiserror::Error;

/// Example URL quoted in input-error messages.
const EXAMPLE_URL: &str = "https://www.scribd.com/document/123456789/Title";

/// Body text for any fault the caller cannot fix.
pub const INTERNAL_ERROR_MESSAGE: &str = "Internal server error";

/// `details` text sent with [`INTERNAL_ERROR_MESSAGE`].
pub const INTERNAL_ERROR_DETAILS: &str =
    "An unexpected error occurred while processing your request. Please try again later.";

/// Errors that end a request before or outside the retrieval run.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Method other than POST or OPTIONS.
    #[error("method {method} not allowed")]
    MethodNotAllowed {
        /// The rejected method.
        method: String,
    },

    /// Body had no `url` field, or it was not a non-empty string.
    #[error("request body has no url string")]
    MissingUrl,

    /// URL does not point at the supported site.
    #[error("unsupported domain in {url}")]
    UnsupportedDomain {
        /// The submitted URL.
        url: String,
    },

    /// URL is on the supported site but carries no document id.
    #[error("no document id in {url}")]
    UnrecognizedUrl {
        /// The submitted URL.
        url: String,
    },

    /// Body was not valid JSON.
    #[error("malformed JSON body: {source}")]
    MalformedBody {
        /// The underlying parse error.
        #[source]
        source: serde_json::Error,
    },

    /// Any other unexpected fault.
    #[error("internal error: {message}")]
    Internal {
        /// Log-only description.
        message: String,
    },
}

impl ApiError {
    /// Creates a method-not-allowed error.
    pub fn method_not_allowed(method: impl Into<String>) -> Self {
        Self::MethodNotAllowed {
            method: method.into(),
        }
    }

    /// Creates an unsupported-domain error.
    pub fn unsupported_domain(url: impl Into<String>) -> Self {
        Self::UnsupportedDomain { url: url.into() }
    }

    /// Creates an unrecognized-URL error.
    pub fn unrecognized_url(url: impl Into<String>) -> Self {
        Self::UnrecognizedUrl { url: url.into() }
    }

    /// Creates an internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// HTTP status for this error.
    #[must_use]
    pub fn status(&self) -> StatusCode {
        match self {
            Self::MethodNotAllowed { .. } => StatusCode::METHOD_NOT_ALLOWED,
            Self::MissingUrl | Self::UnsupportedDomain { .. } | Self::UnrecognizedUrl { .. } => {
                StatusCode::BAD_REQUEST
            }
            Self::MalformedBody { .. } | Self::Internal { .. } => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// Message placed in the `error` field of the JSON body.
    #[must_use]
    pub fn public_message(&self) -> String {
        match self {
            Self::MethodNotAllowed { .. } => "Method not allowed. Use POST.".to_string(),
            Self::MissingUrl => "Valid URL string is required in request body".to_string(),
            Self::UnsupportedDomain { .. } => {
                format!("Invalid URL. Please provide a Scribd document URL (e.g., {EXAMPLE_URL})")
            }
            Self::UnrecognizedUrl { .. } => format!(
                "Could not extract document ID from URL. Please provide a valid Scribd document URL (e.g., {EXAMPLE_URL})"
            ),
            Self::MalformedBody { .. } | Self::Internal { .. } => {
                INTERNAL_ERROR_MESSAGE.to_string()
            }
        }
    }

    /// Extra `details` field, present only for internal faults.
    #[must_use]
    pub fn public_details(&self) -> Option<&'static str> {
        match self.status() {
            StatusCode::INTERNAL_SERVER_ERROR => Some(INTERNAL_ERROR_DETAILS),
            _ => None,
        }
    }

    /// Returns true for errors caused by the caller's input.
    #[must_use]
    pub fn is_client_error(&self) -> bool {
        self.status().is_client_error()
    }
}
