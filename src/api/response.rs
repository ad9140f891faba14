//! Response assembly for the proxy boundary.
//!
//! Builds transport-neutral `http::Response<Vec<u8>>` values. Every response
//! carries the CORS header set; success responses also carry the download and
//! `X-Document-*` headers.

use http::header::{
    ACCESS_CONTROL_ALLOW_HEADERS, ACCESS_CONTROL_ALLOW_METHODS, ACCESS_CONTROL_ALLOW_ORIGIN,
    ACCESS_CONTROL_EXPOSE_HEADERS, CONTENT_DISPOSITION, CONTENT_LENGTH, CONTENT_TYPE, HeaderMap,
    HeaderName, HeaderValue,
};
use http::{Response, StatusCode};
use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};

use crate::metadata::DocumentMetadata;
use crate::retrieval::RetrievalOutcome;

use super::error::ApiError;
use super::filename::{attachment_disposition, safe_pdf_filename};

/// Percent-encoded document title.
pub const X_DOCUMENT_TITLE: HeaderName = HeaderName::from_static("x-document-title");

/// Page count, `0` when unknown.
pub const X_DOCUMENT_PAGES: HeaderName = HeaderName::from_static("x-document-pages");

/// Percent-encoded author, only present when known.
pub const X_DOCUMENT_AUTHOR: HeaderName = HeaderName::from_static("x-document-author");

/// Non-standard status used for cancelled requests.
pub const STATUS_CLIENT_CLOSED: u16 = 499;

/// Error text for cancelled requests.
pub const CANCELLED_MESSAGE: &str = "Request cancelled";

const EXPOSED_HEADERS: &str =
    "Content-Disposition, X-Document-Title, X-Document-Pages, X-Document-Author";

/// Metadata subset echoed in failure bodies.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailureMetadata {
    /// Document title.
    pub title: String,
    /// Page count.
    pub pages: u32,
    /// Author, if scraped.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
}

impl From<&DocumentMetadata> for FailureMetadata {
    fn from(metadata: &DocumentMetadata) -> Self {
        Self {
            title: metadata.title.clone(),
            pages: metadata.pages,
            author: metadata.author.clone(),
        }
    }
}

/// JSON body of every non-200 response except the preflight.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    /// User-facing message.
    pub error: String,
    /// Generic follow-up text for internal faults.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
    /// Metadata gathered before the run failed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<FailureMetadata>,
}

/// Inserts the CORS header set into `headers`.
pub fn apply_cors(headers: &mut HeaderMap) {
    headers.insert(ACCESS_CONTROL_ALLOW_ORIGIN, HeaderValue::from_static("*"));
    headers.insert(
        ACCESS_CONTROL_ALLOW_METHODS,
        HeaderValue::from_static("POST, OPTIONS"),
    );
    headers.insert(
        ACCESS_CONTROL_ALLOW_HEADERS,
        HeaderValue::from_static("Content-Type, Authorization"),
    );
    headers.insert(
        ACCESS_CONTROL_EXPOSE_HEADERS,
        HeaderValue::from_static(EXPOSED_HEADERS),
    );
}

fn with_cors(status: StatusCode, body: Vec<u8>) -> Response<Vec<u8>> {
    let mut response = Response::new(body);
    *response.status_mut() = status;
    apply_cors(response.headers_mut());
    response
}

/// `204 No Content` answer to a CORS preflight.
#[must_use]
pub fn preflight() -> Response<Vec<u8>> {
    with_cors(StatusCode::NO_CONTENT, Vec::new())
}

/// Serializes `body` as a JSON response with `status`.
#[must_use]
pub fn json_response(status: StatusCode, body: &ErrorBody) -> Response<Vec<u8>> {
    let bytes = match serde_json::to_vec(body) {
        Ok(bytes) => bytes,
        Err(err) => {
            error!(error = %err, "failed to serialize error body");
            br#"{"error":"Internal server error"}"#.to_vec()
        }
    };
    let mut response = with_cors(status, bytes);
    response
        .headers_mut()
        .insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    response
}

/// Renders an [`ApiError`] without leaking internal detail.
#[must_use]
pub fn error_response(err: &ApiError) -> Response<Vec<u8>> {
    if err.is_client_error() {
        info!(error = %err, "rejecting request");
    } else {
        error!(error = %err, "request failed unexpectedly");
    }
    json_response(
        err.status(),
        &ErrorBody {
            error: err.public_message(),
            details: err.public_details().map(str::to_string),
            metadata: None,
        },
    )
}

fn encoded_header(value: &str) -> Option<HeaderValue> {
    HeaderValue::from_str(&urlencoding::encode(value)).ok()
}

/// Turns a retrieval outcome into the boundary response.
///
/// - `Success` → 200, raw payload, download headers
/// - `Failure` → 422, `{error, metadata}`
/// - `Cancelled` → 499, `{error: "Request cancelled"}`
#[must_use]
pub fn assemble(outcome: RetrievalOutcome) -> Response<Vec<u8>> {
    match outcome {
        RetrievalOutcome::Success {
            payload,
            strategy,
            metadata,
        } => {
            let filename = safe_pdf_filename(&metadata.title);
            info!(
                strategy = %strategy,
                filename = %filename,
                bytes = payload.len(),
                "serving document"
            );

            let length = payload.len();
            let mut response = with_cors(StatusCode::OK, payload);
            let headers = response.headers_mut();
            headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/pdf"));
            headers.insert(CONTENT_LENGTH, HeaderValue::from(length));
            if let Ok(value) = HeaderValue::from_str(&attachment_disposition(&filename)) {
                headers.insert(CONTENT_DISPOSITION, value);
            }
            if let Some(value) = encoded_header(&metadata.title) {
                headers.insert(X_DOCUMENT_TITLE, value);
            }
            headers.insert(X_DOCUMENT_PAGES, HeaderValue::from(metadata.pages));
            if let Some(value) = metadata.author.as_deref().and_then(encoded_header) {
                headers.insert(X_DOCUMENT_AUTHOR, value);
            }
            response
        }
        RetrievalOutcome::Failure { reason, metadata } => {
            warn!(title = %metadata.title, "retrieval exhausted");
            json_response(
                StatusCode::UNPROCESSABLE_ENTITY,
                &ErrorBody {
                    error: reason,
                    details: None,
                    metadata: Some(FailureMetadata::from(&metadata)),
                },
            )
        }
        RetrievalOutcome::Cancelled { .. } => {
            info!("retrieval cancelled before completion");
            let status = StatusCode::from_u16(STATUS_CLIENT_CLOSED)
                .unwrap_or(StatusCode::SERVICE_UNAVAILABLE);
            json_response(
                status,
                &ErrorBody {
                    error: CANCELLED_MESSAGE.to_string(),
                    details: None,
                    metadata: None,
                },
            )
        }
    }
}
