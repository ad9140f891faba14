//! Payload validation for retrieval responses.
//!
//! The target site regularly answers download endpoints with `200 OK` and a
//! misleading content type while serving an HTML login wall. Validation is
//! therefore two-phase: the response head (status and content type) is
//! checked before the body is read, and the body is then checked for the
//! PDF magic number independent of anything the headers claim.

use http::StatusCode;
use thiserror::Error;

/// Leading bytes of every PDF file (`%PDF-`).
pub const PDF_SIGNATURE: [u8; 5] = [0x25, 0x50, 0x44, 0x46, 0x2D];

/// Reasons a strategy response is rejected.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// Response status was not 2xx.
    #[error("unexpected HTTP status {status}")]
    HttpStatus {
        /// Status code returned by the endpoint.
        status: u16,
    },

    /// Content type does not announce a binary/PDF payload.
    #[error("content type {content_type:?} is not a PDF payload")]
    UnexpectedContentType {
        /// The content type header, if any.
        content_type: Option<String>,
    },

    /// Body was empty.
    #[error("empty response body")]
    EmptyBody,

    /// Body does not start with the PDF signature.
    #[error("payload does not start with the PDF signature")]
    BadSignature,

    /// Body exceeded the configured payload cap.
    #[error("payload exceeds {limit} bytes")]
    TooLarge {
        /// The configured cap in bytes.
        limit: u64,
    },
}

/// Returns true iff `buffer` starts with the PDF signature.
///
/// Buffers shorter than the signature are never valid.
#[must_use]
pub fn is_valid_payload(buffer: &[u8]) -> bool {
    buffer.len() >= PDF_SIGNATURE.len() && buffer[..PDF_SIGNATURE.len()] == PDF_SIGNATURE
}

/// Returns true if a content type header announces a PDF or generic binary body.
#[must_use]
pub fn is_pdf_content_type(content_type: Option<&str>) -> bool {
    content_type.is_some_and(|value| {
        let value = value.to_ascii_lowercase();
        value.contains("pdf") || value.contains("application/octet-stream")
    })
}

/// Checks the response head before any body bytes are read.
///
/// # Errors
///
/// Returns [`ValidationError::HttpStatus`] for non-2xx statuses and
/// [`ValidationError::UnexpectedContentType`] when the content type is not a
/// PDF/binary type.
pub fn check_response_head(
    status: StatusCode,
    content_type: Option<&str>,
) -> Result<(), ValidationError> {
    if !status.is_success() {
        return Err(ValidationError::HttpStatus {
            status: status.as_u16(),
        });
    }
    if !is_pdf_content_type(content_type) {
        return Err(ValidationError::UnexpectedContentType {
            content_type: content_type.map(str::to_string),
        });
    }
    Ok(())
}

/// Checks a fully read body.
///
/// # Errors
///
/// Returns [`ValidationError::EmptyBody`] or [`ValidationError::BadSignature`].
pub fn check_payload(buffer: &[u8]) -> Result<(), ValidationError> {
    if buffer.is_empty() {
        return Err(ValidationError::EmptyBody);
    }
    if !is_valid_payload(buffer) {
        return Err(ValidationError::BadSignature);
    }
    Ok(())
}
