//! Input parsing for document URLs.
//!
//! This module turns a user-supplied document-sharing URL into the numeric
//! [`DocumentId`] that every downstream component keys on. It also exposes
//! the target-domain check used by the request boundary to reject URLs from
//! other sites before any network traffic happens.
//!
//! # Example
//!
//! ```
//! use docproxy_core::parser::extract_document_id;
//!
//! let id = extract_document_id("https://www.scribd.com/document/123456789/Sample").unwrap();
//! assert_eq!(id.as_str(), "123456789");
//! ```

mod document_id;

pub use document_id::{
    DocumentId, TARGET_DOMAIN, canonical_document_url, extract_document_id,
    references_target_domain,
};
