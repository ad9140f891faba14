//! Document identifier extraction from Scribd URL shapes.

use std::fmt;
use std::sync::LazyLock;

use regex::Regex;
use tracing::{debug, trace};

use crate::utils::compile_static_regex;

/// Domain every accepted document URL must reference.
pub const TARGET_DOMAIN: &str = "scribd.com";

/// Recognized URL shapes, tried in order. Each captures the numeric id in group 1.
static DOCUMENT_ID_PATTERNS: LazyLock<[Regex; 3]> = LazyLock::new(|| {
    [
        compile_static_regex(r"(?i)scribd\.com/document/(\d+)"),
        compile_static_regex(r"(?i)scribd\.com/doc/(\d+)"),
        compile_static_regex(r"(?i)scribd\.com/embeds/(\d+)"),
    ]
});

/// Numeric identifier of a document on the target platform.
///
/// Only constructed by [`extract_document_id`], so the inner string is
/// always a non-empty run of ASCII digits.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DocumentId(String);

impl DocumentId {
    /// Returns the identifier digits.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DocumentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Returns true if `url` mentions the target domain at all.
#[must_use]
pub fn references_target_domain(url: &str) -> bool {
    url.to_ascii_lowercase().contains(TARGET_DOMAIN)
}

/// Extracts the document identifier from a document URL.
///
/// Supports `/document/{id}`, `/doc/{id}` and `/embeds/{id}` paths. Returns
/// `None` when no shape matches; callers treat that as invalid client input.
#[must_use]
#[tracing::instrument(level = "debug")]
pub fn extract_document_id(url: &str) -> Option<DocumentId> {
    let found = DOCUMENT_ID_PATTERNS.iter().find_map(|pattern| {
        pattern
            .captures(url)
            .and_then(|caps| caps.get(1))
            .map(|m| m.as_str().to_string())
    });

    match found {
        Some(id) => {
            debug!(document_id = %id, "extracted document id");
            Some(DocumentId(id))
        }
        None => {
            trace!("no document id pattern matched");
            None
        }
    }
}

/// Canonical reader-page URL for a document under `base_url`.
#[must_use]
pub fn canonical_document_url(base_url: &str, id: &DocumentId) -> String {
    format!("{}/document/{}", base_url.trim_end_matches('/'), id)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_document_path() {
        let id = extract_document_id("https://www.scribd.com/document/123456789/Sample").unwrap();
        assert_eq!(id.as_str(), "123456789");
    }

    #[test]
    fn test_extract_doc_path() {
        let id = extract_document_id("https://www.scribd.com/doc/42/Old-Style").unwrap();
        assert_eq!(id.as_str(), "42");
    }

    #[test]
    fn test_extract_embeds_path() {
        let id = extract_document_id("https://www.scribd.com/embeds/987654/content").unwrap();
        assert_eq!(id.as_str(), "987654");
    }

    #[test]
    fn test_extract_without_www_or_scheme() {
        let id = extract_document_id("scribd.com/document/555").unwrap();
        assert_eq!(id.to_string(), "555");
    }

    #[test]
    fn test_extract_rejects_missing_digits() {
        assert!(extract_document_id("https://www.scribd.com/document/Sample-Title").is_none());
        assert!(extract_document_id("https://www.scribd.com/document/").is_none());
    }

    #[test]
    fn test_extract_rejects_unknown_shapes() {
        assert!(extract_document_id("https://www.scribd.com/user/12345/someone").is_none());
        assert!(extract_document_id("https://example.com/document/12345").is_none());
        assert!(extract_document_id("").is_none());
    }

    #[test]
    fn test_extracted_id_is_all_digits() {
        for url in [
            "https://www.scribd.com/document/1/a",
            "https://www.scribd.com/doc/0042",
            "https://www.scribd.com/embeds/77?start_page=1",
        ] {
            let id = extract_document_id(url).unwrap();
            assert!(!id.as_str().is_empty());
            assert!(
                id.as_str().chars().all(|c| c.is_ascii_digit()),
                "non-digit id from {url}"
            );
        }
    }

    #[test]
    fn test_references_target_domain() {
        assert!(references_target_domain("https://www.scribd.com/document/1"));
        assert!(references_target_domain("HTTPS://WWW.SCRIBD.COM/document/1"));
        assert!(!references_target_domain("https://example.com/document/1"));
    }

    #[test]
    fn test_canonical_document_url_trims_trailing_slash() {
        let id = extract_document_id("https://www.scribd.com/document/99").unwrap();
        assert_eq!(
            canonical_document_url("https://www.scribd.com/", &id),
            "https://www.scribd.com/document/99"
        );
    }
}
