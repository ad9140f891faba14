//! Best-effort document metadata scraping.
//!
//! [`MetadataFetcher`] loads the canonical document page once and scrapes
//! title, page count, author and description from the HTML using the
//! ordered rule tables in `patterns`. The fetch never fails: any network or
//! parse problem degrades to [`DocumentMetadata::default`].

mod patterns;

use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::parser::{DocumentId, canonical_document_url};
use crate::user_agent::browser_headers;

use patterns::{AUTHOR_RULES, DESCRIPTION_RULES, PAGE_RULES, TITLE_RULES, first_match};

/// Title used when the page yields none.
pub const DEFAULT_TITLE: &str = "Scribd Document";

/// Metadata scraped from the document page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentMetadata {
    /// Human-readable document title.
    pub title: String,
    /// Page count, `0` when unknown.
    pub pages: u32,
    /// Author or uploader name.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
    /// Short description of the document.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl Default for DocumentMetadata {
    fn default() -> Self {
        Self {
            title: DEFAULT_TITLE.to_string(),
            pages: 0,
            author: None,
            description: None,
        }
    }
}

impl DocumentMetadata {
    /// Scrapes metadata from a document page body, filling gaps with defaults.
    #[must_use]
    pub fn from_html(html: &str) -> Self {
        let defaults = Self::default();
        Self {
            title: first_match(html, &*TITLE_RULES).unwrap_or(defaults.title),
            pages: first_match(html, &*PAGE_RULES).unwrap_or(defaults.pages),
            author: first_match(html, &*AUTHOR_RULES),
            description: first_match(html, &*DESCRIPTION_RULES),
        }
    }
}

/// Fetches the canonical document page and scrapes its metadata.
#[derive(Debug, Clone)]
pub struct MetadataFetcher {
    client: Client,
    base_url: String,
}

impl MetadataFetcher {
    /// Creates a fetcher that loads pages from `base_url` with `client`.
    #[must_use]
    pub fn new(client: Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into(),
        }
    }

    /// Loads `{base}/document/{id}` and scrapes it.
    ///
    /// Never fails. Transport errors, non-2xx pages and unreadable bodies all
    /// produce [`DocumentMetadata::default`].
    #[tracing::instrument(skip(self), fields(document_id = %id))]
    pub async fn fetch(&self, id: &DocumentId) -> DocumentMetadata {
        let page_url = canonical_document_url(&self.base_url, id);

        let response = match self
            .client
            .get(&page_url)
            .headers(browser_headers(&page_url))
            .send()
            .await
        {
            Ok(response) => response,
            Err(error) => {
                warn!(error = %error, url = %page_url, "metadata page request failed");
                return DocumentMetadata::default();
            }
        };

        let status = response.status();
        if !status.is_success() {
            warn!(status = status.as_u16(), url = %page_url, "metadata page returned error status");
            return DocumentMetadata::default();
        }

        let html = match response.text().await {
            Ok(html) => html,
            Err(error) => {
                warn!(error = %error, "metadata page body unreadable");
                return DocumentMetadata::default();
            }
        };

        let metadata = DocumentMetadata::from_html(&html);
        debug!(
            title = %metadata.title,
            pages = metadata.pages,
            author = ?metadata.author,
            "scraped document metadata"
        );
        metadata
    }
}
