//! The proxy boundary.
//!
//! [`ProxyService::handle`] implements the whole request contract on plain
//! `http` types: method dispatch, body validation, identifier extraction,
//! metadata scraping, the strategy run and response assembly. The server
//! module only adapts it to a listener.
//!
//! # Example
//!
//! ```no_run
//! use docproxy_core::api::ProxyService;
//! use docproxy_core::retrieval::RetrievalSettings;
//! use http::Method;
//! use tokio_util::sync::CancellationToken;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let service = ProxyService::from_settings(&RetrievalSettings::default())?;
//! let body = br#"{"url":"https://www.scribd.com/document/123456789/Title"}"#;
//! let response = service
//!     .handle(&Method::POST, body, CancellationToken::new())
//!     .await;
//! println!("status: {}", response.status());
//! # Ok(())
//! # }
//! ```

mod error;
pub mod filename;
mod response;

pub use error::{ApiError, INTERNAL_ERROR_DETAILS, INTERNAL_ERROR_MESSAGE};
pub use filename::{
    FALLBACK_FILENAME_STEM, attachment_disposition, attachment_filename, resolve_unique_path,
    safe_filename_stem, safe_pdf_filename,
};
pub use response::{
    CANCELLED_MESSAGE, ErrorBody, FailureMetadata, STATUS_CLIENT_CLOSED, X_DOCUMENT_AUTHOR,
    X_DOCUMENT_PAGES, X_DOCUMENT_TITLE, apply_cors, assemble, error_response, preflight,
};

use std::sync::Arc;

use http::{Method, Response};
use serde_json::Value;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::metadata::{DocumentMetadata, MetadataFetcher};
use crate::parser::{DocumentId, extract_document_id, references_target_domain};
use crate::retrieval::{
    RedirectPolicy, RetrievalError, RetrievalOutcome, RetrievalSettings, StrategyRunner,
    UpstreamClients, build_default_runner_with_clients, normalize_base_url,
};

/// Request handler shared by every connection.
#[derive(Debug)]
pub struct ProxyService {
    metadata: MetadataFetcher,
    runner: StrategyRunner,
}

impl ProxyService {
    /// Creates a service from already-built parts.
    #[must_use]
    pub fn new(metadata: MetadataFetcher, runner: StrategyRunner) -> Self {
        Self { metadata, runner }
    }

    /// Builds the default metadata fetcher and strategy runner.
    ///
    /// # Errors
    ///
    /// Returns [`RetrievalError`] if the base URL is invalid or the HTTP
    /// clients cannot be built.
    pub fn from_settings(settings: &RetrievalSettings) -> Result<Self, RetrievalError> {
        let base_url = normalize_base_url(&settings.base_url)?;
        let clients = Arc::new(UpstreamClients::new(settings.timeouts)?);
        let runner = build_default_runner_with_clients(settings, &clients)?;
        let page_client = clients.for_policy(RedirectPolicy::Follow).clone();
        let metadata = MetadataFetcher::new(page_client, base_url);
        Ok(Self::new(metadata, runner))
    }

    /// The strategy runner used for every request.
    #[must_use]
    pub fn runner(&self) -> &StrategyRunner {
        &self.runner
    }

    /// Handles one request end to end. Never fails; every error is a response.
    #[tracing::instrument(skip(self, body, cancel), fields(method = %method, body_len = body.len()))]
    pub async fn handle(
        &self,
        method: &Method,
        body: &[u8],
        cancel: CancellationToken,
    ) -> Response<Vec<u8>> {
        if method == Method::OPTIONS {
            return preflight();
        }
        if method != Method::POST {
            return error_response(&ApiError::method_not_allowed(method.as_str()));
        }

        let id = match parse_request(body) {
            Ok(id) => id,
            Err(err) => return error_response(&err),
        };
        info!(document_id = %id, "processing document");

        let metadata = tokio::select! {
            biased;
            () = cancel.cancelled() => {
                return assemble(RetrievalOutcome::Cancelled {
                    metadata: DocumentMetadata::default(),
                });
            }
            metadata = self.metadata.fetch(&id) => metadata,
        };

        let outcome = self.runner.retrieve(&id, metadata, &cancel).await;
        assemble(outcome)
    }
}

/// Validates the JSON body and extracts the document id.
///
/// # Errors
///
/// - [`ApiError::MalformedBody`] when the body is not JSON
/// - [`ApiError::MissingUrl`] when `url` is absent, empty or not a string
/// - [`ApiError::UnsupportedDomain`] when the URL is for another site
/// - [`ApiError::UnrecognizedUrl`] when no id can be extracted
pub fn parse_request(body: &[u8]) -> Result<DocumentId, ApiError> {
    let value: Value =
        serde_json::from_slice(body).map_err(|source| ApiError::MalformedBody { source })?;

    let url = value
        .get("url")
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|url| !url.is_empty())
        .ok_or(ApiError::MissingUrl)?;

    if !references_target_domain(url) {
        return Err(ApiError::unsupported_domain(url));
    }

    let id = extract_document_id(url).ok_or_else(|| ApiError::unrecognized_url(url))?;
    debug!(url, document_id = %id, "extracted document id");
    Ok(id)
}
