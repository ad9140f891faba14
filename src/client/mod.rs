//! Companion client for the proxy.
//!
//! [`ProxyClient`] posts a document URL to a running proxy, applies the
//! bounded retry policy, honours cancellation, and returns the PDF bytes with
//! the metadata carried in the response headers.
//!
//! # Example
//!
//! ```no_run
//! use docproxy_core::client::{FetchOutcome, ProxyClient};
//! use tokio_util::sync::CancellationToken;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let client = ProxyClient::new("http://127.0.0.1:8787/")?;
//! let outcome = client
//!     .fetch("https://www.scribd.com/document/123456789/Title", &CancellationToken::new())
//!     .await;
//! if let FetchOutcome::Completed(document) = outcome {
//!     println!("{} ({} bytes)", document.filename, document.bytes.len());
//! }
//! # Ok(())
//! # }
//! ```

mod error;
mod retry;

pub use error::ClientError;
pub use retry::{DEFAULT_MAX_RETRIES, DEFAULT_RETRY_DELAY, RetryDecision, RetryPolicy};

use std::time::Duration;

use http::header::CONTENT_DISPOSITION;
use reqwest::{Client, Response};
use serde_json::json;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

use crate::api::{
    ErrorBody, X_DOCUMENT_AUTHOR, X_DOCUMENT_PAGES, X_DOCUMENT_TITLE, attachment_filename,
    safe_pdf_filename,
};
use crate::metadata::DEFAULT_TITLE;
use crate::parser::{extract_document_id, references_target_domain};
use crate::validator::is_valid_payload;

/// Connect timeout for proxy calls.
pub const CLIENT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Whole-call timeout; longer than the proxy's own retrieval budget.
pub const CLIENT_REQUEST_TIMEOUT: Duration = Duration::from_secs(120);

/// A PDF returned by the proxy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchedDocument {
    /// Raw PDF bytes.
    pub bytes: Vec<u8>,
    /// Filename from `Content-Disposition`.
    pub filename: String,
    /// Decoded `X-Document-Title`.
    pub title: String,
    /// `X-Document-Pages`, `0` when absent.
    pub pages: u32,
    /// Decoded `X-Document-Author`.
    pub author: Option<String>,
}

/// Terminal result of [`ProxyClient::fetch`].
#[derive(Debug)]
pub enum FetchOutcome {
    /// The proxy returned a PDF.
    Completed(FetchedDocument),
    /// The last attempt failed and no retry remains.
    Failed(ClientError),
    /// The caller cancelled.
    Cancelled,
}

/// Progress notifications emitted during a fetch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchEvent {
    /// A request is about to be sent; `attempt` is 1-indexed.
    Attempt {
        /// Current attempt.
        attempt: u32,
        /// Maximum attempts.
        of: u32,
    },
    /// The previous attempt failed and a retry is scheduled.
    Retrying {
        /// Delay before the retry.
        delay: Duration,
        /// Why the previous attempt failed.
        reason: String,
    },
}

/// HTTP client for a running proxy.
#[derive(Debug, Clone)]
pub struct ProxyClient {
    client: Client,
    endpoint: String,
    retry: RetryPolicy,
}

impl ProxyClient {
    /// Creates a client for the proxy at `endpoint` with the default retry policy.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::ClientBuild`] if the HTTP client cannot be built.
    pub fn new(endpoint: impl Into<String>) -> Result<Self, ClientError> {
        let client = Client::builder()
            .connect_timeout(CLIENT_CONNECT_TIMEOUT)
            .timeout(CLIENT_REQUEST_TIMEOUT)
            .build()
            .map_err(|source| ClientError::ClientBuild { source })?;
        Ok(Self {
            client,
            endpoint: endpoint.into(),
            retry: RetryPolicy::default(),
        })
    }

    /// Replaces the retry policy.
    #[must_use]
    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Proxy endpoint URL.
    #[must_use]
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Fetches `url` through the proxy.
    pub async fn fetch(&self, url: &str, cancel: &CancellationToken) -> FetchOutcome {
        self.fetch_with_events(url, cancel, |_| {}).await
    }

    /// Fetches `url` through the proxy, reporting progress to `on_event`.
    #[instrument(skip(self, cancel, on_event), fields(endpoint = %self.endpoint))]
    pub async fn fetch_with_events(
        &self,
        url: &str,
        cancel: &CancellationToken,
        mut on_event: impl FnMut(FetchEvent),
    ) -> FetchOutcome {
        let url = url.trim();
        if !references_target_domain(url) || extract_document_id(url).is_none() {
            return FetchOutcome::Failed(ClientError::invalid_url(url));
        }

        let max_attempts = self.retry.max_retries() + 1;
        let mut retries_done = 0;
        loop {
            on_event(FetchEvent::Attempt {
                attempt: retries_done + 1,
                of: max_attempts,
            });

            let result = tokio::select! {
                biased;
                () = cancel.cancelled() => {
                    info!("fetch cancelled");
                    return FetchOutcome::Cancelled;
                }
                result = self.attempt(url) => result,
            };

            let error = match result {
                Ok(document) => return FetchOutcome::Completed(document),
                Err(error) => error,
            };

            match self.retry.should_retry(&error, retries_done) {
                RetryDecision::Retry { delay, retry } => {
                    warn!(error = %error, retry, delay_ms = delay.as_millis(), "proxy call failed, retrying");
                    on_event(FetchEvent::Retrying {
                        delay,
                        reason: error.to_string(),
                    });
                    tokio::select! {
                        biased;
                        () = cancel.cancelled() => {
                            info!("fetch cancelled during retry delay");
                            return FetchOutcome::Cancelled;
                        }
                        () = tokio::time::sleep(delay) => {}
                    }
                    retries_done = retry;
                }
                RetryDecision::DoNotRetry { reason } => {
                    debug!(reason, "not retrying");
                    return FetchOutcome::Failed(error);
                }
            }
        }
    }

    async fn attempt(&self, url: &str) -> Result<FetchedDocument, ClientError> {
        let response = self
            .client
            .post(&self.endpoint)
            .json(&json!({ "url": url }))
            .send()
            .await
            .map_err(|source| ClientError::network(&self.endpoint, source))?;

        let status = response.status();
        if !status.is_success() {
            return Err(self.rejection(response).await);
        }

        let title = decoded_header(&response, X_DOCUMENT_TITLE.as_str())
            .unwrap_or_else(|| DEFAULT_TITLE.to_string());
        let author = decoded_header(&response, X_DOCUMENT_AUTHOR.as_str());
        let pages = response
            .headers()
            .get(X_DOCUMENT_PAGES.as_str())
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.trim().parse().ok())
            .unwrap_or(0);
        let filename = response
            .headers()
            .get(CONTENT_DISPOSITION.as_str())
            .and_then(|value| value.to_str().ok())
            .and_then(attachment_filename)
            .unwrap_or_else(|| safe_pdf_filename(&title));

        let bytes = response
            .bytes()
            .await
            .map_err(|source| ClientError::network(&self.endpoint, source))?
            .to_vec();
        if !is_valid_payload(&bytes) {
            return Err(ClientError::InvalidPayload { bytes: bytes.len() });
        }

        info!(filename = %filename, bytes = bytes.len(), pages, "document received");
        Ok(FetchedDocument {
            bytes,
            filename,
            title,
            pages,
            author,
        })
    }

    async fn rejection(&self, response: Response) -> ClientError {
        let status = response.status();
        let fallback = status
            .canonical_reason()
            .map_or_else(|| format!("HTTP {}", status.as_u16()), str::to_string);
        let body = match response.bytes().await {
            Ok(body) => body,
            Err(source) => return ClientError::network(&self.endpoint, source),
        };
        match serde_json::from_slice::<ErrorBody>(&body) {
            Ok(parsed) => ClientError::rejected(status.as_u16(), parsed.error, parsed.metadata),
            Err(_) => ClientError::rejected(status.as_u16(), fallback, None),
        }
    }
}

fn decoded_header(response: &Response, name: &str) -> Option<String> {
    let raw = response.headers().get(name)?.to_str().ok()?;
    let decoded = urlencoding::decode(raw)
        .map(|value| value.into_owned())
        .unwrap_or_else(|_| raw.to_string());
    let decoded = decoded.trim();
    if decoded.is_empty() {
        None
    } else {
        Some(decoded.to_string())
    }
}
