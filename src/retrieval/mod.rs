//! Multi-strategy document retrieval.
//!
//! The target site has several download code paths, none of which is reliably
//! available. This module models each path as a [`RetrievalStrategy`] and
//! runs them through a [`StrategyRunner`]: strictly sequential, first
//! validated payload wins, and every per-attempt failure is contained.
//!
//! # Architecture
//!
//! - [`RetrievalStrategy`] - Async trait one download path implements
//! - [`EndpointStrategy`] - Strategy backed by a static [`EndpointSpec`]
//! - [`DEFAULT_ENDPOINTS`] - Endpoint table in reliability order
//! - [`StrategyRunner`] - Ordered fallback loop with deadline and cancellation
//! - [`RetrievalOutcome`] - Terminal result of one run
//!
//! # Example
//!
//! ```no_run
//! use docproxy_core::metadata::DocumentMetadata;
//! use docproxy_core::parser::extract_document_id;
//! use docproxy_core::retrieval::{RetrievalSettings, build_default_runner};
//! use tokio_util::sync::CancellationToken;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let runner = build_default_runner(&RetrievalSettings::default())?;
//! let id = extract_document_id("https://www.scribd.com/document/123/Title").ok_or("bad url")?;
//! let outcome = runner
//!     .retrieve(&id, DocumentMetadata::default(), &CancellationToken::new())
//!     .await;
//! println!("success: {}", outcome.is_success());
//! # Ok(())
//! # }
//! ```

mod endpoints;
mod error;
mod http_client;
mod runner;

pub use endpoints::{DEFAULT_ENDPOINTS, EndpointSpec, EndpointStrategy, default_endpoint_strategies};
pub use error::{AttemptError, RetrievalError};
pub use http_client::{HttpTimeouts, UpstreamClients, normalize_base_url};
pub use runner::{EXHAUSTED_MESSAGE, StrategyRunner};

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use http::HeaderMap;

use crate::metadata::DocumentMetadata;
use crate::parser::DocumentId;

/// Default upstream base URL.
pub const DEFAULT_BASE_URL: &str = "https://www.scribd.com";

/// Default connect timeout per upstream call.
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Default whole-request timeout per upstream call.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(20);

/// Default budget covering every strategy of one run.
pub const DEFAULT_BUDGET: Duration = Duration::from_secs(90);

/// Default payload cap (200 MiB).
pub const DEFAULT_MAX_PAYLOAD_BYTES: u64 = 200 * 1024 * 1024;

/// Whether a strategy request follows HTTP redirects.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RedirectPolicy {
    /// Follow up to a bounded number of redirects.
    Follow,
    /// Return redirect responses as-is (they then fail validation).
    Manual,
}

/// Concrete request a strategy issues for one document.
#[derive(Debug, Clone)]
pub struct StrategyRequest {
    /// Absolute endpoint URL.
    pub url: String,
    /// Full header set sent with the request.
    pub headers: HeaderMap,
    /// Redirect handling for this request.
    pub redirect: RedirectPolicy,
}

/// Terminal result of one retrieval run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RetrievalOutcome {
    /// A strategy produced a validated PDF.
    Success {
        /// Raw PDF bytes, unmodified.
        payload: Vec<u8>,
        /// Name of the strategy that succeeded.
        strategy: String,
        /// Metadata gathered before retrieval.
        metadata: DocumentMetadata,
    },
    /// Every strategy failed or the budget ran out.
    Failure {
        /// User-facing failure reason.
        reason: String,
        /// Metadata gathered before retrieval.
        metadata: DocumentMetadata,
    },
    /// The caller cancelled the run.
    Cancelled {
        /// Metadata gathered before retrieval.
        metadata: DocumentMetadata,
    },
}

impl RetrievalOutcome {
    /// Returns true for [`RetrievalOutcome::Success`].
    #[must_use]
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }

    /// Metadata attached to any outcome.
    #[must_use]
    pub fn metadata(&self) -> &DocumentMetadata {
        match self {
            Self::Success { metadata, .. }
            | Self::Failure { metadata, .. }
            | Self::Cancelled { metadata } => metadata,
        }
    }
}

/// One retrieval code path.
///
/// # Object Safety
///
/// This trait uses `async_trait` so the runner can hold
/// `Box<dyn RetrievalStrategy>`.
#[async_trait]
pub trait RetrievalStrategy: Send + Sync {
    /// Strategy name used in logs.
    fn name(&self) -> &str;

    /// Builds the request this strategy would issue for `id`.
    fn build_request(&self, id: &DocumentId) -> StrategyRequest;

    /// Issues the request and returns the validated payload.
    async fn attempt(&self, id: &DocumentId) -> Result<Vec<u8>, AttemptError>;
}

/// Settings for building the default retrieval stack.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetrievalSettings {
    /// Upstream base URL.
    pub base_url: String,
    /// Per-call timeouts.
    pub timeouts: HttpTimeouts,
    /// Budget for all strategies of one run.
    pub budget: Duration,
    /// Maximum accepted payload size.
    pub max_payload_bytes: u64,
}

impl Default for RetrievalSettings {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            timeouts: HttpTimeouts {
                connect: DEFAULT_CONNECT_TIMEOUT,
                request: DEFAULT_REQUEST_TIMEOUT,
            },
            budget: DEFAULT_BUDGET,
            max_payload_bytes: DEFAULT_MAX_PAYLOAD_BYTES,
        }
    }
}

/// Builds the runner over [`DEFAULT_ENDPOINTS`].
///
/// # Errors
///
/// Returns [`RetrievalError`] if the base URL is invalid or the HTTP clients
/// cannot be built.
pub fn build_default_runner(settings: &RetrievalSettings) -> Result<StrategyRunner, RetrievalError> {
    let clients = Arc::new(UpstreamClients::new(settings.timeouts)?);
    build_default_runner_with_clients(settings, &clients)
}

/// Builds the runner over [`DEFAULT_ENDPOINTS`] reusing existing clients.
///
/// # Errors
///
/// Returns [`RetrievalError::InvalidBaseUrl`] if the base URL is invalid.
pub fn build_default_runner_with_clients(
    settings: &RetrievalSettings,
    clients: &Arc<UpstreamClients>,
) -> Result<StrategyRunner, RetrievalError> {
    let base_url = normalize_base_url(&settings.base_url)?;
    let mut runner = StrategyRunner::new(settings.budget);
    for strategy in default_endpoint_strategies(&base_url, clients, settings.max_payload_bytes) {
        runner.register(strategy);
    }
    Ok(runner)
}
