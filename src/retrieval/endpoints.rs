//! Known download endpoints of the target site.
//!
//! The site exposes several legacy and alternate download code paths with
//! inconsistent availability. [`DEFAULT_ENDPOINTS`] lists them from most to
//! least reliable as observed; the runner walks this table in order.

use std::sync::Arc;

use async_trait::async_trait;
use futures_util::StreamExt;
use http::HeaderMap;
use http::header::{ACCEPT, CONTENT_TYPE, HeaderValue};
use tracing::{debug, instrument};

use crate::parser::{DocumentId, canonical_document_url};
use crate::user_agent::browser_headers;
use crate::validator::{ValidationError, check_payload, check_response_head};

use super::http_client::UpstreamClients;
use super::{AttemptError, RedirectPolicy, RetrievalStrategy, StrategyRequest};

/// Placeholder replaced by the document id in path templates.
const ID_PLACEHOLDER: &str = "{id}";

/// Static description of one download endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EndpointSpec {
    /// Human-readable strategy name used in logs.
    pub name: &'static str,
    /// Path and query relative to the base URL, with `{id}` placeholders.
    pub path_template: &'static str,
    /// `Accept` override; `None` keeps the browser default.
    pub accept: Option<&'static str>,
    /// Whether redirects are followed.
    pub redirect: RedirectPolicy,
}

/// Download endpoints in priority order.
pub const DEFAULT_ENDPOINTS: [EndpointSpec; 6] = [
    EndpointSpec {
        name: "Direct Download Endpoint",
        path_template: "/document_downloads/direct/{id}?extension=pdf&secret_password=",
        accept: Some("application/pdf,*/*"),
        redirect: RedirectPolicy::Follow,
    },
    EndpointSpec {
        name: "Classic API Endpoint",
        path_template: "/document_downloads/{id}?extension=pdf",
        accept: Some("application/pdf"),
        redirect: RedirectPolicy::Follow,
    },
    EndpointSpec {
        name: "Download Button Endpoint",
        path_template: "/doc_downloads/download_doc_modal/{id}?extension=pdf",
        accept: None,
        redirect: RedirectPolicy::Follow,
    },
    EndpointSpec {
        name: "Reader Download Parameter",
        path_template: "/document/{id}?download=true",
        accept: Some("application/pdf,text/html,*/*"),
        redirect: RedirectPolicy::Follow,
    },
    EndpointSpec {
        name: "Embeds Content Endpoint",
        path_template: "/embeds/{id}/content?download=true",
        accept: None,
        redirect: RedirectPolicy::Follow,
    },
    EndpointSpec {
        name: "Archive Endpoint",
        path_template: "/archive/document/{id}.pdf",
        accept: Some("application/pdf"),
        redirect: RedirectPolicy::Follow,
    },
];

impl EndpointSpec {
    /// Builds the concrete request for `id` under `base_url`.
    #[must_use]
    pub fn build_request(&self, base_url: &str, id: &DocumentId) -> StrategyRequest {
        let path = self.path_template.replace(ID_PLACEHOLDER, id.as_str());
        let url = format!("{}{path}", base_url.trim_end_matches('/'));

        let mut headers: HeaderMap = browser_headers(&canonical_document_url(base_url, id));
        if let Some(accept) = self.accept {
            headers.insert(ACCEPT, HeaderValue::from_static(accept));
        }

        StrategyRequest {
            url,
            headers,
            redirect: self.redirect,
        }
    }
}

/// A [`RetrievalStrategy`] backed by one [`EndpointSpec`].
#[derive(Debug, Clone)]
pub struct EndpointStrategy {
    spec: EndpointSpec,
    base_url: String,
    clients: Arc<UpstreamClients>,
    max_payload_bytes: u64,
}

impl EndpointStrategy {
    /// Creates a strategy for `spec` against `base_url`.
    #[must_use]
    pub fn new(
        spec: EndpointSpec,
        base_url: impl Into<String>,
        clients: Arc<UpstreamClients>,
        max_payload_bytes: u64,
    ) -> Self {
        Self {
            spec,
            base_url: base_url.into(),
            clients,
            max_payload_bytes,
        }
    }
}

#[async_trait]
impl RetrievalStrategy for EndpointStrategy {
    fn name(&self) -> &str {
        self.spec.name
    }

    fn build_request(&self, id: &DocumentId) -> StrategyRequest {
        self.spec.build_request(&self.base_url, id)
    }

    #[instrument(skip(self), fields(document_id = %id))]
    async fn attempt(&self, id: &DocumentId) -> Result<Vec<u8>, AttemptError> {
        let request = self.build_request(id);
        let client = self.clients.for_policy(request.redirect);

        let response = client
            .get(&request.url)
            .headers(request.headers)
            .send()
            .await
            .map_err(|source| AttemptError::transport(&request.url, source))?;

        let status = response.status();
        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .map(str::to_string);
        debug!(
            strategy = self.spec.name,
            status = status.as_u16(),
            content_type = ?content_type,
            "strategy response head"
        );

        check_response_head(status, content_type.as_deref())
            .map_err(|reason| AttemptError::rejected(&request.url, reason))?;

        if let Some(length) = response.content_length()
            && length > self.max_payload_bytes
        {
            return Err(AttemptError::rejected(
                &request.url,
                ValidationError::TooLarge {
                    limit: self.max_payload_bytes,
                },
            ));
        }

        let mut payload = Vec::new();
        let mut stream = response.bytes_stream();
        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(|source| AttemptError::transport(&request.url, source))?;
            if payload.len() as u64 + chunk.len() as u64 > self.max_payload_bytes {
                return Err(AttemptError::rejected(
                    &request.url,
                    ValidationError::TooLarge {
                        limit: self.max_payload_bytes,
                    },
                ));
            }
            payload.extend_from_slice(&chunk);
        }

        check_payload(&payload).map_err(|reason| AttemptError::rejected(&request.url, reason))?;
        debug!(strategy = self.spec.name, bytes = payload.len(), "strategy payload validated");
        Ok(payload)
    }
}

/// Instantiates every [`DEFAULT_ENDPOINTS`] entry as a boxed strategy.
#[must_use]
pub fn default_endpoint_strategies(
    base_url: &str,
    clients: &Arc<UpstreamClients>,
    max_payload_bytes: u64,
) -> Vec<Box<dyn RetrievalStrategy>> {
    DEFAULT_ENDPOINTS
        .iter()
        .map(|spec| {
            Box::new(EndpointStrategy::new(
                *spec,
                base_url,
                Arc::clone(clients),
                max_payload_bytes,
            )) as Box<dyn RetrievalStrategy>
        })
        .collect()
}
