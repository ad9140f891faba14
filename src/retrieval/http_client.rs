//! Shared HTTP client construction for upstream requests.
//!
//! Redirect handling is a client-level setting in `reqwest`, so the proxy
//! keeps one client per [`RedirectPolicy`]. Both share the same timeouts.

use std::time::Duration;

use reqwest::{Client, redirect};
use url::Url;

use super::{RedirectPolicy, RetrievalError};

/// Maximum redirect hops followed by [`RedirectPolicy::Follow`] clients.
const MAX_REDIRECTS: usize = 10;

/// Per-call network timeouts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HttpTimeouts {
    /// TCP/TLS connect timeout.
    pub connect: Duration,
    /// Whole-request timeout, including body transfer.
    pub request: Duration,
}

/// Upstream clients keyed by redirect policy.
#[derive(Debug, Clone)]
pub struct UpstreamClients {
    follow: Client,
    manual: Client,
}

impl UpstreamClients {
    /// Builds both clients with `timeouts`.
    ///
    /// # Errors
    ///
    /// Returns [`RetrievalError::ClientBuild`] if either client cannot be built.
    pub fn new(timeouts: HttpTimeouts) -> Result<Self, RetrievalError> {
        Ok(Self {
            follow: build_client(timeouts, RedirectPolicy::Follow)?,
            manual: build_client(timeouts, RedirectPolicy::Manual)?,
        })
    }

    /// Returns the client implementing `policy`.
    #[must_use]
    pub fn for_policy(&self, policy: RedirectPolicy) -> &Client {
        match policy {
            RedirectPolicy::Follow => &self.follow,
            RedirectPolicy::Manual => &self.manual,
        }
    }
}

fn build_client(timeouts: HttpTimeouts, policy: RedirectPolicy) -> Result<Client, RetrievalError> {
    let redirect = match policy {
        RedirectPolicy::Follow => redirect::Policy::limited(MAX_REDIRECTS),
        RedirectPolicy::Manual => redirect::Policy::none(),
    };
    Client::builder()
        .connect_timeout(timeouts.connect)
        .timeout(timeouts.request)
        .redirect(redirect)
        .gzip(true)
        .build()
        .map_err(|source| RetrievalError::ClientBuild { source })
}

/// Validates and normalizes an upstream base URL (no trailing slash).
///
/// # Errors
///
/// Returns [`RetrievalError::InvalidBaseUrl`] when the value does not parse
/// or is not an http(s) URL with a host.
pub fn normalize_base_url(raw: &str) -> Result<String, RetrievalError> {
    let parsed =
        Url::parse(raw).map_err(|e| RetrievalError::invalid_base_url(raw, &e.to_string()))?;
    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(RetrievalError::invalid_base_url(raw, "unsupported scheme"));
    }
    if parsed.host_str().is_none() {
        return Err(RetrievalError::invalid_base_url(raw, "missing host"));
    }
    Ok(raw.trim_end_matches('/').to_string())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn timeouts() -> HttpTimeouts {
        HttpTimeouts {
            connect: Duration::from_secs(1),
            request: Duration::from_secs(2),
        }
    }

    #[test]
    fn test_upstream_clients_build() {
        let clients = UpstreamClients::new(timeouts());
        assert!(clients.is_ok());
    }

    #[test]
    fn test_normalize_base_url_strips_trailing_slash() {
        assert_eq!(
            normalize_base_url("https://www.scribd.com/").unwrap(),
            "https://www.scribd.com"
        );
        assert_eq!(
            normalize_base_url("http://127.0.0.1:8080").unwrap(),
            "http://127.0.0.1:8080"
        );
    }

    #[test]
    fn test_normalize_base_url_rejects_bad_values() {
        assert!(normalize_base_url("not a url").is_err());
        assert!(normalize_base_url("ftp://files.example.com").is_err());
        assert!(normalize_base_url("file:///tmp").is_err());
    }
}
