//! docproxy Core Library
//!
//! A document-retrieval proxy: given a public document URL it extracts the
//! document id, tries several retrieval endpoints in order, validates the
//! returned bytes as a PDF, and returns the file with scraped metadata.
//!
//! # Architecture
//!
//! The library is organized into the following modules:
//! - [`parser`] - Document id extraction from submitted URLs
//! - [`metadata`] - Best-effort title/pages/author scraping
//! - [`retrieval`] - Ordered strategy runner with budget and cancellation
//! - [`validator`] - Response head and PDF signature checks
//! - [`api`] - Request handling and response assembly
//! - [`server`] - HTTP listener for the proxy
//! - [`client`] - Companion client with bounded retries
//! - [`config`] - File configuration and CLI merge

// Clippy lints - strict for library code
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod api;
pub mod client;
pub mod config;
pub mod metadata;
pub mod parser;
pub mod retrieval;
pub mod server;
pub mod user_agent;
pub(crate) mod utils;
pub mod validator;

// Re-export commonly used types
pub use api::{ApiError, ProxyService};
pub use client::{ClientError, FetchOutcome, FetchedDocument, ProxyClient, RetryPolicy};
pub use metadata::{DocumentMetadata, MetadataFetcher};
pub use parser::{DocumentId, extract_document_id};
pub use retrieval::{
    RetrievalOutcome, RetrievalSettings, RetrievalStrategy, StrategyRunner, build_default_runner,
};
pub use validator::{ValidationError, is_valid_payload};
