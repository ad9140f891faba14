//! CLI argument definitions using clap derive macros.

use std::net::SocketAddr;
use std::path::PathBuf;

use clap::{Parser, Subcommand};

use docproxy_core::client::DEFAULT_MAX_RETRIES;
use docproxy_core::config::ServeOverrides;

/// Default proxy endpoint used by `fetch`.
pub const DEFAULT_ENDPOINT: &str = "http://127.0.0.1:8787/";

/// Fetch public documents as validated PDFs.
///
/// `serve` runs the retrieval proxy; `fetch` calls a running proxy and saves
/// the result.
#[derive(Parser, Debug)]
#[command(name = "docproxy")]
#[command(author, version, about)]
pub struct Args {
    /// Increase output verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run the retrieval proxy
    Serve(ServeArgs),
    /// Fetch a document through a running proxy
    Fetch(FetchArgs),
}

#[derive(clap::Args, Debug, Clone)]
pub struct ServeArgs {
    /// Listen address (default 127.0.0.1:8787)
    #[arg(short, long)]
    pub bind: Option<SocketAddr>,

    /// Config file (default $XDG_CONFIG_HOME/docproxy/config.toml)
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Upstream base URL
    #[arg(long)]
    pub base_url: Option<String>,

    /// Connect timeout per upstream call in seconds (1-3600)
    #[arg(long, value_parser = clap::value_parser!(u64).range(1..=3600))]
    pub connect_timeout_secs: Option<u64>,

    /// Whole-request timeout per upstream call in seconds (1-3600)
    #[arg(long, value_parser = clap::value_parser!(u64).range(1..=3600))]
    pub request_timeout_secs: Option<u64>,

    /// Budget for all strategies of one request in seconds (1-3600)
    #[arg(long, value_parser = clap::value_parser!(u64).range(1..=3600))]
    pub budget_secs: Option<u64>,

    /// Maximum accepted PDF size in bytes
    #[arg(long)]
    pub max_payload_bytes: Option<u64>,
}

impl ServeArgs {
    /// Values given on the command line, for merging over the config file.
    #[must_use]
    pub fn overrides(&self) -> ServeOverrides {
        ServeOverrides {
            bind: self.bind,
            base_url: self.base_url.clone(),
            connect_timeout_secs: self.connect_timeout_secs,
            request_timeout_secs: self.request_timeout_secs,
            budget_secs: self.budget_secs,
            max_payload_bytes: self.max_payload_bytes,
        }
    }
}

#[derive(clap::Args, Debug, Clone)]
pub struct FetchArgs {
    /// Document URL, e.g. https://www.scribd.com/document/123456789/Title
    pub url: String,

    /// Proxy endpoint
    #[arg(short, long, default_value = DEFAULT_ENDPOINT)]
    pub endpoint: String,

    /// Directory for the saved PDF
    #[arg(short, long, default_value = ".")]
    pub output_dir: PathBuf,

    /// Retries for transient failures (0-10)
    #[arg(short = 'r', long, default_value_t = DEFAULT_MAX_RETRIES as u8, value_parser = clap::value_parser!(u8).range(0..=10))]
    pub max_retries: u8,

    /// Delay between retries in milliseconds (max 60000)
    #[arg(long, default_value_t = 2000, value_parser = clap::value_parser!(u64).range(0..=60000))]
    pub retry_delay_ms: u64,

    /// Disable the progress spinner
    #[arg(long)]
    pub no_progress: bool,
}
