//! CLI entry point for docproxy.

use std::io::{self, IsTerminal};
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use docproxy_core::api::{ProxyService, resolve_unique_path};
use docproxy_core::client::{ClientError, FetchEvent, FetchOutcome, ProxyClient, RetryPolicy};
use docproxy_core::config::{load_file_config, resolve_server_config};
use indicatif::{ProgressBar, ProgressStyle};
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

mod cli;

use cli::{Args, Command, FetchArgs, ServeArgs};

/// Process outcome mapped to an exit status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ProcessExit {
    Success,
    Failure,
    Cancelled,
}

impl ProcessExit {
    fn code(self) -> u8 {
        match self {
            Self::Success => 0,
            Self::Failure => 1,
            Self::Cancelled => 130,
        }
    }
}

impl From<ProcessExit> for ExitCode {
    fn from(exit: ProcessExit) -> Self {
        ExitCode::from(exit.code())
    }
}

fn default_log_level(verbose: u8, quiet: bool) -> &'static str {
    if quiet {
        "error"
    } else {
        match verbose {
            0 => "info",
            1 => "debug",
            _ => "trace",
        }
    }
}

// Priority: RUST_LOG env var > quiet flag > verbose flag > default (info)
fn init_tracing(default_level: &str) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level));
    let _ = tracing_subscriber::fmt()
        .with_writer(io::stderr)
        .with_env_filter(filter)
        .try_init();
}

fn is_dumb_terminal() -> bool {
    std::env::var("TERM")
        .map(|value| value.eq_ignore_ascii_case("dumb"))
        .unwrap_or(false)
}

fn should_use_spinner(stderr_is_terminal: bool, quiet: bool, no_progress: bool) -> bool {
    stderr_is_terminal && !quiet && !no_progress && !is_dumb_terminal()
}

/// Cancels `token` on the first Ctrl-C.
fn cancel_on_ctrl_c(token: CancellationToken) {
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("interrupt received, shutting down");
            token.cancel();
        }
    });
}

/// Failure text for the terminal, including any metadata the proxy scraped.
fn describe_failure(err: &ClientError) -> String {
    let ClientError::Rejected {
        metadata: Some(metadata),
        ..
    } = err
    else {
        return err.to_string();
    };

    let mut lines = vec![err.to_string(), format!("  Title: {}", metadata.title)];
    if metadata.pages > 0 {
        lines.push(format!("  Pages: {}", metadata.pages));
    }
    if let Some(author) = &metadata.author {
        lines.push(format!("  Author: {author}"));
    }
    lines.join("\n")
}

#[tokio::main]
async fn main() -> ExitCode {
    // Parse CLI arguments first (before tracing, so --help works without logs)
    let args = Args::parse();
    init_tracing(default_log_level(args.verbose, args.quiet));
    debug!(?args, "CLI arguments parsed");

    let result = match &args.command {
        Command::Serve(serve_args) => run_serve(serve_args).await,
        Command::Fetch(fetch_args) => run_fetch(fetch_args, args.quiet).await,
    };

    match result {
        Ok(exit) => exit.into(),
        Err(err) => {
            error!("{err:#}");
            ExitCode::from(1)
        }
    }
}

async fn run_serve(args: &ServeArgs) -> Result<ProcessExit> {
    let file_config = load_file_config(args.config.as_deref())?;
    let config = resolve_server_config(&args.overrides(), file_config.as_ref())?;
    debug!(?config, "resolved server config");

    let service = Arc::new(ProxyService::from_settings(&config.retrieval)?);
    info!(
        strategies = service.runner().strategy_count(),
        base_url = %config.retrieval.base_url,
        budget_secs = service.runner().budget().as_secs(),
        "retrieval stack ready"
    );

    let listener = TcpListener::bind(config.bind)
        .await
        .with_context(|| format!("Failed to bind {}", config.bind))?;

    let shutdown = CancellationToken::new();
    cancel_on_ctrl_c(shutdown.clone());
    docproxy_core::server::run(listener, service, shutdown).await?;
    Ok(ProcessExit::Success)
}

async fn run_fetch(args: &FetchArgs, quiet: bool) -> Result<ProcessExit> {
    let retry = RetryPolicy::new(
        u32::from(args.max_retries),
        Duration::from_millis(args.retry_delay_ms),
    );
    let client = ProxyClient::new(args.endpoint.clone())?.with_retry_policy(retry);
    debug!(endpoint = client.endpoint(), ?retry, "proxy client ready");

    let cancel = CancellationToken::new();
    cancel_on_ctrl_c(cancel.clone());

    let spinner = should_use_spinner(io::stderr().is_terminal(), quiet, args.no_progress)
        .then(|| {
            let spinner = ProgressBar::new_spinner();
            spinner.set_style(
                ProgressStyle::with_template("{spinner} {msg}")
                    .unwrap_or_else(|_| ProgressStyle::default_spinner()),
            );
            spinner.enable_steady_tick(Duration::from_millis(100));
            spinner
        });

    let outcome = client
        .fetch_with_events(&args.url, &cancel, |event| {
            let Some(spinner) = &spinner else {
                return;
            };
            match event {
                FetchEvent::Attempt { attempt: 1, .. } => {
                    spinner.set_message("Fetching document...");
                }
                FetchEvent::Attempt { attempt, of } => {
                    spinner.set_message(format!("Retrying ({attempt}/{of})..."));
                }
                FetchEvent::Retrying { delay, .. } => {
                    spinner.set_message(format!(
                        "Attempt failed, retrying in {}s...",
                        delay.as_secs()
                    ));
                }
            }
        })
        .await;

    if let Some(spinner) = &spinner {
        spinner.finish_and_clear();
    }

    match outcome {
        FetchOutcome::Completed(document) => {
            tokio::fs::create_dir_all(&args.output_dir)
                .await
                .with_context(|| {
                    format!("Failed to create output directory '{}'", args.output_dir.display())
                })?;
            let path = resolve_unique_path(&args.output_dir, &document.filename);
            tokio::fs::write(&path, &document.bytes)
                .await
                .with_context(|| format!("Failed to write '{}'", path.display()))?;
            info!(
                path = %path.display(),
                title = %document.title,
                pages = document.pages,
                bytes = document.bytes.len(),
                "Document saved"
            );
            Ok(ProcessExit::Success)
        }
        FetchOutcome::Failed(err) => {
            error!("{}", describe_failure(&err));
            Ok(ProcessExit::Failure)
        }
        FetchOutcome::Cancelled => {
            warn!("Fetch cancelled");
            Ok(ProcessExit::Cancelled)
        }
    }
}
