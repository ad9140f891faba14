//! HTTP listener for the proxy boundary.
//!
//! Adapts [`ProxyService`] to `axum`. Every request gets a child token of the
//! server-wide shutdown token; dropping the request future on client
//! disconnect drops the in-flight upstream call, and cancelling the shutdown
//! token ends in-flight runs as `Cancelled` before the listener drains.

use std::sync::Arc;

use axum::Router;
use axum::body::{Body, Bytes};
use axum::extract::State;
use axum::http::Method;
use axum::response::Response;
use axum::routing::any;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::api::ProxyService;

#[derive(Clone)]
struct AppState {
    service: Arc<ProxyService>,
    shutdown: CancellationToken,
}

/// Builds the router. The proxy answers on every path so it can be mounted
/// behind any prefix.
pub fn router(service: Arc<ProxyService>, shutdown: CancellationToken) -> Router {
    Router::new()
        .route("/", any(dispatch))
        .fallback(dispatch)
        .with_state(AppState { service, shutdown })
}

async fn dispatch(State(state): State<AppState>, method: Method, body: Bytes) -> Response {
    let cancel = state.shutdown.child_token();
    debug!(%method, bytes = body.len(), "request received");
    state
        .service
        .handle(&method, &body, cancel)
        .await
        .map(Body::from)
}

/// Serves on `listener` until `shutdown` is cancelled.
///
/// # Errors
///
/// Returns the listener's I/O error if accepting connections fails.
pub async fn run(
    listener: TcpListener,
    service: Arc<ProxyService>,
    shutdown: CancellationToken,
) -> std::io::Result<()> {
    if let Ok(addr) = listener.local_addr() {
        info!(%addr, "proxy listening");
    }
    let app = router(service, shutdown.clone());
    axum::serve(listener, app)
        .with_graceful_shutdown(async move { shutdown.cancelled().await })
        .await?;
    info!("proxy stopped");
    Ok(())
}
