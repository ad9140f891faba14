#![allow(dead_code)]

pub mod socket_guard;

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use docproxy_core::ProxyService;
use docproxy_core::retrieval::{HttpTimeouts, RetrievalSettings};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// Minimal valid PDF body.
pub const PDF_BYTES: &[u8] = b"%PDF-1.7\n1 0 obj\n<< /Type /Catalog >>\nendobj\n%%EOF\n";

/// A document URL whose id is `123456789`.
pub const DOC_URL: &str = "https://www.scribd.com/document/123456789/Sample-Title";

/// Retrieval settings pointed at a mock upstream with short timeouts.
pub fn settings_for(base_url: &str) -> RetrievalSettings {
    RetrievalSettings {
        base_url: base_url.to_string(),
        timeouts: HttpTimeouts {
            connect: Duration::from_secs(2),
            request: Duration::from_secs(5),
        },
        budget: Duration::from_secs(30),
        max_payload_bytes: 1024 * 1024,
    }
}

/// A proxy served on an ephemeral port.
pub struct RunningProxy {
    pub addr: SocketAddr,
    pub shutdown: CancellationToken,
    pub handle: JoinHandle<std::io::Result<()>>,
}

impl RunningProxy {
    pub fn url(&self) -> String {
        format!("http://{}/", self.addr)
    }

    pub async fn stop(self) {
        self.shutdown.cancel();
        let _ = self.handle.await;
    }
}

/// Starts a proxy whose upstream is `base_url`.
pub async fn spawn_proxy(settings: &RetrievalSettings) -> RunningProxy {
    let service = Arc::new(ProxyService::from_settings(settings).expect("service"));
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("local addr");
    let shutdown = CancellationToken::new();
    let handle = tokio::spawn(docproxy_core::server::run(
        listener,
        service,
        shutdown.clone(),
    ));
    RunningProxy {
        addr,
        shutdown,
        handle,
    }
}
