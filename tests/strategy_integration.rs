//! Strategy runner against a mock upstream: order, headers, redirects, caps.

use std::sync::Arc;
use std::time::Duration;

use docproxy_core::metadata::DocumentMetadata;
use docproxy_core::parser::extract_document_id;
use docproxy_core::retrieval::{
    DEFAULT_ENDPOINTS, EndpointSpec, EndpointStrategy, HttpTimeouts, RedirectPolicy,
    RetrievalOutcome, StrategyRunner, UpstreamClients, build_default_runner,
};
use docproxy_core::user_agent::BROWSER_USER_AGENT;
use tokio_util::sync::CancellationToken;
use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Mock, ResponseTemplate};

mod support;
use support::socket_guard::{socket_skip_return, start_mock_server_or_skip};
use support::{DOC_URL, PDF_BYTES, settings_for};

fn pdf_response() -> ResponseTemplate {
    ResponseTemplate::new(200)
        .insert_header("content-type", "application/pdf")
        .set_body_bytes(PDF_BYTES)
}

fn clients() -> Arc<UpstreamClients> {
    Arc::new(
        UpstreamClients::new(HttpTimeouts {
            connect: Duration::from_secs(2),
            request: Duration::from_secs(5),
        })
        .expect("clients"),
    )
}

#[tokio::test]
async fn test_first_valid_endpoint_wins_and_later_endpoints_are_not_called() {
    let Some(upstream) = start_mock_server_or_skip().await else {
        return socket_skip_return();
    };

    Mock::given(method("GET"))
        .and(path("/document_downloads/direct/123456789"))
        .respond_with(ResponseTemplate::new(403))
        .expect(1)
        .mount(&upstream)
        .await;
    Mock::given(method("GET"))
        .and(path("/document_downloads/123456789"))
        .and(query_param("extension", "pdf"))
        .and(header("accept", "application/pdf"))
        .and(header("dnt", "1"))
        .and(header(
            "referer",
            format!("{}/document/123456789", upstream.uri()).as_str(),
        ))
        .respond_with(pdf_response())
        .expect(1)
        .mount(&upstream)
        .await;
    Mock::given(method("GET"))
        .and(path("/archive/document/123456789.pdf"))
        .respond_with(pdf_response())
        .expect(0)
        .mount(&upstream)
        .await;

    let runner = build_default_runner(&settings_for(&upstream.uri())).expect("runner");
    let id = extract_document_id(DOC_URL).expect("id");
    let outcome = runner
        .retrieve(&id, DocumentMetadata::default(), &CancellationToken::new())
        .await;

    match outcome {
        RetrievalOutcome::Success {
            payload, strategy, ..
        } => {
            assert_eq!(payload, PDF_BYTES);
            assert_eq!(strategy, DEFAULT_ENDPOINTS[1].name);
        }
        other => panic!("expected success, got {other:?}"),
    }

    // The user agent contains commas, so it is compared on the recorded requests.
    let requests = upstream.received_requests().await.unwrap_or_default();
    assert_eq!(requests.len(), 2);
    for request in &requests {
        assert_eq!(
            request.headers.get("user-agent").unwrap(),
            BROWSER_USER_AGENT
        );
    }
}

#[tokio::test]
async fn test_every_endpoint_tried_once_on_exhaustion() {
    let Some(upstream) = start_mock_server_or_skip().await else {
        return socket_skip_return();
    };

    Mock::given(method("GET"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("content-type", "text/html")
                .set_body_string("<html>login</html>"),
        )
        .expect(6)
        .mount(&upstream)
        .await;

    let runner = build_default_runner(&settings_for(&upstream.uri())).expect("runner");
    let id = extract_document_id(DOC_URL).expect("id");
    let outcome = runner
        .retrieve(&id, DocumentMetadata::default(), &CancellationToken::new())
        .await;
    assert!(matches!(outcome, RetrievalOutcome::Failure { .. }));

    let requests = upstream.received_requests().await.unwrap_or_default();
    let paths: Vec<String> = requests.iter().map(|r| r.url.path().to_string()).collect();
    assert_eq!(
        paths,
        [
            "/document_downloads/direct/123456789",
            "/document_downloads/123456789",
            "/doc_downloads/download_doc_modal/123456789",
            "/document/123456789",
            "/embeds/123456789/content",
            "/archive/document/123456789.pdf",
        ]
    );
}

#[tokio::test]
async fn test_octet_stream_with_pdf_signature_is_accepted() {
    let Some(upstream) = start_mock_server_or_skip().await else {
        return socket_skip_return();
    };
    Mock::given(method("GET"))
        .and(path("/document_downloads/direct/123456789"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("content-type", "application/octet-stream")
                .set_body_bytes(PDF_BYTES),
        )
        .mount(&upstream)
        .await;

    let runner = build_default_runner(&settings_for(&upstream.uri())).expect("runner");
    let id = extract_document_id(DOC_URL).expect("id");
    let outcome = runner
        .retrieve(&id, DocumentMetadata::default(), &CancellationToken::new())
        .await;
    assert!(outcome.is_success());
}

#[tokio::test]
async fn test_followed_redirect_reaches_pdf() {
    let Some(upstream) = start_mock_server_or_skip().await else {
        return socket_skip_return();
    };
    Mock::given(method("GET"))
        .and(path("/document_downloads/direct/123456789"))
        .respond_with(
            ResponseTemplate::new(302)
                .insert_header("location", format!("{}/cdn/file.pdf", upstream.uri()).as_str()),
        )
        .mount(&upstream)
        .await;
    Mock::given(method("GET"))
        .and(path("/cdn/file.pdf"))
        .respond_with(pdf_response())
        .expect(1)
        .mount(&upstream)
        .await;

    let runner = build_default_runner(&settings_for(&upstream.uri())).expect("runner");
    let id = extract_document_id(DOC_URL).expect("id");
    let outcome = runner
        .retrieve(&id, DocumentMetadata::default(), &CancellationToken::new())
        .await;
    assert!(outcome.is_success());
}

#[tokio::test]
async fn test_manual_redirect_policy_rejects_redirect() {
    let Some(upstream) = start_mock_server_or_skip().await else {
        return socket_skip_return();
    };
    Mock::given(method("GET"))
        .and(path("/manual/123456789"))
        .respond_with(
            ResponseTemplate::new(302)
                .insert_header("location", format!("{}/cdn/file.pdf", upstream.uri()).as_str()),
        )
        .mount(&upstream)
        .await;
    Mock::given(method("GET"))
        .and(path("/cdn/file.pdf"))
        .respond_with(pdf_response())
        .expect(0)
        .mount(&upstream)
        .await;

    let spec = EndpointSpec {
        name: "Manual Endpoint",
        path_template: "/manual/{id}",
        accept: None,
        redirect: RedirectPolicy::Manual,
    };
    let mut runner = StrategyRunner::new(Duration::from_secs(10));
    runner.register(Box::new(EndpointStrategy::new(
        spec,
        upstream.uri(),
        clients(),
        1024 * 1024,
    )));

    let id = extract_document_id(DOC_URL).expect("id");
    let outcome = runner
        .retrieve(&id, DocumentMetadata::default(), &CancellationToken::new())
        .await;
    assert!(matches!(outcome, RetrievalOutcome::Failure { .. }));
}

#[tokio::test]
async fn test_payload_over_cap_is_rejected_and_next_endpoint_runs() {
    let Some(upstream) = start_mock_server_or_skip().await else {
        return socket_skip_return();
    };
    let mut oversized = PDF_BYTES.to_vec();
    oversized.resize(8 * 1024, b'x');
    Mock::given(method("GET"))
        .and(path("/big/123456789"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("content-type", "application/pdf")
                .set_body_bytes(oversized),
        )
        .expect(1)
        .mount(&upstream)
        .await;
    Mock::given(method("GET"))
        .and(path("/small/123456789"))
        .respond_with(pdf_response())
        .expect(1)
        .mount(&upstream)
        .await;

    let clients = clients();
    let mut runner = StrategyRunner::new(Duration::from_secs(10));
    for (name, template) in [("Big", "/big/{id}"), ("Small", "/small/{id}")] {
        let spec = EndpointSpec {
            name,
            path_template: template,
            accept: None,
            redirect: RedirectPolicy::Follow,
        };
        runner.register(Box::new(EndpointStrategy::new(
            spec,
            upstream.uri(),
            Arc::clone(&clients),
            4 * 1024,
        )));
    }

    let id = extract_document_id(DOC_URL).expect("id");
    let outcome = runner
        .retrieve(&id, DocumentMetadata::default(), &CancellationToken::new())
        .await;
    match outcome {
        RetrievalOutcome::Success { strategy, .. } => assert_eq!(strategy, "Small"),
        other => panic!("expected success, got {other:?}"),
    }
}

#[tokio::test]
async fn test_transport_error_is_contained() {
    let Some(upstream) = start_mock_server_or_skip().await else {
        return socket_skip_return();
    };
    Mock::given(method("GET"))
        .and(path("/archive/document/123456789.pdf"))
        .respond_with(pdf_response())
        .mount(&upstream)
        .await;

    let clients = clients();
    let mut runner = StrategyRunner::new(Duration::from_secs(10));
    runner.register(Box::new(EndpointStrategy::new(
        DEFAULT_ENDPOINTS[0],
        "http://127.0.0.1:9",
        Arc::clone(&clients),
        1024 * 1024,
    )));
    runner.register(Box::new(EndpointStrategy::new(
        DEFAULT_ENDPOINTS[5],
        upstream.uri(),
        clients,
        1024 * 1024,
    )));

    let id = extract_document_id(DOC_URL).expect("id");
    let outcome = runner
        .retrieve(&id, DocumentMetadata::default(), &CancellationToken::new())
        .await;
    assert!(outcome.is_success());
}
