use bind_core::metrics::Layer;
use bind_core::traits::{Fetcher, Transport};
use bind_client::ReqwestTransport;
use std::time::Duration;
use wiremock::matchers::{header_exists, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use crate::integration::common::{CHALLENGE_PAGE, config, waterfall};

#[tokio::test]
async fn impersonating_transport_sends_browser_headers() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/rss"))
        .and(header_exists("accept-language"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<rss/>"))
        .expect(1)
        .mount(&server)
        .await;

    let transport = ReqwestTransport::impersonating(Duration::from_secs(5)).unwrap();
    let body = transport.get(&format!("{}/rss", server.uri())).await.unwrap();
    assert_eq!(body, "<rss/>");
}

#[tokio::test]
async fn non_success_status_is_http_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(403).set_body_string("forbidden"))
        .mount(&server)
        .await;

    let transport = ReqwestTransport::conservative(Duration::from_secs(5)).unwrap();
    let err = transport
        .get(&format!("{}/rss", server.uri()))
        .await
        .unwrap_err();
    assert!(err.to_string().contains("403"));
}

#[tokio::test]
async fn soft_blocked_primary_falls_back_to_conservative_layer() {
    let dir = tempfile::tempdir().unwrap();
    let server = MockServer::start().await;

    // Only the browser-like client sends Accept-Language.
    Mock::given(method("GET"))
        .and(path("/rss"))
        .and(header_exists("accept-language"))
        .respond_with(ResponseTemplate::new(200).set_body_string(CHALLENGE_PAGE))
        .with_priority(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/rss"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<rss>real</rss>"))
        .with_priority(2)
        .mount(&server)
        .await;

    let config = config(&server.uri(), dir.path(), None);
    let (waterfall, metrics) = waterfall(&config);

    let body = waterfall.fetch(&format!("{}/rss", server.uri())).await;
    assert_eq!(body.as_deref(), Some("<rss>real</rss>"));
    assert_eq!(metrics.get(Layer::Primary).failures, 1);
    assert_eq!(metrics.get(Layer::Fallback).successes, 1);
    assert_eq!(metrics.get(Layer::PrimaryProxy).attempts, 0);
    assert_eq!(waterfall.circuit_breaker().failure_count(), 0);
}

#[tokio::test]
async fn proxy_layer_is_tried_before_fallback() {
    let dir = tempfile::tempdir().unwrap();
    let proxy = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_string("via proxy"))
        .mount(&proxy)
        .await;

    // Nothing listens on the origin, so only the proxied layer can succeed.
    let origin = "http://127.0.0.1:9";
    let config = config(origin, dir.path(), Some(&proxy.uri()));
    let (waterfall, metrics) = waterfall(&config);

    let body = waterfall.fetch(&format!("{origin}/rss")).await;
    assert_eq!(body.as_deref(), Some("via proxy"));
    assert_eq!(metrics.get(Layer::Primary).failures, 1);
    assert_eq!(metrics.get(Layer::PrimaryProxy).successes, 1);
    assert_eq!(metrics.get(Layer::Fallback).attempts, 0);
}

#[tokio::test]
async fn breaker_opens_and_stops_requests() {
    let dir = tempfile::tempdir().unwrap();
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    // Threshold is 2 in the test configuration.
    let config = config(&server.uri(), dir.path(), None);
    let (waterfall, metrics) = waterfall(&config);
    let url = format!("{}/rss", server.uri());

    assert_eq!(waterfall.fetch(&url).await, None);
    assert_eq!(waterfall.fetch(&url).await, None);
    assert!(waterfall.circuit_breaker().is_open());

    let before = server.received_requests().await.unwrap().len();
    assert_eq!(before, 4);

    assert_eq!(waterfall.fetch(&url).await, None);
    assert_eq!(server.received_requests().await.unwrap().len(), before);
    assert_eq!(metrics.get(Layer::Primary).attempts, 2);
}
