//! Integration tests for the HTTP surface
//!
//! Each test binds the real router on an ephemeral port and talks to it
//! with a plain HTTP client, with wiremock standing in for the upstream.

use std::sync::Arc;

use telechan::config::Config;
use telechan::scrape::ScrapeService;
use telechan::server::router;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Spawns the app bound to 127.0.0.1:0 and returns its base URL
async fn spawn_app(upstream: &str) -> String {
    let mut config = Config::default();
    config.upstream.base_url = upstream.to_string();
    config.retry.base_delay_ms = 5;
    config.retry.max_delay_ms = 20;
    config.retry.jitter = false;

    let service = Arc::new(ScrapeService::new(Arc::new(config)).expect("service"));
    let app = router(service);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind");
    let addr = listener.local_addr().expect("local addr");
    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("serve");
    });

    format!("http://{}", addr)
}

fn channel_page() -> String {
    r#"<!DOCTYPE html><html><body>
        <div class="tgme_channel_info">
          <div class="tgme_channel_info_header_title">Wire Channel</div>
          <div class="tgme_channel_info_counter">
            <span class="counter_value">12</span>
            <span class="counter_type">subscribers</span>
          </div>
        </div>
        <div class="tgme_widget_message" data-post="wire/1">
          <div class="tgme_widget_message_bubble">
            <div class="tgme_widget_message_text">hello</div>
            <a class="tgme_widget_message_date">
              <time datetime="2024-05-01T12:00:00+00:00">12:00</time>
            </a>
          </div>
        </div>
      </body></html>"#
        .to_string()
}

#[tokio::test]
async fn test_healthz_returns_static_ok() {
    let app = spawn_app("https://t.me").await;

    let response = reqwest::get(format!("{}/healthz", app)).await.unwrap();
    assert_eq!(response.status(), 200);

    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["status"], "ok");
    assert_eq!(body["service"], "telechan");
}

#[tokio::test]
async fn test_invalid_identifier_is_400_without_upstream_calls() {
    let mock_server = MockServer::start().await;
    // No mocks mounted: any upstream request would 404 the mock server,
    // which would surface as the wrong error kind below.
    let app = spawn_app(&mock_server.uri()).await;

    let response = reqwest::get(format!("{}/channel/a", app)).await.unwrap();
    assert_eq!(response.status(), 400);

    let body: serde_json::Value = response.json().await.unwrap();
    assert!(body["error"].as_str().unwrap().contains("Invalid"));

    let requests = mock_server.received_requests().await.unwrap();
    assert!(requests.is_empty());
}

#[tokio::test]
async fn test_unknown_channel_is_404() {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/s/ghost"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&mock_server)
        .await;

    let app = spawn_app(&mock_server.uri()).await;

    let response = reqwest::get(format!("{}/channel/ghost", app)).await.unwrap();
    assert_eq!(response.status(), 404);
}

#[tokio::test]
async fn test_upstream_outage_is_503() {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/s/down"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&mock_server)
        .await;

    let app = spawn_app(&mock_server.uri()).await;

    let response = reqwest::get(format!("{}/channel/down", app)).await.unwrap();
    assert_eq!(response.status(), 503);
}

#[tokio::test]
async fn test_channel_response_shape() {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/s/wire"))
        .respond_with(ResponseTemplate::new(200).set_body_string(channel_page()))
        .mount(&mock_server)
        .await;

    let app = spawn_app(&mock_server.uri()).await;

    let response = reqwest::get(format!("{}/channel/wire?limit=10", app))
        .await
        .unwrap();
    assert_eq!(response.status(), 200);

    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["channel"]["identifier"], "wire");
    assert_eq!(body["channel"]["title"], "Wire Channel");
    assert_eq!(body["channel"]["counters"]["subscribers"], 12);

    let posts = body["posts"].as_array().unwrap();
    assert_eq!(posts.len(), 1);
    assert_eq!(posts[0]["id"], 1);
    assert_eq!(posts[0]["text"], "hello");
    // No view counter rendered upstream: the field must be absent, not 0.
    assert!(posts[0].get("views").is_none());
    assert_eq!(posts[0]["media"]["photo"], false);
}
