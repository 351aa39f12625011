//! Integration tests for the scrape pipeline
//!
//! These use wiremock to stand in for the upstream web view and
//! exercise the full fetch → extract → paginate → assemble cycle.

use std::sync::Arc;

use telechan::config::Config;
use telechan::scrape::ScrapeService;
use telechan::ScrapeError;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Match, Mock, MockServer, Request, Respond, ResponseTemplate};

/// Matches requests that carry no pagination cursor (the first page)
struct NoCursor;

impl Match for NoCursor {
    fn matches(&self, request: &Request) -> bool {
        !request.url.query_pairs().any(|(k, _)| k == "before")
    }
}

/// Builds a config pointing at the mock server, with fast retries
fn test_config(base_url: &str) -> Arc<Config> {
    let mut config = Config::default();
    config.upstream.base_url = base_url.to_string();
    config.upstream.request_timeout_secs = 5;
    config.retry.base_delay_ms = 5;
    config.retry.max_delay_ms = 20;
    config.retry.jitter = false;
    Arc::new(config)
}

fn service_for(base_url: &str) -> ScrapeService {
    ScrapeService::new(test_config(base_url)).expect("Failed to build service")
}

/// Renders one message block the way t.me does, with a timestamp and
/// text derived from the id
fn message_html(id: u64) -> String {
    message_html_with_text(id, &format!("post number {}", id))
}

fn message_html_with_text(id: u64, text: &str) -> String {
    // One minute per id keeps timestamps unique and ordered.
    let timestamp = chrono::DateTime::from_timestamp(1_714_521_600 + id as i64 * 60, 0)
        .expect("valid timestamp")
        .to_rfc3339();
    format!(
        r#"<div class="tgme_widget_message" data-post="fixture/{id}">
             <div class="tgme_widget_message_bubble">
               <div class="tgme_widget_message_text">{text}</div>
               <span class="tgme_widget_message_views">1.5K</span>
               <a class="tgme_widget_message_date" href="https://t.me/fixture/{id}">
                 <time datetime="{timestamp}">12:00</time>
               </a>
             </div>
           </div>"#,
    )
}

/// Renders a full channel page containing the given message ids,
/// oldest first, the way the upstream orders them
fn page_html(ids: impl IntoIterator<Item = u64>) -> String {
    let mut body = String::from(
        r#"<div class="tgme_channel_info">
             <div class="tgme_channel_info_header_title">Fixture Channel</div>
             <div class="tgme_channel_info_description">A test fixture</div>
             <div class="tgme_channel_info_counter">
               <span class="counter_value">26.8K</span>
               <span class="counter_type">subscribers</span>
             </div>
           </div>"#,
    );
    for id in ids {
        body.push_str(&message_html(id));
    }
    format!("<!DOCTYPE html><html><body>{}</body></html>", body)
}

#[tokio::test]
async fn test_two_page_scrape_dedup_and_order() {
    let mock_server = MockServer::start().await;

    // Page 1 (no cursor): ids 151..=200, oldest id 151.
    Mock::given(method("GET"))
        .and(path("/s/fixture"))
        .and(NoCursor)
        .respond_with(ResponseTemplate::new(200).set_body_string(page_html(151..=200)))
        .expect(1)
        .mount(&mock_server)
        .await;

    // Page 2 (before=151): ids 101..=150, plus a second rendering of
    // id 150 with identical content (the upstream repeats entries at
    // page boundaries).
    let mut page2 = page_html(101..=150);
    page2 = page2.replace("</body>", &format!("{}</body>", message_html(150)));
    Mock::given(method("GET"))
        .and(path("/s/fixture"))
        .and(query_param("before", "151"))
        .respond_with(ResponseTemplate::new(200).set_body_string(page2))
        .expect(1)
        .mount(&mock_server)
        .await;

    let service = service_for(&mock_server.uri());
    let result = service.scrape("fixture", Some(75)).await.unwrap();

    // 75 posts, newest first: ids 200 down to 126, no duplicates.
    assert_eq!(result.posts.len(), 75);
    assert_eq!(result.posts.first().unwrap().id, 200);
    assert_eq!(result.posts.last().unwrap().id, 126);
    let ids: Vec<u64> = result.posts.iter().map(|p| p.id).collect();
    let expected: Vec<u64> = (126..=200).rev().collect();
    assert_eq!(ids, expected);

    // Channel metadata from the first page.
    assert_eq!(result.channel.identifier, "fixture");
    assert_eq!(result.channel.title.as_deref(), Some("Fixture Channel"));
    assert_eq!(
        result.channel.counters.get(&telechan::CounterKind::Subscribers),
        Some(&26_800)
    );

    // Every fixture post renders views as 1.5K.
    assert!(result.posts.iter().all(|p| p.views == Some(1500)));
    assert!(result.stats.avg_views_per_post.is_some());
}

#[tokio::test]
async fn test_duplicate_content_across_pages_collapses() {
    let mock_server = MockServer::start().await;

    // Page 2 re-renders id 20's content under a different id, same
    // timestamp and same leading text: the dedup key must collapse it.
    let dup = message_html_with_text(19, "post number 20");
    let dup = dup.replace(
        &format!(
            "datetime=\"{}\"",
            chrono::DateTime::from_timestamp(1_714_521_600 + 19 * 60, 0)
                .unwrap()
                .to_rfc3339()
        ),
        &format!(
            "datetime=\"{}\"",
            chrono::DateTime::from_timestamp(1_714_521_600 + 20 * 60, 0)
                .unwrap()
                .to_rfc3339()
        ),
    );
    let page2 = format!("<!DOCTYPE html><html><body>{}</body></html>", dup);

    Mock::given(method("GET"))
        .and(path("/s/fixture"))
        .and(NoCursor)
        .respond_with(ResponseTemplate::new(200).set_body_string(page_html(20..=22)))
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/s/fixture"))
        .and(query_param("before", "20"))
        .respond_with(ResponseTemplate::new(200).set_body_string(page2))
        .mount(&mock_server)
        .await;

    let service = service_for(&mock_server.uri());
    let result = service.scrape("fixture", Some(50)).await.unwrap();

    // The re-rendered duplicate is suppressed; only 20..=22 survive.
    let ids: Vec<u64> = result.posts.iter().map(|p| p.id).collect();
    assert_eq!(ids, vec![22, 21, 20]);
}

/// Serves an endless channel: every request yields 3 posts below the
/// requested cursor, so only the page cap can stop the loop.
struct EndlessChannel;

impl Respond for EndlessChannel {
    fn respond(&self, request: &Request) -> ResponseTemplate {
        let before: u64 = request
            .url
            .query_pairs()
            .find(|(k, _)| k == "before")
            .and_then(|(_, v)| v.parse().ok())
            .unwrap_or(1_000_000);
        let ids = [before - 3, before - 2, before - 1];
        ResponseTemplate::new(200).set_body_string(page_html(ids))
    }
}

#[tokio::test]
async fn test_page_cap_bounds_endless_pagination() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/s/endless"))
        .respond_with(EndlessChannel)
        .mount(&mock_server)
        .await;

    let service = service_for(&mock_server.uri());
    let result = service.scrape("endless", Some(100)).await.unwrap();

    // 20 pages x 3 new posts each; the cap fires before 100 posts exist.
    assert_eq!(result.posts.len(), 60);

    let requests = mock_server.received_requests().await.unwrap();
    assert_eq!(requests.len(), 20);
}

#[tokio::test]
async fn test_max_posts_clamped_to_ceiling() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/s/endless"))
        .respond_with(EndlessChannel)
        .mount(&mock_server)
        .await;

    let service = service_for(&mock_server.uri());
    // Requesting far more than the ceiling still stops at 100 posts
    // and never issues more than 20 page fetches.
    let result = service.scrape("endless", Some(100_000)).await.unwrap();

    assert!(result.posts.len() <= 100);
    let requests = mock_server.received_requests().await.unwrap();
    assert!(requests.len() <= 20);
}

#[tokio::test]
async fn test_zero_new_posts_ends_loop_immediately() {
    let mock_server = MockServer::start().await;

    // Both the first page and the before=10 page render the same three
    // posts: the second page makes no progress, so the loop must end on
    // that iteration.
    Mock::given(method("GET"))
        .and(path("/s/stuck"))
        .respond_with(ResponseTemplate::new(200).set_body_string(page_html(10..=12)))
        .expect(2)
        .mount(&mock_server)
        .await;

    let service = service_for(&mock_server.uri());
    let result = service.scrape("stuck", Some(50)).await.unwrap();

    assert_eq!(result.posts.len(), 3);
    let requests = mock_server.received_requests().await.unwrap();
    assert_eq!(requests.len(), 2);
}

#[tokio::test]
async fn test_empty_page_terminates_pagination() {
    let mock_server = MockServer::start().await;

    let empty = r#"<!DOCTYPE html><html><body>
        <div class="tgme_channel_info">
          <div class="tgme_channel_info_header_title">Empty</div>
        </div></body></html>"#;

    Mock::given(method("GET"))
        .and(path("/s/empty"))
        .respond_with(ResponseTemplate::new(200).set_body_string(empty))
        .expect(1)
        .mount(&mock_server)
        .await;

    let service = service_for(&mock_server.uri());
    let result = service.scrape("empty", None).await.unwrap();

    assert!(result.posts.is_empty());
    assert_eq!(result.channel.title.as_deref(), Some("Empty"));
    assert_eq!(result.stats.avg_posts_per_day, None);
}

#[tokio::test]
async fn test_404_maps_to_channel_not_found_without_retry() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/s/ghost"))
        .respond_with(ResponseTemplate::new(404))
        .expect(1)
        .mount(&mock_server)
        .await;

    let service = service_for(&mock_server.uri());
    let result = service.scrape("ghost", None).await;

    assert!(matches!(
        result,
        Err(ScrapeError::ChannelNotFound { identifier }) if identifier == "ghost"
    ));

    // Exactly one attempt: 404 is definitive, never retried.
    let requests = mock_server.received_requests().await.unwrap();
    assert_eq!(requests.len(), 1);
}

#[tokio::test]
async fn test_transient_failures_retry_then_fetch_failed() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/s/flaky"))
        .respond_with(ResponseTemplate::new(503))
        .expect(3)
        .mount(&mock_server)
        .await;

    let service = service_for(&mock_server.uri());
    let result = service.scrape("flaky", None).await;

    match result {
        Err(ScrapeError::FetchFailed {
            attempts,
            last_error,
            ..
        }) => {
            assert_eq!(attempts, 3);
            assert!(last_error.contains("503"));
        }
        other => panic!("Expected FetchFailed, got {:?}", other.map(|r| r.posts.len())),
    }

    let requests = mock_server.received_requests().await.unwrap();
    assert_eq!(requests.len(), 3);
}

#[tokio::test]
async fn test_transient_failure_then_success_recovers() {
    let mock_server = MockServer::start().await;

    // First attempt fails, second succeeds; the operation must recover
    // without surfacing an error.
    Mock::given(method("GET"))
        .and(path("/s/fixture"))
        .respond_with(ResponseTemplate::new(500))
        .up_to_n_times(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/s/fixture"))
        .respond_with(ResponseTemplate::new(200).set_body_string(page_html(1..=3)))
        .mount(&mock_server)
        .await;

    let service = service_for(&mock_server.uri());
    let result = service.scrape("fixture", Some(10)).await.unwrap();

    assert_eq!(result.posts.len(), 3);
}

#[tokio::test]
async fn test_mid_pagination_failure_discards_partial_results() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/s/fixture"))
        .and(NoCursor)
        .respond_with(ResponseTemplate::new(200).set_body_string(page_html(51..=100)))
        .mount(&mock_server)
        .await;

    // Every later page fails hard: the whole operation must fail, with
    // no partial result from page 1.
    Mock::given(method("GET"))
        .and(path("/s/fixture"))
        .and(query_param("before", "51"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&mock_server)
        .await;

    let service = service_for(&mock_server.uri());
    let result = service.scrape("fixture", Some(100)).await;

    assert!(matches!(result, Err(ScrapeError::FetchFailed { .. })));
}
