//! Integration tests for the rate-limited client: pagination termination,
//! cursor advancement, limit clamping, error classification, and permit
//! discipline, all against a mock upstream.

use std::time::Duration;

use serde_json::json;
use wiremock::matchers::{method, path, query_param, query_param_is_missing};
use wiremock::{Mock, MockServer, ResponseTemplate};

use lever_harness::client::{LeverClient, OpportunityFilter};
use lever_harness::config::Config;
use lever_harness::error::ApiError;

fn test_config(base_url: &str) -> Config {
    let mut config = Config::default();
    config.lever.base_url = base_url.to_string();
    config.lever.timeout_secs = 1;
    config.api_key = "test-key".to_string();
    config
}

fn candidate(id: &str, name: &str) -> serde_json::Value {
    json!({ "id": id, "name": name, "emails": [format!("{}@example.com", id)] })
}

fn page_response(items: Vec<serde_json::Value>, has_next: bool, next: Option<&str>) -> ResponseTemplate {
    let mut body = json!({ "data": items, "hasNext": has_next });
    if let Some(next) = next {
        body["next"] = json!(next);
    }
    ResponseTemplate::new(200).set_body_json(body)
}

#[tokio::test]
async fn single_page_fetch() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/opportunities"))
        .respond_with(page_response(
            vec![candidate("a1", "Ada"), candidate("a2", "Alan")],
            false,
            None,
        ))
        .expect(1)
        .mount(&server)
        .await;

    let client = LeverClient::new(&test_config(&server.uri())).unwrap();
    let page = client
        .opportunities(&OpportunityFilter::new().limit(10))
        .await
        .unwrap();
    assert_eq!(page.items.len(), 2);
    assert!(!page.has_next);
}

#[tokio::test]
async fn collect_pages_follows_next_cursor() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/opportunities"))
        .and(query_param_is_missing("offset"))
        .respond_with(page_response(
            vec![candidate("a1", "Ada")],
            true,
            Some("cursor-2"),
        ))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/opportunities"))
        .and(query_param("offset", "cursor-2"))
        .respond_with(page_response(vec![candidate("a2", "Alan")], false, None))
        .expect(1)
        .mount(&server)
        .await;

    let client = LeverClient::new(&test_config(&server.uri())).unwrap();
    let all = client
        .collect_pages(|offset| {
            let client = client.clone();
            async move {
                client
                    .opportunities(&OpportunityFilter::new().limit(100).offset(offset))
                    .await
            }
        })
        .await
        .unwrap();
    assert_eq!(all.len(), 2);
}

#[tokio::test]
async fn collect_pages_falls_back_to_last_item_id() {
    let server = MockServer::start().await;
    // hasNext true but no `next` field: the cursor must fall back to the
    // last item's id.
    Mock::given(method("GET"))
        .and(path("/opportunities"))
        .and(query_param_is_missing("offset"))
        .respond_with(page_response(vec![candidate("a1", "Ada")], true, None))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/opportunities"))
        .and(query_param("offset", "a1"))
        .respond_with(page_response(vec![candidate("a2", "Alan")], false, None))
        .expect(1)
        .mount(&server)
        .await;

    let client = LeverClient::new(&test_config(&server.uri())).unwrap();
    let all = client
        .collect_pages(|offset| {
            let client = client.clone();
            async move {
                client
                    .opportunities(&OpportunityFilter::new().offset(offset))
                    .await
            }
        })
        .await
        .unwrap();
    assert_eq!(all.len(), 2);
}

#[tokio::test]
async fn empty_page_with_has_next_terminates() {
    let server = MockServer::start().await;
    // A degenerate upstream claiming more pages while returning none must
    // not loop.
    Mock::given(method("GET"))
        .and(path("/opportunities"))
        .respond_with(page_response(vec![], true, Some("cursor-2")))
        .expect(1)
        .mount(&server)
        .await;

    let client = LeverClient::new(&test_config(&server.uri())).unwrap();
    let all = client
        .collect_pages(|offset| {
            let client = client.clone();
            async move {
                client
                    .opportunities(&OpportunityFilter::new().offset(offset))
                    .await
            }
        })
        .await
        .unwrap();
    assert!(all.is_empty());
}

#[tokio::test]
async fn oversized_limit_is_clamped() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/opportunities"))
        .and(query_param("limit", "100"))
        .respond_with(page_response(vec![], false, None))
        .expect(1)
        .mount(&server)
        .await;

    let client = LeverClient::new(&test_config(&server.uri())).unwrap();
    client
        .opportunities(&OpportunityFilter::new().limit(500))
        .await
        .unwrap();
}

#[tokio::test]
async fn status_error_carries_upstream_message() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/opportunities"))
        .respond_with(
            ResponseTemplate::new(403).set_body_json(json!({ "message": "invalid API key" })),
        )
        .mount(&server)
        .await;

    let client = LeverClient::new(&test_config(&server.uri())).unwrap();
    let err = client
        .opportunities(&OpportunityFilter::new())
        .await
        .unwrap_err();
    match err {
        ApiError::Status { status, message } => {
            assert_eq!(status, 403);
            assert_eq!(message, "invalid API key");
        }
        other => panic!("expected Status, got {:?}", other),
    }
}

#[tokio::test]
async fn non_json_response_is_content_type_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/opportunities"))
        .respond_with(
            ResponseTemplate::new(200).set_body_raw("<html>login required</html>", "text/html"),
        )
        .mount(&server)
        .await;

    let client = LeverClient::new(&test_config(&server.uri())).unwrap();
    let err = client
        .opportunities(&OpportunityFilter::new())
        .await
        .unwrap_err();
    match err {
        ApiError::UnexpectedContentType {
            content_type,
            body_prefix,
        } => {
            assert!(content_type.contains("text/html"));
            assert!(body_prefix.contains("login required"));
        }
        other => panic!("expected UnexpectedContentType, got {:?}", other),
    }
}

#[tokio::test]
async fn malformed_json_is_decode_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/opportunities"))
        .respond_with(
            ResponseTemplate::new(200).set_body_raw("{ not json", "application/json"),
        )
        .mount(&server)
        .await;

    let client = LeverClient::new(&test_config(&server.uri())).unwrap();
    let err = client
        .opportunities(&OpportunityFilter::new())
        .await
        .unwrap_err();
    assert!(matches!(err, ApiError::Decode(_)));
}

#[tokio::test]
async fn slow_upstream_is_timeout_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/opportunities"))
        .respond_with(
            page_response(vec![], false, None).set_delay(Duration::from_millis(1500)),
        )
        .mount(&server)
        .await;

    let client = LeverClient::new(&test_config(&server.uri())).unwrap();
    let err = client
        .opportunities(&OpportunityFilter::new())
        .await
        .unwrap_err();
    assert!(matches!(err, ApiError::Timeout));
}

#[tokio::test]
async fn permits_released_on_success_and_failure() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/opportunities"))
        .respond_with(page_response(vec![candidate("a1", "Ada")], false, None))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/stages"))
        .respond_with(ResponseTemplate::new(500).set_body_json(json!({ "message": "boom" })))
        .mount(&server)
        .await;

    let config = test_config(&server.uri());
    let pool_size = config.lever.concurrent_requests;
    let client = LeverClient::new(&config).unwrap();
    assert_eq!(client.available_permits(), pool_size);

    client
        .opportunities(&OpportunityFilter::new())
        .await
        .unwrap();
    assert_eq!(client.available_permits(), pool_size);

    client.stages().await.unwrap_err();
    assert_eq!(client.available_permits(), pool_size);
}

#[tokio::test]
async fn concurrent_requests_never_exceed_pool() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/opportunities"))
        .respond_with(
            page_response(vec![candidate("a1", "Ada")], false, None)
                .set_delay(Duration::from_millis(300)),
        )
        .expect(3)
        .mount(&server)
        .await;

    let mut config = test_config(&server.uri());
    config.lever.concurrent_requests = 2;
    let client = std::sync::Arc::new(LeverClient::new(&config).unwrap());

    let started = std::time::Instant::now();
    let tasks: Vec<_> = (0..3)
        .map(|_| {
            let client = client.clone();
            tokio::spawn(async move { client.opportunities(&OpportunityFilter::new()).await })
        })
        .collect();

    // With three requests against a pool of two, both permits must be
    // checked out while the third request waits its turn.
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(client.available_permits(), 0);

    for task in tasks {
        task.await.unwrap().unwrap();
    }
    // The third request could not start until a permit freed up, so the
    // batch takes at least two delay windows.
    assert!(started.elapsed() >= Duration::from_millis(600));
    assert_eq!(client.available_permits(), 2);
}

#[tokio::test]
async fn stage_update_posts_reason() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/opportunities/opp-1/stage"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "data": {} })))
        .expect(1)
        .mount(&server)
        .await;

    let client = LeverClient::new(&test_config(&server.uri())).unwrap();
    client
        .update_stage("opp-1", "stage-2", Some("advanced after onsite"))
        .await
        .unwrap();
}

#[tokio::test]
async fn file_download_uses_session_and_checks_status() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/files/resume.pdf"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(b"%PDF-1.4".to_vec()))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/files/missing.pdf"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let client = LeverClient::new(&test_config(&server.uri())).unwrap();
    let bytes = client
        .download_file(&format!("{}/files/resume.pdf", server.uri()))
        .await
        .unwrap();
    assert!(bytes.starts_with(b"%PDF"));

    let err = client
        .download_file(&format!("{}/files/missing.pdf", server.uri()))
        .await
        .unwrap_err();
    assert!(matches!(err, ApiError::Status { status: 404, .. }));
}
