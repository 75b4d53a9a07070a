//! Request gateway scenarios
//!
//! Exercises path canonicalization, auth injection, status handling,
//! payload repair, the auth-probe timeout, and the read-through query layer
//! against a live mock server.

mod common;

use common::bootstrap_core;
use marksync::api::HttpMethod;
use marksync::model::{Bookmark, Page};
use marksync::ApiError;
use pretty_assertions::assert_eq;
use serde_json::json;
use std::collections::BTreeMap;
use std::time::Duration;
use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Mock, ResponseTemplate};

#[tokio::test]
async fn call_normalizes_path_and_injects_auth() {
    let test = bootstrap_core().await;

    Mock::given(method("GET"))
        .and(path("/api/tags/"))
        .and(header("Authorization", "Token test-token"))
        .and(header("Content-Type", "application/json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"count": 0, "results": []})))
        .expect(1)
        .mount(&test.server)
        .await;

    // No leading slash requirement, no trailing slash requirement.
    let body = test
        .core
        .gateway
        .call("/tags", HttpMethod::Get, None)
        .await
        .unwrap();
    assert_eq!(body["count"], 0);
}

#[tokio::test]
async fn error_response_carries_status_and_decoded_message() {
    let test = bootstrap_core().await;

    Mock::given(method("POST"))
        .and(path("/api/bookmarks/"))
        .respond_with(
            ResponseTemplate::new(400).set_body_json(json!({"url": ["Enter a valid URL."]})),
        )
        .mount(&test.server)
        .await;

    let error = test
        .core
        .gateway
        .call("bookmarks", HttpMethod::Post, Some(&json!({"url": "nope"})))
        .await
        .unwrap_err();

    match error {
        ApiError::Http { status, message, body } => {
            assert_eq!(status, 400);
            assert_eq!(message, "url: Enter a valid URL.");
            assert_eq!(body.unwrap()["url"][0], "Enter a valid URL.");
        }
        other => panic!("expected HTTP error, got {:?}", other),
    }
}

#[tokio::test]
async fn error_without_body_falls_back_to_generic_message() {
    let test = bootstrap_core().await;

    Mock::given(method("GET"))
        .and(path("/api/bookmarks/"))
        .respond_with(ResponseTemplate::new(502))
        .mount(&test.server)
        .await;

    let error = test
        .core
        .gateway
        .call("bookmarks", HttpMethod::Get, None)
        .await
        .unwrap_err();

    assert_eq!(error.status(), Some(502));
    assert!(error.to_string().contains("request failed with status 502"));
}

#[tokio::test]
async fn asset_paths_are_rewritten_into_proxy_space() {
    let test = bootstrap_core().await;
    let remote_favicon = format!("{}/static/favicons/example.png", test.server.uri());

    Mock::given(method("GET"))
        .and(path("/api/bookmarks/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "count": 1,
            "next": null,
            "previous": null,
            "results": [{
                "id": 1,
                "url": "https://example.com",
                "favicon_url": remote_favicon,
                "preview_image_url": "/static/previews/1.jpg",
                "date_added": "2025-06-01T10:00:00Z",
                "date_modified": "2025-06-02T10:00:00Z"
            }]
        })))
        .mount(&test.server)
        .await;

    let body = test
        .core
        .gateway
        .call("bookmarks", HttpMethod::Get, None)
        .await
        .unwrap();

    assert_eq!(body["results"][0]["favicon_url"], "/assets/favicons/example.png");
    assert_eq!(body["results"][0]["preview_image_url"], "/assets/previews/1.jpg");
    // Non-asset strings pass through untouched.
    assert_eq!(body["results"][0]["url"], "https://example.com");

    // The repaired payload still decodes into the typed wire shape.
    let page: Page<Bookmark> = serde_json::from_value(body).unwrap();
    assert_eq!(page.count, 1);
    assert_eq!(
        page.results[0].favicon_url.as_deref(),
        Some("/assets/favicons/example.png")
    );
}

#[tokio::test]
async fn auth_probe_honors_its_fixed_timeout() {
    let test = bootstrap_core().await;

    // Slower than the 200 ms probe timeout configured for tests.
    Mock::given(method("GET"))
        .and(path("/api/user/profile/"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"theme": "auto"}))
                .set_delay(Duration::from_millis(800)),
        )
        .mount(&test.server)
        .await;

    let error = test.core.gateway.check_auth().await.unwrap_err();
    assert!(matches!(error, ApiError::Transport { .. }));
}

#[tokio::test]
async fn queries_serve_from_cache_until_invalidated() {
    let test = bootstrap_core().await;

    Mock::given(method("GET"))
        .and(path("/api/bookmarks/"))
        .and(query_param("limit", "100"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "count": 1,
            "next": null,
            "previous": null,
            "results": [{"id": 1, "url": "https://example.com"}]
        })))
        .expect(2)
        .mount(&test.server)
        .await;

    let params = BTreeMap::new();

    // First read goes to the network, second is served from cache.
    let first = test.core.queries.fetch_page("bookmarks", &params).await.unwrap();
    let second = test.core.queries.fetch_page("bookmarks", &params).await.unwrap();
    assert_eq!(first, second);
    assert_eq!(test.server.received_requests().await.unwrap().len(), 1);

    // Invalidation forces the next read back to the network.
    test.core.cache.invalidate_resource("bookmarks").await;
    test.core.queries.fetch_page("bookmarks", &params).await.unwrap();
    assert_eq!(test.server.received_requests().await.unwrap().len(), 2);
}
