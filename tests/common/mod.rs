//! Shared helpers for integration tests
//!
//! Builds a fully assembled core against a wiremock server and a scratch
//! outbox database, so each test runs in isolation.

use marksync::cache::{CacheKey, CachedValue, PageData};
use marksync::worker::WorkerEndpoint;
use marksync::{Config, Core};
use serde_json::json;
use std::time::Duration;
use wiremock::MockServer;

/// An assembled core bound to a mock API server
pub struct TestCore {
    pub core: Core,
    pub server: MockServer,
    pub worker: WorkerEndpoint,
    _data_dir: tempfile::TempDir,
}

/// Install the test log subscriber once; later calls are no-ops
fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Bootstrap a core whose gateway points at a fresh mock server
pub async fn bootstrap_core() -> TestCore {
    init_tracing();
    let server = MockServer::start().await;
    let data_dir = tempfile::tempdir().expect("scratch dir");

    let config = Config::builder()
        .api_base_url(server.uri())
        .data_dir(data_dir.path().to_path_buf())
        .cache_ttl(Duration::from_secs(60))
        .drain_debounce(Duration::from_millis(100))
        .auth_check_timeout(Duration::from_millis(200))
        .build()
        .expect("valid test config");

    let (core, worker) = Core::bootstrap(config).await.expect("bootstrap core");
    core.ctx.set_token("test-token").await;

    TestCore {
        core,
        server,
        worker,
        _data_dir: data_dir,
    }
}

/// Cache key for the default bookmark list view
pub fn bookmark_list_key() -> CacheKey {
    CacheKey::list("bookmarks", std::iter::empty::<(String, String)>())
}

/// Seed the cache with a two-entry bookmark page
pub async fn seed_bookmark_page(test: &TestCore) {
    test.core
        .cache
        .put(
            bookmark_list_key(),
            CachedValue::Page(PageData {
                count: 2,
                next: None,
                previous: None,
                results: vec![
                    json!({"id": 42, "url": "https://one.example.com", "title": "One"}),
                    json!({"id": 43, "url": "https://two.example.com", "title": "Two"}),
                ],
            }),
        )
        .await;
}

/// The cached bookmark page, panicking on a non-page value
pub async fn cached_bookmark_page(core: &Core) -> PageData {
    match core.cache.peek(&bookmark_list_key()).await {
        Some(CachedValue::Page(page)) => page,
        other => panic!("expected cached page, got {:?}", other),
    }
}
