//! # Read Cache
//!
//! Process-wide cache of the last known server state, keyed by resource and
//! query parameters. Entries are refreshed on every successful read and
//! optimistically overwritten while a mutation is in flight.
//!
//! ## Writers
//!
//! Only two components write here: the optimistic mutator (speculative
//! projections and their rollbacks) and the query refresh in
//! [`QueryClient`]. Writes are last-writer-wins per key; no merging across
//! writers is attempted.
//!
//! ## Staleness
//!
//! Invalidation marks entries stale instead of dropping them, so the UI can
//! keep rendering the previous state while a refetch is in flight. A stale
//! or expired entry is a miss for [`ReadCache::get`] but still visible to
//! [`ReadCache::peek`].

pub mod optimistic;

use crate::api::{HttpMethod, RequestGateway};
use crate::error::ApiError;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;

/// Stable identifier for a cached collection or single resource
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CacheKey {
    /// Resource type, e.g. `bookmarks`
    pub resource: String,
    /// Filter and pagination parameters
    pub params: BTreeMap<String, String>,
}

impl CacheKey {
    /// Key for a collection view
    pub fn list<I, K, V>(resource: &str, params: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            resource: resource.to_string(),
            params: params
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }

    /// Key for a single resource
    pub fn single(resource: &str, id: i64) -> Self {
        Self::list(resource, [("id", id.to_string())])
    }
}

/// Decoded page envelope held in the cache
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PageData {
    pub count: i64,
    #[serde(default)]
    pub next: Option<String>,
    #[serde(default)]
    pub previous: Option<String>,
    pub results: Vec<Value>,
}

/// A cached projection of server state
#[derive(Debug, Clone, PartialEq)]
pub enum CachedValue {
    /// A single entity
    Single(Value),
    /// A page of a collection
    Page(PageData),
}

#[derive(Debug)]
struct Slot {
    value: CachedValue,
    stored_at: Instant,
    stale: bool,
}

/// Keyed read cache with time-to-live freshness
#[derive(Debug)]
pub struct ReadCache {
    ttl: Duration,
    entries: RwLock<HashMap<CacheKey, Slot>>,
}

impl ReadCache {
    /// Create a cache with the given time-to-live
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: RwLock::new(HashMap::new()),
        }
    }

    /// Fresh value for a key, or `None` on miss, staleness, or expiry
    pub async fn get(&self, key: &CacheKey) -> Option<CachedValue> {
        let entries = self.entries.read().await;
        let slot = entries.get(key)?;
        if slot.stale || slot.stored_at.elapsed() >= self.ttl {
            return None;
        }
        Some(slot.value.clone())
    }

    /// Value for a key regardless of freshness
    pub async fn peek(&self, key: &CacheKey) -> Option<CachedValue> {
        let entries = self.entries.read().await;
        entries.get(key).map(|slot| slot.value.clone())
    }

    /// Store a value, resetting its freshness
    pub async fn put(&self, key: CacheKey, value: CachedValue) {
        let mut entries = self.entries.write().await;
        entries.insert(
            key,
            Slot {
                value,
                stored_at: Instant::now(),
                stale: false,
            },
        );
    }

    /// Snapshot the current value for a key, then rewrite it in place
    ///
    /// Returns the pre-mutation value so a failed mutation can restore it
    /// exactly. A missing key is a no-op and returns `None`.
    pub(crate) async fn snapshot_and_mutate<F>(
        &self,
        key: &CacheKey,
        rewrite: F,
    ) -> Option<CachedValue>
    where
        F: FnOnce(&mut CachedValue),
    {
        let mut entries = self.entries.write().await;
        let slot = entries.get_mut(key)?;
        let snapshot = slot.value.clone();
        rewrite(&mut slot.value);
        Some(snapshot)
    }

    /// Mark every entry for a resource stale, forcing a refetch
    pub async fn invalidate_resource(&self, resource: &str) {
        let mut entries = self.entries.write().await;
        for (key, slot) in entries.iter_mut() {
            if key.resource == resource {
                slot.stale = true;
            }
        }
    }

    /// Mark every entry stale; used after a completed drain
    pub async fn invalidate_all(&self) {
        let mut entries = self.entries.write().await;
        for slot in entries.values_mut() {
            slot.stale = true;
        }
    }

    /// Number of entries currently held (fresh or stale)
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    /// Whether the cache holds no entries
    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}

/// Read-through query layer: cache first, gateway on miss
#[derive(Debug, Clone)]
pub struct QueryClient {
    cache: Arc<ReadCache>,
    gateway: Arc<RequestGateway>,
    page_size: u32,
}

impl QueryClient {
    /// Create a query client over a cache and gateway
    pub fn new(cache: Arc<ReadCache>, gateway: Arc<RequestGateway>, page_size: u32) -> Self {
        Self {
            cache,
            gateway,
            page_size,
        }
    }

    /// Fetch a collection page, serving from cache when fresh
    ///
    /// A `limit` parameter is added from the configured page size unless the
    /// caller supplied one.
    pub async fn fetch_page(
        &self,
        resource: &str,
        params: &BTreeMap<String, String>,
    ) -> Result<PageData, ApiError> {
        let key = CacheKey {
            resource: resource.to_string(),
            params: params.clone(),
        };
        if let Some(CachedValue::Page(page)) = self.cache.get(&key).await {
            return Ok(page);
        }

        let limit = self.page_size.to_string();
        let mut query: Vec<(&str, &str)> = params
            .iter()
            .map(|(k, v)| (k.as_str(), v.as_str()))
            .collect();
        if !params.contains_key("limit") {
            query.push(("limit", &limit));
        }

        let value = self
            .gateway
            .call_with_query(resource, HttpMethod::Get, &query, None)
            .await?;
        let page: PageData = serde_json::from_value(value)?;
        self.cache.put(key, CachedValue::Page(page.clone())).await;
        Ok(page)
    }

    /// Fetch a single resource, serving from cache when fresh
    pub async fn fetch_single(&self, resource: &str, id: i64) -> Result<Value, ApiError> {
        let key = CacheKey::single(resource, id);
        if let Some(CachedValue::Single(value)) = self.cache.get(&key).await {
            return Ok(value);
        }

        let path = format!("{}/{}", resource, id);
        let value = self.gateway.call(&path, HttpMethod::Get, None).await?;
        self.cache
            .put(key, CachedValue::Single(value.clone()))
            .await;
        Ok(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn page(count: i64, results: Vec<Value>) -> CachedValue {
        CachedValue::Page(PageData {
            count,
            next: None,
            previous: None,
            results,
        })
    }

    #[tokio::test]
    async fn test_put_and_get() {
        let cache = ReadCache::new(Duration::from_secs(60));
        let key = CacheKey::list("bookmarks", [("q", "rust")]);

        cache.put(key.clone(), page(1, vec![json!({"id": 1})])).await;
        assert!(cache.get(&key).await.is_some());

        let other = CacheKey::list("bookmarks", [("q", "go")]);
        assert!(cache.get(&other).await.is_none());
    }

    #[tokio::test]
    async fn test_expired_entry_is_a_miss_but_peekable() {
        let cache = ReadCache::new(Duration::from_millis(0));
        let key = CacheKey::list("tags", std::iter::empty::<(String, String)>());

        cache.put(key.clone(), page(0, vec![])).await;
        assert!(cache.get(&key).await.is_none());
        assert!(cache.peek(&key).await.is_some());
    }

    #[tokio::test]
    async fn test_invalidate_resource_spares_others() {
        let cache = ReadCache::new(Duration::from_secs(60));
        let bookmarks = CacheKey::list("bookmarks", std::iter::empty::<(String, String)>());
        let tags = CacheKey::list("tags", std::iter::empty::<(String, String)>());

        cache.put(bookmarks.clone(), page(0, vec![])).await;
        cache.put(tags.clone(), page(0, vec![])).await;
        cache.invalidate_resource("bookmarks").await;

        assert!(cache.get(&bookmarks).await.is_none());
        assert!(cache.get(&tags).await.is_some());
    }

    #[tokio::test]
    async fn test_snapshot_and_mutate_returns_previous_value() {
        let cache = ReadCache::new(Duration::from_secs(60));
        let key = CacheKey::list("bookmarks", std::iter::empty::<(String, String)>());
        cache.put(key.clone(), page(1, vec![json!({"id": 1})])).await;

        let snapshot = cache
            .snapshot_and_mutate(&key, |value| {
                if let CachedValue::Page(page) = value {
                    page.count = 99;
                }
            })
            .await
            .unwrap();

        assert_eq!(snapshot, page(1, vec![json!({"id": 1})]));
        match cache.peek(&key).await.unwrap() {
            CachedValue::Page(page) => assert_eq!(page.count, 99),
            other => panic!("unexpected cached value: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_snapshot_and_mutate_missing_key_is_noop() {
        let cache = ReadCache::new(Duration::from_secs(60));
        let key = CacheKey::list("bookmarks", std::iter::empty::<(String, String)>());
        let snapshot = cache.snapshot_and_mutate(&key, |_| panic!("must not run")).await;
        assert!(snapshot.is_none());
    }
}
