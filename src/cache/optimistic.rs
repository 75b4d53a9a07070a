//! # Optimistic Cache Projections
//!
//! Applies speculative local edits to the read cache before (or without)
//! server confirmation, and rolls them back on failure.
//!
//! ## Lifecycle
//!
//! [`OptimisticMutator::apply`] snapshots the targeted cache entry and
//! rewrites it in one step, returning an [`OptimisticGuard`]. The caller
//! either `confirm()`s the guard (the projection stays until the next
//! natural refresh reconciles it with server truth) or `rollback()`s it,
//! restoring the exact pre-mutation snapshot.
//!
//! ## Strategies
//!
//! One projection per mutation kind:
//!
//! - [`CreateProjection`]: prepend a placeholder entity carrying a
//!   temporary id and the pending marker, increment `count`
//! - [`MergeProjection`]: shallow-merge fields into the entity matched by
//!   id, leaving every other entity untouched
//! - [`DeleteProjection`]: remove the matched entity and decrement `count`;
//!   removing an already-absent entity is a no-op

use crate::cache::{CacheKey, CachedValue, ReadCache};
use serde_json::{Map, Value};
use std::sync::Arc;
use uuid::Uuid;

/// Field identifying an entity within a collection
pub const ID_FIELD: &str = "id";

/// Marker flagging an entity as an unconfirmed optimistic placeholder
pub const PENDING_MARKER: &str = "_isPending";

/// A speculative rewrite of a cache entry
pub trait Projection: Send + Sync {
    /// Rewrite the cached value in place
    fn apply(&self, value: &mut CachedValue);
}

/// Prepend a placeholder for a not-yet-confirmed create
pub struct CreateProjection<'a> {
    pub body: &'a Value,
}

impl CreateProjection<'_> {
    fn placeholder(&self) -> Value {
        let mut entity = match self.body {
            Value::Object(map) => map.clone(),
            other => {
                let mut map = Map::new();
                map.insert("value".to_string(), other.clone());
                map
            }
        };
        entity.insert(
            ID_FIELD.to_string(),
            Value::String(format!("pending-{}", Uuid::new_v4())),
        );
        entity.insert(PENDING_MARKER.to_string(), Value::Bool(true));
        Value::Object(entity)
    }
}

impl Projection for CreateProjection<'_> {
    fn apply(&self, value: &mut CachedValue) {
        match value {
            CachedValue::Page(page) => {
                page.results.insert(0, self.placeholder());
                page.count += 1;
            }
            CachedValue::Single(single) => {
                *single = self.placeholder();
            }
        }
    }
}

/// Shallow-merge replacement or patch fields into the matched entity
pub struct MergeProjection<'a> {
    pub id: &'a Value,
    pub body: &'a Value,
}

impl MergeProjection<'_> {
    fn merge_into(&self, entity: &mut Value) {
        let (Some(target), Some(fields)) = (entity.as_object_mut(), self.body.as_object()) else {
            return;
        };
        for (field, value) in fields {
            target.insert(field.clone(), value.clone());
        }
    }
}

impl Projection for MergeProjection<'_> {
    fn apply(&self, value: &mut CachedValue) {
        match value {
            CachedValue::Page(page) => {
                for entity in page.results.iter_mut() {
                    if entity.get(ID_FIELD) == Some(self.id) {
                        self.merge_into(entity);
                    }
                }
            }
            CachedValue::Single(single) => {
                if single.get(ID_FIELD) == Some(self.id) {
                    self.merge_into(single);
                }
            }
        }
    }
}

/// Remove the matched entity
pub struct DeleteProjection<'a> {
    pub id: &'a Value,
}

impl Projection for DeleteProjection<'_> {
    fn apply(&self, value: &mut CachedValue) {
        match value {
            CachedValue::Page(page) => {
                let before = page.results.len();
                page.results.retain(|entity| entity.get(ID_FIELD) != Some(self.id));
                let removed = before - page.results.len();
                page.count -= removed as i64;
            }
            CachedValue::Single(single) => {
                if single.get(ID_FIELD) == Some(self.id) {
                    *single = Value::Null;
                }
            }
        }
    }
}

/// Applies projections to the read cache and hands out rollback guards
#[derive(Debug, Clone)]
pub struct OptimisticMutator {
    cache: Arc<ReadCache>,
}

impl OptimisticMutator {
    /// Create a mutator over the shared read cache
    pub fn new(cache: Arc<ReadCache>) -> Self {
        Self { cache }
    }

    /// Snapshot the entry for `key` and apply the projection
    ///
    /// The rewrite is visible to readers as soon as this returns; no network
    /// round-trip happens first. When no entry exists for the key there is
    /// nothing to project, and the returned guard rolls back to nothing.
    pub async fn apply(&self, key: &CacheKey, projection: &dyn Projection) -> OptimisticGuard {
        let snapshot = self
            .cache
            .snapshot_and_mutate(key, |value| projection.apply(value))
            .await;
        OptimisticGuard {
            cache: Arc::clone(&self.cache),
            key: key.clone(),
            snapshot,
        }
    }
}

/// Undo handle for one in-flight optimistic projection
///
/// Exactly one guard exists per in-flight mutation.
#[must_use = "an unresolved guard leaves the optimistic projection unconfirmed"]
#[derive(Debug)]
pub struct OptimisticGuard {
    cache: Arc<ReadCache>,
    key: CacheKey,
    snapshot: Option<CachedValue>,
}

impl OptimisticGuard {
    /// Restore the exact pre-mutation snapshot
    pub async fn rollback(self) {
        if let Some(snapshot) = self.snapshot {
            tracing::debug!("rolling back optimistic update for {:?}", self.key);
            self.cache.put(self.key, snapshot).await;
        }
    }

    /// Keep the projection in place until the next natural refresh
    pub fn confirm(self) {}
}
