//! # Offline-Aware Mutation Dispatcher
//!
//! Decides, per write operation, whether to call the network immediately or
//! persist the operation to the outbox for later replay. Wires together the
//! gateway, the outbox store, the connectivity monitor, and the optimistic
//! cache mutator.
//!
//! ## Flow
//!
//! 1. Resolve the concrete resource path from the mutation kind
//! 2. Apply the optimistic projection to the targeted cache entry
//! 3. Offline: persist to the outbox, return [`DispatchOutcome::Queued`]
//! 4. Online: execute through the gateway; rollback on failure, invalidate
//!    the resource's cached reads on success
//!
//! The dispatcher trusts the monitor's last known state rather than reacting
//! to a failed call, so a transport error on the online path never enqueues
//! (that would risk double delivery once the environment signal catches up).
//!
//! ## Usage
//!
//! ```rust,no_run
//! use marksync::dispatch::{Mutation, MutationDispatcher};
//! use marksync::cache::CacheKey;
//! use serde_json::json;
//!
//! # async fn example(dispatcher: MutationDispatcher) -> Result<(), marksync::error::ApiError> {
//! let key = CacheKey::list("bookmarks", std::iter::empty::<(String, String)>());
//! let mutation = Mutation::Create {
//!     body: json!({"url": "https://example.com", "title": "Example"}),
//! };
//! dispatcher.dispatch("bookmarks", &key, mutation).await?;
//! # Ok(())
//! # }
//! ```

use crate::api::{HttpMethod, RequestGateway};
use crate::cache::optimistic::{
    CreateProjection, DeleteProjection, MergeProjection, OptimisticMutator, Projection,
};
use crate::cache::{CacheKey, ReadCache};
use crate::error::ApiError;
use crate::net::{ConnectivityMonitor, Notice};
use crate::outbox::OutboxStore;
use serde_json::Value;
use std::sync::Arc;

/// A write operation, decided at the call site
#[derive(Debug, Clone, PartialEq)]
pub enum Mutation {
    /// Create a new entity
    Create { body: Value },
    /// Replace an entity wholesale
    Replace { id: Value, body: Value },
    /// Update a subset of an entity's fields
    Patch { id: Value, body: Value },
    /// Delete an entity
    Delete { id: Value },
}

impl Mutation {
    /// Transport verb for this mutation
    pub fn method(&self) -> HttpMethod {
        match self {
            Self::Create { .. } => HttpMethod::Post,
            Self::Replace { .. } => HttpMethod::Put,
            Self::Patch { .. } => HttpMethod::Patch,
            Self::Delete { .. } => HttpMethod::Delete,
        }
    }

    /// Concrete endpoint path, with the id appended for targeted operations
    pub fn resolve_path(&self, resource: &str) -> String {
        match self {
            Self::Create { .. } => format!("{}/", resource.trim_matches('/')),
            Self::Replace { id, .. } | Self::Patch { id, .. } | Self::Delete { id } => {
                format!("{}/{}/", resource.trim_matches('/'), id_segment(id))
            }
        }
    }

    /// Request body, absent for deletes
    pub fn body(&self) -> Option<&Value> {
        match self {
            Self::Create { body } | Self::Replace { body, .. } | Self::Patch { body, .. } => {
                Some(body)
            }
            Self::Delete { .. } => None,
        }
    }

    /// Payload persisted to the outbox; `Null` stands in for "no body"
    pub fn outbox_body(&self) -> Value {
        self.body().cloned().unwrap_or(Value::Null)
    }

    /// The optimistic projection for this mutation kind
    pub fn projection(&self) -> Box<dyn Projection + '_> {
        match self {
            Self::Create { body } => Box::new(CreateProjection { body }),
            Self::Replace { id, body } | Self::Patch { id, body } => {
                Box::new(MergeProjection { id, body })
            }
            Self::Delete { id } => Box::new(DeleteProjection { id }),
        }
    }
}

/// Path segment form of an entity id
fn id_segment(id: &Value) -> String {
    match id {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Result of dispatching a mutation
#[derive(Debug, Clone, PartialEq)]
pub enum DispatchOutcome {
    /// Executed online; carries the decoded server response
    Completed(Value),
    /// Persisted to the outbox for replay when connectivity returns
    Queued,
}

/// Dispatches mutations online or into the outbox
#[derive(Debug, Clone)]
pub struct MutationDispatcher {
    gateway: Arc<RequestGateway>,
    outbox: Arc<OutboxStore>,
    monitor: Arc<ConnectivityMonitor>,
    cache: Arc<ReadCache>,
    mutator: OptimisticMutator,
}

impl MutationDispatcher {
    /// Assemble a dispatcher over the shared components
    pub fn new(
        gateway: Arc<RequestGateway>,
        outbox: Arc<OutboxStore>,
        monitor: Arc<ConnectivityMonitor>,
        cache: Arc<ReadCache>,
    ) -> Self {
        let mutator = OptimisticMutator::new(Arc::clone(&cache));
        Self {
            gateway,
            outbox,
            monitor,
            cache,
            mutator,
        }
    }

    /// Dispatch a mutation against a resource
    ///
    /// `key` names the cached collection view the optimistic projection
    /// targets. The projection is applied before the network or enqueue
    /// step on both paths; any failure below rolls it back before the error
    /// propagates.
    pub async fn dispatch(
        &self,
        resource: &str,
        key: &CacheKey,
        mutation: Mutation,
    ) -> Result<DispatchOutcome, ApiError> {
        let path = mutation.resolve_path(resource);
        let guard = self.mutator.apply(key, mutation.projection().as_ref()).await;

        if !self.monitor.is_online() {
            match self
                .outbox
                .enqueue(&path, mutation.method(), &mutation.outbox_body())
                .await
            {
                Ok(_) => {
                    guard.confirm();
                    self.monitor.notify(Notice::Queued);
                    Ok(DispatchOutcome::Queued)
                }
                Err(e) => {
                    tracing::error!("failed to queue {} {}: {}", mutation.method(), path, e);
                    guard.rollback().await;
                    Err(e)
                }
            }
        } else {
            match self
                .gateway
                .call(&path, mutation.method(), mutation.body())
                .await
            {
                Ok(response) => {
                    guard.confirm();
                    self.cache.invalidate_resource(resource).await;
                    Ok(DispatchOutcome::Completed(response))
                }
                Err(e) => {
                    guard.rollback().await;
                    Err(e)
                }
            }
        }
    }

    /// Best-effort probe for an already-stored bookmark with this URL
    ///
    /// A failed probe (offline, transient server fault) reports "not a
    /// duplicate" so the create proceeds; the server enforces its own
    /// integrity.
    pub async fn check_duplicate_url(&self, url: &str) -> bool {
        match self
            .gateway
            .call_with_query("bookmarks/check", HttpMethod::Get, &[("url", url)], None)
            .await
        {
            Ok(body) => body
                .get("bookmark")
                .map(|b| !b.is_null())
                .unwrap_or(false),
            Err(e) => {
                tracing::warn!("duplicate check failed, assuming not a duplicate: {}", e);
                false
            }
        }
    }
}
