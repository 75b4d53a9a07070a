//! marksync - Offline-First Bookmark Sync Core
//!
//! marksync is the data and synchronization core of a self-hosted bookmark
//! manager client. It keeps the app usable without connectivity: reads are
//! served from a keyed cache of the last known server state, writes are
//! applied optimistically and queued in a durable outbox, and queued writes
//! are replayed in order once connectivity returns.
//!
//! # Overview
//!
//! This library provides:
//! - A persistent, append-only outbox that survives process restarts
//! - A connectivity monitor with transition notifications
//! - A single HTTP gateway handling auth, path canonicalization, and
//!   response payload repair
//! - Optimistic cache projections with exact-snapshot rollback
//! - An offline-aware dispatcher deciding between network and outbox
//! - An ordered drain engine with single-flight and debounce guards
//! - A typed message bridge to the service-worker cache router
//!
//! # Module Structure
//!
//! - **`config`** / **`context`** - environment configuration and the
//!   injectable application context (credentials, settings)
//! - **`api`** - the request gateway, the only road to the remote API
//! - **`outbox`** - SQLite-backed queue of pending writes
//! - **`cache`** - keyed read cache, query refresh, optimistic projections
//! - **`dispatch`** - the mutation union and the offline-aware dispatcher
//! - **`net`** - connectivity state and user-visible notices
//! - **`sync`** - the drain engine and its auto-trigger
//! - **`worker`** - message protocol shared with the cache-router worker
//! - **`model`** - wire types for bookmarks, bundles, tags, and pages
//!
//! # Usage
//!
//! ```rust,no_run
//! use marksync::{Config, Core};
//! use marksync::cache::CacheKey;
//! use marksync::dispatch::Mutation;
//! use serde_json::json;
//!
//! # async fn example() -> Result<(), marksync::error::ApiError> {
//! let config = Config::builder()
//!     .api_base_url("https://bookmarks.example.com")
//!     .build()
//!     .expect("valid config");
//! let (core, _worker) = Core::bootstrap(config).await?;
//! core.ctx.set_token("api-token").await;
//!
//! // Dispatch a write; offline it is queued and replayed later.
//! let key = CacheKey::list("bookmarks", std::iter::empty::<(String, String)>());
//! let mutation = Mutation::Create {
//!     body: json!({"url": "https://example.com", "title": "Example"}),
//! };
//! core.dispatcher.dispatch("bookmarks", &key, mutation).await?;
//! # Ok(())
//! # }
//! ```
//!
//! # Concurrency
//!
//! Components share state through `Arc` handles and tokio channels; cache
//! and outbox operations are serialized by their own locks and by SQLite.
//! The drain replays entries strictly sequentially. No work is cancelled
//! mid-flight: a dispatched mutation runs to completion or failure.

pub mod api;
pub mod cache;
pub mod config;
pub mod context;
pub mod dispatch;
pub mod error;
pub mod model;
pub mod net;
pub mod outbox;
pub mod sync;
pub mod worker;

pub use config::Config;
pub use context::AppContext;
pub use error::ApiError;

use crate::api::RequestGateway;
use crate::cache::{QueryClient, ReadCache};
use crate::dispatch::MutationDispatcher;
use crate::net::{ConnectivityMonitor, Notice};
use crate::outbox::OutboxStore;
use crate::sync::SyncEngine;
use crate::worker::{CoreEndpoint, WorkerEndpoint, WorkerEvent};
use std::sync::Arc;

/// Assembled sync core
///
/// Owns the background tasks (auto-drain, worker event loop) and the
/// component handles the host application uses directly.
#[derive(Debug)]
pub struct Core {
    /// Injectable application context (config, credentials)
    pub ctx: Arc<AppContext>,
    /// Shared read cache
    pub cache: Arc<ReadCache>,
    /// Durable outbox
    pub outbox: Arc<OutboxStore>,
    /// HTTP gateway
    pub gateway: Arc<RequestGateway>,
    /// Connectivity monitor
    pub monitor: Arc<ConnectivityMonitor>,
    /// Read-through query layer
    pub queries: QueryClient,
    /// Offline-aware mutation dispatcher
    pub dispatcher: MutationDispatcher,
    /// Drain engine
    pub sync: Arc<SyncEngine>,
    worker_commands: tokio::sync::mpsc::UnboundedSender<worker::WorkerCommand>,
    auto_drain: tokio::task::JoinHandle<()>,
    worker_task: tokio::task::JoinHandle<()>,
}

impl Core {
    /// Assemble the core and spawn its background tasks
    ///
    /// Returns the core plus the worker-side channel endpoint, which the
    /// host hands to its cache-router context. The initial per-cache TTL
    /// configuration is pushed to the worker immediately.
    pub async fn bootstrap(config: Config) -> Result<(Self, WorkerEndpoint), ApiError> {
        let ctx = AppContext::init(config.clone());
        let cache = Arc::new(ReadCache::new(config.cache_ttl));
        let outbox = Arc::new(OutboxStore::open_default(config.data_dir.as_deref()).await?);
        let gateway = Arc::new(RequestGateway::new(Arc::clone(&ctx)));
        let monitor = Arc::new(ConnectivityMonitor::new(true));

        let queries = QueryClient::new(
            Arc::clone(&cache),
            Arc::clone(&gateway),
            config.page_size,
        );
        let dispatcher = MutationDispatcher::new(
            Arc::clone(&gateway),
            Arc::clone(&outbox),
            Arc::clone(&monitor),
            Arc::clone(&cache),
        );
        let sync = Arc::new(SyncEngine::new(
            Arc::clone(&outbox),
            Arc::clone(&gateway),
            Arc::clone(&monitor),
            Arc::clone(&cache),
            config.drain_debounce,
        ));

        let auto_drain = sync.spawn_auto_drain();

        let (core_endpoint, worker_endpoint) = worker::channel();
        core_endpoint.push_ttl_config(worker::ttl_config(config.cache_ttl));
        let worker_commands = core_endpoint.command_sender();
        let worker_task = spawn_worker_event_loop(
            core_endpoint,
            Arc::clone(&monitor),
            Arc::clone(&cache),
        );

        Ok((
            Self {
                ctx,
                cache,
                outbox,
                gateway,
                monitor,
                queries,
                dispatcher,
                sync,
                worker_commands,
                auto_drain,
                worker_task,
            },
            worker_endpoint,
        ))
    }

    /// Ask the worker to delete one of its named caches
    pub fn purge_worker_cache(&self, cache_name: impl Into<String>) {
        let _ = self.worker_commands.send(worker::WorkerCommand::PurgeCache {
            cache_name: cache_name.into(),
        });
    }

    /// Stop background tasks and close the outbox
    pub async fn shutdown(self) {
        self.auto_drain.abort();
        self.worker_task.abort();
        self.outbox.close().await;
    }
}

/// Apply worker sync-lifecycle events to the monitor and the cache
fn spawn_worker_event_loop(
    mut endpoint: CoreEndpoint,
    monitor: Arc<ConnectivityMonitor>,
    cache: Arc<ReadCache>,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(event) = endpoint.recv().await {
            match event {
                WorkerEvent::SyncStarting => monitor.set_syncing(true),
                WorkerEvent::OfflineSyncCompleted => {
                    monitor.set_syncing(false);
                    cache.invalidate_all().await;
                    monitor.notify(Notice::Synced);
                }
                WorkerEvent::SyncFailed => {
                    monitor.set_syncing(false);
                    monitor.notify(Notice::SyncFailed);
                }
                WorkerEvent::CachePurged { cache_name } => {
                    tracing::info!("worker purged cache {}", cache_name);
                }
            }
        }
    })
}
