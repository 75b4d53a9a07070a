//! # Service-Worker Bridge
//!
//! The cache router runs in a separate execution context and intercepts all
//! HTTP traffic. The core never shares memory with it; the two sides
//! exchange structured messages through the typed channel pair defined
//! here, which mirrors the worker's `postMessage` protocol.
//!
//! ## Protocol
//!
//! Inbound to the worker: `SKIP_WAITING`, `PURGE_CACHE`, `SYNC_CONFIG`.
//! Outbound from the worker: `CACHE_PURGED`, `SYNC_STARTING`,
//! `OFFLINE_SYNC_COMPLETED`, `SYNC_FAILED`. The sync-lifecycle events drive
//! the monitor's syncing flag and the post-drain cache invalidation.
//!
//! ## Route strategies
//!
//! The worker applies one caching strategy per route class; the assignment
//! is fixed, while per-cache time-to-live is pushed from the core via
//! `SYNC_CONFIG`.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;
use tokio::sync::mpsc;

/// Cache name for the navigation app shell
pub const NAV_CACHE: &str = "app-shell";
/// Cache name for static and media assets
pub const ASSET_CACHE: &str = "assets";
/// Cache name for GET API responses
pub const API_CACHE: &str = "api";

/// Message sent from the core to the worker
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum WorkerCommand {
    /// Activate a waiting worker version immediately
    #[serde(rename = "SKIP_WAITING")]
    SkipWaiting,
    /// Delete the named cache
    #[serde(rename = "PURGE_CACHE", rename_all = "camelCase")]
    PurgeCache { cache_name: String },
    /// Replace the per-cache time-to-live configuration (seconds)
    #[serde(rename = "SYNC_CONFIG")]
    SyncConfig { config: HashMap<String, u64> },
}

/// Message sent from the worker to the core
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum WorkerEvent {
    /// A purge request completed
    #[serde(rename = "CACHE_PURGED", rename_all = "camelCase")]
    CachePurged { cache_name: String },
    /// Replay of queued writes is starting
    #[serde(rename = "SYNC_STARTING")]
    SyncStarting,
    /// Replay of queued writes completed successfully
    #[serde(rename = "OFFLINE_SYNC_COMPLETED")]
    OfflineSyncCompleted,
    /// Replay of queued writes failed
    #[serde(rename = "SYNC_FAILED")]
    SyncFailed,
}

/// Route classes the worker distinguishes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteClass {
    /// Top-level navigation requests
    Navigation,
    /// Static and media assets
    StaticAssets,
    /// GET calls against the API
    ApiGet,
    /// Mutating calls against the API
    ApiMutation,
}

/// Caching strategy applied to a route class
#[derive(Debug, Clone, PartialEq)]
pub enum CacheStrategy {
    /// Try the network, fall back to the cached app shell
    NetworkFirst,
    /// Try the network, fall back to a synthetic empty-page JSON response
    NetworkFirstEmptyFallback,
    /// Serve from cache while refreshing in the background, bounded
    StaleWhileRevalidate { max_entries: u32, max_age: Duration },
    /// Never cached, never served stale
    NetworkOnly,
}

/// Strategy assignment for a route class
pub fn strategy_for(route: RouteClass) -> CacheStrategy {
    match route {
        RouteClass::Navigation => CacheStrategy::NetworkFirst,
        RouteClass::StaticAssets => CacheStrategy::StaleWhileRevalidate {
            max_entries: 200,
            max_age: Duration::from_secs(7 * 24 * 3600),
        },
        RouteClass::ApiGet => CacheStrategy::NetworkFirstEmptyFallback,
        RouteClass::ApiMutation => CacheStrategy::NetworkOnly,
    }
}

/// Per-cache time-to-live map shipped via `SYNC_CONFIG`
pub fn ttl_config(api_ttl: Duration) -> HashMap<String, u64> {
    HashMap::from([
        (NAV_CACHE.to_string(), 7 * 24 * 3600),
        (ASSET_CACHE.to_string(), 24 * 3600),
        (API_CACHE.to_string(), api_ttl.as_secs()),
    ])
}

/// Core-side endpoint of the worker channel
#[derive(Debug)]
pub struct CoreEndpoint {
    commands: mpsc::UnboundedSender<WorkerCommand>,
    events: mpsc::UnboundedReceiver<WorkerEvent>,
}

impl CoreEndpoint {
    /// Send a command to the worker; a gone worker is logged, not fatal
    pub fn send(&self, command: WorkerCommand) {
        if self.commands.send(command).is_err() {
            tracing::warn!("worker channel closed, command dropped");
        }
    }

    /// Request deletion of the named cache
    pub fn purge_cache(&self, cache_name: impl Into<String>) {
        self.send(WorkerCommand::PurgeCache {
            cache_name: cache_name.into(),
        });
    }

    /// Push the per-cache time-to-live configuration
    pub fn push_ttl_config(&self, config: HashMap<String, u64>) {
        self.send(WorkerCommand::SyncConfig { config });
    }

    /// Receive the next worker event; `None` when the worker side is gone
    pub async fn recv(&mut self) -> Option<WorkerEvent> {
        self.events.recv().await
    }

    /// A detached handle for sending commands from elsewhere
    pub fn command_sender(&self) -> mpsc::UnboundedSender<WorkerCommand> {
        self.commands.clone()
    }
}

/// Worker-side endpoint of the channel
#[derive(Debug)]
pub struct WorkerEndpoint {
    commands: mpsc::UnboundedReceiver<WorkerCommand>,
    events: mpsc::UnboundedSender<WorkerEvent>,
}

impl WorkerEndpoint {
    /// Receive the next command; `None` when the core side is gone
    pub async fn recv(&mut self) -> Option<WorkerCommand> {
        self.commands.recv().await
    }

    /// Emit an event toward the core
    pub fn emit(&self, event: WorkerEvent) {
        if self.events.send(event).is_err() {
            tracing::warn!("core channel closed, event dropped");
        }
    }
}

/// Create a connected channel pair
pub fn channel() -> (CoreEndpoint, WorkerEndpoint) {
    let (command_tx, command_rx) = mpsc::unbounded_channel();
    let (event_tx, event_rx) = mpsc::unbounded_channel();
    (
        CoreEndpoint {
            commands: command_tx,
            events: event_rx,
        },
        WorkerEndpoint {
            commands: command_rx,
            events: event_tx,
        },
    )
}
