//! # Drain Engine
//!
//! Replays queued outbox entries through the request gateway when
//! connectivity returns, then invalidates all cached reads so the next
//! render reflects authoritative server state.
//!
//! ## Ordering
//!
//! Entries are replayed strictly in enqueue order, sequentially. A create
//! followed by a patch against the same temporary identifier must not be
//! reordered, so no two replays are ever in flight at once.
//!
//! ## Failure
//!
//! Each entry is removed from the outbox only after its replay succeeds.
//! The first failing replay halts the drain and leaves the failing and all
//! subsequent entries intact, so a restart resumes exactly where the drain
//! stopped; the at-least-once contract allows the one in-flight entry to be
//! duplicated. A 404 response is the exception: the target no longer
//! exists, retrying can never succeed, so the entry is dropped and the
//! drain continues.
//!
//! ## Triggering
//!
//! [`SyncEngine::spawn_auto_drain`] watches the connectivity monitor and
//! fires one debounced drain per offline-to-online transition. The
//! monitor's syncing flag doubles as a single-flight guard, so overlapping
//! triggers collapse into one running drain.

use crate::api::RequestGateway;
use crate::cache::ReadCache;
use crate::error::ApiError;
use crate::net::{ConnectivityMonitor, Notice};
use crate::outbox::OutboxStore;
use crate::worker::WorkerEvent;
use std::sync::Arc;
use std::sync::Mutex;
use std::time::{Duration, Instant};
use tokio::sync::broadcast;

/// Result of one drain attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DrainOutcome {
    /// The outbox was drained; `replayed` entries were confirmed and
    /// `dropped` entries were discarded on 404
    Completed { replayed: usize, dropped: usize },
    /// Another drain already holds the sync slot
    SkippedAlreadySyncing,
    /// The trigger fell inside the debounce window of the previous one
    SkippedDebounced,
}

/// Replays the outbox and broadcasts sync-lifecycle events
#[derive(Debug)]
pub struct SyncEngine {
    outbox: Arc<OutboxStore>,
    gateway: Arc<RequestGateway>,
    monitor: Arc<ConnectivityMonitor>,
    cache: Arc<ReadCache>,
    events: broadcast::Sender<WorkerEvent>,
    debounce: Duration,
    last_trigger: Mutex<Option<Instant>>,
}

impl SyncEngine {
    /// Assemble a drain engine over the shared components
    pub fn new(
        outbox: Arc<OutboxStore>,
        gateway: Arc<RequestGateway>,
        monitor: Arc<ConnectivityMonitor>,
        cache: Arc<ReadCache>,
        debounce: Duration,
    ) -> Self {
        let (events, _) = broadcast::channel(32);
        Self {
            outbox,
            gateway,
            monitor,
            cache,
            events,
            debounce,
            last_trigger: Mutex::new(None),
        }
    }

    /// Subscribe to sync-lifecycle events
    pub fn subscribe_events(&self) -> broadcast::Receiver<WorkerEvent> {
        self.events.subscribe()
    }

    /// Debounced drain entry point used on connectivity-restored triggers
    pub async fn trigger(&self) -> Result<DrainOutcome, ApiError> {
        {
            let mut last = self
                .last_trigger
                .lock()
                .unwrap_or_else(|poisoned| poisoned.into_inner());
            let now = Instant::now();
            if let Some(previous) = *last {
                if now.duration_since(previous) < self.debounce {
                    tracing::debug!("drain trigger debounced");
                    return Ok(DrainOutcome::SkippedDebounced);
                }
            }
            *last = Some(now);
        }
        self.drain().await
    }

    /// Replay all queued entries in enqueue order
    pub async fn drain(&self) -> Result<DrainOutcome, ApiError> {
        if !self.monitor.begin_sync() {
            tracing::debug!("drain already in progress, skipping");
            return Ok(DrainOutcome::SkippedAlreadySyncing);
        }

        let _ = self.events.send(WorkerEvent::SyncStarting);

        let entries = match self.outbox.list_all_ordered().await {
            Ok(entries) => entries,
            Err(e) => return Err(self.fail(e)),
        };
        tracing::info!("draining {} queued entries", entries.len());

        let mut replayed = 0;
        let mut dropped = 0;
        for entry in entries {
            let body = if entry.body.is_null() {
                None
            } else {
                Some(&entry.body)
            };
            match self
                .gateway
                .call(&entry.resource_path, entry.method, body)
                .await
            {
                Ok(_) => {
                    if let Err(e) = self.outbox.remove(entry.id).await {
                        return Err(self.fail(e));
                    }
                    replayed += 1;
                }
                Err(e) if e.is_not_found() => {
                    tracing::warn!(
                        "entry {} targets a resource that no longer exists, dropping",
                        entry.id
                    );
                    if let Err(e) = self.outbox.remove(entry.id).await {
                        return Err(self.fail(e));
                    }
                    dropped += 1;
                }
                Err(e) => {
                    tracing::error!(
                        "replay of entry {} ({} {}) failed: {}",
                        entry.id,
                        entry.method,
                        entry.resource_path,
                        e
                    );
                    return Err(self.fail(e));
                }
            }
        }

        let _ = self.events.send(WorkerEvent::OfflineSyncCompleted);
        self.cache.invalidate_all().await;
        self.monitor.end_sync();
        self.monitor.notify(Notice::Synced);
        tracing::info!("drain complete: {} replayed, {} dropped", replayed, dropped);
        Ok(DrainOutcome::Completed { replayed, dropped })
    }

    fn fail(&self, error: ApiError) -> ApiError {
        let _ = self.events.send(WorkerEvent::SyncFailed);
        self.monitor.end_sync();
        self.monitor.notify(Notice::SyncFailed);
        error
    }

    /// Watch the monitor and drain once per offline-to-online transition
    pub fn spawn_auto_drain(self: &Arc<Self>) -> tokio::task::JoinHandle<()> {
        let engine = Arc::clone(self);
        let mut rx = engine.monitor.subscribe();
        tokio::spawn(async move {
            let mut was_online = rx.borrow().is_online;
            while rx.changed().await.is_ok() {
                let is_online = rx.borrow().is_online;
                if is_online && !was_online {
                    if let Err(e) = engine.trigger().await {
                        tracing::error!("offline sync failed: {}", e);
                    }
                }
                was_online = is_online;
            }
        })
    }
}
