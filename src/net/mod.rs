//! # Network Status Monitor
//!
//! Tracks online/offline state for the whole process and fans out
//! transitions to interested components.
//!
//! ## Features
//!
//! - **Synchronous reads**: `is_online()` answers from the latest known
//!   state without awaiting
//! - **Transition stream**: a `watch` subscription for the dispatcher and
//!   the auto-drain task
//! - **Notices**: user-visible events (toast-equivalent) on transitions,
//!   queued mutations, and sync completion
//!
//! State transitions come only from environment signals (the host app
//! forwards platform online/offline events into [`ConnectivityMonitor::set_online`])
//! and from sync-lifecycle events of the worker layer.

use std::fmt;
use tokio::sync::{broadcast, watch};

/// Process-wide connectivity state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConnectivityState {
    /// Latest environment connectivity signal
    pub is_online: bool,
    /// Whether an outbox drain is in progress
    pub is_syncing: bool,
}

/// User-visible event, rendered by the UI layer as a transient toast
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Notice {
    /// Connectivity was restored
    Online,
    /// Connectivity was lost
    Offline,
    /// A mutation was queued for later replay instead of sent
    Queued,
    /// All queued mutations were replayed
    Synced,
    /// Replaying queued mutations failed; entries were retained
    SyncFailed,
}

impl fmt::Display for Notice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Self::Online => "Connection restored",
            Self::Offline => "You are offline",
            Self::Queued => "Saved offline, will sync when back online",
            Self::Synced => "Offline changes synced",
            Self::SyncFailed => "Syncing offline changes failed",
        };
        f.write_str(text)
    }
}

/// Monitor owning the shared connectivity state
#[derive(Debug)]
pub struct ConnectivityMonitor {
    state: watch::Sender<ConnectivityState>,
    notices: broadcast::Sender<Notice>,
}

impl ConnectivityMonitor {
    /// Create a monitor with the given initial connectivity
    pub fn new(initially_online: bool) -> Self {
        let (state, _) = watch::channel(ConnectivityState {
            is_online: initially_online,
            is_syncing: false,
        });
        let (notices, _) = broadcast::channel(32);
        Self { state, notices }
    }

    /// Current connectivity, read synchronously
    pub fn is_online(&self) -> bool {
        self.state.borrow().is_online
    }

    /// Whether an outbox drain is in progress
    pub fn is_syncing(&self) -> bool {
        self.state.borrow().is_syncing
    }

    /// Feed an environment connectivity signal into the monitor
    ///
    /// Returns `true` when this call was an offline-to-online transition.
    /// Repeated signals with the same value change nothing and emit no
    /// notice.
    pub fn set_online(&self, online: bool) -> bool {
        let mut came_online = false;
        let mut changed = false;
        self.state.send_if_modified(|state| {
            if state.is_online == online {
                return false;
            }
            came_online = online;
            state.is_online = online;
            changed = true;
            true
        });

        if changed {
            if online {
                tracing::info!("network: online");
                self.notify(Notice::Online);
            } else {
                tracing::warn!("network: offline");
                self.notify(Notice::Offline);
            }
        }
        came_online
    }

    /// Try to claim the single drain slot
    ///
    /// Returns `false` when a drain is already in progress; the caller must
    /// not start another.
    pub(crate) fn begin_sync(&self) -> bool {
        let mut claimed = false;
        self.state.send_if_modified(|state| {
            if state.is_syncing {
                return false;
            }
            state.is_syncing = true;
            claimed = true;
            true
        });
        claimed
    }

    /// Release the drain slot
    pub(crate) fn end_sync(&self) {
        self.state.send_if_modified(|state| {
            if !state.is_syncing {
                return false;
            }
            state.is_syncing = false;
            true
        });
    }

    /// Mirror a worker-reported sync state
    pub fn set_syncing(&self, syncing: bool) {
        if syncing {
            self.begin_sync();
        } else {
            self.end_sync();
        }
    }

    /// Subscribe to connectivity transitions
    pub fn subscribe(&self) -> watch::Receiver<ConnectivityState> {
        self.state.subscribe()
    }

    /// Subscribe to user-visible notices
    pub fn notices(&self) -> broadcast::Receiver<Notice> {
        self.notices.subscribe()
    }

    /// Publish a notice; dropped silently when nobody listens
    pub(crate) fn notify(&self, notice: Notice) {
        let _ = self.notices.send(notice);
    }
}
