//! # Connectivity Oracle
//!
//! Answers "is this endpoint reachable right now?" and notifies watchers when
//! the answer flips. Detection itself lives outside this crate; the
//! application feeds [`ManualConnectivity`] from whatever source it has.
//!
//! ## Subscription Model
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  OS / app reachability source                                          │
//! │       │ set_online(url, bool)                                          │
//! │       ▼                                                                 │
//! │  ManualConnectivity                                                    │
//! │  └── url ──► watch::Sender<bool>                                       │
//! │                  │                                                      │
//! │                  ├── is_online(url)  → current value                   │
//! │                  └── watch(url)      → watch::Receiver<bool>           │
//! │                                          │ changed().await             │
//! │                                          ▼                              │
//! │                               ConnectionManager watcher task           │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::collections::HashMap;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::sync::watch;
use tracing::debug;

use crate::error::SyncResult;

/// Reports reachability per endpoint.
#[async_trait]
pub trait ConnectivityOracle: Send + Sync {
    /// Current reachability of `url`.
    async fn is_online(&self, url: &str) -> SyncResult<bool>;

    /// Subscribes to reachability changes of `url`.
    ///
    /// The receiver sees only changes made after this call.
    fn watch(&self, url: &str) -> watch::Receiver<bool>;
}

/// Programmable oracle.
///
/// Endpoints never set explicitly report the default state.
pub struct ManualConnectivity {
    default_online: Mutex<bool>,
    endpoints: Mutex<HashMap<String, watch::Sender<bool>>>,
}

impl ManualConnectivity {
    /// Creates an oracle where unknown endpoints report `default_online`.
    pub fn new(default_online: bool) -> Self {
        ManualConnectivity {
            default_online: Mutex::new(default_online),
            endpoints: Mutex::new(HashMap::new()),
        }
    }

    fn sender(&self, url: &str) -> watch::Sender<bool> {
        let default_online = *self.default_online.lock();
        self.endpoints
            .lock()
            .entry(url.to_string())
            .or_insert_with(|| watch::channel(default_online).0)
            .clone()
    }

    /// Sets reachability of one endpoint. Watchers are notified only when
    /// the value changes.
    pub fn set_online(&self, url: &str, online: bool) {
        let changed = self.sender(url).send_if_modified(|current| {
            let changed = *current != online;
            *current = online;
            changed
        });
        if changed {
            debug!(url = %url, online, "Reachability changed");
        }
    }

    /// Sets reachability of every endpoint, and the default for new ones.
    pub fn set_all(&self, online: bool) {
        *self.default_online.lock() = online;
        let urls: Vec<String> = self.endpoints.lock().keys().cloned().collect();
        for url in urls {
            self.set_online(&url, online);
        }
    }

    /// Number of live watchers for `url`.
    pub fn watcher_count(&self, url: &str) -> usize {
        self.endpoints
            .lock()
            .get(url)
            .map_or(0, |tx| tx.receiver_count())
    }
}

impl Default for ManualConnectivity {
    fn default() -> Self {
        Self::new(true)
    }
}

#[async_trait]
impl ConnectivityOracle for ManualConnectivity {
    async fn is_online(&self, url: &str) -> SyncResult<bool> {
        Ok(*self.sender(url).borrow())
    }

    fn watch(&self, url: &str) -> watch::Receiver<bool> {
        self.sender(url).subscribe()
    }
}
