//! # Connection Manager
//!
//! Owns the set of tracked endpoints and drives each one's connection
//! lifecycle from caller requests and reachability changes.
//!
//! ## Per-Endpoint State Machine
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │               connect()                                                 │
//! │  ┌──────────┐ oracle online ┌────────────┐  adapter ok  ┌───────────┐  │
//! │  │Untracked │──────────────►│ Connecting │─────────────►│ Connected │  │
//! │  │          │◄──────────────│ (in-flight)│              │ (tracked) │  │
//! │  └──────────┘ adapter err / └────────────┘              └─────┬─────┘  │
//! │       ▲       NotOnline          ▲                            │        │
//! │       │                          │ oracle: reachable          │        │
//! │       │                          │ (watcher task)             │        │
//! │       │                          │                            │        │
//! │       └──────────────────────────┴────────────────────────────┘        │
//! │          disconnect() / oracle: unreachable / protocol error           │
//! │          remove_endpoint() also purges persisted metadata              │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Concurrency
//! All bookkeeping sits behind one `parking_lot::Mutex` that is never held
//! across an `.await`. The tracked-set check and the in-flight registration
//! happen under the same lock before any collaborator is called, so two
//! overlapping `connect` calls for one endpoint share a single adapter
//! attempt.

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::{Arc, Weak};

use parking_lot::Mutex;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use tether_core::validation::validate_endpoint;
use tether_core::{ConnectOptions, EndpointStatus, OptionsMap, SyncStatus};
use tether_db::{
    Database, DbError, ProtocolRegistration, SyncEventEmitter, SyncProtocol, Syncable,
};

use crate::config::SyncSettings;
use crate::connectivity::ConnectivityOracle;
use crate::error::{SyncError, SyncResult};
use crate::registry::StatusRegistry;

/// Reason used when an adapter error carries no stored message.
const UNKNOWN_PROTOCOL_ERROR: &str = "protocol reported an error";

// =============================================================================
// Internal State
// =============================================================================

type Outcome = Option<SyncResult<()>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Abort {
    /// `disconnect` arrived while connecting.
    Disconnected,
    /// `remove_endpoint` arrived while connecting.
    Removed,
    /// The adapter reported an error while connecting.
    ProtocolError,
}

impl Abort {
    /// Records `self` on an in-flight attempt. Removal overrides anything;
    /// otherwise the first reason sticks.
    fn mark(self, slot: &mut Option<Abort>) {
        if self == Abort::Removed || slot.is_none() {
            *slot = Some(self);
        }
    }
}

struct InFlight {
    outcome: watch::Receiver<Outcome>,
    abort: Option<Abort>,
}

#[derive(Default)]
struct ManagerState {
    tracked: HashSet<String>,
    in_flight: HashMap<String, InFlight>,
    options: HashMap<String, ConnectOptions>,
    watchers: HashMap<String, JoinHandle<()>>,
}

struct ManagerInner {
    db: Database,
    syncable: Syncable,
    oracle: Arc<dyn ConnectivityOracle>,
    registry: StatusRegistry,
    protocol: String,
    state: Mutex<ManagerState>,
}

impl Drop for ManagerInner {
    fn drop(&mut self) {
        for (_, watcher) in self.state.get_mut().watchers.drain() {
            watcher.abort();
        }
    }
}

enum Step {
    AlreadyTracked,
    Join(watch::Receiver<Outcome>),
    WaitThenRetry(watch::Receiver<Outcome>),
    Attempt(ConnectOptions, watch::Sender<Outcome>),
}

/// Removes the in-flight entry if a connect attempt or a protocol-error
/// teardown is dropped before it finishes.
struct FlightGuard<'a> {
    state: &'a Mutex<ManagerState>,
    url: &'a str,
    armed: bool,
}

impl Drop for FlightGuard<'_> {
    fn drop(&mut self) {
        if self.armed {
            self.state.lock().in_flight.remove(self.url);
        }
    }
}

// =============================================================================
// Status Emitter
// =============================================================================

/// Routes the store's `statusChanged` events into the manager.
struct ManagerEmitter {
    inner: Weak<ManagerInner>,
}

impl SyncEventEmitter for ManagerEmitter {
    fn emit_status(&self, url: &str, status: SyncStatus) {
        let Some(inner) = self.inner.upgrade() else {
            return;
        };
        inner.registry.apply(url, status);

        if status.is_error() {
            ConnectionManager { inner }.on_protocol_error(url);
        }
    }
}

// =============================================================================
// Connection Manager
// =============================================================================

/// Manages connections from one local store to many remote endpoints.
///
/// ## Example
/// ```rust,ignore
/// let manager = ConnectionManager::new(db, adapter, oracle, &config.sync);
///
/// manager.set_status_listener("https://sync.example/db1", |status| {
///     println!("db1: {status}");
/// });
/// manager.connect("https://sync.example/db1", None).await?;
/// ```
#[derive(Clone)]
pub struct ConnectionManager {
    inner: Arc<ManagerInner>,
}

impl ConnectionManager {
    /// Creates a manager and registers `protocol` with the store under
    /// `settings.protocol`.
    pub fn new(
        db: Database,
        protocol: Arc<dyn SyncProtocol>,
        oracle: Arc<dyn ConnectivityOracle>,
        settings: &SyncSettings,
    ) -> Self {
        let syncable = db.syncable();
        syncable.register_protocol(
            settings.protocol.clone(),
            ProtocolRegistration::new(protocol).partials_threshold(settings.partials_threshold),
        );

        let inner = Arc::new(ManagerInner {
            db,
            syncable,
            oracle,
            registry: StatusRegistry::new(),
            protocol: settings.protocol.clone(),
            state: Mutex::new(ManagerState::default()),
        });

        inner.syncable.add_emitter(Arc::new(ManagerEmitter {
            inner: Arc::downgrade(&inner),
        }));

        info!(
            db = %inner.db.name(),
            protocol = %inner.protocol,
            "Connection manager ready"
        );

        ConnectionManager { inner }
    }

    /// The store this manager works against.
    pub fn database(&self) -> &Database {
        &self.inner.db
    }

    // =========================================================================
    // Connect
    // =========================================================================

    /// Connects `url` and starts tracking it.
    ///
    /// ## Behavior
    /// - Already tracked: returns `Ok(())` without touching anything
    /// - Connect already in flight: waits for it and returns its outcome
    /// - First connect for `url`: `options` are merged with the defaults and
    ///   kept for every later connect and reconnect
    /// - Options already stored for `url`: `options` is ignored; they are
    ///   replaced only after `remove_endpoint`
    ///
    /// ## Errors
    /// - `InvalidEndpoint` - `url` failed validation
    /// - `NotOnline` - the oracle reports `url` unreachable
    /// - `ConnectFailure` - the adapter rejected the attempt
    /// - `AsyncProtocolError` - the adapter reported an error before the
    ///   endpoint could be tracked
    pub async fn connect(&self, url: &str, options: Option<OptionsMap>) -> SyncResult<()> {
        validate_endpoint(url)?;

        loop {
            match self.next_step(url, options.as_ref()) {
                Step::AlreadyTracked => {
                    debug!(url = %url, "Endpoint already tracked");
                    return Ok(());
                }
                Step::Join(outcome) => {
                    debug!(url = %url, "Joining in-flight connect");
                    return wait_outcome(url, outcome).await;
                }
                Step::WaitThenRetry(outcome) => {
                    debug!(url = %url, "Waiting for aborted connect to settle");
                    let _ = wait_outcome(url, outcome).await;
                }
                Step::Attempt(options, sender) => {
                    let mut guard = FlightGuard {
                        state: &self.inner.state,
                        url,
                        armed: true,
                    };
                    let result = self.attempt(url, &options).await;
                    guard.armed = false;
                    let result = self.finish(url, result).await;
                    sender.send_replace(Some(result.clone()));
                    return result;
                }
            }
        }
    }

    /// Decides, under the lock, what a `connect` call does next.
    fn next_step(&self, url: &str, options: Option<&OptionsMap>) -> Step {
        let mut state = self.inner.state.lock();

        if state.tracked.contains(url) {
            return Step::AlreadyTracked;
        }

        if let Some(flight) = state.in_flight.get(url) {
            return match flight.abort {
                None => Step::Join(flight.outcome.clone()),
                Some(_) => Step::WaitThenRetry(flight.outcome.clone()),
            };
        }

        let options = state
            .options
            .entry(url.to_string())
            .or_insert_with(|| ConnectOptions::merge(options.cloned()))
            .clone();

        let (sender, outcome) = watch::channel(None);
        state.in_flight.insert(
            url.to_string(),
            InFlight {
                outcome,
                abort: None,
            },
        );
        Step::Attempt(options, sender)
    }

    /// Checks reachability and runs the adapter connect.
    async fn attempt(&self, url: &str, options: &ConnectOptions) -> SyncResult<()> {
        if !self.inner.oracle.is_online(url).await? {
            info!(url = %url, "Endpoint not reachable, not connecting");
            return Err(SyncError::NotOnline(url.to_string()));
        }

        info!(
            url = %url,
            poll_interval_ms = options.poll_interval_ms,
            "Connecting endpoint"
        );

        match self
            .inner
            .syncable
            .connect(&self.inner.protocol, url, options)
            .await
        {
            Ok(()) => Ok(()),
            Err(e) => {
                warn!(url = %url, error = %e, "Connect failed");

                if let Err(cleanup) = self.inner.syncable.disconnect(url).await {
                    warn!(url = %url, error = %cleanup, "Cleanup disconnect failed");
                }

                let reason = match e {
                    DbError::Protocol(p) => p.message,
                    other => other.to_string(),
                };
                Err(SyncError::ConnectFailure {
                    url: url.to_string(),
                    reason,
                })
            }
        }
    }

    /// Settles an attempt: tracks the endpoint or tears it down.
    async fn finish(&self, url: &str, result: SyncResult<()>) -> SyncResult<()> {
        let abort = {
            let mut state = self.inner.state.lock();
            let abort = state.in_flight.remove(url).and_then(|flight| flight.abort);

            if result.is_ok() && abort.is_none() {
                state.tracked.insert(url.to_string());
                if !state.watchers.contains_key(url) {
                    let changes = self.inner.oracle.watch(url);
                    let watcher = self.spawn_watcher(url.to_string(), changes);
                    state.watchers.insert(url.to_string(), watcher);
                }
            }
            abort
        };

        match (result, abort) {
            (Err(e), _) => Err(e),
            (Ok(()), None) => {
                info!(url = %url, "Endpoint connected");
                Ok(())
            }
            (Ok(()), Some(Abort::Disconnected)) => {
                debug!(url = %url, "Connect finished after disconnect, tearing down");
                if let Err(e) = self.inner.syncable.disconnect(url).await {
                    warn!(url = %url, error = %e, "Deferred disconnect failed");
                }
                Ok(())
            }
            (Ok(()), Some(Abort::Removed)) => {
                debug!(url = %url, "Connect finished after removal, deleting");
                if let Err(e) = self.inner.syncable.delete(url).await {
                    warn!(url = %url, error = %e, "Deferred delete failed");
                }
                self.inner.registry.forget(url);
                Ok(())
            }
            (Ok(()), Some(Abort::ProtocolError)) => {
                let reason = self.last_error(url).await;
                if let Err(e) = self.inner.syncable.disconnect(url).await {
                    warn!(url = %url, error = %e, "Cleanup disconnect failed");
                }
                Err(SyncError::AsyncProtocolError {
                    url: url.to_string(),
                    reason,
                })
            }
        }
    }

    /// Spawns the task that follows reachability of one tracked endpoint.
    ///
    /// Reachable → `connect(url, None)`; unreachable → `disconnect(url)`.
    fn spawn_watcher(&self, url: String, mut changes: watch::Receiver<bool>) -> JoinHandle<()> {
        let inner = Arc::downgrade(&self.inner);

        tokio::spawn(async move {
            while changes.changed().await.is_ok() {
                let online = *changes.borrow_and_update();
                let Some(inner) = inner.upgrade() else {
                    break;
                };
                let manager = ConnectionManager { inner };

                if online {
                    info!(url = %url, "Endpoint reachable again, reconnecting");
                    if let Err(e) = manager.connect(&url, None).await {
                        warn!(url = %url, error = %e, "Reconnect failed");
                    }
                } else {
                    info!(url = %url, "Endpoint unreachable, disconnecting");
                    if let Err(e) = manager.disconnect(&url).await {
                        warn!(url = %url, error = %e, "Disconnect after reachability loss failed");
                    }
                }
            }
            debug!(url = %url, "Reachability watcher stopped");
        })
    }

    // =========================================================================
    // Disconnect / Remove
    // =========================================================================

    /// Stops tracking `url` and tears down its connection.
    ///
    /// Safe to call on endpoints that are not tracked. Keeps the status
    /// listener and the reachability watcher, so the endpoint reconnects
    /// when it becomes reachable again.
    ///
    /// A connect still in flight is not interrupted; it is torn down once it
    /// settles and the endpoint stays untracked.
    pub async fn disconnect(&self, url: &str) -> SyncResult<()> {
        let (was_tracked, in_flight) = self.untrack(url, Abort::Disconnected);
        if in_flight {
            debug!(url = %url, "Disconnect requested while connecting, deferring teardown");
            return Ok(());
        }
        if was_tracked {
            info!(url = %url, "Disconnecting endpoint");
        }

        self.inner.syncable.disconnect(url).await?;
        Ok(())
    }

    /// Forgets `url`: stops tracking, clears its listener, stops its
    /// reachability watcher and deletes the persisted sync relationship.
    ///
    /// Idempotent. A later `connect` starts from scratch.
    pub async fn remove_endpoint(&self, url: &str) -> SyncResult<()> {
        self.untrack(url, Abort::Removed);

        let watcher = {
            let mut state = self.inner.state.lock();
            state.options.remove(url);
            state.watchers.remove(url)
        };
        if let Some(watcher) = watcher {
            watcher.abort();
        }

        self.inner.registry.clear_listener(url);
        self.inner.registry.forget(url);

        self.inner.syncable.delete(url).await?;

        // Drop any status emitted while the delete was running.
        self.inner.registry.forget(url);

        info!(url = %url, "Endpoint removed");
        Ok(())
    }

    /// Removes `url` from the tracked set and marks an in-flight connect
    /// with `abort`. Returns (was tracked, was in flight).
    fn untrack(&self, url: &str, abort: Abort) -> (bool, bool) {
        let mut state = self.inner.state.lock();
        let in_flight = match state.in_flight.get_mut(url) {
            Some(flight) => {
                abort.mark(&mut flight.abort);
                true
            }
            None => false,
        };
        (state.tracked.remove(url), in_flight)
    }

    /// Handles an `Error` status from the store.
    ///
    /// A tracked endpoint is untracked and torn down by a spawned task. The
    /// teardown occupies the in-flight slot, so a `connect` issued meanwhile
    /// waits for it and then starts a fresh session.
    fn on_protocol_error(&self, url: &str) {
        let sender = {
            let mut state = self.inner.state.lock();
            if let Some(flight) = state.in_flight.get_mut(url) {
                Abort::ProtocolError.mark(&mut flight.abort);
                return;
            }
            if !state.tracked.remove(url) {
                return;
            }

            let (sender, outcome) = watch::channel(None);
            state.in_flight.insert(
                url.to_string(),
                InFlight {
                    outcome,
                    abort: Some(Abort::ProtocolError),
                },
            );
            sender
        };

        let manager = self.clone();
        let url = url.to_string();
        tokio::spawn(async move {
            let guard = FlightGuard {
                state: &manager.inner.state,
                url: &url,
                armed: true,
            };

            if let Err(e) = manager.inner.syncable.disconnect(&url).await {
                warn!(url = %url, error = %e, "Disconnect after protocol error failed");
            }

            let error = SyncError::AsyncProtocolError {
                reason: manager.last_error(&url).await,
                url: url.clone(),
            };
            warn!(url = %url, error = %error, "Dropped endpoint after protocol error");

            drop(guard);
            sender.send_replace(Some(Err(error)));
        });
    }

    async fn last_error(&self, url: &str) -> String {
        match self.inner.db.sync_nodes().get(url).await {
            Ok(Some(node)) => node
                .last_error
                .unwrap_or_else(|| UNKNOWN_PROTOCOL_ERROR.to_string()),
            _ => UNKNOWN_PROTOCOL_ERROR.to_string(),
        }
    }

    // =========================================================================
    // Status
    // =========================================================================

    /// Registers `listener` to receive human-readable status text for `url`.
    ///
    /// Replaces any previous listener for `url`. Does not fire with the
    /// current status.
    pub fn set_status_listener<F>(&self, url: &str, listener: F)
    where
        F: Fn(&str) + Send + Sync + 'static,
    {
        self.inner.registry.set_listener(url, Arc::new(listener));
    }

    /// Current status of `url`.
    ///
    /// Falls back to the persisted status for endpoints known from an
    /// earlier run.
    pub async fn status(&self, url: &str) -> SyncResult<SyncStatus> {
        if let Some(status) = self.inner.registry.current(url) {
            return Ok(status);
        }

        self.inner
            .syncable
            .status(url)
            .await?
            .ok_or_else(|| SyncError::UnknownEndpoint(url.to_string()))
    }

    /// Current status of `url` as human-readable text.
    pub async fn get_status(&self, url: &str) -> SyncResult<String> {
        Ok(self.status(url).await?.to_string())
    }

    /// Every endpoint the store knows, with its status and whether it is
    /// currently tracked.
    pub async fn list_statuses(&self) -> SyncResult<Vec<EndpointStatus>> {
        let nodes = self.inner.syncable.list().await?;
        let tracked = self.inner.state.lock().tracked.clone();

        Ok(nodes
            .into_iter()
            .map(|node| EndpointStatus {
                status: self.inner.registry.current(&node.url).unwrap_or(node.status),
                tracked: tracked.contains(&node.url),
                url: node.url,
            })
            .collect())
    }

    /// Returns true if `url` is in the tracked set.
    pub fn is_tracked(&self, url: &str) -> bool {
        self.inner.state.lock().tracked.contains(url)
    }

    /// Tracked endpoints, sorted.
    pub fn tracked_endpoints(&self) -> Vec<String> {
        let mut urls: Vec<String> = self.inner.state.lock().tracked.iter().cloned().collect();
        urls.sort();
        urls
    }

    /// Options stored for `url`, if any.
    pub fn options(&self, url: &str) -> Option<ConnectOptions> {
        self.inner.state.lock().options.get(url).cloned()
    }

    /// Stops every reachability watcher and disconnects every tracked
    /// endpoint.
    ///
    /// Connects still in flight are torn down once they settle.
    pub async fn shutdown(&self) {
        let tracked: Vec<String> = {
            let mut state = self.inner.state.lock();
            for (_, watcher) in state.watchers.drain() {
                watcher.abort();
            }
            for flight in state.in_flight.values_mut() {
                Abort::Disconnected.mark(&mut flight.abort);
            }
            state.tracked.drain().collect()
        };

        info!(endpoints = tracked.len(), "Shutting down connection manager");

        for url in tracked {
            if let Err(e) = self.inner.syncable.disconnect(&url).await {
                warn!(url = %url, error = %e, "Disconnect during shutdown failed");
            }
        }
    }
}

impl fmt::Debug for ConnectionManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionManager")
            .field("protocol", &self.inner.protocol)
            .field("tracked", &self.tracked_endpoints())
            .finish_non_exhaustive()
    }
}

/// Waits for the outcome of someone else's connect attempt.
async fn wait_outcome(url: &str, mut outcome: watch::Receiver<Outcome>) -> SyncResult<()> {
    let settled = outcome
        .wait_for(Option::is_some)
        .await
        .map(|result| result.clone());

    match settled {
        Ok(Some(result)) => result,
        Ok(None) => Ok(()),
        Err(_) => Err(SyncError::ConnectFailure {
            url: url.to_string(),
            reason: "connect attempt was cancelled".to_string(),
        }),
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connectivity::ManualConnectivity;
    use serde_json::json;
    use std::time::Duration;
    use tether_db::{DbConfig, MockProtocol};

    const URL: &str = "https://sync.example/db1";

    async fn setup(online: bool) -> (ConnectionManager, Arc<MockProtocol>, Arc<ManualConnectivity>) {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let mock = Arc::new(MockProtocol::new());
        let oracle = Arc::new(ManualConnectivity::new(online));
        let manager =
            ConnectionManager::new(db, mock.clone(), oracle.clone(), &SyncSettings::default());
        (manager, mock, oracle)
    }

    #[tokio::test]
    async fn test_invalid_endpoint_rejected() {
        let (manager, mock, _) = setup(true).await;
        let result = manager.connect("not a url", None).await;
        assert!(matches!(result, Err(SyncError::InvalidEndpoint(_))));
        assert_eq!(mock.connect_calls(), 0);
    }

    #[tokio::test]
    async fn test_options_merge_and_reuse() {
        let (manager, mock, _) = setup(true).await;
        let supplied = json!({ "pollInterval": 50, "credentials": "include", "batch": 5 });

        manager
            .connect(URL, supplied.as_object().cloned())
            .await
            .unwrap();

        let options = manager.options(URL).unwrap();
        assert_eq!(options.poll_interval_ms, 10_000);
        assert_eq!(options.get("batch"), Some(&json!(5)));
        assert_eq!(mock.last_context(URL).unwrap().options, options);

        // A reconnect without options reuses the stored ones.
        manager.disconnect(URL).await.unwrap();
        manager.connect(URL, None).await.unwrap();
        assert_eq!(mock.last_context(URL).unwrap().options, options);

        // Options supplied to a later connect are ignored while the first
        // ones are stored.
        manager.disconnect(URL).await.unwrap();
        let other = json!({ "batch": 9 });
        manager.connect(URL, other.as_object().cloned()).await.unwrap();
        assert_eq!(manager.options(URL).unwrap().get("batch"), Some(&json!(5)));
        assert_eq!(mock.last_context(URL).unwrap().options, options);

        // After removal the next connect's options take effect.
        manager.remove_endpoint(URL).await.unwrap();
        manager.connect(URL, other.as_object().cloned()).await.unwrap();
        assert_eq!(manager.options(URL).unwrap().get("batch"), Some(&json!(9)));
        assert_eq!(
            mock.last_context(URL).unwrap().options.get("batch"),
            Some(&json!(9))
        );
    }

    #[tokio::test]
    async fn test_partials_threshold_forwarded() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let mock = Arc::new(MockProtocol::new());
        let settings = SyncSettings {
            partials_threshold: Some(64),
            ..SyncSettings::default()
        };
        let manager =
            ConnectionManager::new(db, mock.clone(), Arc::new(ManualConnectivity::default()), &settings);

        manager.connect(URL, None).await.unwrap();
        assert_eq!(mock.last_context(URL).unwrap().partials_threshold, Some(64));
        assert_eq!(
            manager.database().syncable().protocol_names(),
            vec!["tether"]
        );
    }

    #[tokio::test]
    async fn test_connect_failure_cleans_up() {
        let (manager, mock, _) = setup(true).await;
        mock.set_connect_error(Some("handshake rejected"));

        match manager.connect(URL, None).await {
            Err(SyncError::ConnectFailure { reason, .. }) => {
                assert_eq!(reason, "handshake rejected")
            }
            other => panic!("expected ConnectFailure, got {:?}", other),
        }
        assert!(!manager.is_tracked(URL));
        assert_eq!(mock.disconnect_calls(), 1);
        assert_eq!(manager.get_status(URL).await.unwrap(), "Error");
    }

    #[tokio::test]
    async fn test_shutdown_disconnects_everything() {
        let (manager, mock, oracle) = setup(true).await;
        manager.connect("memory://a", None).await.unwrap();
        manager.connect("memory://b", None).await.unwrap();
        assert_eq!(manager.tracked_endpoints(), vec!["memory://a", "memory://b"]);

        manager.shutdown().await;
        assert!(manager.tracked_endpoints().is_empty());
        assert_eq!(mock.disconnect_calls(), 2);

        // Watchers are gone: reachability flips do nothing.
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert_eq!(oracle.watcher_count("memory://a"), 0);
    }

    #[tokio::test]
    async fn test_dropping_manager_stops_watchers() {
        let (manager, _, oracle) = setup(true).await;
        manager.connect(URL, None).await.unwrap();
        assert_eq!(oracle.watcher_count(URL), 1);

        drop(manager);
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert_eq!(oracle.watcher_count(URL), 0);
    }
}
