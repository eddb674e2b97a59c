//! # Syncable Facade
//!
//! The store's sync surface: protocol registration, per-endpoint sessions,
//! and the `statusChanged(status, url)` event stream.
//!
//! ## Session Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                       Syncable::connect                                 │
//! │                                                                         │
//! │  lookup protocol ──► not registered? ──► Err(ProtocolNotRegistered)    │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  new session id for url (older session for url is superseded)          │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  _sync_nodes ← Connecting ─────────────────► emit(url, Connecting)     │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  adapter.connect(SyncContext { url, options, reporter, .. })           │
//! │       │                                                                 │
//! │       ├── Err / error reported ──► _sync_nodes ← Error ──► emit Error  │
//! │       └── Ok ──────────────────► _sync_nodes ← Online ──► emit Online  │
//! │                                                                         │
//! │  Later: reporter.report(status) / report_error(msg)                    │
//! │         └── dropped once the session is disconnected or deleted        │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use parking_lot::{Mutex, RwLock};
use sqlx::SqlitePool;
use tracing::{debug, info, warn};

use tether_core::{ConnectOptions, SyncStatus};

use crate::error::{DbError, DbResult};
use crate::protocol::{ProtocolError, ProtocolRegistration, SyncContext};
use crate::repository::sync_nodes::{SyncNode, SyncNodeRepository};

// =============================================================================
// Event Emitter
// =============================================================================

/// Receives `statusChanged` events.
///
/// Called synchronously from whichever task changed the status, so
/// implementations must not block.
pub trait SyncEventEmitter: Send + Sync {
    /// A node's status changed.
    fn emit_status(&self, url: &str, status: SyncStatus);
}

// =============================================================================
// Shared State
// =============================================================================

struct Session {
    id: u64,
    protocol: String,
    failed: Option<String>,
}

/// Sync state shared by every clone of a [`Database`](crate::Database).
pub(crate) struct SyncState {
    protocols: RwLock<HashMap<String, ProtocolRegistration>>,
    emitters: RwLock<Vec<Arc<dyn SyncEventEmitter>>>,
    sessions: Mutex<HashMap<String, Session>>,
    next_session: AtomicU64,
    default_partials_threshold: Option<u32>,
}

impl SyncState {
    pub(crate) fn new(default_partials_threshold: Option<u32>) -> Self {
        SyncState {
            protocols: RwLock::new(HashMap::new()),
            emitters: RwLock::new(Vec::new()),
            sessions: Mutex::new(HashMap::new()),
            next_session: AtomicU64::new(1),
            default_partials_threshold,
        }
    }

    fn emit(&self, url: &str, status: SyncStatus) {
        let emitters = self.emitters.read().clone();
        for emitter in emitters {
            emitter.emit_status(url, status);
        }
    }

    fn begin_session(&self, url: &str, protocol: &str) -> u64 {
        let id = self.next_session.fetch_add(1, Ordering::SeqCst);
        self.sessions.lock().insert(
            url.to_string(),
            Session {
                id,
                protocol: protocol.to_string(),
                failed: None,
            },
        );
        id
    }

    fn end_session(&self, url: &str) -> Option<Session> {
        self.sessions.lock().remove(url)
    }

    fn is_current(&self, url: &str, session: u64) -> bool {
        self.sessions
            .lock()
            .get(url)
            .is_some_and(|s| s.id == session)
    }

    fn is_ended(&self, url: &str) -> bool {
        !self.sessions.lock().contains_key(url)
    }

    /// Records a failure on the current session. Returns false if stale.
    fn mark_failed(&self, url: &str, session: u64, message: &str) -> bool {
        match self.sessions.lock().get_mut(url) {
            Some(s) if s.id == session => {
                s.failed = Some(message.to_string());
                true
            }
            _ => false,
        }
    }

    fn failure(&self, url: &str, session: u64) -> Option<String> {
        self.sessions
            .lock()
            .get(url)
            .filter(|s| s.id == session)
            .and_then(|s| s.failed.clone())
    }

    fn registration(&self, protocol: &str) -> Option<ProtocolRegistration> {
        self.protocols.read().get(protocol).cloned()
    }
}

// =============================================================================
// Status Reporter
// =============================================================================

/// Handed to an adapter on connect; reports status for one session.
///
/// Holds the sync state weakly, so an adapter keeping its reporter around
/// does not keep the store alive.
#[derive(Clone)]
pub struct StatusReporter {
    url: String,
    session: u64,
    pool: SqlitePool,
    state: Weak<SyncState>,
}

impl StatusReporter {
    /// Endpoint this reporter belongs to.
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Returns false once the session was disconnected, deleted or replaced.
    pub fn is_active(&self) -> bool {
        self.state
            .upgrade()
            .is_some_and(|state| state.is_current(&self.url, self.session))
    }

    /// Reports a status change.
    ///
    /// `SyncStatus::Error` is treated as [`report_error`](Self::report_error).
    pub async fn report(&self, status: SyncStatus) {
        if status.is_error() {
            self.report_error("protocol reported an error").await;
            return;
        }

        let Some(state) = self.state.upgrade() else {
            return;
        };
        if !state.is_current(&self.url, self.session) {
            debug!(url = %self.url, %status, "Dropping report from stale session");
            return;
        }

        let nodes = SyncNodeRepository::new(self.pool.clone());
        match nodes.set_status(&self.url, status, None).await {
            Ok(_) => state.emit(&self.url, status),
            Err(e) => warn!(url = %self.url, error = %e, "Failed to persist reported status"),
        }
    }

    /// Reports a failure. The node moves to `Error` and stays there until
    /// the next connect.
    pub async fn report_error(&self, message: &str) {
        let Some(state) = self.state.upgrade() else {
            return;
        };
        if !state.mark_failed(&self.url, self.session, message) {
            debug!(url = %self.url, "Dropping error from stale session");
            return;
        }

        warn!(url = %self.url, error = %message, "Protocol reported error");

        let nodes = SyncNodeRepository::new(self.pool.clone());
        if let Err(e) = nodes
            .set_status(&self.url, SyncStatus::Error, Some(message))
            .await
        {
            warn!(url = %self.url, error = %e, "Failed to persist protocol error");
        }
        state.emit(&self.url, SyncStatus::Error);
    }
}

impl fmt::Debug for StatusReporter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StatusReporter")
            .field("url", &self.url)
            .field("session", &self.session)
            .finish_non_exhaustive()
    }
}

// =============================================================================
// Syncable
// =============================================================================

/// Sync surface of an open store. Obtained from
/// [`Database::syncable`](crate::Database::syncable).
#[derive(Clone)]
pub struct Syncable {
    pool: SqlitePool,
    state: Arc<SyncState>,
}

impl Syncable {
    pub(crate) fn new(pool: SqlitePool, state: Arc<SyncState>) -> Self {
        Syncable { pool, state }
    }

    fn nodes(&self) -> SyncNodeRepository {
        SyncNodeRepository::new(self.pool.clone())
    }

    /// Registers an adapter under `name`, replacing any previous one.
    pub fn register_protocol(&self, name: impl Into<String>, registration: ProtocolRegistration) {
        let name = name.into();
        info!(
            protocol = %name,
            partials_threshold = ?registration.partials_threshold,
            "Registering sync protocol"
        );
        self.state.protocols.write().insert(name, registration);
    }

    /// Names of all registered protocols, sorted.
    pub fn protocol_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.state.protocols.read().keys().cloned().collect();
        names.sort();
        names
    }

    /// Adds a receiver of `statusChanged` events.
    pub fn add_emitter(&self, emitter: Arc<dyn SyncEventEmitter>) {
        self.state.emitters.write().push(emitter);
    }

    /// Connects `url` through the adapter registered as `protocol`.
    ///
    /// ## Returns
    /// * `Ok(())` - handshake done, node is `Online`
    /// * `Err(DbError::Protocol)` - adapter failed or reported an error
    ///   before the handshake finished; node is `Error`
    pub async fn connect(&self, protocol: &str, url: &str, options: &ConnectOptions) -> DbResult<()> {
        let registration = self
            .state
            .registration(protocol)
            .ok_or_else(|| DbError::ProtocolNotRegistered(protocol.to_string()))?;

        let session = self.state.begin_session(url, protocol);
        debug!(url = %url, protocol = %protocol, session, "Starting sync session");

        self.nodes().upsert_connecting(url, protocol, options).await?;
        self.state.emit(url, SyncStatus::Connecting);

        let ctx = SyncContext {
            url: url.to_string(),
            options: options.clone(),
            partials_threshold: registration
                .partials_threshold
                .or(self.state.default_partials_threshold),
            reporter: StatusReporter {
                url: url.to_string(),
                session,
                pool: self.pool.clone(),
                state: Arc::downgrade(&self.state),
            },
        };

        match registration.sync.connect(ctx).await {
            Err(e) => {
                // Skip the write if a disconnect or newer connect took over.
                if self.state.mark_failed(url, session, &e.message) {
                    self.nodes()
                        .set_status(url, SyncStatus::Error, Some(&e.message))
                        .await?;
                    self.state.emit(url, SyncStatus::Error);
                }
                Err(DbError::Protocol(e))
            }
            Ok(()) => {
                if let Some(message) = self.state.failure(url, session) {
                    return Err(DbError::Protocol(ProtocolError::new(message)));
                }
                if self.state.is_ended(url) {
                    // Disconnected or deleted while the handshake ran.
                    debug!(url = %url, session, "Session ended during handshake, stopping adapter");
                    if let Err(e) = registration.sync.disconnect(url).await {
                        warn!(url = %url, error = %e, "Failed to stop adapter for ended session");
                    }
                    return Ok(());
                }
                if !self.state.is_current(url, session) {
                    debug!(url = %url, session, "Session superseded during handshake");
                    return Ok(());
                }
                self.nodes().set_status(url, SyncStatus::Online, None).await?;
                self.state.emit(url, SyncStatus::Online);
                Ok(())
            }
        }
    }

    /// Stops syncing with `url`. Unknown urls are a no-op.
    ///
    /// The node goes `Offline` unless it is in `Error`, which stays visible.
    pub async fn disconnect(&self, url: &str) -> DbResult<()> {
        let session = self.state.end_session(url);
        let Some(node) = self.nodes().get(url).await? else {
            return Ok(());
        };

        let protocol = session.map(|s| s.protocol).unwrap_or(node.protocol);
        match self.state.registration(&protocol) {
            Some(registration) => registration.sync.disconnect(url).await?,
            None => debug!(url = %url, protocol = %protocol, "No adapter to disconnect"),
        }

        if !node.status.is_error() && node.status != SyncStatus::Offline {
            self.nodes().set_status(url, SyncStatus::Offline, None).await?;
            self.state.emit(url, SyncStatus::Offline);
        }
        Ok(())
    }

    /// Forgets `url`: stops the adapter, asks it to drop remote state and
    /// removes the persisted node. Unknown urls are a no-op.
    pub async fn delete(&self, url: &str) -> DbResult<()> {
        let session = self.state.end_session(url);
        let Some(node) = self.nodes().get(url).await? else {
            return Ok(());
        };

        let protocol = session.map(|s| s.protocol).unwrap_or(node.protocol);
        match self.state.registration(&protocol) {
            Some(registration) => registration.sync.delete(url).await?,
            None => debug!(url = %url, protocol = %protocol, "No adapter to delete"),
        }

        self.nodes().delete(url).await?;
        info!(url = %url, "Sync node deleted");
        Ok(())
    }

    /// Persisted status of `url`, if the store knows it.
    pub async fn status(&self, url: &str) -> DbResult<Option<SyncStatus>> {
        Ok(self.nodes().get(url).await?.map(|node| node.status))
    }

    /// Every endpoint the store knows, including ones from earlier runs.
    pub async fn list(&self) -> DbResult<Vec<SyncNode>> {
        self.nodes().list().await
    }
}

impl fmt::Debug for Syncable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Syncable")
            .field("protocols", &self.protocol_names())
            .finish_non_exhaustive()
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
