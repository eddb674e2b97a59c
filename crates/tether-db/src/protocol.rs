//! # Sync Protocol Adapters
//!
//! The seam through which a wire-level sync protocol plugs into the store.
//!
//! ## Adapter Lifecycle
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Adapter Lifecycle (per endpoint)                     │
//! │                                                                         │
//! │  Syncable::connect(protocol, url, options)                             │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  SyncProtocol::connect(SyncContext) ── handshake ──► Ok / Err          │
//! │       │                                                                 │
//! │       │  adapter keeps polling every options.poll_interval             │
//! │       │  and reports through ctx.reporter:                             │
//! │       │     report(Syncing) / report(Online) / report_error(msg)       │
//! │       ▼                                                                 │
//! │  SyncProtocol::disconnect(url) ← stop polling, keep local state        │
//! │  SyncProtocol::delete(url)     ← stop and forget the relationship      │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use thiserror::Error;
use tokio::sync::watch;
use tracing::debug;

use tether_core::{ConnectOptions, SyncStatus};

use crate::syncable::StatusReporter;

// =============================================================================
// Protocol Error
// =============================================================================

/// Error returned by a protocol adapter.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct ProtocolError {
    /// Human-readable reason.
    pub message: String,

    /// Whether the adapter expects a later attempt to succeed.
    pub retryable: bool,
}

impl ProtocolError {
    /// Creates a non-retryable protocol error.
    pub fn new(message: impl Into<String>) -> Self {
        ProtocolError {
            message: message.into(),
            retryable: false,
        }
    }

    /// Creates a retryable protocol error.
    pub fn retryable(message: impl Into<String>) -> Self {
        ProtocolError {
            message: message.into(),
            retryable: true,
        }
    }
}

/// Result type for adapter operations.
pub type ProtocolResult<T> = Result<T, ProtocolError>;

// =============================================================================
// Adapter Trait
// =============================================================================

/// Everything an adapter receives when asked to connect one endpoint.
#[derive(Clone)]
pub struct SyncContext {
    /// Endpoint locator.
    pub url: String,

    /// Merged connection options.
    pub options: ConnectOptions,

    /// Tuning value forwarded from the protocol registration.
    pub partials_threshold: Option<u32>,

    /// Channel for asynchronous status and error reports.
    pub reporter: StatusReporter,
}

impl fmt::Debug for SyncContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SyncContext")
            .field("url", &self.url)
            .field("options", &self.options)
            .field("partials_threshold", &self.partials_threshold)
            .finish_non_exhaustive()
    }
}

/// A wire-level synchronization protocol.
///
/// `connect` resolves once the handshake is done; the adapter then keeps the
/// exchange alive on its own and reports through [`SyncContext::reporter`]
/// until `disconnect` or `delete` is called for the same url.
#[async_trait]
pub trait SyncProtocol: Send + Sync {
    /// Performs the handshake and starts continuous exchange.
    async fn connect(&self, ctx: SyncContext) -> ProtocolResult<()>;

    /// Stops exchanging changes with the endpoint.
    async fn disconnect(&self, url: &str) -> ProtocolResult<()>;

    /// Stops and forgets the sync relationship with the endpoint.
    async fn delete(&self, url: &str) -> ProtocolResult<()>;
}

/// An adapter registered under a protocol name.
#[derive(Clone)]
pub struct ProtocolRegistration {
    /// The adapter.
    pub sync: Arc<dyn SyncProtocol>,

    /// Optional tuning value handed to the adapter on every connect.
    pub partials_threshold: Option<u32>,
}

impl ProtocolRegistration {
    /// Registers `sync` without a tuning value.
    pub fn new(sync: Arc<dyn SyncProtocol>) -> Self {
        ProtocolRegistration {
            sync,
            partials_threshold: None,
        }
    }

    /// Sets the partials threshold.
    pub fn partials_threshold(mut self, threshold: Option<u32>) -> Self {
        self.partials_threshold = threshold;
        self
    }
}

impl fmt::Debug for ProtocolRegistration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProtocolRegistration")
            .field("partials_threshold", &self.partials_threshold)
            .finish_non_exhaustive()
    }
}

// =============================================================================
// Mock Adapter
// =============================================================================

/// In-process adapter for tests.
///
/// ## Controls
/// ```text
/// set_connect_error(Some(msg))   → next connects return Err(msg)
/// set_handshake_error(Some(msg)) → connects report msg, then return Ok
/// hold() / release()             → keep connects pending until released
/// report(url, status)            → simulate a progress report
/// report_error(url, msg)         → simulate a mid-poll failure
/// ```
pub struct MockProtocol {
    connect_calls: AtomicUsize,
    disconnect_calls: AtomicUsize,
    delete_calls: AtomicUsize,
    connect_error: Mutex<Option<String>>,
    handshake_error: Mutex<Option<String>>,
    gate: watch::Sender<bool>,
    reporters: Mutex<HashMap<String, StatusReporter>>,
    last_options: Mutex<HashMap<String, SyncContextSnapshot>>,
}

/// What the mock saw on the most recent connect for a url.
#[derive(Debug, Clone, PartialEq)]
pub struct SyncContextSnapshot {
    pub options: ConnectOptions,
    pub partials_threshold: Option<u32>,
}

impl MockProtocol {
    pub fn new() -> Self {
        let (gate, _) = watch::channel(true);
        MockProtocol {
            connect_calls: AtomicUsize::new(0),
            disconnect_calls: AtomicUsize::new(0),
            delete_calls: AtomicUsize::new(0),
            connect_error: Mutex::new(None),
            handshake_error: Mutex::new(None),
            gate,
            reporters: Mutex::new(HashMap::new()),
            last_options: Mutex::new(HashMap::new()),
        }
    }

    pub fn connect_calls(&self) -> usize {
        self.connect_calls.load(Ordering::SeqCst)
    }

    pub fn disconnect_calls(&self) -> usize {
        self.disconnect_calls.load(Ordering::SeqCst)
    }

    pub fn delete_calls(&self) -> usize {
        self.delete_calls.load(Ordering::SeqCst)
    }

    /// Makes subsequent connects fail with `message` (or succeed with `None`).
    pub fn set_connect_error(&self, message: Option<&str>) {
        *self.connect_error.lock() = message.map(str::to_string);
    }

    /// Makes subsequent connects report an error before returning `Ok`.
    pub fn set_handshake_error(&self, message: Option<&str>) {
        *self.handshake_error.lock() = message.map(str::to_string);
    }

    /// Keeps subsequent connects pending until [`release`](Self::release).
    pub fn hold(&self) {
        self.gate.send_replace(false);
    }

    /// Lets pending connects proceed.
    pub fn release(&self) {
        self.gate.send_replace(true);
    }

    /// Options and tuning the last connect for `url` received.
    pub fn last_context(&self, url: &str) -> Option<SyncContextSnapshot> {
        self.last_options.lock().get(url).cloned()
    }

    /// Reports a status for `url` as if the adapter's poll loop did.
    ///
    /// Returns false if no connect has reached the adapter for `url`.
    pub async fn report(&self, url: &str, status: SyncStatus) -> bool {
        let reporter = self.reporters.lock().get(url).cloned();
        match reporter {
            Some(reporter) => {
                reporter.report(status).await;
                true
            }
            None => false,
        }
    }

    /// Reports an asynchronous failure for `url`.
    pub async fn report_error(&self, url: &str, message: &str) -> bool {
        let reporter = self.reporters.lock().get(url).cloned();
        match reporter {
            Some(reporter) => {
                reporter.report_error(message).await;
                true
            }
            None => false,
        }
    }
}

impl Default for MockProtocol {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SyncProtocol for MockProtocol {
    async fn connect(&self, ctx: SyncContext) -> ProtocolResult<()> {
        self.connect_calls.fetch_add(1, Ordering::SeqCst);
        debug!(url = %ctx.url, "Mock connect");

        let mut gate = self.gate.subscribe();
        if gate.wait_for(|open| *open).await.is_err() {
            return Err(ProtocolError::new("mock adapter dropped"));
        }

        self.last_options.lock().insert(
            ctx.url.clone(),
            SyncContextSnapshot {
                options: ctx.options.clone(),
                partials_threshold: ctx.partials_threshold,
            },
        );
        self.reporters
            .lock()
            .insert(ctx.url.clone(), ctx.reporter.clone());

        let handshake_error = self.handshake_error.lock().clone();
        if let Some(message) = handshake_error {
            ctx.reporter.report_error(&message).await;
            return Ok(());
        }

        let connect_error = self.connect_error.lock().clone();
        match connect_error {
            Some(message) => Err(ProtocolError::new(message)),
            None => Ok(()),
        }
    }

    async fn disconnect(&self, url: &str) -> ProtocolResult<()> {
        self.disconnect_calls.fetch_add(1, Ordering::SeqCst);
        debug!(url = %url, "Mock disconnect");
        Ok(())
    }

    async fn delete(&self, url: &str) -> ProtocolResult<()> {
        self.delete_calls.fetch_add(1, Ordering::SeqCst);
        self.reporters.lock().remove(url);
        self.last_options.lock().remove(url);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_protocol_error_kinds() {
        let err = ProtocolError::new("rejected");
        assert!(!err.retryable);
        assert_eq!(err.to_string(), "rejected");

        assert!(ProtocolError::retryable("timeout").retryable);
    }

    #[test]
    fn test_registration_builder() {
        let registration =
            ProtocolRegistration::new(Arc::new(MockProtocol::new())).partials_threshold(Some(500));
        assert_eq!(registration.partials_threshold, Some(500));
    }

    #[tokio::test]
    async fn test_mock_counts_calls() {
        let mock = MockProtocol::new();
        mock.disconnect("memory://a").await.unwrap();
        mock.delete("memory://a").await.unwrap();

        assert_eq!(mock.connect_calls(), 0);
        assert_eq!(mock.disconnect_calls(), 1);
        assert_eq!(mock.delete_calls(), 1);
        assert!(!mock.report_error("memory://a", "boom").await);
    }
}
