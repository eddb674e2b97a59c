//! # tether-sync: Connection Manager for Tether
//!
//! This crate keeps one local store connected to any number of remote
//! endpoints. It decides when each endpoint is connected, torn down or
//! reconnected, and routes the store's status events to application
//! listeners.
//!
//! ## Architecture Overview
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                     Connection Manager Architecture                     │
//! │                                                                         │
//! │  ┌──────────────────────────────────────────────────────────────────┐  │
//! │  │                 ConnectionManager (orchestrator)                 │  │
//! │  │                                                                  │  │
//! │  │  connect / disconnect / remove_endpoint                          │  │
//! │  │  tracked set, in-flight joins, one watcher task per endpoint     │  │
//! │  └───────┬──────────────────────┬───────────────────────┬──────────┘  │
//! │          ▼                      ▼                       ▼              │
//! │  ┌────────────────┐   ┌──────────────────┐   ┌────────────────────┐   │
//! │  │ Connectivity   │   │ tether-db        │   │ StatusRegistry     │   │
//! │  │ Oracle         │   │ Syncable facade  │   │                    │   │
//! │  │                │   │                  │   │ last status and    │   │
//! │  │ is_online(url) │   │ SyncProtocol     │──►│ one listener per   │   │
//! │  │ watch(url)     │   │ adapter          │   │ endpoint           │   │
//! │  └────────────────┘   └──────────────────┘   └────────────────────┘   │
//! │                          statusChanged(status, url)                    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//! - [`manager`] - `ConnectionManager` and the per-endpoint lifecycle
//! - [`connectivity`] - Reachability oracle trait and a manual oracle
//! - [`registry`] - Status and listener bookkeeping
//! - [`config`] - TOML + environment configuration
//! - [`error`] - Sync error types
//!
//! ## Usage
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use tether_db::Database;
//! use tether_sync::{ConnectionManager, ManualConnectivity, TetherConfig};
//!
//! let config = TetherConfig::load_or_default(None);
//! let db = Database::new(config.to_db_config()).await?;
//!
//! let manager = ConnectionManager::new(
//!     db,
//!     adapter,
//!     Arc::new(ManualConnectivity::default()),
//!     &config.sync,
//! );
//!
//! manager.set_status_listener("https://sync.example/db1", |status| {
//!     println!("db1: {status}");
//! });
//! manager.connect("https://sync.example/db1", None).await?;
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod config;
pub mod connectivity;
pub mod error;
pub mod manager;
pub mod registry;

// =============================================================================
// Re-exports
// =============================================================================

pub use config::{DatabaseSettings, SyncSettings, TetherConfig};
pub use connectivity::{ConnectivityOracle, ManualConnectivity};
pub use error::{SyncError, SyncResult};
pub use manager::ConnectionManager;
pub use registry::{StatusListener, StatusRegistry};
