//! # tether-db: Local Database Facade for Tether
//!
//! The embedded store a sync connection manager works against. SQLite
//! via sqlx holds both the application's documents and the persisted
//! metadata of every endpoint the store syncs with.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Tether Data Flow                                 │
//! │                                                                         │
//! │  ConnectionManager (tether-sync)                                       │
//! │       │  connect / disconnect / delete          ▲ statusChanged        │
//! │       ▼                                         │ (status, url)        │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                     tether-db (THIS CRATE)                      │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────────┐    ┌───────────────┐    ┌──────────────┐  │   │
//! │  │   │   Database    │    │   Syncable    │    │   Schema     │  │   │
//! │  │   │   (pool.rs)   │    │ (syncable.rs) │    │ (schema.rs)  │  │   │
//! │  │   │               │    │               │    │              │  │   │
//! │  │   │ SqlitePool    │◄───│ protocols     │    │ versions     │  │   │
//! │  │   │ Tables        │    │ sessions      │    │ addons       │  │   │
//! │  │   │ SyncNodes     │    │ emitters      │    │              │  │   │
//! │  │   └───────────────┘    └───────┬───────┘    └──────────────┘  │   │
//! │  │                                │                                │   │
//! │  └────────────────────────────────┼────────────────────────────────┘   │
//! │                                   ▼                                     │
//! │                        SyncProtocol adapter (pluggable)                │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//!
//! - [`pool`] - Opening the store and its configuration
//! - [`schema`] - Versioned store declarations
//! - [`addon`] - Extensions installed on open
//! - [`repository`] - Document tables and sync-node metadata
//! - [`protocol`] - Adapter trait and a mock adapter
//! - [`syncable`] - Protocol registration, sessions and status events
//! - [`error`] - Database error types
//!
//! ## Usage
//!
//! ```rust,ignore
//! use tether_db::{Database, DbConfig, ProtocolRegistration, SchemaVersion, StoreSchema};
//!
//! let config = DbConfig::new("notes.db")
//!     .name("notes")
//!     .version(SchemaVersion::new(1).store(StoreSchema::new("friends")));
//! let db = Database::new(config).await?;
//!
//! db.syncable().register_protocol("tether", ProtocolRegistration::new(adapter));
//! db.table("friends")?.put(&json!({ "name": "Ada" })).await?;
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod addon;
pub mod error;
pub mod pool;
pub mod protocol;
pub mod repository;
pub mod schema;
pub mod syncable;

// =============================================================================
// Re-exports
// =============================================================================

pub use addon::Addon;
pub use error::{DbError, DbResult};
pub use pool::{Database, DbConfig};
pub use protocol::{
    MockProtocol, ProtocolError, ProtocolRegistration, ProtocolResult, SyncContext, SyncProtocol,
};
pub use schema::{SchemaVersion, StoreSchema};
pub use syncable::{StatusReporter, SyncEventEmitter, Syncable};

// Repository re-exports for convenience
pub use repository::sync_nodes::{SyncNode, SyncNodeRepository};
pub use repository::table::Table;
