//! # tether-core: Pure Types for Tether
//!
//! This crate holds the vocabulary shared by the local database facade
//! (`tether-db`) and the connection manager (`tether-sync`). Everything here
//! is a pure function or a plain data type.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Tether Architecture                              │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                    Application Code                             │   │
//! │  │    connect(url) ──► set_status_listener(url) ──► list_statuses │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │              tether-sync (Connection Manager)                   │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │              tether-db (Local Database Facade)                  │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │               ★ tether-core (THIS CRATE) ★                      │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────┐  ┌───────────┐  ┌───────────┐  ┌───────────┐  │   │
//! │  │   │   types   │  │    id     │  │ validation│  │   error   │  │   │
//! │  │   │SyncStatus │  │  new_id   │  │ endpoints │  │ CoreError │  │   │
//! │  │   │ Options   │  │           │  │ store name│  │           │  │   │
//! │  │   └───────────┘  └───────────┘  └───────────┘  └───────────┘  │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO DATABASE • NO NETWORK • PURE FUNCTIONS           │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - `SyncStatus`, `ConnectOptions`, `CredentialsPolicy`, `EndpointStatus`
//! - [`id`] - Collision-resistant record identifiers
//! - [`validation`] - Endpoint and store-name rules
//! - [`error`] - Domain error types
//!
//! ## Example Usage
//!
//! ```rust
//! use tether_core::{ConnectOptions, SyncStatus};
//!
//! let options = ConnectOptions::default();
//! assert_eq!(options.poll_interval_ms, 10_000);
//!
//! assert_eq!(SyncStatus::Online.to_string(), "Connected");
//! assert_eq!(SyncStatus::from_code(-1).unwrap(), SyncStatus::Error);
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod id;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use error::{CoreError, CoreResult, ValidationError};
pub use id::new_id;
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Default polling interval handed to protocol adapters, in milliseconds.
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 10_000;

/// Maximum accepted length of an endpoint locator.
pub const MAX_ENDPOINT_LEN: usize = 2048;

/// Maximum accepted length of a store (table) name.
pub const MAX_STORE_NAME_LEN: usize = 64;
