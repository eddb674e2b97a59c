//! # Sync Error Types
//!
//! Error types for connection management.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                       Sync Error Categories                             │
//! │                                                                         │
//! │  ┌─────────────────┐  ┌─────────────────┐  ┌─────────────────────────┐ │
//! │  │   Connection    │  │  Configuration  │  │       Storage           │ │
//! │  │                 │  │                 │  │                         │ │
//! │  │  NotOnline      │  │  InvalidConfig  │  │  Database               │ │
//! │  │  ConnectFailure │  │  ConfigLoad     │  │                         │ │
//! │  │  AsyncProtocol  │  │  ConfigSave     │  │                         │ │
//! │  │  UnknownEndpoint│  │  InvalidEndpoint│  │                         │ │
//! │  └─────────────────┘  └─────────────────┘  └─────────────────────────┘ │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use thiserror::Error;

/// Result type alias for sync operations.
pub type SyncResult<T> = Result<T, SyncError>;

/// Errors surfaced by the connection manager.
///
/// `Clone` so that one connect outcome can be handed to every caller that
/// joined the same in-flight attempt.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SyncError {
    // =========================================================================
    // Connection Errors
    // =========================================================================
    /// The oracle reports the endpoint unreachable.
    #[error("Endpoint is not online: {0}")]
    NotOnline(String),

    /// The protocol adapter rejected the connect attempt.
    #[error("Failed to connect to {url}: {reason}")]
    ConnectFailure { url: String, reason: String },

    /// The adapter reported an error after the connection was established.
    #[error("Protocol error on {url}: {reason}")]
    AsyncProtocolError { url: String, reason: String },

    /// Status queried for an endpoint the store does not know.
    #[error("Unknown endpoint: {0}")]
    UnknownEndpoint(String),

    /// The endpoint locator failed validation.
    #[error("Invalid endpoint: {0}")]
    InvalidEndpoint(String),

    // =========================================================================
    // Configuration Errors
    // =========================================================================
    /// Invalid configuration.
    #[error("Invalid sync configuration: {0}")]
    InvalidConfig(String),

    /// Failed to load config file.
    #[error("Failed to load config: {0}")]
    ConfigLoadFailed(String),

    /// Failed to save config file.
    #[error("Failed to save config: {0}")]
    ConfigSaveFailed(String),

    // =========================================================================
    // Storage Errors
    // =========================================================================
    /// Local database failure.
    #[error("Database error: {0}")]
    Database(String),
}

// =============================================================================
// Error Conversions
// =============================================================================

impl From<tether_db::DbError> for SyncError {
    fn from(err: tether_db::DbError) -> Self {
        SyncError::Database(err.to_string())
    }
}

impl From<tether_core::ValidationError> for SyncError {
    fn from(err: tether_core::ValidationError) -> Self {
        SyncError::InvalidEndpoint(err.to_string())
    }
}

impl From<std::io::Error> for SyncError {
    fn from(err: std::io::Error) -> Self {
        SyncError::ConfigLoadFailed(err.to_string())
    }
}

impl From<toml::de::Error> for SyncError {
    fn from(err: toml::de::Error) -> Self {
        SyncError::ConfigLoadFailed(err.to_string())
    }
}

impl From<toml::ser::Error> for SyncError {
    fn from(err: toml::ser::Error) -> Self {
        SyncError::ConfigSaveFailed(err.to_string())
    }
}

// =============================================================================
// Error Categorization
// =============================================================================

impl SyncError {
    /// Returns true if calling `connect` again may succeed.
    ///
    /// The manager never retries by itself; reconnects only happen through
    /// reachability changes on tracked endpoints.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            SyncError::NotOnline(_)
                | SyncError::ConnectFailure { .. }
                | SyncError::AsyncProtocolError { .. }
        )
    }

    /// Returns true if this error indicates a configuration problem.
    pub fn is_config_error(&self) -> bool {
        matches!(
            self,
            SyncError::InvalidConfig(_)
                | SyncError::InvalidEndpoint(_)
                | SyncError::ConfigLoadFailed(_)
                | SyncError::ConfigSaveFailed(_)
        )
    }

    /// The endpoint the error is about, if any.
    pub fn endpoint(&self) -> Option<&str> {
        match self {
            SyncError::NotOnline(url) | SyncError::UnknownEndpoint(url) => Some(url),
            SyncError::ConnectFailure { url, .. } | SyncError::AsyncProtocolError { url, .. } => {
                Some(url)
            }
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retryable_errors() {
        assert!(SyncError::NotOnline("https://a.example".into()).is_retryable());
        assert!(SyncError::ConnectFailure {
            url: "https://a.example".into(),
            reason: "refused".into()
        }
        .is_retryable());

        assert!(!SyncError::UnknownEndpoint("https://a.example".into()).is_retryable());
        assert!(!SyncError::InvalidConfig("bad".into()).is_retryable());
    }

    #[test]
    fn test_config_errors() {
        assert!(SyncError::InvalidEndpoint("empty".into()).is_config_error());
        assert!(SyncError::ConfigSaveFailed("disk".into()).is_config_error());
        assert!(!SyncError::Database("locked".into()).is_config_error());
    }

    #[test]
    fn test_error_display() {
        let err = SyncError::AsyncProtocolError {
            url: "https://sync.example/db1".into(),
            reason: "connection reset".into(),
        };
        assert!(err.to_string().contains("sync.example/db1"));
        assert!(err.to_string().contains("connection reset"));
        assert_eq!(err.endpoint(), Some("https://sync.example/db1"));
    }

    #[test]
    fn test_db_error_conversion() {
        let err: SyncError = tether_db::DbError::PoolExhausted.into();
        assert!(matches!(err, SyncError::Database(_)));
    }
}
