//! # Database Error Types
//!
//! Error types for the local database facade.
//!
//! ## Error Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Error Propagation                                    │
//! │                                                                         │
//! │  SQLite Error (sqlx::Error)        Adapter Error (ProtocolError)       │
//! │       │                                  │                              │
//! │       ▼                                  ▼                              │
//! │  DbError (this module) ← Adds context and categorization               │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  SyncError (tether-sync) ← What application code sees                  │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use thiserror::Error;

use crate::protocol::ProtocolError;

/// Database facade errors.
#[derive(Debug, Error)]
pub enum DbError {
    /// Record not found.
    #[error("{entity} not found: {id}")]
    NotFound { entity: String, id: String },

    /// Unique constraint violation.
    #[error("Duplicate {field}: '{value}' already exists")]
    UniqueViolation { field: String, value: String },

    /// Database connection failed.
    ///
    /// ## When This Occurs
    /// - Database file can't be created
    /// - File permissions issue
    /// - Disk full
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    /// Applying a schema version failed.
    ///
    /// ## When This Occurs
    /// - Duplicate version numbers
    /// - Invalid store names
    /// - Upgrade statement failed
    #[error("Schema upgrade failed: {0}")]
    SchemaFailed(String),

    /// The store was not declared by any schema version.
    #[error("Unknown store: {0}")]
    UnknownStore(String),

    /// An addon failed to install.
    #[error("Addon '{name}' failed: {reason}")]
    AddonFailed { name: String, reason: String },

    /// No adapter is registered under this protocol name.
    #[error("Sync protocol not registered: {0}")]
    ProtocolNotRegistered(String),

    /// The protocol adapter reported a failure.
    #[error("Protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    /// Query execution failed.
    #[error("Query failed: {0}")]
    QueryFailed(String),

    /// Document or option (de)serialization failed.
    #[error("Serialization failed: {0}")]
    Serialization(String),

    /// Pool exhausted (all connections in use).
    #[error("Connection pool exhausted")]
    PoolExhausted,

    /// Domain error from tether-core.
    #[error(transparent)]
    Core(#[from] tether_core::CoreError),

    /// Internal database error.
    #[error("Internal database error: {0}")]
    Internal(String),
}

impl DbError {
    /// Creates a NotFound error for a given entity type and ID.
    pub fn not_found(entity: impl Into<String>, id: impl Into<String>) -> Self {
        DbError::NotFound {
            entity: entity.into(),
            id: id.into(),
        }
    }
}

/// Convert sqlx errors to DbError.
///
/// ## Error Mapping
/// ```text
/// sqlx::Error::RowNotFound    → DbError::NotFound
/// sqlx::Error::Database       → Analyze message for constraint type
/// sqlx::Error::PoolTimedOut   → DbError::PoolExhausted
/// Other                       → DbError::Internal
/// ```
impl From<sqlx::Error> for DbError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => DbError::NotFound {
                entity: "Record".to_string(),
                id: "unknown".to_string(),
            },

            sqlx::Error::Database(db_err) => {
                let msg = db_err.message();

                // "UNIQUE constraint failed: <table>.<column>"
                if msg.contains("UNIQUE constraint failed") {
                    let field = msg
                        .split("UNIQUE constraint failed: ")
                        .nth(1)
                        .unwrap_or("unknown")
                        .to_string();
                    DbError::UniqueViolation {
                        field,
                        value: "unknown".to_string(),
                    }
                } else {
                    DbError::QueryFailed(msg.to_string())
                }
            }

            sqlx::Error::PoolTimedOut => DbError::PoolExhausted,

            sqlx::Error::PoolClosed => DbError::ConnectionFailed("Pool is closed".to_string()),

            _ => DbError::Internal(err.to_string()),
        }
    }
}

impl From<serde_json::Error> for DbError {
    fn from(err: serde_json::Error) -> Self {
        DbError::Serialization(err.to_string())
    }
}

impl From<tether_core::ValidationError> for DbError {
    fn from(err: tether_core::ValidationError) -> Self {
        DbError::Core(err.into())
    }
}

/// Result type for database operations.
pub type DbResult<T> = Result<T, DbError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = DbError::not_found("SyncNode", "https://sync.example/db1");
        assert_eq!(err.to_string(), "SyncNode not found: https://sync.example/db1");

        let err = DbError::ProtocolNotRegistered("tether".into());
        assert_eq!(err.to_string(), "Sync protocol not registered: tether");
    }

    #[test]
    fn test_protocol_error_converts() {
        let err: DbError = ProtocolError::new("handshake rejected").into();
        assert!(matches!(err, DbError::Protocol(_)));
        assert!(err.to_string().contains("handshake rejected"));
    }
}
