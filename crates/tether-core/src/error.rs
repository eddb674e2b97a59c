//! # Error Types
//!
//! Domain-specific error types for tether-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  tether-core errors (this file)                                        │
//! │  ├── CoreError        - Status codes, option values                    │
//! │  └── ValidationError  - Endpoint / name validation failures            │
//! │                                                                         │
//! │  tether-db errors (separate crate)                                     │
//! │  └── DbError          - Storage and protocol facade failures           │
//! │                                                                         │
//! │  tether-sync errors (separate crate)                                   │
//! │  └── SyncError        - What application code sees                     │
//! │                                                                         │
//! │  Flow: ValidationError → CoreError → DbError → SyncError → App         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use thiserror::Error;

// =============================================================================
// Core Error
// =============================================================================

/// Core domain errors.
#[derive(Debug, Clone, Error)]
pub enum CoreError {
    /// A persisted status code does not map to any known status.
    ///
    /// ## When This Occurs
    /// - A sync node row was written by a newer version of the library
    /// - Manual edits to the local store
    #[error("Unknown sync status code: {0}")]
    UnknownStatusCode(i64),

    /// An option value has the wrong shape.
    #[error("Invalid option '{key}': {reason}")]
    InvalidOption { key: String, reason: String },

    /// Validation error (wraps ValidationError).
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// A required field is missing or empty.
    #[error("{field} is required")]
    Required { field: String },

    /// Field value is too long.
    #[error("{field} must be at most {max} characters")]
    TooLong { field: String, max: usize },

    /// Invalid format.
    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },
}

// =============================================================================
// Result Type Alias
// =============================================================================

/// Convenience type alias for Results with CoreError.
pub type CoreResult<T> = Result<T, CoreError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = CoreError::UnknownStatusCode(42);
        assert_eq!(err.to_string(), "Unknown sync status code: 42");

        let err = ValidationError::TooLong {
            field: "endpoint".to_string(),
            max: 2048,
        };
        assert_eq!(err.to_string(), "endpoint must be at most 2048 characters");
    }

    #[test]
    fn test_validation_converts_to_core_error() {
        let validation_err = ValidationError::Required {
            field: "endpoint".to_string(),
        };
        let core_err: CoreError = validation_err.into();
        assert!(matches!(core_err, CoreError::Validation(_)));
    }
}
