//! # Validation Module
//!
//! Input validation for endpoint locators and local names.
//!
//! ## Validation Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Validation Layers                                  │
//! │                                                                         │
//! │  Layer 1: Connection Manager                                           │
//! │  └── validate_endpoint() before any collaborator is touched            │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 2: Database Facade                                              │
//! │  ├── validate_database_name() on open                                  │
//! │  └── validate_store_name() for every declared store                    │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 3: SQLite                                                       │
//! │  └── PRIMARY KEY / NOT NULL constraints                                │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use tether_core::validation::{validate_endpoint, validate_store_name};
//!
//! validate_endpoint("https://sync.example/db1").unwrap();
//! validate_store_name("friends").unwrap();
//! ```

use crate::error::ValidationError;
use crate::{MAX_ENDPOINT_LEN, MAX_STORE_NAME_LEN};

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

/// Maximum accepted length of a database name.
const MAX_DATABASE_NAME_LEN: usize = 128;

// =============================================================================
// Endpoint Validators
// =============================================================================

/// Validates an endpoint locator.
///
/// ## Rules
/// - Must not be empty
/// - At most 2048 characters
/// - No whitespace
/// - Must contain a `scheme://` separator with a non-empty scheme
pub fn validate_endpoint(url: &str) -> ValidationResult<()> {
    if url.is_empty() {
        return Err(ValidationError::Required {
            field: "endpoint".to_string(),
        });
    }

    if url.len() > MAX_ENDPOINT_LEN {
        return Err(ValidationError::TooLong {
            field: "endpoint".to_string(),
            max: MAX_ENDPOINT_LEN,
        });
    }

    if url.chars().any(char::is_whitespace) {
        return Err(ValidationError::InvalidFormat {
            field: "endpoint".to_string(),
            reason: "must not contain whitespace".to_string(),
        });
    }

    match url.split_once("://") {
        Some((scheme, rest)) if !scheme.is_empty() && !rest.is_empty() => Ok(()),
        _ => Err(ValidationError::InvalidFormat {
            field: "endpoint".to_string(),
            reason: format!("expected scheme://location, got '{}'", url),
        }),
    }
}

// =============================================================================
// Name Validators
// =============================================================================

/// Validates a store (table) name.
///
/// ## Rules
/// - 1 to 64 characters
/// - ASCII letters, digits and underscores only
/// - Must not start with a digit or `_` (reserved for internal tables)
pub fn validate_store_name(name: &str) -> ValidationResult<()> {
    if name.is_empty() {
        return Err(ValidationError::Required {
            field: "store name".to_string(),
        });
    }

    if name.len() > MAX_STORE_NAME_LEN {
        return Err(ValidationError::TooLong {
            field: "store name".to_string(),
            max: MAX_STORE_NAME_LEN,
        });
    }

    if !name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
        return Err(ValidationError::InvalidFormat {
            field: "store name".to_string(),
            reason: "only letters, digits and underscores allowed".to_string(),
        });
    }

    if name.starts_with('_') || name.starts_with(|c: char| c.is_ascii_digit()) {
        return Err(ValidationError::InvalidFormat {
            field: "store name".to_string(),
            reason: "must start with a letter".to_string(),
        });
    }

    Ok(())
}

/// Validates a database name.
pub fn validate_database_name(name: &str) -> ValidationResult<()> {
    if name.trim().is_empty() {
        return Err(ValidationError::Required {
            field: "database name".to_string(),
        });
    }

    if name.len() > MAX_DATABASE_NAME_LEN {
        return Err(ValidationError::TooLong {
            field: "database name".to_string(),
            max: MAX_DATABASE_NAME_LEN,
        });
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_endpoints() {
        assert!(validate_endpoint("https://sync.example/db1").is_ok());
        assert!(validate_endpoint("wss://10.0.0.2:8080/sync").is_ok());
        assert!(validate_endpoint("memory://local").is_ok());
    }

    #[test]
    fn test_invalid_endpoints() {
        assert!(matches!(
            validate_endpoint(""),
            Err(ValidationError::Required { .. })
        ));
        assert!(validate_endpoint("sync.example/db1").is_err());
        assert!(validate_endpoint("://missing-scheme").is_err());
        assert!(validate_endpoint("https://").is_err());
        assert!(validate_endpoint("https://sync example").is_err());

        let long = format!("https://{}", "a".repeat(MAX_ENDPOINT_LEN));
        assert!(matches!(
            validate_endpoint(&long),
            Err(ValidationError::TooLong { .. })
        ));
    }

    #[test]
    fn test_store_names() {
        assert!(validate_store_name("friends").is_ok());
        assert!(validate_store_name("todo_items2").is_ok());

        assert!(validate_store_name("").is_err());
        assert!(validate_store_name("_sync_nodes").is_err());
        assert!(validate_store_name("2fast").is_err());
        assert!(validate_store_name("drop table").is_err());
        assert!(validate_store_name(&"a".repeat(MAX_STORE_NAME_LEN + 1)).is_err());
    }

    #[test]
    fn test_database_names() {
        assert!(validate_database_name("notes").is_ok());
        assert!(validate_database_name("   ").is_err());
    }
}
