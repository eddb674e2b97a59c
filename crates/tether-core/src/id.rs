//! # Record Identifiers
//!
//! Stateless, process-wide generator for record identifiers.
//!
//! Application code mints an id before inserting a record so that two devices
//! writing offline never collide. The connection manager itself never calls
//! this; document tables use it when a record arrives without a primary key.

use uuid::Uuid;

/// Returns a new random identifier (UUID v4, hyphenated, lowercase).
///
/// ## Example
/// ```rust
/// use tether_core::id::{is_valid_id, new_id};
///
/// let id = new_id();
/// assert!(is_valid_id(&id));
/// ```
pub fn new_id() -> String {
    Uuid::new_v4().to_string()
}

/// Returns true if `id` is a well-formed identifier.
pub fn is_valid_id(id: &str) -> bool {
    Uuid::parse_str(id).is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_ids_are_unique() {
        let ids: HashSet<String> = (0..1000).map(|_| new_id()).collect();
        assert_eq!(ids.len(), 1000);
    }

    #[test]
    fn test_id_format() {
        let id = new_id();
        assert_eq!(id.len(), 36);
        assert!(is_valid_id(&id));
        assert!(!is_valid_id("not-an-id"));
    }
}
