//! # Addons
//!
//! Extensions installed into a database after its schema is up to date.
//!
//! Addons run in the order they were added to [`DbConfig`](crate::DbConfig),
//! once per open. A failing addon fails the open.

use async_trait::async_trait;

use crate::error::DbResult;
use crate::pool::Database;

/// An extension installed when the database opens.
///
/// ## Example
/// ```rust,ignore
/// struct AuditLog;
///
/// #[async_trait]
/// impl Addon for AuditLog {
///     fn name(&self) -> &str { "audit-log" }
///
///     async fn install(&self, db: &Database) -> DbResult<()> {
///         sqlx::query("CREATE TABLE IF NOT EXISTS audit (entry TEXT)")
///             .execute(db.pool())
///             .await?;
///         Ok(())
///     }
/// }
/// ```
#[async_trait]
pub trait Addon: Send + Sync {
    /// Name used in logs and errors.
    fn name(&self) -> &str;

    /// Installs the addon.
    async fn install(&self, db: &Database) -> DbResult<()>;
}
