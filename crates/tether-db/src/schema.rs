//! # Schema Versions
//!
//! Versioned store declarations applied when the database opens.
//!
//! ## How Versions Are Applied
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Schema Upgrade Process                             │
//! │                                                                         │
//! │  Database::new(config)                                                 │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  Ensure _schema_versions and _sync_nodes exist                         │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  current = MAX(version) FROM _schema_versions                          │
//! │       │                                                                 │
//! │       ├── v1 ✓ (already applied)                                       │
//! │       ├── v2 ✓ (already applied)                                       │
//! │       └── v3 ⬜ (NEW)                                                   │
//! │             │                                                           │
//! │             ▼  one transaction per version                             │
//! │       CREATE TABLE <store> (<pk> TEXT PRIMARY KEY, doc TEXT)           │
//! │       CREATE INDEX ... ON <store> (json_extract(doc, '$.<field>'))     │
//! │       run upgrade statements                                           │
//! │       INSERT INTO _schema_versions                                     │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Example
//! ```rust,ignore
//! let v1 = SchemaVersion::new(1)
//!     .store(StoreSchema::new("friends").index("name"));
//! let v2 = SchemaVersion::new(2)
//!     .store(StoreSchema::new("pets").primary_key("tag"))
//!     .upgrade("UPDATE friends SET doc = json_set(doc, '$.age', 0)");
//! ```

use std::collections::{HashMap, HashSet};

use chrono::Utc;
use sqlx::SqlitePool;
use tracing::{debug, info};

use tether_core::validation::validate_store_name;

use crate::error::{DbError, DbResult};

/// Primary key field used when a store does not name one.
pub const DEFAULT_PRIMARY_KEY: &str = "id";

// =============================================================================
// Descriptors
// =============================================================================

/// One document store (table) declared by a schema version.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreSchema {
    /// Table name.
    pub name: String,

    /// Document field holding the primary key.
    pub primary_key: String,

    /// Document fields to index.
    pub indexes: Vec<String>,
}

impl StoreSchema {
    /// Declares a store keyed by `id`.
    pub fn new(name: impl Into<String>) -> Self {
        StoreSchema {
            name: name.into(),
            primary_key: DEFAULT_PRIMARY_KEY.to_string(),
            indexes: Vec::new(),
        }
    }

    /// Sets the primary key field.
    pub fn primary_key(mut self, field: impl Into<String>) -> Self {
        self.primary_key = field.into();
        self
    }

    /// Adds an index on a document field.
    pub fn index(mut self, field: impl Into<String>) -> Self {
        self.indexes.push(field.into());
        self
    }

    fn validate(&self) -> DbResult<()> {
        validate_store_name(&self.name)
            .map_err(|e| DbError::SchemaFailed(format!("store '{}': {}", self.name, e)))?;

        for field in std::iter::once(&self.primary_key).chain(&self.indexes) {
            if !is_field_name(field) {
                return Err(DbError::SchemaFailed(format!(
                    "store '{}': invalid field name '{}'",
                    self.name, field
                )));
            }
        }
        Ok(())
    }

    fn create_table_sql(&self) -> String {
        format!(
            r#"CREATE TABLE IF NOT EXISTS "{}" ("{}" TEXT PRIMARY KEY NOT NULL, doc TEXT NOT NULL)"#,
            self.name, self.primary_key
        )
    }

    fn create_index_sql(&self, field: &str) -> String {
        format!(
            r#"CREATE INDEX IF NOT EXISTS "idx_{table}_{field}" ON "{table}" (json_extract(doc, '$.{field}'))"#,
            table = self.name,
            field = field
        )
    }
}

/// One numbered schema version.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchemaVersion {
    /// Version number, starting at 1.
    pub version: u32,

    /// Stores created (if missing) by this version.
    pub stores: Vec<StoreSchema>,

    /// SQL statements run after the stores exist.
    pub upgrade: Vec<String>,
}

impl SchemaVersion {
    pub fn new(version: u32) -> Self {
        SchemaVersion {
            version,
            stores: Vec::new(),
            upgrade: Vec::new(),
        }
    }

    /// Declares a store.
    pub fn store(mut self, store: StoreSchema) -> Self {
        self.stores.push(store);
        self
    }

    /// Adds an upgrade statement.
    pub fn upgrade(mut self, sql: impl Into<String>) -> Self {
        self.upgrade.push(sql.into());
        self
    }
}

fn is_field_name(field: &str) -> bool {
    !field.is_empty()
        && field.len() <= 64
        && field.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
}

// =============================================================================
// Application
// =============================================================================

/// Checks a version list and returns it sorted ascending.
pub fn plan(versions: &[SchemaVersion]) -> DbResult<Vec<SchemaVersion>> {
    let mut seen = HashSet::new();
    for version in versions {
        if version.version == 0 {
            return Err(DbError::SchemaFailed(
                "version numbers start at 1".to_string(),
            ));
        }
        if !seen.insert(version.version) {
            return Err(DbError::SchemaFailed(format!(
                "duplicate schema version {}",
                version.version
            )));
        }
        for store in &version.stores {
            store.validate()?;
        }
    }

    let mut sorted = versions.to_vec();
    sorted.sort_by_key(|v| v.version);
    Ok(sorted)
}

/// Collects the latest declaration of every store across all versions.
pub fn declared_stores(versions: &[SchemaVersion]) -> HashMap<String, StoreSchema> {
    let mut stores = HashMap::new();
    for version in versions {
        for store in &version.stores {
            stores.insert(store.name.clone(), store.clone());
        }
    }
    stores
}

/// Creates the internal bookkeeping tables.
pub async fn ensure_internal_tables(pool: &SqlitePool) -> DbResult<()> {
    sqlx::raw_sql(
        r#"
        CREATE TABLE IF NOT EXISTS _schema_versions (
            version INTEGER PRIMARY KEY NOT NULL,
            applied_at TEXT NOT NULL
        );
        CREATE TABLE IF NOT EXISTS _sync_nodes (
            url TEXT PRIMARY KEY NOT NULL,
            protocol TEXT NOT NULL,
            status INTEGER NOT NULL,
            options TEXT NOT NULL,
            last_error TEXT,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL,
            connected_at TEXT
        );
        "#,
    )
    .execute(pool)
    .await
    .map_err(|e| DbError::SchemaFailed(e.to_string()))?;

    Ok(())
}

/// Returns the highest applied version (0 for a fresh store).
pub async fn current_version(pool: &SqlitePool) -> DbResult<u32> {
    let version: i64 = sqlx::query_scalar("SELECT COALESCE(MAX(version), 0) FROM _schema_versions")
        .fetch_one(pool)
        .await?;

    u32::try_from(version)
        .map_err(|_| DbError::SchemaFailed(format!("stored version {} out of range", version)))
}

/// Applies every version newer than the stored one.
///
/// ## Returns
/// The version the store is at afterwards.
pub async fn apply(pool: &SqlitePool, versions: &[SchemaVersion]) -> DbResult<u32> {
    let sorted = plan(versions)?;
    ensure_internal_tables(pool).await?;

    let stored = current_version(pool).await?;
    debug!(current = stored, declared = sorted.len(), "Checking schema versions");

    let mut current = stored;
    for version in sorted.iter().filter(|v| v.version > stored) {
        info!(version = version.version, "Applying schema version");

        let mut tx = pool
            .begin()
            .await
            .map_err(|e| DbError::SchemaFailed(e.to_string()))?;

        for store in &version.stores {
            sqlx::query(&store.create_table_sql())
                .execute(&mut *tx)
                .await
                .map_err(|e| DbError::SchemaFailed(format!("store '{}': {}", store.name, e)))?;

            for field in &store.indexes {
                sqlx::query(&store.create_index_sql(field))
                    .execute(&mut *tx)
                    .await
                    .map_err(|e| {
                        DbError::SchemaFailed(format!("index '{}.{}': {}", store.name, field, e))
                    })?;
            }
        }

        for statement in &version.upgrade {
            sqlx::raw_sql(statement)
                .execute(&mut *tx)
                .await
                .map_err(|e| {
                    DbError::SchemaFailed(format!("version {} upgrade: {}", version.version, e))
                })?;
        }

        sqlx::query("INSERT INTO _schema_versions (version, applied_at) VALUES (?1, ?2)")
            .bind(i64::from(version.version))
            .bind(Utc::now())
            .execute(&mut *tx)
            .await
            .map_err(|e| DbError::SchemaFailed(e.to_string()))?;

        tx.commit()
            .await
            .map_err(|e| DbError::SchemaFailed(e.to_string()))?;

        current = version.version;
    }

    Ok(current)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::{Database, DbConfig};

    fn friends_v1() -> SchemaVersion {
        SchemaVersion::new(1).store(StoreSchema::new("friends").index("name"))
    }

    #[test]
    fn test_plan_sorts_versions() {
        let versions = vec![
            SchemaVersion::new(3),
            friends_v1(),
            SchemaVersion::new(2),
        ];
        let sorted = plan(&versions).unwrap();
        let numbers: Vec<u32> = sorted.iter().map(|v| v.version).collect();
        assert_eq!(numbers, vec![1, 2, 3]);
    }

    #[test]
    fn test_plan_rejects_bad_versions() {
        assert!(matches!(
            plan(&[friends_v1(), friends_v1()]),
            Err(DbError::SchemaFailed(_))
        ));
        assert!(plan(&[SchemaVersion::new(0)]).is_err());
        assert!(plan(&[SchemaVersion::new(1).store(StoreSchema::new("_hidden"))]).is_err());
        assert!(
            plan(&[SchemaVersion::new(1).store(StoreSchema::new("ok").index("a'b"))]).is_err()
        );
    }

    #[test]
    fn test_declared_stores_keeps_latest() {
        let versions = vec![
            friends_v1(),
            SchemaVersion::new(2).store(StoreSchema::new("friends").primary_key("uuid")),
        ];
        let stores = declared_stores(&versions);
        assert_eq!(stores["friends"].primary_key, "uuid");
    }

    #[tokio::test]
    async fn test_apply_is_incremental() {
        let db = Database::new(DbConfig::in_memory().version(friends_v1()))
            .await
            .unwrap();
        assert_eq!(db.version(), 1);

        let v2 = SchemaVersion::new(2)
            .store(StoreSchema::new("pets"))
            .upgrade("INSERT INTO pets (id, doc) VALUES ('p1', '{\"id\":\"p1\"}')");
        let version = apply(db.pool(), &[friends_v1(), v2.clone()]).await.unwrap();
        assert_eq!(version, 2);

        // Re-applying does nothing: the upgrade insert would violate the key.
        let version = apply(db.pool(), &[friends_v1(), v2]).await.unwrap();
        assert_eq!(version, 2);
        assert_eq!(current_version(db.pool()).await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_apply_runs_every_pending_version_in_order() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();

        let versions = vec![
            SchemaVersion::new(3).upgrade("INSERT INTO pets (id, doc) VALUES ('p2', '{}')"),
            friends_v1(),
            SchemaVersion::new(2)
                .store(StoreSchema::new("pets"))
                .upgrade("INSERT INTO pets (id, doc) VALUES ('p1', '{}')"),
        ];
        assert_eq!(apply(db.pool(), &versions).await.unwrap(), 3);

        let pets: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM pets")
            .fetch_one(db.pool())
            .await
            .unwrap();
        assert_eq!(pets, 2);

        let applied: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM _schema_versions")
            .fetch_one(db.pool())
            .await
            .unwrap();
        assert_eq!(applied, 3);
    }

    #[tokio::test]
    async fn test_failed_upgrade_rolls_back() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();

        let broken = SchemaVersion::new(1)
            .store(StoreSchema::new("notes"))
            .upgrade("THIS IS NOT SQL");
        assert!(matches!(
            apply(db.pool(), &[broken]).await,
            Err(DbError::SchemaFailed(_))
        ));
        assert_eq!(current_version(db.pool()).await.unwrap(), 0);
    }
}
