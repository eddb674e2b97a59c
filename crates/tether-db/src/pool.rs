//! # Database Pool Management
//!
//! Opening the local store: connection pool, schema versions, addons.
//!
//! ## Architecture
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Opening a Database                                 │
//! │                                                                         │
//! │  DbConfig::new(path).name("notes").version(v1).addon(a)                │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  Database::new(config).await                                           │
//! │       │                                                                 │
//! │       ├── 1. SqlitePool (WAL for files, single connection in memory)   │
//! │       ├── 2. schema::apply(versions)                                   │
//! │       └── 3. addon.install(&db) for each addon, in order               │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────┐                           │
//! │  │  Database (cheap to clone)              │                           │
//! │  │  ├── table(name)   → Table              │                           │
//! │  │  ├── sync_nodes()  → SyncNodeRepository │                           │
//! │  │  └── syncable()    → Syncable           │                           │
//! │  └─────────────────────────────────────────┘                           │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## WAL Mode
//! File-backed stores use SQLite WAL (Write-Ahead Logging) so status writes
//! from adapters never block document reads.

use std::collections::HashMap;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use sqlx::SqlitePool;
use tracing::{debug, info};

use tether_core::validation::validate_database_name;

use crate::addon::Addon;
use crate::error::{DbError, DbResult};
use crate::repository::sync_nodes::SyncNodeRepository;
use crate::repository::table::Table;
use crate::schema::{self, SchemaVersion, StoreSchema};
use crate::syncable::{SyncState, Syncable};

/// Path marker for an in-memory store.
const MEMORY_PATH: &str = ":memory:";

// =============================================================================
// Configuration
// =============================================================================

/// Database configuration.
///
/// ## Example
/// ```rust,ignore
/// let config = DbConfig::new("/path/to/notes.db")
///     .name("notes")
///     .version(SchemaVersion::new(1).store(StoreSchema::new("friends")))
///     .partials_threshold(Some(500));
/// ```
#[derive(Clone)]
pub struct DbConfig {
    /// Identifier of the local store.
    pub name: String,

    /// Path to the SQLite database file.
    pub database_path: PathBuf,

    /// Schema versions, in any order.
    pub versions: Vec<SchemaVersion>,

    /// Addons installed after the schema is applied.
    pub addons: Vec<Arc<dyn Addon>>,

    /// Default tuning value for protocols registered without one.
    pub partials_threshold: Option<u32>,

    /// Maximum number of connections in the pool.
    /// Default: 5
    pub max_connections: u32,

    /// Minimum number of connections to keep alive.
    /// Default: 1
    pub min_connections: u32,

    /// Connection timeout duration.
    /// Default: 30 seconds
    pub connect_timeout: Duration,

    /// Idle timeout before closing a connection.
    /// Default: 10 minutes. `None` for in-memory stores.
    pub idle_timeout: Option<Duration>,
}

impl DbConfig {
    /// Creates a configuration for a file-backed store.
    ///
    /// ## Arguments
    /// * `path` - Path to the SQLite database file. Will be created if it doesn't exist.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        DbConfig {
            name: "tether".to_string(),
            database_path: path.into(),
            versions: Vec::new(),
            addons: Vec::new(),
            partials_threshold: None,
            max_connections: 5,
            min_connections: 1,
            connect_timeout: Duration::from_secs(30),
            idle_timeout: Some(Duration::from_secs(600)),
        }
    }

    /// Creates an in-memory database configuration (for testing).
    ///
    /// The store lives as long as its single pooled connection, so idle
    /// reaping is disabled.
    pub fn in_memory() -> Self {
        DbConfig {
            database_path: PathBuf::from(MEMORY_PATH),
            max_connections: 1,
            min_connections: 1,
            connect_timeout: Duration::from_secs(5),
            idle_timeout: None,
            ..Self::new(MEMORY_PATH)
        }
    }

    /// Sets the store name.
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Adds a schema version.
    pub fn version(mut self, version: SchemaVersion) -> Self {
        self.versions.push(version);
        self
    }

    /// Adds an addon.
    pub fn addon(mut self, addon: Arc<dyn Addon>) -> Self {
        self.addons.push(addon);
        self
    }

    /// Sets the default partials threshold.
    pub fn partials_threshold(mut self, threshold: Option<u32>) -> Self {
        self.partials_threshold = threshold;
        self
    }

    /// Sets the maximum number of connections.
    pub fn max_connections(mut self, max: u32) -> Self {
        self.max_connections = max;
        self
    }

    /// Sets the minimum number of connections.
    pub fn min_connections(mut self, min: u32) -> Self {
        self.min_connections = min;
        self
    }

    /// Sets the connection timeout.
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Returns true for an in-memory store.
    pub fn is_in_memory(&self) -> bool {
        self.database_path.as_os_str() == MEMORY_PATH
    }

    fn connect_options(&self) -> DbResult<SqliteConnectOptions> {
        if self.is_in_memory() {
            return SqliteConnectOptions::from_str("sqlite::memory:")
                .map_err(|e| DbError::ConnectionFailed(e.to_string()));
        }

        let connect_url = format!("sqlite://{}?mode=rwc", self.database_path.display());
        let options = SqliteConnectOptions::from_str(&connect_url)
            .map_err(|e| DbError::ConnectionFailed(e.to_string()))?
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal)
            .create_if_missing(true);
        Ok(options)
    }
}

impl fmt::Debug for DbConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let addons: Vec<&str> = self.addons.iter().map(|a| a.name()).collect();
        f.debug_struct("DbConfig")
            .field("name", &self.name)
            .field("database_path", &self.database_path)
            .field("versions", &self.versions.len())
            .field("addons", &addons)
            .field("partials_threshold", &self.partials_threshold)
            .field("max_connections", &self.max_connections)
            .field("min_connections", &self.min_connections)
            .finish()
    }
}

// =============================================================================
// Database
// =============================================================================

struct Shared {
    name: String,
    version: u32,
    stores: HashMap<String, StoreSchema>,
    sync: Arc<SyncState>,
}

/// Handle to an open local store.
///
/// Clones share the pool and the sync state (registered protocols, event
/// emitters, live sessions).
#[derive(Clone)]
pub struct Database {
    pool: SqlitePool,
    shared: Arc<Shared>,
}

impl Database {
    /// Opens the store.
    ///
    /// ## What This Does
    /// 1. Creates the database file if it doesn't exist
    /// 2. Applies pending schema versions
    /// 3. Installs addons in order
    ///
    /// ## Returns
    /// * `Ok(Database)` - Ready-to-use database handle
    /// * `Err(DbError)` - Connection, schema or addon failure
    pub async fn new(config: DbConfig) -> DbResult<Self> {
        validate_database_name(&config.name)?;

        info!(
            name = %config.name,
            path = %config.database_path.display(),
            "Opening database"
        );

        let connect_options = config.connect_options()?;
        let pool = SqlitePoolOptions::new()
            .max_connections(config.max_connections)
            .min_connections(config.min_connections)
            .acquire_timeout(config.connect_timeout)
            .idle_timeout(config.idle_timeout)
            .max_lifetime(config.idle_timeout.map(|idle| idle * 3))
            .connect_with(connect_options)
            .await
            .map_err(|e| DbError::ConnectionFailed(e.to_string()))?;

        debug!(max_connections = config.max_connections, "Database pool created");

        let version = schema::apply(&pool, &config.versions).await?;
        info!(name = %config.name, version, "Schema up to date");

        let db = Database {
            pool,
            shared: Arc::new(Shared {
                name: config.name.clone(),
                version,
                stores: schema::declared_stores(&config.versions),
                sync: Arc::new(SyncState::new(config.partials_threshold)),
            }),
        };

        for addon in &config.addons {
            debug!(addon = %addon.name(), "Installing addon");
            addon
                .install(&db)
                .await
                .map_err(|e| DbError::AddonFailed {
                    name: addon.name().to_string(),
                    reason: e.to_string(),
                })?;
        }

        Ok(db)
    }

    /// Name of the local store.
    pub fn name(&self) -> &str {
        &self.shared.name
    }

    /// Highest applied schema version.
    pub fn version(&self) -> u32 {
        self.shared.version
    }

    /// Returns a reference to the connection pool.
    ///
    /// For queries not covered by [`Table`] or the repositories.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Names of all declared stores, sorted.
    pub fn store_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.shared.stores.keys().cloned().collect();
        names.sort();
        names
    }

    /// Returns the document table for a declared store.
    pub fn table(&self, name: &str) -> DbResult<Table> {
        let store = self
            .shared
            .stores
            .get(name)
            .ok_or_else(|| DbError::UnknownStore(name.to_string()))?;
        Ok(Table::new(self.pool.clone(), store.clone()))
    }

    /// Returns the persisted sync-node repository.
    pub fn sync_nodes(&self) -> SyncNodeRepository {
        SyncNodeRepository::new(self.pool.clone())
    }

    /// Returns the sync surface of the store.
    pub fn syncable(&self) -> Syncable {
        Syncable::new(self.pool.clone(), self.shared.sync.clone())
    }

    /// Closes the connection pool.
    ///
    /// After calling close, every operation on this handle fails.
    pub async fn close(&self) {
        info!(name = %self.shared.name, "Closing database connection pool");
        self.pool.close().await;
    }

    /// Checks if the database can execute queries.
    pub async fn health_check(&self) -> bool {
        sqlx::query("SELECT 1").execute(&self.pool).await.is_ok()
    }
}

impl fmt::Debug for Database {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Database")
            .field("name", &self.shared.name)
            .field("version", &self.shared.version)
            .finish_non_exhaustive()
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingAddon {
        installs: AtomicUsize,
    }

    #[async_trait]
    impl Addon for CountingAddon {
        fn name(&self) -> &str {
            "counting"
        }

        async fn install(&self, db: &Database) -> DbResult<()> {
            assert!(db.health_check().await);
            self.installs.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    struct FailingAddon;

    #[async_trait]
    impl Addon for FailingAddon {
        fn name(&self) -> &str {
            "failing"
        }

        async fn install(&self, _db: &Database) -> DbResult<()> {
            Err(DbError::Internal("nope".to_string()))
        }
    }

    #[tokio::test]
    async fn test_in_memory_database() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        assert!(db.health_check().await);
        assert_eq!(db.name(), "tether");
        assert_eq!(db.version(), 0);
    }

    #[test]
    fn test_config_builder() {
        let config = DbConfig::new("/tmp/test.db")
            .name("notes")
            .max_connections(10)
            .min_connections(2)
            .partials_threshold(Some(250));

        assert_eq!(config.name, "notes");
        assert_eq!(config.max_connections, 10);
        assert_eq!(config.min_connections, 2);
        assert_eq!(config.partials_threshold, Some(250));
        assert!(!config.is_in_memory());
        assert!(DbConfig::in_memory().is_in_memory());
    }

    #[tokio::test]
    async fn test_declared_stores_are_reachable() {
        let config = DbConfig::in_memory()
            .version(SchemaVersion::new(1).store(StoreSchema::new("friends")))
            .version(SchemaVersion::new(2).store(StoreSchema::new("pets")));
        let db = Database::new(config).await.unwrap();

        assert_eq!(db.version(), 2);
        assert_eq!(db.store_names(), vec!["friends", "pets"]);
        assert!(db.table("friends").is_ok());
        assert!(matches!(db.table("enemies"), Err(DbError::UnknownStore(_))));
    }

    #[tokio::test]
    async fn test_addons_install_in_order() {
        let addon = Arc::new(CountingAddon {
            installs: AtomicUsize::new(0),
        });
        let config = DbConfig::in_memory().addon(addon.clone());
        Database::new(config).await.unwrap();
        assert_eq!(addon.installs.load(Ordering::SeqCst), 1);

        let config = DbConfig::in_memory()
            .addon(addon.clone())
            .addon(Arc::new(FailingAddon));
        let result = Database::new(config).await;
        assert!(matches!(result, Err(DbError::AddonFailed { .. })));
        assert_eq!(addon.installs.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_blank_name_rejected() {
        let result = Database::new(DbConfig::in_memory().name("  ")).await;
        assert!(matches!(result, Err(DbError::Core(_))));
    }
}
