//! # Tether Configuration
//!
//! Configuration for the local store and the connection manager.
//!
//! ## Configuration Sources
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Configuration Priority                               │
//! │                                                                         │
//! │  1. Environment Variables (highest priority)                           │
//! │     TETHER_DB_NAME=notes                                               │
//! │     TETHER_DB_PATH=/var/lib/app/notes.db                               │
//! │     TETHER_PROTOCOL=tether                                             │
//! │     TETHER_PARTIALS_THRESHOLD=500                                      │
//! │                                                                         │
//! │  2. TOML Config File                                                   │
//! │     ~/.config/tether/tether.toml (Linux)                               │
//! │     ~/Library/Application Support/dev.tether.tether/tether.toml (macOS)│
//! │                                                                         │
//! │  3. Default Values (lowest priority)                                   │
//! │     name = "tether", in-memory store, protocol "tether"                │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Configuration File Format
//! ```toml
//! # tether.toml
//! [database]
//! name = "notes"
//! path = "/var/lib/app/notes.db"
//! max_connections = 5
//!
//! [sync]
//! protocol = "tether"
//! partials_threshold = 500
//! ```

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::{debug, info, warn};

use tether_core::validation::validate_database_name;
use tether_db::DbConfig;

use crate::error::{SyncError, SyncResult};

/// File name of the config file inside the platform config directory.
pub const CONFIG_FILE_NAME: &str = "tether.toml";

// =============================================================================
// Database Settings
// =============================================================================

/// Local store settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatabaseSettings {
    /// Name of the local store.
    #[serde(default = "default_db_name")]
    pub name: String,

    /// SQLite file. `None` keeps the store in memory.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,

    /// Maximum pooled connections for file-backed stores.
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

fn default_db_name() -> String {
    "tether".to_string()
}
fn default_max_connections() -> u32 {
    5
}

impl Default for DatabaseSettings {
    fn default() -> Self {
        DatabaseSettings {
            name: default_db_name(),
            path: None,
            max_connections: default_max_connections(),
        }
    }
}

// =============================================================================
// Sync Settings
// =============================================================================

/// Connection manager settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyncSettings {
    /// Name the protocol adapter is registered under.
    #[serde(default = "default_protocol")]
    pub protocol: String,

    /// Tuning value forwarded to the adapter on every connect.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub partials_threshold: Option<u32>,
}

fn default_protocol() -> String {
    "tether".to_string()
}

impl Default for SyncSettings {
    fn default() -> Self {
        SyncSettings {
            protocol: default_protocol(),
            partials_threshold: None,
        }
    }
}

// =============================================================================
// Main Configuration
// =============================================================================

/// Complete configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TetherConfig {
    /// Local store settings.
    #[serde(default)]
    pub database: DatabaseSettings,

    /// Connection manager settings.
    #[serde(default)]
    pub sync: SyncSettings,
}

impl TetherConfig {
    /// Loads configuration from file, environment, and defaults.
    ///
    /// ## Load Order (later overrides earlier)
    /// 1. Default values
    /// 2. Config file (tether.toml)
    /// 3. Environment variables
    pub fn load(config_path: Option<PathBuf>) -> SyncResult<Self> {
        let mut config = Self::default();

        if let Some(path) = config_path.or_else(Self::default_config_path) {
            if path.exists() {
                info!(?path, "Loading tether config from file");
                let contents = std::fs::read_to_string(&path)?;
                config = toml::from_str(&contents)?;
            } else {
                debug!(?path, "Config file not found, using defaults");
            }
        }

        config.apply_overrides(|key| std::env::var(key).ok());
        config.validate()?;

        Ok(config)
    }

    /// Loads config or returns default if load fails.
    pub fn load_or_default(config_path: Option<PathBuf>) -> Self {
        Self::load(config_path).unwrap_or_else(|e| {
            warn!("Failed to load tether config: {}. Using defaults.", e);
            Self::default()
        })
    }

    /// Saves configuration to file.
    pub fn save(&self, config_path: Option<PathBuf>) -> SyncResult<()> {
        let path = config_path
            .or_else(Self::default_config_path)
            .ok_or_else(|| SyncError::ConfigSaveFailed("No config path available".into()))?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| SyncError::ConfigSaveFailed(e.to_string()))?;
        }

        let contents = toml::to_string_pretty(self)?;
        std::fs::write(&path, contents).map_err(|e| SyncError::ConfigSaveFailed(e.to_string()))?;

        info!(?path, "Tether config saved");
        Ok(())
    }

    /// Validates the configuration.
    pub fn validate(&self) -> SyncResult<()> {
        validate_database_name(&self.database.name)
            .map_err(|e| SyncError::InvalidConfig(e.to_string()))?;

        if self.database.max_connections == 0 {
            return Err(SyncError::InvalidConfig(
                "max_connections must be greater than 0".into(),
            ));
        }

        if self.sync.protocol.trim().is_empty() {
            return Err(SyncError::InvalidConfig("protocol must not be empty".into()));
        }

        Ok(())
    }

    /// Applies overrides from `TETHER_*` variables, looked up through `var`.
    fn apply_overrides(&mut self, var: impl Fn(&str) -> Option<String>) {
        if let Some(name) = var("TETHER_DB_NAME") {
            debug!(name = %name, "Overriding database name from environment");
            self.database.name = name;
        }

        if let Some(path) = var("TETHER_DB_PATH") {
            debug!(path = %path, "Overriding database path from environment");
            self.database.path = Some(PathBuf::from(path));
        }

        if let Some(protocol) = var("TETHER_PROTOCOL") {
            self.sync.protocol = protocol;
        }

        if let Some(threshold) = var("TETHER_PARTIALS_THRESHOLD") {
            match threshold.parse::<u32>() {
                Ok(t) => self.sync.partials_threshold = Some(t),
                Err(_) => warn!(value = %threshold, "Ignoring invalid TETHER_PARTIALS_THRESHOLD"),
            }
        }
    }

    /// Returns the default config file path.
    pub fn default_config_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("dev", "tether", "tether")
            .map(|dirs| dirs.config_dir().join(CONFIG_FILE_NAME))
    }

    /// Builds the database configuration these settings describe.
    ///
    /// Schema versions and addons are added by the caller.
    pub fn to_db_config(&self) -> DbConfig {
        let config = match &self.database.path {
            Some(path) => DbConfig::new(path).max_connections(self.database.max_connections),
            None => DbConfig::in_memory(),
        };
        config
            .name(self.database.name.clone())
            .partials_threshold(self.sync.partials_threshold)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_default_config() {
        let config = TetherConfig::default();
        assert_eq!(config.database.name, "tether");
        assert!(config.database.path.is_none());
        assert_eq!(config.sync.protocol, "tether");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_validation() {
        let mut config = TetherConfig::default();

        config.database.name = " ".to_string();
        assert!(matches!(config.validate(), Err(SyncError::InvalidConfig(_))));

        config.database.name = "notes".to_string();
        config.database.max_connections = 0;
        assert!(config.validate().is_err());

        config.database.max_connections = 2;
        config.sync.protocol = String::new();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_overrides() {
        let vars: HashMap<&str, &str> = [
            ("TETHER_DB_NAME", "notes"),
            ("TETHER_DB_PATH", "/tmp/notes.db"),
            ("TETHER_PARTIALS_THRESHOLD", "not-a-number"),
        ]
        .into_iter()
        .collect();

        let mut config = TetherConfig::default();
        config.apply_overrides(|key| vars.get(key).map(|v| v.to_string()));

        assert_eq!(config.database.name, "notes");
        assert_eq!(config.database.path, Some(PathBuf::from("/tmp/notes.db")));
        assert_eq!(config.sync.partials_threshold, None);
        assert_eq!(config.sync.protocol, "tether");
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let config: TetherConfig = toml::from_str(
            r#"
            [sync]
            partials_threshold = 500
            "#,
        )
        .unwrap();

        assert_eq!(config.sync.partials_threshold, Some(500));
        assert_eq!(config.sync.protocol, "tether");
        assert_eq!(config.database, DatabaseSettings::default());
    }

    #[test]
    fn test_toml_round_trip_through_file() {
        let path = std::env::temp_dir().join(format!("tether-config-{}.toml", tether_core::new_id()));

        let mut config = TetherConfig::default();
        config.database.name = "notes".to_string();
        config.sync.partials_threshold = Some(250);
        config.save(Some(path.clone())).unwrap();

        let contents = std::fs::read_to_string(&path).unwrap();
        assert!(contents.contains("[database]"));
        assert!(contents.contains("[sync]"));

        let loaded: TetherConfig = toml::from_str(&contents).unwrap();
        assert_eq!(loaded, config);
        std::fs::remove_file(&path).unwrap();
    }

    #[test]
    fn test_to_db_config() {
        let mut config = TetherConfig::default();
        config.sync.partials_threshold = Some(42);

        let db = config.to_db_config();
        assert!(db.is_in_memory());
        assert_eq!(db.name, "tether");
        assert_eq!(db.partials_threshold, Some(42));

        config.database.path = Some(PathBuf::from("/tmp/notes.db"));
        config.database.max_connections = 3;
        let db = config.to_db_config();
        assert!(!db.is_in_memory());
        assert_eq!(db.max_connections, 3);
    }
}
