//! # Engine Configuration
//!
//! Settings for the rental engine: where the store lives, how long a store
//! call may take, how photos are bounded and where deleted contracts are
//! audited.
//!
//! ## Configuration Sources
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Configuration Priority                               │
//! │                                                                         │
//! │  1. Environment Variables (highest priority)                           │
//! │     FROTA_DATABASE_PATH=/var/lib/frota/frota.db                        │
//! │     FROTA_OPERATION_TIMEOUT_SECS=15                                    │
//! │                                                                         │
//! │  2. TOML Config File                                                   │
//! │     ~/.config/rent/engine.toml (Linux)                                 │
//! │     ~/Library/Application Support/pt.frota.rent/engine.toml (macOS)    │
//! │                                                                         │
//! │  3. Default Values (lowest priority)                                   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Configuration File Format
//! ```toml
//! # engine.toml
//! [store]
//! database_path = "/var/lib/frota/frota.db"
//! max_connections = 5
//! operation_timeout_secs = 30
//!
//! [photos]
//! max_width = 1280
//! max_height = 1280
//! damage_max_bytes = 1200000
//!
//! [audit]
//! terminated_category = "terminated_removed"
//! ```

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;
use tracing::{debug, info, warn};

use frota_store::StoreConfig;

use crate::error::{EngineError, EngineResult};

// =============================================================================
// Store Settings
// =============================================================================

/// Where the document store lives and how long calls against it may take.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreSettings {
    /// SQLite file backing the document tree.
    #[serde(default = "default_database_path")]
    pub database_path: PathBuf,

    #[serde(default = "default_max_connections")]
    pub max_connections: u32,

    /// Upper bound for any single read or write (seconds).
    /// A write that hits this bound is reported with an unknown outcome.
    #[serde(default = "default_operation_timeout")]
    pub operation_timeout_secs: u64,
}

fn default_database_path() -> PathBuf {
    directories::ProjectDirs::from("pt", "frota", "rent")
        .map(|dirs| dirs.data_dir().join("frota.db"))
        .unwrap_or_else(|| PathBuf::from("./frota.db"))
}

fn default_max_connections() -> u32 {
    5
}

fn default_operation_timeout() -> u64 {
    30
}

impl Default for StoreSettings {
    fn default() -> Self {
        StoreSettings {
            database_path: default_database_path(),
            max_connections: default_max_connections(),
            operation_timeout_secs: default_operation_timeout(),
        }
    }
}

// =============================================================================
// Photo Settings
// =============================================================================

/// Bounds applied by the photo pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhotoSettings {
    #[serde(default = "default_max_dimension")]
    pub max_width: u32,

    #[serde(default = "default_max_dimension")]
    pub max_height: u32,

    /// Size cap for a single damage photo, in bytes of data URI.
    #[serde(default = "default_damage_max_bytes")]
    pub damage_max_bytes: usize,
}

fn default_max_dimension() -> u32 {
    1280
}

fn default_damage_max_bytes() -> usize {
    1_200_000
}

impl Default for PhotoSettings {
    fn default() -> Self {
        PhotoSettings {
            max_width: default_max_dimension(),
            max_height: default_max_dimension(),
            damage_max_bytes: default_damage_max_bytes(),
        }
    }
}

// =============================================================================
// Audit Settings
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditSettings {
    /// `audit/{category}` that receives deleted terminated contracts.
    #[serde(default = "default_terminated_category")]
    pub terminated_category: String,
}

fn default_terminated_category() -> String {
    "terminated_removed".to_string()
}

impl Default for AuditSettings {
    fn default() -> Self {
        AuditSettings {
            terminated_category: default_terminated_category(),
        }
    }
}

// =============================================================================
// Engine Configuration
// =============================================================================

/// Complete engine configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EngineConfig {
    #[serde(default)]
    pub store: StoreSettings,

    #[serde(default)]
    pub photos: PhotoSettings,

    #[serde(default)]
    pub audit: AuditSettings,
}

impl EngineConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads configuration from file, environment, and defaults.
    ///
    /// ## Load Order (later overrides earlier)
    /// 1. Default values
    /// 2. Config file (engine.toml)
    /// 3. Environment variables
    pub fn load(config_path: Option<PathBuf>) -> EngineResult<Self> {
        let mut config = Self::default();

        if let Some(path) = config_path.or_else(Self::default_config_path) {
            if path.exists() {
                info!(?path, "Loading engine config from file");
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

    /// Saves configuration to file.
    pub fn save(&self, config_path: Option<PathBuf>) -> EngineResult<()> {
        let path = config_path
            .or_else(Self::default_config_path)
            .ok_or_else(|| EngineError::Config("No config path available".into()))?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let contents = toml::to_string_pretty(self)?;
        std::fs::write(&path, contents)?;

        info!(?path, "Engine config saved");
        Ok(())
    }

    pub fn validate(&self) -> EngineResult<()> {
        if self.store.database_path.as_os_str().is_empty() {
            return Err(EngineError::Config("database_path must not be empty".into()));
        }
        if self.store.max_connections == 0 {
            return Err(EngineError::Config(
                "max_connections must be greater than 0".into(),
            ));
        }
        if self.store.operation_timeout_secs == 0 {
            return Err(EngineError::Config(
                "operation_timeout_secs must be greater than 0".into(),
            ));
        }
        if self.photos.max_width == 0 || self.photos.max_height == 0 {
            return Err(EngineError::Config(
                "photo dimensions must be greater than 0".into(),
            ));
        }
        if self.photos.damage_max_bytes == 0 {
            return Err(EngineError::Config(
                "damage_max_bytes must be greater than 0".into(),
            ));
        }
        let category = self.audit.terminated_category.trim();
        if category.is_empty() || category.contains('/') {
            return Err(EngineError::Config(format!(
                "terminated_category must be a single path segment, got: '{}'",
                self.audit.terminated_category
            )));
        }
        Ok(())
    }

    /// Applies `FROTA_*` overrides read through `lookup`.
    fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(path) = lookup("FROTA_DATABASE_PATH") {
            debug!(path = %path, "Overriding database path from environment");
            self.store.database_path = PathBuf::from(path);
        }

        if let Some(value) = lookup("FROTA_MAX_CONNECTIONS") {
            match value.parse::<u32>() {
                Ok(n) => self.store.max_connections = n,
                Err(_) => warn!(value = %value, "Ignoring invalid FROTA_MAX_CONNECTIONS"),
            }
        }

        if let Some(value) = lookup("FROTA_OPERATION_TIMEOUT_SECS") {
            match value.parse::<u64>() {
                Ok(secs) => {
                    debug!(secs, "Overriding operation timeout from environment");
                    self.store.operation_timeout_secs = secs;
                }
                Err(_) => warn!(value = %value, "Ignoring invalid FROTA_OPERATION_TIMEOUT_SECS"),
            }
        }

        if let Some(value) = lookup("FROTA_PHOTO_MAX_WIDTH") {
            if let Ok(px) = value.parse::<u32>() {
                self.photos.max_width = px;
            }
        }

        if let Some(value) = lookup("FROTA_PHOTO_MAX_HEIGHT") {
            if let Ok(px) = value.parse::<u32>() {
                self.photos.max_height = px;
            }
        }

        if let Some(value) = lookup("FROTA_DAMAGE_MAX_BYTES") {
            if let Ok(bytes) = value.parse::<usize>() {
                self.photos.damage_max_bytes = bytes;
            }
        }

        if let Some(category) = lookup("FROTA_AUDIT_CATEGORY") {
            self.audit.terminated_category = category;
        }
    }

    fn default_config_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("pt", "frota", "rent")
            .map(|dirs| dirs.config_dir().join("engine.toml"))
    }

    // =========================================================================
    // Convenience Methods
    // =========================================================================

    /// Bound applied to every store call.
    pub fn operation_timeout(&self) -> Duration {
        Duration::from_secs(self.store.operation_timeout_secs)
    }

    /// SQLite settings for [`frota_store::Store::sqlite`].
    pub fn store_config(&self) -> StoreConfig {
        StoreConfig::new(&self.store.database_path).max_connections(self.store.max_connections)
    }

    pub fn terminated_category(&self) -> &str {
        self.audit.terminated_category.trim()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_default_config() {
        let config = EngineConfig::default();
        assert_eq!(config.store.operation_timeout_secs, 30);
        assert_eq!(config.photos.max_width, 1280);
        assert_eq!(config.photos.max_height, 1280);
        assert_eq!(config.photos.damage_max_bytes, 1_200_000);
        assert_eq!(config.terminated_category(), "terminated_removed");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_validation() {
        let mut config = EngineConfig::default();
        config.store.operation_timeout_secs = 0;
        assert!(config.validate().is_err());

        let mut config = EngineConfig::default();
        config.audit.terminated_category = "a/b".to_string();
        assert!(config.validate().is_err());

        let mut config = EngineConfig::default();
        config.photos.max_height = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_env_overrides() {
        let env: HashMap<&str, &str> = [
            ("FROTA_DATABASE_PATH", "/tmp/frota-test.db"),
            ("FROTA_OPERATION_TIMEOUT_SECS", "5"),
            ("FROTA_MAX_CONNECTIONS", "not-a-number"),
            ("FROTA_AUDIT_CATEGORY", "removed"),
        ]
        .into_iter()
        .collect();

        let mut config = EngineConfig::default();
        config.apply_overrides(|key| env.get(key).map(|v| v.to_string()));

        assert_eq!(config.store.database_path, PathBuf::from("/tmp/frota-test.db"));
        assert_eq!(config.operation_timeout(), Duration::from_secs(5));
        assert_eq!(config.store.max_connections, 5);
        assert_eq!(config.terminated_category(), "removed");
    }

    #[test]
    fn test_save_and_load_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("engine.toml");

        let mut config = EngineConfig::default();
        config.store.database_path = dir.path().join("frota.db");
        config.photos.damage_max_bytes = 800_000;
        config.save(Some(path.clone())).unwrap();

        let loaded = EngineConfig::load(Some(path)).unwrap();
        assert_eq!(loaded.store.database_path, dir.path().join("frota.db"));
        assert_eq!(loaded.photos.damage_max_bytes, 800_000);
        assert_eq!(loaded.photos.max_width, 1280);
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("engine.toml");
        std::fs::write(&path, "[photos]\nmax_width = 640\n").unwrap();

        let contents = std::fs::read_to_string(&path).unwrap();
        let config: EngineConfig = toml::from_str(&contents).unwrap();
        assert_eq!(config.photos.max_width, 640);
        assert_eq!(config.photos.max_height, 1280);
        assert_eq!(config.store.operation_timeout_secs, 30);
    }

    #[test]
    fn test_toml_serialization() {
        let toml_str = toml::to_string_pretty(&EngineConfig::default()).unwrap();
        assert!(toml_str.contains("[store]"));
        assert!(toml_str.contains("[photos]"));
        assert!(toml_str.contains("[audit]"));
    }
}
