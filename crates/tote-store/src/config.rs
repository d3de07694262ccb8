//! # Store Configuration
//!
//! Configuration management for the Cart Store.
//!
//! ## Configuration Sources
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Configuration Priority                               │
//! │                                                                         │
//! │  1. Environment Variables (highest priority)                           │
//! │     TOTE_DB_PATH=/data/tote.db                                         │
//! │     TOTE_NAMESPACE=shop                                                │
//! │     TOTE_SYNC_MODE=offline                                             │
//! │     TOTE_SYNC_LATENCY_MS=250                                           │
//! │                                                                         │
//! │  2. TOML Config File                                                   │
//! │     ~/.config/tote/tote.toml (Linux)                                   │
//! │     ~/Library/Application Support/dev.tote.tote/tote.toml (macOS)      │
//! │                                                                         │
//! │  3. Default Values (lowest priority)                                   │
//! │     namespace "tote", simulated sync, 1500 ms latency                  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Configuration File Format
//! ```toml
//! [storage]
//! database_path = "/data/tote.db"
//! namespace = "tote"
//! max_connections = 5
//!
//! [sync]
//! mode = "simulated"   # simulated | offline
//! latency_ms = 1500
//! timeout_secs = 30
//! initial_backoff_ms = 500
//! max_backoff_secs = 30
//! max_elapsed_secs = 120
//! ```

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tote_db::{CartKeys, DbConfig};
use tracing::{debug, info, warn};

use crate::error::{StoreError, StoreResult};
use crate::sync::{AccountSync, OfflineAccountSync, RetryPolicy, SimulatedAccountSync};

// =============================================================================
// Sync Mode
// =============================================================================

/// Which [`AccountSync`] the store is built with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncMode {
    /// Delay for `latency_ms`, then report success.
    #[default]
    Simulated,

    /// Sync disabled; every sync of a non-empty cart fails.
    Offline,
}

impl std::fmt::Display for SyncMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SyncMode::Simulated => write!(f, "simulated"),
            SyncMode::Offline => write!(f, "offline"),
        }
    }
}

impl std::str::FromStr for SyncMode {
    type Err = StoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "simulated" | "stub" => Ok(SyncMode::Simulated),
            "offline" | "disabled" => Ok(SyncMode::Offline),
            other => Err(StoreError::InvalidConfig(format!(
                "Unknown sync mode: '{}'. Valid options: simulated, offline",
                other
            ))),
        }
    }
}

// =============================================================================
// Storage Settings
// =============================================================================

/// Where and how the cart is persisted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageSettings {
    /// SQLite database file. Falls back to the platform data directory.
    #[serde(default)]
    pub database_path: Option<PathBuf>,

    /// Prefix of every key the store writes.
    #[serde(default = "default_namespace")]
    pub namespace: String,

    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

fn default_namespace() -> String {
    tote_db::kv::DEFAULT_NAMESPACE.to_string()
}

fn default_max_connections() -> u32 {
    5
}

impl Default for StorageSettings {
    fn default() -> Self {
        StorageSettings {
            database_path: None,
            namespace: default_namespace(),
            max_connections: default_max_connections(),
        }
    }
}

// =============================================================================
// Sync Settings
// =============================================================================

/// Account sync behavior.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncSettings {
    #[serde(default)]
    pub mode: SyncMode,

    /// Simulated round-trip time (milliseconds).
    #[serde(default = "default_latency")]
    pub latency_ms: u64,

    /// Give up on a single sync after this long (seconds).
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,

    /// First retry delay for `sync_with_retry` (milliseconds).
    #[serde(default = "default_initial_backoff")]
    pub initial_backoff_ms: u64,

    /// Cap on a single retry delay (seconds).
    #[serde(default = "default_max_backoff")]
    pub max_backoff_secs: u64,

    /// Total retry budget (seconds).
    #[serde(default = "default_max_elapsed")]
    pub max_elapsed_secs: u64,
}

fn default_latency() -> u64 {
    1500
}
fn default_timeout() -> u64 {
    30
}
fn default_initial_backoff() -> u64 {
    500
}
fn default_max_backoff() -> u64 {
    30
}
fn default_max_elapsed() -> u64 {
    120
}

impl Default for SyncSettings {
    fn default() -> Self {
        SyncSettings {
            mode: SyncMode::default(),
            latency_ms: default_latency(),
            timeout_secs: default_timeout(),
            initial_backoff_ms: default_initial_backoff(),
            max_backoff_secs: default_max_backoff(),
            max_elapsed_secs: default_max_elapsed(),
        }
    }
}

// =============================================================================
// Main Store Configuration
// =============================================================================

/// Complete store configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StoreConfig {
    #[serde(default)]
    pub storage: StorageSettings,

    #[serde(default)]
    pub sync: SyncSettings,
}

impl StoreConfig {
    /// Loads configuration from file, environment, and defaults.
    ///
    /// ## Load Order (later overrides earlier)
    /// 1. Default values
    /// 2. Config file (tote.toml)
    /// 3. Environment variables
    pub fn load(config_path: Option<PathBuf>) -> StoreResult<Self> {
        let mut config = Self::default();

        if let Some(path) = config_path.or_else(Self::default_config_path) {
            if path.exists() {
                info!(?path, "Loading store config from file");
                let contents = std::fs::read_to_string(&path)?;
                config = toml::from_str(&contents)?;
            } else {
                debug!(?path, "Config file not found, using defaults");
            }
        }

        config.apply_env_overrides();
        config.validate()?;

        Ok(config)
    }

    /// Loads config or returns default if load fails.
    pub fn load_or_default(config_path: Option<PathBuf>) -> Self {
        Self::load(config_path).unwrap_or_else(|e| {
            warn!(error = %e, "Failed to load store config, using defaults");
            Self::default()
        })
    }

    /// Saves configuration to file.
    pub fn save(&self, config_path: Option<PathBuf>) -> StoreResult<()> {
        let path = config_path
            .or_else(Self::default_config_path)
            .ok_or_else(|| StoreError::ConfigSaveFailed("No config path available".into()))?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| StoreError::ConfigSaveFailed(e.to_string()))?;
        }

        let contents = toml::to_string_pretty(self)?;
        std::fs::write(&path, contents).map_err(|e| StoreError::ConfigSaveFailed(e.to_string()))?;

        info!(?path, "Store config saved");
        Ok(())
    }

    /// Validates the configuration.
    pub fn validate(&self) -> StoreResult<()> {
        let namespace = self.storage.namespace.trim();
        if namespace.is_empty() {
            return Err(StoreError::InvalidConfig("namespace must not be empty".into()));
        }
        if namespace.contains(':') {
            return Err(StoreError::InvalidConfig(format!(
                "namespace must not contain ':', got: {}",
                namespace
            )));
        }

        if self.storage.max_connections == 0 {
            return Err(StoreError::InvalidConfig(
                "max_connections must be greater than 0".into(),
            ));
        }

        if self.sync.timeout_secs == 0 {
            return Err(StoreError::InvalidConfig(
                "timeout_secs must be greater than 0".into(),
            ));
        }

        if self.sync.initial_backoff_ms == 0 {
            return Err(StoreError::InvalidConfig(
                "initial_backoff_ms must be greater than 0".into(),
            ));
        }

        Ok(())
    }

    /// Applies environment variable overrides.
    fn apply_env_overrides(&mut self) {
        self.apply_overrides(|name| std::env::var(name).ok());
    }

    fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(path) = lookup("TOTE_DB_PATH") {
            debug!(path = %path, "Overriding database path from environment");
            self.storage.database_path = Some(PathBuf::from(path));
        }

        if let Some(namespace) = lookup("TOTE_NAMESPACE") {
            self.storage.namespace = namespace;
        }

        if let Some(mode) = lookup("TOTE_SYNC_MODE") {
            match mode.parse() {
                Ok(parsed) => {
                    debug!(mode = %mode, "Overriding sync mode from environment");
                    self.sync.mode = parsed;
                }
                Err(_) => warn!(mode = %mode, "Unknown sync mode in environment"),
            }
        }

        if let Some(latency) = lookup("TOTE_SYNC_LATENCY_MS") {
            match latency.parse::<u64>() {
                Ok(ms) => {
                    debug!(latency_ms = ms, "Overriding sync latency from environment");
                    self.sync.latency_ms = ms;
                }
                Err(_) => warn!(latency = %latency, "Invalid sync latency in environment"),
            }
        }
    }

    /// Returns the default config file path.
    fn default_config_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("dev", "tote", "tote")
            .map(|dirs| dirs.config_dir().join("tote.toml"))
    }

    // =========================================================================
    // Convenience Methods
    // =========================================================================

    /// Resolves the database file: configured path, else platform data directory.
    pub fn database_path(&self) -> Option<PathBuf> {
        self.storage.database_path.clone().or_else(|| {
            directories::ProjectDirs::from("dev", "tote", "tote")
                .map(|dirs| dirs.data_dir().join("tote.db"))
        })
    }

    /// Pool settings for `tote_db::Database::new`.
    pub fn db_config(&self) -> StoreResult<DbConfig> {
        let path = self.database_path().ok_or_else(|| {
            StoreError::InvalidConfig("Could not determine app data directory".into())
        })?;
        Ok(DbConfig::new(path).max_connections(self.storage.max_connections))
    }

    /// Scoped key names under the configured namespace.
    pub fn cart_keys(&self) -> CartKeys {
        CartKeys::new(self.storage.namespace.trim())
    }

    /// Simulated sync round-trip time.
    pub fn latency(&self) -> Duration {
        Duration::from_millis(self.sync.latency_ms)
    }

    /// Upper bound on one `sync_with_user_account` call.
    pub fn sync_timeout(&self) -> Duration {
        Duration::from_secs(self.sync.timeout_secs)
    }

    /// Backoff settings for `sync_with_retry`.
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            initial_backoff: Duration::from_millis(self.sync.initial_backoff_ms),
            max_backoff: Duration::from_secs(self.sync.max_backoff_secs),
            max_elapsed: Duration::from_secs(self.sync.max_elapsed_secs),
        }
    }

    /// Builds the sync collaborator for the configured mode.
    pub fn account_sync(&self) -> Arc<dyn AccountSync> {
        match self.sync.mode {
            SyncMode::Simulated => Arc::new(SimulatedAccountSync::new(self.latency())),
            SyncMode::Offline => Arc::new(OfflineAccountSync),
        }
    }
}
