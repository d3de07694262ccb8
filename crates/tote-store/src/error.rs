//! # Store Error Types
//!
//! Error types for Cart Store operations.
//!
//! ## Error Categories
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                       Store Error Categories                            │
//! │                                                                         │
//! │  ┌─────────────────┐  ┌─────────────────┐  ┌─────────────────────────┐ │
//! │  │  Configuration  │  │    Storage      │  │        Sync             │ │
//! │  │                 │  │                 │  │                         │ │
//! │  │  InvalidConfig  │  │  Storage(Db)    │  │  Disabled               │ │
//! │  │  ConfigLoad     │  │  Serialization  │  │  ConnectionFailed       │ │
//! │  │  ConfigSave     │  │                 │  │  Timeout                │ │
//! │  └─────────────────┘  └─────────────────┘  └─────────────────────────┘ │
//! │                                                                         │
//! │  ┌─────────────────┐                                                   │
//! │  │     Domain      │  Core(CoreError): validation, quantity overflow   │
//! │  └─────────────────┘                                                   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use thiserror::Error;
use tote_core::{CoreError, ValidationError};
use tote_db::DbError;

/// Result type alias for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Result type alias for account sync operations.
pub type SyncResult<T> = Result<T, SyncError>;

/// Everything a `CartStore` operation can fail with.
#[derive(Debug, Error)]
pub enum StoreError {
    // =========================================================================
    // Configuration Errors
    // =========================================================================
    /// Invalid store configuration.
    #[error("Invalid store configuration: {0}")]
    InvalidConfig(String),

    /// Failed to load config file.
    #[error("Failed to load config: {0}")]
    ConfigLoadFailed(String),

    /// Failed to save config file.
    #[error("Failed to save config: {0}")]
    ConfigSaveFailed(String),

    // =========================================================================
    // Storage Errors
    // =========================================================================
    /// The key-value store failed.
    #[error("Storage error: {0}")]
    Storage(#[from] DbError),

    /// The cart could not be encoded for storage.
    #[error("Serialization failed: {0}")]
    Serialization(String),

    // =========================================================================
    // Domain / Sync Errors
    // =========================================================================
    /// The operation broke a cart rule.
    #[error(transparent)]
    Core(#[from] CoreError),

    /// Account sync failed.
    #[error("Sync failed: {0}")]
    Sync(#[from] SyncError),
}

/// Failures of the account sync collaborator.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SyncError {
    /// Sync mode is `offline`.
    #[error("Account sync is disabled")]
    Disabled,

    /// The remote could not be reached.
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    /// The remote did not answer in time.
    #[error("Sync timed out after {0} seconds")]
    Timeout(u64),
}

// =============================================================================
// Error Conversions
// =============================================================================

impl From<ValidationError> for StoreError {
    fn from(err: ValidationError) -> Self {
        StoreError::Core(CoreError::Validation(err))
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(err: serde_json::Error) -> Self {
        StoreError::Serialization(err.to_string())
    }
}

impl From<std::io::Error> for StoreError {
    fn from(err: std::io::Error) -> Self {
        StoreError::ConfigLoadFailed(err.to_string())
    }
}

impl From<toml::de::Error> for StoreError {
    fn from(err: toml::de::Error) -> Self {
        StoreError::ConfigLoadFailed(err.to_string())
    }
}

impl From<toml::ser::Error> for StoreError {
    fn from(err: toml::ser::Error) -> Self {
        StoreError::ConfigSaveFailed(err.to_string())
    }
}

// =============================================================================
// Error Categorization (for retry logic)
// =============================================================================

impl SyncError {
    /// Returns true if the sync can be attempted again.
    ///
    /// ## Retryable Errors
    /// - Connection failures
    /// - Timeouts
    ///
    /// ## Non-Retryable Errors
    /// - Sync disabled by configuration
    pub fn is_retryable(&self) -> bool {
        matches!(self, SyncError::ConnectionFailed(_) | SyncError::Timeout(_))
    }
}

impl StoreError {
    /// Returns true if repeating the same call may succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            StoreError::Sync(err) => err.is_retryable(),
            StoreError::Storage(DbError::PoolExhausted) => true,
            _ => false,
        }
    }
}
