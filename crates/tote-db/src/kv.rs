//! # Key-Value Store Seam
//!
//! The persistence service the cart store is constructed with.
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────────┐
//! │  get(key) -> Option<String>      absent key is Ok(None), not an error │
//! │  set(key, value) -> ()           last write wins, whole value         │
//! └──────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! No multi-key atomicity is offered. Two `set` calls are two writes.

use async_trait::async_trait;

use crate::error::DbResult;

/// Flat string key-value storage.
///
/// Implementations must be safe to share behind an `Arc`.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    /// Reads the value stored under `key`.
    async fn get(&self, key: &str) -> DbResult<Option<String>>;

    /// Stores `value` under `key`, replacing any previous value.
    async fn set(&self, key: &str, value: &str) -> DbResult<()>;
}

/// Default namespace for cart keys.
pub const DEFAULT_NAMESPACE: &str = "tote";

/// Scoped key names for the two cart slots.
///
/// ```text
/// namespace "tote"  →  "tote:guest_cart"
///                      "tote:session_token"
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CartKeys {
    guest_cart: String,
    session_token: String,
}

impl CartKeys {
    /// Builds the key names under `namespace`.
    pub fn new(namespace: &str) -> Self {
        CartKeys {
            guest_cart: format!("{}:guest_cart", namespace),
            session_token: format!("{}:session_token", namespace),
        }
    }

    /// Key of the persisted guest cart record.
    pub fn guest_cart(&self) -> &str {
        &self.guest_cart
    }

    /// Key of the active session marker.
    pub fn session_token(&self) -> &str {
        &self.session_token
    }
}

impl Default for CartKeys {
    fn default() -> Self {
        Self::new(DEFAULT_NAMESPACE)
    }
}
