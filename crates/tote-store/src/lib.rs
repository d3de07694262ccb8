//! # tote-store: Cart Store Service for Tote
//!
//! The guest shopping cart a UI layer talks to: add, remove, update, clear,
//! derived totals and a placeholder sync to a signed-in account.
//!
//! ## Architecture Overview
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                          Cart Store Service                             │
//! │                                                                         │
//! │  ┌──────────────────────────────────────────────────────────────────┐  │
//! │  │                     CartStore (store.rs)                         │  │
//! │  │                                                                  │  │
//! │  │  initialize / get_cart / add_item / remove_item /                │  │
//! │  │  update_quantity / clear_cart / sync_with_user_account           │  │
//! │  └───────────┬───────────────────────────────────┬──────────────────┘  │
//! │              │                                   │                      │
//! │              ▼                                   ▼                      │
//! │  ┌────────────────────────┐          ┌────────────────────────────┐    │
//! │  │ dyn KeyValueStore      │          │ dyn AccountSync (sync.rs)  │    │
//! │  │ (tote-db)              │          │                            │    │
//! │  │ SqliteKvStore          │          │ SimulatedAccountSync       │    │
//! │  │ MemoryKvStore          │          │ OfflineAccountSync         │    │
//! │  └────────────────────────┘          └────────────────────────────┘    │
//! │                                                                         │
//! │  Cart math (recompute itemCount/total) lives in tote-core.             │
//! │  StoreConfig (config.rs) picks the namespace, database and sync mode.  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust,ignore
//! use std::sync::Arc;
//! use tote_db::Database;
//! use tote_store::{CartStore, StoreConfig};
//!
//! let config = StoreConfig::load_or_default(None);
//! let db = Database::new(config.db_config()?).await?;
//!
//! let store = CartStore::from_config(Arc::new(db.kv()), &config);
//! store.initialize().await;
//!
//! let cart = store.add_item(&product, 2).await?;
//! println!("{} items, {}", cart.item_count(), cart.total());
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod config;
pub mod error;
pub mod store;
pub mod sync;

// =============================================================================
// Re-exports
// =============================================================================

pub use config::{StorageSettings, StoreConfig, SyncMode, SyncSettings};
pub use error::{StoreError, StoreResult, SyncError, SyncResult};
pub use store::CartStore;
pub use sync::{AccountSync, OfflineAccountSync, RetryPolicy, SimulatedAccountSync, SyncOutcome};
