//! # tote-db: Key-Value Persistence for Tote
//!
//! The cart is persisted as whole JSON blobs in a flat, scoped key-value
//! store. This crate owns that store: the [`KeyValueStore`] seam and its two
//! implementations.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Tote Data Flow                                   │
//! │                                                                         │
//! │  CartStore::add_item                                                   │
//! │       │  get("tote:guest_cart") / set("tote:guest_cart", json)          │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                     tote-db (THIS CRATE)                        │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────────┐    ┌───────────────┐    ┌──────────────┐  │   │
//! │  │   │ KeyValueStore │    │ SqliteKvStore │    │ MemoryKvStore│  │   │
//! │  │   │   (trait)     │◄───│ (repository)  │    │  (tests)     │  │   │
//! │  │   │  get / set    │◄───┼───────────────┼────│              │  │   │
//! │  │   └───────────────┘    └───────┬───────┘    └──────────────┘  │   │
//! │  │                                │                                │   │
//! │  │                        Database (pool.rs)                       │   │
//! │  └────────────────────────────────┼────────────────────────────────┘   │
//! │                                   ▼                                     │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │           SQLite database: kv_store(key, value, updated_at)     │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//!
//! - [`kv`] - The `KeyValueStore` trait and scoped `CartKeys`
//! - [`memory`] - In-memory store with fault injection
//! - [`pool`] - Connection pool creation and configuration
//! - [`migrations`] - Embedded database migrations
//! - [`repository`] - SQLite-backed store
//! - [`error`] - Database error types
//!
//! ## Usage
//!
//! ```rust,ignore
//! use tote_db::{Database, DbConfig, KeyValueStore};
//!
//! let db = Database::new(DbConfig::new("path/to/tote.db")).await?;
//! let kv = db.kv();
//!
//! kv.set("tote:session_token", "abc").await?;
//! assert_eq!(kv.get("tote:session_token").await?.as_deref(), Some("abc"));
//! ```

pub mod error;
pub mod kv;
pub mod memory;
pub mod migrations;
pub mod pool;
pub mod repository;

pub use error::{DbError, DbResult};
pub use kv::{CartKeys, KeyValueStore};
pub use memory::MemoryKvStore;
pub use pool::{Database, DbConfig};
pub use repository::kv::SqliteKvStore;
