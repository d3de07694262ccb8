//! # Repository Module
//!
//! SQLite-backed implementations of the storage seams.
//!
//! ## Available Repositories
//!
//! - [`kv::SqliteKvStore`] - `KeyValueStore` over the `kv_store` table

pub mod kv;
