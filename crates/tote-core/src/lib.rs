//! # tote-core: Pure Cart Logic for Tote
//!
//! This crate is the **heart** of Tote. It owns the cart data model and every
//! rule about it, as pure functions with zero I/O dependencies.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                          Tote Architecture                              │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                    UI layer (mobile app)                        │   │
//! │  │    Product list ──► Cart badge ──► Cart screen ──► Sign in     │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                 tote-store (CartStore service)                  │   │
//! │  │    initialize, add_item, update_quantity, sync_with_user_account│   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │               ★ tote-core (THIS CRATE) ★                        │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────┐  ┌───────────┐  ┌───────────┐  ┌───────────┐  │   │
//! │  │   │   types   │  │   money   │  │   cart    │  │ validation│  │   │
//! │  │   │  Product  │  │   Money   │  │   Cart    │  │   rules   │  │   │
//! │  │   │  Session  │  │  (cents)  │  │ LineItem  │  │  checks   │  │   │
//! │  │   └───────────┘  └───────────┘  └───────────┘  └───────────┘  │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO STORAGE • NO NETWORK • PURE FUNCTIONS            │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                tote-db (key-value persistence)                  │   │
//! │  │             SQLite kv_store table, in-memory store              │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Input types (Product, SessionToken)
//! - [`money`] - Money type with integer arithmetic (no floating point!)
//! - [`cart`] - Cart and CartLineItem with invariant recomputation
//! - [`error`] - Domain error types
//! - [`validation`] - Input validation
//!
//! ## Example Usage
//!
//! ```rust
//! use tote_core::{Cart, Money, Product};
//!
//! let mut cart = Cart::new();
//! let shirt = Product::new("A", "Shirt", Money::from_cents(1000));
//!
//! cart.add_item(&shirt, 2, chrono::Utc::now()).unwrap();
//!
//! assert_eq!(cart.item_count(), 2);
//! assert_eq!(cart.total().cents(), 2000);
//! ```

pub mod cart;
pub mod error;
pub mod money;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use cart::{Cart, CartLineItem};
pub use error::{CoreError, CoreResult, ValidationError};
pub use money::Money;
pub use types::{Product, SessionToken};

/// Maximum length of a product identifier.
///
/// Identifiers are opaque, but an unbounded key would end up inside every
/// persisted cart record.
pub const MAX_PRODUCT_ID_LEN: usize = 128;

/// Maximum length of a session token accepted by the sync operation.
pub const MAX_SESSION_TOKEN_LEN: usize = 4096;
