//! # Error Types
//!
//! Domain-specific error types for tote-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  tote-core errors (this file)                                          │
//! │  ├── CoreError        - Cart rule violations                           │
//! │  └── ValidationError  - Input validation failures                      │
//! │                                                                         │
//! │  tote-db errors (separate crate)                                       │
//! │  └── DbError          - Key-value storage failures                     │
//! │                                                                         │
//! │  tote-store errors                                                     │
//! │  └── StoreError       - What callers of CartStore see                  │
//! │                                                                         │
//! │  Flow: ValidationError → CoreError → StoreError → UI layer             │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Missing items and empty carts are NOT errors. Those cases are no-ops.

use thiserror::Error;

// =============================================================================
// Core Error
// =============================================================================

/// Cart rule violations.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Adding to an existing line would overflow its quantity.
    ///
    /// ## When This Occurs
    /// - `add_item` on a line whose quantity plus the increment exceeds `i64::MAX`
    #[error("Quantity overflow for product {product_id}: {current} + {requested}")]
    QuantityOverflow {
        product_id: String,
        current: i64,
        requested: i64,
    },

    /// The cart-wide item count or total would not fit in an `i64`.
    ///
    /// ## When This Occurs
    /// - `add_item` / `update_quantity` pushing Σ quantity or Σ price × quantity past `i64::MAX`
    /// - Loading a persisted record whose lines cannot be summed
    #[error("Cart {field} overflow")]
    TotalOverflow { field: &'static str },

    /// Validation error (wraps ValidationError).
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors.
///
/// Raised before any cart state is touched, so a rejected call leaves the
/// cart exactly as it was.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    /// A required field is missing or empty.
    #[error("{field} is required")]
    Required { field: String },

    /// Field value is too long.
    #[error("{field} must be at most {max} characters")]
    TooLong { field: String, max: usize },

    /// Value must be positive (>= 1).
    #[error("{field} must be positive, got {value}")]
    MustBePositive { field: String, value: i64 },

    /// Value must be zero or greater.
    #[error("{field} must not be negative, got {value}")]
    MustNotBeNegative { field: String, value: i64 },
}

// =============================================================================
// Result Type Alias
// =============================================================================

/// Convenience type alias for Results with CoreError.
pub type CoreResult<T> = Result<T, CoreError>;
