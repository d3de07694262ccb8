//! # Validation Module
//!
//! Input checks run before a cart operation touches any state.
//!
//! ## Usage
//! ```rust
//! use tote_core::validation::{validate_product_id, validate_quantity};
//!
//! assert!(validate_product_id("SKU-1").is_ok());
//! assert!(validate_quantity(0).is_err());
//! ```

use crate::error::ValidationError;
use crate::money::Money;
use crate::types::Product;
use crate::{MAX_PRODUCT_ID_LEN, MAX_SESSION_TOKEN_LEN};

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

/// Validates a product identifier.
///
/// ## Rules
/// - Must not be empty or whitespace only
/// - At most [`MAX_PRODUCT_ID_LEN`] characters
pub fn validate_product_id(id: &str) -> ValidationResult<()> {
    if id.trim().is_empty() {
        return Err(ValidationError::Required {
            field: "id".to_string(),
        });
    }

    if id.chars().count() > MAX_PRODUCT_ID_LEN {
        return Err(ValidationError::TooLong {
            field: "id".to_string(),
            max: MAX_PRODUCT_ID_LEN,
        });
    }

    Ok(())
}

/// Validates a quantity passed to `add_item`.
///
/// Zero and negative quantities are rejected rather than clamped.
pub fn validate_quantity(quantity: i64) -> ValidationResult<()> {
    if quantity < 1 {
        return Err(ValidationError::MustBePositive {
            field: "quantity".to_string(),
            value: quantity,
        });
    }
    Ok(())
}

/// Validates a unit price.
pub fn validate_price(price: Money) -> ValidationResult<()> {
    if price.is_negative() {
        return Err(ValidationError::MustNotBeNegative {
            field: "price".to_string(),
            value: price.cents(),
        });
    }
    Ok(())
}

/// Validates every field of a product that the cart relies on.
pub fn validate_product(product: &Product) -> ValidationResult<()> {
    validate_product_id(&product.id)?;
    validate_price(product.price)
}

/// Validates a session token.
pub fn validate_session_token(token: &str) -> ValidationResult<()> {
    if token.trim().is_empty() {
        return Err(ValidationError::Required {
            field: "session_token".to_string(),
        });
    }

    if token.len() > MAX_SESSION_TOKEN_LEN {
        return Err(ValidationError::TooLong {
            field: "session_token".to_string(),
            max: MAX_SESSION_TOKEN_LEN,
        });
    }

    Ok(())
}
