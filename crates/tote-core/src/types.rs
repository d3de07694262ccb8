//! # Domain Types
//!
//! Input types the cart is built from.
//!
//! ```text
//! ┌─────────────────────────┐          ┌─────────────────────────┐
//! │        Product          │          │      SessionToken       │
//! │  ─────────────────────  │          │  ─────────────────────  │
//! │  id     (opaque key)    │          │  opaque string          │
//! │  name                   │          │  written on sync only   │
//! │  price  (Money, cents)  │          └─────────────────────────┘
//! │  extra  (JSON object)   │
//! └─────────────────────────┘
//! ```
//!
//! `Product::extra` holds whatever other fields the catalog sends along
//! (image URL, variant, brand...). It is flattened on the wire, so a product
//! serializes as one flat JSON object.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

use crate::error::ValidationError;
use crate::money::Money;
use crate::validation;

// =============================================================================
// Product
// =============================================================================

/// A product as handed to `add_item`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    /// Opaque product identifier, unique key within a cart.
    pub id: String,

    /// Display name.
    #[serde(default)]
    pub name: String,

    /// Unit price in cents. Must not be negative.
    pub price: Money,

    /// Arbitrary extra product fields.
    #[serde(flatten, default)]
    pub extra: Map<String, Value>,
}

impl Product {
    /// Creates a product with no extra fields.
    pub fn new(id: impl Into<String>, name: impl Into<String>, price: Money) -> Self {
        Product {
            id: id.into(),
            name: name.into(),
            price,
            extra: Map::new(),
        }
    }

    /// Attaches an extra field, replacing any previous value under `key`.
    pub fn with_extra(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.extra.insert(key.into(), value.into());
        self
    }
}

// =============================================================================
// Session Token
// =============================================================================

/// Opaque token of an authenticated session.
///
/// `Debug` does not print the token itself.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionToken(String);

impl SessionToken {
    /// Creates a session token after validating it.
    pub fn new(token: impl Into<String>) -> Result<Self, ValidationError> {
        let token = token.into();
        validation::validate_session_token(&token)?;
        Ok(SessionToken(token))
    }

    #[inline]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for SessionToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SessionToken(<{} chars>)", self.0.len())
    }
}
