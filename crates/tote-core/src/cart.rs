//! # Cart
//!
//! The guest cart and its line items.
//!
//! ## Derived Totals
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Cart Invariants                                      │
//! │                                                                         │
//! │  items ───────────┬──► item_count = Σ quantity                         │
//! │   (unique by id,  │                                                     │
//! │    quantity ≥ 1)  └──► total      = Σ price × quantity                 │
//! │                                                                         │
//! │  Every mutation re-sums its new items with checked arithmetic and is   │
//! │  rejected (CoreError::TotalOverflow) if either sum leaves i64. The     │
//! │  derived fields are private, so nothing else can set them.             │
//! │                                                                         │
//! │  Loading a persisted record also recomputes, so a record with stale    │
//! │  totals is healed on read.                                              │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Persisted Shape
//! ```json
//! {
//!   "items": [{ "id": "A", "name": "Shirt", "price": 1000, "quantity": 2,
//!               "addedAt": "2026-01-01T00:00:00Z", "color": "blue" }],
//!   "total": 2000,
//!   "itemCount": 2,
//!   "lastUpdated": "2026-01-01T00:00:00Z"
//! }
//! ```
//!
//! Mutating methods take `now` from the caller; only [`Cart::new`] reads the clock.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{CoreError, CoreResult};
use crate::money::Money;
use crate::types::Product;
use crate::validation;

/// Keys owned by the line item itself. Product extras under these names are dropped.
const RESERVED_KEYS: &[&str] = &["id", "name", "price", "quantity", "addedAt"];

// =============================================================================
// Line Item
// =============================================================================

/// One product entry with an associated quantity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartLineItem {
    /// Product ID, unique within the cart.
    pub id: String,

    /// Product name at time of first insertion.
    pub name: String,

    /// Unit price at time of first insertion.
    pub price: Money,

    /// Quantity in cart, always >= 1.
    pub quantity: i64,

    /// When this item was first added.
    pub added_at: DateTime<Utc>,

    /// Extra product fields carried along untouched.
    #[serde(flatten, default)]
    pub extra: Map<String, Value>,
}

impl CartLineItem {
    /// Creates a line item from a product, copying all of its fields.
    pub fn from_product(product: &Product, quantity: i64, now: DateTime<Utc>) -> Self {
        let extra = product
            .extra
            .iter()
            .filter(|(key, _)| !RESERVED_KEYS.contains(&key.as_str()))
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect();

        CartLineItem {
            id: product.id.clone(),
            name: product.name.clone(),
            price: product.price,
            quantity,
            added_at: now,
            extra,
        }
    }

    /// Unit price × quantity, `None` on overflow.
    pub fn line_total(&self) -> Option<Money> {
        self.price.multiply_quantity(self.quantity)
    }
}

/// Σ quantity and Σ price × quantity over `items`, checked.
fn totals(items: &[CartLineItem]) -> CoreResult<(i64, Money)> {
    let mut item_count: i64 = 0;
    let mut total = Money::zero();

    for item in items {
        item_count = item_count
            .checked_add(item.quantity)
            .ok_or(CoreError::TotalOverflow { field: "itemCount" })?;
        total = item
            .line_total()
            .and_then(|line| total.checked_add(line))
            .ok_or(CoreError::TotalOverflow { field: "total" })?;
    }

    Ok((item_count, total))
}

// =============================================================================
// Cart
// =============================================================================

/// The guest cart.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Cart {
    items: Vec<CartLineItem>,
    total: Money,
    item_count: i64,
    last_updated: DateTime<Utc>,
}

impl Cart {
    /// Creates an empty cart stamped with the current time.
    pub fn new() -> Self {
        Self::empty(Utc::now())
    }

    /// Creates an empty cart stamped with `now`.
    pub fn empty(now: DateTime<Utc>) -> Self {
        Cart {
            items: Vec::new(),
            total: Money::zero(),
            item_count: 0,
            last_updated: now,
        }
    }

    // =========================================================================
    // Mutations
    // =========================================================================
    //
    // Each mutation builds the new item list, sums it, and only then replaces
    // the cart state. A rejected call leaves the cart unchanged.

    /// Adds a product, or grows the quantity of the line already holding its id.
    ///
    /// ## Behavior
    /// - Product already in cart: quantity += `quantity`, other fields untouched
    /// - Product not in cart: appended with `added_at = now`
    ///
    /// ## Errors
    /// - `quantity < 1`, empty id or negative price: `CoreError::Validation`
    /// - Line quantity would overflow: `CoreError::QuantityOverflow`
    /// - Cart item count or total would overflow: `CoreError::TotalOverflow`
    pub fn add_item(&mut self, product: &Product, quantity: i64, now: DateTime<Utc>) -> CoreResult<()> {
        validation::validate_quantity(quantity)?;
        validation::validate_product(product)?;

        let mut items = self.items.clone();
        if let Some(item) = items.iter_mut().find(|i| i.id == product.id) {
            item.quantity = item.quantity.checked_add(quantity).ok_or_else(|| {
                CoreError::QuantityOverflow {
                    product_id: product.id.clone(),
                    current: item.quantity,
                    requested: quantity,
                }
            })?;
        } else {
            items.push(CartLineItem::from_product(product, quantity, now));
        }

        self.commit(items, now)
    }

    /// Removes the line with `product_id`.
    ///
    /// Returns `Ok(false)`, leaving the cart untouched, when no such line exists.
    pub fn remove_item(&mut self, product_id: &str, now: DateTime<Utc>) -> CoreResult<bool> {
        if !self.contains(product_id) {
            return Ok(false);
        }

        let items = self
            .items
            .iter()
            .filter(|i| i.id != product_id)
            .cloned()
            .collect();
        self.commit(items, now)?;
        Ok(true)
    }

    /// Sets the quantity of an existing line.
    ///
    /// ## Behavior
    /// - `quantity <= 0`: same as [`Cart::remove_item`]
    /// - Product not in cart: no-op, nothing is inserted
    ///
    /// Returns whether the cart changed. Fails with `CoreError::TotalOverflow`
    /// when the new quantity would overflow the cart totals.
    pub fn update_quantity(&mut self, product_id: &str, quantity: i64, now: DateTime<Utc>) -> CoreResult<bool> {
        if quantity <= 0 {
            return self.remove_item(product_id, now);
        }
        if !self.contains(product_id) {
            return Ok(false);
        }

        let mut items = self.items.clone();
        for item in items.iter_mut().filter(|i| i.id == product_id) {
            item.quantity = quantity;
        }
        self.commit(items, now)?;
        Ok(true)
    }

    /// Empties the cart.
    pub fn clear(&mut self, now: DateTime<Utc>) {
        self.items.clear();
        self.item_count = 0;
        self.total = Money::zero();
        self.last_updated = now;
    }

    /// Rebuilds `item_count` and `total` from the items.
    ///
    /// On overflow the cart is left unchanged.
    pub fn recompute(&mut self) -> CoreResult<()> {
        let (item_count, total) = totals(&self.items)?;
        self.item_count = item_count;
        self.total = total;
        Ok(())
    }

    fn commit(&mut self, items: Vec<CartLineItem>, now: DateTime<Utc>) -> CoreResult<()> {
        let (item_count, total) = totals(&items)?;
        self.items = items;
        self.item_count = item_count;
        self.total = total;
        self.last_updated = now;
        Ok(())
    }

    // =========================================================================
    // Reads
    // =========================================================================

    pub fn items(&self) -> &[CartLineItem] {
        &self.items
    }

    /// Sum of all quantities.
    pub fn item_count(&self) -> i64 {
        self.item_count
    }

    /// Sum of price × quantity over all lines.
    pub fn total(&self) -> Money {
        self.total
    }

    pub fn last_updated(&self) -> DateTime<Utc> {
        self.last_updated
    }

    /// Number of distinct lines.
    pub fn line_count(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn contains(&self, product_id: &str) -> bool {
        self.items.iter().any(|i| i.id == product_id)
    }

    /// Quantity of the matching line, or 0 when absent.
    pub fn quantity_of(&self, product_id: &str) -> i64 {
        self.items
            .iter()
            .find(|i| i.id == product_id)
            .map_or(0, |i| i.quantity)
    }

    // =========================================================================
    // Persistence Shape
    // =========================================================================

    /// Parses a persisted cart record and recomputes its derived fields.
    ///
    /// Lines with a non-positive quantity are dropped and duplicate ids are
    /// folded into the first occurrence.
    ///
    /// A record whose lines cannot be summed without overflow is rejected.
    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        let raw: Cart = serde_json::from_str(json)?;
        raw.normalized()
            .map_err(<serde_json::Error as serde::de::Error>::custom)
    }

    /// Serializes the cart into its persisted record.
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }

    fn normalized(mut self) -> CoreResult<Self> {
        let mut items: Vec<CartLineItem> = Vec::with_capacity(self.items.len());
        for item in self.items.drain(..).filter(|i| i.quantity > 0) {
            match items.iter_mut().find(|kept| kept.id == item.id) {
                Some(kept) => {
                    kept.quantity = kept.quantity.checked_add(item.quantity).ok_or_else(|| {
                        CoreError::QuantityOverflow {
                            product_id: item.id.clone(),
                            current: kept.quantity,
                            requested: item.quantity,
                        }
                    })?;
                }
                None => items.push(item),
            }
        }
        self.items = items;
        self.recompute()?;
        Ok(self)
    }
}

impl Default for Cart {
    fn default() -> Self {
        Self::new()
    }
}
