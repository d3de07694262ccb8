//! # Cart Store
//!
//! The guest cart service. Every operation is a read-modify-write over two
//! scoped keys of an injected [`KeyValueStore`].
//!
//! ## Operation Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         CartStore Operation                             │
//! │                                                                         │
//! │  add_item / remove_item / update_quantity                              │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  write_lock.lock() ◄── one writer at a time (held across sync too)     │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  kv.get("{ns}:guest_cart") ──► missing / malformed? ──► empty Cart     │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  Cart::add_item / remove_item / update_quantity (tote-core)            │
//! │       │  recompute itemCount + total, stamp lastUpdated                │
//! │       ▼                                                                 │
//! │  kv.set("{ns}:guest_cart", json) ──► return Cart                       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Error Policy
//! - `initialize` / `load_user_cart`: storage failures are logged and swallowed
//! - everything else: storage failures are returned as [`StoreError::Storage`]
//! - a persisted record that doesn't parse is logged and read as absent

use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tote_core::{Cart, CoreResult, Money, Product, SessionToken};
use tote_db::{CartKeys, KeyValueStore};
use tracing::{debug, info, warn};

use crate::config::StoreConfig;
use crate::error::{StoreResult, SyncError};
use crate::sync::{AccountSync, RetryPolicy, SyncOutcome};

/// How long `sync_with_user_account` waits for the account before giving up.
pub const DEFAULT_SYNC_TIMEOUT: Duration = Duration::from_secs(30);

/// Guest cart service over a key-value store.
///
/// ## Example
/// ```rust,ignore
/// let store = CartStore::new(Arc::new(MemoryKvStore::new()), sync, CartKeys::default());
/// store.initialize().await;
/// let cart = store.add_item(&product, 2).await?;
/// ```
pub struct CartStore {
    kv: Arc<dyn KeyValueStore>,
    sync: Arc<dyn AccountSync>,
    keys: CartKeys,
    sync_timeout: Duration,
    write_lock: Mutex<()>,
}

impl std::fmt::Debug for CartStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CartStore").field("keys", &self.keys).finish_non_exhaustive()
    }
}

impl CartStore {
    /// Creates a store over `kv`, syncing through `sync`.
    pub fn new(kv: Arc<dyn KeyValueStore>, sync: Arc<dyn AccountSync>, keys: CartKeys) -> Self {
        CartStore {
            kv,
            sync,
            keys,
            sync_timeout: DEFAULT_SYNC_TIMEOUT,
            write_lock: Mutex::new(()),
        }
    }

    /// Creates a store with the namespace, sync mode and sync timeout from `config`.
    pub fn from_config(kv: Arc<dyn KeyValueStore>, config: &StoreConfig) -> Self {
        Self::new(kv, config.account_sync(), config.cart_keys())
            .with_sync_timeout(config.sync_timeout())
    }

    /// Sets how long a sync may take before failing with `SyncError::Timeout`.
    pub fn with_sync_timeout(mut self, timeout: Duration) -> Self {
        self.sync_timeout = timeout;
        self
    }

    // =========================================================================
    // Lifecycle
    // =========================================================================

    /// Prepares the store for use. Never fails.
    ///
    /// With a persisted session token this loads the user cart; otherwise it
    /// makes sure a guest cart record exists.
    pub async fn initialize(&self) {
        let _guard = self.write_lock.lock().await;

        match self.read_token().await {
            Ok(Some(_)) => {
                info!("Session token found, loading user cart");
                self.load_user_cart_locked().await;
            }
            Ok(None) => {
                info!("No session token, initializing guest cart");
                self.ensure_guest_cart_logged().await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to read session token, continuing as guest");
                self.ensure_guest_cart_logged().await;
            }
        }
    }

    /// Makes sure a guest cart record exists. Never fails.
    ///
    /// There is no account-side cart yet, so this is the guest path.
    pub async fn load_user_cart(&self) {
        let _guard = self.write_lock.lock().await;
        self.load_user_cart_locked().await;
    }

    async fn load_user_cart_locked(&self) {
        self.ensure_guest_cart_logged().await;
    }

    async fn ensure_guest_cart_logged(&self) {
        if let Err(e) = self.ensure_guest_cart().await {
            warn!(error = %e, "Failed to initialize guest cart");
        }
    }

    async fn ensure_guest_cart(&self) -> StoreResult<()> {
        if self.read_cart().await?.is_some() {
            debug!("Guest cart already present");
            return Ok(());
        }

        self.write_cart(&Cart::new()).await?;
        info!(key = %self.keys.guest_cart(), "Created empty guest cart");
        Ok(())
    }

    // =========================================================================
    // Reads
    // =========================================================================

    /// Returns the persisted cart, or a fresh empty one. Never writes.
    pub async fn get_cart(&self) -> StoreResult<Cart> {
        let _guard = self.write_lock.lock().await;
        Ok(self.read_cart().await?.unwrap_or_else(Cart::new))
    }

    /// Sum of all quantities.
    pub async fn get_item_count(&self) -> StoreResult<i64> {
        Ok(self.get_cart().await?.item_count())
    }

    pub async fn get_total(&self) -> StoreResult<Money> {
        Ok(self.get_cart().await?.total())
    }

    pub async fn is_in_cart(&self, product_id: &str) -> StoreResult<bool> {
        Ok(self.get_cart().await?.contains(product_id))
    }

    /// Quantity in the cart, 0 when absent.
    pub async fn get_item_quantity(&self, product_id: &str) -> StoreResult<i64> {
        Ok(self.get_cart().await?.quantity_of(product_id))
    }

    /// The token persisted by the last successful sync, if any.
    pub async fn session_token(&self) -> StoreResult<Option<SessionToken>> {
        let _guard = self.write_lock.lock().await;
        Ok(self.read_token().await?.and_then(|raw| match SessionToken::new(raw) {
            Ok(token) => Some(token),
            Err(e) => {
                warn!(error = %e, "Ignoring invalid persisted session token");
                None
            }
        }))
    }

    // =========================================================================
    // Mutations
    // =========================================================================

    /// Adds `quantity` of `product`, merging into an existing line with the same id.
    pub async fn add_item(&self, product: &Product, quantity: i64) -> StoreResult<Cart> {
        debug!(product_id = %product.id, quantity, "Adding item to cart");
        self.mutate("add_item", |cart, now| cart.add_item(product, quantity, now))
            .await
    }

    /// Removes the line for `product_id`. Absent id is a no-op.
    pub async fn remove_item(&self, product_id: &str) -> StoreResult<Cart> {
        debug!(product_id = %product_id, "Removing item from cart");
        self.mutate("remove_item", |cart, now| {
            if !cart.remove_item(product_id, now)? {
                debug!(product_id = %product_id, "Item not in cart");
            }
            Ok(())
        })
        .await
    }

    /// Sets the quantity of an existing line. `quantity <= 0` removes it.
    pub async fn update_quantity(&self, product_id: &str, quantity: i64) -> StoreResult<Cart> {
        debug!(product_id = %product_id, quantity, "Updating item quantity");
        self.mutate("update_quantity", |cart, now| {
            if !cart.update_quantity(product_id, quantity, now)? {
                debug!(product_id = %product_id, "Item not in cart");
            }
            Ok(())
        })
        .await
    }

    /// Persists and returns an empty cart.
    pub async fn clear_cart(&self) -> StoreResult<Cart> {
        let _guard = self.write_lock.lock().await;
        let cart = Cart::new();
        self.write_cart(&cart).await?;
        info!("Cart cleared");
        Ok(cart)
    }

    /// Read, apply, persist. The cart is written even when `apply` changed nothing.
    async fn mutate<F>(&self, op: &'static str, apply: F) -> StoreResult<Cart>
    where
        F: FnOnce(&mut Cart, DateTime<Utc>) -> CoreResult<()> + Send,
    {
        let _guard = self.write_lock.lock().await;

        let now = Utc::now();
        let mut cart = self.read_cart().await?.unwrap_or_else(|| Cart::empty(now));
        apply(&mut cart, now)?;
        self.write_cart(&cart).await?;

        debug!(
            op,
            lines = cart.line_count(),
            item_count = cart.item_count(),
            total_cents = cart.total().cents(),
            "Cart persisted"
        );
        Ok(cart)
    }

    // =========================================================================
    // Account Sync
    // =========================================================================

    /// Hands the guest cart to the account behind `token`.
    ///
    /// ## Behavior
    /// - Empty cart: returns `synced_items: 0` at once, writes nothing
    /// - Otherwise: awaits [`AccountSync::push_guest_cart`], then persists the token
    /// - No answer within the sync timeout: `SyncError::Timeout`, token not written
    ///
    /// The local cart is left as it is. Cart mutations issued while a sync is
    /// pending wait for it to finish. Failures are returned, never retried.
    pub async fn sync_with_user_account(&self, token: &SessionToken) -> StoreResult<SyncOutcome> {
        let _guard = self.write_lock.lock().await;

        let cart = self.read_cart().await?.unwrap_or_else(Cart::new);
        if cart.is_empty() {
            debug!("Guest cart empty, nothing to sync");
            return Ok(SyncOutcome { synced_items: 0 });
        }

        info!(lines = cart.line_count(), "Syncing guest cart with user account");
        let push = self.sync.push_guest_cart(token, &cart);
        let synced_items = tokio::time::timeout(self.sync_timeout, push)
            .await
            .map_err(|_| {
                warn!(timeout_secs = self.sync_timeout.as_secs(), "Account sync timed out");
                SyncError::Timeout(self.sync_timeout.as_secs())
            })??;

        self.kv.set(self.keys.session_token(), token.as_str()).await?;
        info!(synced_items, "Guest cart synced");

        Ok(SyncOutcome { synced_items })
    }

    /// [`CartStore::sync_with_user_account`] with exponential backoff on
    /// retryable failures.
    pub async fn sync_with_retry(
        &self,
        token: &SessionToken,
        policy: RetryPolicy,
    ) -> StoreResult<SyncOutcome> {
        let store = self;
        backoff::future::retry(policy.to_backoff(), move || async move {
            store.sync_with_user_account(token).await.map_err(|e| {
                if e.is_retryable() {
                    warn!(error = %e, "Sync attempt failed, will retry");
                    backoff::Error::transient(e)
                } else {
                    backoff::Error::permanent(e)
                }
            })
        })
        .await
    }

    // =========================================================================
    // Storage Helpers (caller holds the lock)
    // =========================================================================

    async fn read_cart(&self) -> StoreResult<Option<Cart>> {
        let Some(raw) = self.kv.get(self.keys.guest_cart()).await? else {
            return Ok(None);
        };

        match Cart::from_json(&raw) {
            Ok(cart) => Ok(Some(cart)),
            Err(e) => {
                warn!(
                    key = %self.keys.guest_cart(),
                    error = %e,
                    "Malformed cart record, treating as empty"
                );
                Ok(None)
            }
        }
    }

    async fn write_cart(&self, cart: &Cart) -> StoreResult<()> {
        let json = cart.to_json()?;
        self.kv.set(self.keys.guest_cart(), &json).await?;
        Ok(())
    }

    async fn read_token(&self) -> StoreResult<Option<String>> {
        Ok(self.kv.get(self.keys.session_token()).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{StoreError, SyncResult};
    use crate::sync::{OfflineAccountSync, SimulatedAccountSync};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tote_core::CoreError;
    use tote_db::{Database, DbConfig, MemoryKvStore};

    const LATENCY: Duration = Duration::from_millis(1500);

    fn store_over(kv: Arc<MemoryKvStore>) -> CartStore {
        CartStore::new(
            kv,
            Arc::new(SimulatedAccountSync::new(LATENCY)),
            CartKeys::default(),
        )
    }

    fn product(id: &str, cents: i64) -> Product {
        Product::new(id, format!("Product {}", id), Money::from_cents(cents))
    }

    fn token() -> SessionToken {
        SessionToken::new("session-abc").unwrap()
    }

    // =========================================================================
    // Lifecycle
    // =========================================================================

    #[tokio::test]
    async fn test_initialize_creates_empty_cart() {
        let kv = Arc::new(MemoryKvStore::new());
        let store = store_over(kv.clone());

        store.initialize().await;

        assert_eq!(kv.write_count(), 1);
        let raw = kv.get("tote:guest_cart").await.unwrap().unwrap();
        let cart = Cart::from_json(&raw).unwrap();
        assert!(cart.is_empty());
        assert_eq!(cart.total(), Money::zero());
    }

    #[tokio::test]
    async fn test_initialize_keeps_existing_cart() {
        let kv = Arc::new(MemoryKvStore::new());
        let store = store_over(kv.clone());
        store.add_item(&product("A", 100), 2).await.unwrap();
        let writes = kv.write_count();

        store.initialize().await;

        assert_eq!(kv.write_count(), writes);
        assert_eq!(store.get_item_quantity("A").await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_initialize_with_session_token() {
        let kv = Arc::new(MemoryKvStore::new());
        kv.set("tote:session_token", "existing").await.unwrap();
        let store = store_over(kv.clone());

        store.initialize().await;

        assert!(kv.get("tote:guest_cart").await.unwrap().is_some());
        assert_eq!(
            store.session_token().await.unwrap().unwrap().as_str(),
            "existing"
        );
    }

    #[tokio::test]
    async fn test_initialize_swallows_storage_failures() {
        let kv = Arc::new(MemoryKvStore::new());
        kv.fail_reads(true);
        let store = store_over(kv.clone());

        store.initialize().await;
        store.load_user_cart().await;

        assert_eq!(kv.write_count(), 0);
    }

    #[tokio::test]
    async fn test_load_user_cart_creates_cart() {
        let kv = Arc::new(MemoryKvStore::new());
        let store = store_over(kv.clone());

        store.load_user_cart().await;

        assert!(kv.get("tote:guest_cart").await.unwrap().is_some());
    }

    // =========================================================================
    // Reads
    // =========================================================================

    #[tokio::test]
    async fn test_get_cart_never_writes() {
        let kv = Arc::new(MemoryKvStore::new());
        let store = store_over(kv.clone());

        let cart = store.get_cart().await.unwrap();

        assert!(cart.is_empty());
        assert_eq!(kv.write_count(), 0);
        assert!(kv.is_empty().await);
    }

    #[tokio::test]
    async fn test_get_cart_propagates_read_failure() {
        let kv = Arc::new(MemoryKvStore::new());
        kv.fail_reads(true);
        let store = store_over(kv);

        let err = store.get_cart().await.unwrap_err();
        assert!(matches!(err, StoreError::Storage(_)));
    }

    #[tokio::test]
    async fn test_malformed_record_reads_as_empty() {
        let kv = Arc::new(MemoryKvStore::new());
        kv.set("tote:guest_cart", "{not json").await.unwrap();
        let store = store_over(kv.clone());

        assert!(store.get_cart().await.unwrap().is_empty());

        let cart = store.add_item(&product("A", 250), 1).await.unwrap();
        assert_eq!(cart.total(), Money::from_cents(250));
    }

    #[tokio::test]
    async fn test_stale_totals_are_recomputed_on_read() {
        let kv = Arc::new(MemoryKvStore::new());
        kv.set(
            "tote:guest_cart",
            r#"{"items":[{"id":"A","name":"a","price":100,"quantity":2,"addedAt":"2024-01-01T00:00:00Z"}],
               "total":5,"itemCount":9,"lastUpdated":"2024-01-01T00:00:00Z"}"#,
        )
        .await
        .unwrap();
        let store = store_over(kv);

        assert_eq!(store.get_item_count().await.unwrap(), 2);
        assert_eq!(store.get_total().await.unwrap(), Money::from_cents(200));
    }

    #[tokio::test]
    async fn test_decimal_price_record_survives_next_mutation() {
        let kv = Arc::new(MemoryKvStore::new());
        kv.set(
            "tote:guest_cart",
            r#"{"items":[{"id":"A","name":"a","price":19.99,"quantity":2,"addedAt":"2024-01-01T00:00:00Z"}],
               "total":39.98,"itemCount":2,"lastUpdated":"2024-01-01T00:00:00Z"}"#,
        )
        .await
        .unwrap();
        let store = store_over(kv.clone());

        let cart = store.add_item(&product("B", 500), 1).await.unwrap();

        assert_eq!(cart.line_count(), 2);
        assert_eq!(cart.quantity_of("A"), 2);
        assert_eq!(cart.total(), Money::from_cents(3998 + 500));

        let raw = kv.get("tote:guest_cart").await.unwrap().unwrap();
        let value: serde_json::Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(value["items"][0]["price"], 1999);
        assert_eq!(value["total"], 4498);
    }

    #[tokio::test]
    async fn test_derived_reads() {
        let store = store_over(Arc::new(MemoryKvStore::new()));
        store.add_item(&product("A", 300), 2).await.unwrap();

        assert!(store.is_in_cart("A").await.unwrap());
        assert!(!store.is_in_cart("B").await.unwrap());
        assert_eq!(store.get_item_quantity("A").await.unwrap(), 2);
        assert_eq!(store.get_item_quantity("B").await.unwrap(), 0);
        assert_eq!(store.get_item_count().await.unwrap(), 2);
        assert_eq!(store.get_total().await.unwrap(), Money::from_cents(600));
    }

    // =========================================================================
    // Mutations
    // =========================================================================

    #[tokio::test]
    async fn test_cart_walkthrough() {
        let store = store_over(Arc::new(MemoryKvStore::new()));
        store.initialize().await;

        let cart = store.add_item(&product("A", 1099), 2).await.unwrap();
        assert_eq!(cart.item_count(), 2);
        assert_eq!(cart.total(), Money::from_cents(2198));

        let cart = store.add_item(&product("B", 500), 1).await.unwrap();
        assert_eq!(cart.item_count(), 3);
        assert_eq!(cart.total(), Money::from_cents(2698));

        let cart = store.add_item(&product("A", 1099), 1).await.unwrap();
        assert_eq!(cart.line_count(), 2);
        assert_eq!(cart.quantity_of("A"), 3);
        assert_eq!(cart.total(), Money::from_cents(3797));

        let cart = store.update_quantity("B", 0).await.unwrap();
        assert!(!cart.contains("B"));
        assert_eq!(cart.item_count(), 3);

        let cart = store.remove_item("missing").await.unwrap();
        assert_eq!(cart.item_count(), 3);

        let cart = store.clear_cart().await.unwrap();
        assert!(cart.is_empty());
        assert_eq!(store.get_total().await.unwrap(), Money::zero());
    }

    #[tokio::test]
    async fn test_add_existing_keeps_first_fields() {
        let store = store_over(Arc::new(MemoryKvStore::new()));

        let first = store.add_item(&product("A", 100), 1).await.unwrap();
        let added_at = first.items()[0].added_at;

        let renamed = Product::new("A", "Renamed", Money::from_cents(999));
        let cart = store.add_item(&renamed, 1).await.unwrap();

        assert_eq!(cart.items()[0].name, "Product A");
        assert_eq!(cart.items()[0].price, Money::from_cents(100));
        assert_eq!(cart.items()[0].added_at, added_at);
        assert_eq!(cart.quantity_of("A"), 2);
    }

    #[tokio::test]
    async fn test_add_item_rejects_non_positive_quantity() {
        let kv = Arc::new(MemoryKvStore::new());
        let store = store_over(kv.clone());

        let err = store.add_item(&product("A", 100), 0).await.unwrap_err();

        assert!(matches!(err, StoreError::Core(CoreError::Validation(_))));
        assert_eq!(kv.write_count(), 0);
    }

    #[tokio::test]
    async fn test_total_overflow_is_rejected_and_not_persisted() {
        let kv = Arc::new(MemoryKvStore::new());
        let store = store_over(kv.clone());
        let half = i64::MAX / 2 + 1;
        store.add_item(&product("A", half), 1).await.unwrap();
        let writes = kv.write_count();

        let err = store.add_item(&product("B", half), 1).await.unwrap_err();
        assert!(matches!(err, StoreError::Core(CoreError::TotalOverflow { .. })));

        let err = store.update_quantity("A", i64::MAX).await.unwrap_err();
        assert!(matches!(err, StoreError::Core(CoreError::TotalOverflow { .. })));

        assert_eq!(kv.write_count(), writes);
        assert_eq!(store.get_total().await.unwrap(), Money::from_cents(half));
        assert_eq!(store.get_item_quantity("A").await.unwrap(), 1);
        assert!(!store.is_in_cart("B").await.unwrap());
    }

    #[tokio::test]
    async fn test_update_quantity_absent_does_not_insert() {
        let store = store_over(Arc::new(MemoryKvStore::new()));

        let cart = store.update_quantity("A", 5).await.unwrap();

        assert!(cart.is_empty());
        assert!(!store.is_in_cart("A").await.unwrap());
    }

    #[tokio::test]
    async fn test_update_quantity_sets_absolute_value() {
        let store = store_over(Arc::new(MemoryKvStore::new()));
        store.add_item(&product("A", 250), 4).await.unwrap();

        let cart = store.update_quantity("A", 1).await.unwrap();

        assert_eq!(cart.quantity_of("A"), 1);
        assert_eq!(cart.total(), Money::from_cents(250));
    }

    #[tokio::test]
    async fn test_write_failure_surfaces_from_mutation() {
        let kv = Arc::new(MemoryKvStore::new());
        kv.fail_writes(true);
        let store = store_over(kv);

        let err = store.add_item(&product("A", 100), 1).await.unwrap_err();
        assert!(matches!(err, StoreError::Storage(_)));

        let err = store.clear_cart().await.unwrap_err();
        assert!(matches!(err, StoreError::Storage(_)));
    }

    #[tokio::test]
    async fn test_persisted_record_shape() {
        let kv = Arc::new(MemoryKvStore::new());
        let store = store_over(kv.clone());
        store
            .add_item(&product("A", 1099).with_extra("color", "red"), 2)
            .await
            .unwrap();

        let raw = kv.get("tote:guest_cart").await.unwrap().unwrap();
        let value: serde_json::Value = serde_json::from_str(&raw).unwrap();

        assert_eq!(value["itemCount"], 2);
        assert_eq!(value["total"], 2198);
        assert!(value["lastUpdated"].is_string());
        assert_eq!(value["items"][0]["price"], 1099);
        assert_eq!(value["items"][0]["color"], "red");
        assert!(value["items"][0]["addedAt"].is_string());
    }

    #[tokio::test]
    async fn test_namespaces_are_isolated() {
        let kv = Arc::new(MemoryKvStore::new());
        let shop = CartStore::new(
            kv.clone(),
            Arc::new(OfflineAccountSync),
            CartKeys::new("shop"),
        );
        let other = store_over(kv);

        shop.add_item(&product("A", 100), 1).await.unwrap();

        assert!(shop.is_in_cart("A").await.unwrap());
        assert!(!other.is_in_cart("A").await.unwrap());
    }

    #[tokio::test]
    async fn test_concurrent_adds_do_not_lose_updates() {
        let store = store_over(Arc::new(MemoryKvStore::new()));
        let a = product("A", 100);

        let (first, second) = tokio::join!(store.add_item(&a, 1), store.add_item(&a, 1));
        first.unwrap();
        second.unwrap();

        assert_eq!(store.get_item_quantity("A").await.unwrap(), 2);
    }

    // =========================================================================
    // Account Sync
    // =========================================================================

    #[tokio::test(start_paused = true)]
    async fn test_sync_empty_cart_returns_immediately() {
        let kv = Arc::new(MemoryKvStore::new());
        let store = store_over(kv.clone());
        let start = tokio::time::Instant::now();

        let outcome = store.sync_with_user_account(&token()).await.unwrap();

        assert_eq!(outcome.synced_items, 0);
        assert!(start.elapsed() < LATENCY);
        assert_eq!(kv.write_count(), 0);
        assert!(store.session_token().await.unwrap().is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_sync_waits_then_persists_token() {
        let store = store_over(Arc::new(MemoryKvStore::new()));
        store.add_item(&product("A", 100), 3).await.unwrap();
        store.add_item(&product("B", 200), 1).await.unwrap();
        let before = store.get_cart().await.unwrap();
        let start = tokio::time::Instant::now();

        let outcome = store.sync_with_user_account(&token()).await.unwrap();

        assert_eq!(outcome.synced_items, 2);
        assert!(start.elapsed() >= LATENCY);
        assert_eq!(
            store.session_token().await.unwrap().unwrap().as_str(),
            "session-abc"
        );
        assert_eq!(store.get_cart().await.unwrap(), before);
    }

    #[tokio::test]
    async fn test_sync_failure_writes_no_token() {
        let kv = Arc::new(MemoryKvStore::new());
        let store = CartStore::new(kv, Arc::new(OfflineAccountSync), CartKeys::default());
        store.add_item(&product("A", 100), 1).await.unwrap();

        let err = store.sync_with_user_account(&token()).await.unwrap_err();

        assert!(matches!(err, StoreError::Sync(SyncError::Disabled)));
        assert!(store.session_token().await.unwrap().is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_slow_sync_times_out_without_token() {
        let store = CartStore::new(
            Arc::new(MemoryKvStore::new()),
            Arc::new(SimulatedAccountSync::new(Duration::from_secs(60))),
            CartKeys::default(),
        )
        .with_sync_timeout(Duration::from_secs(5));
        store.add_item(&product("A", 100), 1).await.unwrap();

        let err = store.sync_with_user_account(&token()).await.unwrap_err();

        assert!(matches!(err, StoreError::Sync(SyncError::Timeout(5))));
        assert!(err.is_retryable());
        assert!(store.session_token().await.unwrap().is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_mutation_waits_for_pending_sync() {
        let store = Arc::new(store_over(Arc::new(MemoryKvStore::new())));
        store.add_item(&product("A", 100), 1).await.unwrap();
        let start = tokio::time::Instant::now();

        let syncing = {
            let store = store.clone();
            tokio::spawn(async move { store.sync_with_user_account(&token()).await })
        };
        tokio::task::yield_now().await;

        store.add_item(&product("B", 100), 1).await.unwrap();
        assert!(start.elapsed() >= LATENCY);

        let outcome = syncing.await.unwrap().unwrap();
        assert_eq!(outcome.synced_items, 1);
        assert_eq!(store.get_item_count().await.unwrap(), 2);
    }

    /// Fails with a connection error a fixed number of times, then succeeds.
    struct FlakySync {
        failures_left: AtomicUsize,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl AccountSync for FlakySync {
        async fn push_guest_cart(&self, _token: &SessionToken, cart: &Cart) -> SyncResult<usize> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let left = self.failures_left.load(Ordering::SeqCst);
            if left > 0 {
                self.failures_left.store(left - 1, Ordering::SeqCst);
                return Err(SyncError::ConnectionFailed("connection reset".into()));
            }
            Ok(cart.line_count())
        }
    }

    fn quick_policy() -> RetryPolicy {
        RetryPolicy {
            initial_backoff: Duration::from_millis(10),
            max_backoff: Duration::from_millis(50),
            max_elapsed: Duration::from_secs(10),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_sync_with_retry_recovers() {
        let flaky = Arc::new(FlakySync {
            failures_left: AtomicUsize::new(2),
            calls: AtomicUsize::new(0),
        });
        let store = CartStore::new(
            Arc::new(MemoryKvStore::new()),
            flaky.clone(),
            CartKeys::default(),
        );
        store.add_item(&product("A", 100), 1).await.unwrap();

        let outcome = store.sync_with_retry(&token(), quick_policy()).await.unwrap();

        assert_eq!(outcome.synced_items, 1);
        assert_eq!(flaky.calls.load(Ordering::SeqCst), 3);
        assert!(store.session_token().await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_plain_sync_does_not_retry() {
        let flaky = Arc::new(FlakySync {
            failures_left: AtomicUsize::new(1),
            calls: AtomicUsize::new(0),
        });
        let store = CartStore::new(
            Arc::new(MemoryKvStore::new()),
            flaky.clone(),
            CartKeys::default(),
        );
        store.add_item(&product("A", 100), 1).await.unwrap();

        let err = store.sync_with_user_account(&token()).await.unwrap_err();

        assert!(err.is_retryable());
        assert_eq!(flaky.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_sync_with_retry_stops_on_permanent_error() {
        let store = CartStore::new(
            Arc::new(MemoryKvStore::new()),
            Arc::new(OfflineAccountSync),
            CartKeys::default(),
        );
        store.add_item(&product("A", 100), 1).await.unwrap();

        let err = store.sync_with_retry(&token(), quick_policy()).await.unwrap_err();
        assert!(matches!(err, StoreError::Sync(SyncError::Disabled)));
    }

    // =========================================================================
    // SQLite Backend
    // =========================================================================

    #[tokio::test]
    async fn test_sqlite_backed_store_persists_across_instances() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let config = StoreConfig::default();

        let store = CartStore::from_config(Arc::new(db.kv()), &config);
        store.initialize().await;
        store.add_item(&product("A", 1099), 2).await.unwrap();
        store.add_item(&product("B", 500), 1).await.unwrap();

        let reopened = CartStore::from_config(Arc::new(db.kv()), &config);
        reopened.initialize().await;

        assert_eq!(reopened.get_item_count().await.unwrap(), 3);
        assert_eq!(reopened.get_total().await.unwrap(), Money::from_cents(2698));
    }

    #[tokio::test]
    async fn test_sqlite_closed_pool_surfaces_from_mutation() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let store = store_with_sqlite(&db);
        db.close().await;

        store.initialize().await;
        let err = store.add_item(&product("A", 100), 1).await.unwrap_err();
        assert!(matches!(err, StoreError::Storage(_)));
    }

    fn store_with_sqlite(db: &Database) -> CartStore {
        CartStore::new(
            Arc::new(db.kv()),
            Arc::new(SimulatedAccountSync::new(LATENCY)),
            CartKeys::default(),
        )
    }
}
