//! # Account Sync
//!
//! The seam between the guest cart and a signed-in account.
//!
//! ## What Sync Does (and Doesn't)
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  CartStore::sync_with_user_account(token)                              │
//! │       │                                                                 │
//! │       ├── guest cart empty? ──► SyncOutcome { synced_items: 0 }         │
//! │       │                         (no wait, nothing written)              │
//! │       ▼                                                                 │
//! │  AccountSync::push_guest_cart(token, cart)   ◄── THIS MODULE            │
//! │       │   SimulatedAccountSync: sleep(latency), report line count       │
//! │       │   OfflineAccountSync:   Err(SyncError::Disabled)                │
//! │       ▼                                                                 │
//! │  persist token ──► SyncOutcome { synced_items }                        │
//! │                                                                         │
//! │  NOT DONE: merge with a remote cart, clear the local cart,             │
//! │            contact any real server.                                     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! A real backend plugs in as another `AccountSync` implementation.

use async_trait::async_trait;
use backoff::{ExponentialBackoff, ExponentialBackoffBuilder};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tote_core::{Cart, SessionToken};
use tracing::debug;

use crate::error::{SyncError, SyncResult};

/// Result of a completed sync.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncOutcome {
    /// Number of cart lines reported as synced.
    pub synced_items: usize,
}

/// Pushes a non-empty guest cart to the account behind `token`.
#[async_trait]
pub trait AccountSync: Send + Sync {
    /// Returns the number of lines the remote accepted.
    async fn push_guest_cart(&self, token: &SessionToken, cart: &Cart) -> SyncResult<usize>;
}

// =============================================================================
// Simulated
// =============================================================================

/// Models the network round trip with a fixed delay. Always succeeds.
#[derive(Debug, Clone)]
pub struct SimulatedAccountSync {
    latency: Duration,
}

impl SimulatedAccountSync {
    pub fn new(latency: Duration) -> Self {
        SimulatedAccountSync { latency }
    }

    pub fn latency(&self) -> Duration {
        self.latency
    }
}

#[async_trait]
impl AccountSync for SimulatedAccountSync {
    async fn push_guest_cart(&self, _token: &SessionToken, cart: &Cart) -> SyncResult<usize> {
        debug!(latency_ms = self.latency.as_millis() as u64, "Simulating account sync");
        tokio::time::sleep(self.latency).await;
        Ok(cart.line_count())
    }
}

// =============================================================================
// Offline
// =============================================================================

/// Sync mode `offline`: every push fails with [`SyncError::Disabled`].
#[derive(Debug, Clone, Copy, Default)]
pub struct OfflineAccountSync;

#[async_trait]
impl AccountSync for OfflineAccountSync {
    async fn push_guest_cart(&self, _token: &SessionToken, _cart: &Cart) -> SyncResult<usize> {
        Err(SyncError::Disabled)
    }
}

// =============================================================================
// Retry Policy
// =============================================================================

/// Exponential backoff for the opt-in `CartStore::sync_with_retry`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub initial_backoff: Duration,
    pub max_backoff: Duration,
    /// Give up once this much time has passed since the first attempt.
    pub max_elapsed: Duration,
}

impl RetryPolicy {
    pub(crate) fn to_backoff(self) -> ExponentialBackoff {
        ExponentialBackoffBuilder::new()
            .with_initial_interval(self.initial_backoff)
            .with_max_interval(self.max_backoff)
            .with_max_elapsed_time(Some(self.max_elapsed))
            .build()
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        RetryPolicy {
            initial_backoff: Duration::from_millis(500),
            max_backoff: Duration::from_secs(30),
            max_elapsed: Duration::from_secs(120),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tote_core::{Money, Product};

    fn token() -> SessionToken {
        SessionToken::new("tok").unwrap()
    }

    #[tokio::test(start_paused = true)]
    async fn test_simulated_sync_waits_then_reports_lines() {
        let mut cart = Cart::new();
        let now = chrono::Utc::now();
        cart.add_item(&Product::new("A", "a", Money::from_cents(10)), 4, now).unwrap();
        cart.add_item(&Product::new("B", "b", Money::from_cents(5)), 1, now).unwrap();

        let sync = SimulatedAccountSync::new(Duration::from_secs(2));
        let start = tokio::time::Instant::now();

        assert_eq!(sync.push_guest_cart(&token(), &cart).await, Ok(2));
        assert!(start.elapsed() >= Duration::from_secs(2));
    }

    #[tokio::test]
    async fn test_offline_sync_is_disabled() {
        let result = OfflineAccountSync.push_guest_cart(&token(), &Cart::new()).await;
        assert_eq!(result, Err(SyncError::Disabled));
    }

    #[test]
    fn test_retry_policy_builds_backoff() {
        let policy = RetryPolicy {
            initial_backoff: Duration::from_millis(100),
            max_backoff: Duration::from_secs(1),
            max_elapsed: Duration::from_secs(5),
        };
        let backoff = policy.to_backoff();

        assert_eq!(backoff.initial_interval, Duration::from_millis(100));
        assert_eq!(backoff.max_interval, Duration::from_secs(1));
        assert_eq!(backoff.max_elapsed_time, Some(Duration::from_secs(5)));
    }
}
