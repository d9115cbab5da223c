//! # Persisted Cart
//!
//! The storage envelope for a cart and the rules for reading one back.
//!
//! ## Storage Layout
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Persisted Cart Keys                                  │
//! │                                                                         │
//! │  key                value                                               │
//! │  ───                ─────                                               │
//! │  cart_guest    ───► {"cart":[...],"userId":null,"timestamp":1718...}    │
//! │  cart_alice    ───► {"cart":[...],"userId":"alice","timestamp":1718...} │
//! │  cart_bob      ───► {"cart":[...],"userId":"bob","timestamp":1718...}   │
//! │                                                                         │
//! │  Restore rules (restore_cart):                                          │
//! │   1. parse the envelope            corrupt ──► CoreError::CorruptCart   │
//! │   2. userId must match the identity       ──► CoreError::IdentityMismatch│
//! │   3. now - timestamp < window      stale   ──► CoreError::StaleCart     │
//! │   4. sanitize lines back to the cart invariants                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The caller decides what a failure means; the store manager treats every
//! one of them as "no saved cart".

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{CoreError, CoreResult};
use crate::types::CartItem;
use crate::validation::sanitize_cart;

/// Prefix shared by every persisted cart key.
pub const CART_KEY_PREFIX: &str = "cart_";

/// Key suffix used when nobody is logged in.
pub const GUEST_KEY_SUFFIX: &str = "guest";

/// Default freshness window for persisted carts.
pub const DEFAULT_FRESHNESS_HOURS: i64 = 24;

/// Largest configurable freshness window (ten years).
pub const MAX_FRESHNESS_HOURS: i64 = 24 * 365 * 10;

/// Returns the storage key for an identity: `cart_<userId>` or `cart_guest`.
///
/// ```rust
/// use animart_core::persistence::cart_storage_key;
///
/// assert_eq!(cart_storage_key(Some("alice")), "cart_alice");
/// assert_eq!(cart_storage_key(None), "cart_guest");
/// ```
pub fn cart_storage_key(user_id: Option<&str>) -> String {
    format!("{}{}", CART_KEY_PREFIX, user_id.unwrap_or(GUEST_KEY_SUFFIX))
}

/// Returns true if a storage key holds a persisted cart.
pub fn is_cart_key(key: &str) -> bool {
    key.starts_with(CART_KEY_PREFIX)
}

// =============================================================================
// Envelope
// =============================================================================

/// `{cart, userId, timestamp}` as written to storage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersistedCart {
    /// Missing is read as an empty cart.
    #[serde(default)]
    pub cart: Vec<CartItem>,

    pub user_id: Option<String>,

    /// Epoch milliseconds at which the cart was saved.
    pub timestamp: i64,
}

impl PersistedCart {
    /// Wraps a cart for saving at `now`.
    pub fn new(cart: Vec<CartItem>, user_id: Option<String>, now: DateTime<Utc>) -> Self {
        PersistedCart {
            cart,
            user_id,
            timestamp: now.timestamp_millis(),
        }
    }

    pub fn to_json(&self) -> CoreResult<String> {
        serde_json::to_string(self).map_err(|e| CoreError::Serialization(e.to_string()))
    }

    pub fn from_json(raw: &str) -> CoreResult<Self> {
        serde_json::from_str(raw).map_err(|e| CoreError::CorruptCart(e.to_string()))
    }

    /// Milliseconds elapsed between the save and `now`.
    ///
    /// Negative when the stored timestamp is ahead of the clock.
    pub fn age_ms(&self, now: DateTime<Utc>) -> i64 {
        now.timestamp_millis().saturating_sub(self.timestamp)
    }
}

// =============================================================================
// Freshness
// =============================================================================

/// How long a persisted cart stays eligible for restore.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FreshnessWindow(Duration);

impl FreshnessWindow {
    pub fn new(window: Duration) -> Self {
        FreshnessWindow(window)
    }

    /// Window of `hours`, clamped to `0..=MAX_FRESHNESS_HOURS`.
    pub fn from_hours(hours: i64) -> Self {
        FreshnessWindow(Duration::hours(hours.clamp(0, MAX_FRESHNESS_HOURS)))
    }

    pub fn as_millis(&self) -> i64 {
        self.0.num_milliseconds()
    }

    /// A cart is fresh while its age is strictly below the window.
    ///
    /// Timestamps from the future (clock skew) count as fresh.
    pub fn is_fresh(&self, saved: &PersistedCart, now: DateTime<Utc>) -> bool {
        saved.age_ms(now) < self.as_millis()
    }
}

impl Default for FreshnessWindow {
    fn default() -> Self {
        FreshnessWindow::from_hours(DEFAULT_FRESHNESS_HOURS)
    }
}

// =============================================================================
// Restore
// =============================================================================

/// Reads a stored envelope back into a cart for `expected_user`.
///
/// ## Errors
/// - [`CoreError::CorruptCart`] if `raw` is not an envelope
/// - [`CoreError::IdentityMismatch`] if the envelope names another user
/// - [`CoreError::StaleCart`] if the envelope is outside the window
pub fn restore_cart(
    raw: &str,
    expected_user: Option<&str>,
    now: DateTime<Utc>,
    window: FreshnessWindow,
) -> CoreResult<Vec<CartItem>> {
    let saved = PersistedCart::from_json(raw)?;

    if saved.user_id.as_deref() != expected_user {
        return Err(CoreError::IdentityMismatch {
            expected: expected_user.map(str::to_string),
            found: saved.user_id,
        });
    }

    if !window.is_fresh(&saved, now) {
        return Err(CoreError::StaleCart {
            age_ms: saved.age_ms(now),
            window_ms: window.as_millis(),
        });
    }

    Ok(sanitize_cart(saved.cart))
}

// =============================================================================
// Unit Tests
// =============================================================================
