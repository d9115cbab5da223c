//! # Domain Types
//!
//! Products, cart lines, saved addresses and the shopper's location.
//!
//! ## Type Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │    Product      │   │    CartItem     │   │    Address      │       │
//! │  │  ─────────────  │   │  ─────────────  │   │  ─────────────  │       │
//! │  │  id             │◄──│  product (flat) │   │  id             │       │
//! │  │  name           │   │  quantity ≥ 1   │   │  address_line1  │       │
//! │  │  price (Money)  │   └─────────────────┘   │  is_default     │       │
//! │  │  images[]       │                         │  address_type   │       │
//! │  └─────────────────┘   WishlistItem = Product└─────────────────┘       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! All types serialize with camelCase keys, which is what the storefront UI
//! and the persisted cart envelope use.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::money::Money;

// =============================================================================
// Product
// =============================================================================

/// A catalog product as fetched from the backend.
///
/// Products are immutable snapshots: a cart line keeps the product exactly as
/// it was when added.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase", default)]
#[ts(export)]
pub struct Product {
    pub id: String,
    pub name: String,
    /// Selling price.
    pub price: Money,
    /// Price before any sale, shown struck through.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub original_price: Option<Money>,
    /// Primary image URL.
    pub image: String,
    pub images: Vec<String>,
    pub category: String,
    pub rating: f64,
    pub reviews: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_new: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_on_sale: Option<bool>,
    /// Discount in whole percent, when the backend sends one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub discount: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub in_stock: Option<bool>,
}

impl Product {
    /// Returns the discount to badge the product with.
    ///
    /// Prefers the backend's `discount`; otherwise derives it from
    /// `original_price` and `price`.
    pub fn effective_discount(&self) -> Option<u8> {
        self.discount
            .filter(|d| *d > 0)
            .or_else(|| {
                self.original_price
                    .and_then(|original| Money::discount_percent(original, self.price))
            })
    }

    /// A product is purchasable unless the backend marked it out of stock.
    pub fn is_available(&self) -> bool {
        self.in_stock.unwrap_or(true)
    }
}

// =============================================================================
// Cart & Wishlist
// =============================================================================

/// A line in the cart: a product snapshot plus a quantity.
///
/// Serialized flat, so a persisted line reads
/// `{"id": "p1", "name": "...", "price": 499, ..., "quantity": 2}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct CartItem {
    #[serde(flatten)]
    pub product: Product,

    /// Always ≥ 1 while the item is in a cart.
    pub quantity: u32,
}

impl CartItem {
    /// Creates a cart line with quantity 1.
    pub fn new(product: Product) -> Self {
        CartItem {
            product,
            quantity: 1,
        }
    }

    #[inline]
    pub fn id(&self) -> &str {
        &self.product.id
    }

    /// Unit price × quantity.
    pub fn line_total(&self) -> Money {
        self.product.price.multiply_quantity(self.quantity)
    }
}

/// Wishlist entries are plain product references.
pub type WishlistItem = Product;

// =============================================================================
// Addresses
// =============================================================================

/// Kind of saved address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[ts(export)]
pub enum AddressType {
    #[default]
    Home,
    Work,
    Other,
}

impl std::fmt::Display for AddressType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AddressType::Home => write!(f, "Home"),
            AddressType::Work => write!(f, "Work"),
            AddressType::Other => write!(f, "Other"),
        }
    }
}

impl std::str::FromStr for AddressType {
    type Err = std::convert::Infallible;

    /// Parses case-insensitively; anything unrecognized is `Other`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s.trim().to_lowercase().as_str() {
            "home" => AddressType::Home,
            "work" | "office" => AddressType::Work,
            _ => AddressType::Other,
        })
    }
}

/// A saved shipping address.
///
/// `is_default` is the server's flag. Which address is *selected* for the
/// current checkout is client state and lives on
/// [`StoreState`](crate::store::StoreState).
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct Address {
    pub id: String,
    pub name: String,
    pub address_line1: String,
    pub address_line2: Option<String>,
    pub landmark: Option<String>,
    pub city: String,
    pub state: String,
    pub pincode: String,
    pub phone: String,
    pub is_default: bool,
    pub address_type: AddressType,
    pub user_id: Option<String>,
    #[ts(as = "Option<String>")]
    pub created_at: Option<DateTime<Utc>>,
    #[ts(as = "Option<String>")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl Address {
    /// One-line rendering for checkout summaries.
    pub fn single_line(&self) -> String {
        let mut parts: Vec<&str> = vec![self.address_line1.as_str()];
        if let Some(line2) = self.address_line2.as_deref().filter(|s| !s.is_empty()) {
            parts.push(line2);
        }
        if let Some(landmark) = self.landmark.as_deref().filter(|s| !s.is_empty()) {
            parts.push(landmark);
        }
        parts.push(self.city.as_str());
        format!("{}, {} - {}", parts.join(", "), self.state, self.pincode)
    }
}

// =============================================================================
// Location
// =============================================================================

/// Where the shopper says they are, used for delivery estimates.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct UserLocation {
    pub city: String,
    pub state: Option<String>,
    pub pincode: Option<String>,
}

// =============================================================================
// Unit Tests
// =============================================================================
