//! # animart-core: Pure Store Logic for the Animart Storefront
//!
//! This crate holds the client store's state and every rule about it, as
//! pure functions with zero I/O dependencies.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Animart Client Store                             │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                    Storefront UI (TypeScript)                   │   │
//! │  │    Product Page ──► Cart Drawer ──► Wishlist ──► Checkout      │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                animart-store (StoreManager)                     │   │
//! │  │    auth signal, storage, profile API, freshness clock           │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │              ★ animart-core (THIS CRATE) ★                      │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────┐  ┌───────────┐  ┌────────────┐  ┌───────────┐ │   │
//! │  │   │   types   │  │   money   │  │   store    │  │persistence│ │   │
//! │  │   │  Product  │  │   Money   │  │ StoreState │  │ envelope  │ │   │
//! │  │   │  Address  │  │   (paise) │  │ StoreAction│  │ freshness │ │   │
//! │  │   └───────────┘  └───────────┘  └────────────┘  └───────────┘ │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO CLOCK • NO NETWORK • PURE FUNCTIONS               │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Product, CartItem, Address, UserLocation
//! - [`money`] - Integer money in paise
//! - [`store`] - The reducer: `StoreState`, `StoreAction`, cart totals
//! - [`persistence`] - Storage keys, the `{cart, userId, timestamp}` envelope, freshness
//! - [`validation`] - Identifier checks and cart sanitizing
//! - [`error`] - Domain error types
//!
//! ## Example Usage
//!
//! ```rust
//! use animart_core::{Money, Product, StoreAction, StoreState};
//!
//! let mut state = StoreState::new();
//! let figure = Product {
//!     id: "p1".into(),
//!     price: Money::from_paise(100),
//!     ..Default::default()
//! };
//!
//! state.apply(StoreAction::AddToCart(figure.clone())).unwrap();
//! state.apply(StoreAction::AddToCart(figure)).unwrap();
//!
//! assert_eq!(state.cart[0].quantity, 2);
//! assert_eq!(state.cart_total().paise(), 200);
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod money;
pub mod persistence;
pub mod store;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use error::{CoreError, CoreResult, ValidationError};
pub use money::Money;
pub use persistence::{cart_storage_key, FreshnessWindow, PersistedCart};
pub use store::{ActionOutcome, CartTotals, StoreAction, StoreState};
pub use types::*;
