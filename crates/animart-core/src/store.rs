//! # Store State
//!
//! The cart / wishlist / address reducer. Every change to the store is a
//! [`StoreAction`] applied to a [`StoreState`]; nothing else mutates it.
//!
//! ## Action Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Store Actions                                        │
//! │                                                                         │
//! │  UI / Manager              StoreAction                 State Change     │
//! │  ────────────              ───────────                 ────────────     │
//! │                                                                         │
//! │  Add to cart ─────────────► AddToCart ──────────────► qty += 1 / push   │
//! │  Change quantity ─────────► UpdateCartQuantity ─────► set, 0 removes    │
//! │  Remove ──────────────────► RemoveFromCart ─────────► retain            │
//! │  Clear ───────────────────► ClearCart ──────────────► cart = []         │
//! │  Identity reload ─────────► LoadCart ───────────────► cart = loaded     │
//! │  Heart icon ──────────────► Add/RemoveFromWishlist ─► set insert/delete │
//! │  Login / logout ──────────► SetCurrentUser ─────────► id, addresses = []│
//! │  Profile fetched ─────────► ReceiveAddresses ───────► list + auto-select│
//! │                                                                         │
//! │  apply() reports CartChanged so the manager knows when to persist.     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::error::CoreResult;
use crate::money::Money;
use crate::types::{Address, CartItem, Product, UserLocation, WishlistItem};
use crate::validation::{sanitize_cart, validate_product_id};

// =============================================================================
// Actions
// =============================================================================

/// A state transition request.
#[derive(Debug, Clone, PartialEq)]
pub enum StoreAction {
    /// Increment the product's line by one, or append it with quantity 1.
    AddToCart(Product),
    /// Remove the line for this product id. No-op if absent.
    RemoveFromCart(String),
    /// Set a line's quantity. Values below 1 remove the line.
    UpdateCartQuantity { product_id: String, quantity: i64 },
    /// Empty the cart.
    ClearCart,
    /// Replace the cart wholesale (after a storage reload). Lines are
    /// sanitized: duplicates merge, zero quantities and empty ids drop.
    LoadCart(Vec<CartItem>),
    /// Insert into the wishlist; no-op if already present.
    AddToWishlist(Product),
    /// Remove from the wishlist. No-op if absent.
    RemoveFromWishlist(String),
    SetUserLocation(Option<UserLocation>),
    /// Switch the identity used to key persistence.
    SetCurrentUser(Option<String>),
    /// Replace the saved addresses, leaving the selection alone.
    SetAddresses(Vec<Address>),
    /// Replace the saved addresses and auto-select one if nothing is selected.
    ReceiveAddresses(Vec<Address>),
    SetSelectedAddress(Option<Address>),
}

/// What an applied action did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionOutcome {
    /// The cart collection changed and must be persisted.
    CartChanged,
    /// Something other than the cart changed.
    Changed,
    /// The action was a no-op.
    Unchanged,
}

impl ActionOutcome {
    pub fn cart_changed(&self) -> bool {
        matches!(self, ActionOutcome::CartChanged)
    }
}

// =============================================================================
// State
// =============================================================================

/// The whole client store.
///
/// ## Invariants
/// - Cart lines are unique by product id and have quantity ≥ 1
/// - Wishlist entries are unique by product id
/// - At most one address is selected
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct StoreState {
    pub cart: Vec<CartItem>,
    pub wishlist: Vec<WishlistItem>,
    pub user_location: Option<UserLocation>,
    pub current_user_id: Option<String>,
    pub addresses: Vec<Address>,
    pub selected_address: Option<Address>,
}

impl StoreState {
    /// Creates an empty store for a guest.
    pub fn new() -> Self {
        Self::default()
    }

    /// Applies an action.
    ///
    /// ## Errors
    /// Adding a product with an empty or oversized id is rejected with
    /// [`CoreError::Validation`](crate::CoreError::Validation) and leaves the
    /// state untouched. Every other action is infallible.
    pub fn apply(&mut self, action: StoreAction) -> CoreResult<ActionOutcome> {
        let outcome = match action {
            StoreAction::AddToCart(product) => {
                validate_product_id(&product.id)?;
                match self.cart.iter_mut().find(|i| i.id() == product.id) {
                    Some(item) => item.quantity = item.quantity.saturating_add(1),
                    None => self.cart.push(CartItem::new(product)),
                }
                ActionOutcome::CartChanged
            }

            StoreAction::RemoveFromCart(product_id) => {
                let before = self.cart.len();
                self.cart.retain(|i| i.id() != product_id);
                if self.cart.len() == before {
                    ActionOutcome::Unchanged
                } else {
                    ActionOutcome::CartChanged
                }
            }

            StoreAction::UpdateCartQuantity {
                product_id,
                quantity,
            } => self.update_quantity(&product_id, quantity),

            StoreAction::ClearCart => {
                if self.cart.is_empty() {
                    ActionOutcome::Unchanged
                } else {
                    self.cart.clear();
                    ActionOutcome::CartChanged
                }
            }

            StoreAction::LoadCart(items) => {
                self.cart = sanitize_cart(items);
                ActionOutcome::CartChanged
            }

            StoreAction::AddToWishlist(product) => {
                validate_product_id(&product.id)?;
                if self.is_in_wishlist(&product.id) {
                    ActionOutcome::Unchanged
                } else {
                    self.wishlist.push(product);
                    ActionOutcome::Changed
                }
            }

            StoreAction::RemoveFromWishlist(product_id) => {
                let before = self.wishlist.len();
                self.wishlist.retain(|p| p.id != product_id);
                if self.wishlist.len() == before {
                    ActionOutcome::Unchanged
                } else {
                    ActionOutcome::Changed
                }
            }

            StoreAction::SetUserLocation(location) => {
                self.user_location = location;
                ActionOutcome::Changed
            }

            StoreAction::SetCurrentUser(user_id) => {
                if self.current_user_id == user_id {
                    ActionOutcome::Unchanged
                } else {
                    // Addresses belong to the previous identity.
                    self.current_user_id = user_id;
                    self.addresses.clear();
                    self.selected_address = None;
                    ActionOutcome::Changed
                }
            }

            StoreAction::SetAddresses(addresses) => {
                self.addresses = addresses;
                ActionOutcome::Changed
            }

            StoreAction::ReceiveAddresses(addresses) => {
                if self.selected_address.is_none() {
                    self.selected_address = addresses
                        .iter()
                        .find(|a| a.is_default)
                        .or_else(|| addresses.first())
                        .cloned();
                }
                self.addresses = addresses;
                ActionOutcome::Changed
            }

            StoreAction::SetSelectedAddress(address) => {
                self.selected_address = address;
                ActionOutcome::Changed
            }
        };

        Ok(outcome)
    }

    fn update_quantity(&mut self, product_id: &str, quantity: i64) -> ActionOutcome {
        let Some(pos) = self.cart.iter().position(|i| i.id() == product_id) else {
            return ActionOutcome::Unchanged;
        };

        let clamped = quantity.clamp(0, u32::MAX as i64) as u32;
        if clamped == 0 {
            self.cart.remove(pos);
        } else {
            self.cart[pos].quantity = clamped;
        }
        ActionOutcome::CartChanged
    }

    // =========================================================================
    // Queries
    // =========================================================================

    pub fn is_in_wishlist(&self, product_id: &str) -> bool {
        self.wishlist.iter().any(|p| p.id == product_id)
    }

    pub fn cart_item(&self, product_id: &str) -> Option<&CartItem> {
        self.cart.iter().find(|i| i.id() == product_id)
    }

    /// Σ price × quantity. Zero for an empty cart.
    pub fn cart_total(&self) -> Money {
        cart_total(&self.cart)
    }

    /// Σ quantity. Zero for an empty cart.
    pub fn cart_item_count(&self) -> u64 {
        cart_item_count(&self.cart)
    }

    pub fn cart_totals(&self) -> CartTotals {
        CartTotals::from(self.cart.as_slice())
    }
}

/// Σ price × quantity over any slice of lines.
pub fn cart_total(items: &[CartItem]) -> Money {
    items.iter().map(CartItem::line_total).sum()
}

/// Σ quantity over any slice of lines.
pub fn cart_item_count(items: &[CartItem]) -> u64 {
    items.iter().map(|i| u64::from(i.quantity)).sum()
}

// =============================================================================
// Totals
// =============================================================================

/// Cart summary for badges and the checkout footer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct CartTotals {
    /// Number of distinct lines.
    pub item_count: usize,
    /// Sum of quantities.
    pub total_quantity: u64,
    pub total: Money,
}

impl From<&[CartItem]> for CartTotals {
    fn from(items: &[CartItem]) -> Self {
        CartTotals {
            item_count: items.len(),
            total_quantity: cart_item_count(items),
            total: cart_total(items),
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
