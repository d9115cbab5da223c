//! # Validation Module
//!
//! Guards for identifiers entering the store and for carts read back from
//! storage.
//!
//! ## Validation Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Where Data Enters the Store                        │
//! │                                                                         │
//! │  UI action (add_to_cart)  ──► validate_product_id ──► reducer           │
//! │                                                                         │
//! │  Auth signal (user id)    ──► validate_user_id ────► storage key        │
//! │                                                                         │
//! │  Storage (persisted cart) ──► sanitize_cart ───────► cart               │
//! │                                                                         │
//! │  Storage is not trusted: anything written by an older build or edited  │
//! │  by hand is normalized back to the cart invariants.                    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::collections::HashMap;

use crate::error::ValidationError;
use crate::types::CartItem;

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

/// Longest identifier accepted for products and users.
pub const MAX_ID_LENGTH: usize = 128;

// =============================================================================
// Identifier Validators
// =============================================================================

/// Validates a product id before it is used as a cart or wishlist key.
///
/// ## Rules
/// - Must not be empty or whitespace
/// - At most 128 characters
///
/// ```rust
/// use animart_core::validation::validate_product_id;
///
/// assert!(validate_product_id("fig-gojo-01").is_ok());
/// assert!(validate_product_id("  ").is_err());
/// ```
pub fn validate_product_id(id: &str) -> ValidationResult<()> {
    validate_id("product.id", id)
}

/// Validates a saved address id received from the backend.
pub fn validate_address_id(id: &str) -> ValidationResult<()> {
    validate_id("address.id", id)
}

/// Validates a user id before it becomes part of a storage key.
///
/// ## Rules
/// - Must not be empty
/// - At most 128 characters
/// - No whitespace or control characters (keys are compared verbatim)
pub fn validate_user_id(id: &str) -> ValidationResult<()> {
    validate_id("user.id", id)?;

    if id.chars().any(|c| c.is_whitespace() || c.is_control()) {
        return Err(ValidationError::InvalidFormat {
            field: "user.id".to_string(),
            reason: "must not contain whitespace or control characters".to_string(),
        });
    }

    Ok(())
}

fn validate_id(field: &str, id: &str) -> ValidationResult<()> {
    if id.trim().is_empty() {
        return Err(ValidationError::Required {
            field: field.to_string(),
        });
    }

    if id.len() > MAX_ID_LENGTH {
        return Err(ValidationError::TooLong {
            field: field.to_string(),
            max: MAX_ID_LENGTH,
        });
    }

    Ok(())
}

// =============================================================================
// Cart Sanitizing
// =============================================================================

/// Normalizes a cart read from storage so it holds the cart invariants.
///
/// - lines with an invalid product id are dropped
/// - lines with quantity 0 are dropped
/// - lines sharing a product id are merged into the first occurrence, with
///   quantities summed (saturating)
///
/// Order of first occurrence is preserved.
pub fn sanitize_cart(items: Vec<CartItem>) -> Vec<CartItem> {
    let mut out: Vec<CartItem> = Vec::with_capacity(items.len());
    let mut index: HashMap<String, usize> = HashMap::new();

    for item in items {
        if item.quantity == 0 || validate_product_id(item.id()).is_err() {
            continue;
        }

        match index.get(item.id()) {
            Some(&pos) => {
                out[pos].quantity = out[pos].quantity.saturating_add(item.quantity);
            }
            None => {
                index.insert(item.id().to_string(), out.len());
                out.push(item);
            }
        }
    }

    out
}

// =============================================================================
// Unit Tests
// =============================================================================
