//! # Store Events
//!
//! Notifications for the UI layer. The manager calls these after state has
//! changed; implementations must not block.
//!
//! ```text
//! "store://cart"      - { itemCount, totalQuantity, total }
//! "store://user"      - { userId }
//! "store://addresses" - { count, selectedId }
//! "store://error"     - { message }
//! ```

use animart_core::{Address, CartTotals};

/// Receives store change notifications (implemented by the UI bridge).
pub trait StoreEventEmitter: Send + Sync {
    /// The cart changed; `totals` reflect the new cart.
    fn emit_cart_changed(&self, totals: &CartTotals);

    /// The identity keying persistence changed.
    fn emit_user_changed(&self, user_id: Option<&str>);

    /// Saved addresses or the selection changed.
    fn emit_addresses_changed(&self, count: usize, selected: Option<&Address>);

    /// A background operation failed and was absorbed.
    fn emit_error(&self, message: &str);
}

/// No-op event emitter.
pub struct NoOpEmitter;

impl StoreEventEmitter for NoOpEmitter {
    fn emit_cart_changed(&self, _totals: &CartTotals) {}
    fn emit_user_changed(&self, _user_id: Option<&str>) {}
    fn emit_addresses_changed(&self, _count: usize, _selected: Option<&Address>) {}
    fn emit_error(&self, _message: &str) {}
}
