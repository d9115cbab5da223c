//! # Store Manager
//!
//! Owns the [`StoreState`] and keeps it in step with storage, the auth
//! signal and the backend.
//!
//! ## Synchronization Protocol
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                     StoreManager Lifecycle                              │
//! │                                                                         │
//! │  auth signal (watch)                                                    │
//! │       │  derive_user_id()                                               │
//! │       ▼                                                                 │
//! │  same identity? ──yes──► keep state (token refreshed only)              │
//! │       │ no                                                              │
//! │       ▼                                                                 │
//! │  ┌─────────────────────── mutation lock ───────────────────────────┐   │
//! │  │ 1. bump address generation (in-flight fetches become stale)     │   │
//! │  │ 2. read cart_<id> from storage                                   │   │
//! │  │    corrupt / other identity / stale / read error ──► []          │   │
//! │  │ 3. state: SetCurrentUser + LoadCart (addresses cleared)          │   │
//! │  │ 4. save {cart, userId, timestamp} back under cart_<id>           │   │
//! │  └──────────────────────────────────────────────────────────────────┘   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  logged in? ──► GET /user/profile (generation N)                        │
//! │                   │                                                     │
//! │                   ├── generation still N ──► ReceiveAddresses           │
//! │                   ├── generation moved on ──► drop response             │
//! │                   └── error ──► log, emit, keep addresses               │
//! │                                                                         │
//! │  Every cart change saves the envelope. clear_cart() also deletes every  │
//! │  cart_* key in storage, for every user.                                │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Locking
//! - `state` (RwLock): held only for reducer applications and reads
//! - `mutation` (Mutex): serializes every change that is followed by a
//!   save, so saves land in the order the changes were made
//!
//! Storage and network I/O never run under the `state` lock.

use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::{watch, Mutex, RwLock};
use tracing::{debug, info, warn};

use animart_core::persistence::{cart_storage_key, restore_cart, CART_KEY_PREFIX};
use animart_core::validation::validate_user_id;
use animart_db::DbConfig;
use animart_core::{
    ActionOutcome, Address, CartItem, CartTotals, CoreError, FreshnessWindow, Money,
    PersistedCart, Product, StoreAction, StoreState, UserLocation, WishlistItem,
};

use crate::api::{HttpProfileApi, ProfileApi};
use crate::auth::{derive_user_id, AuthSession};
use crate::clock::{Clock, SystemClock};
use crate::config::StoreConfig;
use crate::error::{StoreError, StoreResult};
use crate::events::{NoOpEmitter, StoreEventEmitter};
use crate::storage::{CartStorage, SqliteStorage};

// =============================================================================
// Store Manager
// =============================================================================

/// Handle to the client store. Cheap to clone; clones share state.
#[derive(Clone)]
pub struct StoreManager {
    inner: Arc<Inner>,
}

struct Inner {
    state: RwLock<StoreState>,

    /// Latest authenticated session, used for backend calls.
    session: RwLock<Option<AuthSession>>,

    mutation: Mutex<()>,

    /// Bumped on every address fetch and identity switch.
    address_generation: AtomicU64,

    storage: Arc<dyn CartStorage>,
    api: Arc<dyn ProfileApi>,
    clock: Arc<dyn Clock>,
    emitter: Arc<dyn StoreEventEmitter>,
    freshness: FreshnessWindow,
}

impl StoreManager {
    pub fn builder() -> StoreManagerBuilder {
        StoreManagerBuilder::new()
    }

    /// Builds a manager with SQLite storage and the HTTP profile client.
    pub async fn from_config(config: &StoreConfig) -> StoreResult<Self> {
        config.validate()?;

        let path: PathBuf = config
            .database_path()
            .ok_or_else(|| StoreError::InvalidConfig("No database path available".into()))?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| StoreError::StorageFailed(format!("{}: {}", parent.display(), e)))?;
        }

        info!(path = %path.display(), "Opening cart storage");
        let storage = SqliteStorage::open_with(
            DbConfig::new(&path).connect_timeout(config.storage.connect_timeout()),
        )
        .await?;
        let api = HttpProfileApi::from_config(config)?;

        StoreManagerBuilder::new()
            .with_storage(Arc::new(storage))
            .with_profile_api(Arc::new(api))
            .with_freshness_window(config.freshness_window())
            .build()
    }

    // =========================================================================
    // Queries
    // =========================================================================

    /// A copy of the whole state.
    pub async fn snapshot(&self) -> StoreState {
        self.inner.state.read().await.clone()
    }

    pub async fn cart(&self) -> Vec<CartItem> {
        self.inner.state.read().await.cart.clone()
    }

    pub async fn wishlist(&self) -> Vec<WishlistItem> {
        self.inner.state.read().await.wishlist.clone()
    }

    pub async fn addresses(&self) -> Vec<Address> {
        self.inner.state.read().await.addresses.clone()
    }

    pub async fn selected_address(&self) -> Option<Address> {
        self.inner.state.read().await.selected_address.clone()
    }

    pub async fn current_user_id(&self) -> Option<String> {
        self.inner.state.read().await.current_user_id.clone()
    }

    pub async fn is_in_wishlist(&self, product_id: &str) -> bool {
        self.inner.state.read().await.is_in_wishlist(product_id)
    }

    pub async fn cart_total(&self) -> Money {
        self.inner.state.read().await.cart_total()
    }

    pub async fn cart_item_count(&self) -> u64 {
        self.inner.state.read().await.cart_item_count()
    }

    pub async fn cart_totals(&self) -> CartTotals {
        self.inner.state.read().await.cart_totals()
    }

    // =========================================================================
    // Actions
    // =========================================================================

    pub async fn add_to_cart(&self, product: Product) -> ActionOutcome {
        self.dispatch(StoreAction::AddToCart(product)).await
    }

    pub async fn remove_from_cart(&self, product_id: impl Into<String>) -> ActionOutcome {
        self.dispatch(StoreAction::RemoveFromCart(product_id.into()))
            .await
    }

    /// Sets a line's quantity; anything below 1 removes the line.
    pub async fn update_cart_quantity(
        &self,
        product_id: impl Into<String>,
        quantity: i64,
    ) -> ActionOutcome {
        self.dispatch(StoreAction::UpdateCartQuantity {
            product_id: product_id.into(),
            quantity,
        })
        .await
    }

    /// Empties the cart and deletes every persisted cart, for every user.
    ///
    /// The emptied cart is not saved back.
    pub async fn clear_cart(&self) -> ActionOutcome {
        let _guard = self.inner.mutation.lock().await;

        let outcome = {
            let mut state = self.inner.state.write().await;
            self.inner.apply(&mut state, StoreAction::ClearCart)
        };

        match self.inner.storage.remove_with_prefix(CART_KEY_PREFIX).await {
            Ok(removed) => info!(removed, "Cleared cart and purged persisted carts"),
            Err(e) => {
                warn!(error = %e, "Failed to purge persisted carts");
                self.inner
                    .emitter
                    .emit_error(&format!("Could not clear saved carts: {}", e));
            }
        }

        if outcome.cart_changed() {
            self.inner.emitter.emit_cart_changed(&CartTotals::default());
        }
        outcome
    }

    pub async fn add_to_wishlist(&self, product: Product) -> ActionOutcome {
        self.dispatch(StoreAction::AddToWishlist(product)).await
    }

    pub async fn remove_from_wishlist(&self, product_id: impl Into<String>) -> ActionOutcome {
        self.dispatch(StoreAction::RemoveFromWishlist(product_id.into()))
            .await
    }

    pub async fn set_user_location(&self, location: Option<UserLocation>) -> ActionOutcome {
        self.dispatch(StoreAction::SetUserLocation(location)).await
    }

    pub async fn set_addresses(&self, addresses: Vec<Address>) -> ActionOutcome {
        self.dispatch(StoreAction::SetAddresses(addresses)).await
    }

    pub async fn set_selected_address(&self, address: Option<Address>) -> ActionOutcome {
        self.dispatch(StoreAction::SetSelectedAddress(address))
            .await
    }

    /// Applies any action, saving the cart and emitting events as needed.
    ///
    /// Rejected actions are logged, emitted as errors and reported as
    /// [`ActionOutcome::Unchanged`].
    pub async fn dispatch(&self, action: StoreAction) -> ActionOutcome {
        // Identity changes must reload the cart, not just relabel it.
        if let StoreAction::SetCurrentUser(user_id) = action {
            return if self.set_current_user(user_id).await {
                ActionOutcome::CartChanged
            } else {
                ActionOutcome::Unchanged
            };
        }

        let touches_addresses = matches!(
            action,
            StoreAction::SetAddresses(_)
                | StoreAction::ReceiveAddresses(_)
                | StoreAction::SetSelectedAddress(_)
        );

        let _guard = self.inner.mutation.lock().await;

        let (outcome, saved, addresses) = {
            let mut state = self.inner.state.write().await;
            let outcome = self.inner.apply(&mut state, action);
            let saved = outcome
                .cart_changed()
                .then(|| (state.cart.clone(), state.current_user_id.clone()));
            let addresses = (touches_addresses && outcome != ActionOutcome::Unchanged)
                .then(|| (state.addresses.len(), state.selected_address.clone()));
            (outcome, saved, addresses)
        };

        if let Some((cart, user_id)) = saved {
            let totals = CartTotals::from(cart.as_slice());
            self.inner.persist_cart(cart, user_id).await;
            self.inner.emitter.emit_cart_changed(&totals);
        }

        if let Some((count, selected)) = addresses {
            self.inner
                .emitter
                .emit_addresses_changed(count, selected.as_ref());
        }

        outcome
    }

    // =========================================================================
    // Identity
    // =========================================================================

    /// Switches the identity that keys persistence, then refetches addresses.
    ///
    /// A held session for a different identity is discarded, so addresses
    /// are only fetched with a token belonging to `user_id`.
    ///
    /// Returns false if `user_id` is already current or unusable.
    pub async fn set_current_user(&self, user_id: Option<String>) -> bool {
        if let Some(id) = user_id.as_deref() {
            if let Err(e) = validate_user_id(id) {
                warn!(error = %e, "Refusing unusable user id");
                self.inner.emitter.emit_error(&e.to_string());
                return false;
            }
        }

        {
            let mut session = self.inner.session.write().await;
            if session.is_some() && derive_user_id(session.as_ref()) != user_id {
                debug!(user_id = ?user_id, "Dropping session of another identity");
                *session = None;
            }
        }

        if !self.switch_identity(user_id).await {
            return false;
        }
        self.refresh_addresses().await;
        true
    }

    /// Follows a new auth signal value.
    ///
    /// Returns true if the derived identity changed.
    pub async fn set_session(&self, session: Option<AuthSession>) -> bool {
        if !self.apply_session(session).await {
            return false;
        }
        self.refresh_addresses().await;
        true
    }

    async fn apply_session(&self, session: Option<AuthSession>) -> bool {
        let user_id = derive_user_id(session.as_ref());
        *self.inner.session.write().await = session.filter(AuthSession::has_token);
        self.switch_identity(user_id).await
    }

    async fn switch_identity(&self, user_id: Option<String>) -> bool {
        let _guard = self.inner.mutation.lock().await;

        if self.inner.state.read().await.current_user_id == user_id {
            debug!(user_id = ?user_id, "Identity unchanged");
            return false;
        }

        self.inner.address_generation.fetch_add(1, Ordering::SeqCst);

        let loaded = self.inner.load_cart(user_id.as_deref()).await;

        let cart = {
            let mut state = self.inner.state.write().await;
            self.inner
                .apply(&mut state, StoreAction::SetCurrentUser(user_id.clone()));
            self.inner.apply(&mut state, StoreAction::LoadCart(loaded));
            state.cart.clone()
        };

        let totals = CartTotals::from(cart.as_slice());
        info!(
            user_id = ?user_id,
            items = totals.item_count,
            "Switched store identity"
        );

        self.inner.persist_cart(cart, user_id.clone()).await;

        self.inner.emitter.emit_user_changed(user_id.as_deref());
        self.inner.emitter.emit_cart_changed(&totals);
        self.inner.emitter.emit_addresses_changed(0, None);
        true
    }

    /// Re-reads the current identity's cart from storage.
    pub async fn reload_cart(&self) {
        let _guard = self.inner.mutation.lock().await;

        let user_id = self.inner.state.read().await.current_user_id.clone();
        let loaded = self.inner.load_cart(user_id.as_deref()).await;

        let cart = {
            let mut state = self.inner.state.write().await;
            self.inner.apply(&mut state, StoreAction::LoadCart(loaded));
            state.cart.clone()
        };

        let totals = CartTotals::from(cart.as_slice());
        self.inner.persist_cart(cart, user_id).await;
        self.inner.emitter.emit_cart_changed(&totals);
    }

    /// Fetches the current identity's saved addresses.
    ///
    /// The response is dropped if the identity changed or a newer fetch
    /// started while it was in flight. Failures keep the current addresses.
    pub async fn refresh_addresses(&self) {
        let generation = self.inner.address_generation.fetch_add(1, Ordering::SeqCst) + 1;

        let Some(user_id) = self.inner.state.read().await.current_user_id.clone() else {
            debug!("Guest session; no addresses to fetch");
            return;
        };

        let Some(session) = self.inner.session.read().await.clone() else {
            debug!(user_id = %user_id, "No session token; skipping address fetch");
            return;
        };

        if derive_user_id(Some(&session)).as_deref() != Some(user_id.as_str()) {
            debug!(
                user_id = %user_id,
                "Session belongs to another identity; skipping address fetch"
            );
            return;
        }

        debug!(user_id = %user_id, generation, "Fetching addresses");
        let result = self.inner.api.fetch_addresses(&session).await;

        let mut state = self.inner.state.write().await;
        let current = self.inner.address_generation.load(Ordering::SeqCst);
        if current != generation || state.current_user_id.as_deref() != Some(user_id.as_str()) {
            debug!(
                user_id = %user_id,
                generation,
                current,
                "Dropping stale address response"
            );
            return;
        }

        match result {
            Ok(addresses) => {
                self.inner
                    .apply(&mut state, StoreAction::ReceiveAddresses(addresses));
                let count = state.addresses.len();
                let selected = state.selected_address.clone();
                drop(state);

                info!(user_id = %user_id, count, "Saved addresses loaded");
                self.inner
                    .emitter
                    .emit_addresses_changed(count, selected.as_ref());
            }
            Err(e) => {
                drop(state);
                warn!(
                    user_id = %user_id,
                    error = %e,
                    retryable = e.is_retryable(),
                    "Address fetch failed; keeping current addresses"
                );
                self.inner
                    .emitter
                    .emit_error(&format!("Could not load saved addresses: {}", e));
            }
        }
    }

    // =========================================================================
    // Auth Signal Loop
    // =========================================================================

    /// Restores the current cart, then follows `auth_rx` until its sender is
    /// dropped.
    ///
    /// Address fetches run as spawned tasks so a slow backend never delays
    /// the next identity switch.
    pub async fn run(&self, mut auth_rx: watch::Receiver<Option<AuthSession>>) {
        info!("Store manager started");

        self.reload_cart().await;

        loop {
            let session = auth_rx.borrow_and_update().clone();
            if self.apply_session(session).await {
                let manager = self.clone();
                tokio::spawn(async move { manager.refresh_addresses().await });
            }

            if auth_rx.changed().await.is_err() {
                break;
            }
        }

        info!("Auth signal closed; store manager stopped");
    }
}

impl std::fmt::Debug for StoreManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StoreManager")
            .field("freshness", &self.inner.freshness)
            .finish_non_exhaustive()
    }
}

// =============================================================================
// Internals
// =============================================================================

impl Inner {
    fn apply(&self, state: &mut StoreState, action: StoreAction) -> ActionOutcome {
        match state.apply(action) {
            Ok(outcome) => outcome,
            Err(e) => {
                warn!(error = %e, "Rejected store action");
                self.emitter.emit_error(&e.to_string());
                ActionOutcome::Unchanged
            }
        }
    }

    /// Reads the persisted cart for `user_id`. Anything unusable is `[]`.
    async fn load_cart(&self, user_id: Option<&str>) -> Vec<CartItem> {
        let key = cart_storage_key(user_id);

        let raw = match self.storage.get(&key).await {
            Ok(Some(raw)) => raw,
            Ok(None) => {
                debug!(key = %key, "No saved cart");
                return Vec::new();
            }
            Err(e) => {
                warn!(key = %key, error = %e, "Failed to read saved cart; starting empty");
                self.emitter
                    .emit_error(&format!("Could not read saved cart: {}", e));
                return Vec::new();
            }
        };

        match restore_cart(&raw, user_id, self.clock.now(), self.freshness) {
            Ok(cart) => {
                debug!(key = %key, items = cart.len(), "Restored saved cart");
                cart
            }
            Err(CoreError::StaleCart { age_ms, window_ms }) => {
                info!(key = %key, age_ms, window_ms, "Discarding stale cart");
                Vec::new()
            }
            Err(e) => {
                warn!(key = %key, error = %e, "Discarding unusable saved cart");
                Vec::new()
            }
        }
    }

    async fn persist_cart(&self, cart: Vec<CartItem>, user_id: Option<String>) {
        let key = cart_storage_key(user_id.as_deref());
        let items = cart.len();
        let envelope = PersistedCart::new(cart, user_id, self.clock.now());

        let result = match envelope.to_json() {
            Ok(json) => self.storage.set(&key, &json).await,
            Err(e) => Err(StoreError::from(e)),
        };

        match result {
            Ok(()) => debug!(key = %key, items, "Cart saved"),
            Err(e) => {
                warn!(key = %key, error = %e, "Failed to save cart");
                self.emitter
                    .emit_error(&format!("Could not save cart: {}", e));
            }
        }
    }
}

// =============================================================================
// Builder Pattern
// =============================================================================

/// Builder for [`StoreManager`].
pub struct StoreManagerBuilder {
    storage: Option<Arc<dyn CartStorage>>,
    api: Option<Arc<dyn ProfileApi>>,
    clock: Option<Arc<dyn Clock>>,
    emitter: Option<Arc<dyn StoreEventEmitter>>,
    freshness: FreshnessWindow,
}

impl StoreManagerBuilder {
    pub fn new() -> Self {
        StoreManagerBuilder {
            storage: None,
            api: None,
            clock: None,
            emitter: None,
            freshness: FreshnessWindow::default(),
        }
    }

    pub fn with_storage(mut self, storage: Arc<dyn CartStorage>) -> Self {
        self.storage = Some(storage);
        self
    }

    pub fn with_profile_api(mut self, api: Arc<dyn ProfileApi>) -> Self {
        self.api = Some(api);
        self
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    pub fn with_emitter(mut self, emitter: Arc<dyn StoreEventEmitter>) -> Self {
        self.emitter = Some(emitter);
        self
    }

    pub fn with_freshness_window(mut self, window: FreshnessWindow) -> Self {
        self.freshness = window;
        self
    }

    /// Builds the manager. Storage and the profile API are required.
    pub fn build(self) -> StoreResult<StoreManager> {
        let storage = self
            .storage
            .ok_or_else(|| StoreError::InvalidConfig("Cart storage required".into()))?;
        let api = self
            .api
            .ok_or_else(|| StoreError::InvalidConfig("Profile API required".into()))?;

        Ok(StoreManager {
            inner: Arc::new(Inner {
                state: RwLock::new(StoreState::new()),
                session: RwLock::new(None),
                mutation: Mutex::new(()),
                address_generation: AtomicU64::new(0),
                storage,
                api,
                clock: self.clock.unwrap_or_else(|| Arc::new(SystemClock)),
                emitter: self.emitter.unwrap_or_else(|| Arc::new(NoOpEmitter)),
                freshness: self.freshness,
            }),
        })
    }
}

impl Default for StoreManagerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::storage::MemoryStorage;
    use animart_core::AddressType;
    use animart_db::Database;
    use async_trait::async_trait;
    use chrono::{Duration, TimeZone, Utc};
    use std::collections::{HashMap, HashSet};
    use std::sync::atomic::AtomicUsize;
    use tokio::sync::Notify;

    // -------------------------------------------------------------------------
    // Fakes
    // -------------------------------------------------------------------------

    /// Profile API keyed by session token.
    #[derive(Default)]
    struct FakeProfileApi {
        addresses: HashMap<String, Vec<Address>>,
        failing: HashSet<String>,
        gates: HashMap<String, Arc<Notify>>,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl ProfileApi for FakeProfileApi {
        async fn fetch_addresses(&self, session: &AuthSession) -> StoreResult<Vec<Address>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if let Some(gate) = self.gates.get(&session.token) {
                gate.notified().await;
            }
            if self.failing.contains(&session.token) {
                return Err(StoreError::ConnectionFailed("backend offline".into()));
            }
            Ok(self
                .addresses
                .get(&session.token)
                .cloned()
                .unwrap_or_default())
        }
    }

    #[derive(Default)]
    struct RecordingEmitter {
        events: std::sync::Mutex<Vec<String>>,
    }

    impl RecordingEmitter {
        fn events(&self) -> Vec<String> {
            self.events.lock().unwrap().clone()
        }

        fn errors(&self) -> usize {
            self.events()
                .iter()
                .filter(|e| e.starts_with("error:"))
                .count()
        }
    }

    impl StoreEventEmitter for RecordingEmitter {
        fn emit_cart_changed(&self, totals: &CartTotals) {
            self.events
                .lock()
                .unwrap()
                .push(format!("cart:{}", totals.total_quantity));
        }
        fn emit_user_changed(&self, user_id: Option<&str>) {
            self.events
                .lock()
                .unwrap()
                .push(format!("user:{}", user_id.unwrap_or("guest")));
        }
        fn emit_addresses_changed(&self, count: usize, _selected: Option<&Address>) {
            self.events
                .lock()
                .unwrap()
                .push(format!("addresses:{}", count));
        }
        fn emit_error(&self, message: &str) {
            self.events
                .lock()
                .unwrap()
                .push(format!("error:{}", message));
        }
    }

    /// Storage that fails every call.
    struct BrokenStorage;

    #[async_trait]
    impl CartStorage for BrokenStorage {
        async fn get(&self, _key: &str) -> StoreResult<Option<String>> {
            Err(StoreError::StorageFailed("disk unavailable".into()))
        }
        async fn set(&self, _key: &str, _value: &str) -> StoreResult<()> {
            Err(StoreError::StorageFailed("disk unavailable".into()))
        }
        async fn remove(&self, _key: &str) -> StoreResult<()> {
            Err(StoreError::StorageFailed("disk unavailable".into()))
        }
        async fn keys_with_prefix(&self, _prefix: &str) -> StoreResult<Vec<String>> {
            Err(StoreError::StorageFailed("disk unavailable".into()))
        }
    }

    // -------------------------------------------------------------------------
    // Helpers
    // -------------------------------------------------------------------------

    struct Harness {
        manager: StoreManager,
        storage: Arc<MemoryStorage>,
        clock: Arc<ManualClock>,
        emitter: Arc<RecordingEmitter>,
    }

    fn start() -> chrono::DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 4, 10, 18, 0, 0).unwrap()
    }

    fn harness_with(api: FakeProfileApi) -> Harness {
        let storage = Arc::new(MemoryStorage::new());
        let clock = Arc::new(ManualClock::new(start()));
        harness_sharing(api, storage, clock)
    }

    fn harness_sharing(
        api: FakeProfileApi,
        storage: Arc<MemoryStorage>,
        clock: Arc<ManualClock>,
    ) -> Harness {
        let emitter = Arc::new(RecordingEmitter::default());
        let manager = StoreManager::builder()
            .with_storage(storage.clone())
            .with_profile_api(Arc::new(api))
            .with_clock(clock.clone())
            .with_emitter(emitter.clone())
            .build()
            .unwrap();

        Harness {
            manager,
            storage,
            clock,
            emitter,
        }
    }

    fn harness() -> Harness {
        harness_with(FakeProfileApi::default())
    }

    fn product(id: &str, paise: i64) -> Product {
        Product {
            id: id.to_string(),
            name: format!("Product {}", id),
            price: Money::from_paise(paise),
            ..Default::default()
        }
    }

    fn address(id: &str, is_default: bool) -> Address {
        Address {
            id: id.to_string(),
            name: "Asha Rao".into(),
            address_line1: format!("{} Residency Road", id),
            city: "Bengaluru".into(),
            state: "Karnataka".into(),
            pincode: "560025".into(),
            phone: "9876543210".into(),
            is_default,
            address_type: AddressType::Home,
            ..Default::default()
        }
    }

    fn session(token: &str, user: &str) -> AuthSession {
        AuthSession::new(token).with_user(user)
    }

    async fn saved(storage: &MemoryStorage, key: &str) -> Option<PersistedCart> {
        storage
            .get(key)
            .await
            .unwrap()
            .map(|raw| PersistedCart::from_json(&raw).unwrap())
    }

    // -------------------------------------------------------------------------
    // Cart
    // -------------------------------------------------------------------------

    #[tokio::test]
    async fn test_repeated_add_merges_and_saves() {
        let h = harness();

        h.manager.add_to_cart(product("p1", 100)).await;
        h.manager.add_to_cart(product("p1", 100)).await;

        let cart = h.manager.cart().await;
        assert_eq!(cart.len(), 1);
        assert_eq!(cart[0].quantity, 2);
        assert_eq!(h.manager.cart_total().await, Money::from_paise(200));
        assert_eq!(h.manager.cart_item_count().await, 2);

        let envelope = saved(&h.storage, "cart_guest").await.unwrap();
        assert_eq!(envelope.user_id, None);
        assert_eq!(envelope.cart, cart);
        assert_eq!(envelope.timestamp, start().timestamp_millis());
    }

    #[tokio::test]
    async fn test_quantity_below_one_removes_line() {
        let h = harness();
        h.manager.add_to_cart(product("p1", 100)).await;
        h.manager.add_to_cart(product("p2", 50)).await;

        h.manager.update_cart_quantity("p1", 0).await;
        h.manager.update_cart_quantity("p2", -4).await;

        assert!(h.manager.cart().await.is_empty());
        assert!(saved(&h.storage, "cart_guest").await.unwrap().cart.is_empty());
    }

    #[tokio::test]
    async fn test_totals_of_empty_cart_are_zero() {
        let h = harness();
        assert_eq!(h.manager.cart_total().await, Money::zero());
        assert_eq!(h.manager.cart_item_count().await, 0);
        assert_eq!(h.manager.cart_totals().await, CartTotals::default());
    }

    #[tokio::test]
    async fn test_invalid_product_is_rejected() {
        let h = harness();
        let outcome = h.manager.add_to_cart(product("", 100)).await;

        assert_eq!(outcome, ActionOutcome::Unchanged);
        assert!(h.manager.cart().await.is_empty());
        assert_eq!(h.emitter.errors(), 1);
        assert!(h.storage.is_empty().await);
    }

    #[tokio::test]
    async fn test_wishlist_is_idempotent() {
        let h = harness();
        h.manager.add_to_wishlist(product("w1", 999)).await;
        let second = h.manager.add_to_wishlist(product("w1", 999)).await;

        assert_eq!(second, ActionOutcome::Unchanged);
        assert_eq!(h.manager.wishlist().await.len(), 1);
        assert!(h.manager.is_in_wishlist("w1").await);

        h.manager.remove_from_wishlist("w1").await;
        assert!(!h.manager.is_in_wishlist("w1").await);
    }

    // -------------------------------------------------------------------------
    // Persistence
    // -------------------------------------------------------------------------

    #[tokio::test]
    async fn test_restore_within_freshness_window() {
        let first = harness();
        first.manager.set_current_user(Some("alice".into())).await;
        first.manager.add_to_cart(product("p1", 100)).await;
        first.manager.add_to_cart(product("p1", 100)).await;
        let before = first.manager.cart().await;

        first.clock.advance(Duration::hours(23));
        let second = harness_sharing(
            FakeProfileApi::default(),
            first.storage.clone(),
            first.clock.clone(),
        );
        second.manager.set_current_user(Some("alice".into())).await;

        assert_eq!(second.manager.cart().await, before);
    }

    #[tokio::test]
    async fn test_stale_cart_is_discarded() {
        let first = harness();
        first.manager.set_current_user(Some("alice".into())).await;
        first.manager.add_to_cart(product("p1", 100)).await;

        first.clock.advance(Duration::hours(24));
        let second = harness_sharing(
            FakeProfileApi::default(),
            first.storage.clone(),
            first.clock.clone(),
        );
        second.manager.set_current_user(Some("alice".into())).await;

        assert!(second.manager.cart().await.is_empty());
        let envelope = saved(&second.storage, "cart_alice").await.unwrap();
        assert!(envelope.cart.is_empty());
        assert_eq!(second.emitter.errors(), 0);
    }

    #[tokio::test]
    async fn test_switching_users_restores_without_leaking() {
        let h = harness();

        h.manager.set_current_user(Some("alice".into())).await;
        h.manager.add_to_cart(product("a-figure", 100)).await;

        h.manager.set_current_user(Some("bob".into())).await;
        assert!(h.manager.cart().await.is_empty());
        h.manager.add_to_cart(product("b-poster", 40)).await;

        h.manager.set_current_user(Some("alice".into())).await;
        let cart = h.manager.cart().await;
        assert_eq!(cart.len(), 1);
        assert_eq!(cart[0].id(), "a-figure");

        let bob = saved(&h.storage, "cart_bob").await.unwrap();
        assert_eq!(bob.user_id.as_deref(), Some("bob"));
        assert_eq!(bob.cart.len(), 1);
        assert_eq!(bob.cart[0].id(), "b-poster");
    }

    #[tokio::test]
    async fn test_dispatched_identity_change_reloads() {
        let h = harness();
        h.manager.add_to_cart(product("p1", 100)).await;

        let outcome = h
            .manager
            .dispatch(StoreAction::SetCurrentUser(Some("alice".into())))
            .await;

        assert_eq!(outcome, ActionOutcome::CartChanged);
        assert!(h.manager.cart().await.is_empty());
        assert_eq!(saved(&h.storage, "cart_guest").await.unwrap().cart.len(), 1);
    }

    #[tokio::test]
    async fn test_same_user_does_not_reload() {
        let h = harness();
        assert!(h.manager.set_current_user(Some("alice".into())).await);
        h.manager.add_to_cart(product("p1", 100)).await;

        h.storage.set("cart_alice", "{garbage").await.unwrap();
        assert!(!h.manager.set_current_user(Some("alice".into())).await);

        assert_eq!(h.manager.cart().await.len(), 1);
    }

    #[tokio::test]
    async fn test_clear_cart_purges_every_saved_cart() {
        let h = harness();
        h.manager.add_to_cart(product("g", 10)).await;
        h.manager.set_current_user(Some("alice".into())).await;
        h.manager.add_to_cart(product("a", 10)).await;
        h.manager.set_current_user(Some("bob".into())).await;
        h.manager.add_to_cart(product("b", 10)).await;
        h.storage.set("theme", "dark").await.unwrap();

        h.manager.clear_cart().await;

        assert!(h.manager.cart().await.is_empty());
        assert!(h.storage.keys_with_prefix("cart_").await.unwrap().is_empty());
        assert_eq!(h.storage.get("theme").await.unwrap().as_deref(), Some("dark"));

        h.manager.set_current_user(Some("alice".into())).await;
        assert!(h.manager.cart().await.is_empty());
        h.manager.set_current_user(None).await;
        assert!(h.manager.cart().await.is_empty());
    }

    #[tokio::test]
    async fn test_corrupt_or_foreign_cart_starts_empty() {
        let h = harness();
        h.storage.set("cart_alice", "{not json").await.unwrap();
        let foreign = PersistedCart::new(
            vec![CartItem::new(product("p9", 5))],
            Some("mallory".into()),
            start(),
        );
        h.storage
            .set("cart_bob", &foreign.to_json().unwrap())
            .await
            .unwrap();

        h.manager.set_current_user(Some("alice".into())).await;
        assert!(h.manager.cart().await.is_empty());

        h.manager.set_current_user(Some("bob".into())).await;
        assert!(h.manager.cart().await.is_empty());
    }

    #[tokio::test]
    async fn test_storage_failure_is_absorbed() {
        let emitter = Arc::new(RecordingEmitter::default());
        let manager = StoreManager::builder()
            .with_storage(Arc::new(BrokenStorage))
            .with_profile_api(Arc::new(FakeProfileApi::default()))
            .with_emitter(emitter.clone())
            .build()
            .unwrap();

        manager.add_to_cart(product("p1", 100)).await;
        assert_eq!(manager.cart().await.len(), 1);

        assert!(manager.set_current_user(Some("alice".into())).await);
        assert!(manager.cart().await.is_empty());
        assert_eq!(manager.current_user_id().await.as_deref(), Some("alice"));

        manager.clear_cart().await;
        assert!(emitter.errors() >= 3);
    }

    #[tokio::test]
    async fn test_sqlite_backed_round_trip() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let storage = Arc::new(SqliteStorage::new(&db));
        let clock = Arc::new(ManualClock::new(start()));

        let build = || {
            StoreManager::builder()
                .with_storage(storage.clone())
                .with_profile_api(Arc::new(FakeProfileApi::default()))
                .with_clock(clock.clone())
                .build()
                .unwrap()
        };

        let first = build();
        first.set_current_user(Some("alice".into())).await;
        first.add_to_cart(product("p1", 250)).await;

        clock.advance(Duration::hours(2));
        let second = build();
        second.set_current_user(Some("alice".into())).await;
        assert_eq!(second.cart_total().await, Money::from_paise(250));
    }

    // -------------------------------------------------------------------------
    // Auth & Addresses
    // -------------------------------------------------------------------------

    #[tokio::test]
    async fn test_login_fetches_and_selects_default_address() {
        let mut api = FakeProfileApi::default();
        api.addresses.insert(
            "t-alice".into(),
            vec![address("a1", false), address("a2", true)],
        );
        let h = harness_with(api);

        assert!(h.manager.set_session(Some(session("t-alice", "alice"))).await);

        assert_eq!(h.manager.current_user_id().await.as_deref(), Some("alice"));
        assert_eq!(h.manager.addresses().await.len(), 2);
        assert_eq!(h.manager.selected_address().await.unwrap().id, "a2");
        assert!(h.emitter.events().contains(&"user:alice".to_string()));
    }

    #[tokio::test]
    async fn test_first_address_selected_without_default() {
        let mut api = FakeProfileApi::default();
        api.addresses.insert(
            "t".into(),
            vec![address("a1", false), address("a2", false)],
        );
        let h = harness_with(api);

        h.manager.set_session(Some(session("t", "alice"))).await;
        assert_eq!(h.manager.selected_address().await.unwrap().id, "a1");
    }

    #[tokio::test]
    async fn test_existing_selection_is_kept() {
        let mut api = FakeProfileApi::default();
        api.addresses
            .insert("t".into(), vec![address("a1", true)]);
        let h = harness_with(api);

        h.manager.set_session(Some(session("t", "alice"))).await;
        h.manager
            .set_selected_address(Some(address("picked", false)))
            .await;
        h.manager.refresh_addresses().await;

        assert_eq!(h.manager.selected_address().await.unwrap().id, "picked");
    }

    #[tokio::test]
    async fn test_logout_clears_addresses() {
        let mut api = FakeProfileApi::default();
        api.addresses
            .insert("t".into(), vec![address("a1", true)]);
        let h = harness_with(api);

        h.manager.set_session(Some(session("t", "alice"))).await;
        assert!(h.manager.set_session(None).await);

        assert_eq!(h.manager.current_user_id().await, None);
        assert!(h.manager.addresses().await.is_empty());
        assert!(h.manager.selected_address().await.is_none());
    }

    #[tokio::test]
    async fn test_failed_fetch_keeps_addresses() {
        let mut api = FakeProfileApi::default();
        api.addresses
            .insert("good".into(), vec![address("a1", true)]);
        api.failing.insert("bad".into());
        let h = harness_with(api);

        h.manager.set_session(Some(session("good", "alice"))).await;

        // Token rotated for the same user: no identity change.
        assert!(!h.manager.set_session(Some(session("bad", "alice"))).await);
        h.manager.refresh_addresses().await;

        assert_eq!(h.manager.addresses().await.len(), 1);
        assert_eq!(h.manager.selected_address().await.unwrap().id, "a1");
        assert_eq!(h.emitter.errors(), 1);
    }

    #[tokio::test]
    async fn test_manual_switch_never_uses_previous_token() {
        let mut api = FakeProfileApi::default();
        api.addresses
            .insert("bob-token".into(), vec![address("bob-home", true)]);
        let h = harness_with(api);

        h.manager
            .set_session(Some(session("bob-token", "bob")))
            .await;
        assert_eq!(h.manager.addresses().await[0].id, "bob-home");

        assert!(h.manager.set_current_user(Some("alice".into())).await);
        assert_eq!(h.manager.current_user_id().await.as_deref(), Some("alice"));
        assert!(h.manager.addresses().await.is_empty());
        assert!(h.manager.selected_address().await.is_none());

        // Nothing left to fetch with, even on an explicit refresh.
        h.manager.refresh_addresses().await;
        assert!(h.manager.addresses().await.is_empty());
    }

    #[tokio::test]
    async fn test_manual_switch_to_guest_drops_session() {
        let mut api = FakeProfileApi::default();
        api.addresses
            .insert("t".into(), vec![address("a1", true)]);
        let h = harness_with(api);

        h.manager.set_session(Some(session("t", "alice"))).await;
        h.manager.set_current_user(None).await;
        assert!(h.manager.addresses().await.is_empty());

        // Guest clears the session; switching back has no token.
        h.manager.set_current_user(Some("alice".into())).await;
        assert!(h.manager.addresses().await.is_empty());
    }

    #[tokio::test]
    async fn test_switch_clears_previous_users_addresses() {
        let mut api = FakeProfileApi::default();
        api.addresses
            .insert("t-alice".into(), vec![address("a1", true)]);
        let h = harness_with(api);

        h.manager.set_session(Some(session("t-alice", "alice"))).await;
        assert_eq!(h.manager.addresses().await.len(), 1);

        // Identity switch without waiting for bob's fetch.
        assert!(h.manager.apply_session(Some(session("t-bob", "bob"))).await);
        assert!(h.manager.addresses().await.is_empty());
        assert!(h.manager.selected_address().await.is_none());
    }

    #[tokio::test]
    async fn test_stale_address_response_is_dropped() {
        let gate = Arc::new(Notify::new());
        let mut api = FakeProfileApi::default();
        api.addresses
            .insert("t-alice".into(), vec![address("alice-home", true)]);
        api.addresses
            .insert("t-bob".into(), vec![address("bob-home", true)]);
        api.gates.insert("t-alice".into(), gate.clone());
        let h = harness_with(api);

        h.manager.apply_session(Some(session("t-alice", "alice"))).await;
        let slow = {
            let manager = h.manager.clone();
            tokio::spawn(async move { manager.refresh_addresses().await })
        };
        tokio::task::yield_now().await;

        h.manager.set_session(Some(session("t-bob", "bob"))).await;
        assert_eq!(h.manager.addresses().await[0].id, "bob-home");

        gate.notify_one();
        slow.await.unwrap();

        let addresses = h.manager.addresses().await;
        assert_eq!(addresses.len(), 1);
        assert_eq!(addresses[0].id, "bob-home");
        assert_eq!(h.manager.current_user_id().await.as_deref(), Some("bob"));
    }

    #[tokio::test]
    async fn test_session_without_user_id_uses_marker_key() {
        let h = harness();
        h.manager.set_session(Some(AuthSession::new("tok"))).await;
        h.manager.add_to_cart(product("p1", 100)).await;

        assert!(saved(&h.storage, "cart_logged_in").await.is_some());
    }

    #[tokio::test]
    async fn test_unusable_user_id_is_refused() {
        let h = harness();
        assert!(!h.manager.set_current_user(Some("   ".into())).await);
        assert_eq!(h.manager.current_user_id().await, None);
        assert_eq!(h.emitter.errors(), 1);
    }

    #[tokio::test]
    async fn test_run_follows_auth_signal() {
        let mut api = FakeProfileApi::default();
        api.addresses
            .insert("t".into(), vec![address("a1", true)]);
        let h = harness_with(api);

        // A guest cart saved before startup is restored by run().
        let guest = PersistedCart::new(vec![CartItem::new(product("g1", 10))], None, start());
        h.storage
            .set("cart_guest", &guest.to_json().unwrap())
            .await
            .unwrap();

        let (tx, rx) = watch::channel(None);
        let task = {
            let manager = h.manager.clone();
            tokio::spawn(async move { manager.run(rx).await })
        };

        wait_for(|| async { h.manager.cart().await.len() == 1 }).await;

        tx.send(Some(session("t", "alice"))).unwrap();
        wait_for(|| async { h.manager.addresses().await.len() == 1 }).await;
        assert_eq!(h.manager.current_user_id().await.as_deref(), Some("alice"));
        assert!(h.manager.cart().await.is_empty());

        tx.send(None).unwrap();
        wait_for(|| async { h.manager.current_user_id().await.is_none() }).await;
        assert_eq!(h.manager.cart().await.len(), 1);

        drop(tx);
        tokio::time::timeout(std::time::Duration::from_secs(5), task)
            .await
            .unwrap()
            .unwrap();
    }

    async fn wait_for<F, Fut>(mut check: F)
    where
        F: FnMut() -> Fut,
        Fut: std::future::Future<Output = bool>,
    {
        for _ in 0..200 {
            if check().await {
                return;
            }
            tokio::time::sleep(std::time::Duration::from_millis(10)).await;
        }
        panic!("condition not reached");
    }
}
