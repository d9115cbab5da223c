//! # animart-store: Client Store Manager for the Animart Storefront
//!
//! This crate owns the client store: cart, wishlist, delivery location and
//! saved addresses. It keeps them in step with persistent storage, the
//! auth signal and the backend's profile endpoint.
//!
//! ## Architecture Overview
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Store Manager Architecture                       │
//! │                                                                         │
//! │  ┌──────────────────────────────────────────────────────────────────┐  │
//! │  │                  StoreManager (Main Orchestrator)                │  │
//! │  │                                                                  │  │
//! │  │  Spawned as a Tokio task, fed by a watch channel of sessions    │  │
//! │  │  Every state change goes through the animart-core reducer       │  │
//! │  └────────────────────────────┬─────────────────────────────────────┘  │
//! │                               │                                         │
//! │         ┌─────────────────────┼─────────────────────┐                  │
//! │         ▼                     ▼                     ▼                   │
//! │  ┌────────────────┐  ┌────────────────┐  ┌────────────────────────┐    │
//! │  │  CartStorage   │  │  ProfileApi    │  │  Auth                  │    │
//! │  │                │  │                │  │                        │    │
//! │  │ cart_<user>    │  │ GET            │  │ token + user id        │    │
//! │  │ envelopes in   │  │ /user/profile  │  │ ──► persistence key    │    │
//! │  │ memory/SQLite  │  │ bearer auth    │  │ guest / id / marker    │    │
//! │  └────────────────┘  └────────────────┘  └────────────────────────┘    │
//! │                                                                         │
//! │  STATUS EVENTS (to the UI via StoreEventEmitter):                      │
//! │  • cart changed       - new totals                                     │
//! │  • user changed       - identity switch                                │
//! │  • addresses changed  - count and selection                            │
//! │  • error              - absorbed storage / network failures            │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//!
//! - [`manager`] - `StoreManager` and its builder
//! - [`storage`] - `CartStorage` trait, memory and SQLite backends
//! - [`api`] - Profile endpoint client and wire mapping
//! - [`auth`] - Sessions and identity derivation
//! - [`clock`] - System and manual clocks
//! - [`config`] - Store configuration (API URL, freshness, database path)
//! - [`events`] - UI notification trait
//! - [`error`] - Store error types
//!
//! ## Usage
//!
//! ```rust,ignore
//! use animart_store::{AuthSession, StoreConfig, StoreManager};
//! use tokio::sync::watch;
//!
//! let config = StoreConfig::load_or_default(None);
//! let store = StoreManager::from_config(&config).await?;
//!
//! let (auth_tx, auth_rx) = watch::channel(None);
//! tokio::spawn({
//!     let store = store.clone();
//!     async move { store.run(auth_rx).await }
//! });
//!
//! auth_tx.send(Some(AuthSession::new(token).with_user("u-42")))?;
//! store.add_to_cart(product).await;
//! println!("Total: {}", store.cart_total().await);
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod api;
pub mod auth;
pub mod clock;
pub mod config;
pub mod error;
pub mod events;
pub mod manager;
pub mod storage;

// =============================================================================
// Re-exports
// =============================================================================

pub use api::{HttpProfileApi, ProfileApi};
pub use auth::{derive_user_id, AuthSession, LOGGED_IN_MARKER};
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{ApiSettings, CartSettings, StorageSettings, StoreConfig};
pub use error::{StoreError, StoreResult};
pub use events::{NoOpEmitter, StoreEventEmitter};
pub use manager::{StoreManager, StoreManagerBuilder};
pub use storage::{purge_expired_carts, CartStorage, MemoryStorage, PurgeReport, SqliteStorage};
