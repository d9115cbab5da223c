//! # Repository Module
//!
//! Database repositories for the client store.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  StoreManager                                                          │
//! │       │  storage.set("cart_alice", envelope)                           │
//! │       ▼                                                                 │
//! │  SqliteStorage (animart-store)                                         │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  LocalStorageRepository                                                │
//! │  ├── get_item / set_item / remove_item                                 │
//! │  ├── keys_with_prefix / entries_with_prefix                            │
//! │  └── remove_with_prefix                                                │
//! │       │  SQL                                                            │
//! │       ▼                                                                 │
//! │  local_storage (key TEXT PRIMARY KEY, value TEXT, updated_at TEXT)     │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! - [`LocalStorageRepository`] - string key/value storage for persisted carts

pub mod local_storage;

pub use local_storage::{LocalStorageRepository, StoredEntry};
