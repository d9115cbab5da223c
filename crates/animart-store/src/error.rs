//! # Store Error Types
//!
//! Error types for the store manager and its adapters.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                       Store Error Categories                            │
//! │                                                                         │
//! │  ┌─────────────────┐  ┌─────────────────┐  ┌─────────────────────────┐ │
//! │  │  Configuration  │  │    Storage      │  │     Profile API         │ │
//! │  │                 │  │                 │  │                         │ │
//! │  │  InvalidConfig  │  │  StorageFailed  │  │  ConnectionFailed       │ │
//! │  │  InvalidUrl     │  │  Serialization  │  │  Timeout                │ │
//! │  │  ConfigLoad/Save│  │  Core           │  │  Unauthorized / Api     │ │
//! │  └─────────────────┘  └─────────────────┘  └─────────────────────────┘ │
//! │                                                                         │
//! │  None of these reach the UI: the manager logs them, emits an error     │
//! │  event and degrades to an empty or unchanged state.                    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use thiserror::Error;

use animart_core::CoreError;

/// Result type alias for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Store error type covering every adapter failure.
#[derive(Debug, Error)]
pub enum StoreError {
    // =========================================================================
    // Configuration Errors
    // =========================================================================
    /// Invalid store configuration.
    #[error("Invalid store configuration: {0}")]
    InvalidConfig(String),

    /// Invalid API URL.
    #[error("Invalid API URL: {0}")]
    InvalidUrl(String),

    /// Failed to load config file.
    #[error("Failed to load config: {0}")]
    ConfigLoadFailed(String),

    /// Failed to save config file.
    #[error("Failed to save config: {0}")]
    ConfigSaveFailed(String),

    // =========================================================================
    // Storage Errors
    // =========================================================================
    /// The storage backend failed a read or write.
    #[error("Storage error: {0}")]
    StorageFailed(String),

    /// Failed to serialize or parse JSON.
    #[error("Serialization failed: {0}")]
    SerializationFailed(String),

    /// A domain rule rejected the data.
    #[error(transparent)]
    Core(#[from] CoreError),

    // =========================================================================
    // Profile API Errors
    // =========================================================================
    /// Could not reach the backend.
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    /// The backend did not answer in time.
    #[error("Request timed out")]
    Timeout,

    /// The backend rejected the session token.
    #[error("Unauthorized: session token rejected")]
    Unauthorized,

    /// The backend answered with an error.
    #[error("API error: {status} - {message}")]
    Api { status: u16, message: String },

    /// The backend answered with something we can't read.
    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

// =============================================================================
// Error Conversions
// =============================================================================

impl From<animart_db::DbError> for StoreError {
    fn from(err: animart_db::DbError) -> Self {
        StoreError::StorageFailed(err.to_string())
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(err: serde_json::Error) -> Self {
        StoreError::SerializationFailed(err.to_string())
    }
}

impl From<url::ParseError> for StoreError {
    fn from(err: url::ParseError) -> Self {
        StoreError::InvalidUrl(err.to_string())
    }
}

impl From<reqwest::Error> for StoreError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            StoreError::Timeout
        } else if err.is_decode() {
            StoreError::InvalidResponse(err.to_string())
        } else if let Some(status) = err.status() {
            StoreError::Api {
                status: status.as_u16(),
                message: err.to_string(),
            }
        } else {
            StoreError::ConnectionFailed(err.to_string())
        }
    }
}

impl From<std::io::Error> for StoreError {
    fn from(err: std::io::Error) -> Self {
        StoreError::ConfigLoadFailed(err.to_string())
    }
}

impl From<toml::de::Error> for StoreError {
    fn from(err: toml::de::Error) -> Self {
        StoreError::ConfigLoadFailed(err.to_string())
    }
}

impl From<toml::ser::Error> for StoreError {
    fn from(err: toml::ser::Error) -> Self {
        StoreError::ConfigSaveFailed(err.to_string())
    }
}

// =============================================================================
// Error Categorization
// =============================================================================

impl StoreError {
    /// Returns true if trying again later may succeed.
    ///
    /// ## Retryable Errors
    /// - Network failures and timeouts
    /// - 5xx and 429 responses
    /// - Storage failures (locked database, full disk)
    pub fn is_retryable(&self) -> bool {
        match self {
            StoreError::ConnectionFailed(_) | StoreError::Timeout | StoreError::StorageFailed(_) => {
                true
            }
            StoreError::Api { status, .. } => *status >= 500 || *status == 429,
            _ => false,
        }
    }
}
