//! # Error Types
//!
//! Domain-specific error types for animart-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  animart-core errors (this file)                                       │
//! │  ├── CoreError        - Persisted cart and reducer failures            │
//! │  └── ValidationError  - Input validation failures                      │
//! │                                                                         │
//! │  animart-db errors (separate crate)                                    │
//! │  └── DbError          - Storage operation failures                     │
//! │                                                                         │
//! │  animart-store errors                                                  │
//! │  └── StoreError       - Config, HTTP, storage adapter failures         │
//! │                                                                         │
//! │  None of these reach the UI: the manager logs them and falls back to   │
//! │  an empty or unchanged state.                                          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use thiserror::Error;

// =============================================================================
// Core Error
// =============================================================================

/// Errors raised by the pure store logic.
#[derive(Debug, Error)]
pub enum CoreError {
    /// The persisted cart could not be parsed.
    ///
    /// ## When This Occurs
    /// - Storage holds something other than a cart envelope
    /// - A line has a negative or non-integer quantity
    /// - The `timestamp` field is missing
    #[error("Persisted cart is corrupt: {0}")]
    CorruptCart(String),

    /// The persisted cart is older than the freshness window.
    #[error("Persisted cart is stale: saved {age_ms} ms ago, window is {window_ms} ms")]
    StaleCart { age_ms: i64, window_ms: i64 },

    /// The persisted cart belongs to a different identity than the key suggests.
    #[error("Persisted cart belongs to {found:?}, expected {expected:?}")]
    IdentityMismatch {
        expected: Option<String>,
        found: Option<String>,
    },

    /// The cart could not be serialized for storage.
    #[error("Failed to serialize cart: {0}")]
    Serialization(String),

    /// Validation error (wraps ValidationError).
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors.
#[derive(Debug, Error)]
pub enum ValidationError {
    /// A required field is missing or empty.
    #[error("{field} is required")]
    Required { field: String },

    /// Invalid format (e.g., a pincode that is not six digits).
    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },

    /// Field value is too long.
    #[error("{field} must be at most {max} characters")]
    TooLong { field: String, max: usize },
}

// =============================================================================
// Result Type Alias
// =============================================================================

/// Convenience type alias for Results with CoreError.
pub type CoreResult<T> = Result<T, CoreError>;

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = CoreError::StaleCart {
            age_ms: 90_000_000,
            window_ms: 86_400_000,
        };
        assert_eq!(
            err.to_string(),
            "Persisted cart is stale: saved 90000000 ms ago, window is 86400000 ms"
        );
    }

    #[test]
    fn test_validation_error_messages() {
        let err = ValidationError::Required {
            field: "product.id".to_string(),
        };
        assert_eq!(err.to_string(), "product.id is required");
    }

    #[test]
    fn test_validation_converts_to_core_error() {
        let validation_err = ValidationError::Required {
            field: "product.id".to_string(),
        };
        let core_err: CoreError = validation_err.into();
        assert!(matches!(core_err, CoreError::Validation(_)));
    }
}
