//! # Auth Signal
//!
//! The login state the store follows, and how an identity is derived from it.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  session                                   current_user_id              │
//! │  ───────                                   ───────────────              │
//! │  None                               ───►   None          (cart_guest)   │
//! │  Some { token: "",   .. }           ───►   None          (cart_guest)   │
//! │  Some { token, user_id: None }      ───►   "logged_in"   (cart_logged_in)│
//! │  Some { token, user_id: "u42" }     ───►   "u42"         (cart_u42)     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::fmt;
use tracing::warn;

use animart_core::validation::validate_user_id;

/// Identity used when a token is present but carries no user id.
pub const LOGGED_IN_MARKER: &str = "logged_in";

/// An authenticated session as published by the auth layer.
#[derive(Clone, PartialEq, Eq)]
pub struct AuthSession {
    /// Bearer token for backend calls.
    pub token: String,
    pub user_id: Option<String>,
}

impl AuthSession {
    pub fn new(token: impl Into<String>) -> Self {
        AuthSession {
            token: token.into(),
            user_id: None,
        }
    }

    pub fn with_user(mut self, user_id: impl Into<String>) -> Self {
        self.user_id = Some(user_id.into());
        self
    }

    pub fn has_token(&self) -> bool {
        !self.token.trim().is_empty()
    }
}

// Never print the token.
impl fmt::Debug for AuthSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthSession")
            .field("token", &"<redacted>")
            .field("user_id", &self.user_id)
            .finish()
    }
}

/// Derives the store identity from the auth signal.
///
/// A user id that can't be used as a storage key falls back to the
/// logged-in marker.
pub fn derive_user_id(session: Option<&AuthSession>) -> Option<String> {
    let session = session.filter(|s| s.has_token())?;

    match session.user_id.as_deref() {
        Some(id) => match validate_user_id(id) {
            Ok(()) => Some(id.to_string()),
            Err(e) => {
                warn!(error = %e, "Unusable user id in session; using logged-in marker");
                Some(LOGGED_IN_MARKER.to_string())
            }
        },
        None => Some(LOGGED_IN_MARKER.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_derive_user_id() {
        assert_eq!(derive_user_id(None), None);
        assert_eq!(derive_user_id(Some(&AuthSession::new("  "))), None);
        assert_eq!(
            derive_user_id(Some(&AuthSession::new("tok"))).as_deref(),
            Some(LOGGED_IN_MARKER)
        );
        assert_eq!(
            derive_user_id(Some(&AuthSession::new("tok").with_user("u42"))).as_deref(),
            Some("u42")
        );
        assert_eq!(
            derive_user_id(Some(&AuthSession::new("tok").with_user("has space"))).as_deref(),
            Some(LOGGED_IN_MARKER)
        );
    }

    #[test]
    fn test_debug_redacts_token() {
        let rendered = format!("{:?}", AuthSession::new("secret-token"));
        assert!(!rendered.contains("secret-token"));
    }
}
