//! # Profile API
//!
//! Fetches the shopper's saved addresses from the storefront backend.
//!
//! ## Wire Mapping
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  GET {base_url}/user/profile                                            │
//! │  Authorization: Bearer <token>                                          │
//! │                                                                         │
//! │  {"success": true, "user": {"addresses": [ ... ]}}                      │
//! │                                                                         │
//! │  backend (snake_case)         client (camelCase)                        │
//! │  ────────────────────         ──────────────────                        │
//! │  address              ───►    addressLine1                              │
//! │  address_line2        ───►    addressLine2                              │
//! │  is_default           ───►    isDefault                                 │
//! │  address_type "work"  ───►    addressType Work                          │
//! │  id 17 (number)       ───►    id "17"                                   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer};
use std::time::Duration;
use tracing::{debug, warn};
use url::Url;

use animart_core::validation::validate_address_id;
use animart_core::{Address, AddressType};

use crate::auth::AuthSession;
use crate::config::StoreConfig;
use crate::error::{StoreError, StoreResult};

/// Source of a shopper's saved addresses.
#[async_trait]
pub trait ProfileApi: Send + Sync {
    async fn fetch_addresses(&self, session: &AuthSession) -> StoreResult<Vec<Address>>;
}

// =============================================================================
// HTTP Client
// =============================================================================

/// [`ProfileApi`] over HTTP.
#[derive(Debug, Clone)]
pub struct HttpProfileApi {
    client: reqwest::Client,
    profile_url: Url,
}

impl HttpProfileApi {
    /// Creates a client for `profile_url` with a per-request timeout.
    ///
    /// # Errors
    ///
    /// Returns error if the HTTP client fails to build.
    pub fn new(profile_url: Url, timeout: Duration) -> StoreResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| StoreError::InvalidConfig(format!("HTTP client: {e}")))?;

        Ok(HttpProfileApi {
            client,
            profile_url,
        })
    }

    pub fn from_config(config: &StoreConfig) -> StoreResult<Self> {
        Self::new(config.api.profile_url()?, config.api.timeout())
    }

    pub fn profile_url(&self) -> &Url {
        &self.profile_url
    }

    async fn parse_error(response: reqwest::Response) -> StoreError {
        let status = response.status().as_u16();

        if status == 401 || status == 403 {
            return StoreError::Unauthorized;
        }

        let message = response
            .text()
            .await
            .unwrap_or_else(|_| "Unknown error".to_string());

        StoreError::Api { status, message }
    }
}

#[async_trait]
impl ProfileApi for HttpProfileApi {
    async fn fetch_addresses(&self, session: &AuthSession) -> StoreResult<Vec<Address>> {
        debug!(url = %self.profile_url, "Fetching saved addresses");

        let response = self
            .client
            .get(self.profile_url.clone())
            .bearer_auth(&session.token)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(Self::parse_error(response).await);
        }

        let body: ProfileResponse = response
            .json()
            .await
            .map_err(|e| StoreError::InvalidResponse(e.to_string()))?;

        if !body.success {
            return Err(StoreError::Api {
                status: 200,
                message: body
                    .message
                    .unwrap_or_else(|| "profile request unsuccessful".to_string()),
            });
        }

        let wire = body.user.map(|u| u.addresses).unwrap_or_default();
        Ok(map_addresses(wire))
    }
}

// =============================================================================
// Wire Types
// =============================================================================

#[derive(Debug, Deserialize)]
struct ProfileResponse {
    #[serde(default)]
    success: bool,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    user: Option<ProfileUser>,
}

#[derive(Debug, Deserialize)]
struct ProfileUser {
    #[serde(default)]
    addresses: Vec<WireAddress>,
}

/// An address as the backend sends it.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct WireAddress {
    #[serde(deserialize_with = "text")]
    id: String,
    name: String,
    address: String,
    address_line2: Option<String>,
    landmark: Option<String>,
    city: String,
    state: String,
    #[serde(deserialize_with = "text")]
    pincode: String,
    #[serde(deserialize_with = "text")]
    phone: String,
    is_default: bool,
    address_type: Option<String>,
    #[serde(deserialize_with = "optional_text")]
    user_id: Option<String>,
    created_at: Option<String>,
    updated_at: Option<String>,
}

impl From<WireAddress> for Address {
    fn from(wire: WireAddress) -> Self {
        Address {
            id: wire.id,
            name: wire.name,
            address_line1: wire.address,
            address_line2: wire.address_line2.filter(|s| !s.is_empty()),
            landmark: wire.landmark.filter(|s| !s.is_empty()),
            city: wire.city,
            state: wire.state,
            pincode: wire.pincode,
            phone: wire.phone,
            is_default: wire.is_default,
            address_type: wire
                .address_type
                .as_deref()
                .map(|t| t.parse::<AddressType>().unwrap_or_default())
                .unwrap_or_default(),
            user_id: wire.user_id,
            created_at: wire.created_at.as_deref().and_then(parse_timestamp),
            updated_at: wire.updated_at.as_deref().and_then(parse_timestamp),
        }
    }
}

/// Converts wire addresses, dropping any without a usable id.
fn map_addresses(wire: Vec<WireAddress>) -> Vec<Address> {
    wire.into_iter()
        .filter_map(|w| match validate_address_id(&w.id) {
            Ok(()) => Some(Address::from(w)),
            Err(e) => {
                warn!(error = %e, "Skipping address without a usable id");
                None
            }
        })
        .collect()
}

fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .ok()
}

/// Accepts a string or a number; the backend's ids and phone numbers are
/// not consistent about which.
fn text<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    Ok(optional_text(deserializer)?.unwrap_or_default())
}

fn optional_text<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<String>, D::Error> {
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(serde_json::Value::String(s)) => Some(s),
        Some(serde_json::Value::Number(n)) => Some(n.to_string()),
        _ => None,
    })
}
