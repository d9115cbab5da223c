//! # Store Configuration
//!
//! Configuration for the store manager: where the backend lives, how long a
//! saved cart stays fresh, and where carts are stored.
//!
//! ## Configuration Sources
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Configuration Priority                               │
//! │                                                                         │
//! │  1. Environment Variables (highest priority)                           │
//! │     ANIMART_API_URL=https://api.animart.in/api                         │
//! │     ANIMART_CART_FRESHNESS_HOURS=24                                    │
//! │     ANIMART_FETCH_TIMEOUT_SECS=10                                      │
//! │     ANIMART_DB_PATH=/var/lib/animart/animart.db                        │
//! │                                                                         │
//! │  2. TOML Config File                                                   │
//! │     ~/.config/animart-store/store.toml (Linux)                         │
//! │     ~/Library/Application Support/com.animart.store/store.toml (macOS) │
//! │                                                                         │
//! │  3. Default Values (lowest priority)                                   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Configuration File Format
//! ```toml
//! [api]
//! base_url = "https://api.animart.in/api"
//! profile_path = "/user/profile"
//! timeout_secs = 10
//!
//! [cart]
//! freshness_hours = 24
//!
//! [storage]
//! database_path = "/var/lib/animart/animart.db"
//! connect_timeout_secs = 10
//! ```

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;
use tracing::{debug, info, warn};
use url::Url;

use animart_core::persistence::{DEFAULT_FRESHNESS_HOURS, MAX_FRESHNESS_HOURS};
use animart_core::FreshnessWindow;

use crate::error::{StoreError, StoreResult};

// =============================================================================
// API Settings
// =============================================================================

/// Backend connection settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiSettings {
    /// Base URL of the storefront API, without a trailing slash.
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Path of the profile endpoint, appended to `base_url`.
    #[serde(default = "default_profile_path")]
    pub profile_path: String,

    /// Address fetch timeout (seconds).
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
}

fn default_base_url() -> String {
    "http://localhost:5000/api".to_string()
}

fn default_profile_path() -> String {
    "/user/profile".to_string()
}

fn default_timeout() -> u64 {
    10
}

impl Default for ApiSettings {
    fn default() -> Self {
        ApiSettings {
            base_url: default_base_url(),
            profile_path: default_profile_path(),
            timeout_secs: default_timeout(),
        }
    }
}

impl ApiSettings {
    /// Full URL of the profile endpoint.
    ///
    /// Joined textually so a base path like `/api` is kept.
    pub fn profile_url(&self) -> StoreResult<Url> {
        let path = if self.profile_path.starts_with('/') {
            self.profile_path.clone()
        } else {
            format!("/{}", self.profile_path)
        };
        Ok(Url::parse(&format!(
            "{}{}",
            self.base_url.trim_end_matches('/'),
            path
        ))?)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

// =============================================================================
// Cart Settings
// =============================================================================

/// Cart persistence settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartSettings {
    /// How long a saved cart may be restored (hours).
    #[serde(default = "default_freshness_hours")]
    pub freshness_hours: i64,
}

fn default_freshness_hours() -> i64 {
    DEFAULT_FRESHNESS_HOURS
}

impl Default for CartSettings {
    fn default() -> Self {
        CartSettings {
            freshness_hours: default_freshness_hours(),
        }
    }
}

// =============================================================================
// Storage Settings
// =============================================================================

/// Where persisted carts live.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StorageSettings {
    /// SQLite file. Defaults to `animart.db` in the platform data directory.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub database_path: Option<PathBuf>,

    /// How long to wait for a database connection (seconds).
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,
}

fn default_connect_timeout() -> u64 {
    10
}

impl Default for StorageSettings {
    fn default() -> Self {
        StorageSettings {
            database_path: None,
            connect_timeout_secs: default_connect_timeout(),
        }
    }
}

impl StorageSettings {
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }
}

// =============================================================================
// Main Store Configuration
// =============================================================================

/// Complete store configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreConfig {
    #[serde(default)]
    pub api: ApiSettings,

    #[serde(default)]
    pub cart: CartSettings,

    #[serde(default)]
    pub storage: StorageSettings,
}

impl StoreConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads configuration from file, environment, and defaults.
    ///
    /// ## Load Order (later overrides earlier)
    /// 1. Default values
    /// 2. Config file (store.toml)
    /// 3. Environment variables
    pub fn load(config_path: Option<PathBuf>) -> StoreResult<Self> {
        let mut config = Self::default();

        if let Some(path) = config_path.or_else(Self::default_config_path) {
            if path.exists() {
                info!(?path, "Loading store config from file");
                let contents = std::fs::read_to_string(&path)?;
                config = toml::from_str(&contents)?;
            } else {
                debug!(?path, "Config file not found, using defaults");
            }
        }

        config.apply_env_overrides();
        config.validate()?;

        Ok(config)
    }

    /// Loads config or returns default if load fails.
    pub fn load_or_default(config_path: Option<PathBuf>) -> Self {
        Self::load(config_path).unwrap_or_else(|e| {
            warn!("Failed to load store config: {}. Using defaults.", e);
            Self::default()
        })
    }

    /// Saves configuration to file.
    pub fn save(&self, config_path: Option<PathBuf>) -> StoreResult<()> {
        let path = config_path
            .or_else(Self::default_config_path)
            .ok_or_else(|| StoreError::ConfigSaveFailed("No config path available".into()))?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let contents = toml::to_string_pretty(self)?;
        std::fs::write(&path, contents)?;

        info!(?path, "Store config saved");
        Ok(())
    }

    /// Validates the configuration.
    pub fn validate(&self) -> StoreResult<()> {
        let base = &self.api.base_url;
        if !base.starts_with("http://") && !base.starts_with("https://") {
            return Err(StoreError::InvalidUrl(format!(
                "API URL must start with http:// or https://, got: {}",
                base
            )));
        }
        self.api.profile_url()?;

        if self.api.timeout_secs == 0 {
            return Err(StoreError::InvalidConfig(
                "timeout_secs must be greater than 0".into(),
            ));
        }

        if self.storage.connect_timeout_secs == 0 {
            return Err(StoreError::InvalidConfig(
                "connect_timeout_secs must be greater than 0".into(),
            ));
        }

        if self.cart.freshness_hours <= 0 {
            return Err(StoreError::InvalidConfig(
                "freshness_hours must be greater than 0".into(),
            ));
        }

        if self.cart.freshness_hours > MAX_FRESHNESS_HOURS {
            return Err(StoreError::InvalidConfig(format!(
                "freshness_hours must be at most {}, got: {}",
                MAX_FRESHNESS_HOURS, self.cart.freshness_hours
            )));
        }

        Ok(())
    }

    /// Applies environment variable overrides.
    fn apply_env_overrides(&mut self) {
        self.apply_overrides(|name| std::env::var(name).ok());
    }

    /// Applies overrides from any variable lookup.
    fn apply_overrides(&mut self, var: impl Fn(&str) -> Option<String>) {
        if let Some(url) = var("ANIMART_API_URL") {
            debug!(url = %url, "Overriding API URL from environment");
            self.api.base_url = url;
        }

        if let Some(hours) = var("ANIMART_CART_FRESHNESS_HOURS") {
            match hours.parse::<i64>() {
                Ok(h) => self.cart.freshness_hours = h,
                Err(_) => warn!(value = %hours, "Ignoring invalid ANIMART_CART_FRESHNESS_HOURS"),
            }
        }

        if let Some(secs) = var("ANIMART_FETCH_TIMEOUT_SECS") {
            match secs.parse::<u64>() {
                Ok(s) => self.api.timeout_secs = s,
                Err(_) => warn!(value = %secs, "Ignoring invalid ANIMART_FETCH_TIMEOUT_SECS"),
            }
        }

        if let Some(path) = var("ANIMART_DB_PATH") {
            debug!(path = %path, "Overriding database path from environment");
            self.storage.database_path = Some(PathBuf::from(path));
        }
    }

    /// Returns the default config file path.
    fn default_config_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("com", "animart", "store")
            .map(|dirs| dirs.config_dir().join("store.toml"))
    }

    // =========================================================================
    // Convenience Methods
    // =========================================================================

    pub fn freshness_window(&self) -> FreshnessWindow {
        FreshnessWindow::from_hours(self.cart.freshness_hours)
    }

    /// The configured database file, or the platform default.
    pub fn database_path(&self) -> Option<PathBuf> {
        self.storage.database_path.clone().or_else(|| {
            directories::ProjectDirs::from("com", "animart", "store")
                .map(|dirs| dirs.data_dir().join("animart.db"))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_default_config() {
        let config = StoreConfig::default();
        assert_eq!(config.cart.freshness_hours, 24);
        assert_eq!(config.api.timeout_secs, 10);
        assert!(config.validate().is_ok());
        assert_eq!(
            config.freshness_window().as_millis(),
            24 * 60 * 60 * 1000
        );
    }

    #[test]
    fn test_profile_url_keeps_base_path() {
        let api = ApiSettings {
            base_url: "https://shop.example/api/".into(),
            profile_path: "user/profile".into(),
            timeout_secs: 5,
        };
        assert_eq!(
            api.profile_url().unwrap().as_str(),
            "https://shop.example/api/user/profile"
        );
    }

    #[test]
    fn test_config_validation() {
        let mut config = StoreConfig::default();

        config.api.base_url = "ftp://example".into();
        assert!(matches!(config.validate(), Err(StoreError::InvalidUrl(_))));

        config.api.base_url = "https://example".into();
        config.cart.freshness_hours = 0;
        assert!(matches!(
            config.validate(),
            Err(StoreError::InvalidConfig(_))
        ));

        config.cart.freshness_hours = 1;
        config.api.timeout_secs = 0;
        assert!(config.validate().is_err());

        config.api.timeout_secs = 5;
        config.storage.connect_timeout_secs = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_oversized_freshness_rejected() {
        let mut config = StoreConfig::default();
        config.cart.freshness_hours = 3_000_000_000_000;

        assert!(matches!(
            config.validate(),
            Err(StoreError::InvalidConfig(_))
        ));
        // Never panics, even unvalidated.
        assert_eq!(
            config.freshness_window(),
            FreshnessWindow::from_hours(MAX_FRESHNESS_HOURS)
        );

        config.cart.freshness_hours = MAX_FRESHNESS_HOURS;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_overrides() {
        let vars: HashMap<&str, &str> = HashMap::from([
            ("ANIMART_API_URL", "https://api.animart.in/api"),
            ("ANIMART_CART_FRESHNESS_HOURS", "48"),
            ("ANIMART_FETCH_TIMEOUT_SECS", "not-a-number"),
            ("ANIMART_DB_PATH", "/tmp/carts.db"),
        ]);

        let mut config = StoreConfig::default();
        config.apply_overrides(|name| vars.get(name).map(|v| v.to_string()));

        assert_eq!(config.api.base_url, "https://api.animart.in/api");
        assert_eq!(config.cart.freshness_hours, 48);
        assert_eq!(config.api.timeout_secs, 10);
        assert_eq!(
            config.database_path(),
            Some(PathBuf::from("/tmp/carts.db"))
        );
    }

    #[test]
    fn test_save_and_load_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("store.toml");

        let mut config = StoreConfig::default();
        config.cart.freshness_hours = 12;
        config.save(Some(path.clone())).unwrap();

        let contents = std::fs::read_to_string(&path).unwrap();
        assert!(contents.contains("[api]"));
        assert!(contents.contains("[cart]"));

        let loaded: StoreConfig = toml::from_str(&contents).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let config: StoreConfig = toml::from_str("[cart]\nfreshness_hours = 6\n").unwrap();
        assert_eq!(config.cart.freshness_hours, 6);
        assert_eq!(config.api, ApiSettings::default());
    }
}
