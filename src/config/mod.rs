//! Runtime settings (code > env > defaults) and the tenant registry.

pub mod registry;

pub use registry::{RegistryError, Tenant, TenantRegistry, CONFIG_FILE_NAME};

use std::path::PathBuf;
use std::time::Duration as StdDuration;

use chrono::Duration;
use tracing::warn;

use crate::auth::grant::{
    DeviceClient, DEFAULT_DEVICE_CLIENT_ID, DEFAULT_DEVICE_REALM, DEFAULT_ISSUER,
};

pub const ENV_ISSUER: &str = "IS_CLI_ISSUER";
pub const ENV_CONFIG_DIR: &str = "IS_CLI_CONFIG_DIR";
pub const ENV_DEVICE_CLIENT_ID: &str = "IS_CLI_DEVICE_CLIENT_ID";
pub const ENV_DEVICE_REALM: &str = "IS_CLI_DEVICE_REALM";
pub const ENV_SKEW_SECS: &str = "IS_CLI_SKEW_SECS";
pub const ENV_HTTP_TIMEOUT_SECS: &str = "IS_CLI_HTTP_TIMEOUT_SECS";
pub const ENV_KEYRING: &str = "IS_CLI_KEYRING";

const DEFAULT_SKEW_SECS: i64 = 5 * 60;
const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 30;

/// Settings shared by every command.
///
/// # Example
/// ```no_run
/// use is_cli::config::Settings;
///
/// let settings = Settings::from_env().with_issuer("http://localhost:9443");
/// println!("{}", settings.config_path().display());
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub issuer: String,
    pub config_dir: PathBuf,
    pub device_client: DeviceClient,
    pub skew_margin: Duration,
    pub http_timeout: StdDuration,
    pub use_keyring: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            issuer: DEFAULT_ISSUER.to_string(),
            config_dir: default_config_dir(),
            device_client: DeviceClient {
                client_id: DEFAULT_DEVICE_CLIENT_ID.to_string(),
                realm: DEFAULT_DEVICE_REALM.to_string(),
            },
            skew_margin: Duration::seconds(DEFAULT_SKEW_SECS),
            http_timeout: StdDuration::from_secs(DEFAULT_HTTP_TIMEOUT_SECS),
            use_keyring: true,
        }
    }
}

impl Settings {
    /// Load from environment variables, reading `.env` first if present.
    pub fn from_env() -> Self {
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build settings from an arbitrary key lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut settings = Self::default();
        let value = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        if let Some(issuer) = value(ENV_ISSUER) {
            settings.issuer = issuer;
        }
        if let Some(dir) = value(ENV_CONFIG_DIR) {
            settings.config_dir = PathBuf::from(dir);
        }
        if let Some(client_id) = value(ENV_DEVICE_CLIENT_ID) {
            settings.device_client.client_id = client_id;
        }
        if let Some(realm) = value(ENV_DEVICE_REALM) {
            settings.device_client.realm = realm;
        }
        if let Some(raw) = value(ENV_SKEW_SECS) {
            let margin = raw
                .parse::<i64>()
                .ok()
                .filter(|secs| *secs >= 0)
                .and_then(Duration::try_seconds);
            match margin {
                Some(margin) => settings.skew_margin = margin,
                _ => warn!(key = ENV_SKEW_SECS, value = %raw, "Ignoring invalid skew margin"),
            }
        }
        if let Some(raw) = value(ENV_HTTP_TIMEOUT_SECS) {
            match raw.parse::<u64>() {
                Ok(secs) if secs > 0 => settings.http_timeout = StdDuration::from_secs(secs),
                _ => warn!(
                    key = ENV_HTTP_TIMEOUT_SECS,
                    value = %raw,
                    "Ignoring invalid HTTP timeout"
                ),
            }
        }
        if let Some(raw) = value(ENV_KEYRING) {
            settings.use_keyring = !matches!(
                raw.to_ascii_lowercase().as_str(),
                "0" | "false" | "off" | "no"
            );
        }
        settings
    }

    pub fn with_issuer(mut self, issuer: impl Into<String>) -> Self {
        self.issuer = issuer.into();
        self
    }

    pub fn with_config_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config_dir = dir.into();
        self
    }

    pub fn with_device_client(mut self, device_client: DeviceClient) -> Self {
        self.device_client = device_client;
        self
    }

    pub fn with_skew_margin(mut self, skew_margin: Duration) -> Self {
        self.skew_margin = skew_margin;
        self
    }

    pub fn with_keyring(mut self, use_keyring: bool) -> Self {
        self.use_keyring = use_keyring;
        self
    }

    pub fn config_path(&self) -> PathBuf {
        self.config_dir.join(CONFIG_FILE_NAME)
    }

    pub fn load_registry(&self) -> Result<TenantRegistry, RegistryError> {
        TenantRegistry::load(self.config_path())
    }
}

fn default_config_dir() -> PathBuf {
    directories::UserDirs::new()
        .map(|dirs| dirs.home_dir().join(".is-cli"))
        .unwrap_or_else(|| PathBuf::from(".is-cli"))
}
