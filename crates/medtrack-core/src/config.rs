//! Application configuration.
//!
//! Sources are layered in this order, later ones winning:
//! 1. Built-in defaults
//! 2. `config/medtrack.{toml,yaml,json}` if present
//! 3. Environment variables (`MEDTRACK__*`)

use std::path::{Path, PathBuf};
use std::time::Duration;

use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::dashboard::ExpiryPolicy;

pub const CONFIG_FILE: &str = "config/medtrack";
pub const ENV_PREFIX: &str = "MEDTRACK";

const DEFAULT_API_BASE_URL: &str = "http://localhost:8000";
const DEFAULT_STATE_PATH: &str = "medtrack.db";
const DEFAULT_REDIRECT_URI: &str = "http://localhost:3000/auth/callback";
const DEFAULT_LOG_LEVEL: &str = "info";
const DEFAULT_TIMEOUT_SECS: u64 = 15;

/// Which inventory store to use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreKind {
    /// SQLite state file on this machine
    #[default]
    Local,
    /// Inventory REST API
    Remote,
}

/// Configuration loading errors
#[derive(Debug, Error)]
pub enum AppConfigError {
    #[error("Configuration loading failed: {0}")]
    Load(#[from] ConfigError),

    #[error("Configuration validation failed: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AppConfig {
    pub store: StoreKind,
    pub api_base_url: String,
    /// Sent as `X-User-Email` when no one is signed in
    #[serde(default)]
    pub user_email: Option<String>,
    /// Local state file (inventory for the local store, session for both)
    pub state_path: PathBuf,
    pub expiry_policy: ExpiryPolicy,
    pub request_timeout_secs: u64,
    #[serde(default)]
    pub google_client_id: String,
    pub google_redirect_uri: String,
    pub log_level: String,
    pub log_json: bool,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            store: StoreKind::default(),
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            user_email: None,
            state_path: PathBuf::from(DEFAULT_STATE_PATH),
            expiry_policy: ExpiryPolicy::default(),
            request_timeout_secs: DEFAULT_TIMEOUT_SECS,
            google_client_id: String::new(),
            google_redirect_uri: DEFAULT_REDIRECT_URI.to_string(),
            log_level: DEFAULT_LOG_LEVEL.to_string(),
            log_json: false,
        }
    }
}

impl AppConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn validate(&self) -> Result<(), AppConfigError> {
        if self.request_timeout_secs == 0 {
            return Err(AppConfigError::Invalid(
                "request_timeout_secs must be greater than zero".into(),
            ));
        }
        if self.store == StoreKind::Remote && self.api_base_url.trim().is_empty() {
            return Err(AppConfigError::Invalid(
                "api_base_url is required for the remote store".into(),
            ));
        }
        if self.state_path.as_os_str().is_empty() {
            return Err(AppConfigError::Invalid("state_path must not be empty".into()));
        }
        Ok(())
    }
}

/// Load configuration from the default file location and the environment.
pub fn load_config() -> Result<AppConfig, AppConfigError> {
    load_config_from(Path::new(CONFIG_FILE))
}

/// Load configuration with `file` (extension optional) as the file layer.
pub fn load_config_from(file: &Path) -> Result<AppConfig, AppConfigError> {
    let defaults = AppConfig::default();
    let config = Config::builder()
        .set_default("store", "local")?
        .set_default("api_base_url", defaults.api_base_url.as_str())?
        .set_default("state_path", DEFAULT_STATE_PATH)?
        .set_default("expiry_policy", defaults.expiry_policy.as_str())?
        .set_default("request_timeout_secs", DEFAULT_TIMEOUT_SECS as i64)?
        .set_default("google_redirect_uri", defaults.google_redirect_uri.as_str())?
        .set_default("log_level", DEFAULT_LOG_LEVEL)?
        .set_default("log_json", false)?
        .add_source(File::from(file).required(false))
        .add_source(Environment::with_prefix(ENV_PREFIX).separator("__"))
        .build()?;

    let app_config: AppConfig = config.try_deserialize()?;
    app_config.validate()?;

    tracing::debug!(
        store = ?app_config.store,
        state_path = %app_config.state_path.display(),
        "configuration loaded"
    );
    Ok(app_config)
}
