//! Configuration loading and root folder resolution
//!
//! Configuration is layered the same way for every Aula binary:
//! 1. Command-line argument (highest priority)
//! 2. Environment variable
//! 3. TOML config file
//! 4. OS-dependent compiled default (fallback)
//!
//! Secrets (API keys, OAuth client secrets) may live in the TOML file but are
//! normally supplied through the environment.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Root folder override
pub const ROOT_FOLDER_ENV: &str = "AULA_ROOT_FOLDER";
/// Config file override
pub const CONFIG_ENV: &str = "AULA_CONFIG";
/// Database connection string override
pub const DATABASE_URL_ENV: &str = "AULA_DATABASE_URL";
pub const TUTOR_URL_ENV: &str = "AULA_TUTOR_URL";
pub const TUTOR_API_KEY_ENV: &str = "AULA_TUTOR_API_KEY";
pub const EVALUATOR_URL_ENV: &str = "AULA_EVALUATOR_URL";
pub const EVALUATOR_API_KEY_ENV: &str = "AULA_EVALUATOR_API_KEY";

/// Database file name inside the root folder
pub const DATABASE_FILE: &str = "aula.db";

/// Full TOML configuration
///
/// Every section is optional; missing keys fall back to compiled defaults.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TomlConfig {
    pub root_folder: Option<PathBuf>,
    pub logging: LoggingConfig,
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub session: SessionConfig,
    pub registration: RegistrationConfig,
    pub tutor: ServiceConfig,
    pub evaluator: ServiceConfig,
    pub oauth: OAuthConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default tracing directive (RUST_LOG still wins)
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Externally visible base URL, used to build OAuth redirect URIs
    pub public_url: String,
    /// Where students with an incomplete profile are sent
    pub onboarding_path: String,
    /// Where signed-in users land after authentication
    pub dashboard_path: String,
    /// Where the OAuth bridge sends users whose email is unknown
    pub registration_path: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 5780,
            public_url: "http://127.0.0.1:5780".to_string(),
            onboarding_path: "/onboarding".to_string(),
            dashboard_path: "/dashboard".to_string(),
            registration_path: "/register/complete".to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// sqlx connection string; defaults to `<root>/aula.db`
    pub url: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    pub ttl_hours: i64,
    pub cookie_name: String,
    /// Mark cookies `Secure` (enable behind HTTPS)
    pub secure_cookies: bool,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            ttl_hours: 24 * 7,
            cookie_name: "aula_session".to_string(),
            secure_cookies: false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RegistrationConfig {
    /// Lifetime of a staged OAuth profile awaiting the completion form
    pub pending_ttl_minutes: i64,
}

impl Default for RegistrationConfig {
    fn default() -> Self {
        Self {
            pending_ttl_minutes: 30,
        }
    }
}

/// Outbound AI service endpoint (tutor or evaluator)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    pub url: Option<String>,
    pub api_key: Option<String>,
    pub timeout_secs: u64,
    /// Number of previous messages forwarded as conversation context
    pub history_limit: u32,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            url: None,
            api_key: None,
            timeout_secs: 30,
            history_limit: 10,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct OAuthConfig {
    pub providers: Vec<OAuthProviderConfig>,
}

/// One OAuth2 / OIDC sign-in provider
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OAuthProviderConfig {
    pub name: String,
    pub client_id: String,
    #[serde(default)]
    pub client_secret: Option<String>,
    pub authorize_url: String,
    pub token_url: String,
    pub userinfo_url: String,
    #[serde(default = "default_scopes")]
    pub scopes: Vec<String>,
}

fn default_scopes() -> Vec<String> {
    vec![
        "openid".to_string(),
        "email".to_string(),
        "profile".to_string(),
    ]
}

impl OAuthProviderConfig {
    /// Environment variable carrying this provider's client secret
    pub fn secret_env_var(&self) -> String {
        format!(
            "AULA_OAUTH_{}_CLIENT_SECRET",
            self.name.to_uppercase().replace('-', "_")
        )
    }
}

/// Where `TomlConfig::locate` found (or failed to find) the config file
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigSource {
    File(PathBuf),
    Missing(PathBuf),
    NoConfigDir,
}

impl ConfigSource {
    /// Report the source; call once the tracing subscriber is installed
    pub fn log(&self) {
        match self {
            ConfigSource::File(path) => {
                info!("Loaded configuration from {}", path.display())
            }
            ConfigSource::Missing(path) => warn!(
                "Config file not found at {} - using defaults",
                path.display()
            ),
            ConfigSource::NoConfigDir => {
                warn!("Could not determine config directory - using defaults")
            }
        }
    }
}

impl TomlConfig {
    /// Load configuration from the explicit path, `AULA_CONFIG`, or the
    /// platform config directory, then apply environment overrides.
    ///
    /// A missing file is not an error: defaults are used and a warning logged.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        let (config, source) = Self::locate(explicit)?;
        source.log();
        Ok(config)
    }

    /// Same as [`TomlConfig::load`] without logging, for binaries that read
    /// their log level from the configuration itself
    pub fn locate(explicit: Option<&Path>) -> Result<(Self, ConfigSource)> {
        let path = explicit
            .map(Path::to_path_buf)
            .or_else(|| std::env::var(CONFIG_ENV).ok().map(PathBuf::from))
            .or_else(default_config_path);

        let (mut config, source) = match path {
            Some(path) if path.exists() => (load_toml_config(&path)?, ConfigSource::File(path)),
            Some(path) => (TomlConfig::default(), ConfigSource::Missing(path)),
            None => (TomlConfig::default(), ConfigSource::NoConfigDir),
        };

        config.apply_env_overrides();
        Ok((config, source))
    }

    /// Overlay environment variables onto the file configuration
    pub fn apply_env_overrides(&mut self) {
        if let Some(url) = non_empty_env(DATABASE_URL_ENV) {
            self.database.url = Some(url);
        }
        if let Some(url) = non_empty_env(TUTOR_URL_ENV) {
            self.tutor.url = Some(url);
        }
        if let Some(key) = non_empty_env(TUTOR_API_KEY_ENV) {
            self.tutor.api_key = Some(key);
        }
        if let Some(url) = non_empty_env(EVALUATOR_URL_ENV) {
            self.evaluator.url = Some(url);
        }
        if let Some(key) = non_empty_env(EVALUATOR_API_KEY_ENV) {
            self.evaluator.api_key = Some(key);
        }
        for provider in &mut self.oauth.providers {
            if let Some(secret) = non_empty_env(&provider.secret_env_var()) {
                provider.client_secret = Some(secret);
            }
        }
    }

    /// Look up an OAuth provider by name (case-insensitive)
    pub fn oauth_provider(&self, name: &str) -> Option<&OAuthProviderConfig> {
        self.oauth
            .providers
            .iter()
            .find(|p| p.name.eq_ignore_ascii_case(name))
    }
}

/// Parse a TOML config file
pub fn load_toml_config(path: &Path) -> Result<TomlConfig> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| Error::Config(format!("Read {} failed: {}", path.display(), e)))?;
    toml::from_str(&content)
        .map_err(|e| Error::Config(format!("Parse {} failed: {}", path.display(), e)))
}

/// Resolve the root folder (database and other state live here)
pub fn resolve_root_folder(cli_arg: Option<&Path>, config: &TomlConfig) -> PathBuf {
    // Priority 1: Command-line argument
    if let Some(path) = cli_arg {
        return path.to_path_buf();
    }

    // Priority 2: Environment variable
    if let Some(path) = non_empty_env(ROOT_FOLDER_ENV) {
        return PathBuf::from(path);
    }

    // Priority 3: TOML config file
    if let Some(path) = &config.root_folder {
        return path.clone();
    }

    // Priority 4: OS-dependent compiled default
    default_root_folder()
}

/// Database connection string: configured URL or `<root>/aula.db`
pub fn database_url(root_folder: &Path, config: &TomlConfig) -> String {
    match &config.database.url {
        Some(url) => url.clone(),
        None => format!(
            "sqlite://{}?mode=rwc",
            root_folder.join(DATABASE_FILE).display()
        ),
    }
}

/// Default configuration file path for the platform
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("aula").join("config.toml"))
}

/// OS-dependent default root folder path
pub fn default_root_folder() -> PathBuf {
    if cfg!(target_os = "windows") {
        dirs::data_local_dir()
            .map(|d| d.join("aula"))
            .unwrap_or_else(|| PathBuf::from("C:\\ProgramData\\aula"))
    } else {
        dirs::data_local_dir()
            .map(|d| d.join("aula"))
            .unwrap_or_else(|| PathBuf::from("./aula_data"))
    }
}

fn non_empty_env(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .filter(|value| !value.trim().is_empty())
}
