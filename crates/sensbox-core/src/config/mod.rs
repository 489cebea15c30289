//! Application configuration schemas.
//!
//! All configuration structs are deserialized from TOML files via the
//! `config` crate, overlaid with `SENSBOX__*` environment variables and
//! finally with the legacy deployment variables (`REDIS_DSN`, `CORE_URL`,
//! `CORE_APP_ID`, `PARSE_SERVER_MASTER_KEY`).

pub mod directory;
pub mod feed;
pub mod logging;
pub mod registry;
pub mod server;

use serde::{Deserialize, Serialize};

use self::directory::DirectoryConfig;
use self::feed::FeedConfig;
use self::logging::LoggingConfig;
use self::registry::RegistryConfig;
use self::server::ServerConfig;

use crate::error::AppError;

/// Root application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Server settings.
    #[serde(default)]
    pub server: ServerConfig,
    /// Connection registry backend.
    #[serde(default)]
    pub registry: RegistryConfig,
    /// Directory Service endpoint.
    #[serde(default)]
    pub directory: DirectoryConfig,
    /// Configuration change feed.
    #[serde(default)]
    pub feed: FeedConfig,
    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Overrides taken from the variables the original deployment was driven by.
#[derive(Debug, Clone, Default)]
pub struct LegacyOverrides {
    /// `REDIS_DSN`
    pub redis_dsn: Option<String>,
    /// `CORE_URL`
    pub core_url: Option<String>,
    /// `CORE_APP_ID`
    pub core_app_id: Option<String>,
    /// `PARSE_SERVER_MASTER_KEY`
    pub master_key: Option<String>,
}

impl LegacyOverrides {
    /// Read the legacy variables from the process environment.
    pub fn from_env() -> Self {
        let var = |name: &str| std::env::var(name).ok().filter(|v| !v.is_empty());
        Self {
            redis_dsn: var("REDIS_DSN"),
            core_url: var("CORE_URL"),
            core_app_id: var("CORE_APP_ID"),
            master_key: var("PARSE_SERVER_MASTER_KEY"),
        }
    }
}

impl AppConfig {
    /// Load configuration for the given environment name.
    ///
    /// Merges `config/default.toml`, `config/{env}.toml`, environment
    /// variables prefixed with `SENSBOX__`, and the legacy variables.
    pub fn load(env: &str) -> Result<Self, AppError> {
        Self::build(env, LegacyOverrides::from_env())
    }

    /// Build configuration with explicit legacy overrides.
    pub fn build(env: &str, legacy: LegacyOverrides) -> Result<Self, AppError> {
        let selects_redis = legacy.redis_dsn.as_ref().map(|_| "redis");

        let config = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::File::with_name(&format!("config/{env}")).required(false))
            .add_source(
                config::Environment::with_prefix("SENSBOX")
                    .separator("__")
                    .try_parsing(true),
            )
            .set_override_option("registry.provider", selects_redis)?
            .set_override_option("registry.redis.url", legacy.redis_dsn)?
            .set_override_option("directory.url", legacy.core_url)?
            .set_override_option("directory.app_id", legacy.core_app_id)?
            .set_override_option("directory.master_key", legacy.master_key)?
            .build()
            .map_err(|e| AppError::configuration(format!("Failed to build config: {e}")))?;

        config
            .try_deserialize()
            .map_err(|e| AppError::configuration(format!("Failed to deserialize config: {e}")))
    }

    /// Websocket URL of the change feed.
    ///
    /// Falls back to the directory URL with its scheme switched to `ws`/`wss`.
    pub fn feed_url(&self) -> String {
        if !self.feed.url.is_empty() {
            return self.feed.url.clone();
        }
        let url = &self.directory.url;
        if let Some(rest) = url.strip_prefix("https://") {
            format!("wss://{rest}")
        } else if let Some(rest) = url.strip_prefix("http://") {
            format!("ws://{rest}")
        } else {
            url.clone()
        }
    }
}
