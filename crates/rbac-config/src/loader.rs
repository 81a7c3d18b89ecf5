//! Configuration loader with layered sources.

use crate::{AppConfig, ConfigValidator};
use config::{Config, ConfigError, Environment, File};
use parking_lot::RwLock;
use rbac_core::RbacError;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Environment variable prefix for overrides (`RBAC__CACHE__PORT=6380`).
pub const ENV_PREFIX: &str = "RBAC";

/// Configuration loader with reload support.
#[derive(Clone)]
pub struct ConfigLoader {
    config: Arc<RwLock<AppConfig>>,
    config_dir: PathBuf,
}

impl ConfigLoader {
    /// Creates a new configuration loader.
    ///
    /// Configuration is loaded from multiple sources in order:
    /// 1. `config/default.toml` - Default values
    /// 2. `config/{environment}.toml` - Environment-specific overrides
    /// 3. `config/local.toml` - Local overrides
    /// 4. Environment variables with `RBAC__` prefix and `__` separator
    pub fn new(config_dir: impl Into<PathBuf>) -> Result<Self, RbacError> {
        let config_dir = config_dir.into();
        let config = Self::load_config(&config_dir)?;

        Ok(Self {
            config: Arc::new(RwLock::new(config)),
            config_dir,
        })
    }

    /// Loads configuration from the default location (`./config`).
    pub fn from_default_location() -> Result<Self, RbacError> {
        Self::new("./config")
    }

    /// Returns the current configuration.
    pub fn get(&self) -> AppConfig {
        self.config.read().clone()
    }

    /// Returns the directory configuration is read from.
    pub fn config_dir(&self) -> &Path {
        &self.config_dir
    }

    /// Reloads the configuration from disk.
    ///
    /// The previous configuration stays in place if the new one is invalid.
    pub fn reload(&self) -> Result<(), RbacError> {
        let new_config = Self::load_config(&self.config_dir)?;
        *self.config.write() = new_config;
        info!("Configuration reloaded successfully");
        Ok(())
    }

    /// Loads configuration from the specified directory.
    fn load_config(config_dir: &Path) -> Result<AppConfig, RbacError> {
        if let Err(e) = dotenvy::dotenv() {
            debug!("No .env file found or error loading it: {}", e);
        }

        let environment = std::env::var("RBAC_ENVIRONMENT").unwrap_or_else(|_| "development".to_string());

        info!(
            "Loading configuration for environment: {} from {}",
            environment,
            config_dir.display()
        );

        let mut builder = Config::builder();

        for name in ["default", environment.as_str(), "local"] {
            let path = config_dir.join(format!("{}.toml", name));
            if path.exists() {
                debug!("Loading config layer from: {}", path.display());
                builder = builder.add_source(File::from(path).required(false));
            }
        }

        builder = builder.add_source(
            Environment::with_prefix(ENV_PREFIX)
                .separator("__")
                .try_parsing(true),
        );

        let config = builder.build().map_err(config_error_to_rbac_error)?;

        let app_config: AppConfig = config
            .try_deserialize()
            .map_err(config_error_to_rbac_error)?;

        Self::validate_config(&app_config)?;

        Ok(app_config)
    }

    /// Validates the configuration, reporting every problem at once.
    fn validate_config(config: &AppConfig) -> Result<(), RbacError> {
        if config.app.environment == "production" && config.secrets.credential_profile == crate::CredentialProfile::Legacy {
            warn!("Legacy credential profile in production; generated passwords may contain characters the cache AUTH exchange rejects");
        }

        ConfigValidator::validate(config).map_err(|errors| {
            let message = errors
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join("; ");
            RbacError::Configuration(message)
        })
    }

    /// Gets a specific configuration value by key path.
    pub fn get_value<T: serde::de::DeserializeOwned>(&self, key: &str) -> Option<T> {
        let config = self.config.read();
        let json = serde_json::to_value(&*config).ok()?;

        let mut current = &json;
        for part in key.split('.') {
            current = current.get(part)?;
        }

        serde_json::from_value(current.clone()).ok()
    }
}

fn config_error_to_rbac_error(err: ConfigError) -> RbacError {
    RbacError::Configuration(err.to_string())
}
