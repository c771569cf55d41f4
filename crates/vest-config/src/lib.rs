//! # vest-config
//!
//! Layered configuration loading for Vest using figment.
//!
//! Configuration sources (in priority order, highest wins):
//! 1. Environment variables (`VEST_*` prefix, `__` as separator)
//! 2. Project-level `.vest/config.toml`
//! 3. User-level `~/.config/vest/config.toml`
//! 4. Built-in defaults
//!
//! # Environment Variable Mapping
//!
//! Figment maps `VEST_AUTH__JWT_SECRET` -> `auth.jwt_secret`,
//! `VEST_SERVER__PORT` -> `server.port`, etc. The `__` (double underscore)
//! separates nested config sections.
//!
//! # Usage
//!
//! ```no_run
//! use vest_config::VestConfig;
//!
//! let config = VestConfig::load_with_dotenv().expect("config");
//! println!("listening on {}", config.server.bind_addr());
//! ```

mod auth;
mod database;
mod error;
mod general;
mod mail;
mod server;

pub use auth::{AuthConfig, MIN_JWT_SECRET_LEN};
pub use database::DatabaseConfig;
pub use error::ConfigError;
pub use general::GeneralConfig;
pub use mail::MailConfig;
pub use server::ServerConfig;

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Environment variable prefix for every setting.
pub const ENV_PREFIX: &str = "VEST_";

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct VestConfig {
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub auth: AuthConfig,
    #[serde(default)]
    pub mail: MailConfig,
    #[serde(default)]
    pub general: GeneralConfig,
}

impl VestConfig {
    /// Load configuration from all sources (TOML files + environment variables).
    ///
    /// Does NOT call `dotenvy`; use [`Self::load_with_dotenv`] for `.env` support.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Figment` if a source cannot be parsed or a value
    /// has the wrong type.
    pub fn load() -> Result<Self, ConfigError> {
        Self::figment().extract().map_err(ConfigError::from)
    }

    /// Load configuration with `.env` file support.
    ///
    /// # Errors
    ///
    /// Same as [`Self::load`].
    pub fn load_with_dotenv() -> Result<Self, ConfigError> {
        Self::load_dotenv_from_workspace();
        Self::load()
    }

    /// Load with `.env` support, reading the project layer from `config_dir`
    /// instead of `.vest/`.
    ///
    /// # Errors
    ///
    /// Same as [`Self::load`].
    pub fn load_from_dir(config_dir: &Path) -> Result<Self, ConfigError> {
        Self::load_dotenv_from_workspace();
        Self::figment_with_project_dir(config_dir)
            .extract()
            .map_err(ConfigError::from)
    }

    /// Build the figment provider chain with the default project directory.
    ///
    /// Public so tests can inspect the figment or add providers on top.
    #[must_use]
    pub fn figment() -> Figment {
        Self::figment_with_project_dir(Path::new(".vest"))
    }

    /// Build the provider chain reading `<project_dir>/config.toml` as the project layer.
    #[must_use]
    pub fn figment_with_project_dir(project_dir: &Path) -> Figment {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));

        if let Some(global_path) = Self::global_config_path() {
            if global_path.exists() {
                figment = figment.merge(Toml::file(global_path));
            }
        }

        let local_path = project_dir.join("config.toml");
        if local_path.exists() {
            figment = figment.merge(Toml::file(local_path));
        }

        figment.merge(Env::prefixed(ENV_PREFIX).split("__"))
    }

    fn global_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("vest").join("config.toml"))
    }

    /// Load `.env` from the workspace root, walking up from
    /// `CARGO_MANIFEST_DIR` when set. Silently does nothing if none is found.
    fn load_dotenv_from_workspace() {
        if let Ok(manifest_dir) = std::env::var("CARGO_MANIFEST_DIR") {
            let mut dir = PathBuf::from(manifest_dir);
            // crate -> crates/ -> workspace root
            for _ in 0..3 {
                let env_path = dir.join(".env");
                if env_path.exists() {
                    let _ = dotenvy::from_path(&env_path);
                    return;
                }
                if !dir.pop() {
                    break;
                }
            }
        }

        let _ = dotenvy::dotenv();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_loads() {
        let config = VestConfig::default();
        assert!(!config.database.is_configured());
        assert!(!config.auth.is_configured());
        assert!(!config.mail.enabled);
        assert_eq!(config.general.default_page_size, 20);
    }

    #[test]
    fn figment_builds_without_files() {
        figment::Jail::expect_with(|_jail| {
            let config: VestConfig = VestConfig::figment().extract()?;
            assert_eq!(config.server.port, 8080);
            assert_eq!(config.database.path, "vest.db");
            Ok(())
        });
    }
}
