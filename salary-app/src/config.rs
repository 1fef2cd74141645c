//! `salary.toml` loading.
//!
//! ```toml
//! [database]
//! backend = "sqlite"
//! connection_string = "salary.db"
//!
//! [auth.google]
//! id = "user-123"
//! email = "someone@example.com"
//!
//! [display]
//! unit = "man-yen"
//!
//! [logging]
//! level = "info"
//! file = "salary.log"
//! ```
//!
//! Every section is optional. Command-line flags are applied on top with
//! [`AppConfig::apply_overrides`].

use std::path::{Path, PathBuf};

use salary_core::AuthUser;
use salary_core::db::DbConfig;
use serde::Deserialize;
use thiserror::Error;
use tracing::debug;

use crate::units::DisplayUnit;

/// Used when `--config` is not given and the file exists.
pub const DEFAULT_CONFIG_FILE: &str = "salary.toml";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read config file '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config file '{path}': {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AppConfig {
    pub database: DbConfig,
    pub auth: AuthConfig,
    pub display: DisplayConfig,
    pub logging: LoggingConfig,
}

/// Identities the local sign-in hands out, one per provider.
///
/// Without an `[auth]` section a `local` identity is used. An `[auth]`
/// section that omits a provider disables it.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AuthConfig {
    #[serde(default)]
    pub google: Option<AuthUser>,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            google: Some(AuthUser {
                id: "local".to_string(),
                email: None,
            }),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DisplayConfig {
    pub unit: DisplayUnit,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LoggingConfig {
    /// A level name or any `EnvFilter` directive.
    pub level: String,
    pub file: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            file: None,
        }
    }
}

/// Command-line values that take precedence over the file.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub backend: Option<String>,
    pub db: Option<String>,
    pub unit: Option<DisplayUnit>,
    pub log_level: Option<String>,
    pub log_file: Option<PathBuf>,
}

impl AppConfig {
    pub fn from_toml_str(
        contents: &str,
        path: &Path,
    ) -> Result<Self, ConfigError> {
        toml::from_str(contents).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&contents, path)
    }

    /// Reads `explicit` if given, otherwise [`DEFAULT_CONFIG_FILE`] when it
    /// exists, otherwise returns the defaults.
    pub fn load(explicit: Option<&Path>) -> Result<Self, ConfigError> {
        match explicit {
            Some(path) => Self::from_file(path),
            None => {
                let fallback = Path::new(DEFAULT_CONFIG_FILE);
                if fallback.is_file() {
                    Self::from_file(fallback)
                } else {
                    debug!("no {} found; using defaults", DEFAULT_CONFIG_FILE);
                    Ok(Self::default())
                }
            }
        }
    }

    pub fn apply_overrides(
        &mut self,
        overrides: ConfigOverrides,
    ) {
        if let Some(backend) = overrides.backend {
            self.database.backend = backend;
        }
        if let Some(db) = overrides.db {
            self.database.connection_string = db;
        }
        if let Some(unit) = overrides.unit {
            self.display.unit = unit;
        }
        if let Some(level) = overrides.log_level {
            self.logging.level = level;
        }
        if let Some(file) = overrides.log_file {
            self.logging.file = Some(file);
        }
    }
}
