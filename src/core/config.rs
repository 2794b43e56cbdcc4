//! Store configuration
//!
//! Configuration is a small TOML document with a single `[database]`
//! section:
//!
//! ```toml
//! [database]
//! driver = "sqlite"
//! url = "sqlite:app.db"
//! ddl = "update"
//! ```
//!
//! Server drivers additionally require `username` and `password`; the
//! embedded SQLite driver must not carry them. [`StoreConfig::resolve`]
//! turns a parsed document into the settings handed to an engine,
//! rejecting incomplete or contradictory sections up front so that
//! nothing fails lazily at first use.

use std::path::Path;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::warn;

use super::driver::DriverKind;
use super::engine::EngineSettings;
use super::error::{Result, StoreError};

/// Scheme prepended to configured connection URLs
pub const URL_SCHEME: &str = "db:";

/// Top-level configuration document
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StoreConfig {
    /// The `[database]` section
    #[serde(default)]
    pub database: DatabaseSection,
}

/// Contents of the `[database]` section
///
/// Every key is optional at parse time; [`StoreConfig::resolve`] enforces
/// which combinations are acceptable.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DatabaseSection {
    /// Driver token, e.g. `"sqlite"` or `"postgresql"`
    #[serde(default)]
    pub driver: Option<String>,
    /// Connection URL without the `db:` scheme
    #[serde(default)]
    pub url: Option<String>,
    /// Username for server databases
    #[serde(default)]
    pub username: Option<String>,
    /// Password for server databases
    #[serde(default)]
    pub password: Option<String>,
    /// Schema management mode, passed through to the engine verbatim
    #[serde(default)]
    pub ddl: Option<String>,
}

impl StoreConfig {
    /// Load configuration from a TOML file
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| {
            StoreError::configuration(format!("cannot read {}: {}", path.display(), e))
        })?;
        Self::from_toml(&text)
    }

    /// Parse configuration from TOML text
    pub fn from_toml(text: &str) -> Result<Self> {
        toml::from_str(text)
            .map_err(|e| StoreError::configuration(format!("invalid configuration: {}", e)))
    }

    /// Validate the document and produce engine settings
    ///
    /// The configured URL comes back prefixed with the [`URL_SCHEME`]
    /// scheme; engines strip their own portion of it. The `ddl` value is
    /// not interpreted here, each engine decides what the modes mean.
    pub fn resolve(&self) -> Result<(DriverKind, EngineSettings)> {
        let section = &self.database;

        let driver = section
            .driver
            .as_deref()
            .ok_or_else(|| StoreError::configuration("missing 'database.driver'"))?;
        let kind = DriverKind::from_str(driver)?;

        let url = section
            .url
            .as_deref()
            .ok_or_else(|| StoreError::configuration("missing 'database.url'"))?;

        let (username, password) = if kind.is_embedded() {
            if section.username.is_some() || section.password.is_some() {
                warn!(
                    "ignoring credentials for embedded driver '{}'",
                    kind.as_str()
                );
            }
            (None, None)
        } else {
            let username = section.username.clone().ok_or_else(|| {
                StoreError::configuration(format!(
                    "driver '{}' requires 'database.username'",
                    kind.as_str()
                ))
            })?;
            let password = section.password.clone().ok_or_else(|| {
                StoreError::configuration(format!(
                    "driver '{}' requires 'database.password'",
                    kind.as_str()
                ))
            })?;
            (Some(username), Some(password))
        };

        let settings = EngineSettings {
            dialect: kind.dialect(),
            driver: kind.driver(),
            url: format!("{}{}", URL_SCHEME, url),
            username,
            password,
            ddl: section.ddl.clone(),
        };
        Ok((kind, settings))
    }
}
