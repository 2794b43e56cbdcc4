//! Database driver identification
//!
//! Maps the `driver` key of a configuration file onto a SQL dialect and
//! the Rust crate expected to speak it. Only SQLite is wired to a working
//! engine in this crate; the other entries exist so configurations written
//! for them fail with a precise message instead of a generic one.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::error::StoreError;

/// Supported database drivers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DriverKind {
    /// Embedded SQLite database
    Sqlite,
    /// MySQL or MariaDB server
    Mysql,
    /// PostgreSQL server
    Postgres,
}

impl DriverKind {
    /// Canonical configuration token for this driver
    pub fn as_str(&self) -> &'static str {
        match self {
            DriverKind::Sqlite => "sqlite",
            DriverKind::Mysql => "mysql",
            DriverKind::Postgres => "postgresql",
        }
    }

    /// SQL dialect spoken by this driver
    pub fn dialect(&self) -> &'static str {
        match self {
            DriverKind::Sqlite => "sqlite",
            DriverKind::Mysql => "mysql",
            DriverKind::Postgres => "postgresql",
        }
    }

    /// Crate expected to provide connectivity for this driver
    pub fn driver(&self) -> &'static str {
        match self {
            DriverKind::Sqlite => "rusqlite",
            DriverKind::Mysql => "mysql_async",
            DriverKind::Postgres => "tokio-postgres",
        }
    }

    /// Whether the database runs in-process rather than over a socket
    ///
    /// Embedded drivers are exempt from the credential requirements that
    /// server drivers carry.
    pub fn is_embedded(&self) -> bool {
        matches!(self, DriverKind::Sqlite)
    }
}

impl FromStr for DriverKind {
    type Err = StoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "sqlite" | "sqlite3" => Ok(DriverKind::Sqlite),
            "mysql" | "mariadb" => Ok(DriverKind::Mysql),
            "postgres" | "postgresql" => Ok(DriverKind::Postgres),
            other => Err(StoreError::configuration(format!(
                "unknown database driver '{}' (expected sqlite, mysql, or postgresql)",
                other
            ))),
        }
    }
}

impl fmt::Display for DriverKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
