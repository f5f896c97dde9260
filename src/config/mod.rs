//! Configuration.

pub mod error;

pub use error::Error;

use std::fs::read_to_string;
use std::io::ErrorKind;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::backend::Context;

/// Load the configuration file from disk, or use defaults
/// if it doesn't exist.
pub fn load(path: &Path) -> Result<Config, Error> {
    match read_to_string(path) {
        Ok(source) => {
            let config = Config::from_toml(&source)?;
            info!("loaded \"{}\"", path.display());
            Ok(config)
        }

        Err(err) if err.kind() == ErrorKind::NotFound => {
            warn!(
                "\"{}\" doesn't exist, loading defaults instead",
                path.display()
            );
            Ok(Config::default())
        }

        Err(err) => Err(Error::Io(err)),
    }
}

/// Configuration.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// Connection pool settings applied to every database.
    #[serde(default)]
    pub pool: Pool,
    /// Healthcheck settings.
    #[serde(default)]
    pub healthcheck: Healthcheck,
}

impl Config {
    /// Parse TOML.
    pub fn from_toml(source: &str) -> Result<Self, Error> {
        toml::from_str(source).map_err(|err| Error::config(source, err))
    }
}

/// Connection pool settings. Unset values are left alone.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, Default, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct Pool {
    /// Idle connections kept per database. `0` keeps none.
    pub max_idle_connections: Option<usize>,
    /// Open connections allowed per database. `0` is unlimited.
    pub max_open_connections: Option<usize>,
    /// How long a connection can be reused, in ms. `0` is forever.
    pub connection_max_lifetime: Option<u64>,
}

impl Pool {
    /// Connection max lifetime, `None` if connections are reused forever.
    pub fn connection_max_lifetime(&self) -> Option<Duration> {
        match self.connection_max_lifetime {
            Some(0) | None => None,
            Some(ms) => Some(Duration::from_millis(ms)),
        }
    }
}

/// Healthcheck settings.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct Healthcheck {
    /// How long to wait for all databases to answer, in ms.
    #[serde(default = "Healthcheck::timeout")]
    pub timeout: u64,
}

impl Default for Healthcheck {
    fn default() -> Self {
        Self {
            timeout: Self::timeout(),
        }
    }
}

impl Healthcheck {
    fn timeout() -> u64 {
        5_000
    }

    /// Healthcheck timeout.
    pub fn timeout_duration(&self) -> Duration {
        Duration::from_millis(self.timeout)
    }

    /// Context for a healthcheck starting now.
    pub fn context(&self) -> Context {
        Context::with_timeout(self.timeout_duration())
    }
}
