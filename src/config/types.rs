use crate::core::status::types::{AddressError, Endpoint};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Top-level configuration file (`~/.sculkprobe/config.toml`)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub probe: ProbeConfig,
    #[serde(default)]
    pub servers: Vec<ServerEntry>,
}

/// Probe deadlines in milliseconds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProbeConfig {
    pub connect_timeout_ms: u64,
    pub read_timeout_ms: u64,
}

/// A named server address, `host` or `host:port`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerEntry {
    pub name: String,
    pub address: String,
}

impl ServerEntry {
    pub fn endpoint(&self) -> Result<Endpoint, AddressError> {
        Endpoint::parse(&self.address)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Home directory not found")]
    HomeDirNotFound,
    #[error("Failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Config parse error: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("Config serialize error: {0}")]
    Serialize(#[from] toml::ser::Error),
    #[error("Server '{name}' has an invalid address: {source}")]
    InvalidAddress {
        name: String,
        #[source]
        source: AddressError,
    },
    #[error("{0} must be greater than zero")]
    InvalidTimeout(&'static str),
    #[error("Environment variable {name} is not a number: {value}")]
    InvalidEnv { name: &'static str, value: String },
}
