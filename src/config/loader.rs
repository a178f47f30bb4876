use super::types::{Config, ConfigError, ProbeConfig};
use crate::core::status::prober::ProbeOptions;
use crate::core::status::types::Endpoint;
use std::path::{Path, PathBuf};
use std::time::Duration;

const CONNECT_TIMEOUT_ENV: &str = "SCULKPROBE_CONNECT_TIMEOUT_MS";
const READ_TIMEOUT_ENV: &str = "SCULKPROBE_READ_TIMEOUT_MS";

impl Config {
    /// Default config location: `~/.sculkprobe/config.toml`
    pub fn config_path() -> Result<PathBuf, ConfigError> {
        let home = dirs::home_dir().ok_or(ConfigError::HomeDirNotFound)?;
        Ok(home.join(".sculkprobe").join("config.toml"))
    }

    /// Load from the default location and apply environment overrides
    ///
    /// A missing file yields the defaults; an unreadable or invalid one is an
    /// error.
    pub fn load() -> Result<Self, ConfigError> {
        let path = Self::config_path()?;
        if path.exists() {
            Self::load_at(&path)
        } else {
            Self::default().with_env_overrides()
        }
    }

    /// Load an explicit file and apply environment overrides
    ///
    /// Zero deadlines are rejected here so a probe never runs with one.
    pub fn load_at(path: &Path) -> Result<Self, ConfigError> {
        Self::load_from(path)?.with_env_overrides()
    }

    fn with_env_overrides(mut self) -> Result<Self, ConfigError> {
        self.apply_env_overrides()?;
        self.check_timeouts()?;
        Ok(self)
    }

    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(toml::from_str(&content)?)
    }

    /// Write the default config unless one already exists
    pub fn init() -> Result<PathBuf, ConfigError> {
        let path = Self::config_path()?;
        Self::init_at(&path)?;
        Ok(path)
    }

    /// Returns false when a file was already present
    pub fn init_at(path: &Path) -> Result<bool, ConfigError> {
        if path.exists() {
            return Ok(false);
        }
        Self::default().save_to(path)?;
        Ok(true)
    }

    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        let write_error = |source| ConfigError::Write {
            path: path.to_path_buf(),
            source,
        };
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(write_error)?;
        }
        std::fs::write(path, self.to_toml()?).map_err(write_error)
    }

    pub fn to_toml(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    pub fn print(&self) -> Result<(), ConfigError> {
        println!("{}", self.to_toml()?);
        Ok(())
    }

    /// Validate deadlines and every server address
    pub fn check(&self) -> Result<(), ConfigError> {
        self.check_timeouts()?;
        self.endpoints().map(|_| ())
    }

    fn check_timeouts(&self) -> Result<(), ConfigError> {
        if self.probe.connect_timeout_ms == 0 {
            return Err(ConfigError::InvalidTimeout("connect_timeout_ms"));
        }
        if self.probe.read_timeout_ms == 0 {
            return Err(ConfigError::InvalidTimeout("read_timeout_ms"));
        }
        Ok(())
    }

    /// Resolve configured servers into `(name, endpoint)` pairs
    pub fn endpoints(&self) -> Result<Vec<(String, Endpoint)>, ConfigError> {
        self.servers
            .iter()
            .map(|server| {
                server
                    .endpoint()
                    .map(|endpoint| (server.name.clone(), endpoint))
                    .map_err(|source| ConfigError::InvalidAddress {
                        name: server.name.clone(),
                        source,
                    })
            })
            .collect()
    }

    /// Apply SCULKPROBE_CONNECT_TIMEOUT_MS / SCULKPROBE_READ_TIMEOUT_MS
    pub fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        if let Some(value) = env_millis(CONNECT_TIMEOUT_ENV)? {
            self.probe.connect_timeout_ms = value;
        }
        if let Some(value) = env_millis(READ_TIMEOUT_ENV)? {
            self.probe.read_timeout_ms = value;
        }
        Ok(())
    }
}

fn env_millis(name: &'static str) -> Result<Option<u64>, ConfigError> {
    match std::env::var(name) {
        Ok(value) if value.trim().is_empty() => Ok(None),
        Ok(value) => value
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| ConfigError::InvalidEnv { name, value }),
        Err(_) => Ok(None),
    }
}

impl From<&ProbeConfig> for ProbeOptions {
    fn from(config: &ProbeConfig) -> Self {
        Self {
            connect_timeout: Duration::from_millis(config.connect_timeout_ms),
            read_timeout: Duration::from_millis(config.read_timeout_ms),
        }
    }
}
