use super::types::{Config, ProbeConfig};

pub const DEFAULT_CONNECT_TIMEOUT_MS: u64 = 5000;
pub const DEFAULT_READ_TIMEOUT_MS: u64 = 5000;

impl Default for ProbeConfig {
    fn default() -> Self {
        Self {
            connect_timeout_ms: DEFAULT_CONNECT_TIMEOUT_MS,
            read_timeout_ms: DEFAULT_READ_TIMEOUT_MS,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Config {
            probe: ProbeConfig::default(),
            servers: Vec::new(),
        }
    }
}
