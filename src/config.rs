use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use crate::vhost::{VhostError, VirtualHosts};

pub const DEFAULT_CONFIG_PATH: &str = "porter.yaml";
const DEFAULT_LISTEN_ADDR: &str = "127.0.0.1:8080";
/// How long a client gets to deliver a complete request.
pub const DEFAULT_READ_TIMEOUT_SECS: u64 = 5;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("invalid config: {0}")]
    Parse(#[from] serde_yaml::Error),
    #[error("read_timeout_secs must be greater than zero")]
    ZeroTimeout,
    #[error(transparent)]
    VirtualHost(#[from] VhostError),
}

/// Server configuration, loaded from YAML:
///
/// ```yaml
/// server:
///   listen_addr: "0.0.0.0:8080"
///   read_timeout_secs: 5
/// virtual_hosts:
///   a.com: /srv/www/a
///   b.com: /srv/www/b
/// ```
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub virtual_hosts: BTreeMap<String, PathBuf>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub listen_addr: String,
    pub read_timeout_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_addr: DEFAULT_LISTEN_ADDR.to_string(),
            read_timeout_secs: DEFAULT_READ_TIMEOUT_SECS,
        }
    }
}

impl Config {
    /// Loads the file named by `PORTER_CONFIG` (default `porter.yaml`).
    /// `LISTEN`, when set, overrides the listen address.
    pub fn load() -> Result<Self, ConfigError> {
        let path = std::env::var("PORTER_CONFIG")
            .unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());

        let mut cfg = Self::from_file(&path)?;
        if let Ok(listen_addr) = std::env::var("LISTEN") {
            cfg.server.listen_addr = listen_addr;
        }
        Ok(cfg)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_yaml(&content)
    }

    pub fn from_yaml(content: &str) -> Result<Self, ConfigError> {
        let cfg: Config = serde_yaml::from_str(content)?;
        if cfg.server.read_timeout_secs == 0 {
            return Err(ConfigError::ZeroTimeout);
        }
        Ok(cfg)
    }

    pub fn read_timeout(&self) -> Duration {
        Duration::from_secs(self.server.read_timeout_secs)
    }

    /// Validates the configured document roots into the table shared by
    /// all connections.
    pub fn virtual_hosts(&self) -> Result<VirtualHosts, ConfigError> {
        Ok(VirtualHosts::validate(&self.virtual_hosts)?)
    }
}
