// ABOUTME: Connection configuration and the tether.yml host inventory.
// ABOUTME: Handles YAML parsing, env var secrets, and config discovery.

mod connection;
mod credential;
mod env_value;
mod host;
mod init;

pub use connection::{
    ConnectionConfig, DEFAULT_AUTH_TIMEOUT, DEFAULT_COMMAND_TIMEOUT, DEFAULT_IO_TIMEOUT,
    DEFAULT_PORT,
};
pub use credential::{Credential, CredentialSpec, KeySource};
pub use env_value::EnvValue;
pub use host::HostConfig;
pub use init::init_config;

use crate::error::{Error, Result};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

pub const CONFIG_FILENAME: &str = "tether.yml";
pub const CONFIG_FILENAME_ALT: &str = "tether.yaml";
pub const CONFIG_FILENAME_DIR: &str = ".tether/config.yml";

/// Host inventory loaded from `tether.yml`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub hosts: BTreeMap<String, HostConfig>,
}

impl Config {
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        serde_yaml::from_str(yaml).map_err(Error::from)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let content =
            std::fs::read_to_string(path).map_err(|e| Error::io(path.display().to_string(), e))?;
        Self::from_yaml(&content)
    }

    /// First inventory file present in `dir`, in precedence order.
    pub fn find(dir: &Path) -> Option<PathBuf> {
        [
            dir.join(CONFIG_FILENAME),
            dir.join(CONFIG_FILENAME_ALT),
            dir.join(CONFIG_FILENAME_DIR),
        ]
        .into_iter()
        .find(|path| path.exists())
    }

    pub fn discover(dir: &Path) -> Result<Self> {
        match Self::find(dir) {
            Some(path) => Self::load(&path),
            None => Err(Error::Configuration(format!(
                "no {} found in {}",
                CONFIG_FILENAME,
                dir.display()
            ))),
        }
    }

    pub fn host(&self, name: &str) -> Result<&HostConfig> {
        self.hosts
            .get(name)
            .ok_or_else(|| Error::Configuration(format!("unknown host: {name}")))
    }

    /// Resolve a named host, or parse `name` as an ad-hoc `[user@]host[:port]` target.
    pub fn resolve_target(&self, name: &str) -> Result<HostConfig> {
        match self.hosts.get(name) {
            Some(host) => Ok(host.clone()),
            None => name.parse(),
        }
    }
}
