// ABOUTME: Inventory entry for one remote host.
// ABOUTME: Parses "host", "user@host", "host:port", "user@host:port" and builds ConnectionConfig.

use super::{
    ConnectionConfig, CredentialSpec, DEFAULT_AUTH_TIMEOUT, DEFAULT_COMMAND_TIMEOUT,
    DEFAULT_IO_TIMEOUT, DEFAULT_PORT, EnvValue, credential::expand_home,
};
use crate::error::{Error, Result};
use serde::Deserialize;
use std::time::Duration;

#[derive(Debug, Clone, Deserialize)]
pub struct HostConfig {
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub password: Option<EnvValue>,
    #[serde(default)]
    pub private_key: Option<String>,
    #[serde(default)]
    pub passphrase: Option<EnvValue>,
    #[serde(default)]
    pub compression: bool,
    #[serde(default = "default_auth_timeout", with = "humantime_serde")]
    pub auth_timeout: Duration,
    #[serde(default = "default_io_timeout", with = "humantime_serde")]
    pub io_timeout: Duration,
    #[serde(default = "default_command_timeout", with = "humantime_serde")]
    pub command_timeout: Duration,
    #[serde(default)]
    pub trust_first_connection: bool,
    #[serde(default)]
    pub known_hosts: Option<String>,
}

fn default_port() -> u16 {
    DEFAULT_PORT
}

fn default_auth_timeout() -> Duration {
    DEFAULT_AUTH_TIMEOUT
}

fn default_io_timeout() -> Duration {
    DEFAULT_IO_TIMEOUT
}

fn default_command_timeout() -> Duration {
    DEFAULT_COMMAND_TIMEOUT
}

impl HostConfig {
    /// Parse an ad-hoc target of the form `[user@]host[:port]`.
    pub fn parse(s: &str) -> std::result::Result<Self, String> {
        let s = s.trim();
        if s.is_empty() {
            return Err("host address cannot be empty".to_string());
        }

        let (user_part, rest) = if let Some(at_pos) = s.find('@') {
            (Some(&s[..at_pos]), &s[at_pos + 1..])
        } else {
            (None, s)
        };

        let (host, port) = if let Some(colon_pos) = rest.rfind(':') {
            let port_str = &rest[colon_pos + 1..];
            let port = port_str
                .parse::<u16>()
                .map_err(|_| format!("invalid port: {}", port_str))?;
            (&rest[..colon_pos], port)
        } else {
            (rest, DEFAULT_PORT)
        };

        if host.is_empty() {
            return Err("hostname cannot be empty".to_string());
        }
        if user_part.is_some_and(str::is_empty) {
            return Err("username cannot be empty".to_string());
        }

        Ok(HostConfig {
            host: host.to_string(),
            port,
            username: user_part.map(|s| s.to_string()),
            password: None,
            private_key: None,
            passphrase: None,
            compression: false,
            auth_timeout: DEFAULT_AUTH_TIMEOUT,
            io_timeout: DEFAULT_IO_TIMEOUT,
            command_timeout: DEFAULT_COMMAND_TIMEOUT,
            trust_first_connection: false,
            known_hosts: None,
        })
    }

    pub fn credential_spec(&self) -> CredentialSpec {
        CredentialSpec {
            password: self.password.clone(),
            private_key: self.private_key.clone(),
            passphrase: self.passphrase.clone(),
        }
    }

    /// Resolve secrets and produce a validated connection config.
    ///
    /// A missing username falls back to `$USER`, then `root`.
    pub fn connection_config(&self) -> Result<ConnectionConfig> {
        let username = self
            .username
            .clone()
            .unwrap_or_else(|| std::env::var("USER").unwrap_or_else(|_| "root".to_string()));
        let credential = self.credential_spec().resolve()?;

        let mut config = ConnectionConfig::new(&self.host, username)
            .port(self.port)
            .credential(credential)
            .compression(self.compression)
            .auth_timeout(self.auth_timeout)
            .io_timeout(self.io_timeout)
            .command_timeout(self.command_timeout)
            .trust_on_first_use(self.trust_first_connection);
        if let Some(path) = &self.known_hosts {
            config = config.known_hosts_path(expand_home(path));
        }

        config.validate()?;
        Ok(config)
    }
}

impl std::str::FromStr for HostConfig {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        HostConfig::parse(s).map_err(Error::Configuration)
    }
}
