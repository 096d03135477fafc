// ABOUTME: Immutable parameters for one SSH session.
// ABOUTME: Builder-style construction and validation before any network activity.

use super::Credential;
use crate::error::{Error, Result};
use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_PORT: u16 = 22;
pub const DEFAULT_AUTH_TIMEOUT: Duration = Duration::from_secs(10);
pub const DEFAULT_IO_TIMEOUT: Duration = Duration::from_secs(30);
pub const DEFAULT_COMMAND_TIMEOUT: Duration = Duration::from_secs(3600);

/// Configuration for establishing a secure session.
#[derive(Debug, Clone)]
pub struct ConnectionConfig {
    /// Remote host to connect to.
    pub host: String,
    /// SSH port (default: 22).
    pub port: u16,
    /// Username for authentication.
    pub username: String,
    /// Password or private key.
    pub credential: Option<Credential>,
    /// Negotiate zlib compression when the server offers it.
    pub compression: bool,
    /// Bound on the TCP probe, handshake, and authentication together.
    pub auth_timeout: Duration,
    /// Bound on each file-transfer request.
    pub io_timeout: Duration,
    /// Default timeout for remote commands (default: 1 hour).
    pub command_timeout: Duration,
    /// Whether to accept unknown hosts (Trust On First Use).
    /// If false, connection to unknown hosts will fail.
    pub trust_on_first_use: bool,
    /// Optional path to known_hosts file.
    /// If None, uses the default ~/.ssh/known_hosts.
    pub known_hosts_path: Option<PathBuf>,
}

impl ConnectionConfig {
    pub fn new(host: impl Into<String>, username: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            port: DEFAULT_PORT,
            username: username.into(),
            credential: None,
            compression: false,
            auth_timeout: DEFAULT_AUTH_TIMEOUT,
            io_timeout: DEFAULT_IO_TIMEOUT,
            command_timeout: DEFAULT_COMMAND_TIMEOUT,
            trust_on_first_use: false,
            known_hosts_path: None,
        }
    }

    pub fn port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    pub fn credential(mut self, credential: Credential) -> Self {
        self.credential = Some(credential);
        self
    }

    pub fn compression(mut self, enabled: bool) -> Self {
        self.compression = enabled;
        self
    }

    pub fn auth_timeout(mut self, timeout: Duration) -> Self {
        self.auth_timeout = timeout;
        self
    }

    pub fn io_timeout(mut self, timeout: Duration) -> Self {
        self.io_timeout = timeout;
        self
    }

    pub fn command_timeout(mut self, timeout: Duration) -> Self {
        self.command_timeout = timeout;
        self
    }

    pub fn trust_on_first_use(mut self, tofu: bool) -> Self {
        self.trust_on_first_use = tofu;
        self
    }

    pub fn known_hosts_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.known_hosts_path = Some(path.into());
        self
    }

    /// Check the configuration without touching the network.
    pub fn validate(&self) -> Result<()> {
        if self.host.trim().is_empty() {
            return Err(Error::Configuration("host cannot be empty".to_string()));
        }
        if self.username.trim().is_empty() {
            return Err(Error::Configuration("username cannot be empty".to_string()));
        }
        if self.port == 0 {
            return Err(Error::Configuration("port must be in 1..=65535".to_string()));
        }
        if self.credential.is_none() {
            return Err(Error::Configuration(
                "one of password or private_key is required".to_string(),
            ));
        }
        for (name, value) in [
            ("auth_timeout", self.auth_timeout),
            ("io_timeout", self.io_timeout),
            ("command_timeout", self.command_timeout),
        ] {
            if value.is_zero() {
                return Err(Error::Configuration(format!("{name} must be non-zero")));
            }
        }
        Ok(())
    }

    /// `user@host:port`, used in logs and error messages.
    pub fn display_target(&self) -> String {
        format!("{}@{}:{}", self.username, self.host, self.port)
    }
}
