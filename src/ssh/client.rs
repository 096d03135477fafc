// ABOUTME: russh-backed transport and command channel.
// ABOUTME: Handles handshake, host key verification, authentication, and command execution.

use super::channel::{CommandChannel, CommandOutput, Transport};
use super::sftp::SftpChannel;
use crate::config::{ConnectionConfig, Credential, KeySource};
use crate::error::{Error, Result};
use async_trait::async_trait;
use russh::client::{self, Config, Handle};
use russh::keys::known_hosts::{
    check_known_hosts, check_known_hosts_path, learn_known_hosts, learn_known_hosts_path,
};
use russh::keys::{PrivateKeyWithHashAlg, decode_secret_key, load_secret_key, ssh_key};
use russh::{ChannelMsg, Disconnect, Preferred};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

/// SSH client handler for russh.
pub(crate) struct SshHandler {
    host: String,
    port: u16,
    trust_on_first_use: bool,
    known_hosts_path: Option<PathBuf>,
}

impl SshHandler {
    fn new(config: &ConnectionConfig) -> Self {
        Self {
            host: config.host.clone(),
            port: config.port,
            trust_on_first_use: config.trust_on_first_use,
            known_hosts_path: config.known_hosts_path.clone(),
        }
    }
}

impl client::Handler for SshHandler {
    type Error = russh::Error;

    async fn check_server_key(
        &mut self,
        server_public_key: &ssh_key::PublicKey,
    ) -> std::result::Result<bool, Self::Error> {
        let check_result = match &self.known_hosts_path {
            Some(path) => check_known_hosts_path(&self.host, self.port, server_public_key, path),
            None => check_known_hosts(&self.host, self.port, server_public_key),
        };

        match check_result {
            Ok(true) => Ok(true),
            Ok(false) if self.trust_on_first_use => {
                tracing::warn!(
                    "Trust-On-First-Use: accepting unknown host key for {}:{}",
                    self.host,
                    self.port
                );
                let learn_result = match &self.known_hosts_path {
                    Some(path) => {
                        learn_known_hosts_path(&self.host, self.port, server_public_key, path)
                    }
                    None => learn_known_hosts(&self.host, self.port, server_public_key),
                };
                if let Err(e) = learn_result {
                    tracing::warn!("Failed to save host key to known_hosts: {}", e);
                }
                Ok(true)
            }
            Ok(false) => Ok(false),
            Err(russh::keys::Error::KeyChanged { .. }) => {
                tracing::warn!("host key for {}:{} has changed", self.host, self.port);
                Ok(false)
            }
            // Unreadable known_hosts: treat as an unknown host.
            Err(_) => Ok(self.trust_on_first_use),
        }
    }
}

/// Connection state while the handshake is in progress vs. after channels exist.
enum Connection {
    Idle,
    Handshaking(Handle<SshHandler>),
    Ready(Arc<Handle<SshHandler>>),
}

/// Production [`Transport`] over russh.
pub struct RusshTransport {
    connection: Connection,
    host: String,
    io_timeout: Duration,
}

impl Default for RusshTransport {
    fn default() -> Self {
        Self {
            connection: Connection::Idle,
            host: String::new(),
            io_timeout: crate::config::DEFAULT_IO_TIMEOUT,
        }
    }
}

impl std::fmt::Debug for RusshTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = match self.connection {
            Connection::Idle => "idle",
            Connection::Handshaking(_) => "handshaking",
            Connection::Ready(_) => "ready",
        };
        f.debug_struct("RusshTransport")
            .field("host", &self.host)
            .field("state", &state)
            .finish()
    }
}

impl RusshTransport {
    fn handshaking(&mut self) -> Result<&mut Handle<SshHandler>> {
        match &mut self.connection {
            Connection::Handshaking(handle) => Ok(handle),
            _ => Err(Error::NotConnected),
        }
    }

    /// Share the handle between channels once authentication is done.
    fn shared(&mut self) -> Result<Arc<Handle<SshHandler>>> {
        let connection = std::mem::replace(&mut self.connection, Connection::Idle);
        let handle = match connection {
            Connection::Ready(handle) => handle,
            Connection::Handshaking(handle) => Arc::new(handle),
            Connection::Idle => return Err(Error::NotConnected),
        };
        self.connection = Connection::Ready(Arc::clone(&handle));
        Ok(handle)
    }
}

#[async_trait]
impl Transport for RusshTransport {
    type Commands = RusshCommandChannel;
    type Files = SftpChannel;

    async fn connect(&mut self, config: &ConnectionConfig) -> Result<()> {
        let russh_config = Config {
            preferred: if config.compression {
                Preferred::COMPRESSED
            } else {
                Preferred::DEFAULT
            },
            keepalive_interval: Some(Duration::from_secs(15)),
            keepalive_max: 3,
            ..Default::default()
        };

        let handler = SshHandler::new(config);
        let handle = client::connect(
            Arc::new(russh_config),
            (config.host.as_str(), config.port),
            handler,
        )
        .await
        .map_err(|e| connect_error(e, config))?;

        self.host = config.host.clone();
        self.io_timeout = config.io_timeout;
        self.connection = Connection::Handshaking(handle);
        Ok(())
    }

    async fn authenticate(&mut self, username: &str, credential: &Credential) -> Result<bool> {
        let handle = self.handshaking()?;
        match credential {
            Credential::Password(password) => {
                let result = handle
                    .authenticate_password(username, password.as_str())
                    .await
                    .map_err(Error::Protocol)?;
                Ok(result.success())
            }
            Credential::PrivateKey { source, passphrase } => {
                let key = match source {
                    KeySource::File(path) => load_secret_key(path, passphrase.as_deref())
                        .map_err(|e| Error::KeyLoadFailed {
                            path: path.display().to_string(),
                            reason: e.to_string(),
                        })?,
                    KeySource::Inline(pem) => decode_secret_key(pem, passphrase.as_deref())
                        .map_err(|e| Error::KeyLoadFailed {
                            path: "<inline key>".to_string(),
                            reason: e.to_string(),
                        })?,
                };

                let hash_alg = handle
                    .best_supported_rsa_hash()
                    .await
                    .map_err(Error::Protocol)?
                    .flatten();

                let result = handle
                    .authenticate_publickey(
                        username,
                        PrivateKeyWithHashAlg::new(Arc::new(key), hash_alg),
                    )
                    .await
                    .map_err(Error::Protocol)?;

                Ok(result.success())
            }
        }
    }

    async fn open_command_channel(&mut self) -> Result<RusshCommandChannel> {
        Ok(RusshCommandChannel {
            handle: Some(self.shared()?),
        })
    }

    async fn open_file_transfer_channel(&mut self) -> Result<SftpChannel> {
        let handle = self.shared()?;
        let channel = handle
            .channel_open_session()
            .await
            .map_err(|e| Error::ChannelOpen {
                channel: "sftp",
                reason: e.to_string(),
            })?;
        channel
            .request_subsystem(true, "sftp")
            .await
            .map_err(|e| Error::ChannelOpen {
                channel: "sftp",
                reason: e.to_string(),
            })?;
        SftpChannel::start(channel.into_stream(), self.io_timeout).await
    }

    async fn close(&mut self) -> Result<()> {
        match std::mem::replace(&mut self.connection, Connection::Idle) {
            Connection::Idle => Ok(()),
            Connection::Handshaking(handle) => handle
                .disconnect(Disconnect::ByApplication, "", "en")
                .await
                .map_err(Error::Protocol),
            Connection::Ready(handle) => handle
                .disconnect(Disconnect::ByApplication, "", "en")
                .await
                .map_err(Error::Protocol),
        }
    }
}

/// Command channel opening one russh session channel per command.
pub struct RusshCommandChannel {
    handle: Option<Arc<Handle<SshHandler>>>,
}

impl RusshCommandChannel {
    async fn exec_inner(&self, command: &str) -> Result<CommandOutput> {
        let handle = self.handle.as_ref().ok_or(Error::ChannelClosed)?;
        let mut channel = handle
            .channel_open_session()
            .await
            .map_err(|e| Error::CommandFailed {
                command: command.to_string(),
                reason: format!("failed to open channel: {}", e),
            })?;

        channel
            .exec(true, command)
            .await
            .map_err(|e| Error::CommandFailed {
                command: command.to_string(),
                reason: format!("failed to exec command: {}", e),
            })?;

        let mut stdout = Vec::new();
        let mut stderr = Vec::new();
        let mut exit_code = 0u32;

        let mut got_exit_status = false;
        let mut got_eof = false;

        loop {
            match channel.wait().await {
                Some(ChannelMsg::Data { data }) => {
                    stdout.extend_from_slice(&data);
                }
                Some(ChannelMsg::ExtendedData { data, ext }) => {
                    if ext == 1 {
                        // stderr
                        stderr.extend_from_slice(&data);
                    }
                }
                Some(ChannelMsg::ExitStatus { exit_status }) => {
                    exit_code = exit_status;
                    got_exit_status = true;
                    if got_eof {
                        break;
                    }
                }
                Some(ChannelMsg::Eof) => {
                    got_eof = true;
                    if got_exit_status {
                        break;
                    }
                }
                Some(ChannelMsg::Close) => {
                    break;
                }
                Some(_) => {}
                None => break,
            }
        }

        // No exit status means abnormal termination (dropped connection, killed sshd).
        if !got_exit_status {
            return Err(Error::ChannelClosed);
        }

        Ok(CommandOutput {
            exit_code,
            stdout: String::from_utf8_lossy(&stdout).to_string(),
            stderr: String::from_utf8_lossy(&stderr).to_string(),
        })
    }
}

#[async_trait]
impl CommandChannel for RusshCommandChannel {
    async fn run(&self, command: &str, timeout: Duration) -> Result<CommandOutput> {
        match tokio::time::timeout(timeout, self.exec_inner(command)).await {
            Ok(result) => result,
            Err(_) => Err(Error::CommandTimeout(timeout)),
        }
    }

    async fn close(&mut self) -> Result<()> {
        // Dropping the shared handle is enough; the transport owns disconnect.
        self.handle = None;
        Ok(())
    }
}

/// Classify a failure from the TCP connect and key exchange.
fn connect_error(error: russh::Error, config: &ConnectionConfig) -> Error {
    match error {
        russh::Error::UnknownKey => Error::HostKeyRejected(config.host.clone()),
        russh::Error::IO(io) if io.kind() == std::io::ErrorKind::ConnectionRefused => {
            Error::Unreachable {
                host: config.host.clone(),
                port: config.port,
                reason: "connection refused".to_string(),
            }
        }
        other => Error::Protocol(other),
    }
}
