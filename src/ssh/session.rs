// ABOUTME: Secure session owning the transport, command channel, and file-transfer channel.
// ABOUTME: Enforces connect/disconnect ordering and hands out the filesystem view.

use super::channel::{CommandChannel, CommandOutput, FileTransferChannel, Transport};
use super::client::RusshTransport;
use super::probe::probe;
use crate::config::ConnectionConfig;
use crate::error::{Error, Result};
use crate::fs::RemoteFileSystem;
use crate::transfer::{TransferEngine, TransferOptions};
use std::time::Duration;

/// Lifecycle of a [`SecureSession`]. There is no way back from `Closed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Unconnected,
    Connected,
    Closed,
}

/// One authenticated connection with its command and file-transfer channels.
///
/// All three handles live and die together. Operations on one session must
/// not overlap: the channels are used sequentially.
pub struct SecureSession<T: Transport = RusshTransport> {
    config: ConnectionConfig,
    transport: T,
    commands: Option<T::Commands>,
    files: Option<T::Files>,
    state: SessionState,
}

impl<T: Transport> std::fmt::Debug for SecureSession<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SecureSession")
            .field("config", &self.config)
            .field("state", &self.state)
            .finish()
    }
}

impl SecureSession<RusshTransport> {
    /// Create an unconnected session over russh.
    pub fn new(config: ConnectionConfig) -> Result<Self> {
        Self::with_transport(config, RusshTransport::default())
    }

    /// Create and connect in one step.
    pub async fn open(config: ConnectionConfig) -> Result<Self> {
        let mut session = Self::new(config)?;
        session.connect().await?;
        Ok(session)
    }
}

impl<T: Transport> SecureSession<T> {
    /// Create an unconnected session over the given transport.
    ///
    /// The configuration is validated here, before any network activity.
    pub fn with_transport(config: ConnectionConfig, transport: T) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            transport,
            commands: None,
            files: None,
            state: SessionState::Unconnected,
        })
    }

    pub fn config(&self) -> &ConnectionConfig {
        &self.config
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn is_connected(&self) -> bool {
        self.state == SessionState::Connected
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Probe, handshake, authenticate, then open the command channel and the
    /// file-transfer channel in that order.
    ///
    /// On any failure every handle opened so far is closed before the error
    /// is returned and the session stays `Unconnected`.
    pub async fn connect(&mut self) -> Result<()> {
        match self.state {
            SessionState::Connected => return Ok(()),
            SessionState::Closed => return Err(Error::SessionClosed),
            SessionState::Unconnected => {}
        }

        let target = self.config.display_target();
        probe(&self.config.host, self.config.port, self.config.auth_timeout).await?;
        tracing::debug!(%target, "port reachable, starting handshake");

        let deadline = self.config.auth_timeout;
        match tokio::time::timeout(deadline, handshake(&mut self.transport, &self.config)).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => {
                self.abort_transport().await;
                return Err(e);
            }
            Err(_) => {
                self.abort_transport().await;
                return Err(Error::HandshakeTimeout {
                    host: self.config.host.clone(),
                    after: deadline,
                });
            }
        }

        let mut commands = match self.transport.open_command_channel().await {
            Ok(commands) => commands,
            Err(e) => {
                self.abort_transport().await;
                return Err(e);
            }
        };

        let files = match self.transport.open_file_transfer_channel().await {
            Ok(files) => files,
            Err(e) => {
                if let Err(close_err) = commands.close().await {
                    tracing::warn!("failed to close command channel: {}", close_err);
                }
                self.abort_transport().await;
                return Err(e);
            }
        };

        self.commands = Some(commands);
        self.files = Some(files);
        self.state = SessionState::Connected;
        tracing::info!(%target, "session connected");
        Ok(())
    }

    async fn abort_transport(&mut self) {
        if let Err(e) = self.transport.close().await {
            tracing::warn!("failed to close transport after connect failure: {}", e);
        }
    }

    /// Close the file-transfer channel, the command channel, then the transport.
    ///
    /// Every handle is closed even if an earlier one fails; the first failure
    /// is returned. Disconnecting a closed session is a no-op.
    pub async fn disconnect(&mut self) -> Result<()> {
        if self.state == SessionState::Closed {
            return Ok(());
        }

        let mut first_error = None;

        if let Some(mut files) = self.files.take()
            && let Err(e) = files.close().await
        {
            tracing::warn!("failed to close file-transfer channel: {}", e);
            first_error.get_or_insert(e);
        }

        if let Some(mut commands) = self.commands.take()
            && let Err(e) = commands.close().await
        {
            tracing::warn!("failed to close command channel: {}", e);
            first_error.get_or_insert(e);
        }

        if let Err(e) = self.transport.close().await {
            tracing::warn!("failed to close transport: {}", e);
            first_error.get_or_insert(e);
        }

        self.state = SessionState::Closed;
        tracing::info!(target = %self.config.display_target(), "session closed");

        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    /// Run a command and return stderr if it has content, else stdout.
    ///
    /// On timeout the command channel is in an undefined state; disconnect
    /// and reconnect rather than reusing the session.
    pub async fn execute(&self, command: &str, timeout: Duration) -> Result<String> {
        let output = self.execute_output(command, timeout).await?;
        Ok(output.merged().to_string())
    }

    /// Execute with the configured default command timeout.
    pub async fn exec(&self, command: &str) -> Result<String> {
        self.execute(command, self.config.command_timeout).await
    }

    /// Run a command and return its exit code and both streams separately.
    pub async fn execute_output(&self, command: &str, timeout: Duration) -> Result<CommandOutput> {
        let (commands, _) = self.channels()?;
        tracing::debug!(command, "executing remote command");
        commands.run(command, timeout).await
    }

    /// Filesystem view borrowing this session's channels.
    pub fn filesystem(&self) -> Result<RemoteFileSystem<'_>> {
        let (commands, files) = self.channels()?;
        Ok(RemoteFileSystem::new(commands, files).with_command_timeout(self.config.command_timeout))
    }

    /// Transfer engine over this session. Chunk reads and writes are
    /// bounded by the configured I/O timeout.
    pub fn transfer(&self) -> Result<TransferEngine<'_>> {
        let options = TransferOptions {
            io_timeout: self.config.io_timeout,
            ..TransferOptions::default()
        };
        Ok(TransferEngine::new(self.filesystem()?).with_options(options))
    }

    fn channels(&self) -> Result<(&dyn CommandChannel, &dyn FileTransferChannel)> {
        match self.state {
            SessionState::Unconnected => return Err(Error::NotConnected),
            SessionState::Closed => return Err(Error::SessionClosed),
            SessionState::Connected => {}
        }
        match (&self.commands, &self.files) {
            (Some(commands), Some(files)) => {
                let commands: &dyn CommandChannel = commands;
                let files: &dyn FileTransferChannel = files;
                Ok((commands, files))
            }
            _ => Err(Error::NotConnected),
        }
    }
}

async fn handshake<T: Transport>(transport: &mut T, config: &ConnectionConfig) -> Result<()> {
    transport.connect(config).await?;

    let credential = config.credential.as_ref().ok_or_else(|| {
        Error::Configuration("one of password or private_key is required".to_string())
    })?;

    tracing::debug!(user = %config.username, method = credential.method(), "authenticating");
    if !transport.authenticate(&config.username, credential).await? {
        return Err(Error::AuthenticationFailed {
            user: config.username.clone(),
            host: config.host.clone(),
        });
    }
    Ok(())
}
