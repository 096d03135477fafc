// ABOUTME: Collaborator traits for the secure transport and its two sub-channels.
// ABOUTME: Lets sessions run over russh in production and in-memory fakes in tests.

use crate::config::{ConnectionConfig, Credential};
use crate::error::Result;
use crate::types::RemoteEntry;
use async_trait::async_trait;
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncWrite};

/// Byte stream reading a remote file.
pub type RemoteReader = Box<dyn AsyncRead + Send + Unpin>;

/// Byte stream writing a remote file. Must be shut down to commit.
pub type RemoteWriter = Box<dyn AsyncWrite + Send + Unpin>;

/// Output from a remote command execution.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    /// Exit code of the command.
    pub exit_code: u32,
    /// Standard output.
    pub stdout: String,
    /// Standard error.
    pub stderr: String,
}

impl CommandOutput {
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }

    /// Standard error if it has any non-whitespace content, else standard output.
    ///
    /// Trailing whitespace is trimmed. A command that succeeds but writes to
    /// stderr is indistinguishable from a failure here; use `exit_code` when
    /// that matters.
    pub fn merged(&self) -> &str {
        if self.stderr.trim().is_empty() {
            self.stdout.trim_end()
        } else {
            self.stderr.trim_end()
        }
    }
}

/// The authenticated, encrypted connection that hosts both sub-channels.
#[async_trait]
pub trait Transport: Send + Sync {
    type Commands: CommandChannel + 'static;
    type Files: FileTransferChannel + 'static;

    /// Perform the protocol handshake with `config.host:config.port`.
    async fn connect(&mut self, config: &ConnectionConfig) -> Result<()>;

    /// Present the credential. `Ok(false)` means the server rejected it.
    async fn authenticate(&mut self, username: &str, credential: &Credential) -> Result<bool>;

    async fn open_command_channel(&mut self) -> Result<Self::Commands>;

    async fn open_file_transfer_channel(&mut self) -> Result<Self::Files>;

    /// Tear down the connection. Closing twice is not an error.
    async fn close(&mut self) -> Result<()>;
}

/// Runs shell commands on the remote host.
#[async_trait]
pub trait CommandChannel: Send + Sync {
    /// Run `command`, collecting stdout and stderr fully, within `timeout`.
    async fn run(&self, command: &str, timeout: Duration) -> Result<CommandOutput>;

    /// Closing twice is not an error.
    async fn close(&mut self) -> Result<()>;
}

/// Single-level filesystem primitives of the file-transfer protocol.
///
/// A missing path is always reported as an error whose
/// [`kind`](crate::error::Error::kind) is `NotFound`.
#[async_trait]
pub trait FileTransferChannel: Send + Sync {
    /// Stat following symlinks.
    async fn stat(&self, path: &str) -> Result<RemoteEntry>;

    /// Stat without following symlinks.
    async fn lstat(&self, path: &str) -> Result<RemoteEntry>;

    /// Child names of a directory, excluding `.` and `..`.
    async fn list(&self, path: &str) -> Result<Vec<String>>;

    async fn open_read(&self, path: &str) -> Result<RemoteReader>;

    /// Create or truncate `path` for writing.
    async fn open_write(&self, path: &str) -> Result<RemoteWriter>;

    async fn mkdir(&self, path: &str, mode: u32) -> Result<()>;

    async fn remove(&self, path: &str) -> Result<()>;

    async fn rmdir(&self, path: &str) -> Result<()>;

    async fn rename(&self, from: &str, to: &str) -> Result<()>;

    async fn chmod(&self, path: &str, mode: u32) -> Result<()>;

    async fn chown(&self, path: &str, uid: u32, gid: u32) -> Result<()>;

    /// Create a symlink at `link` pointing to `target`.
    async fn symlink(&self, target: &str, link: &str) -> Result<()>;

    async fn read_link(&self, path: &str) -> Result<String>;

    /// Absolute path with every symlink resolved.
    async fn canonicalize(&self, path: &str) -> Result<String>;

    /// Closing twice is not an error.
    async fn close(&mut self) -> Result<()>;
}
