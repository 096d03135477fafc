// ABOUTME: Error taxonomy for remote filesystem sessions.
// ABOUTME: Every error carries the failing host, path, or command and maps to an ErrorKind.

use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("invalid configuration: {0}")]
    Configuration(String),

    #[error("failed to load key from {path}: {reason}")]
    KeyLoadFailed { path: String, reason: String },

    #[error("{host}:{port} is unreachable: {reason}")]
    Unreachable {
        host: String,
        port: u16,
        reason: String,
    },

    #[error("authentication rejected for {user}@{host}")]
    AuthenticationFailed { user: String, host: String },

    #[error("host key for {0} was rejected")]
    HostKeyRejected(String),

    #[error("session is not connected")]
    NotConnected,

    #[error("session has been closed")]
    SessionClosed,

    #[error("failed to open {channel} channel: {reason}")]
    ChannelOpen {
        channel: &'static str,
        reason: String,
    },

    #[error("channel closed unexpectedly without exit status")]
    ChannelClosed,

    #[error("command `{command}` failed: {reason}")]
    CommandFailed { command: String, reason: String },

    #[error("command timed out after {0:?}")]
    CommandTimeout(Duration),

    #[error("handshake with {host} timed out after {after:?}")]
    HandshakeTimeout { host: String, after: Duration },

    #[error("{operation} on {path} timed out after {after:?}")]
    IoTimeout {
        operation: &'static str,
        path: String,
        after: Duration,
    },

    #[error("symlink cycle detected at {path} (links back to ancestor {canonical})")]
    SymlinkCycle { path: String, canonical: String },

    #[error("file-transfer protocol error: {0}")]
    Sftp(String),

    #[error("no such file or directory: {0}")]
    NotFound(String),

    #[error("invalid path {path}: {reason}")]
    InvalidPath { path: String, reason: String },

    #[error("remote {operation} failed on {path}: {message}")]
    Remote {
        operation: &'static str,
        path: String,
        message: String,
    },

    #[error("I/O error on {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("SSH protocol error: {0}")]
    Protocol(#[from] russh::Error),

    #[error("SSH key error: {0}")]
    Key(#[from] russh::keys::Error),

    #[error("YAML parse error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

/// Error category for programmatic handling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// The TCP probe before the handshake failed.
    Unreachable,
    /// The server rejected the configured credential or host key.
    Authentication,
    /// Transport or channel failure after the handshake started.
    Protocol,
    /// A path expected to exist does not.
    NotFound,
    /// A path lies outside its expected root or is malformed.
    InvalidPath,
    /// Read, write, or stat failure not covered above.
    Io,
    /// Invalid credential combination, port, or timeout.
    Configuration,
    /// A command, handshake, or request exceeded its deadline.
    Timeout,
}

impl Error {
    /// Returns the error kind for programmatic handling.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::Configuration(_) | Error::KeyLoadFailed { .. } | Error::Yaml(_) => {
                ErrorKind::Configuration
            }
            Error::Key(_) => ErrorKind::Configuration,
            Error::Unreachable { .. } => ErrorKind::Unreachable,
            Error::AuthenticationFailed { .. } | Error::HostKeyRejected(_) => {
                ErrorKind::Authentication
            }
            Error::NotConnected
            | Error::SessionClosed
            | Error::ChannelOpen { .. }
            | Error::ChannelClosed
            | Error::CommandFailed { .. }
            | Error::SymlinkCycle { .. }
            | Error::Sftp(_)
            | Error::Protocol(_) => ErrorKind::Protocol,
            Error::CommandTimeout(_) | Error::HandshakeTimeout { .. } | Error::IoTimeout { .. } => {
                ErrorKind::Timeout
            }
            Error::NotFound(_) => ErrorKind::NotFound,
            Error::InvalidPath { .. } => ErrorKind::InvalidPath,
            Error::Remote { .. } => ErrorKind::Io,
            Error::Io { source, .. } if source.kind() == std::io::ErrorKind::NotFound => {
                ErrorKind::NotFound
            }
            Error::Io { .. } => ErrorKind::Io,
        }
    }

    /// True when the error means "this path does not exist".
    pub fn is_not_found(&self) -> bool {
        self.kind() == ErrorKind::NotFound
    }

    pub(crate) fn io(path: impl Into<String>, source: std::io::Error) -> Self {
        Error::Io {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn invalid_path(path: impl Into<String>, reason: impl Into<String>) -> Self {
        Error::InvalidPath {
            path: path.into(),
            reason: reason.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
