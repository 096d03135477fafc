// ABOUTME: CLI error types with SNAFU pattern.
// ABOUTME: Wraps library errors with the target and operation that failed.

use snafu::Snafu;
use tether::error::{Error, ErrorKind};

#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum CommandError {
    #[snafu(display("configuration error: {source}"))]
    Config { source: Error },

    #[snafu(display("failed to connect to {target}: {source}"))]
    Connect { target: String, source: Error },

    #[snafu(display("{operation} on {target} failed: {source}"))]
    Remote {
        operation: &'static str,
        target: String,
        source: Error,
    },

    #[snafu(display("remote command exited with code {code}"))]
    RemoteExit { code: u32 },
}

impl CommandError {
    /// Library error kind behind this failure, if any.
    pub fn kind(&self) -> Option<ErrorKind> {
        match self {
            CommandError::Config { source }
            | CommandError::Connect { source, .. }
            | CommandError::Remote { source, .. } => Some(source.kind()),
            CommandError::RemoteExit { .. } => None,
        }
    }

    /// Process exit status for this failure.
    pub fn exit_code(&self) -> i32 {
        match self {
            CommandError::RemoteExit { code } => i32::try_from(*code).unwrap_or(1).clamp(1, 255),
            CommandError::Config { .. } => 2,
            CommandError::Connect { .. } => 3,
            CommandError::Remote { .. } => 1,
        }
    }
}
