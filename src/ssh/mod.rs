// ABOUTME: SSH session layer: transport, command channel, and SFTP file channel.
// ABOUTME: Production channels use russh; tests swap in fakes through the channel traits.

mod channel;
mod client;
mod probe;
mod session;
mod sftp;

pub use channel::{
    CommandChannel, CommandOutput, FileTransferChannel, RemoteReader, RemoteWriter, Transport,
};
pub use client::{RusshCommandChannel, RusshTransport};
pub use probe::probe;
pub use session::{SecureSession, SessionState};
pub use sftp::SftpChannel;
