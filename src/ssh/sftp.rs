// ABOUTME: File-transfer channel over the SFTP subsystem using russh-sftp.
// ABOUTME: Bounds every request by the I/O timeout and maps status codes to the error taxonomy.

use super::channel::{FileTransferChannel, RemoteReader, RemoteWriter};
use crate::error::{Error, Result};
use crate::types::{EntryKind, RemoteEntry, timestamp};
use async_trait::async_trait;
use russh_sftp::client::SftpSession;
use russh_sftp::client::error::Error as SftpError;
use russh_sftp::protocol::{FileAttributes, StatusCode};
use std::future::Future;
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncWrite};

pub struct SftpChannel {
    session: Option<SftpSession>,
    io_timeout: Duration,
}

impl SftpChannel {
    /// Run the SFTP version handshake over an already-opened subsystem stream.
    pub(crate) async fn start<S>(stream: S, io_timeout: Duration) -> Result<Self>
    where
        S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
    {
        let session = match tokio::time::timeout(io_timeout, SftpSession::new(stream)).await {
            Ok(Ok(session)) => session,
            Ok(Err(e)) => {
                return Err(Error::ChannelOpen {
                    channel: "sftp",
                    reason: e.to_string(),
                });
            }
            Err(_) => {
                return Err(Error::ChannelOpen {
                    channel: "sftp",
                    reason: format!("no version reply within {io_timeout:?}"),
                });
            }
        };
        Ok(Self {
            session: Some(session),
            io_timeout,
        })
    }

    fn session(&self) -> Result<&SftpSession> {
        self.session.as_ref().ok_or(Error::NotConnected)
    }

    async fn call<T, F>(&self, operation: &'static str, path: &str, request: F) -> Result<T>
    where
        F: Future<Output = std::result::Result<T, SftpError>>,
    {
        match tokio::time::timeout(self.io_timeout, request).await {
            Ok(result) => result.map_err(|e| map_sftp_error(operation, path, e)),
            Err(_) => Err(Error::IoTimeout {
                operation,
                path: path.to_string(),
                after: self.io_timeout,
            }),
        }
    }

    async fn set_attributes(
        &self,
        operation: &'static str,
        path: &str,
        attrs: FileAttributes,
    ) -> Result<()> {
        let sftp = self.session()?;
        self.call(operation, path, sftp.set_metadata(path, attrs)).await
    }
}

fn map_sftp_error(operation: &'static str, path: &str, err: SftpError) -> Error {
    match err {
        SftpError::Status(status) if matches!(status.status_code, StatusCode::NoSuchFile) => {
            Error::NotFound(path.to_string())
        }
        SftpError::Status(status) => Error::Remote {
            operation,
            path: path.to_string(),
            message: format!("{:?}: {}", status.status_code, status.error_message),
        },
        other => Error::Sftp(format!("{operation} {path}: {other}")),
    }
}

fn entry_from_attributes(path: &str, attrs: &FileAttributes) -> RemoteEntry {
    let mode = attrs.permissions.unwrap_or(0);
    RemoteEntry {
        path: path.to_string(),
        kind: EntryKind::from_mode(mode),
        size: attrs.size.unwrap_or(0),
        mode,
        uid: attrs.uid.unwrap_or(0),
        gid: attrs.gid.unwrap_or(0),
        accessed: timestamp(attrs.atime),
        modified: timestamp(attrs.mtime),
    }
}

#[async_trait]
impl FileTransferChannel for SftpChannel {
    async fn stat(&self, path: &str) -> Result<RemoteEntry> {
        let sftp = self.session()?;
        let attrs = self.call("stat", path, sftp.metadata(path)).await?;
        Ok(entry_from_attributes(path, &attrs))
    }

    async fn lstat(&self, path: &str) -> Result<RemoteEntry> {
        let sftp = self.session()?;
        let attrs = self.call("lstat", path, sftp.symlink_metadata(path)).await?;
        Ok(entry_from_attributes(path, &attrs))
    }

    async fn list(&self, path: &str) -> Result<Vec<String>> {
        let sftp = self.session()?;
        let entries = self.call("readdir", path, sftp.read_dir(path)).await?;
        Ok(entries
            .map(|entry| entry.file_name())
            .filter(|name| name != "." && name != "..")
            .collect())
    }

    async fn open_read(&self, path: &str) -> Result<RemoteReader> {
        let sftp = self.session()?;
        let file = self.call("open", path, sftp.open(path)).await?;
        Ok(Box::new(file))
    }

    async fn open_write(&self, path: &str) -> Result<RemoteWriter> {
        let sftp = self.session()?;
        let file = self.call("create", path, sftp.create(path)).await?;
        Ok(Box::new(file))
    }

    async fn mkdir(&self, path: &str, mode: u32) -> Result<()> {
        let sftp = self.session()?;
        self.call("mkdir", path, sftp.create_dir(path)).await?;
        if mode != 0 {
            self.chmod(path, mode).await?;
        }
        Ok(())
    }

    async fn remove(&self, path: &str) -> Result<()> {
        let sftp = self.session()?;
        self.call("remove", path, sftp.remove_file(path)).await
    }

    async fn rmdir(&self, path: &str) -> Result<()> {
        let sftp = self.session()?;
        self.call("rmdir", path, sftp.remove_dir(path)).await
    }

    async fn rename(&self, from: &str, to: &str) -> Result<()> {
        let sftp = self.session()?;
        self.call("rename", from, sftp.rename(from, to)).await
    }

    async fn chmod(&self, path: &str, mode: u32) -> Result<()> {
        let attrs = FileAttributes {
            permissions: Some(mode),
            ..FileAttributes::empty()
        };
        self.set_attributes("chmod", path, attrs).await
    }

    async fn chown(&self, path: &str, uid: u32, gid: u32) -> Result<()> {
        let attrs = FileAttributes {
            uid: Some(uid),
            gid: Some(gid),
            ..FileAttributes::empty()
        };
        self.set_attributes("chown", path, attrs).await
    }

    async fn symlink(&self, target: &str, link: &str) -> Result<()> {
        let sftp = self.session()?;
        self.call("symlink", link, sftp.symlink(link, target)).await
    }

    async fn read_link(&self, path: &str) -> Result<String> {
        let sftp = self.session()?;
        self.call("readlink", path, sftp.read_link(path)).await
    }

    async fn canonicalize(&self, path: &str) -> Result<String> {
        let sftp = self.session()?;
        self.call("realpath", path, sftp.canonicalize(path)).await
    }

    async fn close(&mut self) -> Result<()> {
        let Some(session) = self.session.take() else {
            return Ok(());
        };
        session
            .close()
            .await
            .map_err(|e| Error::Sftp(format!("close: {e}")))
    }
}
