// ABOUTME: Remote filesystem view over a session's command and file-transfer channels.
// ABOUTME: Existence predicates, single-level operations, and the mkdir -p shell fallback.

pub mod shell;
mod walk;

pub use walk::{CyclePolicy, SkippedCycle, TreeListing};

use crate::config::DEFAULT_COMMAND_TIMEOUT;
use crate::error::{Error, Result};
use crate::ssh::{CommandChannel, CommandOutput, FileTransferChannel};
use crate::types::{EntryKind, RemoteEntry};
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};

/// Filesystem operations against the remote host.
///
/// Borrows the channels of a connected [`SecureSession`](crate::ssh::SecureSession);
/// cheap to copy. Nothing is cached: every predicate asks the server.
#[derive(Clone, Copy)]
pub struct RemoteFileSystem<'a> {
    commands: &'a dyn CommandChannel,
    files: &'a dyn FileTransferChannel,
    command_timeout: Duration,
    cycle_policy: CyclePolicy,
}

impl std::fmt::Debug for RemoteFileSystem<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RemoteFileSystem")
            .field("command_timeout", &self.command_timeout)
            .field("cycle_policy", &self.cycle_policy)
            .finish_non_exhaustive()
    }
}

impl<'a> RemoteFileSystem<'a> {
    pub fn new(commands: &'a dyn CommandChannel, files: &'a dyn FileTransferChannel) -> Self {
        Self {
            commands,
            files,
            command_timeout: DEFAULT_COMMAND_TIMEOUT,
            cycle_policy: CyclePolicy::default(),
        }
    }

    /// Deadline for shell fallback commands.
    pub fn with_command_timeout(mut self, timeout: Duration) -> Self {
        self.command_timeout = timeout;
        self
    }

    /// What [`list_tree`](Self::list_tree) does when a symlink leads back into
    /// a directory it already walked.
    pub fn with_cycle_policy(mut self, policy: CyclePolicy) -> Self {
        self.cycle_policy = policy;
        self
    }

    pub fn cycle_policy(&self) -> CyclePolicy {
        self.cycle_policy
    }

    /// The underlying file-transfer channel, for streaming file contents.
    pub fn files(&self) -> &'a dyn FileTransferChannel {
        self.files
    }

    pub async fn stat(&self, path: &str) -> Result<RemoteEntry> {
        self.files.stat(path).await
    }

    pub async fn lstat(&self, path: &str) -> Result<RemoteEntry> {
        self.files.lstat(path).await
    }

    /// Whether `path` exists, following symlinks. A dangling link does not exist.
    pub async fn exists(&self, path: &str) -> Result<bool> {
        Ok(self.kind_of(path, false).await?.is_some())
    }

    pub async fn is_file(&self, path: &str) -> Result<bool> {
        Ok(self.kind_of(path, false).await? == Some(EntryKind::File))
    }

    pub async fn is_dir(&self, path: &str) -> Result<bool> {
        Ok(self.kind_of(path, false).await? == Some(EntryKind::Directory))
    }

    /// Whether `path` itself is a symlink, without following it.
    pub async fn is_symlink(&self, path: &str) -> Result<bool> {
        Ok(self.kind_of(path, true).await? == Some(EntryKind::Symlink))
    }

    /// Whether anything is present at `path`, including a dangling symlink.
    pub(crate) async fn lexists(&self, path: &str) -> Result<bool> {
        Ok(self.kind_of(path, true).await?.is_some())
    }

    /// `None` when the path is missing; every other failure propagates.
    async fn kind_of(&self, path: &str, no_follow: bool) -> Result<Option<EntryKind>> {
        let observed = if no_follow {
            self.files.lstat(path).await
        } else {
            self.files.stat(path).await
        };
        match observed {
            Ok(entry) => Ok(Some(entry.kind)),
            Err(e) if e.is_not_found() => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// Child names of a directory, excluding `.` and `..`.
    pub async fn list_dir(&self, path: &str) -> Result<Vec<String>> {
        self.files.list(path).await
    }

    /// Create a single directory level if it is missing.
    ///
    /// Returns whether the directory exists afterwards. The parent must exist;
    /// use [`make_tree`](Self::make_tree) for nested paths.
    pub async fn make_dir(&self, path: &str, mode: u32) -> Result<bool> {
        if !self.exists(path).await? {
            tracing::debug!(path, mode = format_args!("{mode:o}"), "mkdir");
            self.files.mkdir(path, mode).await?;
        }
        self.is_dir(path).await
    }

    /// Create `path` with every missing ancestor, then apply `mode` to it.
    ///
    /// Idempotent. Ancestors are created by the remote shell (`mkdir -p`)
    /// because SFTP can only create one level per request. A zero `mode`
    /// leaves permissions untouched.
    pub async fn make_tree(&self, path: &str, mode: u32) -> Result<()> {
        match self.kind_of(path, false).await? {
            Some(EntryKind::Directory) => {}
            Some(kind) => {
                return Err(Error::invalid_path(
                    path,
                    format!("exists as a {kind}, not a directory"),
                ));
            }
            None => {
                let command = shell::mkdir_p(path);
                tracing::debug!(%command, "creating directory tree");
                let output = self.run(&command).await?;
                if !self.is_dir(path).await? {
                    return Err(Error::CommandFailed {
                        command,
                        reason: failure_reason(&output),
                    });
                }
            }
        }

        if mode != 0 {
            self.chmod(path, mode).await?;
        }
        Ok(())
    }

    /// Remove a file or symlink if present.
    ///
    /// Returns whether `path` is gone afterwards. Removing a missing path is
    /// not an error and answers `true`.
    pub async fn remove_file(&self, path: &str) -> Result<bool> {
        if self.lexists(path).await? {
            self.discard_file(path).await?;
        }
        Ok(!self.lexists(path).await?)
    }

    /// Alias of [`remove_file`](Self::remove_file).
    pub async fn unlink(&self, path: &str) -> Result<bool> {
        self.remove_file(path).await
    }

    /// Remove an empty directory if present, answering whether it is gone.
    pub async fn remove_dir(&self, path: &str) -> Result<bool> {
        if self.lexists(path).await? {
            self.discard_dir(path).await?;
        }
        Ok(!self.lexists(path).await?)
    }

    /// Single removal request; NotFound counts as done.
    pub(crate) async fn discard_file(&self, path: &str) -> Result<()> {
        tracing::debug!(path, "remove");
        ignore_missing(self.files.remove(path).await)
    }

    pub(crate) async fn discard_dir(&self, path: &str) -> Result<()> {
        tracing::debug!(path, "rmdir");
        ignore_missing(self.files.rmdir(path).await)
    }

    pub async fn rename(&self, from: &str, to: &str) -> Result<()> {
        tracing::debug!(from, to, "rename");
        self.files.rename(from, to).await
    }

    pub async fn chmod(&self, path: &str, mode: u32) -> Result<()> {
        tracing::debug!(path, mode = format_args!("{mode:o}"), "chmod");
        self.files.chmod(path, mode).await
    }

    pub async fn chown(&self, path: &str, uid: u32, gid: u32) -> Result<()> {
        tracing::debug!(path, uid, gid, "chown");
        self.files.chown(path, uid, gid).await
    }

    /// Create a symlink at `link` pointing to `target`.
    pub async fn symlink(&self, target: &str, link: &str) -> Result<()> {
        tracing::debug!(target, link, "symlink");
        self.files.symlink(target, link).await
    }

    pub async fn read_link(&self, path: &str) -> Result<String> {
        self.files.read_link(path).await
    }

    pub async fn canonicalize(&self, path: &str) -> Result<String> {
        self.files.canonicalize(path).await
    }

    /// Whole contents of a remote file.
    pub async fn read(&self, path: &str) -> Result<Vec<u8>> {
        let mut reader = self.files.open_read(path).await?;
        let mut contents = Vec::new();
        reader
            .read_to_end(&mut contents)
            .await
            .map_err(|e| Error::io(path, e))?;
        Ok(contents)
    }

    pub async fn read_to_string(&self, path: &str) -> Result<String> {
        let contents = self.read(path).await?;
        String::from_utf8(contents).map_err(|e| {
            Error::io(
                path,
                std::io::Error::new(std::io::ErrorKind::InvalidData, e),
            )
        })
    }

    /// Create or truncate `path` and write `contents` to it.
    pub async fn write(&self, path: &str, contents: &[u8]) -> Result<()> {
        tracing::debug!(path, bytes = contents.len(), "write");
        let mut writer = self.files.open_write(path).await?;
        writer
            .write_all(contents)
            .await
            .map_err(|e| Error::io(path, e))?;
        writer.shutdown().await.map_err(|e| Error::io(path, e))
    }

    async fn run(&self, command: &str) -> Result<CommandOutput> {
        self.commands.run(command, self.command_timeout).await
    }
}

fn ignore_missing(result: Result<()>) -> Result<()> {
    match result {
        Err(e) if e.is_not_found() => Ok(()),
        other => other,
    }
}

fn failure_reason(output: &CommandOutput) -> String {
    let merged = output.merged();
    if merged.is_empty() {
        format!("exit code {}", output.exit_code)
    } else {
        format!("exit code {}: {merged}", output.exit_code)
    }
}
