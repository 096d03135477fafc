// ABOUTME: Whole-file and whole-tree copies between the local machine and the remote host.
// ABOUTME: Creates missing parents before each file, reports progress, and collects cautions.

mod copy;
mod local;
mod plan;

pub use plan::{PlannedTransfer, TransferPlan};

use crate::config::DEFAULT_IO_TIMEOUT;
use crate::diagnostics::{Diagnostics, Warning};
use crate::error::{Error, Result};
use crate::fs::RemoteFileSystem;
use crate::path::{self, Separator};
use crate::types::TransferEvent;
use copy::copy_with_progress;
use serde::Serialize;
use std::path::Path;
use std::time::Duration;
use tokio::io::AsyncWriteExt;

/// Permission bits applied to uploaded files and created directories.
pub const DEFAULT_MODE: u32 = 0o755;

const DEFAULT_CHUNK_SIZE: usize = 32 * 1024;

/// Knobs for a [`TransferEngine`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransferOptions {
    /// Mode applied to each file placed by a tree upload. Zero skips chmod.
    pub file_mode: u32,
    /// Mode applied to directories created for an upload.
    pub dir_mode: u32,
    pub local_separator: Separator,
    pub remote_separator: Separator,
    /// Bytes per read while streaming a file.
    pub chunk_size: usize,
    /// Deadline for each chunk read or write.
    pub io_timeout: Duration,
}

impl Default for TransferOptions {
    fn default() -> Self {
        Self {
            file_mode: DEFAULT_MODE,
            dir_mode: DEFAULT_MODE,
            local_separator: Separator::native(),
            remote_separator: Separator::Unix,
            chunk_size: DEFAULT_CHUNK_SIZE,
            io_timeout: DEFAULT_IO_TIMEOUT,
        }
    }
}

/// Totals for a finished tree operation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct TreeSummary {
    pub files: usize,
    pub bytes: u64,
}

type EventSink<'a> = Box<dyn FnMut(&TransferEvent) + Send + 'a>;

/// Copies files and trees over one session, sequentially.
///
/// Tree operations are not transactional: the first failure stops the
/// operation and files already copied stay in place. Re-running is safe
/// because every file is overwritten, never appended to.
pub struct TransferEngine<'a> {
    fs: RemoteFileSystem<'a>,
    options: TransferOptions,
    on_event: Option<EventSink<'a>>,
    diagnostics: Diagnostics,
}

impl<'a> TransferEngine<'a> {
    pub fn new(fs: RemoteFileSystem<'a>) -> Self {
        Self {
            fs,
            options: TransferOptions::default(),
            on_event: None,
            diagnostics: Diagnostics::default(),
        }
    }

    pub fn with_options(mut self, options: TransferOptions) -> Self {
        self.options = options;
        self
    }

    /// Observe per-file and per-byte progress.
    pub fn on_event(mut self, sink: impl FnMut(&TransferEvent) + Send + 'a) -> Self {
        self.on_event = Some(Box::new(sink));
        self
    }

    pub fn options(&self) -> &TransferOptions {
        &self.options
    }

    pub fn filesystem(&self) -> RemoteFileSystem<'a> {
        self.fs
    }

    /// Cautions raised so far.
    pub fn diagnostics(&self) -> &Diagnostics {
        &self.diagnostics
    }

    pub fn into_diagnostics(self) -> Diagnostics {
        self.diagnostics
    }

    fn emit(&mut self, event: TransferEvent) {
        if let Some(observe) = self.on_event.as_mut() {
            observe(&event);
        }
    }

    /// Copy one local file to `remote`, creating the remote parent first.
    ///
    /// An existing remote file is overwritten. `mode` is applied after the
    /// bytes are committed unless it is zero. Returns the bytes copied.
    pub async fn upload_file(&mut self, local: &Path, remote: &str, mode: u32) -> Result<u64> {
        let fs = self.fs;
        let sep = self.options.remote_separator;
        let remote = path::normalize(remote, sep);
        let local_label = local.display().to_string();

        if let Some(parent) = path::parent(&remote, sep)
            && !fs.is_dir(&parent).await?
        {
            fs.make_tree(&parent, self.options.dir_mode).await?;
        }

        let mut source = tokio::fs::File::open(local)
            .await
            .map_err(|e| Error::io(&local_label, e))?;
        let expected = source
            .metadata()
            .await
            .map_err(|e| Error::io(&local_label, e))?
            .len();

        tracing::debug!(
            source = %local_label,
            destination = %remote,
            bytes = expected,
            "upload"
        );
        let mut sink = fs.files().open_write(&remote).await?;
        let on_event = &mut self.on_event;
        let copied = copy_with_progress(
            &mut source,
            &mut sink,
            (local_label.as_str(), remote.as_str()),
            expected,
            &self.options,
            |progress| {
                if let Some(observe) = on_event.as_mut() {
                    observe(&TransferEvent::Bytes(progress));
                }
            },
        )
        .await?;
        sink.shutdown().await.map_err(|e| Error::io(&remote, e))?;

        if mode != 0 {
            fs.chmod(&remote, mode).await?;
        }
        Ok(copied)
    }

    /// Copy one remote file to `local`, creating local parents first.
    ///
    /// An existing local file is overwritten. Returns the bytes copied.
    pub async fn download_file(&mut self, remote: &str, local: &Path) -> Result<u64> {
        let fs = self.fs;
        let remote = path::normalize(remote, self.options.remote_separator);
        let local_label = local.display().to_string();

        let entry = fs.stat(&remote).await?;
        if entry.is_dir() {
            return Err(Error::invalid_path(&remote, "is a directory"));
        }

        if let Some(parent) = local.parent()
            && !parent.as_os_str().is_empty()
        {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| Error::io(parent.display().to_string(), e))?;
        }

        tracing::debug!(
            source = %remote,
            destination = %local_label,
            bytes = entry.size,
            "download"
        );
        let mut source = fs.files().open_read(&remote).await?;
        let mut sink = tokio::fs::File::create(local)
            .await
            .map_err(|e| Error::io(&local_label, e))?;
        let on_event = &mut self.on_event;
        let copied = copy_with_progress(
            &mut source,
            &mut sink,
            (remote.as_str(), local_label.as_str()),
            entry.size,
            &self.options,
            |progress| {
                if let Some(observe) = on_event.as_mut() {
                    observe(&TransferEvent::Bytes(progress));
                }
            },
        )
        .await?;
        sink.shutdown()
            .await
            .map_err(|e| Error::io(&local_label, e))?;
        Ok(copied)
    }

    /// What [`upload_tree`](Self::upload_tree) would copy, without touching the remote.
    pub async fn plan_upload(
        &self,
        local_root: &Path,
        remote_root: &str,
    ) -> Result<TransferPlan> {
        let root_label = utf8(local_root)?;
        let metadata = tokio::fs::metadata(local_root)
            .await
            .map_err(|e| Error::io(root_label, e))?;
        if !metadata.is_dir() {
            return Err(Error::invalid_path(root_label, "not a directory"));
        }

        let files = local::enumerate_files(local_root).await?;
        let sources = files
            .iter()
            .map(|file| utf8(file).map(str::to_string))
            .collect::<Result<Vec<_>>>()?;
        let remote_root = path::normalize(remote_root, self.options.remote_separator);
        TransferPlan::build(
            sources,
            root_label,
            &remote_root,
            self.options.remote_separator,
        )
    }

    /// Copy every file under `local_root` to the same relative path under `remote_root`.
    ///
    /// An existing `remote_root` is merged into and recorded as a caution.
    pub async fn upload_tree(
        &mut self,
        local_root: &Path,
        remote_root: &str,
    ) -> Result<TreeSummary> {
        let plan = self.plan_upload(local_root, remote_root).await?;
        let remote_root = path::normalize(remote_root, self.options.remote_separator);

        if self.fs.exists(&remote_root).await? {
            self.diagnostics.warn(Warning::remote_root_exists(&remote_root));
        } else {
            self.fs.make_tree(&remote_root, self.options.dir_mode).await?;
        }

        let total = plan.len();
        let mut summary = TreeSummary::default();
        for (i, item) in plan.iter().enumerate() {
            self.emit(TransferEvent::FileStarted {
                index: i + 1,
                total,
                source: item.source.clone(),
                destination: item.destination.clone(),
            });
            summary.bytes += self
                .upload_file(
                    Path::new(&item.source),
                    &item.destination,
                    self.options.file_mode,
                )
                .await?;
            summary.files += 1;
            self.emit(TransferEvent::FileFinished {
                index: i + 1,
                total,
                destination: item.destination.clone(),
            });
        }

        tracing::info!(
            root = %remote_root,
            files = summary.files,
            bytes = summary.bytes,
            "upload complete"
        );
        Ok(summary)
    }

    /// What [`download_tree`](Self::download_tree) would copy, without writing locally.
    pub async fn plan_download(
        &mut self,
        remote_root: &str,
        local_root: &Path,
    ) -> Result<TransferPlan> {
        let remote_root = path::normalize(remote_root, self.options.remote_separator);
        if !self.fs.exists(&remote_root).await? {
            return Err(Error::NotFound(remote_root));
        }

        let mut listing = self.fs.walk_tree(&remote_root).await?;
        for skipped in &listing.skipped_cycles {
            self.diagnostics.warn(Warning::symlink_cycle_skipped(
                &skipped.path,
                &skipped.canonical,
            ));
        }
        for dangling in &listing.dangling {
            self.diagnostics.warn(Warning::dangling_symlink_skipped(dangling));
        }
        listing
            .leaves
            .retain(|leaf| listing.dangling.binary_search(leaf).is_err());

        TransferPlan::build(
            listing.leaves,
            &remote_root,
            utf8(local_root)?,
            self.options.local_separator,
        )
    }

    /// Copy every file under `remote_root` to the same relative path under `local_root`.
    ///
    /// Fails with `NotFound` before writing anything if `remote_root` is missing.
    /// Symlinks whose target is missing are skipped with a caution.
    pub async fn download_tree(
        &mut self,
        remote_root: &str,
        local_root: &Path,
    ) -> Result<TreeSummary> {
        let plan = self.plan_download(remote_root, local_root).await?;

        tokio::fs::create_dir_all(local_root)
            .await
            .map_err(|e| Error::io(local_root.display().to_string(), e))?;

        let total = plan.len();
        let mut summary = TreeSummary::default();
        for (i, item) in plan.iter().enumerate() {
            self.emit(TransferEvent::FileStarted {
                index: i + 1,
                total,
                source: item.source.clone(),
                destination: item.destination.clone(),
            });
            summary.bytes += self
                .download_file(&item.source, Path::new(&item.destination))
                .await?;
            summary.files += 1;
            self.emit(TransferEvent::FileFinished {
                index: i + 1,
                total,
                destination: item.destination.clone(),
            });
        }

        tracing::info!(
            root = %local_root.display(),
            files = summary.files,
            bytes = summary.bytes,
            "download complete"
        );
        Ok(summary)
    }
}

fn utf8(path: &Path) -> Result<&str> {
    path.to_str()
        .ok_or_else(|| Error::invalid_path(path.display().to_string(), "not valid UTF-8"))
}
