// ABOUTME: Local directory enumeration for uploads.
// ABOUTME: Walks with walkdir on the blocking pool, sorted by file name.

use crate::error::{Error, Result};
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Every regular file below `root`, plus symlinks that resolve to files.
pub(crate) async fn enumerate_files(root: &Path) -> Result<Vec<PathBuf>> {
    let root = root.to_path_buf();
    let label = root.display().to_string();
    tokio::task::spawn_blocking(move || walk(&root))
        .await
        .map_err(|e| Error::io(label, std::io::Error::other(e)))?
}

fn walk(root: &Path) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for entry in WalkDir::new(root).sort_by_file_name() {
        let entry = entry.map_err(|e| {
            let path = e.path().unwrap_or(root).display().to_string();
            Error::io(path, e.into())
        })?;
        let file_type = entry.file_type();
        if file_type.is_file() || (file_type.is_symlink() && entry.path().is_file()) {
            files.push(entry.into_path());
        }
    }
    Ok(files)
}
