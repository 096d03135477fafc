// ABOUTME: Remote directory entry as observed by stat or lstat.
// ABOUTME: Classifies entries from POSIX mode bits.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt;

const S_IFMT: u32 = 0o170_000;
const S_IFDIR: u32 = 0o040_000;
const S_IFREG: u32 = 0o100_000;
const S_IFLNK: u32 = 0o120_000;

/// What a remote path refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryKind {
    File,
    Directory,
    Symlink,
    Other,
}

impl EntryKind {
    /// Classify from the file-type bits of a POSIX `st_mode`.
    pub fn from_mode(mode: u32) -> Self {
        match mode & S_IFMT {
            S_IFDIR => EntryKind::Directory,
            S_IFREG => EntryKind::File,
            S_IFLNK => EntryKind::Symlink,
            _ => EntryKind::Other,
        }
    }

    /// File-type bits for this kind, the inverse of [`EntryKind::from_mode`].
    pub fn mode_bits(self) -> u32 {
        match self {
            EntryKind::Directory => S_IFDIR,
            EntryKind::File => S_IFREG,
            EntryKind::Symlink => S_IFLNK,
            EntryKind::Other => 0,
        }
    }
}

impl fmt::Display for EntryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            EntryKind::File => "file",
            EntryKind::Directory => "directory",
            EntryKind::Symlink => "symlink",
            EntryKind::Other => "other",
        };
        f.write_str(s)
    }
}

/// A single remote path observation.
///
/// Never cached: each value reflects the server's answer at the moment
/// of the call that produced it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RemoteEntry {
    /// Remote path in forward-slash form.
    pub path: String,
    pub kind: EntryKind,
    pub size: u64,
    /// Full `st_mode`, including file-type bits.
    pub mode: u32,
    pub uid: u32,
    pub gid: u32,
    pub accessed: Option<DateTime<Utc>>,
    pub modified: Option<DateTime<Utc>>,
}

impl RemoteEntry {
    pub fn is_dir(&self) -> bool {
        self.kind == EntryKind::Directory
    }

    pub fn is_file(&self) -> bool {
        self.kind == EntryKind::File
    }

    pub fn is_symlink(&self) -> bool {
        self.kind == EntryKind::Symlink
    }

    /// Permission bits only (`0o7777` mask).
    pub fn permissions(&self) -> u32 {
        self.mode & 0o7777
    }

    /// Permissions in `ls -l` notation, e.g. `drwxr-xr-x`.
    pub fn permissions_string(&self) -> String {
        let type_char = match self.kind {
            EntryKind::Directory => 'd',
            EntryKind::Symlink => 'l',
            EntryKind::File => '-',
            EntryKind::Other => '?',
        };
        let mut s = String::with_capacity(10);
        s.push(type_char);
        for shift in [6u32, 3, 0] {
            let bits = (self.mode >> shift) & 0o7;
            s.push(if bits & 0o4 != 0 { 'r' } else { '-' });
            s.push(if bits & 0o2 != 0 { 'w' } else { '-' });
            s.push(if bits & 0o1 != 0 { 'x' } else { '-' });
        }
        s
    }
}

/// Convert a seconds-since-epoch field from the wire.
pub(crate) fn timestamp(secs: Option<u32>) -> Option<DateTime<Utc>> {
    secs.and_then(|s| DateTime::from_timestamp(i64::from(s), 0))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(mode: u32) -> RemoteEntry {
        RemoteEntry {
            path: "/srv/app".to_string(),
            kind: EntryKind::from_mode(mode),
            size: 0,
            mode,
            uid: 0,
            gid: 0,
            accessed: None,
            modified: None,
        }
    }

    #[test]
    fn classifies_mode_bits() {
        assert_eq!(EntryKind::from_mode(0o040_755), EntryKind::Directory);
        assert_eq!(EntryKind::from_mode(0o100_644), EntryKind::File);
        assert_eq!(EntryKind::from_mode(0o120_777), EntryKind::Symlink);
        assert_eq!(EntryKind::from_mode(0o010_644), EntryKind::Other);
    }

    #[test]
    fn permissions_mask_drops_type_bits() {
        assert_eq!(entry(0o040_755).permissions(), 0o755);
    }

    #[test]
    fn permissions_string_matches_ls() {
        assert_eq!(entry(0o040_755).permissions_string(), "drwxr-xr-x");
        assert_eq!(entry(0o100_640).permissions_string(), "-rw-r-----");
    }

    #[test]
    fn timestamp_converts_epoch_seconds() {
        let ts = timestamp(Some(86_400)).unwrap();
        assert_eq!(ts.to_rfc3339(), "1970-01-02T00:00:00+00:00");
        assert!(timestamp(None).is_none());
    }
}
