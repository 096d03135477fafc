// ABOUTME: Separator conversion and root rebasing between local and remote trees.
// ABOUTME: Pure string functions, no filesystem access.

use crate::error::{Error, Result};

/// Path-separator convention of one side of a transfer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Separator {
    /// Forward slash, used by every SFTP server and POSIX host.
    Unix,
    /// Backslash.
    Windows,
}

impl Separator {
    pub fn as_char(self) -> char {
        match self {
            Separator::Unix => '/',
            Separator::Windows => '\\',
        }
    }

    /// Convention of the machine this process runs on.
    pub fn native() -> Self {
        if cfg!(windows) {
            Separator::Windows
        } else {
            Separator::Unix
        }
    }
}

/// Rewrite every `/` and `\` in `path` as the target separator.
pub fn normalize(path: &str, target: Separator) -> String {
    let sep = target.as_char();
    path.chars()
        .map(|c| if c == '/' || c == '\\' { sep } else { c })
        .collect()
}

/// Move `path` from under `old_root` to under `new_root`.
///
/// All three inputs are normalized to `target` first. `path` must equal
/// `old_root` or continue it with a separator; sibling prefixes such as
/// `/srv/app2` under `/srv/app` are rejected.
pub fn rebase(path: &str, old_root: &str, new_root: &str, target: Separator) -> Result<String> {
    let sep = target.as_char();
    let path_n = normalize(path, target);
    let old_n = normalize(old_root, target);
    let new_n = normalize(new_root, target);
    let old_trimmed = trim_trailing(&old_n, sep);

    let remainder = if old_n.is_empty() {
        Some(path_n.as_str())
    } else if path_n == old_trimmed || path_n == old_n {
        None
    } else {
        let prefix = if old_trimmed.ends_with(sep) {
            old_trimmed.to_string()
        } else {
            format!("{old_trimmed}{sep}")
        };
        match path_n.strip_prefix(&prefix) {
            Some(rest) => Some(rest),
            None => {
                return Err(Error::invalid_path(
                    path,
                    format!("not under {old_root}"),
                ));
            }
        }
    };

    Ok(match remainder {
        None => new_n,
        Some(rest) => join(&new_n, rest, target),
    })
}

/// Join `name` under `base` with exactly one separator between them.
pub fn join(base: &str, name: &str, target: Separator) -> String {
    let sep = target.as_char();
    if base.is_empty() {
        return name.to_string();
    }
    let base = trim_trailing(base, sep);
    if base.ends_with(sep) {
        format!("{base}{name}")
    } else {
        format!("{base}{sep}{name}")
    }
}

/// Parent directory of `path`, or `None` for a root or a bare name.
pub fn parent(path: &str, target: Separator) -> Option<String> {
    let sep = target.as_char();
    let trimmed = trim_trailing(path, sep);
    let idx = trimmed.rfind(sep)?;
    if idx == 0 {
        if trimmed.len() == 1 {
            return None;
        }
        return Some(sep.to_string());
    }
    Some(trimmed[..idx].to_string())
}

/// Last component of `path`.
pub fn file_name(path: &str, target: Separator) -> Option<&str> {
    let sep = target.as_char();
    let trimmed = trim_trailing(path, sep);
    let name = match trimmed.rfind(sep) {
        Some(idx) => &trimmed[idx + 1..],
        None => trimmed,
    };
    (!name.is_empty()).then_some(name)
}

/// Strip trailing separators but never reduce a root (`/`) to nothing.
fn trim_trailing(path: &str, sep: char) -> &str {
    let trimmed = path.trim_end_matches(sep);
    if trimmed.is_empty() && !path.is_empty() {
        &path[..sep.len_utf8()]
    } else {
        trimmed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_windows_to_unix() {
        assert_eq!(
            normalize(r"C:\deploy\app\a.txt", Separator::Unix),
            "C:/deploy/app/a.txt"
        );
    }

    #[test]
    fn normalize_unix_to_windows() {
        assert_eq!(normalize("sub/b.txt", Separator::Windows), r"sub\b.txt");
    }

    #[test]
    fn rebase_moves_file_under_new_root() {
        let out = rebase("/local/app/sub/b.txt", "/local/app", "/remote/app", Separator::Unix);
        assert_eq!(out.unwrap(), "/remote/app/sub/b.txt");
    }

    #[test]
    fn rebase_tolerates_trailing_separator_on_roots() {
        let out = rebase("/local/app/a.txt", "/local/app/", "/remote/app/", Separator::Unix);
        assert_eq!(out.unwrap(), "/remote/app/a.txt");
    }

    #[test]
    fn rebase_root_itself_maps_to_new_root() {
        let out = rebase("/local/app", "/local/app", "/remote/app", Separator::Unix);
        assert_eq!(out.unwrap(), "/remote/app");
    }

    #[test]
    fn rebase_from_windows_local_tree() {
        let out = rebase(
            r"C:\work\app\sub\b.txt",
            r"C:\work\app",
            "/srv/app",
            Separator::Unix,
        );
        assert_eq!(out.unwrap(), "/srv/app/sub/b.txt");
    }

    #[test]
    fn rebase_rejects_sibling_prefix() {
        let err = rebase("/local/app2/a.txt", "/local/app", "/remote", Separator::Unix)
            .unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::InvalidPath);
    }

    #[test]
    fn rebase_under_filesystem_root() {
        let out = rebase("/etc/hosts", "/", "/backup", Separator::Unix);
        assert_eq!(out.unwrap(), "/backup/etc/hosts");
    }

    #[test]
    fn parent_of_nested_and_top_level() {
        assert_eq!(parent("/a/b/c.txt", Separator::Unix).as_deref(), Some("/a/b"));
        assert_eq!(parent("/a", Separator::Unix).as_deref(), Some("/"));
        assert_eq!(parent("/", Separator::Unix), None);
        assert_eq!(parent("file.txt", Separator::Unix), None);
    }

    #[test]
    fn file_name_ignores_trailing_separator() {
        assert_eq!(file_name("/a/b/", Separator::Unix), Some("b"));
        assert_eq!(file_name("/", Separator::Unix), None);
    }

    #[test]
    fn join_avoids_double_separator() {
        assert_eq!(join("/srv/", "app", Separator::Unix), "/srv/app");
        assert_eq!(join("/", "etc", Separator::Unix), "/etc");
    }
}
