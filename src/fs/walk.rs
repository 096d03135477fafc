// ABOUTME: Recursive remote tree operations: listing leaves and removing whole trees.
// ABOUTME: Walks iteratively and carries each directory's canonical ancestors to stop symlink cycles.

use super::RemoteFileSystem;
use crate::error::{Error, Result};
use crate::path::{Separator, join};
use crate::types::EntryKind;

const SEP: Separator = Separator::Unix;

/// Reaction to a symlink that leads back into a directory on the current path.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum CyclePolicy {
    /// Leave the link out of the listing and report it in [`TreeListing::skipped_cycles`].
    #[default]
    Skip,
    /// Abort the walk with [`Error::SymlinkCycle`].
    Fail,
}

/// A symlinked directory left out of a walk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedCycle {
    pub path: String,
    pub canonical: String,
}

/// Result of [`RemoteFileSystem::walk_tree`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TreeListing {
    /// Files and non-directory symlinks, sorted by path.
    pub leaves: Vec<String>,
    pub skipped_cycles: Vec<SkippedCycle>,
    /// Leaves whose symlink target does not exist, sorted by path.
    pub dangling: Vec<String>,
}

/// A directory waiting to be listed, with the canonical paths of every
/// directory on the way down to it, itself included.
struct PendingDir {
    path: String,
    ancestors: Vec<String>,
}

impl PendingDir {
    fn canonical(&self) -> &str {
        self.ancestors.last().map(String::as_str).unwrap_or_default()
    }

    fn descend(&self, path: String, canonical: String) -> Self {
        let mut ancestors = self.ancestors.clone();
        ancestors.push(canonical);
        Self { path, ancestors }
    }
}

impl RemoteFileSystem<'_> {
    /// Every file and symlink below `root`.
    ///
    /// Symlinks to directories are followed unless their target is the
    /// directory being listed or one of its ancestors. Dangling symlinks are
    /// reported as leaves.
    pub async fn list_tree(&self, root: &str) -> Result<Vec<String>> {
        Ok(self.walk_tree(root).await?.leaves)
    }

    /// Like [`list_tree`](Self::list_tree), also reporting skipped cycles
    /// and dangling links.
    pub async fn walk_tree(&self, root: &str) -> Result<TreeListing> {
        let root_entry = self.stat(root).await?;
        if !root_entry.is_dir() {
            return Err(Error::invalid_path(root, "not a directory"));
        }

        let root_canonical = self.canonicalize(root).await?;
        let mut pending = vec![PendingDir {
            path: root.to_string(),
            ancestors: vec![root_canonical],
        }];
        let mut listing = TreeListing::default();

        while let Some(dir) = pending.pop() {
            for name in self.list_dir(&dir.path).await? {
                let child = join(&dir.path, &name, SEP);
                let entry = self.lstat(&child).await?;
                match entry.kind {
                    EntryKind::Directory => {
                        let child_canonical = join(dir.canonical(), &name, SEP);
                        pending.push(dir.descend(child, child_canonical));
                    }
                    EntryKind::File => listing.leaves.push(child),
                    EntryKind::Symlink => match self.stat(&child).await {
                        Ok(target) if target.is_dir() => {
                            let target_canonical = self.canonicalize(&child).await?;
                            if !dir.ancestors.contains(&target_canonical) {
                                pending.push(dir.descend(child, target_canonical));
                                continue;
                            }
                            match self.cycle_policy {
                                CyclePolicy::Skip => {
                                    tracing::warn!(
                                        path = %child,
                                        canonical = %target_canonical,
                                        "skipping symlink back into its own ancestry"
                                    );
                                    listing.skipped_cycles.push(SkippedCycle {
                                        path: child,
                                        canonical: target_canonical,
                                    });
                                }
                                CyclePolicy::Fail => {
                                    return Err(Error::SymlinkCycle {
                                        path: child,
                                        canonical: target_canonical,
                                    });
                                }
                            }
                        }
                        Ok(_) => listing.leaves.push(child),
                        Err(e) if e.is_not_found() => {
                            tracing::debug!(path = %child, "dangling symlink");
                            listing.dangling.push(child.clone());
                            listing.leaves.push(child);
                        }
                        Err(e) => return Err(e),
                    },
                    EntryKind::Other => {
                        tracing::debug!(path = %child, "skipping special file");
                    }
                }
            }
        }

        listing.leaves.sort();
        listing.dangling.sort();
        Ok(listing)
    }

    /// Remove `root` and everything below it.
    ///
    /// Files go first, then directories deepest-first, then `root` itself.
    /// Items that disappear while this runs are skipped rather than reported;
    /// the return value is the final answer to "is `root` gone?". Symlinks
    /// are removed as links and never followed.
    pub async fn remove_tree(&self, root: &str) -> Result<bool> {
        let root_entry = match self.lstat(root).await {
            Ok(entry) => entry,
            Err(e) if e.is_not_found() => return Ok(true),
            Err(e) => return Err(e),
        };

        if !root_entry.is_dir() {
            return self.remove_file(root).await;
        }

        let mut leaves = Vec::new();
        let mut dirs = Vec::new();
        let mut pending = vec![root.to_string()];

        while let Some(dir) = pending.pop() {
            let names = match self.list_dir(&dir).await {
                Ok(names) => names,
                Err(e) if e.is_not_found() => continue,
                Err(e) => return Err(e),
            };
            for name in names {
                let child = join(&dir, &name, SEP);
                match self.lstat(&child).await {
                    Ok(entry) if entry.is_dir() => {
                        dirs.push(child.clone());
                        pending.push(child);
                    }
                    Ok(_) => leaves.push(child),
                    Err(e) if e.is_not_found() => {}
                    Err(e) => return Err(e),
                }
            }
        }

        for leaf in &leaves {
            self.discard_file(leaf).await?;
        }

        dirs.sort_by_key(|dir| std::cmp::Reverse(depth(dir)));
        for dir in &dirs {
            self.discard_dir(dir).await?;
        }

        self.discard_dir(root).await?;

        let gone = !self.lexists(root).await?;
        tracing::info!(
            path = root,
            files = leaves.len(),
            directories = dirs.len() + 1,
            gone,
            "removed tree"
        );
        Ok(gone)
    }
}

fn depth(path: &str) -> usize {
    path.matches(SEP.as_char()).count()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn depth_counts_separators() {
        assert_eq!(depth("/srv"), 1);
        assert_eq!(depth("/srv/app/sub"), 3);
    }

    #[test]
    fn pending_dir_tracks_its_ancestry() {
        let root = PendingDir {
            path: "/srv/app".to_string(),
            ancestors: vec!["/data/app".to_string()],
        };
        let sub = root.descend("/srv/app/sub".to_string(), "/data/app/sub".to_string());

        assert_eq!(sub.canonical(), "/data/app/sub");
        assert_eq!(sub.ancestors, ["/data/app", "/data/app/sub"]);
        assert_eq!(root.canonical(), "/data/app");
    }

    #[test]
    fn skip_is_the_default_policy() {
        assert_eq!(CyclePolicy::default(), CyclePolicy::Skip);
    }
}
