// ABOUTME: Ordered source-to-destination pairs for a tree transfer.
// ABOUTME: Destination paths are rebased onto the new root in the destination's separator form.

use crate::error::Result;
use crate::path::{Separator, rebase};
use serde::Serialize;

/// One file to move.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlannedTransfer {
    pub source: String,
    pub destination: String,
}

/// Files of a tree operation in the order they will be copied.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TransferPlan {
    items: Vec<PlannedTransfer>,
}

impl TransferPlan {
    /// Pair every source with its path under `destination_root`.
    ///
    /// Fails with `InvalidPath` on the first source outside `source_root`.
    pub fn build<I, S>(
        sources: I,
        source_root: &str,
        destination_root: &str,
        destination_separator: Separator,
    ) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let items = sources
            .into_iter()
            .map(|source| {
                let source = source.into();
                let destination = rebase(
                    &source,
                    source_root,
                    destination_root,
                    destination_separator,
                )?;
                Ok(PlannedTransfer {
                    source,
                    destination,
                })
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { items })
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, PlannedTransfer> {
        self.items.iter()
    }
}

impl<'a> IntoIterator for &'a TransferPlan {
    type Item = &'a PlannedTransfer;
    type IntoIter = std::slice::Iter<'a, PlannedTransfer>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    #[test]
    fn windows_sources_map_to_unix_destinations() {
        let plan = TransferPlan::build(
            [r"C:\build\app\a.txt", r"C:\build\app\sub\b.txt"],
            r"C:\build\app",
            "/srv/app",
            Separator::Unix,
        )
        .unwrap();

        let destinations: Vec<_> = plan.iter().map(|p| p.destination.as_str()).collect();
        assert_eq!(destinations, ["/srv/app/a.txt", "/srv/app/sub/b.txt"]);
        assert_eq!(plan.iter().next().unwrap().source, r"C:\build\app\a.txt");
    }

    #[test]
    fn source_outside_root_is_rejected() {
        let err = TransferPlan::build(["/etc/passwd"], "/srv/app", "/backup", Separator::Unix)
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidPath);
    }

    #[test]
    fn empty_tree_gives_empty_plan() {
        let plan =
            TransferPlan::build(Vec::<String>::new(), "/a", "/b", Separator::Unix).unwrap();
        assert!(plan.is_empty());
    }
}
