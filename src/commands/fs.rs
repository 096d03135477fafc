// ABOUTME: ls, rm, and mkdir command implementations.
// ABOUTME: Thin wrappers over RemoteFileSystem with CLI rendering.

use super::error::RemoteSnafu;
use super::{CommandError, Context};
use crate::cli::TargetArgs;
use snafu::ResultExt;
use tether::diagnostics::{Diagnostics, Warning};
use tether::path::{Separator, join};

pub async fn ls(
    ctx: &Context,
    target: &TargetArgs,
    path: &str,
    recursive: bool,
) -> Result<(), CommandError> {
    let session = ctx.connect(target).await?;
    let mut diag = Diagnostics::default();

    let result = async {
        let fs = session.filesystem()?;
        if recursive {
            let listing = fs.walk_tree(path).await?;
            for skipped in &listing.skipped_cycles {
                diag.warn(Warning::symlink_cycle_skipped(
                    &skipped.path,
                    &skipped.canonical,
                ));
            }
            ctx.output.paths(&listing.leaves);
            return Ok(());
        }

        let entry = fs.stat(path).await?;
        if !entry.is_dir() {
            ctx.output.entries(&[entry]);
            return Ok(());
        }
        let mut names = fs.list_dir(path).await?;
        names.sort();
        let mut entries = Vec::with_capacity(names.len());
        for name in names {
            entries.push(fs.lstat(&join(path, &name, Separator::Unix)).await?);
        }
        ctx.output.entries(&entries);
        Ok::<_, tether::Error>(())
    }
    .await
    .context(RemoteSnafu {
        operation: "ls",
        target: &target.target,
    });

    ctx.finish(session, &mut diag).await;
    result
}

pub async fn rm(
    ctx: &Context,
    target: &TargetArgs,
    path: &str,
    recursive: bool,
) -> Result<(), CommandError> {
    let session = ctx.connect(target).await?;

    let result = async {
        let fs = session.filesystem()?;
        if recursive {
            fs.remove_tree(path).await
        } else {
            fs.remove_file(path).await
        }
    }
    .await
    .context(RemoteSnafu {
        operation: "rm",
        target: &target.target,
    });

    ctx.finish(session, &mut Diagnostics::default()).await;
    if result? {
        ctx.output.success(&format!("Removed {path}"));
    } else {
        ctx.output.success(&format!("{path} still exists"));
    }
    Ok(())
}

pub async fn mkdir(
    ctx: &Context,
    target: &TargetArgs,
    path: &str,
    mode: u32,
) -> Result<(), CommandError> {
    let session = ctx.connect(target).await?;

    let result = async {
        let fs = session.filesystem()?;
        fs.make_tree(path, mode).await
    }
    .await
    .context(RemoteSnafu {
        operation: "mkdir",
        target: &target.target,
    });

    ctx.finish(session, &mut Diagnostics::default()).await;
    result?;
    ctx.output.success(&format!("Created {path} ({mode:o})"));
    Ok(())
}
