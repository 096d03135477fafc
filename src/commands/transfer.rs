// ABOUTME: Upload and download command implementations.
// ABOUTME: Picks single-file or whole-tree transfer from what the source path is.

use super::error::RemoteSnafu;
use super::{CommandError, Context};
use crate::cli::TargetArgs;
use snafu::ResultExt;
use std::path::Path;
use tether::diagnostics::Diagnostics;
use tether::transfer::{TransferOptions, TreeSummary};

pub async fn upload(
    ctx: &Context,
    target: &TargetArgs,
    local: &Path,
    remote: &str,
    mode: u32,
) -> Result<(), CommandError> {
    let session = ctx.connect(target).await?;

    let result = async {
        let engine = session.transfer()?;
        let options = TransferOptions {
            file_mode: mode,
            ..*engine.options()
        };
        let mut engine = engine
            .with_options(options)
            .on_event(|event| ctx.output.transfer_event(event));

        let summary = if local.is_dir() {
            engine.upload_tree(local, remote).await?
        } else {
            let bytes = engine.upload_file(local, remote, mode).await?;
            TreeSummary { files: 1, bytes }
        };
        Ok::<_, tether::Error>((summary, engine.into_diagnostics()))
    }
    .await
    .context(RemoteSnafu {
        operation: "upload",
        target: &target.target,
    });

    conclude(ctx, session, result, "Uploaded").await
}

pub async fn download(
    ctx: &Context,
    target: &TargetArgs,
    remote: &str,
    local: &Path,
) -> Result<(), CommandError> {
    let session = ctx.connect(target).await?;

    let result = async {
        let mut engine = session
            .transfer()?
            .on_event(|event| ctx.output.transfer_event(event));

        let summary = if engine.filesystem().is_dir(remote).await? {
            engine.download_tree(remote, local).await?
        } else {
            let bytes = engine.download_file(remote, local).await?;
            TreeSummary { files: 1, bytes }
        };
        Ok::<_, tether::Error>((summary, engine.into_diagnostics()))
    }
    .await
    .context(RemoteSnafu {
        operation: "download",
        target: &target.target,
    });

    conclude(ctx, session, result, "Downloaded").await
}

async fn conclude(
    ctx: &Context,
    session: tether::SecureSession,
    result: Result<(TreeSummary, Diagnostics), CommandError>,
    verb: &str,
) -> Result<(), CommandError> {
    match result {
        Ok((summary, mut diag)) => {
            ctx.finish(session, &mut diag).await;
            ctx.output.success(&format!(
                "{verb} {} file(s), {} bytes",
                summary.files, summary.bytes
            ));
            Ok(())
        }
        Err(e) => {
            ctx.finish(session, &mut Diagnostics::default()).await;
            Err(e)
        }
    }
}
