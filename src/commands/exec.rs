// ABOUTME: Exec command implementation.
// ABOUTME: Runs one shell command remotely and mirrors its output and exit code.

use super::error::{RemoteExitSnafu, RemoteSnafu};
use super::{CommandError, Context};
use crate::cli::TargetArgs;
use snafu::ResultExt;
use std::time::Duration;
use tether::diagnostics::Diagnostics;

pub async fn exec(
    ctx: &Context,
    target: &TargetArgs,
    timeout: Option<u64>,
    command: &[String],
) -> Result<(), CommandError> {
    let session = ctx.connect(target).await?;
    let mut diag = Diagnostics::default();

    let command = command.join(" ");
    let timeout = timeout
        .map(Duration::from_secs)
        .unwrap_or(session.config().command_timeout);
    ctx.output.progress(&format!("→ Running `{command}`..."));

    let result = session
        .execute_output(&command, timeout)
        .await
        .context(RemoteSnafu {
            operation: "exec",
            target: &target.target,
        });

    ctx.finish(session, &mut diag).await;
    let result = result?;

    ctx.output.command_output(result.stdout.trim_end());
    if !result.stderr.trim().is_empty() {
        eprintln!("{}", result.stderr.trim_end());
    }

    if !result.success() {
        return RemoteExitSnafu {
            code: result.exit_code,
        }
        .fail();
    }
    Ok(())
}
