// ABOUTME: Command handlers for the tether CLI.
// ABOUTME: Resolves targets, opens sessions, and dispatches each subcommand.

mod error;
mod exec;
mod fs;
mod transfer;

pub use error::CommandError;

use crate::cli::{Cli, Commands, TargetArgs};
use error::{ConfigSnafu, ConnectSnafu};
use snafu::ResultExt;
use std::path::Path;
use tether::config::{self, Config, EnvValue, HostConfig};
use tether::diagnostics::{Diagnostics, Warning};
use tether::output::Output;
use tether::ssh::SecureSession;

/// Shared state for one CLI invocation.
pub struct Context {
    pub config: Config,
    pub output: Output,
}

impl Context {
    /// Resolve `target` to a validated connection and connect.
    pub async fn connect(&self, target: &TargetArgs) -> Result<SecureSession, CommandError> {
        let host = resolve_host(&self.config, target).context(ConfigSnafu)?;
        let connection = host.connection_config().context(ConfigSnafu)?;
        let label = connection.display_target();

        self.output.progress(&format!("→ Connecting to {label}..."));
        let session = SecureSession::open(connection)
            .await
            .context(ConnectSnafu { target: &label })?;
        Ok(session)
    }

    /// Disconnect, reporting a failure as a warning rather than an error.
    pub async fn finish(&self, mut session: SecureSession, diagnostics: &mut Diagnostics) {
        if let Err(e) = session.disconnect().await {
            diagnostics.warn(Warning::disconnect_failed(format!(
                "disconnect from {} failed: {e}",
                session.config().display_target()
            )));
        }
        for warning in diagnostics.drain() {
            self.output.warning(&warning);
        }
    }
}

/// Apply ad-hoc CLI credentials on top of the inventory entry.
fn resolve_host(config: &Config, target: &TargetArgs) -> tether::Result<HostConfig> {
    let mut host = config.resolve_target(&target.target)?;
    if let Some(key) = &target.key {
        host.password = None;
        host.private_key = Some(key.display().to_string());
    }
    if let Some(var) = &target.password_env {
        host.private_key = None;
        host.password = Some(EnvValue::FromEnv {
            var: var.clone(),
            default: None,
        });
    }
    if target.trust_first_connection {
        host.trust_first_connection = true;
    }
    Ok(host)
}

fn load_config(explicit: Option<&Path>) -> tether::Result<Config> {
    if let Some(path) = explicit {
        return Config::load(path);
    }
    let cwd = std::env::current_dir().map_err(|e| tether::Error::Io {
        path: ".".to_string(),
        source: e,
    })?;
    match Config::find(&cwd) {
        Some(path) => Config::load(&path),
        None => Ok(Config::default()),
    }
}

pub async fn run(cli: Cli) -> Result<(), CommandError> {
    let mut output = Output::new(cli.output_mode());
    output.start_timer();

    if let Commands::Init { host, force } = &cli.command {
        let cwd = std::env::current_dir()
            .map_err(|e| tether::Error::Io {
                path: ".".to_string(),
                source: e,
            })
            .context(ConfigSnafu)?;
        config::init_config(&cwd, host.as_deref(), *force).context(ConfigSnafu)?;
        output.success(&format!("Created {}", config::CONFIG_FILENAME));
        return Ok(());
    }

    let config = load_config(cli.config.as_deref()).context(ConfigSnafu)?;
    let ctx = Context { config, output };

    match cli.command {
        Commands::Init { .. } => Ok(()),
        Commands::Exec {
            target,
            timeout,
            command,
        } => exec::exec(&ctx, &target, timeout, &command).await,
        Commands::Upload {
            target,
            local,
            remote,
            mode,
        } => transfer::upload(&ctx, &target, &local, &remote, mode).await,
        Commands::Download {
            target,
            remote,
            local,
        } => transfer::download(&ctx, &target, &remote, &local).await,
        Commands::Ls {
            target,
            path,
            recursive,
        } => fs::ls(&ctx, &target, &path, recursive).await,
        Commands::Rm {
            target,
            path,
            recursive,
        } => fs::rm(&ctx, &target, &path, recursive).await,
        Commands::Mkdir { target, path, mode } => fs::mkdir(&ctx, &target, &path, mode).await,
    }
}
