// ABOUTME: Command-line interface definition using clap derive macros.
// ABOUTME: Defines all subcommands and their arguments.

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use tether::output::OutputMode;

#[derive(Parser)]
#[command(name = "tether")]
#[command(about = "Remote filesystem access and file transfer over SSH")]
#[command(version)]
pub struct Cli {
    /// Path to the host inventory (default: discover tether.yml)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Only print final results
    #[arg(short, long, global = true, conflicts_with = "json")]
    pub quiet: bool,

    /// Emit JSON lines instead of text
    #[arg(long, global = true)]
    pub json: bool,

    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    pub fn output_mode(&self) -> OutputMode {
        if self.json {
            OutputMode::Json
        } else if self.quiet {
            OutputMode::Quiet
        } else {
            OutputMode::Normal
        }
    }
}

/// How to reach a host: an inventory name or `[user@]host[:port]`.
#[derive(Args, Debug, Clone)]
pub struct TargetArgs {
    /// Host alias from tether.yml or an ad-hoc user@host:port
    pub target: String,

    /// Private key for an ad-hoc target
    #[arg(long, conflicts_with = "password_env")]
    pub key: Option<PathBuf>,

    /// Environment variable holding the password for an ad-hoc target
    #[arg(long)]
    pub password_env: Option<String>,

    /// Accept and remember an unknown host key
    #[arg(long)]
    pub trust_first_connection: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Create a tether.yml host inventory in the current directory
    Init {
        /// Hostname to pre-fill in the template
        #[arg(long)]
        host: Option<String>,

        /// Overwrite an existing tether.yml
        #[arg(long)]
        force: bool,
    },

    /// Run a shell command on the remote host
    Exec {
        #[command(flatten)]
        target: TargetArgs,

        /// Seconds to wait before giving up (default: host command_timeout)
        #[arg(long)]
        timeout: Option<u64>,

        /// Command to run
        #[arg(required = true, trailing_var_arg = true, allow_hyphen_values = true)]
        command: Vec<String>,
    },

    /// Copy a local file or directory tree to the remote host
    Upload {
        #[command(flatten)]
        target: TargetArgs,

        local: PathBuf,

        remote: String,

        /// Permission bits applied to uploaded files, in octal
        #[arg(long, value_parser = parse_mode, default_value = "755")]
        mode: u32,
    },

    /// Copy a remote file or directory tree to this machine
    Download {
        #[command(flatten)]
        target: TargetArgs,

        remote: String,

        local: PathBuf,
    },

    /// List a remote directory
    Ls {
        #[command(flatten)]
        target: TargetArgs,

        path: String,

        /// List every file below the directory
        #[arg(short, long)]
        recursive: bool,
    },

    /// Remove a remote file, or a whole tree with --recursive
    Rm {
        #[command(flatten)]
        target: TargetArgs,

        path: String,

        #[arg(short, long)]
        recursive: bool,
    },

    /// Create a remote directory and any missing parents
    Mkdir {
        #[command(flatten)]
        target: TargetArgs,

        path: String,

        /// Permission bits for the directory, in octal
        #[arg(long, value_parser = parse_mode, default_value = "755")]
        mode: u32,
    },
}

/// Parse an octal permission string such as `755` or `0o644`.
fn parse_mode(s: &str) -> Result<u32, String> {
    let digits = s.trim_start_matches("0o");
    let mode =
        u32::from_str_radix(digits, 8).map_err(|_| format!("invalid octal mode: {s}"))?;
    if mode > 0o7777 {
        return Err(format!("mode out of range: {s}"));
    }
    Ok(mode)
}
