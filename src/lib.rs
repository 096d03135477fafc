// ABOUTME: Library root for tether - remote filesystem sessions over SSH.
// ABOUTME: The CLI binary is in main.rs.

pub mod config;
pub mod diagnostics;
pub mod error;
pub mod fs;
pub mod output;
pub mod path;
pub mod ssh;
pub mod transfer;
pub mod types;

pub use config::{ConnectionConfig, Credential};
pub use error::{Error, ErrorKind, Result};
pub use fs::RemoteFileSystem;
pub use ssh::SecureSession;
pub use transfer::TransferEngine;
