// ABOUTME: Diagnostics accumulator for non-fatal cautions during tree operations.
// ABOUTME: Collects warnings that shouldn't fail a transfer but should be shown to users.

/// Collects non-fatal warnings during remote operations.
#[derive(Debug, Default)]
pub struct Diagnostics {
    warnings: Vec<Warning>,
}

impl Diagnostics {
    /// Record a warning, auto-logging it via tracing.
    pub fn warn(&mut self, warning: Warning) {
        tracing::warn!("{}", warning.message);
        self.warnings.push(warning);
    }

    /// Get all collected warnings.
    pub fn warnings(&self) -> &[Warning] {
        &self.warnings
    }

    /// Check if any warnings were collected.
    pub fn has_warnings(&self) -> bool {
        !self.warnings.is_empty()
    }

    /// Take the collected warnings, leaving the accumulator empty.
    pub fn drain(&mut self) -> Vec<Warning> {
        std::mem::take(&mut self.warnings)
    }
}

/// A non-fatal warning collected during a remote operation.
#[derive(Debug, Clone)]
pub struct Warning {
    pub kind: WarningKind,
    pub message: String,
}

impl Warning {
    /// Upload target already exists; files are merged into it.
    pub fn remote_root_exists(path: &str) -> Self {
        Self {
            kind: WarningKind::RemoteRootExists,
            message: format!("remote directory {path} already exists, merging files into it"),
        }
    }

    /// A symlinked directory was left out of a walk.
    pub fn symlink_cycle_skipped(path: &str, canonical: &str) -> Self {
        Self {
            kind: WarningKind::SymlinkCycleSkipped,
            message: format!("skipped {path}: links back to its own ancestor {canonical}"),
        }
    }

    /// A symlink with a missing target was left out of a download.
    pub fn dangling_symlink_skipped(path: &str) -> Self {
        Self {
            kind: WarningKind::DanglingSymlinkSkipped,
            message: format!("skipped {path}: symlink target does not exist"),
        }
    }

    /// Create an SSH disconnect warning.
    pub fn disconnect_failed(message: impl Into<String>) -> Self {
        Self {
            kind: WarningKind::DisconnectFailed,
            message: message.into(),
        }
    }
}

/// Categories of warnings that can occur during remote operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum WarningKind {
    /// Upload root existed before the upload started.
    RemoteRootExists,
    /// Walk skipped a symlink back into one of its own ancestors.
    SymlinkCycleSkipped,
    /// Download skipped a symlink whose target is missing.
    DanglingSymlinkSkipped,
    /// Failed to cleanly disconnect SSH session.
    DisconnectFailed,
}
