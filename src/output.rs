// ABOUTME: Output formatting for CLI feedback.
// ABOUTME: Supports normal, quiet (CI), and JSON output modes.

use crate::diagnostics::Warning;
use crate::types::{RemoteEntry, TransferEvent};
use serde::Serialize;
use std::io::Write;
use std::time::Instant;

const BAR_WIDTH: usize = 30;

/// Output mode for CLI feedback.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputMode {
    /// Human-friendly output with progress messages
    Normal,
    /// Minimal output for CI (only final result)
    Quiet,
    /// JSON lines for scripting
    Json,
}

/// Handles CLI output based on the configured mode.
pub struct Output {
    mode: OutputMode,
    start_time: Option<Instant>,
}

impl Output {
    pub fn new(mode: OutputMode) -> Self {
        Self {
            mode,
            start_time: None,
        }
    }

    pub fn mode(&self) -> OutputMode {
        self.mode
    }

    /// Start timing an operation.
    pub fn start_timer(&mut self) {
        self.start_time = Some(Instant::now());
    }

    /// Get elapsed time since timer started.
    pub fn elapsed_secs(&self) -> f64 {
        self.start_time
            .map(|t| t.elapsed().as_secs_f64())
            .unwrap_or(0.0)
    }

    fn duration_secs(&self) -> Option<f64> {
        self.start_time.map(|_| self.elapsed_secs())
    }

    /// Print a progress message (suppressed in quiet/json mode).
    pub fn progress(&self, message: &str) {
        if self.mode == OutputMode::Normal {
            println!("{message}");
        }
    }

    /// Print a success message with optional timing.
    pub fn success(&self, message: &str) {
        match self.mode {
            OutputMode::Normal => {
                let elapsed = self.elapsed_secs();
                if elapsed > 0.0 {
                    println!("{message} ({:.1}s)", elapsed);
                } else {
                    println!("{message}");
                }
            }
            OutputMode::Quiet => {
                // Print only the essential result
                println!("{message}");
            }
            OutputMode::Json => print_json(&JsonEvent {
                event: "success",
                message,
                duration_secs: self.duration_secs(),
            }),
        }
    }

    /// Print an error message.
    pub fn error(&self, message: &str) {
        match self.mode {
            OutputMode::Normal | OutputMode::Quiet => {
                eprintln!("Error: {message}");
            }
            OutputMode::Json => {
                let event = JsonEvent {
                    event: "error",
                    message,
                    duration_secs: self.duration_secs(),
                };
                if let Ok(json) = serde_json::to_string(&event) {
                    eprintln!("{json}");
                }
            }
        }
    }

    /// Print a non-fatal caution.
    pub fn warning(&self, warning: &Warning) {
        match self.mode {
            OutputMode::Normal | OutputMode::Quiet => {
                eprintln!("Warning: {}", warning.message);
            }
            OutputMode::Json => print_json(&JsonWarning {
                event: "warning",
                kind: warning.kind,
                message: &warning.message,
            }),
        }
    }

    /// Print the text a remote command produced. Shown in every mode.
    pub fn command_output(&self, text: &str) {
        match self.mode {
            OutputMode::Normal | OutputMode::Quiet => {
                if !text.is_empty() {
                    println!("{text}");
                }
            }
            OutputMode::Json => print_json(&JsonEvent {
                event: "output",
                message: text,
                duration_secs: self.duration_secs(),
            }),
        }
    }

    /// Render one transfer event: `[i/n]` lines and a byte bar in normal mode.
    pub fn transfer_event(&self, event: &TransferEvent) {
        match (self.mode, event) {
            (OutputMode::Quiet, _) => {}
            (OutputMode::Json, TransferEvent::Bytes(_)) => {}
            (OutputMode::Json, event) => print_json(event),
            (OutputMode::Normal, TransferEvent::FileStarted {
                index,
                total,
                source,
                destination,
            }) => {
                println!("[{index}/{total}] {source} -> {destination}");
            }
            (OutputMode::Normal, TransferEvent::Bytes(progress)) => {
                let filled = (progress.fraction() * BAR_WIDTH as f64).round() as usize;
                let mut stderr = std::io::stderr();
                let _ = write!(
                    stderr,
                    "\r  [{}{}] {}/{} bytes",
                    "#".repeat(filled),
                    " ".repeat(BAR_WIDTH - filled.min(BAR_WIDTH)),
                    progress.bytes_transferred,
                    progress.total_bytes
                );
                if progress.is_complete() {
                    let _ = writeln!(stderr);
                }
                let _ = stderr.flush();
            }
            (OutputMode::Normal, TransferEvent::FileFinished { .. }) => {}
        }
    }

    /// Print directory entries, `ls -l` style in normal mode.
    pub fn entries(&self, entries: &[RemoteEntry]) {
        for entry in entries {
            match self.mode {
                OutputMode::Normal => println!(
                    "{} {:>6} {:>6} {:>12} {}",
                    entry.permissions_string(),
                    entry.uid,
                    entry.gid,
                    entry.size,
                    entry.path
                ),
                OutputMode::Quiet => println!("{}", entry.path),
                OutputMode::Json => print_json(entry),
            }
        }
    }

    /// Print a bare path list (recursive listings).
    pub fn paths(&self, paths: &[String]) {
        for path in paths {
            match self.mode {
                OutputMode::Normal | OutputMode::Quiet => println!("{path}"),
                OutputMode::Json => print_json(&JsonPath { path }),
            }
        }
    }
}

fn print_json<T: Serialize + ?Sized>(value: &T) {
    if let Ok(json) = serde_json::to_string(value) {
        println!("{json}");
    }
}

#[derive(Serialize)]
struct JsonEvent<'a> {
    event: &'a str,
    message: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    duration_secs: Option<f64>,
}

#[derive(Serialize)]
struct JsonWarning<'a> {
    event: &'a str,
    kind: crate::diagnostics::WarningKind,
    message: &'a str,
}

#[derive(Serialize)]
struct JsonPath<'a> {
    path: &'a str,
}
