//! Progress events emitted while linking.
//!
//! The engine reports through a [`ProgressSink`]. Sinks must never block the
//! engine: [`ChannelSink`] drops events when its channel is full, and
//! [`TerminalProgress`] renders them on stderr for the CLI.

use colored::Colorize;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::io::{self, IsTerminal, Write};
use std::sync::atomic::{AtomicU64, Ordering};

use crate::linker::{FileStatus, LinkResult};
use crate::output::format_size;

/// Message pushed to observers during a link operation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ProgressEvent {
    /// One file has been processed
    Progress {
        file: String,
        status: FileStatus,
        current: usize,
        total: usize,
    },

    /// The whole operation finished; emitted once per link call
    Complete { result: LinkResult },

    /// Non-fatal problem, e.g. history could not be saved
    Warning { message: String },
}

/// Receiver of progress events. `emit` must return promptly.
pub trait ProgressSink: Send + Sync {
    fn emit(&self, event: ProgressEvent);
}

/// Forwards events into a bounded channel without ever blocking
pub struct ChannelSink {
    tx: flume::Sender<ProgressEvent>,
    dropped: AtomicU64,
}

impl ChannelSink {
    /// Create a sink and the receiving end of its channel
    pub fn bounded(capacity: usize) -> (Self, flume::Receiver<ProgressEvent>) {
        let (tx, rx) = flume::bounded(capacity);
        (
            Self {
                tx,
                dropped: AtomicU64::new(0),
            },
            rx,
        )
    }

    /// Events discarded because the channel was full or closed
    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }
}

impl ProgressSink for ChannelSink {
    fn emit(&self, event: ProgressEvent) {
        if self.tx.try_send(event).is_err() {
            self.dropped.fetch_add(1, Ordering::Relaxed);
        }
    }
}

/// Check if we should use colors in output
pub fn should_use_colors() -> bool {
    if std::env::var("NO_COLOR").is_ok() {
        return false;
    }
    if std::env::var("FORCE_COLOR").is_ok() {
        return true;
    }
    io::stderr().is_terminal()
}

/// Progress reporter for user-facing output
pub struct TerminalProgress {
    writer: Mutex<Box<dyn Write + Send>>,
    /// When true, all output is suppressed (verbose mode uses tracing instead)
    silent: bool,
    colors_enabled: bool,
}

impl Default for TerminalProgress {
    fn default() -> Self {
        Self::new()
    }
}

impl TerminalProgress {
    /// Create a new progress reporter writing to stderr
    pub fn new() -> Self {
        Self {
            writer: Mutex::new(Box::new(io::stderr())),
            silent: false,
            colors_enabled: should_use_colors(),
        }
    }

    /// Create a reporter with a custom writer (for testing)
    pub fn with_writer(writer: Box<dyn Write + Send>) -> Self {
        Self {
            writer: Mutex::new(writer),
            silent: false,
            colors_enabled: false,
        }
    }

    pub fn silent() -> Self {
        Self {
            writer: Mutex::new(Box::new(io::sink())),
            silent: true,
            colors_enabled: false,
        }
    }

    fn file_progress(&self, file: &str, status: FileStatus, current: usize, total: usize) {
        let mut writer = self.writer.lock();
        if self.colors_enabled {
            let counter = format!("[{}/{}]", current, total);
            let status = match status {
                FileStatus::Linked => status.as_str().green(),
                FileStatus::Skipped => status.as_str().yellow(),
                FileStatus::Failed => status.as_str().red().bold(),
            };
            let _ = writeln!(writer, "{} {} {}", counter.cyan(), status, file.dimmed());
        } else {
            let _ = writeln!(writer, "[{}/{}] {} {}", current, total, status, file);
        }
    }

    fn complete(&self, result: &LinkResult) {
        let mut writer = self.writer.lock();
        let summary = format!(
            "{} linked, {} skipped, {} failed ({})",
            result.linked,
            result.skipped,
            result.failed,
            format_size(result.total_bytes)
        );
        if self.colors_enabled {
            if result.has_failures() {
                let _ = writeln!(writer, "{} {}", "!".yellow().bold(), summary.yellow());
            } else {
                let _ = writeln!(writer, "{} {}", "✓".green().bold(), summary.green());
            }
        } else {
            let _ = writeln!(writer, "Done: {}", summary);
        }
    }

    fn warn(&self, message: &str) {
        let mut writer = self.writer.lock();
        if self.colors_enabled {
            let _ = writeln!(writer, "{} {}", "!".yellow().bold(), message.yellow());
        } else {
            let _ = writeln!(writer, "Warning: {}", message);
        }
    }
}

impl ProgressSink for TerminalProgress {
    fn emit(&self, event: ProgressEvent) {
        if self.silent {
            return;
        }
        match event {
            ProgressEvent::Progress {
                file,
                status,
                current,
                total,
            } => self.file_progress(&file, status, current, total),
            ProgressEvent::Complete { result } => self.complete(&result),
            ProgressEvent::Warning { message } => self.warn(&message),
        }
    }
}
