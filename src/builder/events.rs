//! Events reported to the host while building and uploading.
//!
//! The host decides how to render them: the terminal shell prints human
//! text, or one JSON object per line with `--message-format=json`.
//!
//! # Stability
//!
//! The JSON schema is keyed by `reason`. New fields may be added, but
//! existing fields should not be removed or renamed.

use std::path::PathBuf;

use serde::Serialize;

use crate::builder::classify::MemoryUsage;
use crate::core::diagnostics::{DiagnosticRecord, DiagnosticSet};

/// Which output pipe a log line came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LogSource {
    Stdout,
    Stderr,
    /// Text produced by sketchport itself (banners, echoed commands)
    Internal,
}

/// Severity of a notice addressed to the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NoticeLevel {
    Info,
    Warning,
    Error,
}

/// An event emitted during a build, upload or clean.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "reason")]
pub enum BuildEvent {
    /// A line for the log channel.
    #[serde(rename = "log")]
    Log { source: LogSource, line: String },

    /// The log channel should be cleared.
    #[serde(rename = "log-cleared")]
    LogCleared,

    /// The log channel should be brought to the user's attention.
    #[serde(rename = "log-revealed")]
    LogRevealed,

    /// A compile is starting.
    #[serde(rename = "build-started")]
    BuildStarted {
        sketch: PathBuf,
        fqbn: String,
        build_dir: PathBuf,
    },

    /// Live progress indicator text changed.
    #[serde(rename = "build-progress")]
    Progress { status: String, percent: String },

    /// The builder reported memory usage.
    #[serde(rename = "memory-usage")]
    MemoryUsage { summary: String, usage: MemoryUsage },

    /// A compiler warning or error, as it arrived.
    #[serde(rename = "compiler-diagnostic")]
    CompilerDiagnostic {
        #[serde(flatten)]
        diagnostic: DiagnosticRecord,
    },

    /// The complete diagnostic set of the finished build.
    #[serde(rename = "diagnostics-published")]
    DiagnosticsPublished { diagnostics: DiagnosticSet },

    /// A compile finished (success or failure).
    #[serde(rename = "build-finished")]
    BuildFinished {
        success: bool,
        /// `None` when the builder could not be spawned or was killed
        exit_code: Option<i32>,
        duration_ms: u64,
        errors: usize,
        warnings: usize,
    },

    /// An upload is starting.
    #[serde(rename = "upload-started")]
    UploadStarted { program: PathBuf, port: Option<String> },

    /// An upload finished.
    #[serde(rename = "upload-finished")]
    UploadFinished {
        success: bool,
        exit_code: Option<i32>,
    },

    /// Result of a clean request.
    #[serde(rename = "clean")]
    Clean { path: PathBuf, removed: bool },

    /// An advisory or error for the user.
    #[serde(rename = "notice")]
    Notice { level: NoticeLevel, message: String },
}

impl BuildEvent {
    /// Create a log event.
    pub fn log(source: LogSource, line: impl Into<String>) -> Self {
        BuildEvent::Log {
            source,
            line: line.into(),
        }
    }

    /// Create a log event for sketchport's own text.
    pub fn internal(line: impl Into<String>) -> Self {
        BuildEvent::log(LogSource::Internal, line)
    }

    /// Create a notice event.
    pub fn notice(level: NoticeLevel, message: impl Into<String>) -> Self {
        BuildEvent::Notice {
            level,
            message: message.into(),
        }
    }

    /// Create a build finished event.
    pub fn finished(success: bool, exit_code: Option<i32>, duration_ms: u64) -> Self {
        BuildEvent::BuildFinished {
            success,
            exit_code,
            duration_ms,
            errors: 0,
            warnings: 0,
        }
    }

    /// Serialize this event to a JSON string.
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_default()
    }
}
