//! Classification of builder output lines.
//!
//! The builder's machine logger emits structured records shaped as
//! `<level> ||| <category> ||| [<payload>]` on stdout. GCC-style
//! diagnostics arrive on stderr. Each pipe has its own classifier, and
//! classification is a pure function of one line so the text format stays
//! swappable.

use std::fmt;
use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;

use crate::core::diagnostics::{DiagnosticRecord, Severity};

/// Separator between fields of a structured record.
pub const FIELD_DELIMITER: &str = " ||| ";

static DIAGNOSTIC_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(.*):(\d+):(\d+):\s+(warning|error):\s+(.*)$").unwrap()
});

/// Memory usage summary printed after a successful compile.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum MemoryUsage {
    ProgramStorage {
        used: String,
        max: String,
        percent: String,
    },
    DynamicMemory {
        used: String,
        max: String,
        percent: String,
        remaining: String,
    },
}

impl fmt::Display for MemoryUsage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MemoryUsage::ProgramStorage { used, max, percent } => write!(
                f,
                "Sketch uses {} bytes ({}%) of program storage space. Maximum is {} bytes.",
                used, percent, max
            ),
            MemoryUsage::DynamicMemory {
                used,
                max,
                percent,
                remaining,
            } => write!(
                f,
                "Global variables use {} bytes ({}%) of dynamic memory, leaving {} bytes for local variables. Maximum is {} bytes.",
                used, percent, remaining, max
            ),
        }
    }
}

/// What one line of output turned out to be.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutputRecord {
    /// Compile progress percentage
    Progress { percent: String },
    /// Memory usage summary
    Memory(MemoryUsage),
    /// Compiler warning or error
    Diagnostic(DiagnosticRecord),
    /// Anything else, passed through verbatim
    Text(String),
}

/// Classify one line of builder stdout.
///
/// Only structured records are recognised here; anything else is returned
/// unchanged as text so nothing is ever dropped.
pub fn classify_stdout(line: &str) -> OutputRecord {
    parse_structured(line).unwrap_or_else(|| OutputRecord::Text(line.to_string()))
}

/// Classify one line of builder stderr.
///
/// Only compiler diagnostics are recognised here.
pub fn classify_stderr(line: &str) -> OutputRecord {
    match parse_diagnostic(line) {
        Some(diag) => OutputRecord::Diagnostic(diag),
        None => OutputRecord::Text(line.to_string()),
    }
}

/// Parse a `<level> ||| <category> ||| [<payload>]` record.
///
/// Returns `None` unless the line has all three fields. A payload that is
/// neither progress nor a 3 or 4 token memory summary comes back as text.
pub fn parse_structured(line: &str) -> Option<OutputRecord> {
    let fields: Vec<&str> = line.splitn(3, FIELD_DELIMITER).collect();
    let [_, category, raw_payload] = fields.as_slice() else {
        return None;
    };
    let payload = strip_markers(raw_payload);

    if category.contains("Progress") {
        return Some(OutputRecord::Progress {
            percent: payload.trim().to_string(),
        });
    }

    let tokens: Vec<&str> = payload.split(' ').collect();
    let memory = match tokens.as_slice() {
        [used, max, percent] => MemoryUsage::ProgramStorage {
            used: used.to_string(),
            max: max.to_string(),
            percent: percent.to_string(),
        },
        [used, max, percent, remaining] => MemoryUsage::DynamicMemory {
            used: used.to_string(),
            max: max.to_string(),
            percent: percent.to_string(),
            remaining: remaining.to_string(),
        },
        _ => return Some(OutputRecord::Text(line.to_string())),
    };
    Some(OutputRecord::Memory(memory))
}

/// Drop the enclosing marker characters around a payload.
fn strip_markers(payload: &str) -> &str {
    let mut chars = payload.chars();
    chars.next();
    chars.next_back();
    chars.as_str()
}

/// Parse a `<file>:<line>:<column>: <warning|error>: <message>` line.
///
/// The tool's 1-based line becomes 0-based; the column is kept as printed.
pub fn parse_diagnostic(line: &str) -> Option<DiagnosticRecord> {
    let caps = DIAGNOSTIC_RE.captures(line)?;
    let line_no: u32 = caps[2].parse().ok()?;
    let column: u32 = caps[3].parse().ok()?;
    let severity = match &caps[4] {
        "error" => Severity::Error,
        _ => Severity::Warning,
    };

    Some(DiagnosticRecord {
        file_path: caps[1].to_string(),
        line: line_no.saturating_sub(1),
        column,
        severity,
        message: caps[5].to_string(),
    })
}

/// Text for the live progress indicator.
pub fn progress_status(prefix: &str, percent: &str) -> String {
    format!("{}{}%", prefix, percent)
}
