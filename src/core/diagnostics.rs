//! Compiler diagnostics extracted from build output.

use std::collections::BTreeMap;
use std::fmt;

use serde::Serialize;

/// Severity of a compiler diagnostic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Warning,
    Error,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Warning => write!(f, "warning"),
            Severity::Error => write!(f, "error"),
        }
    }
}

/// One compiler warning or error.
///
/// `line` is zero-based; `column` is reported as the compiler printed it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DiagnosticRecord {
    pub file_path: String,
    pub line: u32,
    pub column: u32,
    pub severity: Severity,
    pub message: String,
}

impl fmt::Display for DiagnosticRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{}:{}: {}: {}",
            self.file_path,
            self.line + 1,
            self.column,
            self.severity,
            self.message
        )
    }
}

/// Diagnostics grouped by file, in arrival order within each file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct DiagnosticSet {
    by_file: BTreeMap<String, Vec<DiagnosticRecord>>,
}

impl DiagnosticSet {
    pub fn new() -> Self {
        DiagnosticSet::default()
    }

    pub fn push(&mut self, record: DiagnosticRecord) {
        self.by_file
            .entry(record.file_path.clone())
            .or_default()
            .push(record);
    }

    pub fn clear(&mut self) {
        self.by_file.clear();
    }

    /// Diagnostics for one file.
    pub fn for_file(&self, path: &str) -> &[DiagnosticRecord] {
        self.by_file.get(path).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Iterate `(file, records)` pairs.
    pub fn files(&self) -> impl Iterator<Item = (&str, &[DiagnosticRecord])> {
        self.by_file.iter().map(|(k, v)| (k.as_str(), v.as_slice()))
    }

    /// Total number of records across all files.
    pub fn len(&self) -> usize {
        self.by_file.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.by_file.is_empty()
    }

    /// Count records of the given severity.
    pub fn count(&self, severity: Severity) -> usize {
        self.by_file
            .values()
            .flatten()
            .filter(|r| r.severity == severity)
            .count()
    }
}
