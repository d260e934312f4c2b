//! Test utilities for Sketchport unit tests.
//!
//! Provides a [`RecordingReporter`] that captures every event, an in-memory
//! [`MemoryDocument`] with unsaved edits, and fixtures for fake toolchains
//! made of shell scripts.
//!
//! # Example
//!
//! ```rust,ignore
//! use sketchport::test_support::{write_script, RecordingReporter};
//!
//! #[test]
//! fn test_example() {
//!     let tmp = tempfile::TempDir::new().unwrap();
//!     write_script(tmp.path(), "arduino-builder", "echo done");
//!     let reporter = RecordingReporter::new();
//!     // Build an orchestrator around the fake toolchain...
//! }
//! ```

pub mod fixtures;

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use anyhow::{Context, Result};

use crate::builder::events::{BuildEvent, NoticeLevel};
use crate::ops::host::{Reporter, SourceDocument};

// Re-export fixtures for convenience
pub use fixtures::*;

/// Reporter that keeps every event in arrival order.
#[derive(Debug, Default)]
pub struct RecordingReporter {
    events: Mutex<Vec<BuildEvent>>,
}

impl RecordingReporter {
    /// Create an empty reporter.
    pub fn new() -> Self {
        RecordingReporter::default()
    }

    /// All events reported so far.
    pub fn events(&self) -> Vec<BuildEvent> {
        self.events.lock().unwrap().clone()
    }

    /// Text of every log event.
    pub fn log_lines(&self) -> Vec<String> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                BuildEvent::Log { line, .. } => Some(line),
                _ => None,
            })
            .collect()
    }

    /// Messages of notices at the given level.
    pub fn notices(&self, level: NoticeLevel) -> Vec<String> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                BuildEvent::Notice { level: l, message } if l == level => Some(message),
                _ => None,
            })
            .collect()
    }
}

impl Reporter for RecordingReporter {
    fn report(&self, event: BuildEvent) {
        self.events.lock().unwrap().push(event);
    }
}

/// A document with edits that only reach disk on `save`.
#[derive(Debug)]
pub struct MemoryDocument {
    path: PathBuf,
    contents: String,
    dirty: bool,
    untitled: bool,
    saves: Arc<AtomicUsize>,
}

impl MemoryDocument {
    /// A named document with unsaved edits.
    pub fn dirty(path: impl AsRef<Path>, contents: impl Into<String>) -> Self {
        MemoryDocument {
            path: path.as_ref().to_path_buf(),
            contents: contents.into(),
            dirty: true,
            untitled: false,
            saves: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// A document that was never named; `path` is where a save lands.
    pub fn untitled(path: impl AsRef<Path>, contents: impl Into<String>) -> Self {
        MemoryDocument {
            untitled: true,
            ..MemoryDocument::dirty(path, contents)
        }
    }

    /// Counter of successful saves, shared with the document.
    pub fn save_counter(&self) -> Arc<AtomicUsize> {
        Arc::clone(&self.saves)
    }
}

impl SourceDocument for MemoryDocument {
    fn path(&self) -> &Path {
        &self.path
    }

    fn is_untitled(&self) -> bool {
        self.untitled
    }

    fn is_dirty(&self) -> bool {
        self.dirty
    }

    fn save(&mut self) -> Result<()> {
        std::fs::write(&self.path, &self.contents)
            .with_context(|| format!("failed to write {}", self.path.display()))?;
        self.dirty = false;
        self.untitled = false;
        self.saves.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_recording_reporter() {
        let reporter = RecordingReporter::new();
        reporter.report(BuildEvent::internal("hello"));
        reporter.report(BuildEvent::notice(NoticeLevel::Warning, "careful"));

        assert_eq!(reporter.events().len(), 2);
        assert_eq!(reporter.log_lines(), vec!["hello".to_string()]);
        assert_eq!(reporter.notices(NoticeLevel::Warning), vec!["careful".to_string()]);
        assert!(reporter.notices(NoticeLevel::Error).is_empty());
    }

    #[test]
    fn test_memory_document_save() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("blink.ino");
        let mut doc = MemoryDocument::dirty(&path, "void loop() {}");
        let saves = doc.save_counter();

        assert!(doc.is_dirty());
        doc.save().unwrap();
        assert!(!doc.is_dirty());
        assert_eq!(saves.load(Ordering::SeqCst), 1);
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "void loop() {}");
    }
}
