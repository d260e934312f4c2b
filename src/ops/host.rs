//! Seams to the host environment that drives the orchestrator.
//!
//! A host supplies two things: somewhere to send [`BuildEvent`]s, and the
//! source document being edited. The terminal host is
//! [`crate::util::shell::Shell`] plus [`FileDocument`].

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Result;

use crate::builder::events::BuildEvent;

/// Receives everything the orchestrator wants the user to see.
///
/// Events arrive on whichever thread runs the operation, one at a time.
pub trait Reporter: Send + Sync {
    fn report(&self, event: BuildEvent);
}

impl<R: Reporter + ?Sized> Reporter for Arc<R> {
    fn report(&self, event: BuildEvent) {
        (**self).report(event)
    }
}

/// The source document a build is started from.
pub trait SourceDocument: Send {
    /// Location of the document on disk.
    fn path(&self) -> &Path;

    /// Whether the document has never been given a file name.
    fn is_untitled(&self) -> bool;

    /// Whether there are unsaved edits.
    fn is_dirty(&self) -> bool;

    /// Persist unsaved edits.
    fn save(&mut self) -> Result<()>;
}

/// A document that only exists on disk.
#[derive(Debug, Clone)]
pub struct FileDocument {
    path: PathBuf,
}

impl FileDocument {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        FileDocument { path: path.into() }
    }
}

impl SourceDocument for FileDocument {
    fn path(&self) -> &Path {
        &self.path
    }

    fn is_untitled(&self) -> bool {
        self.path.file_name().is_none()
    }

    fn is_dirty(&self) -> bool {
        false
    }

    fn save(&mut self) -> Result<()> {
        Ok(())
    }
}
