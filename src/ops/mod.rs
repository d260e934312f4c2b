//! High-level operations.
//!
//! This module contains the build/upload orchestrator and the seams a host
//! plugs into it.

pub mod host;
pub mod orchestrator;
pub mod session;

pub use host::{FileDocument, Reporter, SourceDocument};
pub use orchestrator::{
    BuildOutcome, CleanOutcome, Orchestrator, OrchestratorError, UploadOutcome, COMPILE_BANNER,
    PROGRESS_PREFIX, UPLOAD_BANNER,
};
pub use session::{SessionGuard, SessionKind, Sessions};
