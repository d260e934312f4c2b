//! Builder and uploader invocation.
//!
//! This module turns a resolved recipe into argument vectors and turns the
//! tools' output back into structured records and events.

pub mod args;
pub mod classify;
pub mod events;

pub use args::{minimal_arguments, ArgumentSynthesizer, CommandSpec, UploadStrategy};
pub use classify::{
    classify_stderr, classify_stdout, parse_diagnostic, parse_structured, progress_status,
    MemoryUsage, OutputRecord,
};
pub use events::{BuildEvent, LogSource, NoticeLevel};
