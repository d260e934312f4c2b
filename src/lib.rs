//! Sketchport - build and upload Arduino sketches from the command line
//!
//! This crate provides the core library functionality for Sketchport:
//! resolving the board platform's recipes into command lines, driving the
//! external builder and uploader, and classifying their output.

pub mod builder;
pub mod core;
pub mod ops;
pub mod resolver;
pub mod util;

/// Test utilities for Sketchport unit tests.
///
/// This module is only available when compiling with `--cfg test` or
/// running tests. It provides a recording reporter, an in-memory document,
/// and fake toolchain fixtures.
#[cfg(test)]
pub mod test_support;

pub use crate::core::{DiagnosticRecord, DiagnosticSet, HostPlatform, PreferenceStore, Sketch};
pub use builder::{ArgumentSynthesizer, BuildEvent};
pub use ops::{Orchestrator, OrchestratorError, Reporter, SourceDocument};
pub use resolver::{Expander, RecipeResolver};
pub use util::context::GlobalContext;
