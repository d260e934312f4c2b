//! Core data types: preferences, platform facts, sketches and diagnostics.

pub mod diagnostics;
pub mod platform;
pub mod prefs;
pub mod sketch;

pub use diagnostics::{DiagnosticRecord, DiagnosticSet, Severity};
pub use platform::HostPlatform;
pub use prefs::PreferenceStore;
pub use sketch::Sketch;
