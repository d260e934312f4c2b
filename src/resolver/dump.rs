//! Preference dump from the external builder.
//!
//! `arduino-builder ... -dump-prefs` prints the board platform's complete
//! preference set as `key=value` lines. That output is the bulk of the
//! preference store.

use std::path::Path;

use crate::util::process::ProcessBuilder;

/// Flag asking the builder to print its preferences instead of compiling.
pub const DUMP_FLAG: &str = "-dump-prefs";

/// Run the builder in dump mode and return its stdout.
///
/// Failures are logged and yield `None`: a missing dump leaves the store
/// with seeded keys only, and later invocations fail at the tool boundary.
pub fn dump_preferences(builder: &Path, args: &[String]) -> Option<String> {
    let process = ProcessBuilder::new(builder).args(args).arg(DUMP_FLAG);
    tracing::debug!("dumping preferences: {}", process.display_command());

    match process.exec() {
        Ok(output) if output.status.success() => {
            Some(String::from_utf8_lossy(&output.stdout).into_owned())
        }
        Ok(output) => {
            tracing::warn!(
                "preference dump failed with exit code {:?}\n{}",
                output.status.code(),
                String::from_utf8_lossy(&output.stderr)
            );
            None
        }
        Err(e) => {
            tracing::warn!("preference dump failed: {:#}", e);
            None
        }
    }
}
