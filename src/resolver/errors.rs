//! Resolver error types and diagnostics.

use std::path::PathBuf;

use miette::Diagnostic as MietteDiagnostic;
use thiserror::Error;

use crate::util::diagnostic::{suggestions, Diagnostic};

/// Error during placeholder expansion.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ExpandError {
    #[error("placeholder cycle: {}", chain.join(" -> "))]
    Cycle { chain: Vec<String> },

    #[error("placeholder nesting too deep while expanding `{key}`")]
    DepthExceeded { key: String },
}

/// Configuration problem detected before any process is spawned.
#[derive(Debug, Clone, Error, MietteDiagnostic, PartialEq, Eq)]
pub enum ConfigError {
    #[error("no Arduino IDE installation configured")]
    #[diagnostic(
        code(sketchport::config::missing_ide_path),
        help("Set `ide_path` under [toolchain] in .sketchport/config.toml")
    )]
    MissingIdePath,

    #[error("no serial port configured")]
    #[diagnostic(
        code(sketchport::config::missing_serial_port),
        help("Set `serial_port` under [upload] or pass --port")
    )]
    MissingSerialPort,

    #[error("arduino-builder not found at `{}`", path.display())]
    #[diagnostic(
        code(sketchport::config::builder_not_found),
        help("Point `ide_path` at a complete Arduino IDE installation")
    )]
    BuilderNotFound { path: PathBuf },
}

impl ConfigError {
    /// Convert to a user-friendly diagnostic.
    pub fn to_diagnostic(&self) -> Diagnostic {
        match self {
            ConfigError::MissingIdePath => Diagnostic::error(self.to_string())
                .with_context("the builder cannot run without the IDE toolchain")
                .with_suggestion(suggestions::SET_IDE_PATH),
            ConfigError::MissingSerialPort => Diagnostic::error(self.to_string())
                .with_context("uploading needs to know where the board is attached")
                .with_suggestion(suggestions::SET_SERIAL_PORT),
            ConfigError::BuilderNotFound { path } => Diagnostic::error(self.to_string())
                .with_location(path)
                .with_suggestion(suggestions::SET_IDE_PATH),
        }
    }
}
