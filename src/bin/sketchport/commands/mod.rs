//! Command implementations

use std::path::Path;

use anyhow::Result;

use sketchport::core::HostPlatform;
use sketchport::ops::FileDocument;
use sketchport::util::config::Config;
use sketchport::util::diagnostic::{suggestions, Diagnostic};
use sketchport::util::shell::ColorChoice;
use sketchport::util::{GlobalContext, Shell};
use sketchport::{Orchestrator, OrchestratorError, RecipeResolver};

use crate::cli::{GlobalArgs, MessageFormat};

pub mod build;
pub mod clean;
pub mod completions;
pub mod init;
pub mod show;
pub mod upload;

/// Merge the global flags over the loaded configuration.
pub fn apply_overrides(config: &mut Config, global: &GlobalArgs) {
    if let Some(port) = &global.port {
        config.upload.serial_port = Some(port.clone());
    }
    if let Some(fqbn) = &global.fqbn {
        config.toolchain.fqbn = Some(fqbn.clone());
    }
    if global.verbose {
        config.build.verbose = true;
    }
}

/// Shell configured from the global flags.
pub fn shell(global: &GlobalArgs) -> Shell {
    let color = if global.no_color {
        ColorChoice::Never
    } else {
        ColorChoice::Auto
    };
    Shell::from_flags(
        global.quiet,
        global.verbose,
        color,
        global.message_format == MessageFormat::Json,
    )
}

/// Load config, locate the sketch and set up an orchestrator for it.
pub fn open(global: &GlobalArgs, sketch: Option<&Path>) -> Result<Orchestrator<Shell>> {
    let ctx = GlobalContext::new()?;

    let mut config = ctx.load_config();
    apply_overrides(&mut config, global);

    let sketch = ctx.find_sketch(sketch, &config)?;
    tracing::debug!("using sketch {}", sketch.display());

    let resolver = RecipeResolver::load(config, HostPlatform::current(), ctx.project_root());
    Ok(Orchestrator::new(
        resolver,
        FileDocument::new(sketch),
        shell(global),
    ))
}

/// Explain an orchestrator failure with its likely fix.
pub fn diagnose(err: &OrchestratorError) -> Diagnostic {
    match err {
        OrchestratorError::Config(config) => config.to_diagnostic(),
        OrchestratorError::Busy { .. } => {
            Diagnostic::error(err.to_string()).with_suggestion(suggestions::WAIT_FOR_SESSION)
        }
        OrchestratorError::Spawn { program, source } => Diagnostic::error(err.to_string())
            .with_context(source.to_string())
            .with_location(program.clone())
            .with_suggestion(suggestions::TOOL_NOT_FOUND),
        OrchestratorError::Other(inner) => Diagnostic::error(format!("{:#}", inner)),
    }
}
