//! `sketchport build` and `sketchport rebuild` commands

use anyhow::{bail, Result};

use sketchport::ops::BuildOutcome;
use sketchport::util::diagnostic::suggestions;

use crate::cli::{GlobalArgs, SketchArgs};
use crate::commands::open;

pub fn execute(global: &GlobalArgs, args: SketchArgs) -> Result<()> {
    let orchestrator = open(global, args.sketch.as_deref())?;
    let outcome = orchestrator.build()?;
    check(&outcome)
}

pub fn execute_rebuild(global: &GlobalArgs, args: SketchArgs) -> Result<()> {
    let orchestrator = open(global, args.sketch.as_deref())?;
    let outcome = orchestrator.rebuild()?;
    check(&outcome)
}

/// Turn a failed compile into a non-zero exit.
pub fn check(outcome: &BuildOutcome) -> Result<()> {
    if outcome.success() {
        return Ok(());
    }
    match outcome.exit_code {
        Some(code) => bail!(
            "build failed with exit code {}\nhint: {}",
            code,
            suggestions::BUILD_FAILED
        ),
        None => bail!("builder was terminated by a signal"),
    }
}
