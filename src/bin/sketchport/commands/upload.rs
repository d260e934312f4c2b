//! `sketchport upload`, `flash` and `reflash` commands

use anyhow::{bail, Result};

use sketchport::ops::UploadOutcome;

use crate::cli::{GlobalArgs, SketchArgs};
use crate::commands::build::check;
use crate::commands::open;

pub fn execute(global: &GlobalArgs, args: SketchArgs) -> Result<()> {
    let orchestrator = open(global, args.sketch.as_deref())?;
    finish(orchestrator.upload()?)
}

pub fn execute_flash(global: &GlobalArgs, args: SketchArgs) -> Result<()> {
    let orchestrator = open(global, args.sketch.as_deref())?;
    finish(orchestrator.build_and_upload()?)
}

pub fn execute_reflash(global: &GlobalArgs, args: SketchArgs) -> Result<()> {
    let orchestrator = open(global, args.sketch.as_deref())?;
    finish(orchestrator.rebuild_and_upload()?)
}

fn finish(outcome: UploadOutcome) -> Result<()> {
    match outcome {
        UploadOutcome::Finished { exit_code: Some(0) } => Ok(()),
        UploadOutcome::Finished { exit_code: Some(code) } => {
            bail!("upload failed with exit code {}", code)
        }
        UploadOutcome::Finished { exit_code: None } => bail!("uploader was terminated by a signal"),
        UploadOutcome::BuildFailed(build) => check(&build),
    }
}
