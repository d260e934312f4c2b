//! `sketchport clean` command

use anyhow::Result;

use crate::cli::{GlobalArgs, SketchArgs};
use crate::commands::open;

pub fn execute(global: &GlobalArgs, args: SketchArgs) -> Result<()> {
    let orchestrator = open(global, args.sketch.as_deref())?;
    orchestrator.clean()?;
    Ok(())
}
