//! `sketchport init` command

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};

use sketchport::util::config::DEFAULT_FQBN;
use sketchport::util::context::PROJECT_DIR_NAME;
use sketchport::util::fs::ensure_dir;

use crate::cli::{GlobalArgs, InitArgs};

/// Render the project config for the given settings.
///
/// Only settings that were given are written, so the global config still
/// applies to everything else.
pub fn render_config(ide_path: Option<&Path>, port: Option<&str>, fqbn: Option<&str>) -> String {
    let mut toolchain = toml::Table::new();
    if let Some(ide) = ide_path {
        toolchain.insert("ide_path".into(), ide.display().to_string().into());
    }
    toolchain.insert("fqbn".into(), fqbn.unwrap_or(DEFAULT_FQBN).into());

    let mut doc = toml::Table::new();
    doc.insert("toolchain".into(), toolchain.into());
    if let Some(port) = port {
        let mut upload = toml::Table::new();
        upload.insert("serial_port".into(), port.into());
        doc.insert("upload".into(), upload.into());
    }

    doc.to_string()
}

pub fn execute(global: &GlobalArgs, args: InitArgs) -> Result<()> {
    let path = args.path.unwrap_or_else(|| PathBuf::from("."));
    let dir = path.join(PROJECT_DIR_NAME);
    let config_path = dir.join("config.toml");

    if config_path.exists() && !args.force {
        bail!(
            "`{}` already exists\nhint: pass --force to overwrite it",
            config_path.display()
        );
    }

    ensure_dir(&dir)?;
    let contents = render_config(
        args.ide_path.as_deref(),
        global.port.as_deref(),
        global.fqbn.as_deref(),
    );
    std::fs::write(&config_path, contents)
        .with_context(|| format!("failed to write {}", config_path.display()))?;

    eprintln!("     Created {}", config_path.display());

    Ok(())
}
