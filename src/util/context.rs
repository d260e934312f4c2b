//! Global context for Sketchport operations.
//!
//! Provides centralized access to configuration, paths, and environment.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};

use crate::util::config::{global_config_dir, load_config, Config};

/// Per-project directory holding `config.toml`.
pub const PROJECT_DIR_NAME: &str = ".sketchport";

/// Global context containing configuration and paths.
#[derive(Debug, Clone)]
pub struct GlobalContext {
    /// Current working directory
    cwd: PathBuf,

    /// Home directory for global Sketchport data (~/.sketchport/)
    home: PathBuf,
}

impl GlobalContext {
    /// Create a new GlobalContext with defaults.
    pub fn new() -> Result<Self> {
        let cwd = std::env::current_dir().context("failed to get current directory")?;
        let home = global_config_dir().unwrap_or_else(|| PathBuf::from(PROJECT_DIR_NAME));

        Ok(GlobalContext { cwd, home })
    }

    /// Create a GlobalContext with a specific working directory.
    pub fn with_cwd(cwd: PathBuf) -> Result<Self> {
        let mut ctx = Self::new()?;
        ctx.cwd = cwd;
        Ok(ctx)
    }

    /// Get the current working directory.
    pub fn cwd(&self) -> &Path {
        &self.cwd
    }

    /// Get the global configuration file path.
    pub fn config_path(&self) -> PathBuf {
        self.home.join("config.toml")
    }

    /// Find the project root: the nearest ancestor of cwd holding a
    /// `.sketchport` directory, or cwd itself.
    pub fn project_root(&self) -> PathBuf {
        self.cwd
            .ancestors()
            .find(|dir| dir.join(PROJECT_DIR_NAME).is_dir())
            .unwrap_or(&self.cwd)
            .to_path_buf()
    }

    /// Get the project-local configuration file path.
    pub fn project_config_path(&self) -> PathBuf {
        self.project_root().join(PROJECT_DIR_NAME).join("config.toml")
    }

    /// Load the merged global and project configuration.
    pub fn load_config(&self) -> Config {
        load_config(&self.config_path(), &self.project_config_path())
    }

    /// Locate the sketch to work on.
    ///
    /// An explicit path wins, then `build.sketch` from config, then the only
    /// `.ino` file in the project root.
    pub fn find_sketch(&self, explicit: Option<&Path>, config: &Config) -> Result<PathBuf> {
        let root = self.project_root();
        if let Some(path) = explicit {
            return Ok(self.cwd.join(path));
        }
        if let Some(name) = &config.build.sketch {
            return Ok(root.join(name));
        }

        let mut candidates: Vec<PathBuf> = std::fs::read_dir(&root)
            .with_context(|| format!("failed to read {}", root.display()))?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|p| p.is_file() && p.extension().is_some_and(|e| e == "ino"))
            .collect();
        candidates.sort();

        match candidates.len() {
            0 => bail!(
                "no sketch found in `{}`\n\
                 hint: pass a sketch path or set `sketch` under [build]",
                root.display()
            ),
            1 => Ok(candidates.remove(0)),
            _ => bail!(
                "multiple sketches found in `{}`: {}\n\
                 hint: pass a sketch path or set `sketch` under [build]",
                root.display(),
                candidates
                    .iter()
                    .filter_map(|p| p.file_name())
                    .map(|n| n.to_string_lossy())
                    .collect::<Vec<_>>()
                    .join(", ")
            ),
        }
    }
}
