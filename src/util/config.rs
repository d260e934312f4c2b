//! Configuration file support for Sketchport.
//!
//! Two configuration file locations are read:
//! - Global: `~/.sketchport/config.toml` - User-wide defaults
//! - Project: `.sketchport/config.toml` - Project-specific overrides
//!
//! Project config takes precedence over global config. A loaded [`Config`]
//! is a snapshot: the resolver never watches the files, the host calls
//! `reload` with a fresh snapshot instead.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// Default fully-qualified board name.
pub const DEFAULT_FQBN: &str = "arduino:avr:uno";

/// Sketchport configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Toolchain locations and board selection
    pub toolchain: ToolchainSettings,

    /// Compile settings
    pub build: BuildSettings,

    /// Upload settings
    pub upload: UploadSettings,
}

/// Toolchain locations.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolchainSettings {
    /// Arduino IDE installation directory
    pub ide_path: Option<PathBuf>,

    /// User library directory
    pub library_path: Option<PathBuf>,

    /// Board package directory (`packages` is appended if missing)
    pub package_path: Option<PathBuf>,

    /// Fully-qualified board name (e.g., arduino:avr:uno)
    pub fqbn: Option<String>,
}

/// Compile-related settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BuildSettings {
    /// Sketch file name overriding the active document
    pub sketch: Option<String>,

    /// Compiler warning level (none, default, more, all)
    pub warn_mode: String,

    /// Dynamic memory usage percentage that triggers a warning
    pub warn_percentage: u32,

    /// Extra arguments passed to the builder before the sketch path
    pub compile_options: Vec<String>,

    /// Verbose builder output and command echo
    pub verbose: bool,
}

impl Default for BuildSettings {
    fn default() -> Self {
        BuildSettings {
            sketch: None,
            warn_mode: "none".to_string(),
            warn_percentage: 75,
            compile_options: Vec::new(),
            verbose: false,
        }
    }
}

/// Upload-related settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct UploadSettings {
    /// Serial port the board is attached to
    pub serial_port: Option<String>,

    /// Serial baud rate
    pub baud_rate: u32,

    /// avrdude part number
    pub partno: String,

    /// avrdude programmer id
    pub programmer: String,

    /// Custom uploader executable
    pub uploader: Option<PathBuf>,

    /// Uploader arguments; `$TARGET`, `$BAUDRATE` and `$SERIALPORT` are substituted
    pub options: Vec<String>,
}

impl Default for UploadSettings {
    fn default() -> Self {
        UploadSettings {
            serial_port: None,
            baud_rate: 115_200,
            partno: "atmega328p".to_string(),
            programmer: "arduino".to_string(),
            uploader: None,
            options: Vec::new(),
        }
    }
}

/// A config file as written on disk, where every field is optional so
/// that merging can tell "unset" from "set to the default".
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
struct PartialConfig {
    toolchain: ToolchainSettings,
    build: PartialBuild,
    upload: PartialUpload,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
struct PartialBuild {
    sketch: Option<String>,
    warn_mode: Option<String>,
    warn_percentage: Option<u32>,
    compile_options: Option<Vec<String>>,
    verbose: Option<bool>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
struct PartialUpload {
    serial_port: Option<String>,
    baud_rate: Option<u32>,
    partno: Option<String>,
    programmer: Option<String>,
    uploader: Option<PathBuf>,
    options: Option<Vec<String>>,
}

impl Config {
    /// Load configuration from a file.
    pub fn load(path: &Path) -> Result<Self> {
        let mut config = Config::default();
        config.merge_file(path)?;
        Ok(config)
    }

    /// Load configuration with fallback to defaults if file doesn't exist.
    pub fn load_or_default(path: &Path) -> Self {
        if path.exists() {
            Self::load(path).unwrap_or_else(|e| {
                tracing::warn!("Failed to load config from {}: {:#}", path.display(), e);
                Self::default()
            })
        } else {
            Self::default()
        }
    }

    /// Parse a TOML document and merge it over this config.
    pub fn merge_str(&mut self, contents: &str) -> Result<()> {
        let other: PartialConfig =
            toml::from_str(contents).context("failed to parse config document")?;
        self.merge(other);
        Ok(())
    }

    fn merge_file(&mut self, path: &Path) -> Result<()> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file: {}", path.display()))?;
        self.merge_str(&contents)
            .with_context(|| format!("failed to parse config file: {}", path.display()))
    }

    /// Merge a partial config into this one (other takes precedence).
    fn merge(&mut self, other: PartialConfig) {
        let t = other.toolchain;
        if t.ide_path.is_some() {
            self.toolchain.ide_path = t.ide_path;
        }
        if t.library_path.is_some() {
            self.toolchain.library_path = t.library_path;
        }
        if t.package_path.is_some() {
            self.toolchain.package_path = t.package_path;
        }
        if t.fqbn.is_some() {
            self.toolchain.fqbn = t.fqbn;
        }

        let b = other.build;
        if b.sketch.is_some() {
            self.build.sketch = b.sketch;
        }
        if let Some(mode) = b.warn_mode {
            self.build.warn_mode = mode;
        }
        if let Some(pct) = b.warn_percentage {
            self.build.warn_percentage = pct;
        }
        if let Some(opts) = b.compile_options {
            self.build.compile_options = opts;
        }
        if let Some(verbose) = b.verbose {
            self.build.verbose = verbose;
        }

        let u = other.upload;
        if u.serial_port.is_some() {
            self.upload.serial_port = u.serial_port;
        }
        if let Some(baud) = u.baud_rate {
            self.upload.baud_rate = baud;
        }
        if let Some(partno) = u.partno {
            self.upload.partno = partno;
        }
        if let Some(programmer) = u.programmer {
            self.upload.programmer = programmer;
        }
        if u.uploader.is_some() {
            self.upload.uploader = u.uploader;
        }
        if let Some(opts) = u.options {
            self.upload.options = opts;
        }
    }

    /// Board name, falling back to [`DEFAULT_FQBN`].
    pub fn fqbn(&self) -> &str {
        self.toolchain.fqbn.as_deref().unwrap_or(DEFAULT_FQBN)
    }
}

/// Load merged configuration from global and project locations.
///
/// Order of precedence (highest to lowest):
/// 1. Project config (.sketchport/config.toml)
/// 2. Global config (~/.sketchport/config.toml)
/// 3. Defaults
pub fn load_config(global_path: &Path, project_path: &Path) -> Config {
    let mut config = Config::default();

    for path in [global_path, project_path] {
        if path.exists() {
            if let Err(e) = config.merge_file(path) {
                tracing::warn!("Failed to load config from {}: {:#}", path.display(), e);
            }
        }
    }

    config
}

/// Get the global sketchport config directory (~/.sketchport).
pub fn global_config_dir() -> Option<PathBuf> {
    directories::BaseDirs::new().map(|b| b.home_dir().join(".sketchport"))
}
