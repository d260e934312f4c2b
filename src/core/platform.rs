//! Host platform facts.
//!
//! The resolver needs three platform-dependent values: the executable
//! suffix appended to bare command names, the OS suffix used to pick
//! platform-specific preference variants (`tools.avrdude.cmd.path.linux`),
//! and whether paths must be rewritten to backslashes.

use std::fmt;
use std::path::PathBuf;

/// The platform family the tools run on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HostPlatform {
    Windows,
    Linux,
    MacOs,
    Other,
}

impl HostPlatform {
    /// Detect the platform this binary was compiled for.
    pub fn current() -> Self {
        if cfg!(target_os = "windows") {
            HostPlatform::Windows
        } else if cfg!(target_os = "macos") {
            HostPlatform::MacOs
        } else if cfg!(target_os = "linux") {
            HostPlatform::Linux
        } else {
            HostPlatform::Other
        }
    }

    /// Suffix appended to executable names (`.exe` on Windows).
    pub fn exe_suffix(&self) -> &'static str {
        match self {
            HostPlatform::Windows => ".exe",
            _ => "",
        }
    }

    /// Suffix selecting OS-specific preference variants.
    pub fn os_suffix(&self) -> Option<&'static str> {
        match self {
            HostPlatform::Windows => Some(".windows"),
            HostPlatform::Linux => Some(".linux"),
            HostPlatform::MacOs => Some(".macosx"),
            HostPlatform::Other => None,
        }
    }

    /// Whether argument paths must use backslash separators.
    pub fn uses_backslash(&self) -> bool {
        matches!(self, HostPlatform::Windows)
    }

    /// Rewrite forward slashes to the native separator.
    ///
    /// Only the separator-sensitive family is touched; everywhere else the
    /// argument passes through unchanged.
    pub fn native_path(&self, arg: &str) -> String {
        if self.uses_backslash() {
            arg.replace('/', "\\")
        } else {
            arg.to_string()
        }
    }

    /// Default IDE installation directory, if the platform has one.
    pub fn default_ide_path(&self) -> Option<PathBuf> {
        match self {
            HostPlatform::Windows => Some(PathBuf::from("C:\\Program Files (x86)\\Arduino")),
            HostPlatform::MacOs => Some(PathBuf::from("/Applications/Arduino.app/Contents/Java")),
            _ => None,
        }
    }

    /// Default directory holding third-party board packages.
    pub fn default_package_path(&self) -> Option<PathBuf> {
        let home = directories::BaseDirs::new().map(|b| b.home_dir().to_path_buf());
        match self {
            HostPlatform::Windows => std::env::var_os("APPDATA").map(PathBuf::from),
            HostPlatform::MacOs => home.map(|h| h.join("Library").join("Arduino15")),
            HostPlatform::Linux | HostPlatform::Other => home.map(|h| h.join(".arduino15")),
        }
    }

    /// Default user library directory.
    pub fn default_library_path(&self) -> Option<PathBuf> {
        directories::BaseDirs::new().map(|b| {
            b.home_dir()
                .join("Documents")
                .join("Arduino")
                .join("libraries")
        })
    }
}

impl fmt::Display for HostPlatform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HostPlatform::Windows => write!(f, "windows"),
            HostPlatform::Linux => write!(f, "linux"),
            HostPlatform::MacOs => write!(f, "macos"),
            HostPlatform::Other => write!(f, "other"),
        }
    }
}
