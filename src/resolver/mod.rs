//! Recipe resolution.
//!
//! [`RecipeResolver`] turns a [`Config`] snapshot into a populated
//! [`PreferenceStore`]: OS defaults and user settings first, then the
//! builder's preference dump, then keys derived from the board platform.
//! The store is rebuilt wholesale by [`RecipeResolver::reload`] and is
//! read-only otherwise.

pub mod dump;
pub mod errors;
pub mod expand;
pub mod split;

use std::path::{Path, PathBuf};

use crate::builder::args::minimal_arguments;
use crate::core::platform::HostPlatform;
use crate::core::prefs::PreferenceStore;
use crate::core::sketch::Sketch;
use crate::util::config::Config;
use crate::util::process::find_executable;

pub use errors::{ConfigError, ExpandError};
pub use expand::Expander;
pub use split::split_args;

/// Key naming the platform uploader executable.
pub const UPLOADER_KEY: &str = "arduino.platform.uploader";

/// Key naming the platform size tool executable.
pub const SIZER_KEY: &str = "arduino.platform.sizer";

/// IDE version reported to the builder.
pub const IDE_VERSION: &str = "10800";

/// Locations of the external toolchain.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ToolchainPaths {
    /// IDE installation; `None` when unset or missing on disk
    pub ide: Option<PathBuf>,
    /// The `arduino-builder` executable
    pub builder: Option<PathBuf>,
    /// User library directory
    pub library: Option<PathBuf>,
    /// Board package directory, ending in `packages`
    pub packages: Option<PathBuf>,
    /// Custom uploader, if configured and present
    pub uploader: Option<PathBuf>,
}

impl ToolchainPaths {
    /// Resolve toolchain locations from config and platform defaults.
    pub fn discover(config: &Config, platform: HostPlatform) -> Self {
        let ide = config
            .toolchain
            .ide_path
            .clone()
            .or_else(|| platform.default_ide_path())
            .map(|p| {
                if platform == HostPlatform::MacOs && !p.ends_with("Contents/Java") {
                    p.join("Contents").join("Java")
                } else {
                    p
                }
            })
            .filter(|p| p.exists());

        let builder_name = format!("arduino-builder{}", platform.exe_suffix());
        let builder = ide
            .as_ref()
            .map(|ide| ide.join(&builder_name))
            .filter(|p| p.is_file())
            .or_else(|| find_executable("arduino-builder"));

        let library = config
            .toolchain
            .library_path
            .clone()
            .or_else(|| platform.default_library_path());

        let packages = config
            .toolchain
            .package_path
            .clone()
            .or_else(|| platform.default_package_path())
            .map(|p| if p.ends_with("packages") { p } else { p.join("packages") });

        let uploader = match &config.upload.uploader {
            Some(path) if path.exists() => Some(path.clone()),
            Some(path) => {
                tracing::warn!("ignoring missing uploader `{}`", path.display());
                None
            }
            None => None,
        };

        ToolchainPaths {
            ide,
            builder,
            library,
            packages,
            uploader,
        }
    }
}

/// Resolved preferences plus the settings they were built from.
#[derive(Debug, Clone)]
pub struct RecipeResolver {
    config: Config,
    platform: HostPlatform,
    project_root: PathBuf,
    paths: ToolchainPaths,
    store: PreferenceStore,
}

impl RecipeResolver {
    /// Build a resolver, asking the builder for its preference dump.
    pub fn load(config: Config, platform: HostPlatform, project_root: impl Into<PathBuf>) -> Self {
        let paths = ToolchainPaths::discover(&config, platform);
        let dumped = match &paths.builder {
            Some(builder) => {
                let args = minimal_arguments(&paths, &config, platform);
                dump::dump_preferences(builder, &args)
            }
            None => None,
        };

        let mut store = PreferenceStore::new();
        if let Some(text) = dumped {
            let count = store.merge_dump(&text);
            tracing::debug!("read {} preferences from builder", count);
        }

        Self::assemble(config, platform, project_root.into(), paths, store)
    }

    /// Build a resolver from an already obtained preference set.
    pub fn with_preferences(
        config: Config,
        platform: HostPlatform,
        project_root: impl Into<PathBuf>,
        preferences: PreferenceStore,
    ) -> Self {
        let paths = ToolchainPaths::discover(&config, platform);
        Self::assemble(config, platform, project_root.into(), paths, preferences)
    }

    fn assemble(
        config: Config,
        platform: HostPlatform,
        project_root: PathBuf,
        paths: ToolchainPaths,
        dumped: PreferenceStore,
    ) -> Self {
        let mut store = PreferenceStore::new();
        if let Some(ide) = &paths.ide {
            store.set("runtime.ide.path", ide.display().to_string());
        }
        store.set("runtime.ide.version", IDE_VERSION);
        store.set(
            "upload.verbose",
            if config.build.verbose { "-verbose" } else { "" },
        );
        if let Some(port) = &config.upload.serial_port {
            store.set("serial.port", port.clone());
        }

        for key in dumped.sorted_keys() {
            if let Some(value) = dumped.get(key) {
                store.set(key, value);
            }
        }

        let mut resolver = RecipeResolver {
            config,
            platform,
            project_root,
            paths,
            store,
        };
        resolver.derive_platform_tools();
        resolver
    }

    /// Record the executables named by the platform's upload and size
    /// recipes.
    fn derive_platform_tools(&mut self) {
        let exp = Expander::new(&self.store, self.platform);
        let first_token = |key: &str| split_args(&exp.expand(key)).into_iter().next();

        let uploader = self
            .store
            .get("upload.tool")
            .and_then(|tool| first_token(&format!("tools.{}.upload.pattern", tool)));
        let sizer = first_token("recipe.size.pattern");

        if let Some(uploader) = uploader {
            self.store.set(UPLOADER_KEY, uploader);
        }
        if let Some(sizer) = sizer {
            self.store.set(SIZER_KEY, sizer);
        }
    }

    /// Replace the configuration and rebuild the store from scratch.
    pub fn reload(&mut self, config: Config) {
        *self = Self::load(config, self.platform, self.project_root.clone());
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn platform(&self) -> HostPlatform {
        self.platform
    }

    pub fn project_root(&self) -> &Path {
        &self.project_root
    }

    pub fn paths(&self) -> &ToolchainPaths {
        &self.paths
    }

    pub fn store(&self) -> &PreferenceStore {
        &self.store
    }

    pub fn verbose(&self) -> bool {
        self.config.build.verbose
    }

    /// Expander bound to a sketch's live keys.
    pub fn expander(&self, sketch: Option<&Sketch>) -> Expander<'_> {
        let exp = Expander::new(&self.store, self.platform);
        match sketch {
            Some(s) => exp
                .with_project_name(s.file_name())
                .with_build_path(s.build_dir().display().to_string()),
            None => exp,
        }
    }

    /// Expand a key without sketch context.
    pub fn expand(&self, key: &str) -> String {
        self.expander(None).expand(key)
    }

    /// The builder executable, or why it is unavailable.
    pub fn check_builder(&self) -> Result<&Path, ConfigError> {
        match (&self.paths.ide, &self.paths.builder) {
            (None, _) => Err(ConfigError::MissingIdePath),
            (Some(ide), None) => Err(ConfigError::BuilderNotFound {
                path: ide.join(format!("arduino-builder{}", self.platform.exe_suffix())),
            }),
            (Some(_), Some(builder)) => Ok(builder),
        }
    }

    /// The configured serial port.
    pub fn check_serial_port(&self) -> Result<&str, ConfigError> {
        self.config
            .upload
            .serial_port
            .as_deref()
            .filter(|p| !p.is_empty())
            .ok_or(ConfigError::MissingSerialPort)
    }
}
