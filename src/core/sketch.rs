//! The sketch being built and where its outputs go.

use std::path::{Path, PathBuf};

/// Directory under the project root holding per-sketch build trees.
pub const BUILD_DIR_NAME: &str = ".build";

/// Source file extensions the builder accepts as sketches.
const SKETCH_EXTENSIONS: &[&str] = &["ino", "pde"];

/// Identity and layout of one sketch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sketch {
    path: PathBuf,
    file_name: String,
    build_dir: PathBuf,
}

impl Sketch {
    /// Resolve the sketch for an active document.
    ///
    /// A configured sketch name replaces the document, relative to the
    /// project root.
    pub fn resolve(document: &Path, project_root: &Path, sketch_override: Option<&str>) -> Self {
        let path = match sketch_override {
            Some(name) => project_root.join(name),
            None => document.to_path_buf(),
        };
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let basename = file_name
            .strip_suffix(".ino")
            .unwrap_or(&file_name)
            .to_string();
        let build_dir = project_root.join(BUILD_DIR_NAME).join(basename);

        Sketch {
            path,
            file_name,
            build_dir,
        }
    }

    /// Absolute path of the sketch source.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// File name including extension (`blink.ino`).
    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    /// File name without the `.ino` extension.
    pub fn basename(&self) -> &str {
        self.file_name
            .strip_suffix(".ino")
            .unwrap_or(&self.file_name)
    }

    /// Intermediate build directory for this sketch.
    pub fn build_dir(&self) -> &Path {
        &self.build_dir
    }

    /// Firmware image the builder leaves in the build directory.
    pub fn artifact_path(&self) -> PathBuf {
        self.build_dir.join(format!("{}.hex", self.file_name))
    }

    /// Whether the file name carries a sketch extension.
    pub fn has_sketch_extension(&self) -> bool {
        Path::new(&self.file_name)
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| SKETCH_EXTENSIONS.contains(&e))
    }
}
