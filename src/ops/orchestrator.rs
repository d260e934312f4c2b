//! Build and upload orchestration.
//!
//! The [`Orchestrator`] owns the build/upload state machine. Every
//! operation takes `&self`, so a host may share one orchestrator between
//! threads; a request that arrives while a session is active is rejected
//! with [`OrchestratorError::Busy`] instead of queueing.
//!
//! Build results are returned, not broadcast: `build_and_upload` simply
//! looks at the [`BuildOutcome`] before deciding to flash.

use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock};
use std::time::{Duration, Instant};

use thiserror::Error;

use crate::builder::args::{ArgumentSynthesizer, UploadStrategy};
use crate::builder::classify::{classify_stderr, classify_stdout, progress_status, OutputRecord};
use crate::builder::events::{BuildEvent, LogSource, NoticeLevel};
use crate::core::diagnostics::{DiagnosticSet, Severity};
use crate::core::sketch::Sketch;
use crate::ops::host::{Reporter, SourceDocument};
use crate::ops::session::{SessionGuard, SessionKind, Sessions};
use crate::resolver::{ConfigError, RecipeResolver};
use crate::util::config::Config;
use crate::util::fs::{ensure_dir, is_stale, remove_dir_all_if_exists};
use crate::util::process::OutputStream;

/// Banner logged before the builder starts.
pub const COMPILE_BANNER: &str = "============== Begin to compile. ==============";

/// Banner logged before the uploader starts.
pub const UPLOAD_BANNER: &str = "============== Begin to upload. ==============";

/// Prefix of the live progress indicator.
pub const PROGRESS_PREFIX: &str = "Compiling ";

/// Error that ends an orchestrator operation.
///
/// None of these leave a session behind; the next request starts from idle.
#[derive(Debug, Error)]
pub enum OrchestratorError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("a {active} is already in progress")]
    Busy { active: SessionKind },

    #[error("failed to run `{}`", program.display())]
    Spawn {
        program: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl From<SessionKind> for OrchestratorError {
    fn from(active: SessionKind) -> Self {
        OrchestratorError::Busy { active }
    }
}

fn spawn_error(program: &Path, err: anyhow::Error) -> OrchestratorError {
    match err.downcast::<io::Error>() {
        Ok(source) => OrchestratorError::Spawn {
            program: program.to_path_buf(),
            source,
        },
        Err(other) => OrchestratorError::Other(other),
    }
}

/// Result of a finished builder run.
#[derive(Debug, Clone, PartialEq)]
pub struct BuildOutcome {
    /// `None` when the builder was killed by a signal
    pub exit_code: Option<i32>,
    pub diagnostics: DiagnosticSet,
    pub duration: Duration,
}

impl BuildOutcome {
    pub fn success(&self) -> bool {
        self.exit_code == Some(0)
    }
}

/// Result of an upload request.
#[derive(Debug, Clone, PartialEq)]
pub enum UploadOutcome {
    /// The uploader ran and exited
    Finished { exit_code: Option<i32> },
    /// The preceding build failed; nothing was flashed
    BuildFailed(BuildOutcome),
}

impl UploadOutcome {
    pub fn success(&self) -> bool {
        matches!(self, UploadOutcome::Finished { exit_code: Some(0) })
    }
}

/// Result of a clean request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CleanOutcome {
    Removed(PathBuf),
    NothingToClean(PathBuf),
}

fn lock<T: ?Sized>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Drives the external builder and uploader for one project.
pub struct Orchestrator<R: Reporter> {
    reporter: R,
    resolver: RwLock<Arc<RecipeResolver>>,
    document: Mutex<Box<dyn SourceDocument>>,
    sessions: Sessions,
    diagnostics: Mutex<DiagnosticSet>,
}

impl<R: Reporter> Orchestrator<R> {
    pub fn new(
        resolver: RecipeResolver,
        document: impl SourceDocument + 'static,
        reporter: R,
    ) -> Self {
        Orchestrator {
            reporter,
            resolver: RwLock::new(Arc::new(resolver)),
            document: Mutex::new(Box::new(document)),
            sessions: Sessions::new(),
            diagnostics: Mutex::new(DiagnosticSet::new()),
        }
    }

    pub fn reporter(&self) -> &R {
        &self.reporter
    }

    /// Snapshot of the current resolver.
    pub fn resolver(&self) -> Arc<RecipeResolver> {
        let guard = self.resolver.read().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(&guard)
    }

    /// Diagnostics of the most recent build.
    pub fn diagnostics(&self) -> DiagnosticSet {
        lock(&self.diagnostics).clone()
    }

    pub fn is_building(&self) -> bool {
        self.sessions.is_building()
    }

    pub fn is_uploading(&self) -> bool {
        self.sessions.is_uploading()
    }

    /// Switch to another source document.
    pub fn set_document(&self, document: impl SourceDocument + 'static) {
        *lock(&self.document) = Box::new(document);
    }

    /// Rebuild the preference store from a new configuration.
    ///
    /// Running sessions keep the snapshot they started with.
    pub fn reload(&self, config: Config) {
        let current = self.resolver();
        let fresh = RecipeResolver::load(config, current.platform(), current.project_root());
        tracing::info!("reloaded {} preferences", fresh.store().len());
        *self.resolver.write().unwrap_or_else(PoisonError::into_inner) = Arc::new(fresh);
    }

    /// Validate settings, reload preferences and report a summary.
    pub fn initialize(&self) -> Result<(), OrchestratorError> {
        let current = self.resolver();
        let problems: Vec<ConfigError> = [
            current.check_builder().err(),
            current.check_serial_port().err(),
        ]
        .into_iter()
        .flatten()
        .collect();

        if let Some(first) = problems.first() {
            let listed: Vec<String> = problems.iter().map(ToString::to_string).collect();
            self.reporter.report(BuildEvent::notice(
                NoticeLevel::Error,
                format!("Please fix the settings before building: {}", listed.join("; ")),
            ));
            return Err(first.clone().into());
        }

        self.reload(current.config().clone());
        let resolver = self.resolver();
        self.reporter.report(BuildEvent::notice(
            NoticeLevel::Info,
            format!(
                "Board {} on {}, {} preferences loaded",
                resolver.config().fqbn(),
                resolver.check_serial_port().unwrap_or_default(),
                resolver.store().len()
            ),
        ));
        Ok(())
    }

    /// Compile the active sketch.
    pub fn build(&self) -> Result<BuildOutcome, OrchestratorError> {
        let _build = self.sessions.begin(SessionKind::Build)?;
        self.run_build(&self.resolver())
    }

    /// Remove the build directory quietly, then compile.
    pub fn rebuild(&self) -> Result<BuildOutcome, OrchestratorError> {
        let _build = self.sessions.begin(SessionKind::Build)?;
        let resolver = self.resolver();
        self.remove_build_dir(&resolver)?;
        self.run_build(&resolver)
    }

    /// Flash the compiled sketch, compiling first when the artifact is stale.
    pub fn upload(&self) -> Result<UploadOutcome, OrchestratorError> {
        let resolver = self.resolver();
        let sketch = self.sketch(&resolver);

        if self.needs_build(&sketch) {
            let build = self.sessions.begin(SessionKind::Build)?;
            tracing::info!("`{}` is out of date, building first", sketch.artifact_path().display());
            self.check_upload_settings(&resolver, &sketch)?;
            return self.build_then_upload(&resolver, build);
        }

        let _upload = self.sessions.begin(SessionKind::Upload)?;
        self.check_upload_settings(&resolver, &sketch)?;
        self.run_upload(&resolver, &sketch)
    }

    /// Compile, then flash if the compile succeeded.
    pub fn build_and_upload(&self) -> Result<UploadOutcome, OrchestratorError> {
        let build = self.sessions.begin(SessionKind::Build)?;
        let resolver = self.resolver();
        self.check_upload_settings(&resolver, &self.sketch(&resolver))?;
        self.build_then_upload(&resolver, build)
    }

    /// Clean, compile, then flash if the compile succeeded.
    pub fn rebuild_and_upload(&self) -> Result<UploadOutcome, OrchestratorError> {
        let build = self.sessions.begin(SessionKind::Build)?;
        let resolver = self.resolver();
        self.check_upload_settings(&resolver, &self.sketch(&resolver))?;
        self.remove_build_dir(&resolver)?;
        self.build_then_upload(&resolver, build)
    }

    /// Delete the active sketch's build directory.
    ///
    /// Occupies the build slot while it runs.
    pub fn clean(&self) -> Result<CleanOutcome, OrchestratorError> {
        let _build = self.sessions.begin(SessionKind::Build)?;
        let resolver = self.resolver();
        let outcome = self.remove_build_dir(&resolver)?;

        let (path, removed, message) = match &outcome {
            CleanOutcome::Removed(path) => (path, true, "Cleaned"),
            CleanOutcome::NothingToClean(path) => (path, false, "Nothing to clean in"),
        };
        self.reporter.report(BuildEvent::internal(format!(
            "{} {}",
            message,
            path.display()
        )));
        self.reporter.report(BuildEvent::Clean {
            path: path.clone(),
            removed,
        });
        Ok(outcome)
    }

    fn sketch(&self, resolver: &RecipeResolver) -> Sketch {
        let document = lock(&self.document);
        Sketch::resolve(
            document.path(),
            resolver.project_root(),
            resolver.config().build.sketch.as_deref(),
        )
    }

    fn needs_build(&self, sketch: &Sketch) -> bool {
        lock(&self.document).is_dirty() || is_stale(sketch.path(), &sketch.artifact_path())
    }

    fn check_upload_settings(
        &self,
        resolver: &RecipeResolver,
        sketch: &Sketch,
    ) -> Result<(), ConfigError> {
        resolver.check_serial_port()?;
        let strategy = ArgumentSynthesizer::new(resolver, sketch).upload_strategy();
        if strategy == UploadStrategy::Avrdude && resolver.paths().ide.is_none() {
            return Err(ConfigError::MissingIdePath);
        }
        Ok(())
    }

    fn remove_build_dir(&self, resolver: &RecipeResolver) -> Result<CleanOutcome, OrchestratorError> {
        let dir = self.sketch(resolver).build_dir().to_path_buf();
        if remove_dir_all_if_exists(&dir)? {
            tracing::info!("removed {}", dir.display());
            Ok(CleanOutcome::Removed(dir))
        } else {
            Ok(CleanOutcome::NothingToClean(dir))
        }
    }

    /// Save the document if it has unsaved edits or no name yet.
    fn persist_document(&self) {
        let mut document = lock(&self.document);
        if document.is_untitled() {
            self.reporter.report(BuildEvent::notice(
                NoticeLevel::Error,
                "Please save the sketch before building",
            ));
        }
        if document.is_untitled() || document.is_dirty() {
            if let Err(e) = document.save() {
                self.reporter.report(BuildEvent::notice(
                    NoticeLevel::Warning,
                    format!("could not save `{}`: {:#}", document.path().display(), e),
                ));
            }
        }
    }

    fn build_then_upload(
        &self,
        resolver: &RecipeResolver,
        build: SessionGuard<'_>,
    ) -> Result<UploadOutcome, OrchestratorError> {
        let outcome = self.run_build(resolver)?;
        if !outcome.success() {
            self.reporter.report(BuildEvent::notice(
                NoticeLevel::Error,
                "Build failed, upload cancelled",
            ));
            return Ok(UploadOutcome::BuildFailed(outcome));
        }

        let _upload = build.chain(SessionKind::Upload);
        drop(build);
        let sketch = self.sketch(resolver);
        self.run_upload(resolver, &sketch)
    }

    fn run_build(&self, resolver: &RecipeResolver) -> Result<BuildOutcome, OrchestratorError> {
        resolver.check_builder()?;
        self.persist_document();

        let sketch = self.sketch(resolver);
        if !sketch.has_sketch_extension() {
            self.reporter.report(BuildEvent::notice(
                NoticeLevel::Warning,
                format!(
                    "`{}` is not a sketch; expected a .ino or .pde file",
                    sketch.file_name()
                ),
            ));
        }

        lock(&self.diagnostics).clear();
        ensure_dir(sketch.build_dir())?;

        let command = ArgumentSynthesizer::new(resolver, &sketch).compile_command();
        self.reporter.report(BuildEvent::LogCleared);
        self.reporter.report(BuildEvent::internal(COMPILE_BANNER));
        self.reporter.report(BuildEvent::BuildStarted {
            sketch: sketch.path().to_path_buf(),
            fqbn: resolver.config().fqbn().to_string(),
            build_dir: sketch.build_dir().to_path_buf(),
        });
        if resolver.verbose() {
            self.reporter.report(BuildEvent::internal(command.to_string()));
        }
        tracing::info!("compiling {}", sketch.path().display());
        tracing::debug!("running {}", command);

        let started = Instant::now();
        let mut diagnostics = DiagnosticSet::new();
        let status = command
            .to_process(resolver.project_root())
            .stream(|stream, line| self.handle_build_line(stream, line, &mut diagnostics));
        let duration = started.elapsed();

        let status = match status {
            Ok(status) => status,
            Err(e) => {
                *lock(&self.diagnostics) = diagnostics;
                self.reporter.report(BuildEvent::finished(
                    false,
                    None,
                    duration.as_millis() as u64,
                ));
                self.reporter.report(BuildEvent::LogRevealed);
                return Err(spawn_error(&command.program, e));
            }
        };

        let outcome = BuildOutcome {
            exit_code: status.code(),
            diagnostics,
            duration,
        };
        tracing::info!("builder exited with {:?}", outcome.exit_code);

        *lock(&self.diagnostics) = outcome.diagnostics.clone();
        self.reporter.report(BuildEvent::DiagnosticsPublished {
            diagnostics: outcome.diagnostics.clone(),
        });
        self.reporter.report(BuildEvent::BuildFinished {
            success: outcome.success(),
            exit_code: outcome.exit_code,
            duration_ms: duration.as_millis() as u64,
            errors: outcome.diagnostics.count(Severity::Error),
            warnings: outcome.diagnostics.count(Severity::Warning),
        });
        if !outcome.success() {
            self.reporter.report(BuildEvent::LogRevealed);
        }
        Ok(outcome)
    }

    fn handle_build_line(&self, stream: OutputStream, line: &str, diagnostics: &mut DiagnosticSet) {
        let record = match stream {
            OutputStream::Stdout => classify_stdout(line),
            OutputStream::Stderr => classify_stderr(line),
        };
        match record {
            OutputRecord::Progress { percent } => {
                self.reporter.report(BuildEvent::Progress {
                    status: progress_status(PROGRESS_PREFIX, &percent),
                    percent,
                });
            }
            OutputRecord::Memory(usage) => {
                self.reporter.report(BuildEvent::MemoryUsage {
                    summary: usage.to_string(),
                    usage,
                });
            }
            OutputRecord::Diagnostic(diagnostic) => {
                diagnostics.push(diagnostic.clone());
                self.reporter
                    .report(BuildEvent::CompilerDiagnostic { diagnostic });
            }
            OutputRecord::Text(text) => {
                self.reporter.report(BuildEvent::log(log_source(stream), text));
            }
        }
    }

    fn run_upload(
        &self,
        resolver: &RecipeResolver,
        sketch: &Sketch,
    ) -> Result<UploadOutcome, OrchestratorError> {
        let command = ArgumentSynthesizer::new(resolver, sketch).upload_command();

        self.reporter.report(BuildEvent::internal(UPLOAD_BANNER));
        self.reporter.report(BuildEvent::UploadStarted {
            program: command.program.clone(),
            port: resolver.config().upload.serial_port.clone(),
        });
        if resolver.verbose() {
            self.reporter.report(BuildEvent::internal(command.to_string()));
        }
        tracing::info!("uploading {}", sketch.artifact_path().display());
        tracing::debug!("running {}", command);

        let status = command
            .to_process(resolver.project_root())
            .stream(|stream, line| {
                self.reporter.report(BuildEvent::log(log_source(stream), line));
            });

        let (exit_code, result) = match status {
            Ok(status) => (status.code(), Ok(UploadOutcome::Finished { exit_code: status.code() })),
            Err(e) => (None, Err(spawn_error(&command.program, e))),
        };
        let success = exit_code == Some(0);
        tracing::info!("uploader exited with {:?}", exit_code);

        self.reporter.report(BuildEvent::UploadFinished { success, exit_code });
        self.reporter.report(BuildEvent::internal(if success {
            "Upload success."
        } else {
            "Upload failed."
        }));
        if !success {
            self.reporter.report(BuildEvent::LogRevealed);
        }
        result
    }
}

fn log_source(stream: OutputStream) -> LogSource {
    match stream {
        OutputStream::Stdout => LogSource::Stdout,
        OutputStream::Stderr => LogSource::Stderr,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::platform::HostPlatform;
    use crate::core::prefs::PreferenceStore;
    use crate::ops::host::FileDocument;
    use crate::test_support::RecordingReporter;
    use tempfile::TempDir;

    fn orchestrator(tmp: &TempDir, config: Config) -> Orchestrator<RecordingReporter> {
        let root = tmp.path().join("blink");
        std::fs::create_dir_all(&root).unwrap();
        std::fs::write(root.join("blink.ino"), "void setup() {}\nvoid loop() {}\n").unwrap();
        let resolver =
            RecipeResolver::with_preferences(config, HostPlatform::Linux, &root, PreferenceStore::new());
        Orchestrator::new(resolver, FileDocument::new(root.join("blink.ino")), RecordingReporter::new())
    }

    #[test]
    fn test_clean_nothing_to_clean() {
        let tmp = TempDir::new().unwrap();
        let orch = orchestrator(&tmp, Config::default());
        let build_dir = tmp.path().join("blink").join(".build").join("blink");

        assert_eq!(orch.clean().unwrap(), CleanOutcome::NothingToClean(build_dir.clone()));
        assert!(!tmp.path().join("blink").join(".build").exists());
        assert!(orch.reporter().events().contains(&BuildEvent::Clean {
            path: build_dir,
            removed: false
        }));
    }

    #[test]
    fn test_clean_removes_tree() {
        let tmp = TempDir::new().unwrap();
        let orch = orchestrator(&tmp, Config::default());
        let build_dir = tmp.path().join("blink").join(".build").join("blink");
        std::fs::create_dir_all(build_dir.join("core")).unwrap();
        std::fs::write(build_dir.join("core").join("core.a"), "obj").unwrap();

        assert_eq!(orch.clean().unwrap(), CleanOutcome::Removed(build_dir.clone()));
        assert!(!build_dir.exists());
        assert_eq!(orch.clean().unwrap(), CleanOutcome::NothingToClean(build_dir));
    }

    #[test]
    fn test_build_without_ide_is_config_error() {
        let tmp = TempDir::new().unwrap();
        let mut config = Config::default();
        config.toolchain.ide_path = Some(tmp.path().join("missing-ide"));
        let orch = orchestrator(&tmp, config);

        let err = orch.build().unwrap_err();
        assert!(matches!(err, OrchestratorError::Config(ConfigError::MissingIdePath)));
        assert!(!orch.is_building());
    }

    #[test]
    fn test_upload_without_port_is_config_error() {
        let tmp = TempDir::new().unwrap();
        let orch = orchestrator(&tmp, Config::default());

        let err = orch.build_and_upload().unwrap_err();
        assert!(matches!(err, OrchestratorError::Config(ConfigError::MissingSerialPort)));
        assert!(!orch.is_building() && !orch.is_uploading());
    }

    #[test]
    fn test_initialize_lists_problems() {
        let tmp = TempDir::new().unwrap();
        let mut config = Config::default();
        config.toolchain.ide_path = Some(tmp.path().join("missing-ide"));
        let orch = orchestrator(&tmp, config);

        assert!(orch.initialize().is_err());
        let notice = orch
            .reporter()
            .notices(NoticeLevel::Error)
            .pop()
            .unwrap();
        assert!(notice.contains("no Arduino IDE installation configured"));
        assert!(notice.contains("no serial port configured"));
    }

    #[test]
    fn test_upload_outcome_success() {
        assert!(UploadOutcome::Finished { exit_code: Some(0) }.success());
        assert!(!UploadOutcome::Finished { exit_code: Some(1) }.success());
        assert!(!UploadOutcome::Finished { exit_code: None }.success());
    }

    #[cfg(unix)]
    mod scripted {
        use super::*;
        use crate::test_support::{write_script, MemoryDocument};
        use std::thread;

        const BUILDER: &str = r#"
while [ $# -gt 0 ]; do
  case "$1" in -build-path) out="$2";; esac
  last="$1"; shift
done
dir="$(dirname "$0")"
if [ -f "$dir/hold" ]; then
  while [ ! -f "$dir/release" ]; do sleep 0.02; done
fi
echo '===info ||| Progress {0} ||| [50]'
echo "$last:3:5: warning: unused variable 'x'" >&2
echo '===info ||| Sketch uses {0} bytes ||| [924 32256 2]'
if [ -f "$dir/fail" ]; then
  echo "$last:10:3: error: undeclared identifier" >&2
  exit 1
fi
: > "$out/$(basename "$last").hex"
"#;

        const UPLOADER: &str = r#"
echo "flashing $1"
echo "$1" >> "$(dirname "$0")/uploads.log"
"#;

        struct Rig {
            tmp: TempDir,
            ide: PathBuf,
        }

        impl Rig {
            fn new(builder: &str) -> Self {
                let tmp = TempDir::new().unwrap();
                let ide = tmp.path().join("ide");
                std::fs::create_dir_all(&ide).unwrap();
                write_script(&ide, "arduino-builder", builder);
                write_script(&ide, "uploader", UPLOADER);
                Rig { tmp, ide }
            }

            fn config(&self) -> Config {
                let mut config = Config::default();
                config.toolchain.ide_path = Some(self.ide.clone());
                config.upload.serial_port = Some("/dev/ttyACM0".to_string());
                config.upload.uploader = Some(self.ide.join("uploader"));
                config.upload.options = vec!["$TARGET".to_string()];
                config
            }

            fn orchestrator(&self) -> Orchestrator<RecordingReporter> {
                orchestrator(&self.tmp, self.config())
            }

            fn uploads(&self) -> Vec<String> {
                std::fs::read_to_string(self.ide.join("uploads.log"))
                    .map(|s| s.lines().map(str::to_string).collect())
                    .unwrap_or_default()
            }

            fn fail_builds(&self) {
                std::fs::write(self.ide.join("fail"), "").unwrap();
            }
        }

        #[test]
        fn test_build_classifies_output() {
            let rig = Rig::new(BUILDER);
            let orch = rig.orchestrator();

            let outcome = orch.build().unwrap();
            assert!(outcome.success());
            assert_eq!(outcome.diagnostics.count(Severity::Warning), 1);

            let events = orch.reporter().events();
            assert!(events.contains(&BuildEvent::internal(COMPILE_BANNER)));
            assert!(events.contains(&BuildEvent::Progress {
                status: "Compiling 50%".to_string(),
                percent: "50".to_string()
            }));
            assert!(events.iter().any(|e| matches!(
                e,
                BuildEvent::MemoryUsage { summary, .. } if summary.starts_with("Sketch uses 924 bytes")
            )));
            assert!(events.iter().any(|e| matches!(
                e,
                BuildEvent::BuildFinished { success: true, warnings: 1, errors: 0, .. }
            )));

            let sketch_path = rig.tmp.path().join("blink").join("blink.ino");
            let recorded = orch.diagnostics();
            let for_sketch = recorded.for_file(&sketch_path.display().to_string());
            assert_eq!(for_sketch.len(), 1);
            assert_eq!(for_sketch[0].line, 2);
            assert_eq!(for_sketch[0].column, 5);
            assert!(!orch.is_building());
        }

        #[test]
        fn test_output_is_classified_per_pipe() {
            let builder = r#"
while [ $# -gt 0 ]; do
  case "$1" in -build-path) out="$2";; esac
  last="$1"; shift
done
echo "$last:5:1: error: printed on stdout"
echo '===info ||| Sketch uses {0} bytes ||| [924 32256 2]' >&2
: > "$out/$(basename "$last").hex"
"#;
            let rig = Rig::new(builder);
            let orch = rig.orchestrator();

            let outcome = orch.build().unwrap();
            assert!(outcome.success());
            assert!(outcome.diagnostics.is_empty());

            let events = orch.reporter().events();
            assert!(!events
                .iter()
                .any(|e| matches!(e, BuildEvent::MemoryUsage { .. } | BuildEvent::CompilerDiagnostic { .. })));
            assert!(events.iter().any(|e| matches!(
                e,
                BuildEvent::Log { source: LogSource::Stdout, line } if line.ends_with("error: printed on stdout")
            )));
            assert!(events.iter().any(|e| matches!(
                e,
                BuildEvent::Log { source: LogSource::Stderr, line } if line.starts_with("===info ||| Sketch uses")
            )));
        }

        #[test]
        fn test_failed_build_never_uploads() {
            let rig = Rig::new(BUILDER);
            rig.fail_builds();
            let orch = rig.orchestrator();

            let outcome = orch.build_and_upload().unwrap();
            let UploadOutcome::BuildFailed(build) = outcome else {
                panic!("expected the build to fail");
            };
            assert_eq!(build.exit_code, Some(1));
            assert_eq!(build.diagnostics.count(Severity::Error), 1);
            assert!(rig.uploads().is_empty());
            assert!(orch.reporter().events().contains(&BuildEvent::LogRevealed));
            assert!(!orch.is_building() && !orch.is_uploading());
        }

        #[test]
        fn test_build_and_upload_flashes_artifact() {
            let rig = Rig::new(BUILDER);
            let orch = rig.orchestrator();

            let outcome = orch.build_and_upload().unwrap();
            assert!(outcome.success());

            let artifact = rig
                .tmp
                .path()
                .join("blink/.build/blink/blink.ino.hex");
            assert!(artifact.exists());
            assert_eq!(rig.uploads(), vec![artifact.display().to_string()]);

            let lines = orch.reporter().log_lines();
            assert!(lines.contains(&UPLOAD_BANNER.to_string()));
            assert!(lines.contains(&format!("flashing {}", artifact.display())));
            assert!(lines.contains(&"Upload success.".to_string()));
        }

        #[test]
        fn test_upload_builds_stale_artifact_first() {
            let rig = Rig::new(BUILDER);
            let orch = rig.orchestrator();

            assert!(orch.upload().unwrap().success());
            assert_eq!(rig.uploads().len(), 1);
            let built = orch
                .reporter()
                .events()
                .iter()
                .filter(|e| matches!(e, BuildEvent::BuildStarted { .. }))
                .count();
            assert_eq!(built, 1);

            // fresh artifact: flash without compiling again
            assert!(orch.upload().unwrap().success());
            assert_eq!(rig.uploads().len(), 2);
            let built = orch
                .reporter()
                .events()
                .iter()
                .filter(|e| matches!(e, BuildEvent::BuildStarted { .. }))
                .count();
            assert_eq!(built, 1);
        }

        #[test]
        fn test_requests_rejected_while_building() {
            let rig = Rig::new(BUILDER);
            std::fs::write(rig.ide.join("hold"), "").unwrap();
            let orch = rig.orchestrator();

            thread::scope(|scope| {
                let running = scope.spawn(|| orch.build());

                let deadline = Instant::now() + Duration::from_secs(10);
                while !orch.is_building() {
                    assert!(Instant::now() < deadline, "build never started");
                    thread::sleep(Duration::from_millis(5));
                }

                assert!(matches!(
                    orch.upload(),
                    Err(OrchestratorError::Busy { active: SessionKind::Build })
                ));
                assert!(matches!(
                    orch.build(),
                    Err(OrchestratorError::Busy { active: SessionKind::Build })
                ));
                assert!(matches!(orch.clean(), Err(OrchestratorError::Busy { .. })));
                assert!(!orch.is_uploading());

                std::fs::write(rig.ide.join("release"), "").unwrap();
                assert!(running.join().unwrap().unwrap().success());
            });

            assert!(rig.uploads().is_empty());
            assert!(!orch.is_building());
        }

        #[test]
        fn test_spawn_failure_returns_to_idle() {
            let rig = Rig::new(BUILDER);
            let builder = rig.ide.join("arduino-builder");
            std::fs::write(&builder, "not executable").unwrap();
            {
                use std::os::unix::fs::PermissionsExt;
                std::fs::set_permissions(&builder, std::fs::Permissions::from_mode(0o644)).unwrap();
            }
            let orch = rig.orchestrator();

            let err = orch.build().unwrap_err();
            assert!(matches!(err, OrchestratorError::Spawn { .. }));
            assert!(!orch.is_building());
            assert!(orch.reporter().events().iter().any(|e| matches!(
                e,
                BuildEvent::BuildFinished { success: false, exit_code: None, .. }
            )));
        }

        #[test]
        fn test_rebuild_and_upload_cleans_first() {
            let rig = Rig::new(BUILDER);
            let orch = rig.orchestrator();
            let stale = rig.tmp.path().join("blink/.build/blink/stale.o");
            std::fs::create_dir_all(stale.parent().unwrap()).unwrap();
            std::fs::write(&stale, "old").unwrap();

            assert!(orch.rebuild_and_upload().unwrap().success());
            assert!(!stale.exists());
            assert_eq!(rig.uploads().len(), 1);
        }

        #[test]
        fn test_dirty_document_is_saved_and_rebuilt() {
            let rig = Rig::new(BUILDER);
            let orch = rig.orchestrator();
            assert!(orch.build().unwrap().success());

            let path = rig.tmp.path().join("blink").join("blink.ino");
            let doc = MemoryDocument::dirty(&path, "void setup() { }\nvoid loop() { }\n");
            let saves = doc.save_counter();
            orch.set_document(doc);

            assert!(orch.upload().unwrap().success());
            assert_eq!(saves.load(std::sync::atomic::Ordering::SeqCst), 1);
            assert_eq!(
                std::fs::read_to_string(&path).unwrap(),
                "void setup() { }\nvoid loop() { }\n"
            );
        }

        #[test]
        fn test_untitled_document_is_reported() {
            let rig = Rig::new(BUILDER);
            let orch = rig.orchestrator();
            let doc = MemoryDocument::untitled(rig.tmp.path().join("blink").join("blink.ino"), "void setup() {}\n");
            orch.set_document(doc);

            assert!(orch.build().unwrap().success());
            assert!(orch
                .reporter()
                .notices(NoticeLevel::Error)
                .iter()
                .any(|n| n.contains("save the sketch")));
        }
    }
}
