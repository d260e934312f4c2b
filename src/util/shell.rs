//! Centralized shell output and progress management.
//!
//! The Shell is the terminal host's [`Reporter`]: it renders
//! [`BuildEvent`]s as status lines, a live spinner for compile progress,
//! and compiler diagnostics, or as one JSON object per line.
//!
//! # Design Principles
//!
//! 1. **Commands never manage spacing/indentation directly** - Shell handles all formatting
//! 2. **JSON mode is mutually exclusive** - No human output when JSON mode is enabled
//! 3. **Log lines never tear the spinner** - they are printed with the spinner suspended

use std::fmt::{self, Display};
use std::io::{self, IsTerminal, Write};
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};

use crate::builder::events::{BuildEvent, LogSource, NoticeLevel};
use crate::core::diagnostics::Severity;
use crate::ops::host::Reporter;

/// Shell output mode - Human and Json are mutually exclusive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShellMode {
    /// Human-readable output with optional colors and a spinner.
    Human {
        verbosity: Verbosity,
        color: ColorChoice,
    },
    /// Machine-readable JSON output only.
    Json,
}

impl Default for ShellMode {
    fn default() -> Self {
        ShellMode::Human {
            verbosity: Verbosity::Normal,
            color: ColorChoice::Auto,
        }
    }
}

/// Output verbosity level (Human mode only).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Verbosity {
    /// --quiet: errors only, no tool output
    Quiet,
    /// Default: status messages, tool output and spinner
    #[default]
    Normal,
    /// --verbose: no spinner, every progress update on its own line
    Verbose,
}

/// Color output mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ColorChoice {
    /// Detect TTY and use colors if available.
    #[default]
    Auto,
    /// Always use ANSI colors.
    Always,
    /// Never use ANSI colors.
    Never,
}

impl std::str::FromStr for ColorChoice {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "auto" => Ok(ColorChoice::Auto),
            "always" => Ok(ColorChoice::Always),
            "never" => Ok(ColorChoice::Never),
            _ => Err(format!(
                "invalid color choice '{}'; expected 'auto', 'always', or 'never'",
                s
            )),
        }
    }
}

/// Status types for output messages.
///
/// Shell handles all formatting - callers just specify the semantic status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    // Success statuses (green)
    Finished,
    Removed,
    Uploaded,

    // In-progress statuses (cyan)
    Compiling,
    Uploading,

    // Info statuses (blue/default)
    Info,

    // Warning statuses (yellow)
    Warning,

    // Error status (red)
    Error,
}

impl Status {
    /// Get the display text for this status.
    fn as_str(&self) -> &'static str {
        match self {
            Status::Finished => "Finished",
            Status::Removed => "Removed",
            Status::Uploaded => "Uploaded",
            Status::Compiling => "Compiling",
            Status::Uploading => "Uploading",
            Status::Info => "Info",
            Status::Warning => "Warning",
            Status::Error => "error",
        }
    }

    /// Get the ANSI color code for this status.
    fn color_code(&self) -> &'static str {
        match self {
            Status::Finished | Status::Removed | Status::Uploaded => "\x1b[1;32m",
            Status::Compiling | Status::Uploading => "\x1b[1;36m",
            Status::Info => "\x1b[1;34m",
            Status::Warning => "\x1b[1;33m",
            Status::Error => "\x1b[1;31m",
        }
    }

    /// Get the width for alignment (12 characters).
    fn width(&self) -> usize {
        12
    }
}

/// Central shell for all CLI output.
pub struct Shell {
    mode: ShellMode,
    use_color: bool,
    /// Live compile progress indicator
    spinner: Mutex<Option<ProgressBar>>,
}

impl Shell {
    /// Create a new shell with the given mode.
    pub fn new(mode: ShellMode) -> Self {
        let use_color = match &mode {
            ShellMode::Json => false,
            ShellMode::Human { color, .. } => match color {
                ColorChoice::Auto => io::stderr().is_terminal(),
                ColorChoice::Always => true,
                ColorChoice::Never => false,
            },
        };

        Shell {
            mode,
            use_color,
            spinner: Mutex::new(None),
        }
    }

    /// Create a shell from CLI flags with proper precedence.
    ///
    /// JSON mode takes precedence over quiet/verbose.
    pub fn from_flags(
        quiet: bool,
        verbose: bool,
        color: ColorChoice,
        message_format_json: bool,
    ) -> Self {
        let mode = if message_format_json {
            ShellMode::Json
        } else {
            let verbosity = if quiet {
                Verbosity::Quiet
            } else if verbose {
                Verbosity::Verbose
            } else {
                Verbosity::Normal
            };
            ShellMode::Human { verbosity, color }
        };

        Shell::new(mode)
    }

    /// Check if shell is in quiet mode.
    pub fn is_quiet(&self) -> bool {
        matches!(
            self.mode,
            ShellMode::Human {
                verbosity: Verbosity::Quiet,
                ..
            }
        )
    }

    /// Check if shell is in verbose mode.
    pub fn is_verbose(&self) -> bool {
        matches!(
            self.mode,
            ShellMode::Human {
                verbosity: Verbosity::Verbose,
                ..
            }
        )
    }

    /// Check if shell is in JSON mode.
    pub fn is_json(&self) -> bool {
        matches!(self.mode, ShellMode::Json)
    }

    /// Print a status message.
    ///
    /// Format: `{status:>12} {message}`
    ///
    /// In quiet mode, only Error status is printed.
    /// In JSON mode, messages are silently ignored (use json_event for JSON output).
    pub fn status(&self, status: Status, msg: impl Display) {
        if self.is_json() {
            return;
        }

        if self.is_quiet() && status != Status::Error {
            return;
        }

        let prefix = self.format_status(status);
        self.print_line(&format!("{} {}", prefix, msg));
    }

    /// Print an info message.
    pub fn note(&self, msg: impl Display) {
        self.status(Status::Info, msg);
    }

    /// Print a warning message.
    pub fn warn(&self, msg: impl Display) {
        self.status(Status::Warning, msg);
    }

    /// Print an error message.
    ///
    /// In JSON mode, this outputs a JSON error event.
    pub fn error(&self, msg: impl Display) {
        if self.is_json() {
            self.json_event(&BuildEvent::notice(NoticeLevel::Error, msg.to_string()));
        } else {
            self.status(Status::Error, msg);
        }
    }

    /// Print a JSON event to stdout.
    ///
    /// Only works in JSON mode; silently ignored in human mode.
    pub fn json_event(&self, event: &BuildEvent) {
        if !self.is_json() {
            return;
        }

        println!("{}", event.to_json());
        let _ = io::stdout().flush();
    }

    /// Print one line to stderr without tearing the spinner.
    fn print_line(&self, line: &str) {
        let spinner = self.spinner.lock().unwrap_or_else(PoisonError::into_inner);
        match spinner.as_ref() {
            Some(pb) => pb.suspend(|| eprintln!("{}", line)),
            None => eprintln!("{}", line),
        }
    }

    /// Format a status prefix with optional color.
    fn format_status(&self, status: Status) -> String {
        let text = status.as_str();
        let width = status.width();

        if self.use_color {
            let color = status.color_code();
            format!("{}{:>width$}\x1b[0m", color, text, width = width)
        } else {
            format!("{:>width$}", text, width = width)
        }
    }

    fn start_spinner(&self) {
        if self.is_quiet() || self.is_verbose() || !io::stderr().is_terminal() {
            return;
        }
        let pb = ProgressBar::new_spinner();
        pb.set_style(
            ProgressStyle::default_spinner()
                .template("{spinner:.green} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner()),
        );
        pb.enable_steady_tick(Duration::from_millis(100));
        *self.spinner.lock().unwrap_or_else(PoisonError::into_inner) = Some(pb);
    }

    fn set_progress(&self, status: &str) {
        let spinner = self.spinner.lock().unwrap_or_else(PoisonError::into_inner);
        match spinner.as_ref() {
            Some(pb) => pb.set_message(status.to_string()),
            None if self.is_verbose() => eprintln!("  {}", status),
            None => {}
        }
    }

    fn finish_spinner(&self) {
        if let Some(pb) = self
            .spinner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
        {
            pb.finish_and_clear();
        }
    }

    fn render(&self, event: BuildEvent) {
        match event {
            BuildEvent::Log { source, line } => {
                if self.is_quiet() {
                    return;
                }
                match source {
                    // Banners and command echo; status lines cover them otherwise
                    LogSource::Internal if !self.is_verbose() => {}
                    LogSource::Internal if self.use_color => {
                        self.print_line(&format!("\x1b[1m{}\x1b[0m", line))
                    }
                    _ => self.print_line(&line),
                }
            }
            BuildEvent::LogCleared | BuildEvent::LogRevealed => {}
            BuildEvent::BuildStarted { sketch, fqbn, .. } => {
                self.status(Status::Compiling, format!("{} ({})", sketch.display(), fqbn));
                self.start_spinner();
            }
            BuildEvent::Progress { status, .. } => self.set_progress(&status),
            BuildEvent::MemoryUsage { summary, .. } => self.note(summary),
            BuildEvent::CompilerDiagnostic { diagnostic } => {
                if self.is_quiet() && diagnostic.severity != Severity::Error {
                    return;
                }
                let line = diagnostic.to_string();
                if self.use_color {
                    let color = match diagnostic.severity {
                        Severity::Error => Status::Error.color_code(),
                        Severity::Warning => Status::Warning.color_code(),
                    };
                    self.print_line(&format!("{}{}\x1b[0m", color, line));
                } else {
                    self.print_line(&line);
                }
            }
            BuildEvent::DiagnosticsPublished { .. } => {}
            BuildEvent::BuildFinished {
                success,
                exit_code,
                duration_ms,
                errors,
                warnings,
            } => {
                self.finish_spinner();
                let duration = format_duration(Duration::from_millis(duration_ms));
                if success {
                    self.status(
                        Status::Finished,
                        format!("build in {} ({} warnings)", duration, warnings),
                    );
                } else {
                    let code = exit_code.map_or_else(|| "none".to_string(), |c| c.to_string());
                    self.status(
                        Status::Error,
                        format!(
                            "build failed with exit code {} ({} errors, {} warnings)",
                            code, errors, warnings
                        ),
                    );
                }
            }
            BuildEvent::UploadStarted { program, port } => {
                let port = port.unwrap_or_else(|| "?".to_string());
                self.status(Status::Uploading, format!("{} via {}", port, program.display()));
            }
            BuildEvent::UploadFinished { success, exit_code } => {
                if success {
                    self.status(Status::Uploaded, "firmware written");
                } else {
                    let code = exit_code.map_or_else(|| "none".to_string(), |c| c.to_string());
                    self.status(Status::Error, format!("upload failed with exit code {}", code));
                }
            }
            BuildEvent::Clean { path, removed } => {
                if removed {
                    self.status(Status::Removed, path.display());
                } else {
                    self.note(format!("nothing to clean at {}", path.display()));
                }
            }
            BuildEvent::Notice { level, message } => match level {
                NoticeLevel::Info => self.note(message),
                NoticeLevel::Warning => self.warn(message),
                NoticeLevel::Error => self.error(message),
            },
        }
    }
}

impl fmt::Debug for Shell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Shell")
            .field("mode", &self.mode)
            .field("use_color", &self.use_color)
            .finish_non_exhaustive()
    }
}

impl Default for Shell {
    fn default() -> Self {
        Shell::new(ShellMode::default())
    }
}

impl Reporter for Shell {
    fn report(&self, event: BuildEvent) {
        if self.is_json() {
            self.json_event(&event);
        } else {
            self.render(event);
        }
    }
}

/// Format a duration in a human-readable way.
fn format_duration(duration: Duration) -> String {
    let secs = duration.as_secs_f64();
    if secs < 60.0 {
        format!("{:.2}s", secs)
    } else {
        let mins = secs / 60.0;
        format!("{:.1}m", mins)
    }
}
