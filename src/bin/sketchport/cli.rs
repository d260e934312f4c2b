//! CLI definitions using clap.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};
use clap_complete::Shell as CompletionShell;

/// Sketchport - Build and upload Arduino sketches from the command line
#[derive(Parser)]
#[command(name = "sketchport")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalArgs,

    #[command(subcommand)]
    pub command: Commands,
}

/// Flags accepted by every command.
#[derive(Args, Clone)]
pub struct GlobalArgs {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Only print errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    /// Output format for build events
    #[arg(long, global = true, value_enum, default_value_t = MessageFormat::Human)]
    pub message_format: MessageFormat,

    /// Serial port the board is attached to (overrides config)
    #[arg(short, long, global = true, env = "SKETCHPORT_PORT")]
    pub port: Option<String>,

    /// Fully-qualified board name (overrides config)
    #[arg(long, global = true)]
    pub fqbn: Option<String>,
}

#[derive(Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum MessageFormat {
    Human,
    Json,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Create a .sketchport/config.toml for a sketch directory
    ///
    /// The global --port and --fqbn flags are written into the new file.
    Init(InitArgs),

    /// Compile the sketch
    Build(SketchArgs),

    /// Remove build output, then compile
    Rebuild(SketchArgs),

    /// Remove the sketch's build directory
    Clean(SketchArgs),

    /// Flash the compiled sketch, compiling first if it is out of date
    Upload(SketchArgs),

    /// Compile, then flash if the compile succeeded
    Flash(SketchArgs),

    /// Remove build output, compile, then flash
    Reflash(SketchArgs),

    /// Show resolved preferences and tool command lines
    Show(ShowArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

#[derive(Args)]
pub struct SketchArgs {
    /// Sketch file (defaults to the project's only .ino file)
    pub sketch: Option<PathBuf>,
}

#[derive(Args)]
pub struct InitArgs {
    /// Directory to initialize (defaults to current directory)
    pub path: Option<PathBuf>,

    /// Arduino IDE installation directory
    #[arg(long)]
    pub ide_path: Option<PathBuf>,

    /// Overwrite an existing config file
    #[arg(long)]
    pub force: bool,
}

#[derive(Args)]
pub struct ShowArgs {
    /// Sketch file (defaults to the project's only .ino file)
    pub sketch: Option<PathBuf>,

    /// Print every resolved preference
    #[arg(long, conflicts_with = "key")]
    pub prefs: bool,

    /// Expand a single preference key
    #[arg(long)]
    pub key: Option<String>,
}

#[derive(Args)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    #[arg(value_enum)]
    pub shell: CompletionShell,
}
