//! Sketchport CLI - build and upload Arduino sketches

use std::io::{self, IsTerminal};

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use sketchport::OrchestratorError;

mod cli;
mod commands;

use cli::{Cli, Commands};

fn main() {
    if let Err(e) = run() {
        match e.downcast_ref::<OrchestratorError>() {
            Some(err) => eprint!(
                "{}",
                commands::diagnose(err).format(io::stderr().is_terminal())
            ),
            None => eprintln!("error: {:#}", e),
        }
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    // Parse CLI
    let cli = Cli::parse();

    // Set up logging
    let filter = if cli.global.verbose {
        EnvFilter::new("sketchport=debug")
    } else {
        EnvFilter::new("sketchport=info")
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .without_time()
        .init();

    // Execute command
    let global = cli.global;
    match cli.command {
        Commands::Init(args) => commands::init::execute(&global, args),
        Commands::Build(args) => commands::build::execute(&global, args),
        Commands::Rebuild(args) => commands::build::execute_rebuild(&global, args),
        Commands::Clean(args) => commands::clean::execute(&global, args),
        Commands::Upload(args) => commands::upload::execute(&global, args),
        Commands::Flash(args) => commands::upload::execute_flash(&global, args),
        Commands::Reflash(args) => commands::upload::execute_reflash(&global, args),
        Commands::Show(args) => commands::show::execute(&global, args),
        Commands::Completions(args) => commands::completions::execute(args),
    }
}
