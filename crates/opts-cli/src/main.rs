//! Options CLI
//!
//! Query feature-keyed configuration from one or more config roots.

mod cli;
mod commands;
mod context;
mod error;

use clap::Parser;
use colored::Colorize;

use cli::{Cli, Commands};
use error::Result;

fn main() {
    if let Err(e) = run() {
        eprintln!("{}: {}", "error".red().bold(), e);
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "warn" };
    if let Err(e) = opts_core::logging::init_with_default(default_level) {
        eprintln!("{} failed to initialize logging: {e}", "warning:".yellow().bold());
    }
    tracing::debug!("Verbose mode enabled");

    match cli.command {
        Some(cmd) => execute_command(&cli.dirs, cmd),
        None => {
            println!("{} Options CLI", "opts".green().bold());
            println!();
            println!("Run {} for available commands.", "opts --help".cyan());
            Ok(())
        }
    }
}

fn execute_command(dirs: &[std::path::PathBuf], cmd: Commands) -> Result<()> {
    match cmd {
        Commands::Get {
            key,
            features,
            preferences,
        } => commands::run_get(dirs, &key, &features.features, &preferences),
        Commands::All {
            features,
            preferences,
        } => commands::run_all(dirs, &features.features, &preferences),
        Commands::Features { aliases } => commands::run_features(dirs, aliases),
        Commands::Metadata { name } => commands::run_metadata(dirs, name.as_deref()),
        Commands::Filter {
            features,
            constraints,
        } => commands::run_filter(dirs, &features.features, &constraints),
        Commands::Keys { pointer, features } => commands::run_keys(dirs, &pointer, &features),
        Commands::Watch {
            key,
            features,
            max_updates,
        } => commands::run_watch(dirs, &key, &features.features, max_updates),
    }
}
