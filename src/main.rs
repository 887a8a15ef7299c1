//! dudu - An incremental static site builder for markdown notes.

mod actor;
mod cli;
mod config;
mod core;
mod embed;
mod freshness;
mod generator;
mod logger;
mod source;
mod utils;

use anyhow::Result;
use clap::{ColorChoice, CommandFactory, Parser};
use cli::{Cli, Commands};
use config::SiteConfig;

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Set global color override based on CLI option
    match cli.color {
        ColorChoice::Always => owo_colors::set_override(true),
        ColorChoice::Never => owo_colors::set_override(false),
        ColorChoice::Auto => {} // owo-colors auto-detects TTY
    }

    match &cli.command {
        Commands::New { name } => cli::new::new_project(name.as_deref()),
        Commands::Build { .. } => {
            let config = SiteConfig::load(&cli)?;
            cli::build::build_site(&config).map(drop)
        }
        Commands::Serve { .. } => {
            let config = SiteConfig::load(&cli)?;
            cli::serve::serve_site(config)
        }
        Commands::Help => print_usage(),
    }
}

/// Print top-level usage followed by each command's own help.
fn print_usage() -> Result<()> {
    let mut command = Cli::command();
    command.build();
    command.print_help()?;

    for sub in command.get_subcommands_mut() {
        if sub.get_name() == "help" {
            continue;
        }
        println!();
        sub.print_help()?;
    }
    Ok(())
}
