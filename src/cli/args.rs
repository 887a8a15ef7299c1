//! Command-line interface definitions.

use clap::{ColorChoice, Parser, Subcommand};
use std::path::PathBuf;

/// dudu static site builder CLI
#[derive(Parser, Debug, Clone)]
#[command(
    version,
    about,
    long_about = None,
    arg_required_else_help = true,
    disable_help_subcommand = true
)]
pub struct Cli {
    /// Control colored output (auto, always, never)
    #[arg(long, global = true, default_value = "auto")]
    pub color: ColorChoice,

    /// Config file path (optional; defaults are used when it is absent)
    #[arg(short = 'C', long, default_value = "dudu.toml", value_hint = clap::ValueHint::FilePath)]
    pub config: PathBuf,

    /// subcommands
    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Create a new project from the embedded starter
    #[command(visible_alias = "n")]
    New {
        /// Project directory name; prompted for when omitted
        #[arg(value_hint = clap::ValueHint::DirPath)]
        name: Option<PathBuf>,
    },

    /// Build the site into the output directory
    #[command(visible_alias = "b")]
    Build {
        #[command(flatten)]
        paths: PathArgs,

        /// Output directory
        #[arg(short, long, value_hint = clap::ValueHint::DirPath)]
        output: Option<PathBuf>,

        /// Force regeneration of previously cached output files
        #[arg(short, long)]
        force: bool,
    },

    /// Start development server with live reload
    #[command(visible_alias = "s")]
    Serve {
        #[command(flatten)]
        paths: PathArgs,

        /// Network interface to bind (e.g., 127.0.0.1, 0.0.0.0)
        #[arg(short, long)]
        interface: Option<std::net::IpAddr>,

        /// Http port to listen on
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Print usage for every command
    Help,
}

/// Source and resource locations shared by Build and Serve
#[derive(clap::Args, Debug, Clone)]
pub struct PathArgs {
    /// Source directory for markdown
    #[arg(short, long, value_hint = clap::ValueHint::DirPath)]
    pub source: Option<PathBuf>,

    /// Resource directory (template, theme, include fragments)
    #[arg(short, long, value_hint = clap::ValueHint::DirPath)]
    pub resources: Option<PathBuf>,

    /// Enable verbose output for debugging
    #[arg(short = 'V', long)]
    pub verbose: bool,
}

impl Cli {
    #[cfg(test)]
    pub const fn is_new(&self) -> bool {
        matches!(self.command, Commands::New { .. })
    }
    pub const fn is_build(&self) -> bool {
        matches!(self.command, Commands::Build { .. })
    }
    pub const fn is_serve(&self) -> bool {
        matches!(self.command, Commands::Serve { .. })
    }
}
