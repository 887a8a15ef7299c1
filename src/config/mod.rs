//! Site configuration management for `dudu.toml`.
//!
//! # Module Structure
//!
//! ```text
//! config/
//! ├── section/       # [build] and [serve] definitions
//! ├── types/         # ConfigError, ConfigDiagnostics
//! └── mod.rs         # SiteConfig (this file)
//! ```
//!
//! The config file is optional: without one, every value falls back to the
//! defaults (`md/` → `static/`, resources in `resources/`, port 8080).
//! CLI flags always win over the file.
//!
//! The loaded `SiteConfig` is immutable and handed to each component's
//! constructor; nothing reads configuration from process-wide state.

pub mod section;
pub mod types;
mod util;

pub use section::{BuildSectionConfig, RendererConfig, ServeConfig};
pub use types::{ConfigDiagnostics, ConfigError};

use crate::{
    cli::{Cli, Commands, PathArgs},
    log,
};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::{
    fs,
    path::{Path, PathBuf},
};
use crate::utils::path::clean_path;
use util::{expand_path, find_config_file};

// ============================================================================
// root configuration
// ============================================================================

/// Root configuration structure representing dudu.toml
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SiteConfig {
    /// Absolute path to the config file, if one was found (internal use only)
    #[serde(skip)]
    pub config_path: Option<PathBuf>,

    /// Project root directory (internal use only)
    #[serde(skip)]
    pub root: PathBuf,

    /// Build settings
    #[serde(default)]
    pub build: BuildSectionConfig,

    /// Development server settings
    #[serde(default)]
    pub serve: ServeConfig,
}

impl SiteConfig {
    /// Load configuration from CLI arguments.
    ///
    /// Searches upward from cwd for the config file. The project root is the
    /// config file's parent directory, or cwd when there is no config file.
    pub fn load(cli: &Cli) -> Result<Self> {
        let cwd = std::env::current_dir().context("Failed to get current working directory")?;

        let (mut config, root) = match find_config_file(&cli.config) {
            Some(path) => {
                let mut config = Self::from_path(&path)?;
                let root = path.parent().map(Path::to_path_buf).unwrap_or(cwd);
                config.config_path = Some(path);
                (config, root)
            }
            None => (Self::default(), cwd),
        };

        config.finalize(&root, cli);

        if cli.is_build() || cli.is_serve() {
            config.validate()?;
        }

        Ok(config)
    }

    /// Load configuration from file path with unknown field detection.
    fn from_path(path: &Path) -> Result<Self> {
        let content =
            fs::read_to_string(path).map_err(|err| ConfigError::Io(path.to_path_buf(), err))?;

        let (config, ignored) = Self::parse_with_ignored(&content)?;

        if !ignored.is_empty() {
            Self::print_unknown_fields_warning(&ignored, path);
        }

        Ok(config)
    }

    /// Parse TOML content, collecting any unknown fields.
    fn parse_with_ignored(content: &str) -> Result<(Self, Vec<String>)> {
        let mut ignored = Vec::new();
        let deserializer = toml::Deserializer::new(content);
        let config = serde_ignored::deserialize(deserializer, |path: serde_ignored::Path| {
            ignored.push(path.to_string());
        })
        .map_err(ConfigError::Toml)?;
        Ok((config, ignored))
    }

    /// Print warning about unknown fields.
    fn print_unknown_fields_warning(fields: &[String], path: &Path) {
        let display_path = path
            .file_name()
            .map(|n| n.to_string_lossy())
            .unwrap_or_else(|| path.to_string_lossy());
        log!("warning"; "unknown fields in {} are ignored:", display_path);
        for field in fields {
            eprintln!("- {}", field);
        }
    }

    /// Set the root directory path
    pub fn set_root(&mut self, path: &Path) {
        self.root = path.to_path_buf();
    }

    // ========================================================================
    // cli configuration updates
    // ========================================================================

    /// Finalize configuration after loading: CLI overrides, then absolute paths.
    fn finalize(&mut self, root: &Path, cli: &Cli) {
        self.apply_command_options(cli);

        let root = crate::utils::path::normalize_path(root);
        self.normalize_paths(&root);
        self.set_root(&root);
    }

    /// Apply command-specific configuration options.
    fn apply_command_options(&mut self, cli: &Cli) {
        match &cli.command {
            Commands::Build {
                paths,
                output,
                force,
            } => {
                self.apply_path_args(paths);
                Self::update_option(&mut self.build.output, output.as_ref());
                self.build.force = *force;
            }
            Commands::Serve {
                paths,
                interface,
                port,
            } => {
                self.apply_path_args(paths);
                Self::update_option(&mut self.serve.interface, interface.as_ref());
                Self::update_option(&mut self.serve.port, port.as_ref());
            }
            Commands::New { .. } | Commands::Help => {}
        }
    }

    /// Apply source/resource overrides shared by build and serve.
    fn apply_path_args(&mut self, args: &PathArgs) {
        crate::logger::set_verbose(args.verbose);

        Self::update_option(&mut self.build.source, args.source.as_ref());
        Self::update_option(&mut self.build.resources, args.resources.as_ref());
    }

    /// Update config option if CLI value is provided.
    fn update_option<T: Clone>(config_option: &mut T, cli_option: Option<&T>) {
        if let Some(option) = cli_option {
            *config_option = option.clone();
        }
    }

    // ========================================================================
    // path normalization
    // ========================================================================

    /// Normalize all paths relative to root directory.
    fn normalize_paths(&mut self, root: &Path) {
        self.build.source = expand_path(&self.build.source, root);
        self.build.output = expand_path(&self.build.output, root);
        self.build.resources = expand_path(&self.build.resources, root);
        self.serve.output = expand_path(&self.serve.output, root);
    }

    // ========================================================================
    // validation
    // ========================================================================

    /// Validate configuration for build/serve.
    ///
    /// Collects all validation errors and returns them at once.
    pub fn validate(&self) -> Result<()> {
        let mut diag = ConfigDiagnostics::new();

        self.build.validate(&mut diag);
        self.validate_staging(&mut diag);

        diag.into_result()
            .map_err(|e| ConfigError::Diagnostics(e).into())
    }

    /// `serve.output` is deleted when a serve session ends, so it must not
    /// share any part of the tree with project files.
    fn validate_staging(&self, diag: &mut ConfigDiagnostics) {
        const HINT: &str = "use a dedicated directory such as `.dudu`";
        let staging = clean_path(&self.serve.output);

        let guarded = [
            ("build.source", &self.build.source),
            ("build.resources", &self.build.resources),
            ("build.output", &self.build.output),
        ];
        for (field, dir) in guarded {
            let dir = clean_path(dir);
            if staging.starts_with(&dir) || dir.starts_with(&staging) {
                diag.error_with_hint(
                    "serve.output",
                    format!("`{}` overlaps {field} `{}`", staging.display(), dir.display()),
                    HINT,
                );
            }
        }

        if clean_path(&self.root).starts_with(&staging) {
            diag.error_with_hint(
                "serve.output",
                format!("`{}` would remove the project root", staging.display()),
                HINT,
            );
        }
    }
}

// ============================================================================
// Test Helpers (available to all modules via `use crate::config::test_*`)
// ============================================================================

/// Parse config text. Panics if there are unknown fields (to catch typos in tests).
#[cfg(test)]
pub fn test_parse_config(extra: &str) -> SiteConfig {
    let (parsed, ignored) = SiteConfig::parse_with_ignored(extra).unwrap();
    assert!(
        ignored.is_empty(),
        "test config has unknown fields: {:?}",
        ignored
    );
    parsed
}

/// Config rooted at `root` with default layout (`md/`, `resources/`).
#[cfg(test)]
pub fn test_config_at(root: &Path) -> SiteConfig {
    let mut config = SiteConfig::default();
    config.normalize_paths(root);
    config.set_root(root);
    config
}
