//! `[build]` section configuration.
//!
//! Contains source/output/resource locations and renderer settings.
//!
//! # Example
//!
//! ```toml
//! [build]
//! source = "md"               # Source directory for markdown (relative to project root)
//! output = "static"           # Output directory for `dudu build`
//! resources = "resources"     # Template, highlight theme and include fragments
//! renderable = "*.md"         # Files rendered to HTML; everything else is copied
//! exclude = ["*.swp", "*.swo", "*.bak"]   # Editor artifacts, never copied
//!
//! [build.renderer]
//! command = "pandoc"          # Renderer executable
//! stylesheet = "/style.css"   # Stylesheet link injected into every page
//! lang = "en"                 # Document language variable
//! ```

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::config::ConfigDiagnostics;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BuildSectionConfig {
    /// Markdown source directory.
    pub source: PathBuf,

    /// Build output directory.
    pub output: PathBuf,

    /// Resource directory holding renderer template/theme/include fragments.
    pub resources: PathBuf,

    /// Glob for files converted by the renderer.
    pub renderable: String,

    /// Globs for files dropped from the build entirely.
    pub exclude: Vec<String>,

    /// Rebuild every item regardless of timestamps (CLI only).
    #[serde(skip)]
    pub force: bool,

    /// External renderer settings.
    pub renderer: RendererConfig,
}

impl Default for BuildSectionConfig {
    fn default() -> Self {
        Self {
            source: PathBuf::from("md"),
            output: PathBuf::from("static"),
            resources: PathBuf::from("resources"),
            renderable: "*.md".to_string(),
            exclude: vec!["*.swp".into(), "*.swo".into(), "*.bak".into()],
            force: false,
            renderer: RendererConfig::default(),
        }
    }
}

impl BuildSectionConfig {
    /// Validate build paths and renderer availability.
    pub fn validate(&self, diag: &mut ConfigDiagnostics) {
        if !self.source.is_dir() {
            diag.error_with_hint(
                "build.source",
                format!("source directory `{}` not found", self.source.display()),
                "run `dudu new` to create a project, or pass --source",
            );
        }

        if !self.resources.is_dir() {
            diag.error_with_hint(
                "build.resources",
                format!("resource directory `{}` not found", self.resources.display()),
                "pass --resources or restore the directory created by `dudu new`",
            );
        }

        if globset::Glob::new(&self.renderable).is_err() {
            diag.error("build.renderable", format!("invalid glob `{}`", self.renderable));
        }
        for pattern in &self.exclude {
            if globset::Glob::new(pattern).is_err() {
                diag.error("build.exclude", format!("invalid glob `{pattern}`"));
            }
        }

        self.renderer.validate(diag);
    }
}

/// `[build.renderer]` settings for the external document renderer.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RendererConfig {
    /// Renderer executable.
    pub command: String,

    /// Stylesheet link passed to every page.
    pub stylesheet: String,

    /// Value of the `lang` template variable.
    pub lang: String,
}

impl Default for RendererConfig {
    fn default() -> Self {
        Self {
            command: "pandoc".to_string(),
            stylesheet: "/style.css".to_string(),
            lang: "en".to_string(),
        }
    }
}

impl RendererConfig {
    fn validate(&self, diag: &mut ConfigDiagnostics) {
        if self.command.is_empty() {
            diag.error("build.renderer.command", "renderer command is empty");
            return;
        }

        if which::which(&self.command).is_err() {
            diag.error_with_hint(
                "build.renderer.command",
                format!("`{}` not found", self.command),
                "install pandoc or update build.renderer.command",
            );
        }
    }
}
