//! Document rendering through an external converter.
//!
//! The [`Renderer`] trait is the seam between the build pass and the
//! subprocess; tests substitute an in-process implementation.

use std::{
    ffi::OsString,
    path::{Path, PathBuf},
};

use crate::{
    config::{BuildSectionConfig, RendererConfig},
    core::BuildMode,
    utils::exec::{Cmd, ExecError},
};

/// Resource file names expected inside the resource directory.
pub mod resource {
    pub const TEMPLATE: &str = "template.html";
    pub const NAVBAR: &str = "navbar.html";
    pub const FOOTER: &str = "footer.html";
    pub const HIGHLIGHT_THEME: &str = "code-highlight.theme";
    pub const HOT_RELOAD: &str = "hotreload.html";
}

/// One document to render.
#[derive(Debug, Clone, Copy)]
pub struct RenderJob<'a> {
    pub input: &'a Path,
    pub output: &'a Path,
    pub mode: BuildMode,
}

/// Converts one source document into one HTML file.
pub trait Renderer: Send + Sync {
    /// Render `job.input` into `job.output`. The output directory exists.
    ///
    /// The error string is shown to the user verbatim.
    fn render(&self, job: &RenderJob<'_>) -> Result<(), String>;
}

/// `pandoc` (or a compatible executable) with a fixed option set.
#[derive(Debug, Clone)]
pub struct Pandoc {
    command: String,
    stylesheet: String,
    lang: String,
    resources: PathBuf,
}

impl Pandoc {
    pub fn new(renderer: &RendererConfig, resources: &Path) -> Self {
        Self {
            command: renderer.command.clone(),
            stylesheet: renderer.stylesheet.clone(),
            lang: renderer.lang.clone(),
            resources: resources.to_path_buf(),
        }
    }

    pub fn from_config(build: &BuildSectionConfig) -> Self {
        Self::new(&build.renderer, &build.resources)
    }

    /// Full argument list for `job`.
    pub fn args(&self, job: &RenderJob<'_>) -> Vec<OsString> {
        let mut args: Vec<OsString> = vec![
            "--standalone".into(),
            format!("--css={}", self.stylesheet).into(),
            self.resource_flag("--highlight-style", resource::HIGHLIGHT_THEME),
            format!("--variable=lang:{}", self.lang).into(),
            self.resource_flag("--include-before-body", resource::NAVBAR),
            self.resource_flag("--include-after-body", resource::FOOTER),
            self.resource_flag("--template", resource::TEMPLATE),
        ];

        if job.mode.is_hot_reload() {
            args.push(self.resource_flag("--include-in-header", resource::HOT_RELOAD));
        }

        args.push(job.input.as_os_str().to_owned());
        args.push("-o".into());
        args.push(job.output.as_os_str().to_owned());
        args
    }

    fn resource_flag(&self, flag: &str, name: &str) -> OsString {
        let mut arg = OsString::from(flag);
        arg.push("=");
        arg.push(self.resources.join(name));
        arg
    }
}

impl Renderer for Pandoc {
    fn render(&self, job: &RenderJob<'_>) -> Result<(), String> {
        Cmd::new(&self.command)
            .args(self.args(job))
            .run()
            .map(drop)
            .map_err(|err| match &err {
                ExecError::Spawn { source, .. } => format!("{err}: {source}"),
                ExecError::Failed { .. } => err.to_string(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pandoc() -> Pandoc {
        Pandoc::new(&RendererConfig::default(), Path::new("/site/resources"))
    }

    fn args_of(mode: BuildMode) -> Vec<String> {
        let job = RenderJob {
            input: Path::new("/site/md/index.md"),
            output: Path::new("/site/static/index.html"),
            mode,
        };
        pandoc()
            .args(&job)
            .into_iter()
            .map(|a| a.to_string_lossy().into_owned())
            .collect()
    }

    #[test]
    fn test_production_args() {
        let args = args_of(BuildMode::PRODUCTION);
        assert_eq!(
            args,
            vec![
                "--standalone",
                "--css=/style.css",
                "--highlight-style=/site/resources/code-highlight.theme",
                "--variable=lang:en",
                "--include-before-body=/site/resources/navbar.html",
                "--include-after-body=/site/resources/footer.html",
                "--template=/site/resources/template.html",
                "/site/md/index.md",
                "-o",
                "/site/static/index.html",
            ]
        );
    }

    #[test]
    fn test_hot_reload_adds_header_include() {
        let args = args_of(BuildMode::HOT_RELOAD);
        assert!(args.contains(&"--include-in-header=/site/resources/hotreload.html".to_string()));
        assert_eq!(args.last().map(String::as_str), Some("/site/static/index.html"));
    }

    #[test]
    fn test_missing_renderer_reports_error() {
        let mut config = RendererConfig::default();
        config.command = "dudu-missing-renderer".into();
        let pandoc = Pandoc::new(&config, Path::new("/nowhere"));
        let job = RenderJob {
            input: Path::new("a.md"),
            output: Path::new("a.html"),
            mode: BuildMode::PRODUCTION,
        };
        let err = pandoc.render(&job).unwrap_err();
        assert!(err.contains("dudu-missing-renderer"));
    }
}
