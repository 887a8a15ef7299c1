//! Incremental build pass.
//!
//! One call to [`Generator::generate`] walks the source tree once:
//!
//! 1. **Classify** - list renderable and static files
//! 2. **Render** - every stale renderable goes through the [`Renderer`]
//! 3. **Copy** - every stale static file is copied byte for byte
//!
//! The first hard error aborts the pass. Outputs written before it stay in
//! place, so a later pass only redoes what is still stale.

mod error;
mod render;

pub use error::BuildError;
pub use render::{Pandoc, RenderJob, Renderer, resource};

use std::{
    fs, io,
    path::{Path, PathBuf},
    sync::Arc,
};

use crate::{
    config::SiteConfig,
    core::{BuildMode, Shutdown},
    freshness::is_stale,
    log,
    source::{BuildTarget, Classifier, SourceItem, SourceKind},
    utils::plural_count,
};

// ============================================================================
// Report
// ============================================================================

/// What a pass did with one item.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ItemOutcome {
    Rendered,
    Copied,
    /// Output was already newer than the input.
    Fresh,
}

/// Per-item outcomes of a successful pass, in processing order.
#[derive(Debug, Default, Clone)]
pub struct BuildReport {
    pub items: Vec<(String, ItemOutcome)>,
}

impl BuildReport {
    fn push(&mut self, item: &SourceItem, outcome: ItemOutcome) {
        self.items.push((item.relative_path.clone(), outcome));
    }

    fn count(&self, outcome: ItemOutcome) -> usize {
        self.items.iter().filter(|(_, o)| *o == outcome).count()
    }

    pub fn rendered(&self) -> usize {
        self.count(ItemOutcome::Rendered)
    }

    pub fn copied(&self) -> usize {
        self.count(ItemOutcome::Copied)
    }

    pub fn fresh(&self) -> usize {
        self.count(ItemOutcome::Fresh)
    }

    /// True when nothing was written.
    pub fn is_unchanged(&self) -> bool {
        self.rendered() == 0 && self.copied() == 0
    }

    /// e.g. `rendered 2 pages, copied 1 file, 5 up to date`
    pub fn summary(&self) -> String {
        format!(
            "rendered {}, copied {}, {} up to date",
            plural_count(self.rendered(), "page"),
            plural_count(self.copied(), "file"),
            self.fresh()
        )
    }
}

// ============================================================================
// Generator
// ============================================================================

/// Builds a source tree into an output root.
///
/// Holds no per-pass state; the caller guarantees one pass at a time.
pub struct Generator {
    source: PathBuf,
    classifier: Classifier,
    renderer: Arc<dyn Renderer>,
    cancel: Option<Shutdown>,
}

impl Generator {
    pub fn new(source: &Path, classifier: Classifier, renderer: Arc<dyn Renderer>) -> Self {
        Self {
            source: source.to_path_buf(),
            classifier,
            renderer,
            cancel: None,
        }
    }

    /// Stop a pass between items once `shutdown` fires.
    pub fn with_cancel(mut self, shutdown: Shutdown) -> Self {
        self.cancel = Some(shutdown);
        self
    }

    fn check_cancelled(&self) -> Result<(), BuildError> {
        match &self.cancel {
            Some(shutdown) if shutdown.is_triggered() => Err(BuildError::Cancelled),
            _ => Ok(()),
        }
    }

    /// Generator using the configured source, patterns and `pandoc`.
    pub fn from_config(config: &SiteConfig) -> Result<Self, BuildError> {
        let classifier = Classifier::from_config(&config.build)?;
        let renderer = Arc::new(Pandoc::from_config(&config.build));
        Ok(Self::new(&config.build.source, classifier, renderer))
    }

    /// Run one pass into `output_root`.
    pub fn generate(
        &self,
        output_root: &Path,
        mode: BuildMode,
        force: bool,
    ) -> Result<BuildReport, BuildError> {
        let items = self.classifier.classify(&self.source)?;
        let mut report = BuildReport::default();

        let (pages, assets): (Vec<_>, Vec<_>) = items
            .iter()
            .partition(|item| item.kind == SourceKind::Renderable);

        for item in pages {
            self.check_cancelled()?;
            let target = item.target(&self.source, output_root);
            if !is_stale(&target.input_path, &target.output_path, force) {
                report.push(item, ItemOutcome::Fresh);
                continue;
            }
            self.render(&target, mode)?;
            log!("build"; "updated: {}", item.relative_path);
            report.push(item, ItemOutcome::Rendered);
        }

        for item in assets {
            self.check_cancelled()?;
            let target = item.target(&self.source, output_root);
            if !is_stale(&target.input_path, &target.output_path, force) {
                report.push(item, ItemOutcome::Fresh);
                continue;
            }
            copy(&target)?;
            log!("build"; "copied: {}", item.relative_path);
            report.push(item, ItemOutcome::Copied);
        }

        Ok(report)
    }

    fn render(&self, target: &BuildTarget, mode: BuildMode) -> Result<(), BuildError> {
        create_parent(&target.output_path)?;
        let job = RenderJob {
            input: &target.input_path,
            output: &target.output_path,
            mode,
        };
        self.renderer
            .render(&job)
            .map_err(|detail| BuildError::Render {
                path: target.input_path.clone(),
                detail,
            })
    }
}

fn copy(target: &BuildTarget) -> Result<(), BuildError> {
    create_parent(&target.output_path)?;
    fs::copy(&target.input_path, &target.output_path)
        .map(drop)
        .map_err(|source| BuildError::Copy {
            from: target.input_path.clone(),
            to: target.output_path.clone(),
            source,
        })
}

/// Create the parent of `path` with owner-only permissions.
fn create_parent(path: &Path) -> Result<(), BuildError> {
    let Some(dir) = path.parent() else {
        return Ok(());
    };
    create_dir_all(dir).map_err(|source| BuildError::CreateDir {
        path: dir.to_path_buf(),
        source,
    })
}

pub(crate) fn create_dir_all(dir: &Path) -> io::Result<()> {
    let mut builder = fs::DirBuilder::new();
    builder.recursive(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::DirBuilderExt;
        builder.mode(0o700);
    }
    builder.create(dir)
}
