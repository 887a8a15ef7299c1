//! Source tree classification.
//!
//! Partitions every file under the source root into renderable documents and
//! static assets. Editor artifacts are dropped. Matching is on the file name
//! only, so a pattern like `*.md` applies at any depth.
//!
//! ```text
//! md/
//! ├── index.md          → Renderable  (index.html)
//! ├── notes/a.md        → Renderable  (notes/a.html)
//! ├── style.css         → Static      (style.css)
//! └── draft.md.swp      → dropped
//! ```

use std::{
    fs, io,
    path::{Path, PathBuf},
};

use globset::{Glob, GlobMatcher, GlobSet, GlobSetBuilder};
use jwalk::WalkDir;
use thiserror::Error;

use crate::{config::BuildSectionConfig, utils::path::to_slash};

/// Extension given to rendered documents.
pub const RENDERED_EXTENSION: &str = "html";

// ============================================================================
// Types
// ============================================================================

/// How a source file is turned into output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SourceKind {
    /// Converted by the renderer; extension becomes `.html`.
    Renderable,
    /// Copied byte for byte.
    Static,
}

/// A classified file, relative to the source root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceItem {
    /// Slash-separated path relative to the source root.
    pub relative_path: String,
    pub kind: SourceKind,
}

/// Input/output pair for one item of a pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildTarget {
    pub input_path: PathBuf,
    pub output_path: PathBuf,
}

impl SourceItem {
    /// Compute where this item is read from and written to.
    pub fn target(&self, source_root: &Path, output_root: &Path) -> BuildTarget {
        let input_path = source_root.join(&self.relative_path);
        let output_path = match self.kind {
            SourceKind::Renderable => output_root
                .join(&self.relative_path)
                .with_extension(RENDERED_EXTENSION),
            SourceKind::Static => output_root.join(&self.relative_path),
        };
        BuildTarget {
            input_path,
            output_path,
        }
    }
}

#[derive(Debug, Error)]
pub enum ClassifyError {
    #[error("source root `{}` is not accessible", path.display())]
    Root {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to walk `{}`", path.display())]
    Walk {
        path: PathBuf,
        #[source]
        source: jwalk::Error,
    },

    #[error("broken link `{}`", path.display())]
    BrokenLink {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("invalid glob `{pattern}`")]
    Pattern {
        pattern: String,
        #[source]
        source: globset::Error,
    },
}

// ============================================================================
// Classifier
// ============================================================================

/// Compiled renderable and exclusion patterns.
#[derive(Debug, Clone)]
pub struct Classifier {
    renderable: GlobMatcher,
    exclude: GlobSet,
}

impl Classifier {
    pub fn new<S: AsRef<str>>(renderable: &str, exclude: &[S]) -> Result<Self, ClassifyError> {
        let renderable = compile(renderable)?.compile_matcher();

        let mut builder = GlobSetBuilder::new();
        for pattern in exclude {
            builder.add(compile(pattern.as_ref())?);
        }
        let exclude = builder.build().map_err(|source| ClassifyError::Pattern {
            pattern: "<exclude set>".to_string(),
            source,
        })?;

        Ok(Self {
            renderable,
            exclude,
        })
    }

    pub fn from_config(build: &BuildSectionConfig) -> Result<Self, ClassifyError> {
        Self::new(&build.renderable, &build.exclude)
    }

    /// Kind of a file by name, or `None` when it is excluded.
    pub fn kind_of(&self, file_name: &str) -> Option<SourceKind> {
        if self.is_excluded(file_name) {
            None
        } else if self.renderable.is_match(file_name) {
            Some(SourceKind::Renderable)
        } else {
            Some(SourceKind::Static)
        }
    }

    /// Whether a file name is excluded from every pass.
    fn is_excluded(&self, file_name: &str) -> bool {
        self.exclude.is_match(file_name)
    }

    /// Classify every file under `root`, sorted by relative path.
    ///
    /// Any walk failure aborts the whole listing.
    pub fn classify(&self, root: &Path) -> Result<Vec<SourceItem>, ClassifyError> {
        fs::metadata(root).map_err(|source| ClassifyError::Root {
            path: root.to_path_buf(),
            source,
        })?;

        let mut items = Vec::new();
        for entry in WalkDir::new(root).sort(true).skip_hidden(false) {
            let entry = entry.map_err(|source| ClassifyError::Walk {
                path: source
                    .path()
                    .map_or_else(|| root.to_path_buf(), Path::to_path_buf),
                source,
            })?;

            let path = entry.path();
            let file_type = entry.file_type();
            if file_type.is_dir() {
                continue;
            }
            if file_type.is_symlink() {
                let target = fs::metadata(&path).map_err(|source| ClassifyError::BrokenLink {
                    path: path.clone(),
                    source,
                })?;
                if !target.is_file() {
                    continue;
                }
            }

            let Some(file_name) = path.file_name().and_then(|n| n.to_str()) else {
                continue;
            };
            let Some(kind) = self.kind_of(file_name) else {
                continue;
            };
            let Ok(relative) = path.strip_prefix(root) else {
                continue;
            };

            items.push(SourceItem {
                relative_path: to_slash(relative),
                kind,
            });
        }

        items.sort_by(|a, b| a.relative_path.cmp(&b.relative_path));
        Ok(items)
    }
}

fn compile(pattern: &str) -> Result<Glob, ClassifyError> {
    Glob::new(pattern).map_err(|source| ClassifyError::Pattern {
        pattern: pattern.to_string(),
        source,
    })
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn default_classifier() -> Classifier {
        Classifier::from_config(&BuildSectionConfig::default()).unwrap()
    }

    fn touch(root: &Path, rel: &str) {
        let path = root.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, rel).unwrap();
    }

    #[test]
    fn test_kind_of() {
        let classifier = default_classifier();
        assert_eq!(classifier.kind_of("notes.md"), Some(SourceKind::Renderable));
        assert_eq!(classifier.kind_of("logo.png"), Some(SourceKind::Static));
        assert_eq!(classifier.kind_of("draft.md.swp"), None);
        assert_eq!(classifier.kind_of("index.md.bak"), None);
        assert_eq!(classifier.kind_of(".index.md.swo"), None);
    }

    #[test]
    fn test_classify_tree() {
        let dir = TempDir::new().unwrap();
        let root = dir.path();
        touch(root, "notes.md");
        touch(root, "logo.png");
        touch(root, "draft.md.swp");
        touch(root, "posts/2024/trip.md");
        touch(root, "posts/photo.jpg");
        fs::create_dir_all(root.join("empty")).unwrap();

        let items = default_classifier().classify(root).unwrap();
        let listing: Vec<_> = items
            .iter()
            .map(|i| (i.relative_path.as_str(), i.kind))
            .collect();

        assert_eq!(
            listing,
            vec![
                ("logo.png", SourceKind::Static),
                ("notes.md", SourceKind::Renderable),
                ("posts/2024/trip.md", SourceKind::Renderable),
                ("posts/photo.jpg", SourceKind::Static),
            ]
        );
    }

    #[test]
    fn test_target_paths() {
        let src = Path::new("/site/md");
        let out = Path::new("/site/static");

        let page = SourceItem {
            relative_path: "notes.md".into(),
            kind: SourceKind::Renderable,
        };
        let target = page.target(src, out);
        assert_eq!(target.input_path, PathBuf::from("/site/md/notes.md"));
        assert_eq!(target.output_path, PathBuf::from("/site/static/notes.html"));

        let asset = SourceItem {
            relative_path: "img/logo.png".into(),
            kind: SourceKind::Static,
        };
        let target = asset.target(src, out);
        assert_eq!(target.output_path, PathBuf::from("/site/static/img/logo.png"));
    }

    #[test]
    fn test_missing_root() {
        let dir = TempDir::new().unwrap();
        let err = default_classifier()
            .classify(&dir.path().join("nope"))
            .unwrap_err();
        assert!(matches!(err, ClassifyError::Root { .. }));
        assert!(err.to_string().contains("nope"));
    }

    #[cfg(unix)]
    #[test]
    fn test_broken_symlink_aborts() {
        let dir = TempDir::new().unwrap();
        touch(dir.path(), "index.md");
        std::os::unix::fs::symlink(dir.path().join("gone.png"), dir.path().join("link.png"))
            .unwrap();

        let err = default_classifier().classify(dir.path()).unwrap_err();
        assert!(matches!(err, ClassifyError::BrokenLink { .. }));
        assert!(err.to_string().contains("link.png"));
    }

    #[test]
    fn test_invalid_pattern() {
        let err = Classifier::new("[", &["*.swp"]).unwrap_err();
        assert!(matches!(err, ClassifyError::Pattern { .. }));
    }
}
