//! Recursive watch built from single-directory registrations.

use std::path::{Path, PathBuf};

use jwalk::WalkDir;
use notify::{RecommendedWatcher, RecursiveMode, Watcher};
use rustc_hash::FxHashSet;

use super::types::WatchError;

/// Single-directory watch primitive.
pub(super) trait DirWatch {
    fn watch_dir(&mut self, dir: &Path) -> notify::Result<()>;
    fn unwatch_dir(&mut self, dir: &Path) -> notify::Result<()>;
}

impl DirWatch for RecommendedWatcher {
    fn watch_dir(&mut self, dir: &Path) -> notify::Result<()> {
        self.watch(dir, RecursiveMode::NonRecursive)
    }

    fn unwatch_dir(&mut self, dir: &Path) -> notify::Result<()> {
        self.unwatch(dir)
    }
}

/// Set of directories currently registered with the watcher.
///
/// Each directory is registered at most once.
#[derive(Default)]
pub(super) struct WatchRegistry {
    pub(super) watched: FxHashSet<PathBuf>,
}

impl WatchRegistry {
    pub(super) fn new() -> Self {
        Self::default()
    }

    pub(super) fn contains(&self, dir: &Path) -> bool {
        self.watched.contains(dir)
    }

    /// Register `root` and every directory below it.
    ///
    /// Returns the files found during the walk.
    pub(super) fn register_tree(
        &mut self,
        watcher: &mut impl DirWatch,
        root: &Path,
    ) -> Result<Vec<PathBuf>, WatchError> {
        if !root.is_dir() {
            return Err(WatchError::Register {
                path: root.to_path_buf(),
                source: notify::Error::path_not_found().add_path(root.to_path_buf()),
            });
        }

        let mut files = Vec::new();

        for entry in WalkDir::new(root).sort(true).skip_hidden(false) {
            let entry = entry.map_err(|source| WatchError::Walk {
                path: source
                    .path()
                    .map_or_else(|| root.to_path_buf(), Path::to_path_buf),
                source,
            })?;
            let path = entry.path();

            if !entry.file_type().is_dir() {
                files.push(path);
                continue;
            }
            if self.watched.contains(&path) {
                continue;
            }

            watcher
                .watch_dir(&path)
                .map_err(|source| WatchError::Register {
                    path: path.clone(),
                    source,
                })?;
            crate::debug!("watch"; "registered {}", path.display());
            self.watched.insert(path);
        }

        Ok(files)
    }

    /// Drop `root` and every registered descendant.
    ///
    /// Returns how many registrations were removed.
    pub(super) fn unwatch_tree(&mut self, watcher: &mut impl DirWatch, root: &Path) -> usize {
        let doomed: Vec<PathBuf> = self
            .watched
            .iter()
            .filter(|dir| dir.starts_with(root))
            .cloned()
            .collect();

        for dir in &doomed {
            // The kernel drops watches on deleted directories by itself.
            if let Err(err) = watcher.unwatch_dir(dir) {
                crate::debug!("watch"; "unwatch {}: {}", dir.display(), err);
            }
            self.watched.remove(dir);
        }

        doomed.len()
    }
}
