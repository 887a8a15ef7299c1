//! FileSystem Actor
//!
//! Watches the source tree and publishes normalized change events.
//!
//! Architecture:
//! ```text
//! notify (one NonRecursive watch per dir) → normalize → ChangeEvent stream
//!                                                 ↘ WatchError stream
//! ```
//!
//! A recursive watch is assembled from single-directory registrations: every
//! directory is registered at start, and a directory created later is
//! registered together with its subtree. Files already inside such a
//! directory are reported as writes, since they may have landed before the
//! registration did.
//!
//! Both output channels are unbounded. They close when the actor stops, so a
//! pending `recv()` on either returns `None`.

use std::path::{Path, PathBuf};

use notify::RecommendedWatcher;
use tokio::sync::mpsc;

use crate::core::Shutdown;

mod normalize;
mod registry;
mod types;


use normalize::normalize;
use registry::WatchRegistry;
pub use types::{ChangeEvent, Operation, WatchError};

/// Receiving ends handed to the consumer.
pub struct WatchStreams {
    pub events: mpsc::UnboundedReceiver<ChangeEvent>,
    pub errors: mpsc::UnboundedReceiver<WatchError>,
}

/// Loop input; cancellation is polled first.
enum Input {
    Cancel,
    Raw(notify::Result<notify::Event>),
    Closed,
}

/// FileSystem Actor - watches a directory tree for changes
pub struct FsActor {
    root: PathBuf,
    /// Channel fed by the notify callback thread
    raw_rx: mpsc::UnboundedReceiver<notify::Result<notify::Event>>,
    /// Watcher handle (must be kept alive)
    watcher: RecommendedWatcher,
    registry: WatchRegistry,
    events_tx: mpsc::UnboundedSender<ChangeEvent>,
    errors_tx: mpsc::UnboundedSender<WatchError>,
    shutdown: Shutdown,
}

impl FsActor {
    /// Create the watcher and register every directory under `root`.
    ///
    /// Events start buffering immediately, so nothing is lost while the
    /// caller runs the initial build. A registration failure here is fatal.
    pub fn new(root: &Path, shutdown: Shutdown) -> Result<(Self, WatchStreams), WatchError> {
        let (raw_tx, raw_rx) = mpsc::unbounded_channel();
        let mut watcher = notify::recommended_watcher(move |res| {
            let _ = raw_tx.send(res);
        })?;

        let mut registry = WatchRegistry::new();
        registry.register_tree(&mut watcher, root)?;

        let (events_tx, events) = mpsc::unbounded_channel();
        let (errors_tx, errors) = mpsc::unbounded_channel();

        let actor = Self {
            root: root.to_path_buf(),
            raw_rx,
            watcher,
            registry,
            events_tx,
            errors_tx,
            shutdown,
        };
        Ok((actor, WatchStreams { events, errors }))
    }

    /// Number of directories currently registered.
    pub fn watched_dirs(&self) -> usize {
        self.registry.watched.len()
    }

    /// Run the actor event loop until shutdown.
    pub async fn run(mut self) {
        loop {
            let input = tokio::select! {
                biased;
                _ = self.shutdown.cancelled() => Input::Cancel,
                raw = self.raw_rx.recv() => raw.map_or(Input::Closed, Input::Raw),
            };

            match input {
                Input::Cancel | Input::Closed => break,
                Input::Raw(Ok(event)) => {
                    if !self.handle(&event) {
                        break;
                    }
                }
                Input::Raw(Err(err)) => {
                    if self.errors_tx.send(WatchError::Notify(err)).is_err() {
                        break;
                    }
                }
            }
        }

        let removed = self.registry.unwatch_tree(&mut self.watcher, &self.root);
        crate::debug!("watch"; "stopped, released {} watches", removed);
        // Dropping self closes both output channels.
    }

    /// Publish one notify event. Returns `false` once the consumer is gone.
    fn handle(&mut self, event: &notify::Event) -> bool {
        crate::debug!("watch"; "raw notify: {:?} {:?}", event.kind, event.paths);

        for (path, operation) in normalize(event) {
            match operation {
                Operation::Create | Operation::Rename if path.is_dir() => {
                    if !self.publish(ChangeEvent::new(&path, operation)) {
                        return false;
                    }
                    if !self.register_new_dir(&path) {
                        return false;
                    }
                }
                Operation::Remove if self.registry.contains(&path) => {
                    self.registry.unwatch_tree(&mut self.watcher, &path);
                    if !self.publish(ChangeEvent::new(path, operation)) {
                        return false;
                    }
                }
                _ => {
                    if !self.publish(ChangeEvent::new(path, operation)) {
                        return false;
                    }
                }
            }
        }
        true
    }

    /// Register a directory that appeared after start, plus its subtree.
    fn register_new_dir(&mut self, dir: &Path) -> bool {
        let files = match self.registry.register_tree(&mut self.watcher, dir) {
            Ok(files) => files,
            Err(err) => {
                // Usually the directory vanished again before we got to it.
                crate::debug!("watch"; "{:#}", anyhow::Error::from(err));
                return true;
            }
        };

        files
            .into_iter()
            .filter(|file| !normalize::is_temp_file(file))
            .all(|file| self.publish(ChangeEvent::new(file, Operation::Write)))
    }

    fn publish(&self, event: ChangeEvent) -> bool {
        crate::debug!("watch"; "{} {}", event.operation.label(), event.path.display());
        self.events_tx.send(event).is_ok()
    }
}
