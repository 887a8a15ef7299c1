//! Actor Coordinator - wires up the serve session
//!
//! ```text
//!            ┌──────────── Shutdown (Ctrl+C / drain) ────────────┐
//!            ▼                    ▼                  ▼            ▼
//!        FsActor ──events──▶ Coordinator ──▶ Generator    HubActor ◀── DevServer
//!            └────errors─────▶    │      (spawn_blocking)    ▲         (/ws clients)
//!                                 └──────── Broadcast ───────┘
//! ```
//!
//! The session moves through four phases, never skipping one:
//! `Starting → Running → Draining → Stopped`. Any session-fatal failure lands
//! in the shared [`FirstError`] cell, which ends `Running` the same way an
//! interrupt does.
//!
//! The transient output root is removed at drain only if it was absent or
//! empty when the session started.

mod runtime;

#[cfg(test)]
mod tests;

use std::path::Path;
use std::sync::Arc;
use std::{fs, io, thread};

use anyhow::{Context, Result};
use parking_lot::Mutex;
use tokio::task::JoinHandle;

use super::fs::{FsActor, WatchStreams};
use super::ws::{HubActor, HubHandle};
use crate::cli::serve::DevServer;
use crate::config::SiteConfig;
use crate::core::{FirstError, Shutdown};
use crate::generator::{BuildError, BuildReport, Generator, Renderer};
use crate::source::Classifier;

/// Session phase, logged on every transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Starting,
    Running,
    Draining,
    Stopped,
}

/// Workers started so far; each is awaited during drain.
#[derive(Default)]
struct Workers {
    hub: Option<JoinHandle<()>>,
    watcher: Option<JoinHandle<()>>,
    server: Option<thread::JoinHandle<()>>,
}

/// Coordinator - owns the shared signals and runs the session.
pub struct Coordinator {
    config: Arc<SiteConfig>,
    shutdown: Shutdown,
    first_error: FirstError,
    renderer: Option<Arc<dyn Renderer>>,
    hub: Option<HubActor>,
    hub_handle: HubHandle,
    /// Pass cut short by shutdown, awaited during drain.
    interrupted: Mutex<Option<BuildTask>>,
}

type BuildTask = JoinHandle<Result<BuildReport, BuildError>>;

impl Coordinator {
    pub fn new(config: Arc<SiteConfig>, shutdown: Shutdown) -> Self {
        let (hub, hub_handle) = HubActor::new(shutdown.clone());
        Self {
            config,
            shutdown,
            first_error: FirstError::new(),
            renderer: None,
            hub: Some(hub),
            hub_handle,
            interrupted: Mutex::new(None),
        }
    }

    /// Replace the configured renderer.
    pub fn with_renderer(mut self, renderer: Arc<dyn Renderer>) -> Self {
        self.renderer = Some(renderer);
        self
    }

    /// Handle to the live-reload hub; usable before `run`.
    pub fn hub(&self) -> HubHandle {
        self.hub_handle.clone()
    }

    /// Run the session until interrupt or the first fatal error.
    ///
    /// Returns that error, if any, after every worker has stopped and the
    /// transient output root is gone.
    pub async fn run(mut self) -> Result<()> {
        enter(Phase::Starting);
        let mut workers = Workers::default();
        let staging = Staging::claim(&self.config.serve.output);

        let started = match self.start(&mut workers).await {
            Ok(started) => Some(started),
            Err(err) => {
                self.first_error.report(err);
                None
            }
        };

        enter(Phase::Running);
        if let Some((generator, streams)) = started {
            self.event_loop(&generator, streams).await;
        }

        enter(Phase::Draining);
        self.drain(workers, staging).await;

        enter(Phase::Stopped);
        match self.first_error.take() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    /// Spawn hub, watcher and server, then run the first build.
    async fn start(&mut self, workers: &mut Workers) -> Result<(Arc<Generator>, WatchStreams)> {
        let config = Arc::clone(&self.config);

        if let Some(hub) = self.hub.take() {
            workers.hub = Some(tokio::spawn(hub.run()));
        }

        let generator = Arc::new(self.generator()?);

        let (watcher, streams) = FsActor::new(&config.build.source, self.shutdown.clone())
            .with_context(|| format!("failed to watch {}", config.build.source.display()))?;
        crate::debug!("watch"; "watching {} directories", watcher.watched_dirs());
        workers.watcher = Some(tokio::spawn(watcher.run()));

        let server = DevServer::bind(
            &config,
            &config.serve.output,
            self.hub_handle.clone(),
            self.shutdown.clone(),
        )
        .context("failed to start dev server")?;
        crate::log!("serve"; "http://{}", server.addr());
        crate::debug!("serve"; "live reload on {}", server.live_addr());

        let first_error = self.first_error.clone();
        let server_thread = thread::Builder::new()
            .name("http-accept".into())
            .spawn(move || {
                if let Err(err) = server.run() {
                    first_error.report(anyhow::Error::new(err).context("dev server failed"));
                }
            })
            .context("failed to spawn server thread")?;
        workers.server = Some(server_thread);

        self.rebuild(&generator).await;
        Ok((generator, streams))
    }

    fn generator(&self) -> Result<Generator> {
        let build = &self.config.build;
        let generator = match &self.renderer {
            Some(renderer) => Generator::new(
                &build.source,
                Classifier::from_config(build)?,
                Arc::clone(renderer),
            ),
            None => Generator::from_config(&self.config)?,
        };
        Ok(generator.with_cancel(self.shutdown.clone()))
    }
}

/// Whether the transient output root may be deleted at drain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum Staging {
    /// Absent or empty at startup.
    Owned,
    /// Held files before the session started; left in place.
    Borrowed,
}

impl Staging {
    fn claim(path: &Path) -> Self {
        let empty = match fs::read_dir(path) {
            Ok(mut entries) => entries.next().is_none(),
            Err(err) => err.kind() == io::ErrorKind::NotFound,
        };
        if empty {
            Self::Owned
        } else {
            crate::log!("serve"; "{} already has files and is kept on exit", path.display());
            Self::Borrowed
        }
    }
}

fn enter(phase: Phase) {
    crate::debug!("serve"; "phase: {:?}", phase);
}
