use std::{fs, sync::Arc, time::Duration};

use super::{Coordinator, Staging, Workers};
use crate::actor::fs::{ChangeEvent, WatchError, WatchStreams};
use crate::actor::messages::RELOAD_PAYLOAD;
use crate::cli::serve::SHUTDOWN_DEADLINE;
use crate::core::BuildMode;
use crate::generator::{BuildError, Generator};
use crate::{debug, log, logger};

/// Grace period for async workers after the shutdown signal.
const ACTOR_STOP_TIMEOUT: Duration = Duration::from_millis(500);

/// Event loop input; cancellation and failure are polled first.
enum Input {
    Cancel,
    Failed,
    WatchFailed(WatchError),
    ErrorsClosed,
    Change(ChangeEvent),
    EventsClosed,
}

impl Coordinator {
    /// Rebuild on every actionable change until cancelled or failed.
    pub(super) async fn event_loop(&self, generator: &Arc<Generator>, mut streams: WatchStreams) {
        let mut errors_open = true;

        loop {
            let input = tokio::select! {
                biased;
                _ = self.shutdown.cancelled() => Input::Cancel,
                _ = self.first_error.wait() => Input::Failed,
                err = streams.errors.recv(), if errors_open => {
                    err.map_or(Input::ErrorsClosed, Input::WatchFailed)
                }
                event = streams.events.recv() => event.map_or(Input::EventsClosed, Input::Change),
            };

            match input {
                Input::Cancel | Input::Failed => break,
                Input::WatchFailed(err) => {
                    self.first_error
                        .report(anyhow::Error::new(err).context("watcher failed"));
                }
                Input::ErrorsClosed => errors_open = false,
                Input::EventsClosed => {
                    self.first_error
                        .report(anyhow::anyhow!("watcher stopped unexpectedly"));
                }
                Input::Change(event) if event.is_actionable() => {
                    // Everything already queued is covered by this build.
                    let mut coalesced = 0;
                    while streams.events.try_recv().is_ok() {
                        coalesced += 1;
                    }
                    debug!("watch"; "changed: {} (+{} queued)", event.path.display(), coalesced);

                    if !self.rebuild(generator).await {
                        // Shutdown interrupted the pass; nothing to announce.
                        break;
                    }
                    if !self.hub_handle.broadcast(RELOAD_PAYLOAD).await {
                        debug!("hub"; "broadcast skipped, hub stopped");
                    }
                }
                Input::Change(_) => {}
            }
        }
    }

    /// One hot-reload pass off the runtime threads. Failures are shown, not returned.
    ///
    /// Returns `false` if shutdown arrived first; the pass is then left to
    /// stop on its own and drain waits for it.
    pub(super) async fn rebuild(&self, generator: &Arc<Generator>) -> bool {
        let generator = Arc::clone(generator);
        let output = self.config.serve.output.clone();
        let mut task = tokio::task::spawn_blocking(move || {
            generator.generate(&output, BuildMode::HOT_RELOAD, false)
        });

        let result = tokio::select! {
            biased;
            _ = self.shutdown.cancelled() => {
                *self.interrupted.lock() = Some(task);
                return false;
            }
            result = &mut task => result,
        };

        match result {
            Ok(Ok(report)) if report.is_unchanged() => {
                logger::status_unchanged("no changes");
            }
            Ok(Ok(report)) => logger::status_success(&report.summary()),
            Ok(Err(BuildError::Cancelled)) => debug!("build"; "cancelled"),
            Ok(Err(err)) => logger::status_error(&err.summary(), &err.detail()),
            Err(err) => logger::status_error("build task failed", &err.to_string()),
        }
        true
    }

    /// Stop every worker, then remove the transient output root if it is ours.
    pub(super) async fn drain(&self, workers: Workers, staging: Staging) {
        self.shutdown.trigger();

        for (name, task) in [("watcher", workers.watcher), ("hub", workers.hub)] {
            let Some(task) = task else { continue };
            if tokio::time::timeout(ACTOR_STOP_TIMEOUT, task).await.is_err() {
                log!("serve"; "{} did not stop in time", name);
            }
        }

        let interrupted = self.interrupted.lock().take();
        if let Some(build) = interrupted {
            // Stops after the item in progress.
            if tokio::time::timeout(ACTOR_STOP_TIMEOUT, build).await.is_err() {
                log!("serve"; "build still running at shutdown");
            }
        }

        if let Some(server) = workers.server {
            // The server drains its own requests within the deadline.
            let joined = tokio::task::spawn_blocking(move || server.join());
            let limit = SHUTDOWN_DEADLINE + ACTOR_STOP_TIMEOUT;
            match tokio::time::timeout(limit, joined).await {
                Ok(Ok(Ok(()))) => {}
                Ok(_) => log!("serve"; "server thread panicked"),
                Err(_) => log!("serve"; "server did not stop in time"),
            }
        }

        let output = &self.config.serve.output;
        if staging == Staging::Owned && output.exists() {
            match fs::remove_dir_all(output) {
                Ok(()) => debug!("serve"; "removed {}", output.display()),
                Err(err) => log!("serve"; "cannot remove {}: {}", output.display(), err),
            }
        }
    }
}
