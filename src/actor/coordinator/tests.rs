use std::{
    fs,
    path::Path,
    sync::atomic::{AtomicBool, Ordering},
    time::{Duration, Instant, SystemTime},
};

use crossbeam::channel::{Receiver, TryRecvError};
use tempfile::TempDir;

use super::*;
use crate::actor::messages::RELOAD_PAYLOAD;
use crate::cli::serve::SHUTDOWN_DEADLINE;
use crate::config::test_config_at;
use crate::generator::RenderJob;

/// Copies the source text into the output, or fails every job.
struct EchoRenderer {
    fail: bool,
}

impl Renderer for EchoRenderer {
    fn render(&self, job: &RenderJob<'_>) -> Result<(), String> {
        if self.fail {
            return Err("renderer exploded".into());
        }
        let text = fs::read_to_string(job.input).map_err(|e| e.to_string())?;
        fs::write(job.output, format!("<html>{text}</html>")).map_err(|e| e.to_string())
    }
}

/// Once armed, every render takes `RENDER_STALL`.
struct StallingRenderer {
    armed: Arc<AtomicBool>,
    started: Arc<AtomicBool>,
}

const RENDER_STALL: Duration = Duration::from_secs(2);

impl Renderer for StallingRenderer {
    fn render(&self, job: &RenderJob<'_>) -> Result<(), String> {
        if self.armed.load(Ordering::SeqCst) {
            self.started.store(true, Ordering::SeqCst);
            std::thread::sleep(RENDER_STALL);
        }
        let text = fs::read_to_string(job.input).map_err(|e| e.to_string())?;
        fs::write(job.output, text).map_err(|e| e.to_string())
    }
}

fn project() -> (TempDir, SiteConfig) {
    let temp = TempDir::new().unwrap();
    let md = temp.path().join("md");
    fs::create_dir_all(&md).unwrap();
    fs::write(md.join("index.md"), "# home").unwrap();
    fs::write(md.join("style.css"), "body{}").unwrap();

    let mut config = test_config_at(temp.path());
    config.serve.port = 0;
    (temp, config)
}

fn coordinator(config: &SiteConfig, shutdown: &Shutdown, fail: bool) -> Coordinator {
    Coordinator::new(Arc::new(config.clone()), shutdown.clone())
        .with_renderer(Arc::new(EchoRenderer { fail }))
}

async fn wait_until(mut check: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + Duration::from_secs(5);
    while Instant::now() < deadline {
        if check() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    false
}

async fn wait_for_payload(rx: &Receiver<String>) -> Option<String> {
    let mut received = None;
    wait_until(|| {
        received = rx.try_recv().ok();
        received.is_some()
    })
    .await;
    received
}

fn touch_ahead(path: &Path) {
    let file = fs::File::options().write(true).open(path).unwrap();
    file.set_modified(SystemTime::now() + Duration::from_secs(5))
        .unwrap();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_shutdown_removes_transient_output() {
    let (_temp, config) = project();
    let output = config.serve.output.clone();
    let shutdown = Shutdown::new();
    let session = tokio::spawn(coordinator(&config, &shutdown, false).run());

    assert!(wait_until(|| output.join("index.html").is_file()).await);
    assert!(output.join("style.css").is_file());

    let start = Instant::now();
    shutdown.trigger();
    let result = tokio::time::timeout(SHUTDOWN_DEADLINE + Duration::from_secs(1), session)
        .await
        .expect("session did not stop in time")
        .unwrap();

    assert!(result.is_ok());
    assert!(start.elapsed() < SHUTDOWN_DEADLINE + Duration::from_secs(1));
    assert!(!output.exists());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_write_rebuilds_then_broadcasts() {
    let (temp, config) = project();
    let output = config.serve.output.clone();
    let shutdown = Shutdown::new();
    let session = coordinator(&config, &shutdown, false);
    let (_, rx) = session.hub().register().await.unwrap();
    let task = tokio::spawn(session.run());

    assert!(wait_until(|| output.join("index.html").is_file()).await);

    let index = temp.path().join("md/index.md");
    fs::write(&index, "# changed").unwrap();
    touch_ahead(&index);

    assert_eq!(wait_for_payload(&rx).await.as_deref(), Some(RELOAD_PAYLOAD));
    let html = fs::read_to_string(output.join("index.html")).unwrap();
    assert_eq!(html, "<html># changed</html>");

    shutdown.trigger();
    assert!(task.await.unwrap().is_ok());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_failed_render_still_broadcasts() {
    let (temp, config) = project();
    let shutdown = Shutdown::new();
    let session = coordinator(&config, &shutdown, true);
    let (_, rx) = session.hub().register().await.unwrap();
    let task = tokio::spawn(session.run());

    // The first build fails too; the session keeps running.
    tokio::time::sleep(Duration::from_millis(300)).await;
    assert!(!task.is_finished());

    fs::write(temp.path().join("md/index.md"), "# broken").unwrap();

    assert_eq!(wait_for_payload(&rx).await.as_deref(), Some(RELOAD_PAYLOAD));
    assert!(!task.is_finished());

    shutdown.trigger();
    assert!(task.await.unwrap().is_ok());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_missing_source_fails_startup() {
    let (temp, mut config) = project();
    config.build.source = temp.path().join("nowhere");
    let shutdown = Shutdown::new();

    let result = tokio::time::timeout(
        Duration::from_secs(3),
        coordinator(&config, &shutdown, false).run(),
    )
    .await
    .expect("startup failure did not end the session");

    let err = result.unwrap_err();
    assert!(format!("{err:#}").contains("nowhere"));
    assert!(shutdown.is_triggered());
    assert!(!config.serve.output.exists());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_populated_staging_dir_is_kept() {
    let (_temp, config) = project();
    let output = config.serve.output.clone();
    fs::create_dir_all(&output).unwrap();
    fs::write(output.join("keep.txt"), "mine").unwrap();

    let shutdown = Shutdown::new();
    let session = tokio::spawn(coordinator(&config, &shutdown, false).run());
    assert!(wait_until(|| output.join("index.html").is_file()).await);

    shutdown.trigger();
    assert!(session.await.unwrap().is_ok());
    assert_eq!(fs::read_to_string(output.join("keep.txt")).unwrap(), "mine");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_staging_at_project_root_leaves_project_intact() {
    let (temp, mut config) = project();
    config.serve.output = temp.path().to_path_buf();

    let shutdown = Shutdown::new();
    let session = tokio::spawn(coordinator(&config, &shutdown, false).run());
    assert!(wait_until(|| temp.path().join("index.html").is_file()).await);

    shutdown.trigger();
    assert!(session.await.unwrap().is_ok());
    assert!(temp.path().join("md/index.md").is_file());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_shutdown_during_slow_rebuild_skips_broadcast() {
    let (temp, config) = project();
    let shutdown = Shutdown::new();
    let armed = Arc::new(AtomicBool::new(false));
    let started = Arc::new(AtomicBool::new(false));
    let session = Coordinator::new(Arc::new(config.clone()), shutdown.clone())
        .with_renderer(Arc::new(StallingRenderer {
            armed: Arc::clone(&armed),
            started: Arc::clone(&started),
        }));
    let (_, rx) = session.hub().register().await.unwrap();
    let output = config.serve.output.clone();
    let task = tokio::spawn(session.run());
    assert!(wait_until(|| output.join("index.html").is_file()).await);

    armed.store(true, Ordering::SeqCst);
    let index = temp.path().join("md/index.md");
    fs::write(&index, "# slow").unwrap();
    touch_ahead(&index);
    assert!(wait_until(|| started.load(Ordering::SeqCst)).await);

    let start = Instant::now();
    shutdown.trigger();
    let result = tokio::time::timeout(SHUTDOWN_DEADLINE + Duration::from_secs(1), task)
        .await
        .expect("session waited for the stalled render")
        .unwrap();

    assert!(result.is_ok());
    assert!(start.elapsed() < RENDER_STALL);
    assert_eq!(rx.try_recv(), Err(TryRecvError::Disconnected));
}
