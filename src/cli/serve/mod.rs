//! Development server with live reload support.
//!
//! Serves the transient output tree over HTTP. Live reload runs on a second
//! port (see [`live`]); `GET /ws` on the HTTP port tells pages which one.
//!
//! ```text
//! accept thread ──recv_timeout──▶ request ──▶ rayon pool (4 threads)
//!      │
//!      └─ shutdown? ──▶ stop accepting ──▶ drain in-flight (≤ 1 s) ──▶ return
//! ws-accept thread ──▶ one thread per live-reload client
//! ```

mod lifecycle;
mod live;
mod path;
mod response;


use std::{
    error::Error as StdError,
    io,
    net::SocketAddr,
    path::{Path, PathBuf},
    sync::Arc,
    thread,
    time::Duration,
};

use anyhow::{Context, Result};
use thiserror::Error;
use tiny_http::{Method, Request, Server};

use crate::{
    actor::{Coordinator, ws::HubHandle},
    config::SiteConfig,
    core::{Shutdown, install_interrupt_handler},
    debug, log,
};
use lifecycle::InFlight;
use live::LiveReload;

pub use lifecycle::bind_with_retry;
pub use live::WS_PATH;

/// Upper bound on waiting for in-flight requests at shutdown.
pub const SHUTDOWN_DEADLINE: Duration = Duration::from_secs(1);

/// How often the accept loop checks for shutdown.
const ACCEPT_POLL: Duration = Duration::from_millis(100);

/// Request handler threads.
const POOL_THREADS: usize = 4;

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("failed to bind {addr} after {attempts} attempts")]
    Bind {
        attempts: u16,
        addr: SocketAddr,
        #[source]
        source: Box<dyn StdError + Send + Sync + 'static>,
    },

    #[error("failed to accept connection")]
    Accept(#[source] io::Error),

    #[error("failed to create request pool")]
    Pool(#[from] rayon::ThreadPoolBuildError),

    #[error("failed to start live-reload listener")]
    Spawn(#[source] io::Error),
}

/// Run `dudu serve`: watch, rebuild, serve and live-reload until Ctrl+C.
pub fn serve_site(config: SiteConfig) -> Result<()> {
    let shutdown = Shutdown::new();
    install_interrupt_handler(shutdown.clone())?;

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(2)
        .enable_all()
        .build()
        .context("Failed to create tokio runtime")?;

    runtime.block_on(Coordinator::new(Arc::new(config), shutdown).run())
}

// =============================================================================
// DevServer
// =============================================================================

/// Bound server ready to accept requests
pub struct DevServer {
    server: Server,
    addr: SocketAddr,
    live: LiveReload,
    root: PathBuf,
    shutdown: Shutdown,
}

impl DevServer {
    /// Bind the HTTP and live-reload sockets. Requests queue until [`DevServer::run`].
    ///
    /// Live reload takes the port after the HTTP one (or any free port when
    /// the HTTP port is OS-assigned).
    pub fn bind(
        config: &SiteConfig,
        root: &Path,
        hub: HubHandle,
        shutdown: Shutdown,
    ) -> Result<Self, ServerError> {
        let (server, addr) = bind_with_retry(config.serve.interface, config.serve.port)?;
        let live_port = match config.serve.port {
            0 => 0,
            _ => addr.port().saturating_add(1),
        };
        let live = LiveReload::bind(config.serve.interface, live_port, hub)?;
        Ok(Self {
            server,
            addr,
            live,
            root: root.to_path_buf(),
            shutdown,
        })
    }

    /// Get the bound address.
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Address of the live-reload listener.
    pub fn live_addr(&self) -> SocketAddr {
        self.live.addr()
    }

    /// Accept requests until shutdown, then drain (blocking).
    pub fn run(self) -> Result<(), ServerError> {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(POOL_THREADS)
            .thread_name(|i| format!("http-{i}"))
            .build()?;
        let in_flight = Arc::new(InFlight::default());
        let root = Arc::new(self.root);
        let live_port = self.live.addr().port();

        let live_shutdown = self.shutdown.clone();
        let live = self.live;
        let live_thread = thread::Builder::new()
            .name("ws-accept".into())
            .spawn(move || live.run(&live_shutdown))
            .map_err(ServerError::Spawn)?;

        let result = loop {
            if self.shutdown.is_triggered() {
                break Ok(());
            }

            let request = match self.server.recv_timeout(ACCEPT_POLL) {
                Ok(Some(request)) => request,
                Ok(None) => continue,
                Err(err) => break Err(ServerError::Accept(err)),
            };

            let guard = in_flight.enter();
            let root = Arc::clone(&root);
            pool.spawn(move || {
                let _guard = guard;
                if let Err(e) = handle_request(request, &root, live_port) {
                    log!("serve"; "request error: {e:#}");
                }
            });
        };

        // Stop accepting before waiting on whatever is still being answered.
        drop(self.server);
        if !in_flight.drain(SHUTDOWN_DEADLINE) {
            log!("serve"; "{} requests still running at shutdown", in_flight.current());
        }

        // An accept error ends the HTTP loop without shutdown; stop live reload too.
        self.shutdown.trigger();
        match live_thread.join() {
            Ok(Err(err)) => log!("serve"; "live reload: {}", err),
            Err(_) => log!("serve"; "live-reload thread panicked"),
            Ok(Ok(())) => {}
        }
        debug!("serve"; "stopped");
        result
    }
}

/// Handle a single HTTP request
fn handle_request(request: Request, root: &Path, live_port: u16) -> Result<()> {
    if !matches!(request.method(), Method::Get | Method::Head) {
        return response::respond_method_not_allowed(request);
    }

    if path::url_path(request.url()).as_deref() == Some(WS_PATH) {
        return response::respond_text(request, &live_port.to_string());
    }

    match path::resolve_path(request.url(), root) {
        Some(path) => response::respond_file(request, &path),
        None => response::respond_not_found(request, root),
    }
}
