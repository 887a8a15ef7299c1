//! Server lifecycle: port binding with retry and in-flight request tracking.

use std::{
    error::Error as StdError,
    net::{IpAddr, SocketAddr},
    sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    },
    thread,
    time::{Duration, Instant},
};

use tiny_http::Server;

use super::ServerError;
use crate::log;

/// Maximum number of port binding attempts.
const MAX_PORT_RETRIES: u16 = 10;

/// Poll interval while waiting for in-flight requests.
const DRAIN_POLL: Duration = Duration::from_millis(50);

type BindError = Box<dyn StdError + Send + Sync + 'static>;

/// Bind the HTTP server at `base_port`, or the next free port.
pub fn bind_with_retry(interface: IpAddr, base_port: u16) -> Result<(Server, SocketAddr), ServerError> {
    bind_port(interface, base_port, |addr| {
        let server = Server::http(addr)?;
        // Port 0 asks the OS for a free port; report the real one.
        let addr = server.server_addr().to_ip().unwrap_or(addr);
        Ok((server, addr))
    })
}

/// Try `bind` on `base_port` and up to `MAX_PORT_RETRIES - 1` ports after it.
pub fn bind_port<T>(
    interface: IpAddr,
    base_port: u16,
    mut bind: impl FnMut(SocketAddr) -> Result<(T, SocketAddr), BindError>,
) -> Result<(T, SocketAddr), ServerError> {
    let mut offset = 0;
    loop {
        let port = base_port.saturating_add(offset);
        let addr = SocketAddr::new(interface, port);

        match bind(addr) {
            Ok(bound) => {
                if offset > 0 {
                    log!("serve"; "port {} in use, using {} instead", base_port, port);
                }
                return Ok(bound);
            }
            Err(_) if offset + 1 < MAX_PORT_RETRIES && port != u16::MAX => offset += 1,
            Err(source) => {
                return Err(ServerError::Bind {
                    attempts: offset + 1,
                    addr,
                    source,
                });
            }
        }
    }
}

/// Count of requests currently being answered.
#[derive(Default)]
pub struct InFlight {
    count: AtomicUsize,
}

/// Decrements the counter when the request finishes, even on panic.
pub struct InFlightGuard(Arc<InFlight>);

impl InFlight {
    pub fn enter(self: &Arc<Self>) -> InFlightGuard {
        self.count.fetch_add(1, Ordering::SeqCst);
        InFlightGuard(Arc::clone(self))
    }

    pub fn current(&self) -> usize {
        self.count.load(Ordering::SeqCst)
    }

    /// Wait until no request is in flight or `deadline` passes.
    ///
    /// Returns `true` if every request finished in time.
    pub fn drain(&self, deadline: Duration) -> bool {
        let start = Instant::now();
        while self.current() > 0 {
            if start.elapsed() >= deadline {
                return false;
            }
            thread::sleep(DRAIN_POLL);
        }
        true
    }
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.0.count.fetch_sub(1, Ordering::SeqCst);
    }
}
