//! Live-reload WebSocket listener.
//!
//! Runs on its own port next to the HTTP server. Pages find it through
//! `GET /ws` on the HTTP port, which answers with the port number.
//!
//! ```text
//! ws-accept ──accept──▶ handshake ──▶ client thread ──┬─ hub payload ──▶ text frame
//!     │                                              ├─ idle 10 s   ──▶ ping
//!     └─ shutdown? ──▶ return                         └─ close/error ──▶ unregister
//! ```
//!
//! Client sockets are non-blocking after the handshake, so one thread both
//! polls the hub queue and reads what the browser sends. A received Close
//! is answered before the thread exits.

use std::{
    io::{self, Read, Write},
    net::{IpAddr, SocketAddr, TcpListener, TcpStream},
    thread,
    time::{Duration, Instant},
};

use anyhow::{Result, anyhow};
use crossbeam::channel::{Receiver, RecvTimeoutError};
use tungstenite::{Error as WsError, Message, WebSocket};

use super::{ServerError, lifecycle::bind_port};
use crate::{
    actor::{messages::ClientId, ws::HubHandle},
    core::Shutdown,
    debug, log,
};

/// HTTP path answering with the live-reload port, also the WebSocket path.
pub const WS_PATH: &str = "ws";

/// Idle time after which a ping probes the connection.
const PING_INTERVAL: Duration = Duration::from_secs(10);

/// How long a client thread waits on the hub queue between socket reads.
const CLIENT_POLL: Duration = Duration::from_millis(50);

/// How often the accept loop checks for shutdown.
const ACCEPT_POLL: Duration = Duration::from_millis(100);

/// Upper bound on a client's opening handshake.
const HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(2);

/// Bound live-reload listener.
pub struct LiveReload {
    listener: TcpListener,
    addr: SocketAddr,
    hub: HubHandle,
}

impl LiveReload {
    /// Bind at `base_port` or the next free port; `0` asks the OS.
    pub fn bind(interface: IpAddr, base_port: u16, hub: HubHandle) -> Result<Self, ServerError> {
        let (listener, addr) = bind_port(interface, base_port, |addr| {
            let listener = TcpListener::bind(addr)?;
            let addr = listener.local_addr()?;
            Ok((listener, addr))
        })?;
        Ok(Self {
            listener,
            addr,
            hub,
        })
    }

    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Accept clients until shutdown (blocking).
    pub fn run(self, shutdown: &Shutdown) -> Result<(), ServerError> {
        self.listener
            .set_nonblocking(true)
            .map_err(ServerError::Accept)?;

        while !shutdown.is_triggered() {
            match self.listener.accept() {
                Ok((stream, peer)) => {
                    debug!("serve"; "live-reload connection from {}", peer);
                    self.attach(stream);
                }
                Err(e) if e.kind() == io::ErrorKind::WouldBlock => thread::sleep(ACCEPT_POLL),
                Err(e) => {
                    log!("serve"; "live-reload accept error: {}", e);
                    thread::sleep(ACCEPT_POLL);
                }
            }
        }
        Ok(())
    }

    fn attach(&self, stream: TcpStream) {
        let hub = self.hub.clone();
        let spawned = thread::Builder::new()
            .name("ws-client".into())
            .spawn(move || {
                if let Err(e) = serve_client(stream, &hub) {
                    debug!("serve"; "live-reload client dropped: {e:#}");
                }
            });
        if let Err(e) = spawned {
            log!("serve"; "cannot spawn live-reload thread: {}", e);
        }
    }
}

/// Handshake, register with the hub, then forward until either side ends.
fn serve_client(stream: TcpStream, hub: &HubHandle) -> Result<()> {
    // Accepted sockets can inherit the listener's non-blocking flag.
    stream.set_nonblocking(false)?;
    stream.set_read_timeout(Some(HANDSHAKE_TIMEOUT))?;
    let mut socket =
        tungstenite::accept(stream).map_err(|e| anyhow!("handshake failed: {e}"))?;
    socket.get_ref().set_read_timeout(None)?;
    socket.get_ref().set_nonblocking(true)?;

    let Some((id, rx)) = hub.register_blocking() else {
        close(&mut socket);
        return Ok(());
    };

    match forward(&mut socket, &rx) {
        End::Released => {
            close(&mut socket);
            debug!("serve"; "live-reload client {} released", id);
        }
        End::PeerClosed => {
            hub.unregister_blocking(id);
            debug!("serve"; "live-reload client {} closed", id);
        }
        End::Failed(err) => {
            hub.unregister_blocking(id);
            debug!("serve"; "live-reload client {} gone: {}", id, err);
        }
    }
    Ok(())
}

/// Why a client loop ended.
#[derive(Debug)]
enum End {
    /// The hub dropped the queue (eviction or shutdown).
    Released,
    /// The browser sent Close; the reply is already flushed.
    PeerClosed,
    Failed(WsError),
}

fn forward<S: Read + Write>(socket: &mut WebSocket<S>, rx: &Receiver<String>) -> End {
    let mut last_sent = Instant::now();

    loop {
        match socket.read() {
            Ok(Message::Close(_)) => {
                // Sends the queued close reply.
                let _ = socket.flush();
                return End::PeerClosed;
            }
            Ok(_) => {}
            Err(WsError::Io(e)) if e.kind() == io::ErrorKind::WouldBlock => {}
            Err(WsError::ConnectionClosed | WsError::AlreadyClosed) => return End::PeerClosed,
            Err(err) => return End::Failed(err),
        }

        let message = match rx.recv_timeout(CLIENT_POLL) {
            Ok(payload) => Message::Text(payload.into()),
            Err(RecvTimeoutError::Timeout) if last_sent.elapsed() >= PING_INTERVAL => {
                Message::Ping(Default::default())
            }
            Err(RecvTimeoutError::Timeout) => continue,
            Err(RecvTimeoutError::Disconnected) => return End::Released,
        };

        match socket.send(message) {
            Ok(()) => {}
            // Buffered; the next send or read flushes it.
            Err(WsError::Io(e)) if e.kind() == io::ErrorKind::WouldBlock => {}
            Err(err) => return End::Failed(err),
        }
        last_sent = Instant::now();
    }
}

fn close<S: Read + Write>(socket: &mut WebSocket<S>) {
    let _ = socket.close(None);
    let _ = socket.flush();
}
