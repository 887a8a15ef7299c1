//! Live-Reload Hub Actor
//!
//! Owns the set of connected browser sessions and fans broadcasts out to
//! them. The client map is touched only inside the actor loop.
//!
//! # Architecture
//!
//! ```text
//! Coordinator --Broadcast--> HubActor --try_send--> [client queue] --> connection thread --> browser
//!                               ^
//!    connection thread --Register/Unregister
//! ```
//!
//! Every client has its own bounded queue. Delivery never blocks the hub: a
//! full queue is treated like a closed one and the client is evicted in the
//! same pass. Dropping the queue sender is how the hub tells a connection
//! thread to close.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use crossbeam::channel::{self, Receiver, Sender, TrySendError};
use rustc_hash::FxHashMap;
use tokio::sync::mpsc;

use super::messages::{ClientId, HubMsg};
use crate::core::Shutdown;

#[cfg(test)]
mod tests;

/// Buffer of the hub's inbox.
pub const CHANNEL_BUFFER: usize = 32;

/// Payloads a client may have pending before it counts as stuck.
pub const CLIENT_QUEUE: usize = 8;

/// Loop input; cancellation is polled first.
enum Input {
    Cancel,
    Msg(HubMsg),
    Closed,
}

/// Hub Actor - manages client queues and broadcasts
pub struct HubActor {
    rx: mpsc::Receiver<HubMsg>,
    clients: FxHashMap<ClientId, Sender<String>>,
    shutdown: Shutdown,
}

impl HubActor {
    /// Create the actor and a handle for talking to it.
    pub fn new(shutdown: Shutdown) -> (Self, HubHandle) {
        let (tx, rx) = mpsc::channel(CHANNEL_BUFFER);
        let actor = Self {
            rx,
            clients: FxHashMap::default(),
            shutdown,
        };
        let handle = HubHandle {
            tx,
            next_id: Arc::new(AtomicU64::new(1)),
        };
        (actor, handle)
    }

    /// Run the actor event loop until shutdown.
    pub async fn run(mut self) {
        loop {
            let input = tokio::select! {
                biased;
                _ = self.shutdown.cancelled() => Input::Cancel,
                msg = self.rx.recv() => msg.map_or(Input::Closed, Input::Msg),
            };

            match input {
                Input::Cancel | Input::Closed => break,
                Input::Msg(msg) => self.handle(msg),
            }
        }

        // Dropping every sender wakes each connection thread with Disconnected.
        let count = self.clients.len();
        self.clients.clear();
        crate::debug!("hub"; "stopped, released {} clients", count);
    }

    fn handle(&mut self, msg: HubMsg) {
        match msg {
            HubMsg::Register { id, tx } => {
                self.clients.insert(id, tx);
                crate::debug!("hub"; "client {} connected ({} total)", id, self.clients.len());
            }
            HubMsg::Unregister(id) => {
                if self.clients.remove(&id).is_some() {
                    crate::debug!("hub"; "client {} disconnected", id);
                }
            }
            HubMsg::Broadcast(payload) => {
                let delivered = self.broadcast(&payload);
                crate::debug!("hub"; "broadcast `{}` to {} clients", payload, delivered);
            }
        }
    }

    /// Push `payload` to every client, evicting full or closed ones.
    fn broadcast(&mut self, payload: &str) -> usize {
        self.clients.retain(|id, tx| match tx.try_send(payload.to_owned()) {
            Ok(()) => true,
            Err(TrySendError::Full(_)) => {
                crate::debug!("hub"; "evicting client {}: queue full", id);
                false
            }
            Err(TrySendError::Disconnected(_)) => {
                crate::debug!("hub"; "evicting client {}: closed", id);
                false
            }
        });
        self.clients.len()
    }
}

// =============================================================================
// Handle
// =============================================================================

/// Cloneable sending side of the hub.
///
/// Async methods are for the coordinator; `_blocking` variants are for the
/// dev server's plain threads and must not be called from inside the runtime.
#[derive(Clone)]
pub struct HubHandle {
    tx: mpsc::Sender<HubMsg>,
    next_id: Arc<AtomicU64>,
}

impl HubHandle {
    fn new_client(&self) -> (ClientId, Sender<String>, Receiver<String>) {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let (tx, rx) = channel::bounded(CLIENT_QUEUE);
        (id, tx, rx)
    }

    /// Register a new client. `None` once the hub has stopped.
    pub async fn register(&self) -> Option<(ClientId, Receiver<String>)> {
        let (id, tx, rx) = self.new_client();
        self.tx.send(HubMsg::Register { id, tx }).await.ok()?;
        Some((id, rx))
    }

    pub fn register_blocking(&self) -> Option<(ClientId, Receiver<String>)> {
        let (id, tx, rx) = self.new_client();
        self.tx.blocking_send(HubMsg::Register { id, tx }).ok()?;
        Some((id, rx))
    }

    pub fn unregister_blocking(&self, id: ClientId) {
        let _ = self.tx.blocking_send(HubMsg::Unregister(id));
    }

    /// Queue a broadcast. Returns `false` once the hub has stopped.
    pub async fn broadcast(&self, payload: &str) -> bool {
        self.tx
            .send(HubMsg::Broadcast(payload.to_owned()))
            .await
            .is_ok()
    }
}
