//! Actor Message Definitions
//!
//! ```text
//! FsActor --ChangeEvent--> Coordinator --Broadcast--> HubActor --Payload--> clients
//!                                                        ^
//!                              dev server --Register/Unregister
//! ```

use crossbeam::channel::Sender;

/// Identifies one live-reload connection.
pub type ClientId = u64;

/// Text frame pushed to browsers after every rebuild attempt.
pub const RELOAD_PAYLOAD: &str = "update";

/// Messages to the Hub Actor
#[derive(Debug)]
pub enum HubMsg {
    /// Attach a client; the hub owns `tx` until eviction.
    Register { id: ClientId, tx: Sender<String> },
    /// Detach a client whose connection failed.
    Unregister(ClientId),
    /// Push a payload to every registered client.
    Broadcast(String),
}
