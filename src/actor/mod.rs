//! Actor System for Watch Mode
//!
//! Message-passing concurrency for `dudu serve`:
//!
//! ```text
//! FsActor --> Coordinator --> Generator
//! (watch)     (rebuild)          │
//!                  └──▶ HubActor ──▶ /ws clients
//!                       (broadcast)
//! ```
//!
//! # Module Structure
//!
//! - `messages` - Message types for inter-actor communication
//! - `fs` - Recursive directory watcher with event normalization
//! - `ws` - Live-reload client hub
//! - `coordinator` - Wires up and runs actors

pub mod coordinator;
pub mod fs;
pub mod messages;
pub mod ws;

pub use coordinator::Coordinator;
