//! Freshness detection from modification timestamps.

pub mod mtime;

pub use mtime::is_stale;
