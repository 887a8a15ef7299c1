//! Utility modules shared by the build pipeline and the dev server.

pub mod exec;
pub mod mime;
pub mod path;
mod plural;

pub use plural::plural_count;
