//! Core types shared by the build pipeline and the serve session.

mod driver;
mod state;

pub use driver::BuildMode;
pub use state::{FirstError, Shutdown, install_interrupt_handler};
