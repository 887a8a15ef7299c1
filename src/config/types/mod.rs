//! Configuration error types.

mod error;

pub use error::{ConfigDiagnostics, ConfigError};
