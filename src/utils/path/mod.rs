//! Path utilities.
//!
//! Pure functions for path manipulation. No side effects beyond `canonicalize`.

pub mod fs;

pub use fs::{clean_path, normalize_path, to_slash};
