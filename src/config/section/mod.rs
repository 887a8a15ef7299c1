//! Configuration section definitions.
//!
//! Each module corresponds to a section in `dudu.toml`:
//!
//! | Module  | TOML Section | Purpose                                  |
//! |---------|--------------|------------------------------------------|
//! | `build` | `[build]`    | Source/output/resource paths, renderer   |
//! | `serve` | `[serve]`    | Development server                       |

mod build;
mod serve;

pub use build::{BuildSectionConfig, RendererConfig};
pub use serve::ServeConfig;
