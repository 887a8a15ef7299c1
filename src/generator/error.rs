//! Errors that abort a build pass.

use std::{io, path::PathBuf};

use thiserror::Error;

use crate::source::ClassifyError;

/// A hard failure of one pass. Outputs written earlier in the pass are kept.
#[derive(Debug, Error)]
pub enum BuildError {
    #[error("classify failed")]
    Classify(#[from] ClassifyError),

    #[error("render failed: `{}`\n{detail}", path.display())]
    Render { path: PathBuf, detail: String },

    #[error("copy failed: `{}` -> `{}`", from.display(), to.display())]
    Copy {
        from: PathBuf,
        to: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("cannot create directory `{}`", path.display())]
    CreateDir {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Shutdown arrived mid-pass; stopped before the next item.
    #[error("build cancelled")]
    Cancelled,
}

impl BuildError {
    /// One-line summary for the serve status block.
    pub fn summary(&self) -> String {
        match self {
            Self::Classify(err) => err.to_string(),
            Self::Render { path, .. } => format!("render failed: {}", path.display()),
            Self::Copy { from, .. } => format!("copy failed: {}", from.display()),
            Self::CreateDir { path, .. } => format!("mkdir failed: {}", path.display()),
            Self::Cancelled => self.to_string(),
        }
    }

    /// Remaining detail (renderer stderr or the io cause).
    pub fn detail(&self) -> String {
        match self {
            Self::Classify(err) => std::error::Error::source(err)
                .map(ToString::to_string)
                .unwrap_or_default(),
            Self::Render { detail, .. } => detail.clone(),
            Self::Copy { source, .. } | Self::CreateDir { source, .. } => source.to_string(),
            Self::Cancelled => String::new(),
        }
    }
}
