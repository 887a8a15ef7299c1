use std::path::PathBuf;

use thiserror::Error;

/// What happened to a path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    Create,
    Write,
    Remove,
    Rename,
}

impl Operation {
    pub fn label(self) -> &'static str {
        match self {
            Self::Create => "created",
            Self::Write => "written",
            Self::Remove => "removed",
            Self::Rename => "renamed",
        }
    }
}

/// One normalized filesystem change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeEvent {
    pub path: PathBuf,
    pub operation: Operation,
}

impl ChangeEvent {
    pub fn new(path: impl Into<PathBuf>, operation: Operation) -> Self {
        Self {
            path: path.into(),
            operation,
        }
    }

    /// Only content writes trigger a rebuild.
    pub fn is_actionable(&self) -> bool {
        self.operation == Operation::Write
    }
}

#[derive(Debug, Error)]
pub enum WatchError {
    #[error("cannot watch `{}`", path.display())]
    Register {
        path: PathBuf,
        #[source]
        source: notify::Error,
    },

    #[error("failed to walk `{}`", path.display())]
    Walk {
        path: PathBuf,
        #[source]
        source: jwalk::Error,
    },

    #[error("watcher failed")]
    Notify(#[from] notify::Error),
}
