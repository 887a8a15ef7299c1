//! Raw notify events → `(path, Operation)` pairs.

use std::path::{Path, PathBuf};

use notify::{EventKind, event::ModifyKind};

use super::types::Operation;

/// Check if path is a temp/backup file (editor artifacts)
pub(super) fn is_temp_file(path: &Path) -> bool {
    let name = path.file_name().and_then(|n| n.to_str()).unwrap_or("");
    let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("");

    matches!(ext, "bak" | "swp" | "swo" | "swx" | "tmp")
        || name.ends_with('~')
        || name.starts_with(".#")
        // vim probes directory writability with this name
        || name == "4913"
}

/// Map a notify event kind onto an operation.
///
/// Metadata-only changes and reads map to `None`.
pub(super) fn operation_of(kind: &EventKind) -> Option<Operation> {
    match kind {
        EventKind::Create(_) => Some(Operation::Create),
        EventKind::Remove(_) => Some(Operation::Remove),
        EventKind::Modify(ModifyKind::Name(_)) => Some(Operation::Rename),
        // mtime/atime/chmod noise may trigger endless rebuild loops
        EventKind::Modify(ModifyKind::Metadata(_)) => None,
        EventKind::Modify(_) => Some(Operation::Write),
        EventKind::Access(_) | EventKind::Any | EventKind::Other => None,
    }
}

/// Flatten one notify event into per-path operations, dropping editor artifacts.
pub(super) fn normalize(event: &notify::Event) -> Vec<(PathBuf, Operation)> {
    let Some(operation) = operation_of(&event.kind) else {
        return Vec::new();
    };

    event
        .paths
        .iter()
        .filter(|path| !is_temp_file(path))
        .map(|path| (path.clone(), operation))
        .collect()
}
