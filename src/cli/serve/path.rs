//! URL to filesystem path resolution.

use std::path::{Path, PathBuf};

use percent_encoding::percent_decode_str;

/// File served for a directory URL.
const INDEX_FILE: &str = "index.html";

/// Resolve a request URL to a file under `serve_root`.
///
/// Directories resolve to their `index.html`. Anything that would leave
/// `serve_root` (including through symlinks) resolves to `None`.
pub fn resolve_path(url: &str, serve_root: &Path) -> Option<PathBuf> {
    let clean = url_path(url)?;

    if clean.split('/').any(|segment| segment == "..") {
        return None;
    }

    let canonical = serve_root.join(&clean).canonicalize().ok()?;
    let root_canonical = serve_root.canonicalize().ok()?;
    if !canonical.starts_with(&root_canonical) {
        return None;
    }

    if canonical.is_file() {
        return Some(canonical);
    }

    let index = canonical.join(INDEX_FILE);
    index.is_file().then_some(index)
}

/// Decoded path part of a URL without query, fragment or outer slashes.
///
/// `None` for paths that are not valid UTF-8 after decoding or that contain
/// a NUL byte.
pub fn url_path(url: &str) -> Option<String> {
    let raw = url.split(['?', '#']).next().unwrap_or_default();
    let decoded = percent_decode_str(raw).decode_utf8().ok()?;
    if decoded.contains('\0') {
        return None;
    }
    Some(decoded.replace('\\', "/").trim_matches('/').to_string())
}
