//! Mtime-based staleness of build outputs.
//!
//! An output is reused only when it is strictly newer than its input; equal
//! timestamps count as stale.

use std::path::Path;
use std::time::SystemTime;

/// Decide whether `output` must be regenerated from `input`.
///
/// - `force` always rebuilds.
/// - A failed stat of either side (missing output, unreadable input) rebuilds.
/// - Otherwise rebuilds unless `input.mtime < output.mtime`.
pub fn is_stale(input: &Path, output: &Path, force: bool) -> bool {
    if force {
        return true;
    }

    let (Some(input_time), Some(output_time)) = (get_mtime(input), get_mtime(output)) else {
        return true;
    };
    input_time >= output_time
}

/// Get the modification time of a file
///
/// Returns `None` if the file doesn't exist or mtime cannot be read
pub fn get_mtime(path: &Path) -> Option<SystemTime> {
    path.metadata().and_then(|m| m.modified()).ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::{self, File};
    use std::time::Duration;
    use tempfile::TempDir;

    fn set_mtime(path: &Path, time: SystemTime) {
        File::options()
            .write(true)
            .open(path)
            .unwrap()
            .set_modified(time)
            .unwrap();
    }

    fn pair(dir: &TempDir) -> (std::path::PathBuf, std::path::PathBuf) {
        let input = dir.path().join("index.md");
        let output = dir.path().join("index.html");
        fs::write(&input, "# hi").unwrap();
        fs::write(&output, "<h1>hi</h1>").unwrap();
        (input, output)
    }

    #[test]
    fn test_output_newer_is_fresh() {
        let dir = TempDir::new().unwrap();
        let (input, output) = pair(&dir);
        let base = SystemTime::now() - Duration::from_secs(60);
        set_mtime(&input, base);
        set_mtime(&output, base + Duration::from_secs(10));

        assert!(!is_stale(&input, &output, false));
    }

    #[test]
    fn test_input_newer_is_stale() {
        let dir = TempDir::new().unwrap();
        let (input, output) = pair(&dir);
        let base = SystemTime::now() - Duration::from_secs(60);
        set_mtime(&output, base);
        set_mtime(&input, base + Duration::from_secs(10));

        assert!(is_stale(&input, &output, false));
    }

    #[test]
    fn test_equal_mtime_is_stale() {
        let dir = TempDir::new().unwrap();
        let (input, output) = pair(&dir);
        let base = SystemTime::now() - Duration::from_secs(60);
        set_mtime(&input, base);
        set_mtime(&output, base);

        assert!(is_stale(&input, &output, false));
    }

    #[test]
    fn test_missing_output_is_stale() {
        let dir = TempDir::new().unwrap();
        let input = dir.path().join("index.md");
        fs::write(&input, "# hi").unwrap();

        assert!(is_stale(&input, &dir.path().join("index.html"), false));
    }

    #[test]
    fn test_missing_input_is_stale() {
        let dir = TempDir::new().unwrap();
        let output = dir.path().join("index.html");
        fs::write(&output, "x").unwrap();

        assert!(is_stale(&dir.path().join("index.md"), &output, false));
    }

    #[test]
    fn test_force_overrides_fresh_output() {
        let dir = TempDir::new().unwrap();
        let (input, output) = pair(&dir);
        let base = SystemTime::now() - Duration::from_secs(60);
        set_mtime(&input, base);
        set_mtime(&output, base + Duration::from_secs(10));

        assert!(is_stale(&input, &output, true));
    }
}
