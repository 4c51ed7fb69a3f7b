//! Mtime-based freshness checks for copied outputs.
//!
//! Images and fonts are copied or re-encoded one-to-one, so comparing the
//! output timestamp against the source is enough to skip unchanged files.

use std::path::Path;
use std::time::SystemTime;

/// Get the modification time of a file
///
/// Returns `None` if the file doesn't exist or mtime cannot be read
pub fn get_mtime(path: &Path) -> Option<SystemTime> {
    path.metadata().and_then(|m| m.modified()).ok()
}

/// Check if `output` exists and is at least as new as `source`
pub fn is_output_fresh(output: &Path, source: &Path) -> bool {
    let (Some(source_time), Some(output_time)) = (get_mtime(source), get_mtime(output)) else {
        return false;
    };
    output_time >= source_time
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::time::Duration;
    use tempfile::TempDir;

    #[test]
    fn test_missing_output_is_stale() {
        let dir = TempDir::new().unwrap();
        let source = dir.path().join("logo.png");
        fs::write(&source, b"png").unwrap();
        assert!(!is_output_fresh(&dir.path().join("out.png"), &source));
    }

    #[test]
    fn test_newer_output_is_fresh() {
        let dir = TempDir::new().unwrap();
        let source = dir.path().join("logo.png");
        let output = dir.path().join("out.png");
        fs::write(&source, b"png").unwrap();
        fs::write(&output, b"png").unwrap();

        let later = SystemTime::now() + Duration::from_secs(60);
        fs::File::options()
            .write(true)
            .open(&output)
            .unwrap()
            .set_modified(later)
            .unwrap();

        assert!(is_output_fresh(&output, &source));
    }
}
