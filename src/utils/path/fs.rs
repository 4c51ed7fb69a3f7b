//! Path normalization utilities.
//!
//! - `normalize_path` - file system paths (canonicalize + fallback)
//! - `relative_path` - path of a target as seen from a directory
//! - `to_slash` - forward-slash rendering for manifests and imports

use std::path::{Component, Path, PathBuf};

/// Normalize a file system path to absolute form.
///
/// Tries `canonicalize()` first (resolves symlinks, `.`, `..`).
/// Falls back to:
/// - Return as-is if already absolute
/// - Join with current directory if relative
#[inline]
pub fn normalize_path(path: &Path) -> PathBuf {
    path.canonicalize().unwrap_or_else(|_| {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            std::env::current_dir().map_or_else(|_| path.to_path_buf(), |cwd| cwd.join(path))
        }
    })
}

/// Compute the path of `target` relative to the directory `from`.
///
/// Both paths should be absolute; shared leading components are dropped
/// and each remaining component of `from` becomes a `..`.
pub fn relative_path(from: &Path, target: &Path) -> PathBuf {
    let from: Vec<Component<'_>> = from.components().collect();
    let target: Vec<Component<'_>> = target.components().collect();

    let common = from
        .iter()
        .zip(target.iter())
        .take_while(|(a, b)| a == b)
        .count();

    let mut result = PathBuf::new();
    for _ in common..from.len() {
        result.push("..");
    }
    for component in &target[common..] {
        result.push(component.as_os_str());
    }
    result
}

/// Render a path with forward slashes regardless of platform.
pub fn to_slash(path: &Path) -> String {
    path.components()
        .filter_map(|c| match c {
            Component::Normal(s) => Some(s.to_string_lossy().into_owned()),
            Component::ParentDir => Some("..".to_string()),
            _ => None,
        })
        .collect::<Vec<_>>()
        .join("/")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_path_relative() {
        let normalized = normalize_path(Path::new("relative/path/file.txt"));
        assert!(normalized.is_absolute());
    }

    #[test]
    fn test_relative_path_sibling_dir() {
        let rel = relative_path(
            Path::new("/site/assets/styles"),
            Path::new("/site/bower_components/normalize/normalize.css"),
        );
        assert_eq!(to_slash(&rel), "../../bower_components/normalize/normalize.css");
    }

    #[test]
    fn test_relative_path_child() {
        let rel = relative_path(Path::new("/site"), Path::new("/site/assets/main.css"));
        assert_eq!(to_slash(&rel), "assets/main.css");
    }

    #[test]
    fn test_to_slash() {
        assert_eq!(to_slash(Path::new("styles/main.css")), "styles/main.css");
    }
}
