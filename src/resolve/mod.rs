//! Bundle glob resolution.
//!
//! Expands the globs of a bundle into an ordered, duplicate-free list of
//! absolute paths. Order is the declaration order of the globs; inside one
//! glob, matches follow a sorted directory walk so the result never depends
//! on filesystem enumeration order.
//!
//! Resolution never fails: a glob that matches nothing, or that cannot be
//! parsed, contributes no files.

use jwalk::WalkDir;
use rustc_hash::FxHashSet;
use std::path::{Path, PathBuf};
use wax::{CandidatePath, Glob, Pattern};

use crate::debug;
use crate::manifest::{Bundle, Paths};
use crate::utils::path::to_slash;

/// Files of one bundle for the current build.
#[derive(Debug, Clone)]
pub struct ResolvedAsset {
    pub bundle: Bundle,
    /// Absolute paths in concatenation order. May be empty.
    pub files: Vec<PathBuf>,
}

/// A glob match together with its path below the glob's literal prefix.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Matched {
    pub path: PathBuf,
    /// For `images/**/*` matching `images/icons/a.png`: `icons/a.png`.
    pub relative: PathBuf,
}

/// Resolve a bundle: vendor globs (project root) first, then first-party
/// globs (source dir).
pub fn resolve_bundle(bundle: &Bundle, paths: &Paths) -> ResolvedAsset {
    let mut seen = FxHashSet::default();
    let mut files = Vec::new();

    let vendor = bundle.vendor.iter().map(|g| (paths.root.as_path(), g));
    let own = bundle.files.iter().map(|g| (paths.source.as_path(), g));

    for (base, glob) in vendor.chain(own) {
        for matched in expand(base, glob) {
            if seen.insert(matched.path.clone()) {
                files.push(matched.path);
            }
        }
    }

    if files.is_empty() {
        debug!("resolve"; "bundle `{}` matched no files", bundle.name);
    }

    ResolvedAsset {
        bundle: bundle.clone(),
        files,
    }
}

/// Resolve globs relative to `base`, in order, without duplicates.
pub fn resolve_globs(base: &Path, globs: &[String]) -> Vec<PathBuf> {
    resolve_with_base(base, globs)
        .into_iter()
        .map(|m| m.path)
        .collect()
}

/// Like [`resolve_globs`], keeping each match's path relative to the
/// literal prefix of the glob that produced it.
pub fn resolve_with_base(base: &Path, globs: &[String]) -> Vec<Matched> {
    let mut seen = FxHashSet::default();
    globs
        .iter()
        .flat_map(|glob| expand(base, glob))
        .filter(|m| seen.insert(m.path.clone()))
        .collect()
}

/// Expand a single glob.
fn expand(base: &Path, glob: &str) -> Vec<Matched> {
    let (prefix, pattern) = split_literal_prefix(glob);
    let root = base.join(&prefix);

    let Some(pattern) = pattern else {
        // Literal path
        if root.is_file() {
            let relative = root.file_name().map(PathBuf::from).unwrap_or_default();
            return vec![Matched {
                path: root,
                relative,
            }];
        }
        debug!("resolve"; "`{}` does not exist", glob);
        return Vec::new();
    };

    let compiled = match Glob::new(&pattern) {
        Ok(g) => g,
        Err(err) => {
            debug!("resolve"; "invalid glob `{}`: {}", glob, err);
            return Vec::new();
        }
    };

    if !root.is_dir() {
        debug!("resolve"; "`{}` matched nothing", glob);
        return Vec::new();
    }

    let matches: Vec<_> = WalkDir::new(&root)
        .sort(true)
        .into_iter()
        .filter_map(Result::ok)
        .filter(|e| e.file_type().is_file())
        .filter_map(|e| {
            let path = e.path();
            let relative = path.strip_prefix(&root).ok()?.to_path_buf();
            let candidate = to_slash(&relative);
            compiled
                .matched(&CandidatePath::from(candidate.as_str()))
                .is_some()
                .then_some(Matched { path, relative })
        })
        .collect();

    if matches.is_empty() {
        debug!("resolve"; "`{}` matched nothing", glob);
    }
    matches
}

fn is_glob_component(component: &str) -> bool {
    component.contains(['*', '?', '[', '{', '<'])
}

/// Split `a/b/**/*.css` into (`a/b`, `Some("**/*.css")`).
///
/// Returns `None` for the pattern when the whole glob is a literal path.
fn split_literal_prefix(glob: &str) -> (PathBuf, Option<String>) {
    let components: Vec<&str> = glob.split('/').filter(|c| !c.is_empty()).collect();
    let first_glob = components.iter().position(|c| is_glob_component(c));

    let mut prefix = PathBuf::new();
    if glob.starts_with('/') {
        prefix.push("/");
    }

    match first_glob {
        None => {
            prefix.extend(&components);
            (prefix, None)
        }
        Some(idx) => {
            prefix.extend(&components[..idx]);
            (prefix, Some(components[idx..].join("/")))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::manifest::BundleKind;
    use std::fs;
    use tempfile::TempDir;

    fn touch(root: &Path, rel: &str) -> PathBuf {
        let path = root.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, rel).unwrap();
        path
    }

    fn paths(root: &Path) -> Paths {
        Paths {
            root: root.to_path_buf(),
            source: root.join("assets"),
            dist: root.join("static/dist"),
            local: root.join("static/local"),
            templates: root.join("templates"),
        }
    }

    fn names(files: &[PathBuf], root: &Path) -> Vec<String> {
        files
            .iter()
            .map(|f| to_slash(f.strip_prefix(root).unwrap()))
            .collect()
    }

    #[test]
    fn test_split_literal_prefix() {
        assert_eq!(
            split_literal_prefix("images/**/*"),
            (PathBuf::from("images"), Some("**/*".to_string()))
        );
        assert_eq!(
            split_literal_prefix("styles/main.less"),
            (PathBuf::from("styles/main.less"), None)
        );
        assert_eq!(
            split_literal_prefix("*.js"),
            (PathBuf::new(), Some("*.js".to_string()))
        );
    }

    #[test]
    fn test_order_preserved_across_globs() {
        let dir = TempDir::new().unwrap();
        let root = dir.path();
        touch(root, "scripts/b.js");
        touch(root, "scripts/a.js");
        touch(root, "scripts/vendor/z.js");

        let globs = vec!["scripts/vendor/*.js".to_string(), "scripts/*.js".to_string()];
        let files = resolve_globs(root, &globs);
        assert_eq!(
            names(&files, root),
            ["scripts/vendor/z.js", "scripts/a.js", "scripts/b.js"]
        );
    }

    #[test]
    fn test_duplicates_keep_first() {
        let dir = TempDir::new().unwrap();
        let root = dir.path();
        touch(root, "scripts/main.js");
        touch(root, "scripts/util.js");

        let globs = vec!["scripts/main.js".to_string(), "scripts/*.js".to_string()];
        let files = resolve_globs(root, &globs);
        assert_eq!(names(&files, root), ["scripts/main.js", "scripts/util.js"]);
    }

    #[test]
    fn test_unmatched_and_invalid_globs_are_empty() {
        let dir = TempDir::new().unwrap();
        let root = dir.path();
        touch(root, "styles/a.css");

        assert!(resolve_globs(root, &["missing/**/*.css".to_string()]).is_empty());
        assert!(resolve_globs(root, &["styles/*.scss".to_string()]).is_empty());
        assert!(resolve_globs(root, &["styles/[.css".to_string()]).is_empty());
        assert!(resolve_globs(root, &["styles/missing.css".to_string()]).is_empty());
    }

    #[test]
    fn test_recursive_glob_is_sorted() {
        let dir = TempDir::new().unwrap();
        let root = dir.path();
        touch(root, "images/b.png");
        touch(root, "images/a.png");
        touch(root, "images/icons/c.svg");

        let matched = resolve_with_base(root, &["images/**/*".to_string()]);
        let relative: Vec<_> = matched.iter().map(|m| to_slash(&m.relative)).collect();
        assert_eq!(relative, ["a.png", "b.png", "icons/c.svg"]);
    }

    #[test]
    fn test_bundle_vendor_first() {
        let dir = TempDir::new().unwrap();
        let root = dir.path();
        touch(root, "assets/styles/main.scss");
        touch(root, "bower_components/normalize.css/normalize.css");

        let mut bundle = Bundle::new("main.css", BundleKind::Style, vec!["styles/*.scss".into()]);
        bundle.vendor = vec!["bower_components/normalize.css/normalize.css".into()];

        let resolved = resolve_bundle(&bundle, &paths(root));
        assert_eq!(
            names(&resolved.files, root),
            [
                "bower_components/normalize.css/normalize.css",
                "assets/styles/main.scss"
            ]
        );
    }

    #[test]
    fn test_bundle_with_no_matches_is_empty() {
        let dir = TempDir::new().unwrap();
        let bundle = Bundle::new("main.js", BundleKind::Script, vec!["scripts/*.js".into()]);
        let resolved = resolve_bundle(&bundle, &paths(dir.path()));
        assert!(resolved.files.is_empty());
    }
}
