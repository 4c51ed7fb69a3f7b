//! Build configuration derived from the `--production` flag.
//!
//! Every behavior toggle is a function of a single boolean, so there is no
//! way to ask for minified output with source maps, or revisioned names
//! without minification.
//!
//! | toggle        | production | development |
//! |---------------|------------|-------------|
//! | `revision`    | yes        | no          |
//! | `minify`      | yes        | no          |
//! | `strip_debug` | yes        | no          |
//! | `strict`      | yes        | no          |
//! | `source_maps` | no         | yes         |
//! | build dir     | `dist`     | `local`     |

use serde::Serialize;
use std::path::Path;

use crate::manifest::Paths;

/// Immutable build configuration, computed once at startup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BuildConfig {
    production: bool,
}

impl BuildConfig {
    pub const PRODUCTION: Self = Self { production: true };
    pub const DEVELOPMENT: Self = Self { production: false };

    pub const fn new(production: bool) -> Self {
        Self { production }
    }

    #[inline]
    pub const fn production(&self) -> bool {
        self.production
    }

    /// Append a content hash to bundle filenames.
    #[inline]
    pub const fn revision(&self) -> bool {
        self.production
    }

    #[inline]
    pub const fn minify(&self) -> bool {
        self.production
    }

    /// Drop `debugger` statements from scripts.
    #[inline]
    pub const fn strip_debug(&self) -> bool {
        self.production
    }

    /// Fail on preprocessor errors and lint problems instead of warning.
    #[inline]
    pub const fn strict(&self) -> bool {
        self.production
    }

    #[inline]
    pub const fn source_maps(&self) -> bool {
        !self.production
    }

    /// Output directory for this mode.
    pub fn build_dir<'a>(&self, paths: &'a Paths) -> &'a Path {
        if self.production {
            &paths.dist
        } else {
            &paths.local
        }
    }

    /// Flattened toggles, for `show`.
    pub fn summary(&self) -> ConfigSummary {
        ConfigSummary {
            production: self.production(),
            revision: self.revision(),
            minify: self.minify(),
            strip_debug: self.strip_debug(),
            strict: self.strict(),
            source_maps: self.source_maps(),
        }
    }
}

/// Serializable view of the derived toggles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ConfigSummary {
    pub production: bool,
    pub revision: bool,
    pub minify: bool,
    pub strip_debug: bool,
    pub strict: bool,
    pub source_maps: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn paths() -> Paths {
        Paths {
            root: PathBuf::from("/site"),
            source: PathBuf::from("/site/assets"),
            dist: PathBuf::from("/site/static/dist"),
            local: PathBuf::from("/site/static/local"),
            templates: PathBuf::from("/site/templates"),
        }
    }

    #[test]
    fn test_toggles_follow_production() {
        let prod = BuildConfig::PRODUCTION;
        assert!(prod.revision() && prod.minify() && prod.strip_debug() && prod.strict());
        assert!(!prod.source_maps());

        let dev = BuildConfig::new(false);
        assert_eq!(dev, BuildConfig::DEVELOPMENT);
        assert!(!dev.revision() && !dev.minify() && !dev.strip_debug() && !dev.strict());
        assert!(dev.source_maps());
    }

    #[test]
    fn test_build_dir() {
        let paths = paths();
        assert_eq!(BuildConfig::PRODUCTION.build_dir(&paths), Path::new("/site/static/dist"));
        assert_eq!(BuildConfig::DEVELOPMENT.build_dir(&paths), Path::new("/site/static/local"));
    }

    #[test]
    fn test_summary_matches_toggles() {
        let summary = BuildConfig::DEVELOPMENT.summary();
        assert!(!summary.minify);
        assert!(summary.source_maps);
    }
}
