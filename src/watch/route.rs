//! Which tasks a changed path triggers.

use std::path::{Path, PathBuf};

use crate::manifest::Manifest;
use crate::orchestrator::TaskId;
use crate::utils::path::normalize_path;

/// Result of routing one batch of changes.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Plan {
    /// The manifest itself changed: reload it and run a full build.
    pub reload: bool,
    /// Targets to run, sorted and without duplicates.
    pub targets: Vec<TaskId>,
}

impl Plan {
    pub fn is_empty(&self) -> bool {
        !self.reload && self.targets.is_empty()
    }
}

const STYLES: &[TaskId] = &[TaskId::Styles];
const SCRIPTS: &[TaskId] = &[TaskId::Lint, TaskId::Scripts];
const FONTS: &[TaskId] = &[TaskId::Fonts];
const IMAGES: &[TaskId] = &[TaskId::Images];

/// Watched directory → tasks it triggers.
#[derive(Debug, Clone)]
pub struct Routes {
    manifest: PathBuf,
    dirs: Vec<(PathBuf, &'static [TaskId])>,
}

impl Routes {
    pub fn new(manifest: &Manifest) -> Self {
        let source = normalize_path(&manifest.paths.source);
        let dirs = vec![
            (source.join("styles"), STYLES),
            (source.join("scripts"), SCRIPTS),
            (source.join("fonts"), FONTS),
            (source.join("images"), IMAGES),
        ];
        Self {
            manifest: normalize_path(&manifest.path),
            dirs,
        }
    }

    pub fn manifest(&self) -> &Path {
        &self.manifest
    }

    /// Directories to watch recursively.
    pub fn dirs(&self) -> impl Iterator<Item = &Path> {
        self.dirs.iter().map(|(dir, _)| dir.as_path())
    }

    /// Tasks for one path. Unrelated paths route nowhere.
    pub fn route(&self, path: &Path) -> &'static [TaskId] {
        self.dirs
            .iter()
            .find(|(dir, _)| path.starts_with(dir))
            .map_or(&[], |(_, tasks)| *tasks)
    }

    /// Route a batch of changed paths.
    pub fn plan(&self, paths: &[PathBuf]) -> Plan {
        if paths.iter().any(|p| p == &self.manifest) {
            return Plan {
                reload: true,
                targets: vec![TaskId::Build],
            };
        }
        let mut targets: Vec<TaskId> = paths
            .iter()
            .flat_map(|p| self.route(p).iter().copied())
            .collect();
        targets.sort();
        targets.dedup();
        Plan {
            reload: false,
            targets,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::BuildConfig;
    use crate::tasks::tests::{MANIFEST, Site};

    fn routes(site: &Site) -> Routes {
        Routes::new(&site.context(MANIFEST, BuildConfig::DEVELOPMENT).manifest)
    }

    #[test]
    fn test_route_by_directory() {
        let site = Site::new();
        let routes = routes(&site);
        let source = normalize_path(&site.path("assets"));

        assert_eq!(routes.route(&source.join("styles/main.less")), [TaskId::Styles]);
        assert_eq!(
            routes.route(&source.join("scripts/lib/app.js")),
            [TaskId::Lint, TaskId::Scripts]
        );
        assert_eq!(routes.route(&source.join("fonts/a.woff")), [TaskId::Fonts]);
        assert_eq!(routes.route(&source.join("images/a/b.png")), [TaskId::Images]);
        assert!(routes.route(&source.join("README.md")).is_empty());
    }

    #[test]
    fn test_plan_merges_targets() {
        let site = Site::new();
        let routes = routes(&site);
        let source = normalize_path(&site.path("assets"));

        let plan = routes.plan(&[
            source.join("scripts/b.js"),
            source.join("styles/a.less"),
            source.join("scripts/a.js"),
        ]);
        assert!(!plan.reload);
        assert_eq!(plan.targets, [TaskId::Lint, TaskId::Styles, TaskId::Scripts]);
    }

    #[test]
    fn test_manifest_change_reloads() {
        let site = Site::new();
        let routes = routes(&site);
        let plan = routes.plan(&[
            routes.manifest().to_path_buf(),
            normalize_path(&site.path("assets/styles/a.less")),
        ]);
        assert!(plan.reload);
        assert_eq!(plan.targets, [TaskId::Build]);
    }

    #[test]
    fn test_unrelated_paths_plan_nothing() {
        let site = Site::new();
        let plan = routes(&site).plan(&[site.path("templates/base.html")]);
        assert!(plan.is_empty());
    }
}
