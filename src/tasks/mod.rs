//! Task bodies.
//!
//! | task         | does                                                  |
//! |--------------|-------------------------------------------------------|
//! | `clean`      | remove the build directory                            |
//! | `inject`     | regenerate third-party import blocks in style sources |
//! | `lint`       | syntax-check first-party scripts                      |
//! | `preprocess` | run `compile` rules into the source tree              |
//! | `styles`     | build style bundles                                   |
//! | `scripts`    | build script bundles                                  |
//! | `fonts`      | copy fonts (flattened)                                |
//! | `images`     | copy and optimize images                              |
//! | `rewrite`    | point template references at revisioned files         |

pub mod assets;
pub mod bundles;
pub mod compile;
pub mod inject;
pub mod lint;

use std::fs;
use std::path::Path;

use crate::config::BuildConfig;
use crate::error::{BuildError, BuildResult};
use crate::manifest::{BundleKind, Manifest};
use crate::pipeline::{PipelineContext, Registry};
use crate::rewrite::{RevisionMap, rewrite_templates};
use crate::{debug, log};

/// Everything a task needs: the manifest, the build mode and the
/// preprocessors, built once per run.
#[derive(Debug)]
pub struct TaskContext {
    pub manifest: Manifest,
    pub config: BuildConfig,
    pub registry: Registry,
}

impl TaskContext {
    /// Context with the default preprocessors plus the manifest's overrides.
    pub fn new(manifest: Manifest, config: BuildConfig) -> Self {
        let registry = Registry::with_overrides(&manifest.preprocessors);
        Self::with_registry(manifest, config, registry)
    }

    pub fn with_registry(manifest: Manifest, config: BuildConfig, registry: Registry) -> Self {
        Self {
            manifest,
            config,
            registry,
        }
    }

    pub fn build_dir(&self) -> &Path {
        self.config.build_dir(&self.manifest.paths)
    }

    pub fn pipeline(&self) -> PipelineContext<'_> {
        PipelineContext::new(self.config, &self.manifest, &self.registry)
    }
}

/// Remove the build directory. A missing directory is not an error.
pub fn clean(ctx: &TaskContext) -> BuildResult<()> {
    let dir = ctx.build_dir();
    match fs::remove_dir_all(dir) {
        Ok(()) => {
            log!("clean"; "removed {}", ctx.manifest.paths.root_relative(dir));
            Ok(())
        }
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            debug!("clean"; "{} does not exist", dir.display());
            Ok(())
        }
        Err(err) => Err(BuildError::io(dir, err)),
    }
}

pub fn styles(ctx: &TaskContext) -> BuildResult<()> {
    bundles::run(ctx, BundleKind::Style).map(drop)
}

pub fn scripts(ctx: &TaskContext) -> BuildResult<()> {
    bundles::run(ctx, BundleKind::Script).map(drop)
}

/// Merge every ledger in the build dir and rewrite the templates.
pub fn rewrite(ctx: &TaskContext) -> BuildResult<()> {
    let manifests = RevisionMap::manifests_in(ctx.build_dir())?;
    let map = RevisionMap::from_manifests(&manifests)?;
    rewrite_templates(&map, &ctx.manifest.paths.templates)?;
    Ok(())
}
