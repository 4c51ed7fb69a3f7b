//! Standalone preprocessing (`compile` rules).
//!
//! Compiles matching sources into plain `.js`/`.css` files inside the source
//! tree, where bundles pick them up like any hand-written file. Outputs are
//! only written when their content changes, which keeps the watcher from
//! rebuilding in a loop.

use rayon::prelude::*;
use std::fs;
use std::path::{Path, PathBuf};

use super::TaskContext;
use crate::error::{BuildError, BuildResult};
use crate::manifest::CompileRule;
use crate::pipeline::Registry;
use crate::resolve::resolve_globs;
use crate::utils::plural_count;
use crate::{debug, log};

/// Output path of `source` under `to_dir`.
fn output_path(source: &Path, to_dir: &Path, ext: &str) -> Option<PathBuf> {
    let stem = source.file_stem()?.to_str()?;
    Some(to_dir.join(format!("{stem}.{ext}")))
}

/// Compile one file, returning whether the output changed.
fn compile_file(
    registry: &Registry,
    rule: &CompileRule,
    source: &Path,
    to_dir: &Path,
    strict: bool,
) -> BuildResult<bool> {
    let Some(preprocessor) = registry.lookup(source) else {
        debug!("compile"; "no preprocessor for {}", source.display());
        return Ok(false);
    };
    let Some(output) = output_path(source, to_dir, preprocessor.output_ext()) else {
        return Ok(false);
    };

    let text = fs::read_to_string(source).map_err(|err| BuildError::io(source, err))?;
    let compiled = match preprocessor.compile(source, &text) {
        Ok(compiled) => compiled,
        Err(err) if strict => {
            return Err(BuildError::Preprocess {
                bundle: rule.from.clone(),
                source: err,
            });
        }
        Err(err) => {
            log!("warning"; "{}", err);
            return Ok(false);
        }
    };

    if fs::read_to_string(&output).is_ok_and(|old| old == compiled) {
        return Ok(false);
    }
    fs::create_dir_all(to_dir).map_err(|err| BuildError::io(to_dir, err))?;
    fs::write(&output, compiled).map_err(|err| BuildError::io(&output, err))?;
    Ok(true)
}

/// Run every `compile` rule of the manifest.
pub fn run(ctx: &TaskContext) -> BuildResult<()> {
    let source_dir = &ctx.manifest.paths.source;
    let strict = ctx.config.strict();
    let mut written = 0;

    for rule in &ctx.manifest.compile {
        let to_dir = source_dir.join(&rule.to);
        let files = resolve_globs(source_dir, std::slice::from_ref(&rule.from));
        let changed = files
            .par_iter()
            .map(|file| compile_file(&ctx.registry, rule, file, &to_dir, strict))
            .collect::<BuildResult<Vec<bool>>>()?;
        written += changed.into_iter().filter(|c| *c).count();
    }

    if written > 0 {
        log!("compile"; "wrote {}", plural_count(written, "file"));
    }
    Ok(())
}
