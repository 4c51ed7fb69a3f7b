//! Syntax check of first-party scripts.

use oxc::allocator::Allocator;
use oxc::parser::Parser;
use oxc::span::SourceType;
use rayon::prelude::*;
use std::fs;
use std::path::{Path, PathBuf};

use super::TaskContext;
use crate::error::{BuildError, BuildResult};
use crate::log;
use crate::manifest::BundleKind;
use crate::resolve::resolve_globs;
use crate::utils::plural_count;

/// A problem found in one file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LintProblem {
    pub path: PathBuf,
    pub message: String,
}

/// Parse `source` and return its syntax errors.
pub fn lint_source(path: &Path, source: &str) -> Vec<LintProblem> {
    let allocator = Allocator::default();
    let ret = Parser::new(&allocator, source, SourceType::cjs()).parse();
    ret.errors
        .iter()
        .map(|err| LintProblem {
            path: path.to_path_buf(),
            message: err.to_string(),
        })
        .collect()
}

/// First-party `.js` files of every script bundle, without duplicates.
fn lint_targets(ctx: &TaskContext) -> Vec<PathBuf> {
    let paths = &ctx.manifest.paths;
    let mut files: Vec<PathBuf> = ctx
        .manifest
        .bundles_of(BundleKind::Script)
        .flat_map(|b| resolve_globs(&paths.source, &b.files))
        .filter(|p| p.extension().is_some_and(|e| e == "js"))
        .collect();
    files.sort();
    files.dedup();
    files
}

/// Report syntax errors; in strict mode any problem fails the task.
pub fn run(ctx: &TaskContext) -> BuildResult<()> {
    let files = lint_targets(ctx);
    let problems: Vec<LintProblem> = files
        .par_iter()
        .map(|path| {
            let source = fs::read_to_string(path).map_err(|err| BuildError::io(path, err))?;
            Ok(lint_source(path, &source))
        })
        .collect::<BuildResult<Vec<_>>>()?
        .into_iter()
        .flatten()
        .collect();

    let root = &ctx.manifest.paths;
    for problem in &problems {
        log!("lint"; "{}: {}", root.root_relative(&problem.path), problem.message);
    }

    if problems.is_empty() {
        return Ok(());
    }
    if ctx.config.strict() {
        return Err(BuildError::Lint(problems.len()));
    }
    log!("warning"; "{} in {}", plural_count(problems.len(), "lint problem"), plural_count(files.len(), "file"));
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clean_source() {
        let problems = lint_source(Path::new("a.js"), "var a = 1;\nfunction f() { return a; }\n");
        assert!(problems.is_empty());
    }

    #[test]
    fn test_syntax_error_reported() {
        let problems = lint_source(Path::new("a.js"), "function f( {\n");
        assert!(!problems.is_empty());
        assert_eq!(problems[0].path, Path::new("a.js"));
    }
}
