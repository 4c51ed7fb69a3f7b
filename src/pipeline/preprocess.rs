//! Preprocessor registry.
//!
//! Preprocessors turn one source language into plain CSS or JavaScript and
//! are looked up by file extension. The defaults shell out to the usual
//! tools; the manifest's `preprocessors` table replaces the command for an
//! extension (or adds a new one).
//!
//! Files whose extension has no preprocessor pass through unchanged.

use rustc_hash::FxHashMap;
use std::path::Path;
use std::sync::Arc;

use crate::error::PreprocessError;
use crate::utils::exec::{Cmd, EMPTY_FILTER, FilterRule, SASS_FILTER};

/// Compiles one source file to CSS or JavaScript.
pub trait Preprocessor: Send + Sync {
    /// Extension of the compiled output (`css` or `js`).
    fn output_ext(&self) -> &'static str;

    /// Compile `source`, read from `path`.
    fn compile(&self, path: &Path, source: &str) -> Result<String, PreprocessError>;
}

/// Default commands. Every one of them reads stdin and writes stdout.
const DEFAULTS: &[(&str, &[&str])] = &[
    ("less", &["lessc", "-"]),
    ("scss", &["sass", "--stdin", "--load-path=."]),
    ("sass", &["sass", "--stdin", "--indented", "--load-path=."]),
    ("coffee", &["coffee", "--bare", "--compile", "--stdio", "--print"]),
];

/// Output extension of a source extension.
fn infer_output_ext(ext: &str) -> &'static str {
    match ext {
        "coffee" | "litcoffee" | "ts" | "jsx" | "tsx" => "js",
        _ => "css",
    }
}

// ============================================================================
// External command
// ============================================================================

/// Preprocessor backed by an external program.
///
/// The source is piped on stdin with the working directory set to the
/// file's directory, so relative `@import`s resolve as they would on disk.
#[derive(Debug, Clone)]
pub struct ExternalPreprocessor {
    ext: String,
    command: Vec<String>,
    output_ext: &'static str,
}

impl ExternalPreprocessor {
    pub fn new(ext: &str, command: Vec<String>) -> Self {
        Self {
            ext: ext.to_string(),
            output_ext: infer_output_ext(ext),
            command,
        }
    }

    fn program(&self) -> &str {
        self.command.first().map(String::as_str).unwrap_or_default()
    }

    fn filter(&self) -> &'static FilterRule {
        if self.program().contains("sass") {
            &SASS_FILTER
        } else {
            &EMPTY_FILTER
        }
    }
}

impl Preprocessor for ExternalPreprocessor {
    fn output_ext(&self) -> &'static str {
        self.output_ext
    }

    fn compile(&self, path: &Path, source: &str) -> Result<String, PreprocessError> {
        let program = self.program();
        if which::which(program).is_err() {
            return Err(PreprocessError::MissingTool {
                tool: program.to_string(),
                ext: self.ext.clone(),
            });
        }

        let mut cmd = Cmd::from_slice(self.command.as_slice())
            .stdin(source)
            .filter(self.filter());
        if let Some(dir) = path.parent()
            && !dir.as_os_str().is_empty()
        {
            cmd = cmd.cwd(dir);
        }

        let output = cmd.run().map_err(|err| PreprocessError::Failed {
            path: path.to_path_buf(),
            message: format!("{err:#}"),
        })?;

        String::from_utf8(output.stdout).map_err(|_| PreprocessError::Utf8 {
            path: path.to_path_buf(),
        })
    }
}

// ============================================================================
// Registry
// ============================================================================

/// Extension → preprocessor lookup.
#[derive(Clone, Default)]
pub struct Registry {
    by_ext: FxHashMap<String, Arc<dyn Preprocessor>>,
}

impl Registry {
    /// Registry with no preprocessors; every file passes through.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Registry with the default external commands.
    pub fn with_defaults() -> Self {
        let mut registry = Self::empty();
        for (ext, command) in DEFAULTS {
            let command = command.iter().map(|s| s.to_string()).collect();
            registry.register(ext, Arc::new(ExternalPreprocessor::new(ext, command)));
        }
        registry
    }

    /// Defaults plus the manifest's overrides.
    pub fn with_overrides<'a>(overrides: impl IntoIterator<Item = (&'a String, &'a Vec<String>)>) -> Self {
        let mut registry = Self::with_defaults();
        for (ext, command) in overrides {
            let ext = ext.trim_start_matches('.');
            registry.register(ext, Arc::new(ExternalPreprocessor::new(ext, command.clone())));
        }
        registry
    }

    pub fn register(&mut self, ext: &str, preprocessor: Arc<dyn Preprocessor>) {
        self.by_ext.insert(ext.to_ascii_lowercase(), preprocessor);
    }

    /// Preprocessor for a path, by extension.
    pub fn lookup(&self, path: &Path) -> Option<&Arc<dyn Preprocessor>> {
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        self.by_ext.get(&ext)
    }

    /// Sorted list of registered extensions.
    pub fn extensions(&self) -> Vec<&str> {
        let mut exts: Vec<_> = self.by_ext.keys().map(String::as_str).collect();
        exts.sort_unstable();
        exts
    }

    /// Compile `source` if a preprocessor handles `path`, else return it as-is.
    pub fn compile(&self, path: &Path, source: String) -> Result<String, PreprocessError> {
        match self.lookup(path) {
            Some(preprocessor) => preprocessor.compile(path, &source),
            None => Ok(source),
        }
    }
}

impl std::fmt::Debug for Registry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Registry")
            .field("extensions", &self.extensions())
            .finish()
    }
}
