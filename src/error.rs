//! Build error types.
//!
//! `ManifestError` lives with the manifest loader; everything raised while
//! tasks run is a [`BuildError`].

use std::path::PathBuf;
use thiserror::Error;

use crate::orchestrator::TaskId;

/// Failure of an external or in-process preprocessor for one file.
#[derive(Debug, Error)]
pub enum PreprocessError {
    #[error("`{tool}` not found in PATH (needed for .{ext} files)")]
    MissingTool { tool: String, ext: String },

    #[error("failed to compile `{}`: {message}", path.display())]
    Failed { path: PathBuf, message: String },

    #[error("`{}` produced non UTF-8 output", path.display())]
    Utf8 { path: PathBuf },
}

/// Errors that abort a task (and with it, the run).
#[derive(Debug, Error)]
pub enum BuildError {
    #[error("IO error at `{}`", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("bundle `{bundle}`: {source}")]
    Preprocess {
        bundle: String,
        #[source]
        source: PreprocessError,
    },

    #[error("bundle `{bundle}`: {message}")]
    Css { bundle: String, message: String },

    #[error("bundle `{bundle}`: {message}")]
    Script { bundle: String, message: String },

    #[error("lint reported {0} problem(s)")]
    Lint(usize),

    #[error("invalid revision manifest `{}`", path.display())]
    Ledger {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("task dependency cycle between: {}", .0.iter().map(|t| t.name()).collect::<Vec<_>>().join(", "))]
    Cycle(Vec<TaskId>),

    #[error("unknown task `{0}`")]
    UnknownTask(String),

    #[error("task `{}` failed", .task.name())]
    Task {
        task: TaskId,
        #[source]
        source: Box<BuildError>,
    },
}

impl BuildError {
    /// Wrap an IO error with the path it happened at.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Attribute this error to a task.
    pub fn in_task(self, task: TaskId) -> Self {
        Self::Task {
            task,
            source: Box::new(self),
        }
    }
}

/// Shorthand for results of build operations.
pub type BuildResult<T> = Result<T, BuildError>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as _;
    use std::io::{Error, ErrorKind};

    #[test]
    fn test_io_error_display() {
        let err = BuildError::io("static/dist", Error::new(ErrorKind::PermissionDenied, "denied"));
        let display = format!("{err}");
        assert!(display.contains("IO error"));
        assert!(display.contains("static/dist"));
    }

    #[test]
    fn test_task_error_keeps_source() {
        let err = BuildError::Lint(2).in_task(TaskId::Lint);
        assert_eq!(format!("{err}"), "task `lint` failed");
        let source = err.source().expect("task error has a source");
        assert!(source.to_string().contains("2 problem"));
    }

    #[test]
    fn test_cycle_lists_tasks() {
        let err = BuildError::Cycle(vec![TaskId::Styles, TaskId::Inject]);
        assert_eq!(
            format!("{err}"),
            "task dependency cycle between: styles, inject"
        );
    }

    #[test]
    fn test_preprocess_missing_tool() {
        let err = PreprocessError::MissingTool {
            tool: "lessc".into(),
            ext: "less".into(),
        };
        assert!(err.to_string().contains("lessc"));
    }
}
