//! Manifest error types.

use owo_colors::OwoColorize;
use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

// ============================================================================
// ManifestError
// ============================================================================

/// Manifest loading errors. All of them abort before any task runs.
#[derive(Debug, Error)]
pub enum ManifestError {
    #[error("manifest `{}` not found", .0.display())]
    NotFound(PathBuf),

    #[error("IO error when reading `{}`", .0.display())]
    Io(PathBuf, #[source] std::io::Error),

    #[error("manifest `{}` is not valid JSON", .0.display())]
    Json(PathBuf, #[source] serde_json::Error),

    #[error("manifest `{}` is not valid TOML", .0.display())]
    Toml(PathBuf, #[source] toml::de::Error),

    // No #[from]: source() would print the diagnostics twice
    #[error("{0}")]
    Invalid(ManifestDiagnostics),
}

// ============================================================================
// ManifestDiagnostic
// ============================================================================

/// A single manifest validation problem
#[derive(Debug, Clone)]
pub struct ManifestDiagnostic {
    /// Field path (e.g., "bundles[2].type")
    pub field: String,
    pub message: String,
    pub hint: Option<String>,
}

impl fmt::Display for ManifestDiagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}{}{}", "[".dimmed(), self.field.cyan(), "]".dimmed())?;
        write!(f, "{} {}", "→".red(), self.message)?;
        if let Some(hint) = &self.hint {
            write!(f, "\n  {} {}", "hint:".yellow(), hint)?;
        }
        Ok(())
    }
}

// ============================================================================
// ManifestDiagnostics
// ============================================================================

/// Collected validation problems, reported together.
#[derive(Debug, Default)]
pub struct ManifestDiagnostics {
    errors: Vec<ManifestDiagnostic>,
}

impl ManifestDiagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn error(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.errors.push(ManifestDiagnostic {
            field: field.into(),
            message: message.into(),
            hint: None,
        });
    }

    pub fn error_with_hint(
        &mut self,
        field: impl Into<String>,
        message: impl Into<String>,
        hint: impl Into<String>,
    ) {
        self.errors.push(ManifestDiagnostic {
            field: field.into(),
            message: message.into(),
            hint: Some(hint.into()),
        });
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.errors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    #[cfg(test)]
    pub fn errors(&self) -> &[ManifestDiagnostic] {
        &self.errors
    }

    /// Convert to Result (returns Err if there are errors).
    pub fn into_result(self) -> Result<(), ManifestError> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(ManifestError::Invalid(self))
        }
    }
}

impl fmt::Display for ManifestDiagnostics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}\n", "manifest validation failed:".red().bold())?;
        for (i, err) in self.errors.iter().enumerate() {
            write!(f, "{err}")?;
            if i + 1 < self.errors.len() {
                writeln!(f, "\n")?;
            }
        }
        if self.errors.len() > 1 {
            write!(
                f,
                "\n\n{} {} {}",
                "found".dimmed(),
                self.errors.len().to_string().red().bold(),
                "errors".dimmed()
            )?;
        }
        Ok(())
    }
}

impl std::error::Error for ManifestDiagnostics {}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Error, ErrorKind};

    #[test]
    fn test_manifest_error_display() {
        let io_err = ManifestError::Io(
            PathBuf::from("assets/manifest.json"),
            Error::new(ErrorKind::NotFound, "file not found"),
        );
        let display = format!("{io_err}");
        assert!(display.contains("IO error"));
        assert!(display.contains("assets/manifest.json"));
    }

    #[test]
    fn test_diagnostics_into_result() {
        let diag = ManifestDiagnostics::new();
        assert!(diag.into_result().is_ok());

        let mut diag = ManifestDiagnostics::new();
        diag.error("bundles[0].name", "missing bundle name");
        diag.error_with_hint("bundles[1].type", "unknown type `sass`", "use `style` or `script`");
        assert_eq!(diag.len(), 2);

        let err = diag.into_result().unwrap_err();
        let display = format!("{err}");
        assert!(display.contains("bundles[0].name"));
        assert!(display.contains("use `style` or `script`"));
    }
}
