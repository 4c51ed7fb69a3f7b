//! Bundle declarations.
//!
//! A bundle is one output file (`main.css`, `app.js`) built from an ordered
//! list of globs. Third-party (`vendor`) globs are resolved against the
//! project root and always come first; first-party (`files`) globs are
//! resolved against the source directory.

use serde::{Deserialize, Serialize};
use std::fmt;

use super::error::ManifestDiagnostics;

/// Asset class of a bundle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum BundleKind {
    Style,
    Script,
}

impl BundleKind {
    /// Parse a manifest `type` value. `css` and `js` are accepted aliases.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "style" | "css" => Some(Self::Style),
            "script" | "js" => Some(Self::Script),
            _ => None,
        }
    }

    /// Output directory below the build dir, also the ledger key prefix.
    pub const fn dir(self) -> &'static str {
        match self {
            Self::Style => "styles",
            Self::Script => "scripts",
        }
    }
}

impl fmt::Display for BundleKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Style => "style",
            Self::Script => "script",
        })
    }
}

/// A validated bundle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Bundle {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: BundleKind,
    /// First-party globs, relative to `paths.source`.
    pub files: Vec<String>,
    /// Third-party globs, relative to the project root.
    pub vendor: Vec<String>,
}

impl Bundle {
    #[cfg(test)]
    pub fn new(name: impl Into<String>, kind: BundleKind, files: Vec<String>) -> Self {
        Self {
            name: name.into(),
            kind,
            files,
            vendor: Vec::new(),
        }
    }
}

/// Bundle as written in the manifest, before validation.
///
/// `name` and `type` are optional here so that every missing field can be
/// reported instead of stopping at the first serde error.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub(super) struct RawBundle {
    pub name: Option<String>,
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub files: Vec<String>,
    pub vendor: Vec<String>,
}

impl RawBundle {
    /// Validate into a [`Bundle`], recording problems under `bundles[idx]`.
    pub(super) fn validate(self, idx: usize, diag: &mut ManifestDiagnostics) -> Option<Bundle> {
        let field = |name: &str| format!("bundles[{idx}].{name}");

        let name = match self.name.map(|n| n.trim().to_string()) {
            Some(name) if !name.is_empty() => Some(name),
            _ => {
                diag.error(field("name"), "missing bundle name");
                None
            }
        };

        let kind = match self.kind.as_deref() {
            None => {
                diag.error_with_hint(
                    field("type"),
                    "missing bundle type",
                    "use `style` or `script`",
                );
                None
            }
            Some(raw) => {
                let kind = BundleKind::parse(raw);
                if kind.is_none() {
                    diag.error_with_hint(
                        field("type"),
                        format!("unknown bundle type `{raw}`"),
                        "use `style` or `script`",
                    );
                }
                kind
            }
        };

        // Written as `<build_dir>/<kind dir>/<name>`
        let name = name.filter(|name| {
            let plain = !name.contains(['/', '\\']) && !name.starts_with('.');
            if !plain {
                diag.error_with_hint(
                    field("name"),
                    format!("bundle name `{name}` is not a plain file name"),
                    "bundles are written directly into the build dir, e.g. `main.css`",
                );
            }
            plain
        });

        if let Some(name) = &name
            && !name.contains('.')
        {
            diag.error_with_hint(
                field("name"),
                format!("bundle name `{name}` has no extension"),
                "name the output file, e.g. `main.css`",
            );
        }

        if self.files.is_empty() && self.vendor.is_empty() {
            diag.error(field("files"), "bundle declares no source globs");
        }

        Some(Bundle {
            name: name?,
            kind: kind?,
            files: self.files,
            vendor: self.vendor,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw(name: Option<&str>, kind: Option<&str>, files: &[&str]) -> RawBundle {
        RawBundle {
            name: name.map(String::from),
            kind: kind.map(String::from),
            files: files.iter().map(|s| s.to_string()).collect(),
            vendor: Vec::new(),
        }
    }

    #[test]
    fn test_kind_aliases() {
        assert_eq!(BundleKind::parse("css"), Some(BundleKind::Style));
        assert_eq!(BundleKind::parse("script"), Some(BundleKind::Script));
        assert_eq!(BundleKind::parse("less"), None);
    }

    #[test]
    fn test_validate_ok() {
        let mut diag = ManifestDiagnostics::new();
        let bundle = raw(Some("main.js"), Some("js"), &["scripts/*.js"])
            .validate(0, &mut diag)
            .unwrap();
        assert!(diag.is_empty());
        assert_eq!(bundle.kind, BundleKind::Script);
    }

    #[test]
    fn test_validate_reports_every_problem() {
        let mut diag = ManifestDiagnostics::new();
        assert!(raw(None, None, &[]).validate(3, &mut diag).is_none());

        let fields: Vec<_> = diag.errors().iter().map(|d| d.field.as_str()).collect();
        assert_eq!(fields, ["bundles[3].name", "bundles[3].type", "bundles[3].files"]);
    }

    #[test]
    fn test_validate_rejects_path_names() {
        for name in ["../x.css", "styles/main.css", "a\\b.css", ".hidden.css"] {
            let mut diag = ManifestDiagnostics::new();
            assert!(raw(Some(name), Some("style"), &["a.css"]).validate(0, &mut diag).is_none());
            assert_eq!(diag.errors()[0].field, "bundles[0].name");
        }
    }

    #[test]
    fn test_validate_unknown_type() {
        let mut diag = ManifestDiagnostics::new();
        assert!(raw(Some("main.css"), Some("sass"), &["a.scss"]).validate(0, &mut diag).is_none());
        assert!(diag.errors()[0].message.contains("sass"));
    }
}
