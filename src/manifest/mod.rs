//! Asset manifest loading.
//!
//! The manifest is a single JSON (or TOML, by extension) file that declares
//! directories, bundles, font/image globs, compile rules, preprocessor
//! overrides and browser targets. All paths are resolved against the
//! project root: the directory the manifest was found from, so the default
//! `assets/manifest.json` makes its grandparent the root.
//!
//! Unknown fields are reported as warnings; structural problems are
//! collected into [`ManifestDiagnostics`] and reported together.

mod bundle;
mod error;

pub use bundle::{Bundle, BundleKind};
pub use error::{ManifestDiagnostic, ManifestDiagnostics, ManifestError};

use bundle::RawBundle;
use rustc_hash::FxHashSet;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use crate::log;
use crate::pipeline::prefix;
use crate::utils::path::{normalize_path, to_slash};

/// Default manifest location, relative to the project root.
pub const DEFAULT_MANIFEST: &str = "assets/manifest.json";

// ============================================================================
// Paths
// ============================================================================

/// Resolved project directories (all absolute).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Paths {
    pub root: PathBuf,
    pub source: PathBuf,
    pub dist: PathBuf,
    pub local: PathBuf,
    pub templates: PathBuf,
}

impl Paths {
    /// Source directory of one bundle kind, e.g. `assets/styles`.
    pub fn kind_dir(&self, kind: BundleKind) -> PathBuf {
        self.source.join(kind.dir())
    }

    /// Forward-slash path relative to the project root.
    ///
    /// Paths outside the root are returned as-is.
    pub fn root_relative(&self, path: &Path) -> String {
        path.strip_prefix(&self.root)
            .map(to_slash)
            .unwrap_or_else(|_| path.to_string_lossy().into_owned())
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
struct RawPaths {
    source: String,
    dist: String,
    local: String,
    templates: String,
}

impl Default for RawPaths {
    fn default() -> Self {
        Self {
            source: "assets/".into(),
            dist: "static/dist/".into(),
            local: "static/local/".into(),
            templates: "templates/".into(),
        }
    }
}

impl RawPaths {
    fn resolve(self, root: &Path) -> Paths {
        let join = |p: &str| {
            let expanded = PathBuf::from(shellexpand::tilde(p).into_owned());
            if expanded.is_absolute() {
                expanded
            } else {
                root.join(expanded)
            }
        };
        Paths {
            root: root.to_path_buf(),
            source: join(&self.source),
            dist: join(&self.dist),
            local: join(&self.local),
            templates: join(&self.templates),
        }
    }
}

// ============================================================================
// Compile rules & browser versions
// ============================================================================

/// Standalone preprocessing rule: compile files matching `from` (relative to
/// the source dir) into the directory `to` (also relative to the source dir).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompileRule {
    pub from: String,
    pub to: String,
}

/// Browser versions may be written as strings (`"4.4"`) or numbers (`12`).
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
enum RawVersion {
    Text(String),
    Number(f64),
}

impl RawVersion {
    fn into_text(self) -> String {
        match self {
            Self::Text(s) => s,
            Self::Number(n) => n.to_string(),
        }
    }
}

// ============================================================================
// Manifest
// ============================================================================

/// File format of a manifest, chosen by extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    Json,
    Toml,
}

impl Format {
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("toml") => Self::Toml,
            _ => Self::Json,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawManifest {
    paths: RawPaths,
    config: serde_json::Map<String, serde_json::Value>,
    bundles: Vec<RawBundle>,
    fonts: Option<Vec<String>>,
    images: Option<Vec<String>>,
    compile: Vec<CompileRule>,
    preprocessors: BTreeMap<String, Vec<String>>,
    browsers: BTreeMap<String, RawVersion>,
}

/// A loaded and validated manifest.
#[derive(Debug, Clone, Serialize)]
pub struct Manifest {
    /// Absolute path of the manifest file itself.
    pub path: PathBuf,
    pub paths: Paths,
    /// Free-form settings carried through for other tools.
    pub config: serde_json::Map<String, serde_json::Value>,
    pub bundles: Vec<Bundle>,
    /// Font globs, relative to the source dir.
    pub fonts: Vec<String>,
    /// Image globs, relative to the source dir.
    pub images: Vec<String>,
    pub compile: Vec<CompileRule>,
    /// Extension → command overrides for the preprocessor registry.
    pub preprocessors: BTreeMap<String, Vec<String>>,
    /// Browser name → encoded version (`major << 16 | minor << 8`).
    pub browsers: BTreeMap<String, u32>,
}

impl Manifest {
    /// Load and validate the manifest at `path`, anchoring paths at `root`.
    pub fn load(path: &Path, root: &Path) -> Result<Self, ManifestError> {
        let content = fs::read_to_string(path).map_err(|err| {
            if err.kind() == std::io::ErrorKind::NotFound {
                ManifestError::NotFound(path.to_path_buf())
            } else {
                ManifestError::Io(path.to_path_buf(), err)
            }
        })?;

        let path = normalize_path(path);
        let root = normalize_path(root);

        let (manifest, ignored) = Self::parse(&content, Format::from_path(&path), &path, &root)?;
        if !ignored.is_empty() {
            print_unknown_fields_warning(&ignored, &path);
        }
        Ok(manifest)
    }

    /// Parse manifest text, returning the manifest and any unknown fields.
    ///
    /// `path` is only used for error messages; `root` anchors relative paths.
    pub fn parse(
        content: &str,
        format: Format,
        path: &Path,
        root: &Path,
    ) -> Result<(Self, Vec<String>), ManifestError> {
        let (raw, ignored) = parse_with_ignored(content, format, path)?;
        let manifest = Self::from_raw(raw, path, root)?;
        Ok((manifest, ignored))
    }

    fn from_raw(raw: RawManifest, path: &Path, root: &Path) -> Result<Self, ManifestError> {
        let mut diag = ManifestDiagnostics::new();

        let bundles = validate_bundles(raw.bundles, &mut diag);
        validate_compile(&raw.compile, &mut diag);
        validate_preprocessors(&raw.preprocessors, &mut diag);

        let fonts = globs_or_default(raw.fonts, "fonts/**/*", "fonts", &mut diag);
        let images = globs_or_default(raw.images, "images/**/*", "images", &mut diag);

        let mut browsers = BTreeMap::new();
        for (name, version) in raw.browsers {
            let field = format!("browsers.{name}");
            let version = version.into_text();
            if !prefix::is_known_browser(&name) {
                diag.error_with_hint(
                    field,
                    format!("unknown browser `{name}`"),
                    prefix::KNOWN_BROWSERS.join(", "),
                );
                continue;
            }
            match prefix::parse_version(&version) {
                Some(encoded) => {
                    browsers.insert(name, encoded);
                }
                None => diag.error_with_hint(
                    field,
                    format!("invalid version `{version}`"),
                    "use `major` or `major.minor`, e.g. \"4.4\"",
                ),
            }
        }

        diag.into_result()?;

        Ok(Self {
            path: path.to_path_buf(),
            paths: raw.paths.resolve(root),
            config: raw.config,
            bundles,
            fonts,
            images,
            compile: raw.compile,
            preprocessors: raw.preprocessors,
            browsers,
        })
    }

    /// Bundles of one kind, in declaration order.
    pub fn bundles_of(&self, kind: BundleKind) -> impl Iterator<Item = &Bundle> {
        self.bundles.iter().filter(move |b| b.kind == kind)
    }
}

/// Parse content, collecting any unknown fields.
fn parse_with_ignored(
    content: &str,
    format: Format,
    path: &Path,
) -> Result<(RawManifest, Vec<String>), ManifestError> {
    let mut ignored = Vec::new();
    let record = |p: serde_ignored::Path| ignored.push(p.to_string());

    let raw = match format {
        Format::Json => {
            let mut de = serde_json::Deserializer::from_str(content);
            let raw = serde_ignored::deserialize(&mut de, record)
                .map_err(|err| ManifestError::Json(path.to_path_buf(), err))?;
            de.end()
                .map_err(|err| ManifestError::Json(path.to_path_buf(), err))?;
            raw
        }
        Format::Toml => {
            let de = toml::Deserializer::new(content);
            serde_ignored::deserialize(de, record)
                .map_err(|err| ManifestError::Toml(path.to_path_buf(), err))?
        }
    };
    Ok((raw, ignored))
}

fn validate_bundles(raw: Vec<RawBundle>, diag: &mut ManifestDiagnostics) -> Vec<Bundle> {
    let mut seen: FxHashSet<(BundleKind, String)> = FxHashSet::default();
    let mut bundles = Vec::with_capacity(raw.len());

    for (idx, raw) in raw.into_iter().enumerate() {
        let Some(bundle) = raw.validate(idx, diag) else {
            continue;
        };
        if !seen.insert((bundle.kind, bundle.name.clone())) {
            diag.error(
                format!("bundles[{idx}].name"),
                format!("duplicate {} bundle `{}`", bundle.kind, bundle.name),
            );
            continue;
        }
        bundles.push(bundle);
    }
    bundles
}

fn validate_compile(rules: &[CompileRule], diag: &mut ManifestDiagnostics) {
    for (idx, rule) in rules.iter().enumerate() {
        if rule.from.trim().is_empty() {
            diag.error(format!("compile[{idx}].from"), "empty source glob");
        }
        if Path::new(&rule.to).is_absolute() {
            diag.error_with_hint(
                format!("compile[{idx}].to"),
                "target must be relative",
                "paths are relative to `paths.source`",
            );
        }
    }
}

fn validate_preprocessors(map: &BTreeMap<String, Vec<String>>, diag: &mut ManifestDiagnostics) {
    for (ext, command) in map {
        if command.is_empty() || command[0].trim().is_empty() {
            diag.error(
                format!("preprocessors.{ext}"),
                "command must name a program",
            );
        }
    }
}

fn globs_or_default(
    globs: Option<Vec<String>>,
    default: &str,
    field: &str,
    diag: &mut ManifestDiagnostics,
) -> Vec<String> {
    match globs {
        None => vec![default.to_string()],
        Some(globs) => {
            if globs.iter().any(|g| g.trim().is_empty()) {
                diag.error(field, "glob must not be empty");
            }
            globs
        }
    }
}

fn print_unknown_fields_warning(fields: &[String], path: &Path) {
    let display_path = path
        .file_name()
        .map(|n| n.to_string_lossy())
        .unwrap_or_else(|| path.to_string_lossy());
    log!("warning"; "unknown fields in {}, ignoring:", display_path);
    for field in fields {
        log!("warning"; "- {}", field);
    }
}

/// A manifest file and the project root it belongs to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Located {
    pub path: PathBuf,
    pub root: PathBuf,
}

impl Located {
    pub fn load(&self) -> Result<Manifest, ManifestError> {
        Manifest::load(&self.path, &self.root)
    }
}

/// Find the manifest named `name` by searching upward from `start`.
///
/// Each ancestor of `start` is tried in turn, nearest first, and the one
/// that holds `<ancestor>/<name>` becomes the root. An absolute `name` is
/// used as-is with `start` as the root. When nothing matches, the manifest
/// is expected at `start/<name>` so loading reports it as missing.
pub fn find_manifest(start: &Path, name: &Path) -> Located {
    start
        .ancestors()
        .find_map(|dir| {
            let candidate = dir.join(name);
            candidate.is_file().then(|| Located {
                path: candidate,
                root: dir.to_path_buf(),
            })
        })
        .unwrap_or_else(|| Located {
            path: start.join(name),
            root: start.to_path_buf(),
        })
}
