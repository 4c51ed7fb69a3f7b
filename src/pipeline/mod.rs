//! Bundle transform pipeline.
//!
//! A bundle flows through a fixed, ordered list of stages. Each stage
//! declares when it applies (a predicate over the build configuration and
//! bundle kind), so the full pipeline is visible in one table:
//!
//! ```text
//! sourcemap-init → preprocess → concat → prefix → minify → revision → sourcemap-write
//!      maps          always      always   style     minify    revision       maps
//! ```
//!
//! Stages run sequentially over one [`Artifact`]; bundles run in parallel
//! at the task level.

pub mod minify;
pub mod prefix;
pub mod preprocess;
pub mod revision;
pub mod sourcemap;

use lightningcss::targets::Targets;
use std::fs;
use std::path::PathBuf;

use crate::config::BuildConfig;
use crate::error::{BuildError, BuildResult};
use crate::log;
use crate::manifest::{BundleKind, Manifest, Paths};
use crate::resolve::ResolvedAsset;
use crate::utils::path::{relative_path, to_slash};

pub use preprocess::{Preprocessor, Registry};
use sourcemap::{MapSource, Segment};

// =============================================================================
// Types
// =============================================================================

/// Shared inputs of every pipeline run in one build.
pub struct PipelineContext<'a> {
    pub config: BuildConfig,
    pub paths: &'a Paths,
    pub registry: &'a Registry,
    pub targets: Targets,
}

impl<'a> PipelineContext<'a> {
    pub fn new(config: BuildConfig, manifest: &'a Manifest, registry: &'a Registry) -> Self {
        Self {
            config,
            paths: &manifest.paths,
            registry,
            targets: prefix::targets(&manifest.browsers),
        }
    }
}

/// One input file of a bundle.
#[derive(Debug, Clone)]
pub struct Source {
    pub path: PathBuf,
    /// Current text (raw, then preprocessed).
    pub text: String,
    /// Untouched file content, kept only when source maps are on.
    pub original: Option<String>,
}

/// Working state of one bundle while it moves through the stages.
#[derive(Debug, Clone)]
pub struct Artifact {
    pub kind: BundleKind,
    pub bundle: String,
    pub filename: String,
    pub sources: Vec<Source>,
    /// Concatenated output, empty until `concat`.
    pub text: String,
    /// Provenance of `text`, cleared by stages that lose it.
    pub segments: Vec<Segment>,
    pub source_map: Option<String>,
}

impl Artifact {
    /// Read every resolved file.
    pub fn load(resolved: &ResolvedAsset) -> BuildResult<Self> {
        let sources = resolved
            .files
            .iter()
            .map(|path| {
                let text = fs::read_to_string(path).map_err(|err| BuildError::io(path, err))?;
                Ok(Source {
                    path: path.clone(),
                    text,
                    original: None,
                })
            })
            .collect::<BuildResult<Vec<_>>>()?;

        Ok(Self {
            kind: resolved.bundle.kind,
            bundle: resolved.bundle.name.clone(),
            filename: resolved.bundle.name.clone(),
            sources,
            text: String::new(),
            segments: Vec::new(),
            source_map: None,
        })
    }
}

/// Final output of the pipeline for one bundle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransformResult {
    /// Name before revisioning (`main.css`).
    pub logical_name: String,
    /// Name on disk (`main-0123abcd.css` in production).
    pub filename: String,
    pub bytes: Vec<u8>,
    pub source_map: Option<String>,
}

impl TransformResult {
    /// File name of the companion source map.
    pub fn map_name(&self) -> String {
        format!("{}.map", self.filename)
    }
}

// =============================================================================
// Stage table
// =============================================================================

type Applies = fn(&BuildConfig, BundleKind) -> bool;
type Run = fn(&mut Artifact, &PipelineContext<'_>) -> BuildResult<()>;

/// A named pipeline step.
pub struct Stage {
    pub name: &'static str,
    pub applies: Applies,
    pub run: Run,
}

/// Every stage, in execution order.
pub static STAGES: &[Stage] = &[
    Stage {
        name: "sourcemap-init",
        applies: |c, _| c.source_maps(),
        run: sourcemap_init,
    },
    Stage {
        name: "preprocess",
        applies: |_, _| true,
        run: preprocess,
    },
    Stage {
        name: "concat",
        applies: |_, _| true,
        run: concat,
    },
    Stage {
        name: "prefix",
        applies: |_, kind| kind == BundleKind::Style,
        run: vendor_prefix,
    },
    Stage {
        name: "minify",
        applies: |c, _| c.minify(),
        run: minify,
    },
    Stage {
        name: "revision",
        applies: |c, _| c.revision(),
        run: revision,
    },
    Stage {
        name: "sourcemap-write",
        applies: |c, _| c.source_maps(),
        run: sourcemap_write,
    },
];

/// Stages that run for `kind` under `config`.
pub fn active_stages(config: &BuildConfig, kind: BundleKind) -> impl Iterator<Item = &'static Stage> {
    let config = *config;
    STAGES.iter().filter(move |s| (s.applies)(&config, kind))
}

/// Run every applicable stage over a resolved bundle.
pub fn run_pipeline(resolved: &ResolvedAsset, ctx: &PipelineContext<'_>) -> BuildResult<TransformResult> {
    let mut artifact = Artifact::load(resolved)?;
    for stage in active_stages(&ctx.config, artifact.kind) {
        (stage.run)(&mut artifact, ctx)?;
    }

    Ok(TransformResult {
        logical_name: resolved.bundle.name.clone(),
        filename: artifact.filename,
        bytes: artifact.text.into_bytes(),
        source_map: artifact.source_map,
    })
}

// =============================================================================
// Stages
// =============================================================================

fn sourcemap_init(artifact: &mut Artifact, _: &PipelineContext<'_>) -> BuildResult<()> {
    for source in &mut artifact.sources {
        source.original = Some(source.text.clone());
    }
    Ok(())
}

fn preprocess(artifact: &mut Artifact, ctx: &PipelineContext<'_>) -> BuildResult<()> {
    for source in &mut artifact.sources {
        let text = std::mem::take(&mut source.text);
        match ctx.registry.compile(&source.path, text) {
            Ok(compiled) => source.text = compiled,
            Err(err) if ctx.config.strict() => {
                return Err(BuildError::Preprocess {
                    bundle: artifact.bundle.clone(),
                    source: err,
                });
            }
            Err(err) => {
                log!("warning"; "{}: {}", artifact.bundle, err);
            }
        }
    }
    Ok(())
}

fn concat(artifact: &mut Artifact, _: &PipelineContext<'_>) -> BuildResult<()> {
    let (text, segments) = join_sources(artifact.sources.iter().map(|s| s.text.as_str()));
    artifact.text = text;
    artifact.segments = segments;
    Ok(())
}

/// Join texts with `\n`, returning the byte range each one occupies.
fn join_sources<'a>(texts: impl Iterator<Item = &'a str>) -> (String, Vec<Segment>) {
    let mut out = String::new();
    let mut segments = Vec::new();
    for (idx, text) in texts.enumerate() {
        if idx > 0 {
            out.push('\n');
        }
        let start = out.len();
        out.push_str(text);
        segments.push(Segment {
            source: idx,
            range: start..out.len(),
        });
    }
    (out, segments)
}

fn vendor_prefix(artifact: &mut Artifact, ctx: &PipelineContext<'_>) -> BuildResult<()> {
    let mut parts = Vec::with_capacity(artifact.segments.len());
    for seg in &artifact.segments {
        let chunk = &artifact.text[seg.range.clone()];
        if chunk.trim().is_empty() {
            parts.push(chunk.to_string());
            continue;
        }
        match prefix::prefix_css(chunk, ctx.targets) {
            Ok(css) => parts.push(css),
            Err(message) if ctx.config.strict() => {
                return Err(BuildError::Css {
                    bundle: artifact.bundle.clone(),
                    message: format!("{}: {message}", artifact.sources[seg.source].path.display()),
                });
            }
            Err(message) => {
                log!("warning"; "{}: cannot prefix {}: {}",
                    artifact.bundle, artifact.sources[seg.source].path.display(), message);
                parts.push(chunk.to_string());
            }
        }
    }

    let (text, segments) = join_sources(parts.iter().map(String::as_str));
    artifact.text = text;
    artifact.segments = segments;
    Ok(())
}

fn minify(artifact: &mut Artifact, ctx: &PipelineContext<'_>) -> BuildResult<()> {
    if artifact.text.trim().is_empty() {
        artifact.text.clear();
        return Ok(());
    }
    artifact.text = match artifact.kind {
        BundleKind::Style => {
            minify::minify_css(&artifact.text, ctx.targets).map_err(|message| BuildError::Css {
                bundle: artifact.bundle.clone(),
                message,
            })?
        }
        BundleKind::Script => minify::minify_js(&artifact.text, ctx.config.strip_debug())
            .map_err(|message| BuildError::Script {
                bundle: artifact.bundle.clone(),
                message,
            })?,
    };
    artifact.segments.clear();
    Ok(())
}

fn revision(artifact: &mut Artifact, _: &PipelineContext<'_>) -> BuildResult<()> {
    artifact.filename = revision::revision(&artifact.filename, artifact.text.as_bytes());
    Ok(())
}

fn sourcemap_write(artifact: &mut Artifact, ctx: &PipelineContext<'_>) -> BuildResult<()> {
    let kind_dir = ctx.paths.kind_dir(artifact.kind);
    let source_root = format!("{}/", ctx.paths.root_relative(&kind_dir));

    let sources: Vec<MapSource<'_>> = artifact
        .sources
        .iter()
        .map(|s| MapSource {
            name: to_slash(&relative_path(&kind_dir, &s.path)),
            content: s.original.as_deref(),
        })
        .collect();

    let map_name = format!("{}.map", artifact.filename);
    let map = sourcemap::render(
        &artifact.filename,
        &source_root,
        &artifact.text,
        &artifact.segments,
        &sources,
    );

    artifact.text.push_str(&sourcemap::mapping_comment(artifact.kind, &map_name));
    artifact.source_map = Some(map);
    Ok(())
}
