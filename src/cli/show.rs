//! `show`: print the resolved configuration.
//!
//! Everything a build would use, without building: paths, derived toggles,
//! the manifest's `config` section, each bundle's matched files and
//! pipeline stages, and browser targets.

use std::collections::BTreeMap;
use std::io::Write;

use anyhow::Result;
use owo_colors::OwoColorize;
use serde::Serialize;

use crate::config::ConfigSummary;
use crate::manifest::{BundleKind, CompileRule};
use crate::pipeline::{active_stages, prefix};
use crate::resolve::resolve_bundle;
use crate::tasks::TaskContext;

#[derive(Debug, Serialize)]
pub struct ShowReport {
    pub manifest: String,
    pub paths: BTreeMap<&'static str, String>,
    pub build_dir: String,
    pub build: ConfigSummary,
    /// The manifest's free-form `config` section, as written.
    pub config: serde_json::Map<String, serde_json::Value>,
    pub bundles: Vec<BundleReport>,
    pub fonts: Vec<String>,
    pub images: Vec<String>,
    pub compile: Vec<CompileRule>,
    pub browsers: BTreeMap<&'static str, String>,
    pub preprocessors: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct BundleReport {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: BundleKind,
    /// Root-relative matched files, in concatenation order.
    pub files: Vec<String>,
    pub stages: Vec<&'static str>,
}

impl ShowReport {
    pub fn new(ctx: &TaskContext) -> Self {
        let manifest = &ctx.manifest;
        let paths = &manifest.paths;
        let rel = |p: &std::path::Path| paths.root_relative(p);

        let bundles = manifest
            .bundles
            .iter()
            .map(|bundle| BundleReport {
                name: bundle.name.clone(),
                kind: bundle.kind,
                files: resolve_bundle(bundle, paths)
                    .files
                    .iter()
                    .map(|f| rel(f))
                    .collect(),
                stages: active_stages(&ctx.config, bundle.kind).map(|s| s.name).collect(),
            })
            .collect();

        Self {
            manifest: rel(&manifest.path),
            paths: BTreeMap::from([
                ("root", paths.root.display().to_string()),
                ("source", rel(&paths.source)),
                ("dist", rel(&paths.dist)),
                ("local", rel(&paths.local)),
                ("templates", rel(&paths.templates)),
            ]),
            build_dir: rel(ctx.build_dir()),
            build: ctx.config.summary(),
            config: manifest.config.clone(),
            bundles,
            fonts: manifest.fonts.clone(),
            images: manifest.images.clone(),
            compile: manifest.compile.clone(),
            browsers: prefix::describe(&prefix::browsers(&manifest.browsers)),
            preprocessors: ctx.registry.extensions().into_iter().map(str::to_string).collect(),
        }
    }

    /// Human-readable form.
    pub fn render(&self) -> String {
        let mut out = String::new();
        let mut section = |title: &str, lines: Vec<String>| {
            out.push_str(&format!("{}\n", title.bold()));
            for line in lines {
                out.push_str(&format!("  {line}\n"));
            }
        };

        section("manifest", vec![self.manifest.clone()]);
        section(
            "paths",
            self.paths.iter().map(|(k, v)| format!("{k:<10} {v}")).collect(),
        );

        let c = &self.build;
        section(
            "build",
            vec![
                format!("{:<10} {}", "mode", if c.production { "production" } else { "development" }),
                format!("{:<10} {}", "build dir", self.build_dir),
                format!(
                    "{:<10} revision={} minify={} strip_debug={} strict={} source_maps={}",
                    "toggles", c.revision, c.minify, c.strip_debug, c.strict, c.source_maps
                ),
            ],
        );

        if !self.config.is_empty() {
            section(
                "config",
                self.config
                    .iter()
                    .map(|(k, v)| match v {
                        serde_json::Value::String(s) => format!("{k:<10} {s}"),
                        other => format!("{k:<10} {other}"),
                    })
                    .collect(),
            );
        }

        for bundle in &self.bundles {
            let mut lines = vec![format!("{} {}", "stages".dimmed(), bundle.stages.join(" → "))];
            if bundle.files.is_empty() {
                lines.push("(no files)".dimmed().to_string());
            }
            lines.extend(bundle.files.iter().cloned());
            section(&format!("{} ({})", bundle.name, bundle.kind), lines);
        }

        section("fonts", self.fonts.clone());
        section("images", self.images.clone());
        if !self.compile.is_empty() {
            section(
                "compile",
                self.compile.iter().map(|r| format!("{} → {}", r.from, r.to)).collect(),
            );
        }
        section(
            "browsers",
            vec![
                self.browsers
                    .iter()
                    .map(|(k, v)| format!("{k} {v}"))
                    .collect::<Vec<_>>()
                    .join(", "),
            ],
        );
        section("preprocessors", vec![self.preprocessors.join(", ")]);
        out
    }
}

/// Execute the show command.
pub fn run_show(ctx: &TaskContext, json: bool) -> Result<()> {
    let report = ShowReport::new(ctx);
    let mut stdout = std::io::stdout().lock();
    if json {
        serde_json::to_writer_pretty(&mut stdout, &report)?;
        writeln!(stdout)?;
    } else {
        write!(stdout, "{}", report.render())?;
    }
    Ok(())
}
