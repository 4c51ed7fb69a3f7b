//! assetry - manifest-driven asset builds for server-rendered sites.

mod cli;
mod config;
mod core;
mod error;
mod ledger;
mod logger;
mod manifest;
mod orchestrator;
mod pipeline;
mod resolve;
mod rewrite;
mod tasks;
mod utils;
mod watch;

use anyhow::Result;
use clap::{ColorChoice, Parser};
use cli::{Cli, Commands};
use config::BuildConfig;
use manifest::find_manifest;
use orchestrator::{TaskGraph, TaskId};
use tasks::TaskContext;

fn main() -> Result<()> {
    // Setup global Ctrl+C handler (before any blocking operations)
    core::setup_shutdown_handler()?;

    let cli = Cli::parse();

    // Set global color override based on CLI option
    match cli.color {
        ColorChoice::Always => owo_colors::set_override(true),
        ColorChoice::Never => owo_colors::set_override(false),
        ColorChoice::Auto => {} // owo-colors auto-detects TTY
    }
    logger::set_verbose(cli.verbose);

    let config = BuildConfig::new(cli.production);
    let manifest = find_manifest(&std::env::current_dir()?, &cli.manifest).load()?;
    debug!("manifest"; "loaded {}", manifest.path.display());

    let ctx = TaskContext::new(manifest, config);
    let graph = TaskGraph::standard();

    match cli.command {
        None => orchestrator::run_default(&ctx, &graph)?,
        Some(Commands::Clean) => orchestrator::run(&ctx, &graph, TaskId::Clean)?,
        Some(Commands::Build) => orchestrator::run(&ctx, &graph, TaskId::Build)?,
        Some(Commands::Run { task }) => orchestrator::run(&ctx, &graph, task.parse()?)?,
        Some(Commands::Watch) => watch::watch(ctx, &graph)?,
        Some(Commands::Show { json }) => cli::show::run_show(&ctx, json)?,
    }
    Ok(())
}
