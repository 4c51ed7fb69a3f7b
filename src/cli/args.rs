//! Command-line interface definitions.

use clap::{ColorChoice, Parser, Subcommand};
use std::path::PathBuf;

use crate::manifest::DEFAULT_MANIFEST;

/// Manifest-driven asset builds: styles, scripts, fonts and images
#[derive(Parser, Debug, Clone)]
#[command(about, long_about = None)]
pub struct Cli {
    /// Minify, revision and fail hard; write to the dist directory
    #[arg(long, global = true)]
    pub production: bool,

    /// Manifest path, searched upward from the working directory
    #[arg(short, long, global = true, default_value = DEFAULT_MANIFEST, value_hint = clap::ValueHint::FilePath)]
    pub manifest: PathBuf,

    /// Control colored output (auto, always, never)
    #[arg(long, global = true, default_value = "auto")]
    pub color: ColorChoice,

    /// Print debug output
    #[arg(short = 'V', long, global = true)]
    pub verbose: bool,

    /// subcommands (default: clean, then build)
    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available subcommands
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Remove the build directory
    Clean,

    /// Build every asset and rewrite template references
    #[command(visible_alias = "b")]
    Build,

    /// Build, then rebuild on changes until Ctrl+C
    #[command(visible_alias = "w")]
    Watch,

    /// Run one task and the tasks it depends on
    Run {
        /// Task name (inject, lint, preprocess, styles, scripts, fonts, images, rewrite, ...)
        task: String,
    },

    /// Print the resolved configuration
    Show {
        /// Print JSON instead of text
        #[arg(long)]
        json: bool,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_subcommand_is_default() {
        let cli = Cli::try_parse_from(["assetry"]).unwrap();
        assert!(cli.command.is_none());
        assert!(!cli.production);
        assert_eq!(cli.manifest, PathBuf::from(DEFAULT_MANIFEST));
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from(["assetry", "build", "--production", "-V", "-m", "m.toml"]).unwrap();
        assert!(matches!(cli.command, Some(Commands::Build)));
        assert!(cli.production);
        assert!(cli.verbose);
        assert_eq!(cli.manifest, PathBuf::from("m.toml"));
    }

    #[test]
    fn test_show_json() {
        let cli = Cli::try_parse_from(["assetry", "show", "--json"]).unwrap();
        assert!(matches!(cli.command, Some(Commands::Show { json: true })));
    }

    #[test]
    fn test_clap_definition() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }
}
