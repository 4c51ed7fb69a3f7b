//! Command-line interface module.

mod args;
pub mod show;

pub use args::{Cli, Commands};
