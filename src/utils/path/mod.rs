//! Path utilities.
//!
//! - [`fs`]: Filesystem path normalization and relative path computation

pub mod fs;

pub use fs::{normalize_path, relative_path, to_slash};
