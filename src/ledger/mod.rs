//! Revision ledger (`assets.json`).
//!
//! Maps logical asset paths to the revisioned files that currently hold
//! them, e.g. `"styles/main.css": "styles/main-0123abcd.css"`. Bundles are
//! built in parallel, so the read → merge → write cycle on the ledger runs
//! under one process-wide lock and the file is replaced atomically.
//!
//! Keys are kept sorted: recording disjoint bundles in any order produces
//! the same bytes.

use parking_lot::Mutex;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{BuildError, BuildResult};
use crate::pipeline::TransformResult;

/// File name of the ledger inside the build directory.
pub const LEDGER_FILE: &str = "assets.json";

static LEDGER_LOCK: Mutex<()> = parking_lot::const_mutex(());

/// One ledger line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RevisionEntry {
    pub logical_path: String,
    pub revisioned_path: String,
}

/// Writes bundle output and keeps `assets.json` current.
#[derive(Debug, Clone)]
pub struct RevisionLedger {
    build_dir: PathBuf,
}

impl RevisionLedger {
    pub fn new(build_dir: impl Into<PathBuf>) -> Self {
        Self {
            build_dir: build_dir.into(),
        }
    }

    pub fn path(&self) -> PathBuf {
        self.build_dir.join(LEDGER_FILE)
    }

    /// Write a bundle (and its map) under `directory`, recording the
    /// revision when the filename differs from the logical name.
    pub fn record(
        &self,
        directory: &str,
        result: &TransformResult,
    ) -> BuildResult<Option<RevisionEntry>> {
        let out_dir = self.build_dir.join(directory);
        fs::create_dir_all(&out_dir).map_err(|err| BuildError::io(&out_dir, err))?;

        write_file(&out_dir.join(&result.filename), &result.bytes)?;
        if let Some(map) = &result.source_map {
            write_file(&out_dir.join(result.map_name()), map.as_bytes())?;
        }

        if result.filename == result.logical_name {
            return Ok(None);
        }

        let entry = RevisionEntry {
            logical_path: format!("{directory}/{}", result.logical_name),
            revisioned_path: format!("{directory}/{}", result.filename),
        };
        self.upsert(&entry)?;
        Ok(Some(entry))
    }

    /// Merge one entry into the ledger file.
    pub fn upsert(&self, entry: &RevisionEntry) -> BuildResult<()> {
        let _guard = LEDGER_LOCK.lock();

        let path = self.path();
        let mut entries = read_entries(&path)?;
        entries.insert(entry.logical_path.clone(), entry.revisioned_path.clone());
        write_entries(&path, &entries)
    }

    /// Current ledger contents (empty when the file doesn't exist).
    #[cfg(test)]
    pub fn entries(&self) -> BuildResult<BTreeMap<String, String>> {
        let _guard = LEDGER_LOCK.lock();
        read_entries(&self.path())
    }
}

/// Read a ledger, treating a missing file as empty.
pub fn read_entries(path: &Path) -> BuildResult<BTreeMap<String, String>> {
    let content = match fs::read_to_string(path) {
        Ok(content) => content,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(BTreeMap::new()),
        Err(err) => return Err(BuildError::io(path, err)),
    };
    if content.trim().is_empty() {
        return Ok(BTreeMap::new());
    }
    serde_json::from_str(&content).map_err(|source| BuildError::Ledger {
        path: path.to_path_buf(),
        source,
    })
}

fn write_entries(path: &Path, entries: &BTreeMap<String, String>) -> BuildResult<()> {
    let mut json = serde_json::to_string_pretty(entries).map_err(|source| BuildError::Ledger {
        path: path.to_path_buf(),
        source,
    })?;
    json.push('\n');

    // Write to a sibling then rename, so readers never see half a file
    let tmp = path.with_extension("json.tmp");
    write_file(&tmp, json.as_bytes())?;
    fs::rename(&tmp, path).map_err(|err| BuildError::io(path, err))
}

fn write_file(path: &Path, bytes: &[u8]) -> BuildResult<()> {
    fs::write(path, bytes).map_err(|err| BuildError::io(path, err))
}
