//! Template reference rewriting.
//!
//! Replaces logical asset paths in HTML templates with their revisioned
//! names from the ledger. A previously rewritten reference
//! (`styles/main-<8 hex>.css`) is recognized too and updated to the
//! current revision, so running the rewriter again is a no-op.

use jwalk::WalkDir;
use regex::Regex;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{BuildError, BuildResult};
use crate::ledger;
use crate::utils::hash::FINGERPRINT_LEN;
use crate::{debug, log};

/// Characters that may appear in a path next to a reference.
fn is_path_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '-')
}

/// One logical path and the pattern that finds it.
#[derive(Debug)]
struct Rule {
    pattern: Regex,
    replacement: String,
}

impl Rule {
    fn new(logical: &str, revisioned: &str) -> Self {
        let (dir, file) = logical.rsplit_once('/').map_or(("", logical), |(d, f)| (d, f));
        let (stem, ext) = match file.rfind('.') {
            Some(dot) if dot > 0 => file.split_at(dot),
            _ => (file, ""),
        };
        let prefix = if dir.is_empty() {
            String::new()
        } else {
            format!("{}/", regex::escape(dir))
        };
        let pattern = format!(
            "{prefix}{}(?:-[0-9a-f]{{{FINGERPRINT_LEN}}})?{}",
            regex::escape(stem),
            regex::escape(ext)
        );
        Self {
            pattern: Regex::new(&pattern).expect("escaped pattern is valid"),
            replacement: revisioned.to_string(),
        }
    }

    /// Replace bounded matches in `text`.
    fn apply(&self, text: &str) -> Option<String> {
        let mut out = String::with_capacity(text.len());
        let mut last = 0;
        let mut replaced = false;

        for m in self.pattern.find_iter(text) {
            let before = text[..m.start()].chars().next_back();
            let after = text[m.end()..].chars().next();
            if before.is_some_and(is_path_char) || after.is_some_and(is_path_char) {
                continue;
            }
            out.push_str(&text[last..m.start()]);
            out.push_str(&self.replacement);
            last = m.end();
            replaced = true;
        }

        replaced.then(|| {
            out.push_str(&text[last..]);
            out
        })
    }
}

/// Merged view of one or more ledgers.
#[derive(Debug, Default)]
pub struct RevisionMap {
    entries: BTreeMap<String, String>,
}

impl RevisionMap {
    #[cfg(test)]
    pub fn from_entries(entries: BTreeMap<String, String>) -> Self {
        Self { entries }
    }

    /// Merge ledgers in order; later files win on conflicting keys.
    pub fn from_manifests(paths: &[PathBuf]) -> BuildResult<Self> {
        let mut entries = BTreeMap::new();
        for path in paths {
            entries.extend(ledger::read_entries(path)?);
        }
        Ok(Self { entries })
    }

    /// Every `*.json` file directly inside `dir`, sorted by name.
    pub fn manifests_in(dir: &Path) -> BuildResult<Vec<PathBuf>> {
        let read = match fs::read_dir(dir) {
            Ok(read) => read,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(err) => return Err(BuildError::io(dir, err)),
        };
        let mut paths: Vec<_> = read
            .filter_map(Result::ok)
            .map(|e| e.path())
            .filter(|p| p.is_file() && p.extension().is_some_and(|e| e == "json"))
            .collect();
        paths.sort();
        Ok(paths)
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    #[cfg(test)]
    pub fn get(&self, logical: &str) -> Option<&str> {
        self.entries.get(logical).map(String::as_str)
    }

    /// Longest keys first, so a short key never claims part of a longer one.
    fn rules(&self) -> Vec<Rule> {
        let mut keys: Vec<_> = self.entries.iter().collect();
        keys.sort_by(|a, b| b.0.len().cmp(&a.0.len()).then_with(|| a.0.cmp(b.0)));
        keys.into_iter()
            .map(|(logical, revisioned)| Rule::new(logical, revisioned))
            .collect()
    }
}

/// Outcome of one rewrite pass.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct RewriteStats {
    pub scanned: usize,
    pub changed: usize,
}

/// Rewrite text, returning `None` when nothing changed.
pub fn rewrite_text(map: &RevisionMap, text: &str) -> Option<String> {
    let mut current: Option<String> = None;
    for rule in map.rules() {
        let input = current.as_deref().unwrap_or(text);
        if let Some(next) = rule.apply(input) {
            current = Some(next);
        }
    }
    current.filter(|out| out != text)
}

/// Rewrite every `**/*.html` under `templates_dir` in place.
pub fn rewrite_templates(map: &RevisionMap, templates_dir: &Path) -> BuildResult<RewriteStats> {
    let mut stats = RewriteStats::default();
    if map.is_empty() || !templates_dir.is_dir() {
        debug!("rewrite"; "nothing to rewrite in {}", templates_dir.display());
        return Ok(stats);
    }

    let templates = WalkDir::new(templates_dir)
        .sort(true)
        .into_iter()
        .filter_map(Result::ok)
        .filter(|e| e.file_type().is_file())
        .map(|e| e.path())
        .filter(|p| p.extension().is_some_and(|e| e == "html"));

    for path in templates {
        stats.scanned += 1;
        let text = fs::read_to_string(&path).map_err(|err| BuildError::io(&path, err))?;
        if let Some(updated) = rewrite_text(map, &text) {
            fs::write(&path, updated).map_err(|err| BuildError::io(&path, err))?;
            stats.changed += 1;
            debug!("rewrite"; "{}", path.display());
        }
    }

    if stats.changed > 0 {
        log!("rewrite"; "updated {} of {} templates", stats.changed, stats.scanned);
    }
    Ok(stats)
}
