//! Pure timing and event deduplication.

use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use notify::EventKind;
use notify::event::ModifyKind;
use rustc_hash::FxHashSet;

use crate::utils::path::normalize_path;

/// Quiet window after the last event before a rebuild starts.
pub const DEBOUNCE_MS: u64 = 300;
/// Minimum gap between two rebuilds.
pub const REBUILD_COOLDOWN_MS: u64 = 800;

/// Check if path is a temp/backup file (editor artifacts)
fn is_temp_file(path: &Path) -> bool {
    let name = path.file_name().and_then(|n| n.to_str()).unwrap_or("");
    let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("");

    matches!(ext, "bck" | "bak" | "backup" | "swp" | "swo" | "tmp")
        || name.ends_with('~')
        || name.starts_with('.')
        || name.starts_with('#')
}

/// Collects changed paths until the burst settles.
///
/// Kind of change doesn't matter here: every route rebuilds from the
/// manifest globs, so a create, a modify and a remove all mean "rebuild".
#[derive(Debug, Default)]
pub struct Debouncer {
    changes: FxHashSet<PathBuf>,
    last_event: Option<Instant>,
    last_build: Option<Instant>,
}

impl Debouncer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_event(&mut self, event: &notify::Event) {
        match event.kind {
            EventKind::Create(_) | EventKind::Remove(_) => {}
            // mtime/atime/chmod noise, and our own fresh-output checks
            EventKind::Modify(ModifyKind::Metadata(_)) => return,
            EventKind::Modify(_) => {}
            _ => return,
        }

        for path in &event.paths {
            if is_temp_file(path) {
                continue;
            }
            let path = normalize_path(path);
            crate::debug!("watch"; "{:?}: {}", event.kind, path.display());
            self.changes.insert(path);
            self.last_event = Some(Instant::now());
        }
    }

    /// Take the changed paths once the quiet window and cooldown have passed.
    pub fn take_if_ready(&mut self) -> Option<Vec<PathBuf>> {
        if !self.is_ready() {
            return None;
        }
        self.last_event = None;
        self.last_build = Some(Instant::now());

        let mut paths: Vec<_> = std::mem::take(&mut self.changes).into_iter().collect();
        paths.sort();
        Some(paths)
    }

    fn is_ready(&self) -> bool {
        let Some(last_event) = self.last_event else {
            return false;
        };
        if last_event.elapsed() < Duration::from_millis(DEBOUNCE_MS) {
            return false;
        }
        if let Some(last_build) = self.last_build
            && last_build.elapsed() < Duration::from_millis(REBUILD_COOLDOWN_MS)
        {
            return false;
        }
        !self.changes.is_empty()
    }

    /// Time until the next possible ready point, or `None` when idle.
    pub fn sleep_duration(&self) -> Option<Duration> {
        let last_event = self.last_event?;

        let debounce_remaining =
            Duration::from_millis(DEBOUNCE_MS).saturating_sub(last_event.elapsed());
        let cooldown_remaining = self
            .last_build
            .map(|t| Duration::from_millis(REBUILD_COOLDOWN_MS).saturating_sub(t.elapsed()))
            .unwrap_or(Duration::ZERO);

        Some(
            debounce_remaining
                .max(cooldown_remaining)
                .max(Duration::from_millis(1)),
        )
    }
}
