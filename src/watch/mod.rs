//! Watch mode.
//!
//! ```text
//! notify → crossbeam channel → Debouncer → Routes → orchestrator
//! ```
//!
//! The watcher is attached before the initial build so nothing changed
//! during that build is lost. Roots that don't exist yet are attached once
//! they appear; a manifest change reloads it and runs a full build.

mod debounce;
mod route;

use debounce::Debouncer;
use route::Routes;

use std::path::PathBuf;
use std::time::{Duration, Instant};

use crossbeam::channel::{self, RecvTimeoutError, Sender};
use notify::{RecommendedWatcher, RecursiveMode, Watcher};
use rustc_hash::FxHashSet;

use crate::core;
use crate::logger::{status_detach, status_error, status_success};
use crate::manifest::Manifest;
use crate::orchestrator::{self, TaskGraph, TaskId};
use crate::tasks::TaskContext;
use crate::{debug, log};

/// Upper bound on one wait, so shutdown and new roots are noticed.
const POLL_INTERVAL: Duration = Duration::from_millis(250);

type NotifyResult = notify::Result<notify::Event>;

/// A `notify` watcher plus the set of roots currently attached.
pub struct RootWatcher {
    watcher: RecommendedWatcher,
    attached: FxHashSet<PathBuf>,
}

impl RootWatcher {
    pub fn new(tx: Sender<NotifyResult>) -> notify::Result<Self> {
        let watcher = notify::recommended_watcher(move |res| {
            let _ = tx.send(res);
        })?;
        Ok(Self {
            watcher,
            attached: FxHashSet::default(),
        })
    }

    /// Attach roots that exist now, drop ones that vanished or are no
    /// longer routed.
    pub fn sync(&mut self, routes: &Routes) {
        let wanted: Vec<(PathBuf, RecursiveMode)> = routes
            .dirs()
            .map(|dir| (dir.to_path_buf(), RecursiveMode::Recursive))
            .chain(
                routes
                    .manifest()
                    .parent()
                    .map(|dir| (dir.to_path_buf(), RecursiveMode::NonRecursive)),
            )
            .collect();

        let stale: Vec<PathBuf> = self
            .attached
            .iter()
            .filter(|p| !p.exists() || !wanted.iter().any(|(w, _)| w == *p))
            .cloned()
            .collect();
        for path in stale {
            let _ = self.watcher.unwatch(&path);
            self.attached.remove(&path);
            debug!("watch"; "detached {}", path.display());
        }

        for (path, mode) in wanted {
            if self.attached.contains(&path) || !path.is_dir() {
                continue;
            }
            match self.watcher.watch(&path, mode) {
                Ok(()) => {
                    debug!("watch"; "attached {}", path.display());
                    self.attached.insert(path);
                }
                Err(err) => debug!("watch"; "cannot watch {}: {}", path.display(), err),
            }
        }
    }

    #[cfg(test)]
    fn attached(&self) -> usize {
        self.attached.len()
    }
}

/// Build once, then rebuild on changes until Ctrl+C.
pub fn watch(mut ctx: TaskContext, graph: &TaskGraph) -> anyhow::Result<()> {
    let (tx, rx) = channel::unbounded();
    let mut watcher = RootWatcher::new(tx)?;
    let mut routes = Routes::new(&ctx.manifest);
    watcher.sync(&routes);

    rebuild(&ctx, graph, &[TaskId::Build]);
    log!("watch"; "watching {} for changes (Ctrl+C to stop)",
        ctx.manifest.paths.root_relative(&ctx.manifest.paths.source));
    core::set_watching(true);

    let mut debouncer = Debouncer::new();
    while !core::is_shutdown() {
        let timeout = debouncer
            .sleep_duration()
            .map_or(POLL_INTERVAL, |d| d.min(POLL_INTERVAL));
        match rx.recv_timeout(timeout) {
            Ok(Ok(event)) => debouncer.add_event(&event),
            Ok(Err(err)) => log!("watch"; "notify error: {}", err),
            Err(RecvTimeoutError::Timeout) => watcher.sync(&routes),
            Err(RecvTimeoutError::Disconnected) => break,
        }

        let Some(paths) = debouncer.take_if_ready() else {
            continue;
        };
        let plan = routes.plan(&paths);
        if plan.is_empty() {
            debug!("watch"; "{} changed paths route nowhere", paths.len());
            continue;
        }

        if plan.reload {
            match Manifest::load(&ctx.manifest.path, &ctx.manifest.paths.root) {
                Ok(manifest) => {
                    log!("watch"; "manifest changed, reloading");
                    ctx = TaskContext::new(manifest, ctx.config);
                    routes = Routes::new(&ctx.manifest);
                    watcher.sync(&routes);
                }
                Err(err) => {
                    status_error("manifest reload failed", &err.to_string());
                    continue;
                }
            }
        }
        rebuild(&ctx, graph, &plan.targets);
    }

    core::set_watching(false);
    Ok(())
}

/// Run targets and report the outcome as one status block.
///
/// Build failures never end the loop.
fn rebuild(ctx: &TaskContext, graph: &TaskGraph, targets: &[TaskId]) {
    let names = targets
        .iter()
        .map(|t| t.name())
        .collect::<Vec<_>>()
        .join(", ");
    let start = Instant::now();

    status_detach();
    match orchestrator::run_all(ctx, graph, targets) {
        Ok(()) => status_success(&format!("{names} in {:.2?}", start.elapsed())),
        Err(err) => {
            let detail = format!("{:#}", anyhow::Error::from(err));
            status_error(&format!("{names} failed"), &detail);
        }
    }
}
