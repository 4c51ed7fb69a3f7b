//! Task graph and execution.
//!
//! Tasks form an explicit dependency graph. Running a target plans the
//! dependency closure into topological levels (Kahn's algorithm); tasks in
//! a level are independent and run in parallel on the rayon pool. The first
//! failure stops the run after its level.
//!
//! ```text
//! inject ─→ styles ──┐
//! lint ───┐          │
//!         ├→ scripts ┤
//! preprocess         ├→ rewrite ─→ build
//! fonts ─────────────┤
//! images ────────────┘
//! ```

use rayon::prelude::*;
use rustc_hash::{FxHashMap, FxHashSet};
use std::fmt;
use std::str::FromStr;
use std::time::Instant;

use crate::error::{BuildError, BuildResult};
use crate::tasks::{self, TaskContext};
use crate::{debug, log};

// =============================================================================
// TaskId
// =============================================================================

/// Every task the orchestrator knows about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum TaskId {
    Clean,
    Inject,
    Lint,
    Preprocess,
    Styles,
    Scripts,
    Fonts,
    Images,
    Rewrite,
    Build,
}

impl TaskId {
    pub const ALL: [Self; 10] = [
        Self::Clean,
        Self::Inject,
        Self::Lint,
        Self::Preprocess,
        Self::Styles,
        Self::Scripts,
        Self::Fonts,
        Self::Images,
        Self::Rewrite,
        Self::Build,
    ];

    pub const fn name(self) -> &'static str {
        match self {
            Self::Clean => "clean",
            Self::Inject => "inject",
            Self::Lint => "lint",
            Self::Preprocess => "preprocess",
            Self::Styles => "styles",
            Self::Scripts => "scripts",
            Self::Fonts => "fonts",
            Self::Images => "images",
            Self::Rewrite => "rewrite",
            Self::Build => "build",
        }
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for TaskId {
    type Err = BuildError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|t| t.name() == s)
            .ok_or_else(|| BuildError::UnknownTask(s.to_string()))
    }
}

// =============================================================================
// TaskGraph
// =============================================================================

/// Task → direct dependencies.
#[derive(Debug, Clone, Default)]
pub struct TaskGraph {
    deps: FxHashMap<TaskId, Vec<TaskId>>,
}

impl TaskGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// The standard build graph.
    pub fn standard() -> Self {
        use TaskId::*;
        let mut graph = Self::new();
        graph.add(Styles, &[Inject]);
        graph.add(Scripts, &[Lint, Preprocess]);
        graph.add(Rewrite, &[Styles, Scripts, Fonts, Images]);
        graph.add(Build, &[Rewrite]);
        graph
    }

    /// Declare that `task` depends on `deps`.
    pub fn add(&mut self, task: TaskId, deps: &[TaskId]) {
        self.deps.entry(task).or_default().extend_from_slice(deps);
    }

    pub fn deps(&self, task: TaskId) -> &[TaskId] {
        self.deps.get(&task).map_or(&[], Vec::as_slice)
    }

    /// Plan a single target.
    pub fn plan(&self, target: TaskId) -> BuildResult<Vec<Vec<TaskId>>> {
        self.plan_all(&[target])
    }

    /// Topological levels of the union of the targets' closures.
    ///
    /// Each level is sorted, so plans are stable across runs.
    pub fn plan_all(&self, targets: &[TaskId]) -> BuildResult<Vec<Vec<TaskId>>> {
        let closure = self.closure(targets);

        let mut pending: FxHashMap<TaskId, usize> = closure
            .iter()
            .map(|&t| (t, self.deps(t).len()))
            .collect();
        let mut levels = Vec::new();

        while !pending.is_empty() {
            let mut ready: Vec<TaskId> = pending
                .iter()
                .filter(|(_, n)| **n == 0)
                .map(|(t, _)| *t)
                .collect();
            if ready.is_empty() {
                let mut cycle: Vec<_> = pending.into_keys().collect();
                cycle.sort();
                return Err(BuildError::Cycle(cycle));
            }
            ready.sort();

            for task in &ready {
                pending.remove(task);
            }
            for (task, remaining) in pending.iter_mut() {
                *remaining -= self.deps(*task).iter().filter(|d| ready.contains(d)).count();
            }
            levels.push(ready);
        }
        Ok(levels)
    }

    /// Targets plus everything they depend on.
    fn closure(&self, targets: &[TaskId]) -> FxHashSet<TaskId> {
        let mut seen = FxHashSet::default();
        let mut stack = targets.to_vec();
        while let Some(task) = stack.pop() {
            if seen.insert(task) {
                stack.extend_from_slice(self.deps(task));
            }
        }
        seen
    }
}

// =============================================================================
// Execution
// =============================================================================

fn execute(ctx: &TaskContext, task: TaskId) -> BuildResult<()> {
    debug!("task"; "start {}", task);
    match task {
        TaskId::Clean => tasks::clean(ctx),
        TaskId::Inject => tasks::inject::run(ctx),
        TaskId::Lint => tasks::lint::run(ctx),
        TaskId::Preprocess => tasks::compile::run(ctx),
        TaskId::Styles => tasks::styles(ctx),
        TaskId::Scripts => tasks::scripts(ctx),
        TaskId::Fonts => tasks::assets::fonts(ctx),
        TaskId::Images => tasks::assets::images(ctx),
        TaskId::Rewrite => tasks::rewrite(ctx),
        TaskId::Build => Ok(()),
    }
}

/// Run `targets` and everything they depend on.
pub fn run_all(ctx: &TaskContext, graph: &TaskGraph, targets: &[TaskId]) -> BuildResult<()> {
    let levels = graph.plan_all(targets)?;
    for level in levels {
        level
            .par_iter()
            .map(|&task| execute(ctx, task).map_err(|err| err.in_task(task)))
            .collect::<BuildResult<Vec<()>>>()?;
    }
    Ok(())
}

/// Run one target and its dependencies, logging the elapsed time.
pub fn run(ctx: &TaskContext, graph: &TaskGraph, target: TaskId) -> BuildResult<()> {
    let start = Instant::now();
    run_all(ctx, graph, &[target])?;
    log!(target.name(); "done in {:.2?}", start.elapsed());
    Ok(())
}

/// The default entry point: clean, then build.
pub fn run_default(ctx: &TaskContext, graph: &TaskGraph) -> BuildResult<()> {
    run(ctx, graph, TaskId::Clean)?;
    run(ctx, graph, TaskId::Build)
}

#[cfg(test)]
mod tests;
