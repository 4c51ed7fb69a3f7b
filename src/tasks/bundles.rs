//! `styles` and `scripts`: resolve → pipeline → ledger, per bundle.

use rayon::prelude::*;

use super::TaskContext;
use crate::error::BuildResult;
use crate::ledger::{RevisionEntry, RevisionLedger};
use crate::log;
use crate::manifest::BundleKind;
use crate::pipeline::run_pipeline;
use crate::resolve::resolve_bundle;
use crate::utils::plural_count;

/// Build every bundle of `kind` in parallel.
///
/// Returns the ledger entries written, sorted by logical path.
pub fn run(ctx: &TaskContext, kind: BundleKind) -> BuildResult<Vec<RevisionEntry>> {
    let pipeline = ctx.pipeline();
    let ledger = RevisionLedger::new(ctx.build_dir());
    let bundles: Vec<_> = ctx.manifest.bundles_of(kind).collect();

    let results = bundles
        .par_iter()
        .map(|bundle| {
            let resolved = resolve_bundle(bundle, &ctx.manifest.paths);
            let count = resolved.files.len();
            let result = run_pipeline(&resolved, &pipeline)?;
            let entry = ledger.record(kind.dir(), &result)?;
            log!(kind.dir(); "{} from {}, {} bytes", result.filename,
                plural_count(count, "file"), result.bytes.len());
            Ok(entry)
        })
        .collect::<BuildResult<Vec<_>>>()?;

    let mut entries: Vec<_> = results.into_iter().flatten().collect();
    entries.sort_by(|a, b| a.logical_path.cmp(&b.logical_path));
    Ok(entries)
}
