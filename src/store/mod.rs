//! Store-level orchestration: pairing up history files between two stores
//! and fanning the per-pair merges out across a worker pool.
//!
//! A store is either a single history file or a flat directory of history
//! files (subdirectories are not recursed into). The merge core only ever
//! sees one `(a, b, out)` triple at a time; everything here is glue.

mod plan;
mod run;

pub use plan::{plan_stores, CopyJob, MergeJob, MergePlan, StoreKind};
pub use run::{execute_plan, MergeSummary};

use anyhow::Result;
use std::path::Path;

/// Merge two stores into `dest`.
///
/// `dest` may equal `store1` (in-place mode); outputs are always written
/// to a temp file first and atomically renamed over the destination, so
/// inputs are never clobbered mid-read.
pub fn merge_stores(store1: &Path, store2: &Path, dest: &Path) -> Result<MergeSummary> {
    let plan = plan_stores(store1, store2, dest)?;
    execute_plan(&plan)
}
