//! Executes a merge plan, fanning independent file pairs out over a
//! rayon worker pool.
//!
//! Every output is written to a temp file in the destination directory and
//! atomically renamed into place, so in-place runs never overwrite an
//! input that another worker (or the same job) is still reading. A failed
//! pair is logged and skipped; the run as a whole fails if any pair did.

use anyhow::{bail, Context, Result};
use rayon::prelude::*;
use std::fs;
use std::path::Path;
use tempfile::NamedTempFile;

use super::plan::{CopyJob, MergeJob, MergePlan};
use crate::merge::merge_files;

/// Totals for one store-level merge run.
#[derive(Debug, Default, Clone, Copy)]
pub struct MergeSummary {
    /// File pairs merged through the engine.
    pub merged_files: usize,
    /// One-sided files copied through verbatim.
    pub copied_files: usize,
    /// Records written across all merged pairs.
    pub records_written: usize,
    /// Duplicate records dropped across all merged pairs.
    pub duplicates_dropped: usize,
}

/// Run every job in `plan`, continuing past per-pair failures.
///
/// Merge jobs run in parallel; pass-through copies are cheap and run
/// sequentially afterwards. Returns an error naming the failed-pair count
/// if anything went wrong, after all independent jobs have been attempted.
pub fn execute_plan(plan: &MergePlan) -> Result<MergeSummary> {
    let mut summary = MergeSummary::default();
    let mut failed = 0usize;

    let results: Vec<Result<(usize, usize)>> =
        plan.merges.par_iter().map(run_merge_job).collect();

    for (job, result) in plan.merges.iter().zip(results) {
        match result {
            Ok((written, dropped)) => {
                summary.merged_files += 1;
                summary.records_written += written;
                summary.duplicates_dropped += dropped;
            }
            Err(e) => {
                log::error!(
                    "Failed to merge {} + {} -> {}: {:#}",
                    job.a.display(),
                    job.b.display(),
                    job.out.display(),
                    e
                );
                failed += 1;
            }
        }
    }

    for job in &plan.copies {
        match run_copy_job(job) {
            Ok(()) => summary.copied_files += 1,
            Err(e) => {
                log::error!(
                    "Failed to copy {} -> {}: {:#}",
                    job.src.display(),
                    job.out.display(),
                    e
                );
                failed += 1;
            }
        }
    }

    if failed > 0 {
        bail!(
            "{} of {} file operations failed",
            failed,
            plan.merges.len() + plan.copies.len()
        );
    }

    log::info!(
        "Merged {} file pair(s), copied {} file(s), {} records written, {} duplicates dropped",
        summary.merged_files,
        summary.copied_files,
        summary.records_written,
        summary.duplicates_dropped
    );

    Ok(summary)
}

/// Merge one pair into a temp file, then rename it over the destination.
fn run_merge_job(job: &MergeJob) -> Result<(usize, usize)> {
    log::info!(
        "Merging: {} + {} -> {}",
        job.a.display(),
        job.b.display(),
        job.out.display()
    );

    let out_dir = job.out.parent().unwrap_or_else(|| Path::new("."));
    fs::create_dir_all(out_dir)
        .with_context(|| format!("Failed to create directory: {}", out_dir.display()))?;

    // Same filesystem as the destination, so persist() is an atomic rename.
    let temp = NamedTempFile::new_in(out_dir)
        .with_context(|| format!("Failed to create temp file in {}", out_dir.display()))?;

    let counts = merge_files(&job.a, &job.b, temp.path())?;

    temp.persist(&job.out)
        .with_context(|| format!("Failed to replace output file: {}", job.out.display()))?;

    Ok(counts)
}

/// Copy a one-sided file through verbatim.
///
/// A copy whose source and destination are the same file (in-place mode
/// copying a store1-only file onto itself) is a no-op.
fn run_copy_job(job: &CopyJob) -> Result<()> {
    if job.out.exists() && is_same_file(&job.src, &job.out)? {
        log::debug!("Skipping self-copy: {}", job.src.display());
        return Ok(());
    }

    log::info!("Copying: {} -> {}", job.src.display(), job.out.display());

    if let Some(parent) = job.out.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
    }

    fs::copy(&job.src, &job.out).with_context(|| {
        format!(
            "Failed to copy {} -> {}",
            job.src.display(),
            job.out.display()
        )
    })?;

    Ok(())
}

fn is_same_file(a: &Path, b: &Path) -> Result<bool> {
    let a = fs::canonicalize(a)
        .with_context(|| format!("Failed to resolve path: {}", a.display()))?;
    let b = fs::canonicalize(b)
        .with_context(|| format!("Failed to resolve path: {}", b.display()))?;
    Ok(a == b)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::plan_stores;
    use tempfile::TempDir;

    const T1: &str = "20200101T00:00:00Z";
    const T2: &str = "20200101T00:00:01Z";

    #[test]
    fn test_copy_skips_same_file() {
        let dir = TempDir::new().unwrap();
        let src = dir.path().join("history");
        std::fs::write(&src, format!("MS {T1} 000 hi\n")).unwrap();

        let job = CopyJob {
            src: src.clone(),
            out: src.clone(),
        };
        run_copy_job(&job).unwrap();
        assert_eq!(
            std::fs::read_to_string(&src).unwrap(),
            format!("MS {T1} 000 hi\n")
        );
    }

    #[test]
    fn test_execute_continues_past_bad_pair() {
        let dir = TempDir::new().unwrap();
        let dir1 = dir.path().join("one");
        let dir2 = dir.path().join("two");
        let out = dir.path().join("out");
        std::fs::create_dir_all(&dir1).unwrap();
        std::fs::create_dir_all(&dir2).unwrap();

        // "good" merges cleanly; "bad" has a truncated record on one side.
        std::fs::write(dir1.join("good"), format!("MS {T1} 000 a\n")).unwrap();
        std::fs::write(dir2.join("good"), format!("MS {T2} 000 b\n")).unwrap();
        std::fs::write(dir1.join("bad"), format!("MS {T1} 002 truncated\n")).unwrap();
        std::fs::write(dir2.join("bad"), format!("MS {T1} 000 fine\n")).unwrap();

        let plan = plan_stores(&dir1, &dir2, &out).unwrap();
        let err = execute_plan(&plan).unwrap_err();
        assert!(err.to_string().contains("1 of 2"));

        // The good pair was still produced; the bad one was not.
        assert!(out.join("good").exists());
        assert!(!out.join("bad").exists());
    }

    #[test]
    fn test_in_place_merge_replaces_first_store() {
        let dir = TempDir::new().unwrap();
        let a = dir.path().join("a");
        let b = dir.path().join("b");
        std::fs::write(&a, format!("MS {T1} 000 one\n")).unwrap();
        std::fs::write(&b, format!("MR {T2} 000 two\n")).unwrap();

        // In-place: destination is the first input.
        let plan = plan_stores(&a, &b, &a).unwrap();
        let summary = execute_plan(&plan).unwrap();
        assert_eq!(summary.merged_files, 1);
        assert_eq!(summary.records_written, 2);

        assert_eq!(
            std::fs::read_to_string(&a).unwrap(),
            format!("MS {T1} 000 one\nMR {T2} 000 two\n")
        );
        // The second store is untouched.
        assert_eq!(
            std::fs::read_to_string(&b).unwrap(),
            format!("MR {T2} 000 two\n")
        );
    }
}
