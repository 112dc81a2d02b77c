//! Builds the list of per-file jobs for a store-level merge.

use anyhow::{bail, Context, Result};
use std::collections::BTreeSet;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// What kind of store a path points at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreKind {
    /// A single history file.
    File,
    /// A flat directory of history files.
    Directory,
}

impl StoreKind {
    fn of(path: &Path) -> Result<Self> {
        let metadata = std::fs::metadata(path)
            .with_context(|| format!("Failed to open store: {}", path.display()))?;
        Ok(if metadata.is_dir() {
            StoreKind::Directory
        } else {
            StoreKind::File
        })
    }
}

/// One file pair to run through the merge pipeline.
#[derive(Debug, Clone)]
pub struct MergeJob {
    pub a: PathBuf,
    pub b: PathBuf,
    pub out: PathBuf,
}

/// One file present on only one side, copied through verbatim.
#[derive(Debug, Clone)]
pub struct CopyJob {
    pub src: PathBuf,
    pub out: PathBuf,
}

/// Full set of jobs for a store-level merge.
#[derive(Debug, Clone)]
pub struct MergePlan {
    pub kind: StoreKind,
    pub merges: Vec<MergeJob>,
    pub copies: Vec<CopyJob>,
}

/// Pair up the members of two stores.
///
/// Both stores must be of the same kind; a file/directory mismatch is an
/// error. For directory stores, names present in both sides become merge
/// jobs and names present in exactly one side become copy jobs. Only the
/// top level of each directory is considered.
pub fn plan_stores(store1: &Path, store2: &Path, dest: &Path) -> Result<MergePlan> {
    let kind1 = StoreKind::of(store1)?;
    let kind2 = StoreKind::of(store2)?;
    if kind1 != kind2 {
        bail!(
            "Store kinds differ: {} is a {:?}, {} is a {:?} (both must be files or both directories)",
            store1.display(),
            kind1,
            store2.display(),
            kind2
        );
    }

    match kind1 {
        StoreKind::File => Ok(MergePlan {
            kind: StoreKind::File,
            merges: vec![MergeJob {
                a: store1.to_path_buf(),
                b: store2.to_path_buf(),
                out: dest.to_path_buf(),
            }],
            copies: Vec::new(),
        }),
        StoreKind::Directory => plan_directories(store1, store2, dest),
    }
}

fn plan_directories(dir1: &Path, dir2: &Path, dest: &Path) -> Result<MergePlan> {
    let names1 = list_files(dir1)?;
    let names2 = list_files(dir2)?;

    let mut merges = Vec::new();
    let mut copies = Vec::new();

    for name in &names1 {
        let a = dir1.join(name);
        let b = dir2.join(name);
        let out = dest.join(name);
        if names2.contains(name) {
            merges.push(MergeJob { a, b, out });
        } else {
            copies.push(CopyJob { src: a, out });
        }
    }

    for name in &names2 {
        if !names1.contains(name) {
            copies.push(CopyJob {
                src: dir2.join(name),
                out: dest.join(name),
            });
        }
    }

    Ok(MergePlan {
        kind: StoreKind::Directory,
        merges,
        copies,
    })
}

/// File names at the top level of a store directory, subdirectories skipped.
fn list_files(dir: &Path) -> Result<BTreeSet<OsString>> {
    let mut names = BTreeSet::new();
    for entry in WalkDir::new(dir).min_depth(1).max_depth(1).follow_links(false) {
        let entry =
            entry.with_context(|| format!("Failed to list store directory: {}", dir.display()))?;
        if entry.file_type().is_file() {
            names.insert(entry.file_name().to_os_string());
        }
    }
    Ok(names)
}
