//! Chronological sort and duplicate-collapsing merge of history records.
//!
//! mcabber can write entries slightly out of order, so each input file is
//! stable-sorted by timestamp before merging. The merge itself is a classic
//! two-pointer pass over the two sorted sequences: equal-timestamp,
//! content-equal pairs collapse to a single record, with the first input
//! winning ties.

use anyhow::{Context, Result};
use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

use crate::error::HistoryError;
use crate::record::{read_records, Record};

/// Read, decode and chronologically sort one history file.
///
/// The sort is stable: records sharing a timestamp keep their original
/// file order, which the duplicate rule in [`merge_records`] relies on.
pub fn read_history(path: &Path) -> Result<Vec<Record>, HistoryError> {
    let mut reader = BufReader::new(File::open(path)?);
    let mut records = read_records(&mut reader)?;
    records.sort_by(|a, b| a.timestamp.cmp(&b.timestamp));
    Ok(records)
}

/// Merge two timestamp-sorted record sequences into `writer`.
///
/// `a` is the primary side: when both cursors point at records with the
/// same timestamp, an exactly content-equal record on the `b` side is
/// dropped as a duplicate, and on equal-but-different records `a`'s entry
/// is emitted first. Callers who care which store wins ties should pass it
/// as `a`.
///
/// Returns the number of records written.
pub fn merge_records<W: Write>(
    a: &[Record],
    b: &[Record],
    writer: &mut W,
) -> Result<usize, HistoryError> {
    debug_assert!(is_sorted(a), "merge input a is not timestamp-sorted");
    debug_assert!(is_sorted(b), "merge input b is not timestamp-sorted");

    let mut emitted = 0;
    let mut i = 0;
    let mut j = 0;

    while i < a.len() && j < b.len() {
        match a[i].timestamp.cmp(&b[j].timestamp) {
            std::cmp::Ordering::Greater => {
                b[j].write_to(writer)?;
                j += 1;
            }
            ordering => {
                // Identical entry on both sides: keep a's copy only.
                if ordering == std::cmp::Ordering::Equal && a[i] == b[j] {
                    j += 1;
                }
                a[i].write_to(writer)?;
                i += 1;
            }
        }
        emitted += 1;
    }

    for record in &a[i..] {
        record.write_to(writer)?;
        emitted += 1;
    }
    for record in &b[j..] {
        record.write_to(writer)?;
        emitted += 1;
    }

    Ok(emitted)
}

fn is_sorted(records: &[Record]) -> bool {
    records.windows(2).all(|w| w[0].timestamp <= w[1].timestamp)
}

/// Merge two history files into `out`.
///
/// Both inputs are read fully (and sorted) before the output is created,
/// so `out` may live next to the inputs; it must not BE an input unless
/// the caller replaces it atomically afterwards. On any decode error in
/// either input no output file is produced.
///
/// Returns `(records_written, duplicates_dropped)`.
pub fn merge_files(a: &Path, b: &Path, out: &Path) -> Result<(usize, usize)> {
    let records_a =
        read_history(a).with_context(|| format!("Failed to read history file: {}", a.display()))?;
    let records_b =
        read_history(b).with_context(|| format!("Failed to read history file: {}", b.display()))?;

    if let Some(parent) = out.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
    }

    let file = File::create(out)
        .with_context(|| format!("Failed to create output file: {}", out.display()))?;
    let mut writer = BufWriter::new(file);

    let total = records_a.len() + records_b.len();
    let written = merge_records(&records_a, &records_b, &mut writer)
        .with_context(|| format!("Failed to write merged history: {}", out.display()))?;
    writer
        .flush()
        .with_context(|| format!("Failed to write merged history: {}", out.display()))?;

    let dropped = total - written;
    log::debug!(
        "Merged {} + {} -> {} ({} records, {} duplicates dropped)",
        a.display(),
        b.display(),
        out.display(),
        written,
        dropped
    );

    Ok((written, dropped))
}
