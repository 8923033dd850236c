//! Plain-text output for the terminal.
//!
//! * the ranked disk-usage listing (`X.YUNIT, path` lines)
//! * the duplicate listing, with size mismatches highlighted
//! * the end-of-run counters

use std::io::{self, Write};

use yansi::Paint;

use crate::accounting::{format_units, DirSizeTotals, RankScope, Ranking};
use crate::duplicates::{DuplicateGroup, ScanSummary};
use crate::progress::totals_message;

/// Write the ranking header and one line per entry.
///
/// # Example
///
/// ```
/// use fastdu::accounting::{DirSizeTotals, RankScope};
/// use fastdu::output::text::write_ranking;
/// use std::path::Path;
///
/// let mut totals = DirSizeTotals::default();
/// totals.add(Path::new("/data/a"), 5_000_000);
///
/// let mut out = Vec::new();
/// write_ranking(&mut out, &totals.ranked(10, RankScope::Directories), 10).unwrap();
/// let text = String::from_utf8(out).unwrap();
/// assert_eq!(text, "Printing top available 1\n5.0MB, /data/a\n");
/// ```
///
/// # Errors
///
/// Returns any error from `writer`.
pub fn write_ranking<W: Write>(writer: &mut W, ranking: &Ranking, top: i64) -> io::Result<()> {
    if ranking.limited {
        writeln!(writer, "Printing top {top} dirs/files")?;
    } else {
        writeln!(writer, "Printing top available {}", ranking.entries.len())?;
    }
    for (path, bytes) in &ranking.entries {
        writeln!(writer, "{}, {path}", format_units(*bytes))?;
    }
    Ok(())
}

/// Rank `totals` and print the listing to stdout.
///
/// # Errors
///
/// Returns an error if stdout cannot be written.
pub fn print_ranking(totals: &DirSizeTotals, top: i64, summary: bool) -> io::Result<()> {
    let scope = if summary {
        RankScope::TopLevel
    } else {
        RankScope::Directories
    };
    let ranking = totals.ranked(top, scope);
    let stdout = io::stdout();
    let mut lock = stdout.lock();
    write_ranking(&mut lock, &ranking, top)
}

/// Write every duplicate set with its path analysis.
///
/// # Errors
///
/// Returns any error from `writer`.
pub fn write_duplicates<W: Write>(writer: &mut W, groups: &[DuplicateGroup]) -> io::Result<()> {
    for group in groups {
        let header = format!(
            "{} ({} copies, {})",
            group.name,
            group.occurrences.len(),
            format_units(group.size)
        );
        if group.size_mismatch {
            writeln!(writer, "{} {}", header.yellow().bold(), "[size mismatch]".red())?;
        } else {
            writeln!(writer, "{}", header.bold())?;
        }

        if !group.analysis.common_suffix.is_empty() {
            writeln!(writer, "  suffix:   {}", group.analysis.common_suffix)?;
        }
        if !group.analysis.common_ancestor.is_empty() {
            writeln!(writer, "  ancestor: {}", group.analysis.common_ancestor)?;
        }
        for occurrence in &group.occurrences {
            if occurrence.size == group.size {
                writeln!(writer, "    {}", occurrence.path)?;
            } else {
                let size = format!("({})", format_units(occurrence.size));
                writeln!(writer, "    {} {}", occurrence.path, size.red())?;
            }
        }
    }
    Ok(())
}

/// Write the end-of-run counters.
///
/// # Errors
///
/// Returns any error from `writer`.
pub fn write_summary<W: Write>(
    writer: &mut W,
    summary: &ScanSummary,
    totals: &DirSizeTotals,
) -> io::Result<()> {
    let s = &summary.stats;
    writeln!(writer, "Scan statistics:")?;
    let rows = [
        ("files seen", s.files_seen),
        ("images", s.images),
        ("audio", s.audio),
        ("videos", s.videos),
        ("other files", s.other_files),
        ("skipped by pattern", s.skipped_by_pattern),
        ("skipped symlinks", s.skipped_symlinks),
        ("empty files", s.empty_files),
        ("classify errors", s.classify_errors),
        ("metadata errors", s.metadata_errors),
        ("size mismatches", s.size_mismatches),
        ("directory errors", s.directory_errors),
        ("entry errors", s.entry_errors),
        ("root errors", s.root_errors),
    ];
    for (label, value) in rows {
        writeln!(writer, "  {label:<20}{value}")?;
    }
    writeln!(
        writer,
        "  {:<20}{} ({} extra copies, {} mismatched)",
        "duplicate sets", summary.duplicate_groups, summary.duplicate_files, summary.mismatched_groups
    )?;
    writeln!(writer, "  {:<20}{:.2?}", "duration", summary.scan_duration)?;

    if summary.is_clean() {
        writeln!(writer, "{}", "Scan completed cleanly".green())?;
    } else {
        let line = format!("Scan absorbed {} error(s)", s.absorbed_errors());
        writeln!(writer, "{}", line.yellow())?;
    }

    writeln!(writer, "{}", totals_message(totals.file_count(), totals.total_bytes()))
}
