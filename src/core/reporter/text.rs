//! Plain-text rendering of a run outcome.

use super::format_bytes;
use crate::core::organize::OperationMode;
use crate::core::pipeline::RunOutcome;
use chrono::Local;
use std::io::Write;

fn heading<W: Write>(writer: &mut W, title: &str, width: usize) -> std::io::Result<()> {
    writeln!(writer, "{}:", title)?;
    writeln!(writer, "{}", "-".repeat(width))
}

fn on_off(enabled: bool) -> &'static str {
    if enabled {
        "enabled"
    } else {
        "disabled"
    }
}

/// Render the report for `outcome` into `writer`
pub fn render_report<W: Write>(outcome: &RunOutcome, mut writer: W) -> std::io::Result<()> {
    let config = &outcome.config;
    let copying = config.operation == OperationMode::Copy;

    writeln!(writer, "MEDIA SORT REPORT")?;
    writeln!(writer, "{}", "=".repeat(50))?;
    writeln!(writer)?;
    writeln!(writer, "Date: {}", Local::now().format("%Y-%m-%d %H:%M:%S"))?;
    writeln!(writer, "Run: {}", outcome.run_id)?;
    writeln!(writer, "Source: {}", config.source.display())?;
    writeln!(writer, "Target: {}", config.target.display())?;
    writeln!(writer)?;

    heading(&mut writer, "OPTIONS", 25)?;
    writeln!(writer, "Mode: {}", config.operation.name())?;
    writeln!(writer, "Layout: {}", config.layout.name())?;
    writeln!(writer, "Media kinds: {}", config.media_description())?;
    writeln!(writer, "Hash index: {}", on_off(config.use_index))?;
    write!(writer, "Date validation: {}", on_off(config.validate_dates))?;
    if config.validate_dates {
        write!(writer, " (from {})", config.earliest_year)?;
    }
    writeln!(writer)?;
    writeln!(writer, "Turbo duplicate detection: {}", on_off(config.turbo))?;
    writeln!(writer, "Duplicate handling: {}", config.duplicates.name())?;
    write!(writer, "Batch processing: {}", on_off(config.batch))?;
    if config.batch {
        write!(writer, " (batch size {})", config.batch_size)?;
    }
    writeln!(writer)?;
    writeln!(writer)?;

    let action = if copying { "Copied files" } else { "Moved files" };
    writeln!(writer, "{}: {}", action, outcome.filed.len())?;
    writeln!(writer, "Duplicate groups: {}", outcome.duplicate_groups.len())?;
    if !outcome.duplicate_groups.is_empty() {
        writeln!(
            writer,
            "Space held by extra copies: {}",
            format_bytes(outcome.duplicate_bytes())
        )?;
    }
    writeln!(writer, "Files with unknown date: {}", outcome.unknown_date.len())?;
    writeln!(writer, "Files with invalid date: {}", outcome.invalid_date.len())?;
    writeln!(writer, "Skipped files (already indexed): {}", outcome.skipped.len())?;
    writeln!(writer, "Date conflict corrections: {}", outcome.conflicts.len())?;
    writeln!(writer, "Failed files: {}", outcome.failed.len())?;
    writeln!(writer)?;

    if let Some(stats) = &outcome.index_stats {
        heading(&mut writer, "INDEX STATISTICS", 30)?;
        writeln!(writer, "Total entries: {}", stats.total_entries)?;
        writeln!(writer, "Distinct hashes: {}", stats.distinct_hashes)?;
        writeln!(writer, "Duplicate entries: {}", stats.duplicate_entries)?;
        if let (Some(earliest), Some(latest)) = (stats.earliest_taken, stats.latest_taken) {
            writeln!(
                writer,
                "Date range: {} to {}",
                earliest.format("%Y-%m-%d"),
                latest.format("%Y-%m-%d")
            )?;
        }
        writeln!(writer)?;
    }

    if !outcome.duplicate_groups.is_empty() {
        heading(&mut writer, "DUPLICATES", 20)?;
        for group in &outcome.duplicate_groups {
            let hex = group.hash.to_hex();
            writeln!(
                writer,
                "Hash {}: {} files, {} in extra copies",
                &hex[..8],
                group.files.len(),
                format_bytes(group.wasted_bytes())
            )?;
            for file in &group.files {
                writeln!(writer, "  - {}", file.path.display())?;
            }
            writeln!(writer)?;
        }
    }

    let lists = [
        ("FILES WITH UNKNOWN DATE", 30, &outcome.unknown_date),
        ("FILES WITH INVALID DATE", 30, &outcome.invalid_date),
        ("SKIPPED FILES (ALREADY INDEXED)", 35, &outcome.skipped),
    ];
    for (title, width, paths) in lists {
        if paths.is_empty() {
            continue;
        }
        heading(&mut writer, title, width)?;
        for path in paths {
            writeln!(writer, "  - {}", path.display())?;
        }
        writeln!(writer)?;
    }

    if !outcome.conflicts.is_empty() {
        heading(&mut writer, "DATE CONFLICTS", 25)?;
        for conflict in &outcome.conflicts {
            let name = conflict
                .file
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default();
            writeln!(writer, "  - {}: {} → {}", name, conflict.old, conflict.new)?;
        }
        writeln!(writer)?;
    }

    if !outcome.failed.is_empty() {
        heading(&mut writer, "FAILED FILES", 20)?;
        for failure in &outcome.failed {
            writeln!(writer, "  - {}: {}", failure.path.display(), failure.message)?;
        }
        writeln!(writer)?;
    }

    if !outcome.set_aside.is_empty() {
        heading(&mut writer, "DUPLICATES MOVED", 20)?;
        for moved in &outcome.set_aside {
            writeln!(writer, "{} -> {}", moved.source.display(), moved.destination.display())?;
        }
        writeln!(writer)?;
    }

    let header = if copying { "COPIED FILES" } else { "MOVED FILES" };
    heading(&mut writer, header, 20)?;
    for filed in &outcome.filed {
        writeln!(writer, "{} -> {}", filed.source.display(), filed.destination.display())?;
    }

    writer.flush()
}
