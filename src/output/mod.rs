use crate::history::HistoryEntry;
use crate::linker::LinkResult;
use crate::parser::ParseResult;
use serde::Serialize;
use std::io::{self, Write};

const KB: u64 = 1024;
const MB: u64 = 1024 * KB;
const GB: u64 = 1024 * MB;

/// Human-readable byte size: "1.50 GB", "700.0 MB", "12.0 KB", "512 B"
pub fn format_size(bytes: u64) -> String {
    if bytes >= GB {
        format!("{:.2} GB", bytes as f64 / GB as f64)
    } else if bytes >= MB {
        format!("{:.1} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.1} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} B", bytes)
    }
}

/// Write any serializable value as pretty JSON followed by a newline
pub fn display_json<T: Serialize>(value: &T, writer: &mut impl Write) -> io::Result<()> {
    serde_json::to_writer_pretty(&mut *writer, value)?;
    writeln!(writer)
}

pub fn display_parse_result(input: &str, result: &ParseResult, writer: &mut impl Write) -> io::Result<()> {
    writeln!(writer, "Input:  {}", input)?;
    writeln!(writer, "Name:   {}", result.name)?;
    match result.season {
        Some(season) => writeln!(writer, "Season: {}", season)?,
        None => writeln!(writer, "Season: -")?,
    }
    Ok(())
}

/// Display the outcome of a link operation or its dry run
pub fn display_link_result(result: &LinkResult, dry_run: bool, writer: &mut impl Write) -> io::Result<()> {
    writeln!(writer)?;
    if dry_run {
        writeln!(writer, "========================================")?;
        writeln!(writer, "              DRY RUN")?;
        writeln!(writer, "========================================")?;
        writeln!(writer)?;
    }

    writeln!(writer, "Destination: {}", result.dest_dir.display())?;
    writeln!(writer)?;

    if result.total() == 0 {
        writeln!(writer, "No video files found.")?;
        return Ok(());
    }

    if !result.files.is_empty() {
        if dry_run {
            writeln!(writer, "Would link:")?;
        } else {
            writeln!(writer, "Linked:")?;
        }
        for file in &result.files {
            writeln!(writer, "  {}", file.display())?;
        }
        writeln!(writer)?;
    }

    writeln!(writer, "----------------------------------------")?;
    writeln!(writer, "Summary:")?;
    let verb = if dry_run { "would be linked" } else { "linked" };
    writeln!(writer, "  {} files {} ({})", result.linked, verb, format_size(result.total_bytes))?;
    if result.skipped > 0 {
        writeln!(writer, "  {} already present, skipped", result.skipped)?;
    }
    if result.failed > 0 {
        writeln!(writer, "  {} failed", result.failed)?;
    }

    if dry_run {
        writeln!(writer)?;
        writeln!(writer, "Run `link` with the same arguments to apply these changes.")?;
    }

    Ok(())
}

/// Display the outcome of an undo or its preview
pub fn display_undo_result(
    result: &LinkResult,
    entry: &HistoryEntry,
    preview: bool,
    writer: &mut impl Write,
) -> io::Result<()> {
    writeln!(writer)?;
    if preview {
        writeln!(writer, "Undo would revert: {}", entry.describe())?;
    } else {
        writeln!(writer, "Reverted: {}", entry.describe())?;
    }
    writeln!(
        writer,
        "Linked at {} from {}",
        entry.timestamp.format("%Y-%m-%d %H:%M:%S UTC"),
        entry.source_label
    )?;
    writeln!(writer)?;

    let verb = if preview { "would be removed" } else { "removed" };
    writeln!(writer, "  {} files {} ({})", result.linked, verb, format_size(result.total_bytes))?;
    if result.skipped > 0 {
        writeln!(writer, "  {} already gone", result.skipped)?;
    }
    if result.failed > 0 {
        writeln!(writer, "  {} could not be removed", result.failed)?;
    }

    Ok(())
}

/// Display the outcome of an unlink
pub fn display_unlink_result(result: &LinkResult, writer: &mut impl Write) -> io::Result<()> {
    writeln!(writer)?;
    writeln!(writer, "Unlinked from {}", result.dest_dir.display())?;
    writeln!(writer, "  {} files removed ({})", result.linked, format_size(result.total_bytes))?;
    if result.failed > 0 {
        writeln!(writer, "  {} could not be removed", result.failed)?;
    }
    Ok(())
}

/// Display history entries in a simple tab-separated format for scripting
pub fn display_history(entries: &[HistoryEntry], writer: &mut impl Write) -> io::Result<()> {
    if entries.is_empty() {
        writeln!(writer, "No history.")?;
        return Ok(());
    }

    for entry in entries {
        writeln!(
            writer,
            "{}\t{}\t{}\t{} files\t{}\t{}",
            entry.id,
            entry.timestamp.format("%Y-%m-%d %H:%M:%S"),
            entry.describe(),
            entry.file_count,
            format_size(entry.total_bytes),
            entry.dest_dir.display()
        )?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::history::NewHistoryEntry;
    use crate::linker::{FileStatus, MediaType};
    use chrono::{TimeZone, Utc};
    use std::path::{Path, PathBuf};

    fn create_test_result() -> LinkResult {
        let mut result = LinkResult::new("/media/Frieren/Season 1");
        result.record(
            FileStatus::Linked,
            Path::new("/media/Frieren/Season 1/ep01.mkv"),
            1536 * MB,
        );
        result.record(FileStatus::Skipped, Path::new("/media/Frieren/Season 1/ep02.mkv"), 0);
        result
    }

    fn create_test_entry() -> HistoryEntry {
        NewHistoryEntry {
            media_type: MediaType::Series,
            show_name: "Frieren".to_string(),
            season: Some(1),
            file_count: 1,
            total_bytes: 1536 * MB,
            dest_dir: PathBuf::from("/media/Frieren/Season 1"),
            source_label: "[SubsPlease] Frieren S01".to_string(),
        }
        .into_entry(3, Utc.with_ymd_and_hms(2026, 1, 15, 10, 30, 45).unwrap())
    }

    fn render<F>(f: F) -> String
    where
        F: FnOnce(&mut Vec<u8>) -> io::Result<()>,
    {
        let mut output = Vec::new();
        f(&mut output).unwrap();
        String::from_utf8(output).unwrap()
    }

    #[test]
    fn test_format_size() {
        assert_eq!(format_size(0), "0 B");
        assert_eq!(format_size(512), "512 B");
        assert_eq!(format_size(1024), "1.0 KB");
        assert_eq!(format_size(1536), "1.5 KB");
        assert_eq!(format_size(700 * MB), "700.0 MB");
        assert_eq!(format_size(1536 * MB), "1.50 GB");
    }

    #[test]
    fn test_display_dry_run() {
        let output = render(|w| display_link_result(&create_test_result(), true, w));

        assert!(output.contains("DRY RUN"));
        assert!(output.contains("Destination: /media/Frieren/Season 1"));
        assert!(output.contains("Would link:"));
        assert!(output.contains("1 files would be linked (1.50 GB)"));
        assert!(output.contains("1 already present, skipped"));
        assert!(!output.contains("failed"));
    }

    #[test]
    fn test_display_link_result() {
        let output = render(|w| display_link_result(&create_test_result(), false, w));

        assert!(!output.contains("DRY RUN"));
        assert!(output.contains("Linked:"));
        assert!(output.contains("/media/Frieren/Season 1/ep01.mkv"));
        assert!(output.contains("1 files linked"));
    }

    #[test]
    fn test_display_link_result_empty() {
        let result = LinkResult::new("/movies/Nothing");
        let output = render(|w| display_link_result(&result, false, w));
        assert!(output.contains("No video files found."));
    }

    #[test]
    fn test_display_undo() {
        let output = render(|w| {
            display_undo_result(&create_test_result(), &create_test_entry(), false, w)
        });

        assert!(output.contains("Reverted: Frieren - Season 1"));
        assert!(output.contains("2026-01-15 10:30:45 UTC"));
        assert!(output.contains("[SubsPlease] Frieren S01"));
        assert!(output.contains("1 files removed"));
        assert!(output.contains("1 already gone"));
    }

    #[test]
    fn test_display_history() {
        let output = render(|w| display_history(&[create_test_entry()], w));
        assert_eq!(
            output,
            "3\t2026-01-15 10:30:45\tFrieren - Season 1\t1 files\t1.50 GB\t/media/Frieren/Season 1\n"
        );

        let output = render(|w| display_history(&[], w));
        assert_eq!(output, "No history.\n");
    }

    #[test]
    fn test_display_parse_result() {
        let result = ParseResult::new("Frieren", Some(1));
        let output = render(|w| display_parse_result("[SubsPlease] Frieren S01", &result, w));
        assert!(output.contains("Name:   Frieren"));
        assert!(output.contains("Season: 1"));
    }

    #[test]
    fn test_display_json() {
        let output = render(|w| display_json(&ParseResult::new("Frieren", None), w));
        let value: serde_json::Value = serde_json::from_str(&output).unwrap();
        assert_eq!(value["name"], "Frieren");
        assert!(value.get("season").is_none());
    }
}
