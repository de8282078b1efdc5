//! CSV export of index entries.

use super::{format_date, IndexEntry};
use crate::error::IndexError;
use std::io::Write;

/// Column header of the export
pub const CSV_HEADER: [&str; 8] = [
    "hash",
    "file_name",
    "file_path",
    "file_size",
    "media_type",
    "date_added",
    "date_taken",
    "date_source",
];

/// Write entries as CSV to `sink`, in the order given.
pub fn write_csv<W: Write>(entries: &[IndexEntry], sink: W) -> Result<usize, IndexError> {
    let mut writer = csv::Writer::from_writer(sink);
    let fail = |e: csv::Error| IndexError::ExportFailed(e.to_string());

    writer.write_record(CSV_HEADER).map_err(fail)?;

    for entry in entries {
        writer
            .write_record([
                entry.hash.to_hex(),
                entry.file_name.clone(),
                entry.file_path.to_string_lossy().into_owned(),
                entry.file_size.to_string(),
                entry.media_type.clone(),
                format_date(&entry.date_added),
                entry.date_taken.as_ref().map(format_date).unwrap_or_default(),
                entry
                    .date_source
                    .map(|s| s.tag().to_string())
                    .unwrap_or_default(),
            ])
            .map_err(fail)?;
    }

    writer
        .flush()
        .map_err(|e| IndexError::ExportFailed(e.to_string()))?;
    Ok(entries.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::index::test_support::entry;

    #[test]
    fn writes_header_and_rows() {
        let entries = vec![
            entry(0xab, "a, with comma.jpg", "/t/a.jpg", Some((2020, 2, 3))),
            entry(0x01, "manual.jpg", "/t/m.jpg", None),
        ];
        let mut out = Vec::new();

        let written = write_csv(&entries, &mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        let lines: Vec<&str> = text.lines().collect();

        assert_eq!(written, 2);
        assert_eq!(
            lines[0],
            "hash,file_name,file_path,file_size,media_type,date_added,date_taken,date_source"
        );
        assert!(lines[1].starts_with(&"ab".repeat(16)));
        assert!(lines[1].contains("\"a, with comma.jpg\""));
        assert!(lines[1].ends_with("2020-02-03T10:30:00,EXIF"));
        assert!(lines[2].ends_with(",,"));
    }
}
