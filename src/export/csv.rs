//! Export message records to CSV.
//!
//! One header row, then one row per record in [`COLUMNS`] order. Quoting
//! follows RFC 4180: fields containing the delimiter, quotes, or line breaks
//! are wrapped in double quotes. Rows end with `\n`.

use crate::error::{ConvertError, Result};
use crate::model::format::ExportFormat;
use crate::model::record::{MessageRecord, COLUMNS};

use super::ExportOptions;

const UTF8_BOM: &[u8] = &[0xEF, 0xBB, 0xBF];

/// Render records as CSV bytes.
pub fn export_csv(records: &[MessageRecord], options: &ExportOptions) -> Result<Vec<u8>> {
    let mut buf = Vec::new();
    if options.csv_bom {
        buf.extend_from_slice(UTF8_BOM);
    }

    let mut writer = csv::WriterBuilder::new()
        .delimiter(options.csv_separator)
        .terminator(csv::Terminator::Any(b'\n'))
        .from_writer(buf);

    writer.write_record(COLUMNS)?;
    for record in records {
        writer.write_record(record.row())?;
    }

    writer.into_inner().map_err(|e| ConvertError::Export {
        format: ExportFormat::Csv,
        reason: e.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::record::RecordHeaders;

    const HEADER: &str = "Index,Message-ID,Subject,From,To,Cc,Bcc,Reply-To,Date,Date_Raw,In-Reply-To,References,Body,Body_Length\n";

    fn record(subject: &str, body: &str) -> MessageRecord {
        let headers = RecordHeaders {
            subject: subject.to_string(),
            from: "Alice <alice@example.com>".to_string(),
            ..Default::default()
        };
        MessageRecord::new(1, headers, body.to_string())
    }

    fn to_string(records: &[MessageRecord]) -> String {
        String::from_utf8(export_csv(records, &ExportOptions::default()).unwrap()).unwrap()
    }

    #[test]
    fn test_empty_is_header_only() {
        assert_eq!(to_string(&[]), HEADER);
    }

    #[test]
    fn test_simple_row() {
        let out = to_string(&[record("Hello", "Hi")]);
        assert_eq!(
            out,
            format!("{HEADER}1,,Hello,Alice <alice@example.com>,,,,,,,,,Hi,2\n")
        );
    }

    #[test]
    fn test_quoting() {
        let out = to_string(&[record("hello, world", "say \"hi\"\nbye")]);
        assert!(out.contains(",\"hello, world\","));
        assert!(out.contains(",\"say \"\"hi\"\"\nbye\",12\n"));
    }

    #[test]
    fn test_bom_and_separator() {
        let options = ExportOptions {
            csv_bom: true,
            csv_separator: b';',
            ..Default::default()
        };
        let out = export_csv(&[], &options).unwrap();
        assert!(out.starts_with(UTF8_BOM));
        assert!(String::from_utf8_lossy(&out[3..]).starts_with("Index;Message-ID;"));
    }

    #[test]
    fn test_idempotent() {
        let records = vec![record("A", "x"), record("B", "y, z")];
        assert_eq!(to_string(&records), to_string(&records));
    }
}
