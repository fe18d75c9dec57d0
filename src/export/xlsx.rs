//! Export message records to an Excel workbook (`.xlsx`).
//!
//! One worksheet, a bold header row, one row per record. Column widths fit
//! the longest value in each column plus padding, capped so long bodies do
//! not produce unusably wide columns.

use std::borrow::Cow;

use rust_xlsxwriter::{Format, Workbook};

use crate::error::Result;
use crate::model::record::{MessageRecord, COLUMNS};

use super::ExportOptions;

/// Excel refuses cell strings longer than this many characters.
const MAX_CELL_CHARS: usize = 32_767;

/// Extra characters added to the longest value when sizing a column.
const WIDTH_PADDING: usize = 2;

/// Columns written as numbers rather than text.
const INDEX_COL: usize = 0;
const BODY_LENGTH_COL: usize = 13;

/// Render records as an `.xlsx` workbook.
pub fn export_xlsx(records: &[MessageRecord], options: &ExportOptions) -> Result<Vec<u8>> {
    let mut workbook = Workbook::new();
    let header_format = Format::new().set_bold();

    let worksheet = workbook.add_worksheet();
    worksheet.set_name(&options.sheet_name)?;

    for (col, name) in COLUMNS.iter().enumerate() {
        worksheet.write_string_with_format(0, col as u16, *name, &header_format)?;
    }

    for (i, record) in records.iter().enumerate() {
        let row = (i + 1) as u32;
        for (col, value) in record.row().iter().enumerate() {
            match col {
                INDEX_COL => {
                    worksheet.write_number(row, col as u16, record.index as f64)?;
                }
                BODY_LENGTH_COL => {
                    worksheet.write_number(row, col as u16, record.body_length() as f64)?;
                }
                _ if value.is_empty() => {}
                _ => {
                    worksheet.write_string(row, col as u16, cell_text(value))?;
                }
            }
        }
    }

    for (col, width) in column_widths(records, options.max_column_width)
        .into_iter()
        .enumerate()
    {
        worksheet.set_column_width(col as u16, width as f64)?;
    }

    Ok(workbook.save_to_buffer()?)
}

/// Width of each column in [`COLUMNS`] order: the longest value (header
/// included) plus padding, capped at `max_width`.
pub fn column_widths(records: &[MessageRecord], max_width: usize) -> Vec<usize> {
    let mut longest: Vec<usize> = COLUMNS.iter().map(|c| c.chars().count()).collect();
    for record in records {
        for (col, value) in record.row().iter().enumerate() {
            longest[col] = longest[col].max(value.chars().count());
        }
    }
    longest
        .into_iter()
        .map(|len| (len + WIDTH_PADDING).min(max_width))
        .collect()
}

/// Clip a value to Excel's per-cell limit.
fn cell_text(value: &str) -> Cow<'_, str> {
    match value.char_indices().nth(MAX_CELL_CHARS) {
        Some((cut, _)) => {
            tracing::debug!(
                chars = value.chars().count(),
                "Truncating cell to Excel's limit"
            );
            Cow::Owned(value[..cut].to_string())
        }
        None => Cow::Borrowed(value),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::record::RecordHeaders;
    use calamine::{Data, Reader, Xlsx};
    use std::io::Cursor;

    fn read_back(buf: Vec<u8>, sheet: &str) -> calamine::Range<Data> {
        let mut workbook: Xlsx<_> = calamine::open_workbook_from_rs(Cursor::new(buf)).unwrap();
        workbook.worksheet_range(sheet).unwrap()
    }

    #[test]
    fn test_empty_has_header_row() {
        let buf = export_xlsx(&[], &ExportOptions::default()).unwrap();
        let range = read_back(buf, "Emails");
        assert_eq!(range.height(), 1);
        assert_eq!(
            range.get_value((0, 0)),
            Some(&Data::String("Index".to_string()))
        );
        assert_eq!(
            range.get_value((0, 13)),
            Some(&Data::String("Body_Length".to_string()))
        );
    }

    #[test]
    fn test_rows_written() {
        let headers = RecordHeaders {
            subject: "Hello".to_string(),
            ..Default::default()
        };
        let records = vec![MessageRecord::new(1, headers, "Hi there".to_string())];
        let buf = export_xlsx(&records, &ExportOptions::default()).unwrap();
        let range = read_back(buf, "Emails");
        assert_eq!(range.height(), 2);
        assert_eq!(range.get_value((1, 0)), Some(&Data::Float(1.0)));
        assert_eq!(
            range.get_value((1, 2)),
            Some(&Data::String("Hello".to_string()))
        );
        assert_eq!(
            range.get_value((1, 12)),
            Some(&Data::String("Hi there".to_string()))
        );
        assert_eq!(range.get_value((1, 13)), Some(&Data::Float(8.0)));
    }

    #[test]
    fn test_custom_sheet_name() {
        let options = ExportOptions {
            sheet_name: "Mail".to_string(),
            ..Default::default()
        };
        let buf = export_xlsx(&[], &options).unwrap();
        let range = read_back(buf, "Mail");
        assert_eq!(range.height(), 1);
    }

    #[test]
    fn test_column_widths_fit_and_cap() {
        let headers = RecordHeaders {
            subject: "Hi".to_string(),
            from: "Alice Example <alice@example.com>".to_string(),
            ..Default::default()
        };
        let records = vec![MessageRecord::new(1, headers, "z".repeat(500))];
        let widths = column_widths(&records, 50);
        assert_eq!(widths.len(), COLUMNS.len());
        // Short values: header length + padding.
        assert_eq!(widths[0], "Index".len() + 2);
        assert_eq!(widths[2], "Subject".len() + 2);
        assert_eq!(widths[13], "Body_Length".len() + 2);
        // Value longer than its header.
        assert_eq!(widths[3], "Alice Example <alice@example.com>".len() + 2);
        // Long body hits the cap.
        assert_eq!(widths[12], 50);
    }

    #[test]
    fn test_column_widths_without_records() {
        let widths = column_widths(&[], 50);
        let expected: Vec<usize> = COLUMNS.iter().map(|c| c.len() + 2).collect();
        assert_eq!(widths, expected);
        assert!(column_widths(&[], 4).iter().all(|&w| w == 4));
    }

    #[test]
    fn test_cell_text_truncation() {
        let long = "x".repeat(MAX_CELL_CHARS + 10);
        assert_eq!(cell_text(&long).chars().count(), MAX_CELL_CHARS);
        assert!(matches!(cell_text("short"), Cow::Borrowed("short")));
    }

    #[test]
    fn test_oversized_body_still_exports() {
        let body = "y".repeat(MAX_CELL_CHARS * 2);
        let records = vec![MessageRecord::new(1, RecordHeaders::default(), body)];
        assert!(export_xlsx(&records, &ExportOptions::default()).is_ok());
    }
}
