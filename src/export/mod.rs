//! Export functionality: CSV, Excel spreadsheet, and plain-text dumps of
//! message records, plus output file naming.
//!
//! Every exporter is a pure function over the full record slice that returns
//! an in-memory buffer. None of them mutate their input.

pub mod csv;
pub mod filename;
pub mod text;
pub mod xlsx;

use serde::Serialize;
use tracing::debug;

use crate::error::Result;
use crate::model::format::ExportFormat;
use crate::model::record::MessageRecord;

/// Formatting knobs shared by the exporters.
#[derive(Debug, Clone)]
pub struct ExportOptions {
    /// CSV field delimiter (ASCII).
    pub csv_separator: u8,
    /// Prefix the CSV with a UTF-8 BOM (helps Excel detect the encoding).
    pub csv_bom: bool,
    /// Worksheet name in the spreadsheet.
    pub sheet_name: String,
    /// Upper bound on spreadsheet column widths, in characters.
    pub max_column_width: usize,
    /// Width of the `=` and `-` rules in the text dump.
    pub text_rule_width: usize,
    /// Maximum length of the sanitized output base name.
    pub max_filename_len: usize,
}

impl Default for ExportOptions {
    fn default() -> Self {
        Self {
            csv_separator: b',',
            csv_bom: false,
            sheet_name: "Emails".to_string(),
            max_column_width: 50,
            text_rule_width: 80,
            max_filename_len: filename::MAX_BASE_NAME_LEN,
        }
    }
}

/// One generated output, ready to hand to the host.
#[derive(Debug, Clone, Serialize)]
pub struct ExportedFile {
    pub format: ExportFormat,
    /// Suggested download name, e.g. `inbox_emails.csv`.
    pub file_name: String,
    pub media_type: &'static str,
    #[serde(skip)]
    pub data: Vec<u8>,
}

/// Render `records` in the given format.
pub fn export(
    format: ExportFormat,
    records: &[MessageRecord],
    options: &ExportOptions,
) -> Result<Vec<u8>> {
    let data = match format {
        ExportFormat::Csv => csv::export_csv(records, options)?,
        ExportFormat::Xlsx => xlsx::export_xlsx(records, options)?,
        ExportFormat::Txt => text::export_text(records, options).into_bytes(),
    };
    debug!(%format, records = records.len(), bytes = data.len(), "Exported");
    Ok(data)
}

/// Render `records` and attach the suggested file name and media type.
pub fn export_file(
    format: ExportFormat,
    records: &[MessageRecord],
    base_name: &str,
    options: &ExportOptions,
) -> Result<ExportedFile> {
    Ok(ExportedFile {
        format,
        file_name: filename::output_file_name(base_name, format),
        media_type: format.media_type(),
        data: export(format, records, options)?,
    })
}
