//! The conversion pipeline: archive bytes in, records and export buffers out.
//!
//! `convert` holds no state between calls; concurrent conversions each get
//! their own scratch file and record list.

use serde::Serialize;
use tracing::{error, info};

use crate::error::{ConvertError, Result};
use crate::export::{self, filename, ExportOptions, ExportedFile};
use crate::model::format::{ExportFormat, FormatSelection};
use crate::model::record::{ConversionWarning, MessageRecord};
use crate::parser::archive::{self, ParseOptions};

/// Options for one conversion request.
#[derive(Debug, Clone, Default)]
pub struct ConvertOptions {
    pub parse: ParseOptions,
    pub export: ExportOptions,
}

/// An export step that failed for one format.
#[derive(Debug)]
pub struct ExportFailure {
    pub format: ExportFormat,
    pub error: ConvertError,
}

/// Everything produced by one conversion request.
#[derive(Debug, Serialize)]
pub struct Conversion {
    /// Converted messages, in archive order.
    pub records: Vec<MessageRecord>,
    /// Successfully generated outputs, one per selected format.
    pub outputs: Vec<ExportedFile>,
    /// Messages skipped while parsing.
    pub warnings: Vec<ConversionWarning>,
    /// Selected formats whose export failed.
    #[serde(skip)]
    pub failures: Vec<ExportFailure>,
}

impl Conversion {
    /// The output for `format`, if it was selected and succeeded.
    pub fn output(&self, format: ExportFormat) -> Option<&ExportedFile> {
        self.outputs.iter().find(|o| o.format == format)
    }
}

/// Convert an MBOX archive into the selected export formats.
///
/// `display_name` is only used to derive the suggested output file names.
///
/// Returns [`ConvertError::NoConvertibleContent`] when the archive holds no
/// convertible message; no export is attempted in that case. A failure in one
/// exporter is recorded in [`Conversion::failures`] and does not prevent the
/// other formats from being produced.
pub fn convert(
    archive_bytes: &[u8],
    display_name: &str,
    selection: FormatSelection,
    options: &ConvertOptions,
) -> Result<Conversion> {
    let parsed = archive::parse_archive(archive_bytes, &options.parse);
    if parsed.is_empty() {
        return Err(ConvertError::NoConvertibleContent);
    }

    let base = filename::base_name(display_name, options.export.max_filename_len);
    let mut outputs = Vec::new();
    let mut failures = Vec::new();

    for format in selection.formats() {
        match export::export_file(format, &parsed.records, &base, &options.export) {
            Ok(file) => outputs.push(file),
            Err(e) => {
                error!(%format, error = %e, "Export failed");
                failures.push(ExportFailure { format, error: e });
            }
        }
    }

    info!(
        records = parsed.records.len(),
        outputs = outputs.len(),
        failures = failures.len(),
        "Conversion finished"
    );

    Ok(Conversion {
        records: parsed.records,
        outputs,
        warnings: parsed.warnings,
        failures,
    })
}
