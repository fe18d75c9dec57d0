//! Output formats and the caller's selection of them.

use serde::{Deserialize, Serialize};

/// One of the three supported export formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    Csv,
    Xlsx,
    Txt,
}

impl ExportFormat {
    /// All formats, in the order outputs are produced.
    pub const ALL: [ExportFormat; 3] = [ExportFormat::Xlsx, ExportFormat::Csv, ExportFormat::Txt];

    /// File extension, without the dot.
    pub fn extension(self) -> &'static str {
        match self {
            Self::Csv => "csv",
            Self::Xlsx => "xlsx",
            Self::Txt => "txt",
        }
    }

    /// Media type offered to the host alongside the buffer.
    pub fn media_type(self) -> &'static str {
        match self {
            Self::Csv => "text/csv",
            Self::Xlsx => "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
            Self::Txt => "text/plain",
        }
    }
}

impl std::fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Csv => "CSV",
            Self::Xlsx => "Excel",
            Self::Txt => "TXT",
        };
        f.pad(name)
    }
}

/// Independent on/off flags for each format. Any subset is valid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FormatSelection {
    pub csv: bool,
    pub xlsx: bool,
    pub txt: bool,
}

impl Default for FormatSelection {
    fn default() -> Self {
        Self::all()
    }
}

impl FormatSelection {
    pub fn all() -> Self {
        Self {
            csv: true,
            xlsx: true,
            txt: true,
        }
    }

    pub fn none() -> Self {
        Self {
            csv: false,
            xlsx: false,
            txt: false,
        }
    }

    pub fn contains(&self, format: ExportFormat) -> bool {
        match format {
            ExportFormat::Csv => self.csv,
            ExportFormat::Xlsx => self.xlsx,
            ExportFormat::Txt => self.txt,
        }
    }

    /// Selected formats in production order.
    pub fn formats(&self) -> impl Iterator<Item = ExportFormat> + '_ {
        ExportFormat::ALL
            .into_iter()
            .filter(move |f| self.contains(*f))
    }

    pub fn is_empty(&self) -> bool {
        self.formats().next().is_none()
    }
}
