//! Centralized error types for mboxconvert.

use std::path::PathBuf;
use thiserror::Error;

use crate::model::format::ExportFormat;

/// All errors produced by the mboxconvert library.
#[derive(Error, Debug)]
pub enum ConvertError {
    /// I/O error with the associated file path.
    #[error("I/O error on '{path}': {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// The archive could not be opened or contained no messages.
    #[error("No emails found in the archive, or the file could not be processed")]
    NoConvertibleContent,

    /// A single message could not be turned into a record.
    #[error("Error processing email {index}: {reason}")]
    MalformedMessage { index: usize, reason: String },

    /// Writing the delimited-text export failed.
    #[error("CSV export error: {0}")]
    Csv(#[from] csv::Error),

    /// Writing the spreadsheet export failed.
    #[error("Spreadsheet export error: {0}")]
    Xlsx(#[from] rust_xlsxwriter::XlsxError),

    /// Any other export failure for one output format.
    #[error("{format} export error: {reason}")]
    Export {
        format: ExportFormat,
        reason: String,
    },
}

/// Convenience alias for `Result<T, ConvertError>`.
pub type Result<T> = std::result::Result<T, ConvertError>;

impl ConvertError {
    /// Create an `Io` variant from a path and an `io::Error`.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

/// Allow `?` on `std::io::Error` when no path context is available
/// (in-memory writers mostly; prefer `ConvertError::io`).
impl From<std::io::Error> for ConvertError {
    fn from(source: std::io::Error) -> Self {
        Self::Io {
            path: PathBuf::from("<memory>"),
            source,
        }
    }
}
