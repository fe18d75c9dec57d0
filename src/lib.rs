//! `mboxconvert`: turn MBOX mail archives into CSV, Excel and plain-text exports.
//!
//! This crate provides the conversion pipeline: splitting an archive into
//! messages, decoding headers and bodies into [`MessageRecord`]s, and
//! rendering those records in each export format. [`convert()`] runs the
//! whole pipeline for one request.

pub mod config;
pub mod convert;
pub mod error;
pub mod export;
pub mod model;
pub mod parser;

pub use convert::{convert, Conversion, ConvertOptions, ExportFailure};
pub use error::{ConvertError, Result};
pub use export::{ExportOptions, ExportedFile};
pub use model::format::{ExportFormat, FormatSelection};
pub use model::record::{ConversionWarning, MessageRecord};
