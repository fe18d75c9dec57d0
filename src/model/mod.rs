//! Data model: per-message records, warnings, and export format selection.

pub mod format;
pub mod record;
