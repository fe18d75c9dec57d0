//! Archive parsing: raw MBOX bytes in, ordered message records out.
//!
//! The mailbox reader needs a file it can reopen, so the uploaded bytes are
//! written to a private scratch file first. The scratch file is owned by a
//! [`tempfile::NamedTempFile`] and removed when it drops, on every exit path.

use std::io::Write;
use std::panic::{self, AssertUnwindSafe};
use std::path::Path;

use tempfile::NamedTempFile;
use tracing::{debug, error, info, warn};

use crate::error::{ConvertError, Result};
use crate::model::record::{ConversionWarning, MessageRecord, RecordHeaders};
use crate::parser::mbox::{MboxParser, MAX_MESSAGE_SIZE};
use crate::parser::{header, mime};

/// Tunables for archive parsing.
#[derive(Debug, Clone)]
pub struct ParseOptions {
    /// Bytes kept per message before the remainder is dropped.
    pub max_message_size: usize,
}

impl Default for ParseOptions {
    fn default() -> Self {
        Self {
            max_message_size: MAX_MESSAGE_SIZE,
        }
    }
}

/// Result of one pass over an archive.
#[derive(Debug, Clone, Default)]
pub struct ParsedArchive {
    /// Successfully converted messages, in archive order.
    pub records: Vec<MessageRecord>,
    /// One entry per skipped message, keyed by archive position.
    pub warnings: Vec<ConversionWarning>,
}

impl ParsedArchive {
    /// True when there is nothing to export.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Fold the message at archive `position` into the accumulated result.
    fn fold(&mut self, position: usize, raw: &[u8]) {
        let index = self.records.len() + 1;
        self.push(position, isolate(index, || build_record(raw, index)));
    }

    /// Records are numbered among the converted messages only, so indexes stay
    /// contiguous; warnings carry the archive position of the skipped message.
    fn push(&mut self, position: usize, outcome: Result<MessageRecord>) {
        match outcome {
            Ok(record) => self.records.push(record),
            Err(e) => {
                let reason = match e {
                    ConvertError::MalformedMessage { reason, .. } => reason,
                    other => other.to_string(),
                };
                warn!(position, reason = %reason, "Skipping message");
                self.warnings.push(ConversionWarning {
                    index: position,
                    reason,
                });
            }
        }
    }
}

/// Parse a complete MBOX archive held in memory.
///
/// Never fails: an archive that cannot be opened yields an empty result,
/// and a message that cannot be converted is skipped with a warning.
pub fn parse_archive(bytes: &[u8], options: &ParseOptions) -> ParsedArchive {
    match with_scratch(bytes, |path| split_archive(path, options)) {
        Ok(parsed) => {
            info!(
                messages = parsed.records.len(),
                skipped = parsed.warnings.len(),
                "Parsed archive"
            );
            parsed
        }
        Err(e) => {
            error!(error = %e, "Could not open archive");
            ParsedArchive::default()
        }
    }
}

/// Run `f` over a private scratch copy of `bytes`.
///
/// The scratch file is deleted when this returns, whatever `f` returned.
fn with_scratch<T>(bytes: &[u8], f: impl FnOnce(&Path) -> Result<T>) -> Result<T> {
    let mut scratch = tempfile::Builder::new()
        .prefix("mboxconvert-")
        .suffix(".mbox")
        .tempfile()?;
    write_scratch(&mut scratch, bytes)?;
    debug!(path = %scratch.path().display(), size = bytes.len(), "Materialized archive");

    f(scratch.path())
}

fn split_archive(path: &Path, options: &ParseOptions) -> Result<ParsedArchive> {
    let parser = MboxParser::new(path)?.with_max_message_size(options.max_message_size);

    let mut parsed = ParsedArchive::default();
    let mut position = 0usize;
    parser.parse(&mut |offset, raw| {
        position += 1;
        debug!(position, offset, length = raw.len(), "Converting message");
        parsed.fold(position, raw);
        true
    })?;
    Ok(parsed)
}

fn write_scratch(scratch: &mut NamedTempFile, bytes: &[u8]) -> Result<()> {
    let path = scratch.path().to_path_buf();
    scratch
        .write_all(bytes)
        .and_then(|()| scratch.flush())
        .map_err(|e| ConvertError::io(path, e))
}

/// Turn one raw message (including its `From ` line) into a record.
///
/// A message without a parseable header block still yields a record: empty
/// header fields and the raw text as its body.
pub fn build_record(raw: &[u8], index: usize) -> MessageRecord {
    match mime::parse_message(raw) {
        Some(parsed) => {
            let headers = header::parse_record_headers(parsed.raw_headers);
            let body = mime::extract_body(&parsed.message);
            MessageRecord::new(index, headers, body)
        }
        None => {
            debug!(index, "No header block, keeping raw text as body");
            MessageRecord::new(index, RecordHeaders::default(), mime::headerless_body(raw))
        }
    }
}

/// Run a per-message step, turning a panic in the MIME decoder into a
/// `MalformedMessage` so the rest of the archive still converts.
fn isolate(index: usize, build: impl FnOnce() -> MessageRecord) -> Result<MessageRecord> {
    panic::catch_unwind(AssertUnwindSafe(build)).map_err(|payload| {
        let reason = payload
            .downcast_ref::<&str>()
            .map(|s| s.to_string())
            .or_else(|| payload.downcast_ref::<String>().cloned())
            .unwrap_or_else(|| "message decoder panicked".to_string());
        ConvertError::MalformedMessage { index, reason }
    })
}
