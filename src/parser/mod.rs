//! Email parsing: MBOX splitting, header decoding, MIME body extraction, and
//! the archive-to-records pass built on them.

pub mod archive;
pub mod header;
pub mod mbox;
pub mod mime;
