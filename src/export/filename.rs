//! Output file naming.

use crate::model::format::ExportFormat;

/// Default cap on the sanitized base name, in characters.
pub const MAX_BASE_NAME_LEN: usize = 200;

/// Characters that are invalid in file names on at least one common platform.
const INVALID_CHARS: &[char] = &['<', '>', ':', '"', '/', '\\', '|', '?', '*'];

/// Sanitize a string for use in file names.
///
/// Replaces invalid characters (and control characters) with `_` and
/// truncates to `max_len` characters.
pub fn sanitize_filename_part(s: &str, max_len: usize) -> String {
    s.chars()
        .map(|c| {
            if INVALID_CHARS.contains(&c) || c.is_control() {
                '_'
            } else {
                c
            }
        })
        .take(max_len)
        .collect()
}

/// Derive the output base name from the archive's display name.
///
/// A trailing `.mbox` extension is dropped before sanitizing. An empty result
/// becomes `mailbox`.
pub fn base_name(display_name: &str, max_len: usize) -> String {
    let trimmed = display_name.trim();
    let stem = match trimmed.len().checked_sub(5) {
        Some(cut)
            if trimmed.is_char_boundary(cut) && trimmed[cut..].eq_ignore_ascii_case(".mbox") =>
        {
            &trimmed[..cut]
        }
        _ => trimmed,
    };

    let sanitized = sanitize_filename_part(stem, max_len);
    if sanitized.trim().is_empty() {
        "mailbox".to_string()
    } else {
        sanitized
    }
}

/// Suggested download name: `<base>_emails.<ext>`.
pub fn output_file_name(base: &str, format: ExportFormat) -> String {
    format!("{base}_emails.{}", format.extension())
}
