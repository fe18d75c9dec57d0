//! MIME body extraction: pick the plain-text rendition of a message.

use mail_parser::{Message, MessagePart, MessageParser, MimeHeaders, PartType};

/// Maximum depth for recursive multipart descent (adversarial input guard).
const MAX_DEPTH: usize = 10;

/// A raw message split into its header block and parsed MIME tree.
pub struct ParsedMessage<'x> {
    /// Everything before the first blank line.
    pub raw_headers: &'x [u8],
    pub message: Message<'x>,
}

/// Parse a complete raw message (headers + body).
///
/// The leading mbox `From ` separator line is skipped if present. Returns
/// `None` when nothing follows the separator or the bytes are not an RFC 5322
/// message; see [`headerless_body`] for those.
pub fn parse_message(raw_message: &[u8]) -> Option<ParsedMessage<'_>> {
    let message_bytes = skip_from_line(raw_message);
    if message_bytes.iter().all(u8::is_ascii_whitespace) {
        return None;
    }

    let message = MessageParser::default().parse(message_bytes)?;

    let header_end = find_header_end(message_bytes).unwrap_or(message_bytes.len());
    Some(ParsedMessage {
        raw_headers: &message_bytes[..header_end],
        message,
    })
}

/// Body of a message that has no parseable header block: everything after
/// the `From ` line as lossy UTF-8, trimmed.
pub fn headerless_body(raw_message: &[u8]) -> String {
    String::from_utf8_lossy(skip_from_line(raw_message))
        .trim()
        .to_string()
}

/// Return the best plain-text rendition of a message, trimmed.
///
/// - Multipart: the first non-empty `text/plain` part in structural order that
///   is not marked as an attachment. No such part means an empty body; HTML is
///   never converted.
/// - Single part: the payload, whatever its content type.
///
/// Text parts are already charset-decoded by `mail-parser`, which falls back
/// to lossy UTF-8 for unknown charsets. Binary payloads decode as lossy UTF-8.
pub fn extract_body(message: &Message<'_>) -> String {
    let Some(root) = message.parts.first() else {
        return String::new();
    };

    let body = match &root.body {
        PartType::Multipart(children) => find_plain_text(message, children, 0).unwrap_or_default(),
        _ => part_text(root).unwrap_or_default(),
    };

    body.trim().to_string()
}

/// Depth-first search over the children of a multipart node.
fn find_plain_text(message: &Message<'_>, children: &[usize], depth: usize) -> Option<String> {
    if depth > MAX_DEPTH {
        tracing::warn!(depth, "Multipart nesting too deep, ignoring remaining parts");
        return None;
    }

    for &id in children {
        let Some(part) = message.parts.get(id) else {
            continue;
        };

        // Multipart containers are searched even when marked as attachments.
        match &part.body {
            PartType::Multipart(grandchildren) => {
                if let Some(text) = find_plain_text(message, grandchildren, depth + 1) {
                    return Some(text);
                }
            }
            PartType::Message(nested) if !is_attachment(part) => {
                if let Some(root) = nested.parts.first() {
                    let found = match &root.body {
                        PartType::Multipart(inner) => find_plain_text(nested, inner, depth + 1),
                        _ if is_plain_text(root) => part_text(root),
                        _ => None,
                    };
                    if found.is_some() {
                        return found;
                    }
                }
            }
            _ if is_attachment(part) => continue,
            _ if is_plain_text(part) => {
                if let Some(text) = part_text(part) {
                    return Some(text);
                }
            }
            _ => {}
        }
    }

    None
}

/// Whether the part's `Content-Disposition` marks it as an attachment.
fn is_attachment(part: &MessagePart<'_>) -> bool {
    part.content_disposition()
        .map(|d| d.ctype().eq_ignore_ascii_case("attachment"))
        .unwrap_or(false)
}

/// `text/plain`, or no `Content-Type` at all (the RFC 2045 default).
fn is_plain_text(part: &MessagePart<'_>) -> bool {
    match part.content_type() {
        Some(ct) => {
            ct.ctype().eq_ignore_ascii_case("text")
                && ct
                    .subtype()
                    .map(|s| s.eq_ignore_ascii_case("plain"))
                    .unwrap_or(false)
        }
        None => true,
    }
}

/// Decoded content of a leaf part, `None` when empty.
fn part_text(part: &MessagePart<'_>) -> Option<String> {
    let text = match &part.body {
        PartType::Text(text) | PartType::Html(text) => text.to_string(),
        PartType::Binary(bytes) | PartType::InlineBinary(bytes) => {
            let charset = part
                .content_type()
                .and_then(|ct| ct.attribute("charset"))
                .unwrap_or("utf-8");
            super::header::decode_charset(charset, bytes)
        }
        PartType::Message(_) | PartType::Multipart(_) => return None,
    };
    (!text.is_empty()).then_some(text)
}

/// Skip the `From ` separator line at the start of MBOX messages.
fn skip_from_line(data: &[u8]) -> &[u8] {
    let data = data.strip_prefix(&[0xEF, 0xBB, 0xBF]).unwrap_or(data);

    if data.starts_with(b"From ") {
        if let Some(pos) = data.iter().position(|&b| b == b'\n') {
            return &data[pos + 1..];
        }
        return &[];
    }
    data
}

/// Find the byte offset where headers end (position of the first blank line).
fn find_header_end(data: &[u8]) -> Option<usize> {
    if data.starts_with(b"\n") || data.starts_with(b"\r\n") {
        return Some(0);
    }
    for i in 0..data.len().saturating_sub(1) {
        if data[i] == b'\n' && data[i + 1] == b'\n' {
            return Some(i);
        }
        if i + 3 < data.len()
            && data[i] == b'\r'
            && data[i + 1] == b'\n'
            && data[i + 2] == b'\r'
            && data[i + 3] == b'\n'
        {
            return Some(i);
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    fn body_of(raw: &[u8]) -> String {
        let parsed = parse_message(raw).unwrap();
        extract_body(&parsed.message)
    }

    #[test]
    fn test_skip_from_line() {
        let data = b"From user@example.com Thu Jan 01 00:00:00 2024\nSubject: Test\n\nBody\n";
        assert!(skip_from_line(data).starts_with(b"Subject:"));
    }

    #[test]
    fn test_skip_from_line_no_from() {
        let data = b"Subject: Test\n\nBody\n";
        assert_eq!(skip_from_line(data), data);
    }

    #[test]
    fn test_find_header_end() {
        let data = b"From: a@b.com\nSubject: Hi\n\nBody\n";
        assert_eq!(find_header_end(data), Some(25));
    }

    #[test]
    fn test_find_header_end_crlf() {
        let data = b"From: a@b.com\r\nSubject: Hi\r\n\r\nBody\r\n";
        assert_eq!(find_header_end(data), Some(26));
    }

    #[test]
    fn test_raw_headers_exclude_body() {
        let raw = b"From x@y Mon Jan 01 00:00:00 2024\nSubject: Hi\n\nBody here\n";
        let parsed = parse_message(raw).unwrap();
        assert_eq!(parsed.raw_headers, b"Subject: Hi");
    }

    #[test]
    fn test_single_part_body_trimmed() {
        let raw = b"Subject: Hi\nContent-Type: text/plain; charset=utf-8\n\n\n  Hello there  \n\n";
        assert_eq!(body_of(raw), "Hello there");
    }

    #[test]
    fn test_single_part_latin1() {
        let raw = b"Subject: Hi\nContent-Type: text/plain; charset=iso-8859-1\nContent-Transfer-Encoding: quoted-printable\n\ncaf=E9\n";
        assert_eq!(body_of(raw), "café");
    }

    #[test]
    fn test_single_part_base64() {
        let raw = b"Subject: Hi\nContent-Type: text/plain; charset=utf-8\nContent-Transfer-Encoding: base64\n\nSGkgdGhlcmU=\n";
        assert_eq!(body_of(raw), "Hi there");
    }

    #[test]
    fn test_multipart_skips_attachment() {
        let raw = b"Subject: Files\n\
MIME-Version: 1.0\n\
Content-Type: multipart/mixed; boundary=\"XYZ\"\n\
\n\
--XYZ\n\
Content-Type: text/plain; charset=utf-8\n\
Content-Disposition: attachment; filename=\"notes.txt\"\n\
\n\
secret attachment text\n\
--XYZ\n\
Content-Type: text/plain; charset=utf-8\n\
\n\
Hi there\n\
--XYZ--\n";
        assert_eq!(body_of(raw), "Hi there");
    }

    #[test]
    fn test_multipart_alternative_prefers_plain() {
        let raw = b"Subject: Alt\n\
MIME-Version: 1.0\n\
Content-Type: multipart/alternative; boundary=\"B1\"\n\
\n\
--B1\n\
Content-Type: text/html; charset=utf-8\n\
\n\
<p>HTML version</p>\n\
--B1\n\
Content-Type: text/plain; charset=utf-8\n\
\n\
Plain version\n\
--B1--\n";
        assert_eq!(body_of(raw), "Plain version");
    }

    #[test]
    fn test_multipart_html_only_is_empty() {
        let raw = b"Subject: Html\n\
MIME-Version: 1.0\n\
Content-Type: multipart/alternative; boundary=\"B2\"\n\
\n\
--B2\n\
Content-Type: text/html; charset=utf-8\n\
\n\
<p>Only HTML</p>\n\
--B2--\n";
        assert_eq!(body_of(raw), "");
    }

    #[test]
    fn test_nested_multipart() {
        let raw = b"Subject: Nested\n\
MIME-Version: 1.0\n\
Content-Type: multipart/mixed; boundary=\"OUTER\"\n\
\n\
--OUTER\n\
Content-Type: multipart/alternative; boundary=\"INNER\"\n\
\n\
--INNER\n\
Content-Type: text/plain; charset=utf-8\n\
\n\
Deep text\n\
--INNER\n\
Content-Type: text/html; charset=utf-8\n\
\n\
<b>Deep</b>\n\
--INNER--\n\
--OUTER\n\
Content-Type: application/pdf\n\
Content-Disposition: attachment; filename=\"a.pdf\"\n\
Content-Transfer-Encoding: base64\n\
\n\
JVBERi0xLjQK\n\
--OUTER--\n";
        assert_eq!(body_of(raw), "Deep text");
    }

    #[test]
    fn test_forwarded_message_inline_vs_attached() {
        let forwarded = |disposition: &str| {
            format!(
                "Subject: Fwd\n\
MIME-Version: 1.0\n\
Content-Type: multipart/mixed; boundary=\"F\"\n\
\n\
--F\n\
Content-Type: message/rfc822\n\
Content-Disposition: {disposition}\n\
\n\
Subject: Inner\n\
Content-Type: text/plain; charset=utf-8\n\
\n\
Inner text\n\
--F--\n"
            )
        };
        assert_eq!(body_of(forwarded("inline").as_bytes()), "Inner text");
        assert_eq!(body_of(forwarded("attachment").as_bytes()), "");
    }

    #[test]
    fn test_separator_only_has_no_message() {
        assert!(parse_message(b"From a@b Mon Jan 01 00:00:00 2024\n").is_none());
        assert!(parse_message(b"From a@b Mon Jan 01 00:00:00 2024\n\n  \n").is_none());
    }

    #[test]
    fn test_headerless_body() {
        assert_eq!(
            headerless_body(b"From a@b Mon Jan 01 00:00:00 2024\nhello world no headers\n"),
            "hello world no headers"
        );
        assert_eq!(headerless_body(b"From a@b Mon Jan 01 00:00:00 2024\n"), "");
        assert_eq!(headerless_body(b"plain \xFF text\n"), "plain \u{FFFD} text");
    }
}
