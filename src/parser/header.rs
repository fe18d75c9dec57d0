//! RFC 5322 header parsing: folding, encoded-words (RFC 2047), and date normalisation.

use base64::engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig};
use base64::{alphabet, Engine};
use chrono::{DateTime, FixedOffset, NaiveDateTime, TimeZone};
use tracing::{debug, warn};

use crate::model::record::RecordHeaders;

/// Encoded words in the wild are often missing their `=` padding.
const LENIENT_BASE64: GeneralPurpose = GeneralPurpose::new(
    &alphabet::STANDARD,
    GeneralPurposeConfig::new().with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

/// Build the header-derived fields of a record from a raw header block.
///
/// Address and subject headers are MIME-decoded; the identifier and date
/// headers are kept as raw (unfolded) text.
pub fn parse_record_headers(raw_headers: &[u8]) -> RecordHeaders {
    let text = decode_header_bytes(raw_headers);
    let headers = unfold_headers(&text);
    let raw = |name: &str| get_header(&headers, name).unwrap_or_default();
    let decoded = |name: &str| decode_header(&raw(name));

    let date_raw = raw("date");
    let date = normalize_date(&date_raw).unwrap_or_else(|| date_raw.clone());

    RecordHeaders {
        message_id: raw("message-id"),
        subject: decoded("subject"),
        from: decoded("from"),
        to: decoded("to"),
        cc: decoded("cc"),
        bcc: decoded("bcc"),
        reply_to: decoded("reply-to"),
        date,
        date_raw,
        in_reply_to: raw("in-reply-to"),
        references: raw("references"),
    }
}

/// Decode raw header bytes to a string.
///
/// Tries UTF-8 first, then falls back to Windows-1252 (which accepts every byte).
fn decode_header_bytes(bytes: &[u8]) -> String {
    // Strip BOM if present
    let bytes = bytes.strip_prefix(&[0xEF, 0xBB, 0xBF]).unwrap_or(bytes);

    match std::str::from_utf8(bytes) {
        Ok(s) => s.to_string(),
        Err(_) => {
            let (decoded, _, _) = encoding_rs::WINDOWS_1252.decode(bytes);
            decoded.into_owned()
        }
    }
}

/// Unfold headers: join continuation lines (starting with space or tab) with the previous header.
///
/// Returns a list of `(lowercase_name, raw_value)` pairs.
fn unfold_headers(text: &str) -> Vec<(String, String)> {
    let mut result: Vec<(String, String)> = Vec::new();

    for line in text.lines() {
        if line.starts_with(' ') || line.starts_with('\t') {
            if let Some(last) = result.last_mut() {
                if !last.1.is_empty() {
                    last.1.push(' ');
                }
                last.1.push_str(line.trim());
            }
        } else if let Some(colon_pos) = line.find(':') {
            let name = &line[..colon_pos];
            if name.is_empty() || name.contains(char::is_whitespace) {
                continue;
            }
            let value = line[colon_pos + 1..].trim().to_string();
            result.push((name.to_lowercase(), value));
        }
        // Lines without a colon and not a continuation are silently skipped
    }

    result
}

/// Get the first value for a header name (case-insensitive).
fn get_header(headers: &[(String, String)], name: &str) -> Option<String> {
    headers
        .iter()
        .find(|(k, _)| k == name)
        .map(|(_, v)| v.clone())
}

/// Decode a header value that may contain RFC 2047 encoded-words.
///
/// Never fails: unknown charsets decode as lossy UTF-8 and malformed words
/// are kept verbatim. Empty input yields an empty string.
pub fn decode_header(input: &str) -> String {
    if input.is_empty() {
        return String::new();
    }
    decode_encoded_words(input)
}

/// Decode RFC 2047 encoded-words in a header value.
///
/// Example: `"=?UTF-8?B?SG9sYQ==?= =?UTF-8?B?IG11bmRv?="` → `"Hola mundo"`
pub fn decode_encoded_words(input: &str) -> String {
    let mut result = String::with_capacity(input.len());
    let mut remaining = input;
    let mut last_was_encoded = false;

    while let Some(start) = remaining.find("=?") {
        let before = &remaining[..start];
        // Whitespace between two encoded words is dropped (RFC 2047 §6.2)
        if !last_was_encoded || !before.trim().is_empty() {
            result.push_str(before);
        }

        let after_start = &remaining[start + 2..];

        if let Some(decoded) = try_decode_one_word(after_start) {
            result.push_str(&decoded.text);
            remaining = &remaining[start + 2 + decoded.consumed..];
            last_was_encoded = true;
        } else {
            result.push_str("=?");
            remaining = after_start;
            last_was_encoded = false;
        }
    }

    result.push_str(remaining);
    result
}

struct DecodedWord {
    text: String,
    consumed: usize, // bytes consumed from the string *after* the initial "=?"
}

fn try_decode_one_word(s: &str) -> Option<DecodedWord> {
    // Format: charset?encoding?encoded_text?=
    let first_q = s.find('?')?;
    let charset = &s[..first_q];
    if charset.is_empty() || charset.contains(char::is_whitespace) {
        return None;
    }

    let rest = &s[first_q + 1..];
    let second_q = rest.find('?')?;
    let encoding = &rest[..second_q];

    let rest2 = &rest[second_q + 1..];
    let end = rest2.find("?=")?;
    let encoded_text = &rest2[..end];

    let total_consumed = first_q + 1 + second_q + 1 + end + 2;

    let bytes = match encoding.to_ascii_uppercase().as_str() {
        "B" => LENIENT_BASE64.decode(encoded_text.trim()).ok()?,
        "Q" => decode_q_encoding(encoded_text),
        _ => return None,
    };

    // RFC 2231 language suffix: "utf-8*en"
    let charset = charset.split('*').next().unwrap_or(charset);

    Some(DecodedWord {
        text: decode_charset(charset, &bytes),
        consumed: total_consumed,
    })
}

/// Decode Q-encoding (RFC 2047): underscores → spaces, `=XX` → byte.
fn decode_q_encoding(input: &str) -> Vec<u8> {
    let mut result = Vec::with_capacity(input.len());
    let bytes = input.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'_' => {
                result.push(b' ');
                i += 1;
            }
            b'=' if i + 2 < bytes.len() => {
                let hex = std::str::from_utf8(&bytes[i + 1..i + 3]).unwrap_or("");
                if let Ok(byte) = u8::from_str_radix(hex, 16) {
                    result.push(byte);
                    i += 3;
                } else {
                    result.push(b'=');
                    i += 1;
                }
            }
            b => {
                result.push(b);
                i += 1;
            }
        }
    }
    result
}

/// Decode bytes using a named charset, falling back to lossy UTF-8.
pub fn decode_charset(charset: &str, bytes: &[u8]) -> String {
    match charset.to_ascii_lowercase().as_str() {
        "utf-8" | "utf8" | "us-ascii" | "ascii" => String::from_utf8_lossy(bytes).into_owned(),
        _ => {
            if let Some(encoding) = encoding_rs::Encoding::for_label(charset.trim().as_bytes()) {
                let (decoded, _, _) = encoding.decode(bytes);
                decoded.into_owned()
            } else {
                warn!(charset, "Unknown charset, falling back to UTF-8 lossy");
                String::from_utf8_lossy(bytes).into_owned()
            }
        }
    }
}

/// Normalise a `Date` header to RFC 3339, keeping the message's own offset.
///
/// A `-0000` zone yields a local time with no offset. Returns `None` when
/// the value cannot be parsed.
pub fn normalize_date(date_str: &str) -> Option<String> {
    let dt = parse_date(date_str)?;
    if has_unknown_zone(date_str) {
        return Some(dt.naive_local().format("%Y-%m-%dT%H:%M:%S").to_string());
    }
    Some(dt.to_rfc3339())
}

/// RFC 5322 `-0000`: the time is local but the zone is unknown.
fn has_unknown_zone(date_str: &str) -> bool {
    strip_trailing_comment(date_str.trim())
        .rsplit(char::is_whitespace)
        .next()
        .is_some_and(|zone| zone == "-0000")
}

/// Parse an email date string in various common formats.
///
/// Supports RFC 2822, ISO 8601, and many broken real-world variants.
/// Dates without a zone are taken as UTC.
pub fn parse_date(date_str: &str) -> Option<DateTime<FixedOffset>> {
    let trimmed = strip_trailing_comment(date_str.trim());
    if trimmed.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc2822(trimmed) {
        return Some(dt);
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(trimmed) {
        return Some(dt);
    }

    let no_dow = strip_day_of_week(trimmed);

    // IMAP-style: "16-JUL-2025 03:01:03" → "16 Jul 2025 03:01:03"
    let no_dow_normalized = normalize_imap_date(&no_dow);

    let formats = [
        "%d %b %Y %H:%M:%S %z",
        "%d %b %Y %H:%M %z",
        "%d %b %Y %H:%M:%S",
        "%b %d %H:%M:%S %Y",
        "%Y-%m-%dT%H:%M:%S%z",
        "%Y-%m-%d %H:%M:%S %z",
        "%Y-%m-%d %H:%M:%S",
        "%d/%m/%Y %H:%M:%S",
        "%m/%d/%Y %H:%M:%S",
    ];

    let utc = FixedOffset::east_opt(0)?;
    for candidate in [&no_dow, &no_dow_normalized] {
        for fmt in &formats {
            if let Ok(dt) = DateTime::parse_from_str(candidate, fmt) {
                return Some(dt);
            }
            if let Ok(ndt) = NaiveDateTime::parse_from_str(candidate, fmt) {
                return Some(utc.from_utc_datetime(&ndt));
            }
        }
    }

    // Named timezones as numeric offsets
    for candidate in [&no_dow, &no_dow_normalized] {
        let replaced = replace_named_tz(candidate);
        if replaced == *candidate {
            continue;
        }
        for fmt in &formats {
            if let Ok(dt) = DateTime::parse_from_str(&replaced, fmt) {
                return Some(dt);
            }
        }
    }

    debug!(date = trimmed, "Could not parse date");
    None
}

/// Drop a trailing RFC 5322 comment such as `" (UTC)"`.
fn strip_trailing_comment(s: &str) -> &str {
    if s.ends_with(')') {
        if let Some(open) = s.rfind('(') {
            return s[..open].trim_end();
        }
    }
    s
}

/// Normalize IMAP-style dates: `"16-JUL-2025 03:01:03"` → `"16 Jul 2025 03:01:03"`.
fn normalize_imap_date(s: &str) -> String {
    if !s.contains('-') {
        return s.to_string();
    }

    let title_months = [
        "Jan", "Feb", "Mar", "Apr", "May", "Jun", "Jul", "Aug", "Sep", "Oct", "Nov", "Dec",
    ];

    for month in &title_months {
        for variant in [month.to_uppercase(), month.to_lowercase(), month.to_string()] {
            let pattern = format!("-{variant}-");
            if s.contains(&pattern) {
                return s.replacen(&pattern, &format!(" {month} "), 1);
            }
        }
    }

    s.to_string()
}

/// Strip leading day-of-week prefix (e.g. "Thu, " or "Thu ").
fn strip_day_of_week(s: &str) -> String {
    let days = ["Mon", "Tue", "Wed", "Thu", "Fri", "Sat", "Sun"];
    for day in &days {
        if let Some(rest) = s.strip_prefix(day) {
            if let Some(rest) = rest.strip_prefix(',').or_else(|| rest.strip_prefix(' ')) {
                return rest.trim().to_string();
            }
        }
    }
    s.to_string()
}

/// Replace well-known timezone abbreviations with numeric offsets.
fn replace_named_tz(s: &str) -> String {
    let tzs = [
        ("CEST", "+0200"),
        ("EST", "-0500"),
        ("EDT", "-0400"),
        ("CST", "-0600"),
        ("CDT", "-0500"),
        ("MST", "-0700"),
        ("MDT", "-0600"),
        ("PST", "-0800"),
        ("PDT", "-0700"),
        ("GMT", "+0000"),
        ("UTC", "+0000"),
        ("CET", "+0100"),
        ("JST", "+0900"),
    ];
    let mut result = s.to_string();
    for (name, offset) in &tzs {
        if result.ends_with(name) {
            let pos = result.len() - name.len();
            result.replace_range(pos.., offset);
            return result;
        }
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_base64_encoded_word() {
        assert_eq!(decode_header("=?UTF-8?B?SGVsbG8=?="), "Hello");
    }

    #[test]
    fn test_decode_base64_without_padding() {
        assert_eq!(decode_header("=?UTF-8?B?SGVsbG8?="), "Hello");
    }

    #[test]
    fn test_decode_q_encoded_word() {
        assert_eq!(decode_header("=?ISO-8859-1?Q?caf=E9?="), "café");
    }

    #[test]
    fn test_decode_multiple_encoded_words() {
        let input = "=?UTF-8?B?SG9sYQ==?= =?UTF-8?B?IG11bmRv?=";
        assert_eq!(decode_header(input), "Hola mundo");
    }

    #[test]
    fn test_decode_mixed_plain_and_encoded() {
        let input = "Re: =?UTF-8?B?SG9sYQ==?= there";
        assert_eq!(decode_header(input), "Re: Hola there");
    }

    #[test]
    fn test_decode_mixed_charsets() {
        let input = "=?ISO-8859-1?Q?Fran=E7ois?= =?UTF-8?B?5bGx55Sw?=";
        assert_eq!(decode_header(input), "François山田");
    }

    #[test]
    fn test_decode_unknown_charset_falls_back_to_utf8() {
        let input = "=?x-no-such-charset?Q?caf=C3=A9?=";
        assert_eq!(decode_header(input), "café");
    }

    #[test]
    fn test_decode_invalid_utf8_is_replaced() {
        let decoded = decode_header("=?UTF-8?Q?bad=FFbyte?=");
        assert_eq!(decoded, "bad\u{FFFD}byte");
    }

    #[test]
    fn test_decode_malformed_word_kept_verbatim() {
        assert_eq!(decode_header("=?UTF-8?X?abc?="), "=?UTF-8?X?abc?=");
        assert_eq!(decode_header("price =? unknown"), "price =? unknown");
    }

    #[test]
    fn test_decode_empty() {
        assert_eq!(decode_header(""), "");
    }

    #[test]
    fn test_decode_rfc2231_language_suffix() {
        assert_eq!(decode_header("=?UTF-8*en?Q?Hi?="), "Hi");
    }

    #[test]
    fn test_base64_roundtrip_through_decoder() {
        let original = "Résumé – 山田太郎";
        let encoded = format!(
            "=?UTF-8?B?{}?=",
            base64::engine::general_purpose::STANDARD.encode(original)
        );
        assert_eq!(decode_header(&encoded), original);
    }

    #[test]
    fn test_windows1252_roundtrip_through_decoder() {
        let original = "Müller & Søn";
        let (bytes, _, _) = encoding_rs::WINDOWS_1252.encode(original);
        let encoded = format!(
            "=?windows-1252?B?{}?=",
            base64::engine::general_purpose::STANDARD.encode(&bytes)
        );
        assert_eq!(decode_header(&encoded), original);
    }

    #[test]
    fn test_unfold_headers() {
        let text = "Subject: This is a long\n\tsubject line\nFrom: user@example.com\n";
        let headers = unfold_headers(text);
        assert_eq!(headers.len(), 2);
        assert_eq!(headers[0].0, "subject");
        assert_eq!(headers[0].1, "This is a long subject line");
    }

    #[test]
    fn test_unfold_skips_mbox_separator() {
        let text = "From user@example.com Thu Jan 01 00:00:00 2024\nSubject: Hi\n";
        let headers = unfold_headers(text);
        assert_eq!(headers.len(), 1);
        assert_eq!(headers[0].0, "subject");
    }

    #[test]
    fn test_parse_record_headers() {
        let raw = b"Message-ID: <m1@example.com>\n\
Subject: =?UTF-8?B?SGVsbG8=?=\n\
From: Alice <alice@example.com>\n\
To: bob@example.com\n\
Date: Thu, 04 Jan 2024 10:00:00 +0100\n\
In-Reply-To: <m0@example.com>\n\
References: <a@example.com>\n <m0@example.com>\n";
        let headers = parse_record_headers(raw);
        assert_eq!(headers.message_id, "<m1@example.com>");
        assert_eq!(headers.subject, "Hello");
        assert_eq!(headers.from, "Alice <alice@example.com>");
        assert_eq!(headers.to, "bob@example.com");
        assert_eq!(headers.cc, "");
        assert_eq!(headers.date, "2024-01-04T10:00:00+01:00");
        assert_eq!(headers.date_raw, "Thu, 04 Jan 2024 10:00:00 +0100");
        assert_eq!(headers.in_reply_to, "<m0@example.com>");
        assert_eq!(headers.references, "<a@example.com> <m0@example.com>");
    }

    #[test]
    fn test_unparseable_date_falls_back_to_raw() {
        let headers = parse_record_headers(b"Date: not-a-date\n");
        assert_eq!(headers.date_raw, "not-a-date");
        assert_eq!(headers.date, "not-a-date");
    }

    #[test]
    fn test_missing_date_is_empty() {
        let headers = parse_record_headers(b"Subject: x\n");
        assert_eq!(headers.date, "");
        assert_eq!(headers.date_raw, "");
    }

    #[test]
    fn test_latin1_header_bytes() {
        let headers = parse_record_headers(b"Subject: caf\xE9\n");
        assert_eq!(headers.subject, "café");
    }

    #[test]
    fn test_parse_date_rfc2822() {
        let dt = parse_date("Thu, 04 Jan 2024 10:00:00 +0000").unwrap();
        assert_eq!(dt.format("%Y-%m-%d").to_string(), "2024-01-04");
    }

    #[test]
    fn test_parse_date_with_comment() {
        assert_eq!(
            normalize_date("Thu, 04 Jan 2024 10:00:00 +0000 (UTC)").as_deref(),
            Some("2024-01-04T10:00:00+00:00")
        );
    }

    #[test]
    fn test_unknown_zone_has_no_offset() {
        assert_eq!(
            normalize_date("Thu, 04 Jan 2024 10:00:00 -0000").as_deref(),
            Some("2024-01-04T10:00:00")
        );
        assert_eq!(
            normalize_date("Thu, 04 Jan 2024 10:00:00 -0000 (Unknown)").as_deref(),
            Some("2024-01-04T10:00:00")
        );
        assert_eq!(
            normalize_date("Thu, 04 Jan 2024 10:00:00 +0000").as_deref(),
            Some("2024-01-04T10:00:00+00:00")
        );
    }

    #[test]
    fn test_parse_date_without_dow() {
        assert!(parse_date("04 Jan 2024 10:00:00 +0000").is_some());
    }

    #[test]
    fn test_parse_date_named_tz() {
        let dt = parse_date("Thu, 04 Jan 2024 10:00:00 EST").unwrap();
        assert_eq!(dt.offset().local_minus_utc(), -5 * 3600);
    }

    #[test]
    fn test_parse_date_iso8601() {
        assert_eq!(
            normalize_date("2024-01-04T10:00:00Z").as_deref(),
            Some("2024-01-04T10:00:00+00:00")
        );
    }

    #[test]
    fn test_parse_date_imap_style() {
        let dt = parse_date("16-JUL-2025 03:01:03").unwrap();
        assert_eq!(dt.format("%Y-%m-%d").to_string(), "2025-07-16");
    }

    #[test]
    fn test_parse_date_rejects_garbage() {
        assert!(parse_date("not-a-date").is_none());
        assert!(parse_date("").is_none());
    }

    #[test]
    fn test_normalize_imap_date() {
        assert_eq!(
            normalize_imap_date("16-JUL-2025 03:01:03"),
            "16 Jul 2025 03:01:03"
        );
        assert_eq!(
            normalize_imap_date("04 Jan 2024 10:00:00"),
            "04 Jan 2024 10:00:00"
        );
    }
}
