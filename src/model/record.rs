//! Structured per-message record produced by the archive parser.

use serde::Serialize;

/// Column names, in export order. Shared by every tabular exporter.
pub const COLUMNS: [&str; 14] = [
    "Index",
    "Message-ID",
    "Subject",
    "From",
    "To",
    "Cc",
    "Bcc",
    "Reply-To",
    "Date",
    "Date_Raw",
    "In-Reply-To",
    "References",
    "Body",
    "Body_Length",
];

/// One parsed message.
///
/// Records are built once by [`MessageRecord::new`] and never mutated, so
/// `body_length` always matches `body`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MessageRecord {
    /// 1-based position within the archive (archive order, not date order).
    pub index: usize,
    pub message_id: String,
    pub subject: String,
    pub from: String,
    pub to: String,
    pub cc: String,
    pub bcc: String,
    pub reply_to: String,
    /// RFC 3339 timestamp when the `Date` header parsed, else the raw header text.
    pub date: String,
    /// The `Date` header exactly as found.
    pub date_raw: String,
    pub in_reply_to: String,
    pub references: String,
    /// Decoded plain-text body, attachments excluded, trimmed.
    body: String,
    /// Character count of `body`.
    body_length: usize,
}

/// Header-derived fields of a record, before the body is attached.
#[derive(Debug, Clone, Default)]
pub struct RecordHeaders {
    pub message_id: String,
    pub subject: String,
    pub from: String,
    pub to: String,
    pub cc: String,
    pub bcc: String,
    pub reply_to: String,
    pub date: String,
    pub date_raw: String,
    pub in_reply_to: String,
    pub references: String,
}

impl MessageRecord {
    /// Assemble a record, deriving `body_length` from `body`.
    pub fn new(index: usize, headers: RecordHeaders, body: String) -> Self {
        let body_length = body.chars().count();
        Self {
            index,
            message_id: headers.message_id,
            subject: headers.subject,
            from: headers.from,
            to: headers.to,
            cc: headers.cc,
            bcc: headers.bcc,
            reply_to: headers.reply_to,
            date: headers.date,
            date_raw: headers.date_raw,
            in_reply_to: headers.in_reply_to,
            references: headers.references,
            body,
            body_length,
        }
    }

    pub fn body(&self) -> &str {
        &self.body
    }

    pub fn body_length(&self) -> usize {
        self.body_length
    }

    /// Cell values in [`COLUMNS`] order, rendered as text.
    pub fn row(&self) -> [String; 14] {
        [
            self.index.to_string(),
            self.message_id.clone(),
            self.subject.clone(),
            self.from.clone(),
            self.to.clone(),
            self.cc.clone(),
            self.bcc.clone(),
            self.reply_to.clone(),
            self.date.clone(),
            self.date_raw.clone(),
            self.in_reply_to.clone(),
            self.references.clone(),
            self.body.clone(),
            self.body_length.to_string(),
        ]
    }
}

/// A message that was skipped while parsing the archive.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConversionWarning {
    /// 1-based position of the skipped message.
    pub index: usize,
    pub reason: String,
}

impl std::fmt::Display for ConversionWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Error processing email {}: {}", self.index, self.reason)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_body_length_counts_chars() {
        let record = MessageRecord::new(1, RecordHeaders::default(), "café".to_string());
        assert_eq!(record.body_length(), 4);
    }

    #[test]
    fn test_row_follows_column_order() {
        let headers = RecordHeaders {
            subject: "Hi".to_string(),
            date_raw: "raw".to_string(),
            ..Default::default()
        };
        let row = MessageRecord::new(7, headers, "Body".to_string()).row();
        assert_eq!(row.len(), COLUMNS.len());
        assert_eq!(row[0], "7");
        assert_eq!(row[2], "Hi");
        assert_eq!(row[9], "raw");
        assert_eq!(row[12], "Body");
        assert_eq!(row[13], "4");
    }
}
