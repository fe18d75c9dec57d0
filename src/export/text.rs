//! Export message records as one human-readable text dump.

use crate::model::record::MessageRecord;

use super::ExportOptions;

/// Render records as a plain-text dump.
///
/// Each record becomes a block: a `=` rule, `Email #N`, another `=` rule,
/// `Name: value` header lines, a `-` rule, then the body. Cc, Bcc and
/// Reply-To are left out when empty. No records yields an empty string.
pub fn export_text(records: &[MessageRecord], options: &ExportOptions) -> String {
    let heavy = "=".repeat(options.text_rule_width);
    let light = "-".repeat(options.text_rule_width);
    let mut lines: Vec<String> = Vec::with_capacity(records.len() * 12);

    for record in records {
        lines.push(heavy.clone());
        lines.push(format!("Email #{}", record.index));
        lines.push(heavy.clone());
        lines.push(format!("Message-ID: {}", record.message_id));
        lines.push(format!("Subject: {}", record.subject));
        lines.push(format!("From: {}", record.from));
        lines.push(format!("To: {}", record.to));

        for (name, value) in [
            ("Cc", &record.cc),
            ("Bcc", &record.bcc),
            ("Reply-To", &record.reply_to),
        ] {
            if !value.is_empty() {
                lines.push(format!("{name}: {value}"));
            }
        }

        lines.push(format!("Date: {}", record.date));
        lines.push(light.clone());
        lines.push(record.body().to_string());
        lines.push("\n".to_string());
    }

    lines.join("\n")
}
