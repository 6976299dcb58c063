//! Attachment content decoding helpers (§4.1 step 2).

use base64::Engine;

use crate::model::{Attachment, AttachmentContent};

/// Normalizes an attachment's `content` field into the string `decode_text_content` expects:
/// raw bytes are base64-encoded so the same decode path handles both cases uniformly; a text
/// value (data URL, base64, or plain text) is passed through untouched.
pub(super) fn attachment_raw_content(attachment: &Attachment) -> Option<String> {
    match &attachment.content {
        None => None,
        Some(AttachmentContent::Bytes(bytes)) => Some(base64::engine::general_purpose::STANDARD.encode(bytes)),
        Some(AttachmentContent::Text(text)) => Some(text.clone()),
    }
}

/// Strips any `data:<mime>,` prefix, attempts a base64 decode, and falls back to treating the
/// remainder as UTF-8 text. Returns `None` if the result is empty (§4.1 step 2).
pub fn decode_text_content(raw: &str) -> Option<String> {
    let without_prefix = strip_data_url_prefix(raw);

    let decoded = base64::engine::general_purpose::STANDARD
        .decode(without_prefix.trim())
        .ok()
        .and_then(|bytes| String::from_utf8(bytes).ok())
        .unwrap_or_else(|| without_prefix.to_string());

    if decoded.is_empty() {
        None
    } else {
        Some(decoded)
    }
}

/// Strips a leading `data:<mime-type>,` (or `data:<mime-type>;base64,`) prefix if present.
fn strip_data_url_prefix(raw: &str) -> &str {
    if let Some(rest) = raw.strip_prefix("data:") {
        if let Some(comma) = rest.find(',') {
            return &rest[comma + 1..];
        }
    }
    raw
}

/// Truncates `text` to `max_len` characters, appending an ellipsis marker when truncation
/// actually occurs.
pub fn truncate_with_ellipsis(text: &str, max_len: usize) -> String {
    if text.chars().count() <= max_len {
        return text.to_string();
    }
    let truncated: String = text.chars().take(max_len).collect();
    format!("{truncated}...")
}

/// Produces a single-line preview of `text`, newlines collapsed to spaces, truncated to
/// `snippet_len`.
pub fn compact_preview(text: &str, snippet_len: usize) -> String {
    let single_line: String = text.chars().map(|c| if c == '\n' || c == '\r' { ' ' } else { c }).collect();
    truncate_with_ellipsis(single_line.trim(), snippet_len)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_base64_without_prefix() {
        let encoded = base64::engine::general_purpose::STANDARD.encode("hello attachment");
        assert_eq!(decode_text_content(&encoded), Some("hello attachment".to_string()));
    }

    #[test]
    fn decodes_data_url_with_base64_flag() {
        let encoded = base64::engine::general_purpose::STANDARD.encode("hello attachment");
        let data_url = format!("data:text/plain;base64,{encoded}");
        assert_eq!(decode_text_content(&data_url), Some("hello attachment".to_string()));
    }

    #[test]
    fn falls_back_to_utf8_when_not_base64() {
        assert_eq!(decode_text_content("not base64 at all!!"), Some("not base64 at all!!".to_string()));
    }

    #[test]
    fn rejects_empty_result() {
        assert_eq!(decode_text_content(""), None);
        assert_eq!(decode_text_content("data:text/plain,"), None);
    }

    #[test]
    fn truncates_with_ellipsis_only_when_over_limit() {
        assert_eq!(truncate_with_ellipsis("short", 10), "short");
        assert_eq!(truncate_with_ellipsis("this is long", 4), "this...");
    }

    #[test]
    fn compact_preview_collapses_newlines() {
        assert_eq!(compact_preview("line one\nline two\r\nline three", 100), "line one line two  line three");
    }
}
