//! Memo fixtures for the end-to-end suites.

use std::collections::BTreeMap;

use memoria_core::{Attachment, AttachmentContent, Memo, MemoProperty};

/// A plain text memo with no attachments.
pub fn memo(name: &str, creator: &str, content: &str) -> Memo {
    Memo {
        name: name.to_string(),
        creator: creator.to_string(),
        content: content.to_string(),
        tags: vec![],
        ai_tags: vec![],
        create_time: None,
        update_time: None,
        display_time: None,
        visibility: None,
        pinned: false,
        property: Some(MemoProperty::default()),
        attachments: vec![],
        relations: vec![],
        reactions: vec![],
        snippet: None,
        extra: BTreeMap::new(),
    }
}

/// A memo with one text-like attachment, whose content is embedded inline.
pub fn memo_with_text_attachment(name: &str, creator: &str, content: &str, attachment_text: &str) -> Memo {
    let mut m = memo(name, creator, content);
    m.attachments.push(Attachment {
        name: format!("{name}/attachments/1"),
        filename: "notes.txt".to_string(),
        mime_type: "text/plain".to_string(),
        external_link: None,
        content: Some(AttachmentContent::Text(attachment_text.to_string())),
        extra: BTreeMap::new(),
    });
    m
}

/// A memo with one image attachment resolved by an inline data URL, so the builder never needs
/// an HTTP round trip to fetch it.
pub fn memo_with_image(name: &str, creator: &str, content: &str) -> Memo {
    let mut m = memo(name, creator, content);
    m.attachments.push(Attachment {
        name: format!("{name}/attachments/1"),
        filename: "photo.png".to_string(),
        mime_type: "image/png".to_string(),
        external_link: None,
        content: Some(AttachmentContent::Text("data:image/png;base64,AAAA".to_string())),
        extra: BTreeMap::new(),
    });
    m
}

/// A memo whose sole image attachment has no resolvable content (no link, no inline content,
/// and the pipeline under test has no `memos_base_url` configured), exercising the caption
/// fallback-to-filename path by way of `resolve_image_payload` skipping the node entirely, or by
/// pairing this with a caption provider that fails outright.
pub fn memo_with_unresolvable_image(name: &str, creator: &str, content: &str) -> Memo {
    let mut m = memo(name, creator, content);
    m.attachments.push(Attachment {
        name: format!("{name}/attachments/1"),
        filename: "mystery.png".to_string(),
        mime_type: "image/png".to_string(),
        external_link: Some("https://example.invalid/mystery.png".to_string()),
        content: None,
        extra: BTreeMap::new(),
    });
    m
}
