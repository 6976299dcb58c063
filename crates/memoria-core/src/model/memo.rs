//! The memo and attachment shapes consumed by the document builder.
//!
//! These mirror a subset of a memos-style REST API's JSON payload. Deserialization is
//! intentionally permissive: unrecognized top-level fields are captured rather than rejected,
//! matching the upstream service's own `extra="allow"` behavior, since this crate's Document
//! Builder only ever reads a fixed subset of fields.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Capability flags the upstream service derives from a memo's content.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MemoProperty {
    #[serde(default)]
    pub has_link: bool,
    #[serde(default)]
    pub has_task_list: bool,
    #[serde(default)]
    pub has_code: bool,
    #[serde(default)]
    pub has_incomplete_tasks: bool,
}

/// The payload of a single attachment as it appears on a memo.
///
/// `content` may be absent (the attachment must then be fetched from the memo server, or
/// resolved via `external_link`), raw bytes, a base64 string, or a full `data:` URL — the
/// builder normalizes these in [`crate::builder`].
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Attachment {
    /// `attachments/<uid>`.
    pub name: String,
    pub filename: String,
    /// MIME type, e.g. `image/png`, `text/markdown`.
    #[serde(rename = "type")]
    pub mime_type: String,
    #[serde(default)]
    pub external_link: Option<String>,
    #[serde(default)]
    pub content: Option<AttachmentContent>,

    /// Unrecognized fields, preserved but never interpreted.
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

impl Attachment {
    pub fn is_image(&self) -> bool {
        self.mime_type.starts_with("image/")
    }

    /// Textual or markdown-like attachments are the ones the builder decodes into an
    /// `attachment_text` node; everything else (binaries, images) is skipped for that purpose.
    pub fn is_text_like(&self) -> bool {
        let mime = self.mime_type.as_str();
        mime.starts_with("text/")
            || mime == "application/json"
            || mime == "application/markdown"
            || mime == "application/x-yaml"
    }
}

/// `content` can arrive in any of three shapes depending on how the upstream client uploaded it.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AttachmentContent {
    Bytes(Vec<u8>),
    Text(String),
}

/// A user-authored note, together with everything the Document Builder needs from it.
///
/// `name` is the memo's stable identifier (`memos/<uid>`) and is used verbatim as the
/// `memo_uid` carried on every node's metadata.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Memo {
    pub name: String,
    pub creator: String,
    pub content: String,

    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub ai_tags: Vec<String>,

    #[serde(default)]
    pub create_time: Option<Value>,
    #[serde(default)]
    pub update_time: Option<Value>,
    #[serde(default)]
    pub display_time: Option<Value>,

    #[serde(default)]
    pub visibility: Option<String>,
    #[serde(default)]
    pub pinned: bool,
    #[serde(default)]
    pub property: Option<MemoProperty>,
    #[serde(default)]
    pub attachments: Vec<Attachment>,

    /// Memo-to-memo links; never dereferenced by the retrieval core, kept for round-tripping.
    #[serde(default)]
    pub relations: Vec<Value>,
    #[serde(default)]
    pub reactions: Vec<Value>,
    #[serde(default)]
    pub snippet: Option<String>,

    /// Unrecognized fields, preserved but never interpreted.
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

impl Memo {
    /// The memo's own identifier, used as `memo_uid` everywhere in the retrieval core.
    pub fn uid(&self) -> &str {
        &self.name
    }
}
