//! Indexed units produced by the document builder.
//!
//! A memo decomposes into up to three kinds of node: one `base_text` node, zero or more
//! `attachment_text` nodes, and zero or more `image` nodes. Node identifiers are deterministic
//! and derived solely from the memo's own id plus the attachment's position, so re-running the
//! builder on an unchanged memo always produces the same id set.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// The three kinds of indexed unit a memo can produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[non_exhaustive]
pub enum NodeKind {
    BaseText,
    AttachmentText,
    Image,
}

impl NodeKind {
    pub fn as_str(self) -> &'static str {
        match self {
            NodeKind::BaseText => "base_text",
            NodeKind::AttachmentText => "attachment_text",
            NodeKind::Image => "image",
        }
    }
}

impl std::fmt::Display for NodeKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Builds the deterministic node id for a memo's `base_text` node.
pub fn base_node_id(memo_name: &str) -> String {
    format!("memo:{memo_name}")
}

/// Builds the deterministic node id for the `attachment_text` node at `index` (0-based position
/// in the memo's attachment list).
pub fn attachment_node_id(memo_name: &str, index: usize) -> String {
    format!("memo:{memo_name}:att:{index}")
}

/// Builds the deterministic node id for the `image` node at `index` (0-based position in the
/// memo's attachment list).
pub fn image_node_id(memo_name: &str, index: usize) -> String {
    format!("memo:{memo_name}:img:{index}")
}

/// One node ready for insertion into a vector store or the BM25 corpus.
///
/// `metadata` always carries `memo_uid` and `creator`; `attachment_uid`, `filename`, and `type`
/// are additionally present on `attachment_text` and `image` nodes.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[non_exhaustive]
pub struct Node {
    pub id: String,
    pub kind: NodeKind,
    /// The text payload: memo content (+ attachments block) for `base_text`, decoded body for
    /// `attachment_text`, rendered caption for `image`.
    pub text: String,
    /// For `image` nodes only: the resolved image payload (data URL or external URL) that the
    /// image embedding model is given in place of `text`.
    pub image_payload: Option<String>,
    pub metadata: BTreeMap<String, String>,
}

impl Node {
    pub fn memo_uid(&self) -> Option<&str> {
        self.metadata.get("memo_uid").map(String::as_str)
    }

    pub fn new_base_text(memo_name: &str, text: String, mut metadata: BTreeMap<String, String>) -> Self {
        metadata.entry("memo_uid".to_string()).or_insert_with(|| memo_name.to_string());
        Self {
            id: base_node_id(memo_name),
            kind: NodeKind::BaseText,
            text,
            image_payload: None,
            metadata,
        }
    }

    pub fn new_attachment_text(
        memo_name: &str,
        index: usize,
        text: String,
        mut metadata: BTreeMap<String, String>,
    ) -> Self {
        metadata.entry("memo_uid".to_string()).or_insert_with(|| memo_name.to_string());
        Self {
            id: attachment_node_id(memo_name, index),
            kind: NodeKind::AttachmentText,
            text,
            image_payload: None,
            metadata,
        }
    }

    pub fn new_image(
        memo_name: &str,
        index: usize,
        caption: String,
        image_payload: String,
        mut metadata: BTreeMap<String, String>,
    ) -> Self {
        metadata.entry("memo_uid".to_string()).or_insert_with(|| memo_name.to_string());
        Self {
            id: image_node_id(memo_name, index),
            kind: NodeKind::Image,
            text: caption,
            image_payload: Some(image_payload),
            metadata,
        }
    }
}
