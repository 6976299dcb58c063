//! Data model: memos/attachments as ingested, and nodes as indexed.

mod memo;
mod node;

pub use memo::{Attachment, AttachmentContent, Memo, MemoProperty};
pub use node::{attachment_node_id, base_node_id, image_node_id, Node, NodeKind};
