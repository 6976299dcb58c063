//! Document Builder (§4.1): derives the semantic sub-documents of one memo.
//!
//! `build` never fails on a per-attachment basis — unresolvable images and undecodable
//! attachments are skipped with a warning (§4.1 "Error conditions"). It only rejects the memo
//! itself when the memo is structurally invalid, which in this crate means the caller never
//! gets a `Memo` value in the first place (deserialization already enforces that boundary).

mod content;
mod image;

pub use content::decode_text_content;

use std::collections::BTreeMap;

use futures::future::join_all;
use thiserror::Error;

use crate::caption::{CaptionMeta, CaptionProvider};
use crate::model::{Attachment, Memo, Node};

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum BuilderError {
    #[error("memo content fetch failed: {0}")]
    MemoFetch(String),
}

/// Builder limits (§4.1, §6 Configuration surface).
#[derive(Debug, Clone)]
pub struct BuilderConfig {
    pub max_images: usize,
    pub max_attachments: usize,
    pub attachment_snippet_len: usize,
    pub attachment_text_max_len: usize,
    pub memos_base_url: Option<String>,
    pub memos_session_cookie: Option<String>,
}

impl From<&crate::config::Config> for BuilderConfig {
    fn from(config: &crate::config::Config) -> Self {
        Self {
            max_images: config.max_images,
            max_attachments: config.max_attachments,
            attachment_snippet_len: config.attachment_snippet_len,
            attachment_text_max_len: config.attachment_text_max_len,
            memos_base_url: config.memos_base_url.clone(),
            memos_session_cookie: config.memos_session_cookie.clone(),
        }
    }
}

/// The nodes produced by building one memo.
#[derive(Debug)]
pub struct BuiltDocuments {
    pub base_text: Node,
    pub attachment_texts: Vec<Node>,
    pub images: Vec<Node>,
}

fn base_metadata(memo: &Memo) -> BTreeMap<String, String> {
    let mut metadata = BTreeMap::new();
    metadata.insert("memo_uid".to_string(), memo.uid().to_string());
    metadata.insert("creator".to_string(), memo.creator.clone());
    metadata
}

fn attachment_metadata(memo: &Memo, attachment: &Attachment) -> BTreeMap<String, String> {
    let mut metadata = base_metadata(memo);
    metadata.insert("attachment_uid".to_string(), attachment.name.clone());
    metadata.insert("filename".to_string(), attachment.filename.clone());
    metadata.insert("type".to_string(), attachment.mime_type.clone());
    metadata
}

/// Builds the base text node: `memo.content` trimmed, with an `[Attachments]` block listing
/// the first `max_attachments` non-image attachments.
fn build_base_text(memo: &Memo, config: &BuilderConfig) -> Node {
    let content = memo.content.trim();

    let mut lines = Vec::new();
    for (n, attachment) in memo
        .attachments
        .iter()
        .filter(|a| !a.is_image())
        .take(config.max_attachments)
        .enumerate()
    {
        let mut line = format!("{}) type: {}, filename: {}", n + 1, attachment.mime_type, attachment.filename);
        if let Some(decoded) = content::attachment_raw_content(attachment) {
            if let Some(text) = decode_text_content(&decoded) {
                let preview = content::compact_preview(&text, config.attachment_snippet_len);
                if !preview.is_empty() {
                    line.push_str(&format!(", preview: {preview}"));
                }
            }
        }
        lines.push(line);
    }

    let text = if lines.is_empty() {
        content.to_string()
    } else {
        format!("{}\n\n[Attachments]\n{}", content, lines.join("\n"))
    };

    Node::new_base_text(memo.uid(), text, base_metadata(memo))
}

/// Builds one `attachment_text` node per text-like attachment whose decoded body is non-empty.
fn build_attachment_text_nodes(memo: &Memo, config: &BuilderConfig) -> Vec<Node> {
    let mut nodes = Vec::new();
    for (index, attachment) in memo.attachments.iter().enumerate() {
        if attachment.is_image() || !attachment.is_text_like() {
            continue;
        }
        let Some(raw) = content::attachment_raw_content(attachment) else { continue };
        let Some(decoded) = decode_text_content(&raw) else { continue };
        let truncated = content::truncate_with_ellipsis(&decoded, config.attachment_text_max_len);
        nodes.push(Node::new_attachment_text(memo.uid(), index, truncated, attachment_metadata(memo, attachment)));
    }
    nodes
}

/// Builds up to `max_images` image nodes: resolves each image's payload, then fans out caption
/// generation across all of them in parallel (§4.1 step 4), awaiting the whole batch before
/// emitting nodes.
async fn build_image_nodes(
    memo: &Memo,
    config: &BuilderConfig,
    caption_provider: Option<&dyn CaptionProvider>,
    http_client: &reqwest::Client,
) -> Vec<Node> {
    let candidates: Vec<(usize, &Attachment)> = memo
        .attachments
        .iter()
        .enumerate()
        .filter(|(_, a)| a.is_image())
        .take(config.max_images)
        .collect();

    let resolved = join_all(candidates.iter().map(|(_, attachment)| {
        image::resolve_image_payload(attachment, config, http_client)
    }))
    .await;

    let captions = join_all(candidates.iter().zip(resolved.iter()).map(|((_, attachment), payload)| {
        let meta = CaptionMeta { filename: attachment.filename.clone(), mime_type: attachment.mime_type.clone() };
        async move {
            match (payload, caption_provider) {
                (Some(payload), Some(provider)) => match provider.caption(payload, &meta).await {
                    Ok(caption) => caption,
                    Err(e) => {
                        tracing::warn!(filename = %attachment.filename, error = %e, "caption provider failed, falling back to filename");
                        attachment.filename.clone()
                    }
                },
                _ => attachment.filename.clone(),
            }
        }
    }))
    .await;

    let mut nodes = Vec::new();
    for (((index, attachment), payload), caption) in candidates.into_iter().zip(resolved).zip(captions) {
        let Some(payload) = payload else {
            tracing::warn!(filename = %attachment.filename, "could not resolve image payload, skipping");
            continue;
        };
        nodes.push(Node::new_image(memo.uid(), index, caption, payload, attachment_metadata(memo, attachment)));
    }
    nodes
}

/// Builds the full set of nodes for one memo. `http_client` is used only for resolving images
/// that must be fetched from the memo server (§4.1 step 3, precedence case 3).
pub async fn build(
    memo: &Memo,
    config: &BuilderConfig,
    caption_provider: Option<&dyn CaptionProvider>,
    http_client: &reqwest::Client,
) -> Result<BuiltDocuments, BuilderError> {
    let base_text = build_base_text(memo, config);
    let attachment_texts = build_attachment_text_nodes(memo, config);
    let images = build_image_nodes(memo, config, caption_provider, http_client).await;

    Ok(BuiltDocuments { base_text, attachment_texts, images })
}
