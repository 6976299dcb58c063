//! Image captioning: a pluggable provider contract plus one concrete chat-style implementation.

mod qwen_like;

pub use qwen_like::QwenLikeCaptionProvider;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Everything the caption provider needs to know about the image being captioned, beyond the
/// payload itself, in case a provider wants to tailor its prompt.
#[derive(Debug, Clone, Default)]
pub struct CaptionMeta {
    pub filename: String,
    pub mime_type: String,
}

/// The four structured fields the upstream vision model is asked to return, before they are
/// rendered into the fixed four-line caption text.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CaptionFields {
    pub type_summary: String,
    #[serde(default)]
    pub visual_details: Vec<String>,
    #[serde(default)]
    pub ocr: Vec<String>,
    #[serde(default)]
    pub keywords: Vec<String>,
}

impl CaptionFields {
    /// Renders the fixed four-line Chinese-labeled caption, as produced by the original service.
    pub fn render(&self) -> String {
        format!(
            "类型：{}\n细节：{}\n文字：{}\n关键词：{}",
            self.type_summary,
            self.visual_details.join("; "),
            self.ocr.join("; "),
            self.keywords.join(", "),
        )
    }
}

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum CaptionError {
    #[error("caption provider request failed: {0}")]
    Request(String),
    #[error("caption provider returned a response that could not be parsed: {0}")]
    MalformedResponse(String),
}

/// A chat-style multi-modal captioning backend.
///
/// A failure here is never fatal to ingestion: the Document Builder falls back to the
/// attachment's filename (§4.1, S6).
#[async_trait]
pub trait CaptionProvider: Send + Sync {
    async fn caption(&self, image_payload: &str, meta: &CaptionMeta) -> Result<String, CaptionError>;
}

/// Strips a markdown code fence (` ```json ... ``` ` or plain ` ``` ... ``` `) around a JSON
/// blob, as the caption provider is permitted to return one.
pub fn strip_json_fence(raw: &str) -> &str {
    let trimmed = raw.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let rest = rest.strip_prefix("json").unwrap_or(rest);
    let rest = rest.trim_start_matches(['\n', '\r']);
    rest.strip_suffix("```").unwrap_or(rest).trim()
}

/// Parses the provider's raw response text (fenced or not) into structured caption fields.
pub fn parse_caption_response(raw: &str) -> Result<CaptionFields, CaptionError> {
    let json = strip_json_fence(raw);
    serde_json::from_str(json).map_err(|e| CaptionError::MalformedResponse(e.to_string()))
}
