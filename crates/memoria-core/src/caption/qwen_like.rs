//! An HTTP-backed caption provider for OpenAI-style chat-completions vision endpoints.

use async_trait::async_trait;
use serde_json::json;

use super::{parse_caption_response, CaptionError, CaptionMeta, CaptionProvider};

const SYSTEM_PROMPT: &str = "You are an assistant that describes images for a note-taking \
search index. Respond with a single JSON object with keys type_summary (string), \
visual_details (array of strings), ocr (array of strings), and keywords (array of strings). \
You may wrap the JSON in a markdown code fence.";

/// Talks to a qwen3-vl-style chat completions endpoint: one system instruction, one user
/// message carrying a text part and an image-URL part.
pub struct QwenLikeCaptionProvider {
    client: reqwest::Client,
    endpoint: String,
    api_key: Option<String>,
    model: String,
}

impl QwenLikeCaptionProvider {
    pub fn new(endpoint: impl Into<String>, model: impl Into<String>, api_key: Option<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoint: endpoint.into(),
            api_key,
            model: model.into(),
        }
    }
}

#[async_trait]
impl CaptionProvider for QwenLikeCaptionProvider {
    async fn caption(&self, image_payload: &str, _meta: &CaptionMeta) -> Result<String, CaptionError> {
        let body = json!({
            "model": self.model,
            "messages": [
                {"role": "system", "content": SYSTEM_PROMPT},
                {
                    "role": "user",
                    "content": [
                        {"type": "text", "text": "Describe this image."},
                        {"type": "image_url", "image_url": {"url": image_payload}},
                    ],
                },
            ],
        });

        let mut request = self.client.post(&self.endpoint).json(&body);
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        let response = request
            .send()
            .await
            .map_err(|e| CaptionError::Request(e.to_string()))?;

        if !response.status().is_success() {
            return Err(CaptionError::Request(format!(
                "caption provider returned status {}",
                response.status()
            )));
        }

        let payload: serde_json::Value = response
            .json()
            .await
            .map_err(|e| CaptionError::Request(e.to_string()))?;

        let content = payload
            .get("choices")
            .and_then(|c| c.get(0))
            .and_then(|c| c.get("message"))
            .and_then(|m| m.get("content"))
            .and_then(|c| c.as_str())
            .ok_or_else(|| CaptionError::MalformedResponse("missing choices[0].message.content".to_string()))?;

        let fields = parse_caption_response(content)?;
        Ok(fields.render())
    }
}
