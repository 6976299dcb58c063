//! HTTP-backed embedding adapter over a Jina-style embeddings endpoint.

use async_trait::async_trait;
use serde_json::json;

use super::{EmbeddingAdapter, EmbeddingError, Vector};

const DEFAULT_ENDPOINT: &str = "https://api.jina.ai/v1/embeddings";

pub struct JinaEmbeddingAdapter {
    client: reqwest::Client,
    endpoint: String,
    api_key: String,
    text_model: String,
    image_model: String,
}

impl JinaEmbeddingAdapter {
    pub fn new(api_key: impl Into<String>, text_model: impl Into<String>, image_model: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoint: DEFAULT_ENDPOINT.to_string(),
            api_key: api_key.into(),
            text_model: text_model.into(),
            image_model: image_model.into(),
        }
    }

    #[cfg(test)]
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    async fn embed_batch(&self, model: &str, inputs: Vec<String>) -> Result<Vec<Vector>, EmbeddingError> {
        let expected = inputs.len();
        let body = json!({ "model": model, "input": inputs });

        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| EmbeddingError::Request(e.to_string()))?;

        if !response.status().is_success() {
            return Err(EmbeddingError::Request(format!("provider returned status {}", response.status())));
        }

        let payload: serde_json::Value = response
            .json()
            .await
            .map_err(|e| EmbeddingError::Request(e.to_string()))?;

        let data = payload
            .get("data")
            .and_then(|d| d.as_array())
            .ok_or_else(|| EmbeddingError::MalformedResponse("missing data array".to_string()))?;

        let mut vectors = Vec::with_capacity(data.len());
        for entry in data {
            let embedding = entry
                .get("embedding")
                .and_then(|e| e.as_array())
                .ok_or_else(|| EmbeddingError::MalformedResponse("entry missing embedding array".to_string()))?;
            let vector: Vec<f32> = embedding.iter().filter_map(|v| v.as_f64()).map(|v| v as f32).collect();
            vectors.push(vector);
        }

        if vectors.len() != expected {
            return Err(EmbeddingError::CountMismatch { expected, got: vectors.len() });
        }

        Ok(vectors)
    }
}

#[async_trait]
impl EmbeddingAdapter for JinaEmbeddingAdapter {
    async fn embed_text_batch(&self, texts: &[String]) -> Result<Vec<Vector>, EmbeddingError> {
        self.embed_batch(&self.text_model, texts.to_vec()).await
    }

    async fn embed_image_batch(&self, payloads: &[String]) -> Result<Vec<Vector>, EmbeddingError> {
        self.embed_batch(&self.image_model, payloads.to_vec()).await
    }

    fn text_model_name(&self) -> &str {
        &self.text_model
    }

    fn image_model_name(&self) -> &str {
        &self.image_model
    }
}
