//! Embedding Adapter: a uniform contract over text/image embedding providers.
//!
//! Queries are always embedded with the text model, even when the target store is the image
//! store — the image store is built on a shared-space multi-modal model that accepts text
//! queries directly (§4.2).

mod jina;

pub use jina::JinaEmbeddingAdapter;

use async_trait::async_trait;
use thiserror::Error;

pub type Vector = Vec<f32>;

/// A transport failure calls for the caller to retry; a malformed response calls for a
/// configuration or provider-side fix. The index manager treats both the same way (fatal to
/// the single memo's upsert, per §4.5), but keeping them distinct lets a caller log
/// appropriately or special-case retry behavior.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum EmbeddingError {
    #[error("embedding provider request failed: {0}")]
    Request(String),
    #[error("embedding provider returned a response that could not be parsed: {0}")]
    MalformedResponse(String),
    #[error("embedding provider returned {got} vectors for {expected} inputs")]
    CountMismatch { expected: usize, got: usize },
}

/// Uniform contract over a text+image embedding backend. The index manager and retrieval
/// strategies only ever depend on this trait, never on a concrete provider.
#[async_trait]
pub trait EmbeddingAdapter: Send + Sync {
    async fn embed_text(&self, text: &str) -> Result<Vector, EmbeddingError> {
        Ok(self.embed_text_batch(std::slice::from_ref(&text.to_string())).await?.remove(0))
    }

    async fn embed_text_batch(&self, texts: &[String]) -> Result<Vec<Vector>, EmbeddingError>;

    /// `payload` is a URL or a `data:` URL.
    async fn embed_image(&self, payload: &str) -> Result<Vector, EmbeddingError> {
        Ok(self.embed_image_batch(std::slice::from_ref(&payload.to_string())).await?.remove(0))
    }

    async fn embed_image_batch(&self, payloads: &[String]) -> Result<Vec<Vector>, EmbeddingError>;

    /// The model identifier backing text embeddings, used to derive a sanitized collection name
    /// for the text store (§4.3).
    fn text_model_name(&self) -> &str;

    /// The model identifier backing image embeddings, used to derive a sanitized collection
    /// name for the image store.
    fn image_model_name(&self) -> &str;
}

/// Truncates an embedding to `target_dims` (if it is longer) and L2-renormalizes it, the
/// standard Matryoshka-representation-learning trick for shrinking a provider's native
/// dimensionality to whatever the vector store's HNSW index was built with.
pub fn matryoshka_truncate(mut vector: Vector, target_dims: usize) -> Vector {
    if vector.len() > target_dims {
        vector.truncate(target_dims);
    }
    let norm = vector.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm > 0.0 {
        for x in &mut vector {
            *x /= norm;
        }
    }
    vector
}

/// Sanitizes a model identifier into something safe to embed in a collection directory/name:
/// lowercase, with anything other than ASCII alphanumerics, `-`, and `_` replaced by `_`.
pub fn sanitize_model_name(model: &str) -> String {
    model
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c.to_ascii_lowercase() } else { '_' })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sanitizes_model_names() {
        assert_eq!(sanitize_model_name("jina-embeddings-v3"), "jina-embeddings-v3");
        assert_eq!(sanitize_model_name("jina/embeddings v4"), "jina_embeddings_v4");
    }
}
