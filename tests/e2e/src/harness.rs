//! A deterministic, offline [`IndexManager`]/[`IngestionPipeline`]/[`RetrieverRegistry`] harness.

use std::sync::Arc;

use async_trait::async_trait;
use memoria_core::{
    register_default_strategies, CaptionError, CaptionProvider, Config, EmbeddingAdapter, EmbeddingError,
    IndexManager, IngestionPipeline, Query, RetrievalResult, RetrieverRegistry, StrategyParams,
};

/// Deterministic, hash-based fake vectors: same input text/payload always embeds to the same
/// vector, so relevance ordering across runs is stable without a real model.
pub struct FakeEmbeddingAdapter;

/// A bag-of-characters hash into a fixed-width vector: memos sharing characters (CJK glyphs or
/// English substrings alike) land close together in cosine space, which is enough signal for
/// relevance ordering in tests without a real model.
fn fake_vector(seed: &str) -> Vec<f32> {
    let dims = memoria_core::vector_store::DEFAULT_DIMENSIONS;
    let mut v = vec![0.0f32; dims];
    for c in seed.chars() {
        let mut hash: u32 = 2166136261;
        let mut buf = [0u8; 4];
        for b in c.encode_utf8(&mut buf).bytes() {
            hash ^= b as u32;
            hash = hash.wrapping_mul(16777619);
        }
        v[hash as usize % dims] += 1.0;
    }
    let norm = v.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm > 0.0 {
        for x in &mut v {
            *x /= norm;
        }
    }
    v
}

#[async_trait]
impl EmbeddingAdapter for FakeEmbeddingAdapter {
    async fn embed_text_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        Ok(texts.iter().map(|t| fake_vector(t)).collect())
    }

    async fn embed_image_batch(&self, payloads: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        Ok(payloads.iter().map(|p| fake_vector(p)).collect())
    }

    fn text_model_name(&self) -> &str {
        "fake-text"
    }

    fn image_model_name(&self) -> &str {
        "fake-image"
    }
}

/// Returns a fixed, scripted caption regardless of the image payload, so caption-dependent
/// assertions don't depend on a real vision model.
pub struct ScriptedCaptionProvider {
    pub caption: String,
}

#[async_trait]
impl CaptionProvider for ScriptedCaptionProvider {
    async fn caption(&self, _payload: &str, _meta: &memoria_core::caption::CaptionMeta) -> Result<String, CaptionError> {
        Ok(self.caption.clone())
    }
}

/// Always fails, exercising the Document Builder's filename fallback (S6).
pub struct FailingCaptionProvider;

#[async_trait]
impl CaptionProvider for FailingCaptionProvider {
    async fn caption(&self, _payload: &str, _meta: &memoria_core::caption::CaptionMeta) -> Result<String, CaptionError> {
        Err(CaptionError::Request("caption provider unavailable in test harness".to_string()))
    }
}

/// Bundles a temp-directory-backed [`IndexManager`], an [`IngestionPipeline`] over it, and a
/// fully-registered [`RetrieverRegistry`], all wired to the fake embedding adapter above.
pub struct Harness {
    pub config: Config,
    pub index: Arc<IndexManager>,
    pub pipeline: IngestionPipeline,
    pub registry: RetrieverRegistry,
    _tmp: tempfile::TempDir,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_caption_provider(None)
    }

    pub fn with_caption_provider(caption_provider: Option<Arc<dyn CaptionProvider>>) -> Self {
        let tmp = tempfile::tempdir().expect("failed to create temp dir");
        let mut config = Config::default();
        config.index_base_dir = tmp.path().to_path_buf();

        let index = Arc::new(IndexManager::new(&config, Arc::new(FakeEmbeddingAdapter)).expect("index manager init"));
        let pipeline = IngestionPipeline::new(index.clone(), &config, caption_provider, reqwest::Client::new());

        let registry = RetrieverRegistry::new();
        register_default_strategies(&registry);

        Self { config, index, pipeline, registry, _tmp: tmp }
    }

    /// Runs `strategy_name` against the harness's index, with `params` and a plain text query.
    pub async fn search(
        &self,
        strategy_name: &str,
        query_text: &str,
        top_k: usize,
        params: StrategyParams,
    ) -> Vec<RetrievalResult> {
        let retriever = self.registry.get(strategy_name, self.index.clone(), &params).expect("unknown strategy");
        let query = Query::new(query_text, top_k);
        retriever.retrieve(&query).await.expect("retrieval failed")
    }

    /// As [`Harness::search`], but with an explicit `creator` filter applied to the query.
    pub async fn search_with_creator_filter(
        &self,
        strategy_name: &str,
        query_text: &str,
        top_k: usize,
        creator: &str,
    ) -> Vec<RetrievalResult> {
        let retriever =
            self.registry.get(strategy_name, self.index.clone(), &StrategyParams::new()).expect("unknown strategy");
        let query = Query::new(query_text, top_k).with_filter("creator", creator);
        retriever.retrieve(&query).await.expect("retrieval failed")
    }
}
