//! The ten composable retrieval strategies (§4.7): each wraps an [`IndexManager`] and a fixed
//! choice of stores plus a fusion rule, all exposed behind the single uniform [`Retriever`] trait.

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;

use crate::index_manager::{Hit, IndexManager};

use super::base::{dedup_by_memo, drop_below_min_score, filter_results, post_process, Query, RetrievalResult};
use super::fusion::{compute_adaptive_alpha, min_max_normalize, reciprocal_rank_fusion, weighted_score_fusion};
use super::RetrievalError;

/// The uniform contract every strategy satisfies: `Query -> [RetrievalResult]` (§4.6).
#[async_trait]
pub trait Retriever: Send + Sync {
    async fn retrieve(&self, query: &Query) -> Result<Vec<RetrievalResult>, RetrievalError>;
}

fn hit_to_result(hit: Hit, source: &str) -> RetrievalResult {
    let memo_uid = hit.metadata.get("memo_uid").cloned().unwrap_or_default();
    RetrievalResult {
        node_id: hit.node_id,
        memo_uid,
        score: hit.score,
        content: hit.text,
        metadata: hit.metadata,
        source: source.to_string(),
    }
}

/// Dense kNN search over the text store only (§4.7 `text`). Over-fetches `2 * top_k` before the
/// common post-process pipeline applies filters, drops below `min_score`, dedups, and truncates.
pub struct TextRetriever {
    index: Arc<IndexManager>,
}

impl TextRetriever {
    pub fn new(index: Arc<IndexManager>) -> Self {
        Self { index }
    }
}

#[async_trait]
impl Retriever for TextRetriever {
    async fn retrieve(&self, query: &Query) -> Result<Vec<RetrievalResult>, RetrievalError> {
        let vector = self.index.embed_query(&query.text).await?;
        let hits = self.index.query_text(&vector, query.top_k * 2).await?;
        let results: Vec<RetrievalResult> = hits.into_iter().map(|h| hit_to_result(h, "text")).collect();
        Ok(post_process(results, query))
    }
}

/// Dense kNN search over the image store only (§4.7 `image`).
pub struct ImageRetriever {
    index: Arc<IndexManager>,
}

impl ImageRetriever {
    pub fn new(index: Arc<IndexManager>) -> Self {
        Self { index }
    }
}

#[async_trait]
impl Retriever for ImageRetriever {
    async fn retrieve(&self, query: &Query) -> Result<Vec<RetrievalResult>, RetrievalError> {
        let vector = self.index.embed_query(&query.text).await?;
        let hits = self.index.query_image(&vector, query.top_k * 2).await?;
        let results: Vec<RetrievalResult> = hits.into_iter().map(|h| hit_to_result(h, "image")).collect();
        Ok(post_process(results, query))
    }
}

/// Text and image kNN concatenated, sorted by raw score, deduped by memo (§4.7 `vector`).
/// Filters are applied post-hoc, after concatenation and dedup, not to either sub-query: the
/// documented filter-asymmetry this strategy intentionally preserves (§4.7, §9 decision).
pub struct VectorRetriever {
    index: Arc<IndexManager>,
}

impl VectorRetriever {
    pub fn new(index: Arc<IndexManager>) -> Self {
        Self { index }
    }
}

#[async_trait]
impl Retriever for VectorRetriever {
    async fn retrieve(&self, query: &Query) -> Result<Vec<RetrievalResult>, RetrievalError> {
        let vector = self.index.embed_query(&query.text).await?;
        let text_hits = self.index.query_text(&vector, query.top_k).await?;
        let image_hits = self.index.query_image(&vector, query.top_k).await?;

        let mut combined: Vec<RetrievalResult> = text_hits.into_iter().map(|h| hit_to_result(h, "vector")).collect();
        combined.extend(image_hits.into_iter().map(|h| hit_to_result(h, "vector")));
        combined.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));

        let deduped = dedup_by_memo(combined);
        let filtered = filter_results(deduped, &query.filters);
        let kept = drop_below_min_score(filtered, query.min_score);
        Ok(kept.into_iter().take(query.top_k).collect())
    }
}

/// Legacy alias of [`VectorRetriever`], kept as a distinct name for callers still requesting
/// `hybrid` (§4.7: "`hybrid` is a legacy name for `vector`, identical behavior").
pub struct HybridRetriever {
    inner: VectorRetriever,
}

impl HybridRetriever {
    pub fn new(index: Arc<IndexManager>) -> Self {
        Self { inner: VectorRetriever::new(index) }
    }
}

#[async_trait]
impl Retriever for HybridRetriever {
    async fn retrieve(&self, query: &Query) -> Result<Vec<RetrievalResult>, RetrievalError> {
        self.inner.retrieve(query).await
    }
}

/// Sparse BM25 search over the text store only (§4.7 `bm25`).
pub struct Bm25Retriever {
    index: Arc<IndexManager>,
}

impl Bm25Retriever {
    pub fn new(index: Arc<IndexManager>) -> Self {
        Self { index }
    }
}

#[async_trait]
impl Retriever for Bm25Retriever {
    async fn retrieve(&self, query: &Query) -> Result<Vec<RetrievalResult>, RetrievalError> {
        let hits = self.index.query_bm25(&query.text, query.top_k * 2).await?;
        let results: Vec<RetrievalResult> = hits.into_iter().map(|h| hit_to_result(h, "bm25")).collect();
        Ok(post_process(results, query))
    }
}

/// Text and image kNN fused by Reciprocal Rank Fusion (§4.7 `rrf`). Filters are pushed into each
/// sub-query before fusion, matching the documented "filters passed into sub-queries" rule for
/// every fusion-based strategy except `vector`/`hybrid` (§4.7, §9 decision).
pub struct RrfRetriever {
    index: Arc<IndexManager>,
    k_rrf: f32,
    text_weight: f32,
    image_weight: f32,
}

impl RrfRetriever {
    pub fn new(index: Arc<IndexManager>, k_rrf: f32, text_weight: f32, image_weight: f32) -> Self {
        Self { index, k_rrf, text_weight, image_weight }
    }
}

#[async_trait]
impl Retriever for RrfRetriever {
    async fn retrieve(&self, query: &Query) -> Result<Vec<RetrievalResult>, RetrievalError> {
        let vector = self.index.embed_query(&query.text).await?;
        let text_hits = self.index.query_text(&vector, query.top_k * 3).await?;
        let image_hits = self.index.query_image(&vector, query.top_k * 3).await?;

        let text_results: Vec<RetrievalResult> = text_hits.into_iter().map(|h| hit_to_result(h, "text")).collect();
        let image_results: Vec<RetrievalResult> = image_hits.into_iter().map(|h| hit_to_result(h, "image")).collect();

        let text_filtered = filter_results(text_results, &query.filters);
        let image_filtered = filter_results(image_results, &query.filters);

        let fused = reciprocal_rank_fusion(
            &[(text_filtered, self.text_weight), (image_filtered, self.image_weight)],
            self.k_rrf,
            "rrf",
        );
        let kept = drop_below_min_score(fused, query.min_score);
        Ok(kept.into_iter().take(query.top_k).collect())
    }
}

/// Text and image kNN, each min-max normalized and linearly blended (§4.7 `weighted`).
pub struct WeightedRetriever {
    index: Arc<IndexManager>,
    text_weight: f32,
    image_weight: f32,
}

impl WeightedRetriever {
    pub fn new(index: Arc<IndexManager>, text_weight: f32, image_weight: f32) -> Self {
        Self { index, text_weight, image_weight }
    }
}

#[async_trait]
impl Retriever for WeightedRetriever {
    async fn retrieve(&self, query: &Query) -> Result<Vec<RetrievalResult>, RetrievalError> {
        let vector = self.index.embed_query(&query.text).await?;
        let text_hits = self.index.query_text(&vector, query.top_k).await?;
        let image_hits = self.index.query_image(&vector, query.top_k).await?;

        let text_results: Vec<RetrievalResult> = text_hits.into_iter().map(|h| hit_to_result(h, "text")).collect();
        let image_results: Vec<RetrievalResult> = image_hits.into_iter().map(|h| hit_to_result(h, "image")).collect();

        let text_filtered = filter_results(text_results, &query.filters);
        let image_filtered = filter_results(image_results, &query.filters);

        let fused = weighted_score_fusion(
            &[(text_filtered, self.text_weight), (image_filtered, self.image_weight)],
            "weighted",
        );
        let kept = drop_below_min_score(fused, query.min_score);
        Ok(kept.into_iter().take(query.top_k).collect())
    }
}

/// BM25 and text kNN fused by Reciprocal Rank Fusion with per-source weights (§4.7 `bm25_vector`).
pub struct Bm25VectorRetriever {
    index: Arc<IndexManager>,
    k_rrf: f32,
    bm25_weight: f32,
    vector_weight: f32,
}

impl Bm25VectorRetriever {
    pub fn new(index: Arc<IndexManager>, k_rrf: f32, bm25_weight: f32, vector_weight: f32) -> Self {
        Self { index, k_rrf, bm25_weight, vector_weight }
    }
}

#[async_trait]
impl Retriever for Bm25VectorRetriever {
    async fn retrieve(&self, query: &Query) -> Result<Vec<RetrievalResult>, RetrievalError> {
        let vector = self.index.embed_query(&query.text).await?;
        let bm25_hits = self.index.query_bm25(&query.text, query.top_k * 3).await?;
        let text_hits = self.index.query_text(&vector, query.top_k * 3).await?;

        let bm25_results: Vec<RetrievalResult> = bm25_hits.into_iter().map(|h| hit_to_result(h, "bm25")).collect();
        let text_results: Vec<RetrievalResult> = text_hits.into_iter().map(|h| hit_to_result(h, "text")).collect();

        let bm25_filtered = filter_results(bm25_results, &query.filters);
        let text_filtered = filter_results(text_results, &query.filters);

        let fused = reciprocal_rank_fusion(
            &[(bm25_filtered, self.bm25_weight), (text_filtered, self.vector_weight)],
            self.k_rrf,
            "bm25_vector",
        );
        let kept = drop_below_min_score(fused, query.min_score);
        Ok(kept.into_iter().take(query.top_k).collect())
    }
}

/// BM25 and text kNN, each min-max normalized and blended by a fixed `alpha` (§4.7
/// `bm25_vector_alpha`): `s = alpha * s_vector + (1 - alpha) * s_bm25`.
pub struct Bm25VectorAlphaRetriever {
    index: Arc<IndexManager>,
    alpha: f32,
}

impl Bm25VectorAlphaRetriever {
    pub fn new(index: Arc<IndexManager>, alpha: f32) -> Self {
        Self { index, alpha }
    }

    async fn retrieve_with_alpha(&self, query: &Query, alpha: f32) -> Result<Vec<RetrievalResult>, RetrievalError> {
        let vector = self.index.embed_query(&query.text).await?;
        let bm25_hits = self.index.query_bm25(&query.text, query.top_k).await?;
        let text_hits = self.index.query_text(&vector, query.top_k).await?;

        let bm25_results: Vec<RetrievalResult> = bm25_hits.into_iter().map(|h| hit_to_result(h, "bm25")).collect();
        let text_results: Vec<RetrievalResult> = text_hits.into_iter().map(|h| hit_to_result(h, "vector")).collect();

        let bm25_filtered = filter_results(bm25_results, &query.filters);
        let text_filtered = filter_results(text_results, &query.filters);

        let bm25_scores: Vec<f32> = bm25_filtered.iter().map(|r| r.score).collect();
        let vector_scores: Vec<f32> = text_filtered.iter().map(|r| r.score).collect();
        let bm25_norm = min_max_normalize(&bm25_scores);
        let vector_norm = min_max_normalize(&vector_scores);

        let alpha = alpha.clamp(0.0, 1.0);
        let mut fused: BTreeMap<String, (f32, RetrievalResult)> = BTreeMap::new();
        for (item, norm_score) in text_filtered.into_iter().zip(vector_norm) {
            let entry = fused.entry(item.memo_uid.clone());
            let mut item = item;
            item.source = "bm25_vector_alpha".to_string();
            let contribution = alpha * norm_score;
            entry.and_modify(|(score, _)| *score += contribution).or_insert((contribution, item));
        }
        for (item, norm_score) in bm25_filtered.into_iter().zip(bm25_norm) {
            let entry = fused.entry(item.memo_uid.clone());
            let mut item = item;
            item.source = "bm25_vector_alpha".to_string();
            let contribution = (1.0 - alpha) * norm_score;
            entry.and_modify(|(score, _)| *score += contribution).or_insert((contribution, item));
        }

        let mut results: Vec<RetrievalResult> =
            fused.into_values().map(|(score, mut item)| { item.score = score; item }).collect();
        results.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));

        let kept = drop_below_min_score(results, query.min_score);
        Ok(kept.into_iter().take(query.top_k).collect())
    }
}

#[async_trait]
impl Retriever for Bm25VectorAlphaRetriever {
    async fn retrieve(&self, query: &Query) -> Result<Vec<RetrievalResult>, RetrievalError> {
        self.retrieve_with_alpha(query, self.alpha).await
    }
}

/// Like [`Bm25VectorAlphaRetriever`], but `alpha` is derived from the query text at request time
/// via [`compute_adaptive_alpha`] instead of being fixed at construction (§4.7 `adaptive`).
pub struct AdaptiveRetriever {
    inner: Bm25VectorAlphaRetriever,
}

impl AdaptiveRetriever {
    pub fn new(index: Arc<IndexManager>) -> Self {
        Self { inner: Bm25VectorAlphaRetriever::new(index, 0.5) }
    }
}

#[async_trait]
impl Retriever for AdaptiveRetriever {
    async fn retrieve(&self, query: &Query) -> Result<Vec<RetrievalResult>, RetrievalError> {
        let alpha = compute_adaptive_alpha(&query.text);
        self.inner.retrieve_with_alpha(query, alpha).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::{self, BuilderConfig};
    use crate::config::Config;
    use crate::embeddings::{EmbeddingAdapter, EmbeddingError};
    use crate::model::{Attachment, Memo, MemoProperty};
    use std::collections::BTreeMap as Map;

    struct FakeEmbeddingAdapter;

    fn fake_vector(seed: &str) -> Vec<f32> {
        let mut v = vec![0.0f32; crate::vector_store::DEFAULT_DIMENSIONS];
        for (i, b) in seed.bytes().enumerate() {
            v[i % v.len()] += b as f32;
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

    fn test_memo(name: &str, content: &str) -> Memo {
        Memo {
            name: name.to_string(),
            creator: "users/1".to_string(),
            content: content.to_string(),
            tags: vec![],
            ai_tags: vec![],
            create_time: None,
            update_time: None,
            display_time: None,
            visibility: None,
            pinned: false,
            property: Some(MemoProperty::default()),
            attachments: Vec::<Attachment>::new(),
            relations: vec![],
            reactions: vec![],
            snippet: None,
            extra: Map::new(),
        }
    }

    async fn seeded_index() -> (Arc<IndexManager>, tempfile::TempDir) {
        let tmp = tempfile::tempdir().unwrap();
        let mut config = Config::default();
        config.index_base_dir = tmp.path().to_path_buf();
        let manager = IndexManager::new(&config, Arc::new(FakeEmbeddingAdapter)).unwrap();
        let client = reqwest::Client::new();
        let builder_config = BuilderConfig::from(&config);

        for (name, content) in [("memos/A", "rust async retrieval engine"), ("memos/B", "cooking pasta recipes")] {
            let memo = test_memo(name, content);
            let built = builder::build(&memo, &builder_config, None, &client).await.unwrap();
            manager.upsert(&memo, built).await.unwrap();
        }
        manager.rebuild_bm25().await.unwrap();
        (Arc::new(manager), tmp)
    }

    #[tokio::test]
    async fn text_retriever_finds_matching_memo() {
        let (index, _tmp) = seeded_index().await;
        let retriever = TextRetriever::new(index);
        let query = Query::new("rust async retrieval engine", 5);
        let results = retriever.retrieve(&query).await.unwrap();
        assert!(results.iter().any(|r| r.memo_uid == "memos/A"));
    }

    #[tokio::test]
    async fn bm25_retriever_finds_matching_memo() {
        let (index, _tmp) = seeded_index().await;
        let retriever = Bm25Retriever::new(index);
        let query = Query::new("pasta recipes", 5);
        let results = retriever.retrieve(&query).await.unwrap();
        assert!(results.iter().any(|r| r.memo_uid == "memos/B"));
    }

    #[tokio::test]
    async fn rrf_retriever_returns_deduped_results() {
        let (index, _tmp) = seeded_index().await;
        let retriever = RrfRetriever::new(index, 60.0, 1.0, 1.0);
        let query = Query::new("rust retrieval", 5);
        let results = retriever.retrieve(&query).await.unwrap();
        let mut seen = std::collections::HashSet::new();
        assert!(results.iter().all(|r| seen.insert(r.memo_uid.clone())));
    }

    #[tokio::test]
    async fn adaptive_retriever_runs_without_error() {
        let (index, _tmp) = seeded_index().await;
        let retriever = AdaptiveRetriever::new(index);
        let query = Query::new("bug", 5);
        let results = retriever.retrieve(&query).await.unwrap();
        assert!(results.len() <= 5);
    }

    #[tokio::test]
    async fn vector_retriever_applies_filters_post_hoc() {
        let (index, _tmp) = seeded_index().await;
        let retriever = VectorRetriever::new(index);
        let query = Query::new("rust async", 5).with_filter("memo_uid", "memos/A");
        let results = retriever.retrieve(&query).await.unwrap();
        assert!(results.iter().all(|r| r.memo_uid == "memos/A"));
    }
}
