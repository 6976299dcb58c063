//! Ingestion Pipeline (§4.8, supplemented): validate a memo, run the Document Builder, and hand
//! the resulting node set to the Index Manager.

use std::sync::Arc;

use thiserror::Error;

use crate::builder::{self, BuilderConfig, BuilderError};
use crate::caption::CaptionProvider;
use crate::config::Config;
use crate::index_manager::{IndexManager, IndexManagerError, UpsertOutcome};
use crate::model::Memo;

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum IngestError {
    #[error("memo failed validation: {0}")]
    Validation(String),
    #[error(transparent)]
    Builder(#[from] BuilderError),
    #[error(transparent)]
    Index(#[from] IndexManagerError),
}

/// Counts of nodes written per store by one [`IngestionPipeline::ingest`] call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IngestOutcome {
    pub text_nodes: usize,
    pub image_nodes: usize,
}

impl From<UpsertOutcome> for IngestOutcome {
    fn from(outcome: UpsertOutcome) -> Self {
        Self { text_nodes: outcome.text_nodes, image_nodes: outcome.image_nodes }
    }
}

fn validate(memo: &Memo) -> Result<(), IngestError> {
    if memo.name.trim().is_empty() {
        return Err(IngestError::Validation("memo name must not be empty".to_string()));
    }
    if memo.creator.trim().is_empty() {
        return Err(IngestError::Validation("memo creator must not be empty".to_string()));
    }
    Ok(())
}

/// Wires the Document Builder to the Index Manager behind one `ingest(memo)` call (§4.8).
pub struct IngestionPipeline {
    index: Arc<IndexManager>,
    builder_config: BuilderConfig,
    caption_provider: Option<Arc<dyn CaptionProvider>>,
    http_client: reqwest::Client,
}

impl IngestionPipeline {
    pub fn new(
        index: Arc<IndexManager>,
        config: &Config,
        caption_provider: Option<Arc<dyn CaptionProvider>>,
        http_client: reqwest::Client,
    ) -> Self {
        Self { index, builder_config: BuilderConfig::from(config), caption_provider, http_client }
    }

    /// Validates `memo`, builds its node set (§4.1), and upserts it into the index (§4.5).
    /// A failure partway (other than caption failures, which the builder already absorbs with a
    /// filename fallback) is propagated as-is; the pipeline adds no retry logic of its own.
    pub async fn ingest(&self, memo: &Memo) -> Result<IngestOutcome, IngestError> {
        validate(memo)?;

        let span = tracing::info_span!("ingest_memo", memo_uid = memo.uid());
        let _guard = span.enter();

        let built = builder::build(memo, &self.builder_config, self.caption_provider.as_deref(), &self.http_client).await?;
        let outcome = self.index.upsert(memo, built).await?;

        tracing::debug!(
            memo_uid = memo.uid(),
            text_nodes = outcome.text_nodes,
            image_nodes = outcome.image_nodes,
            "ingested memo"
        );
        Ok(outcome.into())
    }

    /// Removes every node belonging to `memo_uid`, mirroring [`IngestionPipeline::ingest`]'s
    /// reach into the Index Manager for the deletion side of the same contract.
    pub async fn remove(&self, memo_uid: &str) -> Result<(), IngestError> {
        self.index.delete(memo_uid).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embeddings::{EmbeddingAdapter, EmbeddingError};
    use crate::model::{Attachment, MemoProperty};
    use async_trait::async_trait;
    use std::collections::BTreeMap;

    struct FakeEmbeddingAdapter;

    fn fake_vector(seed: &str) -> Vec<f32> {
        let mut v = vec![0.0f32; crate::vector_store::DEFAULT_DIMENSIONS];
        for (i, b) in seed.bytes().enumerate() {
            v[i % v.len()] += b as f32;
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

    fn test_memo(name: &str, creator: &str, content: &str) -> Memo {
        Memo {
            name: name.to_string(),
            creator: creator.to_string(),
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
            extra: BTreeMap::new(),
        }
    }

    async fn pipeline_with_tempdir() -> (IngestionPipeline, Arc<IndexManager>, tempfile::TempDir) {
        let tmp = tempfile::tempdir().unwrap();
        let mut config = Config::default();
        config.index_base_dir = tmp.path().to_path_buf();
        let index = Arc::new(IndexManager::new(&config, Arc::new(FakeEmbeddingAdapter)).unwrap());
        let pipeline = IngestionPipeline::new(index.clone(), &config, None, reqwest::Client::new());
        (pipeline, index, tmp)
    }

    #[tokio::test]
    async fn ingest_rejects_blank_name() {
        let (pipeline, _index, _tmp) = pipeline_with_tempdir().await;
        let memo = test_memo("", "users/1", "hello");
        let result = pipeline.ingest(&memo).await;
        assert!(matches!(result, Err(IngestError::Validation(_))));
    }

    #[tokio::test]
    async fn ingest_then_remove_round_trips() {
        let (pipeline, index, _tmp) = pipeline_with_tempdir().await;
        let memo = test_memo("memos/A", "users/1", "hello world");

        let outcome = pipeline.ingest(&memo).await.unwrap();
        assert_eq!(outcome.text_nodes, 1);
        assert!(index.get("memos/A").await.is_some());

        pipeline.remove("memos/A").await.unwrap();
        assert!(index.get("memos/A").await.is_none());
    }
}
