//! Index Manager (§4.5): the single point of mutation for the text store, image store, and
//! BM25 index, coordinated against one persisted [`Manifest`].
//!
//! The vector stores are caches reconstructible from nodes; the manifest is the source of
//! truth for what belongs to which memo (§3). Every upsert is delete-then-insert of the whole
//! memo's node set — there is no partial edit.

use std::collections::{BTreeMap, HashMap};
use std::path::PathBuf;
use std::sync::Arc;

use thiserror::Error;
use tokio::sync::{Mutex, RwLock};

use crate::bm25::{Bm25Error, Bm25Params, DefaultTokenizer, InvertedIndex};
use crate::builder::BuiltDocuments;
use crate::config::Config;
use crate::embeddings::{matryoshka_truncate, sanitize_model_name, EmbeddingAdapter, EmbeddingError};
use crate::manifest::{Manifest, ManifestError, MemoEntry};
use crate::model::Memo;
use crate::vector_store::{Collection, StoreError, StoredNode, VectorIndexConfig, DEFAULT_DIMENSIONS};

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum IndexManagerError {
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Manifest(#[from] ManifestError),
    #[error(transparent)]
    Embedding(#[from] EmbeddingError),
    #[error(transparent)]
    Bm25(#[from] Bm25Error),
}

/// Counts returned from a successful [`IndexManager::upsert`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UpsertOutcome {
    pub text_nodes: usize,
    pub image_nodes: usize,
}

/// Counts returned from a successful [`IndexManager::delete`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DeleteOutcome {
    pub text_deleted: usize,
    pub image_deleted: usize,
}

/// What [`IndexManager::get`] reports about one memo.
#[derive(Debug, Clone)]
pub struct MemoInfo {
    pub memo_uid: String,
    pub text_node_ids: Vec<String>,
    pub image_node_ids: Vec<String>,
}

/// What [`IndexManager::status`] reports about the whole index.
#[derive(Debug, Clone)]
pub struct IndexStatus {
    pub memo_count: usize,
    pub text_node_count: usize,
    pub image_node_count: usize,
    pub bm25_ready: bool,
    pub bm25_stale: bool,
    pub text_collection_name: String,
    pub image_collection_name: String,
    pub index_base_dir: PathBuf,
}

/// A matching `(node_id, score, text, metadata)` row, shared between the text-store, image-store,
/// and BM25 query paths so strategies can treat all three sources uniformly.
#[derive(Debug, Clone)]
pub struct Hit {
    pub node_id: String,
    pub score: f32,
    pub text: String,
    pub metadata: BTreeMap<String, String>,
}

impl From<StoredNode> for Hit {
    fn from(node: StoredNode) -> Self {
        Self { node_id: node.node_id, score: node.score, text: node.text, metadata: node.metadata }
    }
}

/// Owns the text store, image store, BM25 index, manifest, and the embedding adapter; the
/// single point of mutation for all three indexes (§4.5).
///
/// Concurrency (§4.5 supplement, §9 decision): upserts of the same `memo_uid` are serialized by
/// a per-uid striped `tokio::sync::Mutex`; the manifest's read-modify-write-persist sequence is
/// additionally serialized behind one coarse lock, matching "the manifest file write must be
/// serialized" (§5).
pub struct IndexManager {
    text_dir: PathBuf,
    image_dir: PathBuf,
    manifest_path: PathBuf,
    text_collection_name: String,
    image_collection_name: String,

    embedding: Arc<dyn EmbeddingAdapter>,

    text_store: RwLock<Collection>,
    image_store: RwLock<Collection>,
    bm25: RwLock<InvertedIndex>,
    bm25_stale: std::sync::atomic::AtomicBool,
    manifest: RwLock<Manifest>,

    manifest_write_lock: Mutex<()>,
    uid_locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl IndexManager {
    /// Loads (or creates) the text store, image store, and manifest at `config.index_base_dir`.
    /// The BM25 index starts empty and stale; call [`IndexManager::rebuild_bm25`] (or let a
    /// `bm25*` strategy trigger it lazily) before relying on sparse search (§9 decision: c).
    pub fn new(config: &Config, embedding: Arc<dyn EmbeddingAdapter>) -> Result<Self, IndexManagerError> {
        let text_dir = config.text_store_dir();
        let image_dir = config.image_store_dir();
        let manifest_path = config.manifest_path();

        let text_collection_name = format!("memo_text_{}", sanitize_model_name(embedding.text_model_name()));
        let image_collection_name = format!("memo_image_{}", sanitize_model_name(embedding.image_model_name()));

        let vector_config = VectorIndexConfig::default();
        let text_store = Collection::load(&text_dir, text_collection_name.clone(), vector_config.clone())?;
        let image_store = Collection::load(&image_dir, image_collection_name.clone(), vector_config)?;
        let manifest = Manifest::load(&manifest_path)?;

        Ok(Self {
            text_dir,
            image_dir,
            manifest_path,
            text_collection_name,
            image_collection_name,
            embedding,
            text_store: RwLock::new(text_store),
            image_store: RwLock::new(image_store),
            bm25: RwLock::new(InvertedIndex::new(Box::new(DefaultTokenizer), Bm25Params::default())),
            bm25_stale: std::sync::atomic::AtomicBool::new(true),
            manifest: RwLock::new(manifest),
            manifest_write_lock: Mutex::new(()),
            uid_locks: Mutex::new(HashMap::new()),
        })
    }

    async fn lock_for_uid(&self, memo_uid: &str) -> Arc<Mutex<()>> {
        let mut locks = self.uid_locks.lock().await;
        locks.entry(memo_uid.to_string()).or_insert_with(|| Arc::new(Mutex::new(()))).clone()
    }

    /// Replaces every node belonging to `memo.uid()` with `built`'s nodes (§4.5 `upsert`).
    pub async fn upsert(&self, memo: &Memo, built: BuiltDocuments) -> Result<UpsertOutcome, IndexManagerError> {
        let memo_uid = memo.uid().to_string();
        let uid_lock = self.lock_for_uid(&memo_uid).await;
        let _guard = uid_lock.lock().await;

        // Step 1: delete the previous node set, if any. Per-id failures are warnings, not fatal.
        if let Some(previous) = self.manifest.read().await.get(&memo_uid).cloned() {
            let mut text_store = self.text_store.write().await;
            for node_id in &previous.text {
                if let Err(e) = text_store.delete(node_id) {
                    tracing::warn!(memo_uid, node_id, error = %e, "failed to delete previous text node during upsert");
                }
            }
            drop(text_store);

            let mut image_store = self.image_store.write().await;
            for node_id in &previous.image {
                if let Err(e) = image_store.delete(node_id) {
                    tracing::warn!(memo_uid, node_id, error = %e, "failed to delete previous image node during upsert");
                }
            }
        }

        // Step 2: embed and insert the new node set. Embedding failures are fatal (§4.5).
        let mut text_inputs: Vec<&str> = vec![built.base_text.text.as_str()];
        for node in &built.attachment_texts {
            text_inputs.push(node.text.as_str());
        }
        let text_texts: Vec<String> = text_inputs.iter().map(|s| s.to_string()).collect();
        let text_vectors = if text_texts.is_empty() {
            Vec::new()
        } else {
            self.embedding
                .embed_text_batch(&text_texts)
                .await?
                .into_iter()
                .map(|v| matryoshka_truncate(v, DEFAULT_DIMENSIONS))
                .collect()
        };

        let image_payloads: Vec<String> =
            built.images.iter().filter_map(|n| n.image_payload.clone()).collect();
        let image_vectors = if image_payloads.is_empty() {
            Vec::new()
        } else {
            self.embedding
                .embed_image_batch(&image_payloads)
                .await?
                .into_iter()
                .map(|v| matryoshka_truncate(v, DEFAULT_DIMENSIONS))
                .collect()
        };

        let mut text_ids = Vec::with_capacity(text_texts.len());
        {
            let mut text_store = self.text_store.write().await;
            let mut all_text_nodes = vec![&built.base_text];
            all_text_nodes.extend(built.attachment_texts.iter());
            for (node, vector) in all_text_nodes.into_iter().zip(text_vectors.into_iter()) {
                text_store.upsert(&node.id, &vector, node.text.clone(), node.metadata.clone())?;
                text_ids.push(node.id.clone());
            }
            text_store.save(&self.text_dir)?;
        }

        let mut image_ids = Vec::with_capacity(built.images.len());
        {
            let mut image_store = self.image_store.write().await;
            for (node, vector) in built.images.iter().zip(image_vectors.into_iter()) {
                image_store.upsert(&node.id, &vector, node.text.clone(), node.metadata.clone())?;
                image_ids.push(node.id.clone());
            }
            image_store.save(&self.image_dir)?;
        }

        // Step 3+4: overwrite and persist the manifest entry (serialized, write-temp-then-rename).
        let outcome = UpsertOutcome { text_nodes: text_ids.len(), image_nodes: image_ids.len() };
        {
            let _manifest_guard = self.manifest_write_lock.lock().await;
            let mut manifest = self.manifest.write().await;
            manifest.set(memo_uid.clone(), MemoEntry { text: text_ids, image: image_ids });
            manifest.save(&self.manifest_path)?;
        }

        // Step 5: BM25 invalidation.
        self.bm25_stale.store(true, std::sync::atomic::Ordering::SeqCst);

        tracing::debug!(memo_uid, text_nodes = outcome.text_nodes, image_nodes = outcome.image_nodes, "upserted memo");
        Ok(outcome)
    }

    /// Deletes every node belonging to `memo_uid`; the manifest entry is removed only after both
    /// store deletions have been attempted (§4.5 `delete`).
    pub async fn delete(&self, memo_uid: &str) -> Result<DeleteOutcome, IndexManagerError> {
        let uid_lock = self.lock_for_uid(memo_uid).await;
        let _guard = uid_lock.lock().await;

        let Some(entry) = self.manifest.read().await.get(memo_uid).cloned() else {
            return Ok(DeleteOutcome::default());
        };

        let mut text_deleted = 0;
        {
            let mut text_store = self.text_store.write().await;
            for node_id in &entry.text {
                match text_store.delete(node_id) {
                    Ok(true) => text_deleted += 1,
                    Ok(false) => {}
                    Err(e) => tracing::warn!(memo_uid, node_id, error = %e, "failed to delete text node"),
                }
            }
            text_store.save(&self.text_dir)?;
        }

        let mut image_deleted = 0;
        {
            let mut image_store = self.image_store.write().await;
            for node_id in &entry.image {
                match image_store.delete(node_id) {
                    Ok(true) => image_deleted += 1,
                    Ok(false) => {}
                    Err(e) => tracing::warn!(memo_uid, node_id, error = %e, "failed to delete image node"),
                }
            }
            image_store.save(&self.image_dir)?;
        }

        {
            let _manifest_guard = self.manifest_write_lock.lock().await;
            let mut manifest = self.manifest.write().await;
            manifest.remove(memo_uid);
            manifest.save(&self.manifest_path)?;
        }

        self.bm25_stale.store(true, std::sync::atomic::Ordering::SeqCst);
        tracing::debug!(memo_uid, text_deleted, image_deleted, "deleted memo");
        Ok(DeleteOutcome { text_deleted, image_deleted })
    }

    pub async fn get(&self, memo_uid: &str) -> Option<MemoInfo> {
        let manifest = self.manifest.read().await;
        manifest.get(memo_uid).map(|entry| MemoInfo {
            memo_uid: memo_uid.to_string(),
            text_node_ids: entry.text.clone(),
            image_node_ids: entry.image.clone(),
        })
    }

    pub async fn status(&self) -> IndexStatus {
        let manifest = self.manifest.read().await;
        let text_store = self.text_store.read().await;
        let image_store = self.image_store.read().await;
        let bm25 = self.bm25.read().await;
        IndexStatus {
            memo_count: manifest.memo_count(),
            text_node_count: text_store.len(),
            image_node_count: image_store.len(),
            bm25_ready: bm25.is_ready(),
            bm25_stale: self.bm25_stale.load(std::sync::atomic::Ordering::SeqCst),
            text_collection_name: self.text_collection_name.clone(),
            image_collection_name: self.image_collection_name.clone(),
            index_base_dir: self.text_dir.parent().map(std::path::Path::to_path_buf).unwrap_or_default(),
        }
    }

    /// Rebuilds the BM25 corpus in bulk from a full scan of the text store (§4.4, §9 decision).
    /// `base_text` and `attachment_text` nodes are both indexed; `image` nodes never reach the
    /// text store so they are implicitly excluded (invariant 5, §3).
    pub async fn rebuild_bm25(&self) -> Result<(), IndexManagerError> {
        let text_store = self.text_store.read().await;
        let nodes: Vec<(String, String, BTreeMap<String, String>)> =
            text_store.scan().map(|n| (n.node_id, n.text, n.metadata)).collect();
        drop(text_store);

        let mut bm25 = self.bm25.write().await;
        bm25.build(nodes);
        self.bm25_stale.store(false, std::sync::atomic::Ordering::SeqCst);
        tracing::debug!(corpus_size = bm25.len(), "rebuilt bm25 index");
        Ok(())
    }

    /// Ensures the BM25 index reflects the current text store before a `bm25*` strategy runs,
    /// rebuilding lazily if a prior upsert/delete marked it stale (§9 decision: option c).
    pub async fn ensure_bm25_fresh(&self) -> Result<(), IndexManagerError> {
        if self.bm25_stale.load(std::sync::atomic::Ordering::SeqCst) {
            self.rebuild_bm25().await?;
        }
        Ok(())
    }

    pub fn embedding(&self) -> &Arc<dyn EmbeddingAdapter> {
        &self.embedding
    }

    pub async fn embed_query(&self, text: &str) -> Result<Vec<f32>, IndexManagerError> {
        let vector = self.embedding.embed_text(text).await?;
        Ok(matryoshka_truncate(vector, DEFAULT_DIMENSIONS))
    }

    pub async fn query_text(&self, vector: &[f32], k: usize) -> Result<Vec<Hit>, IndexManagerError> {
        let store = self.text_store.read().await;
        Ok(store.query(vector, k)?.into_iter().map(Hit::from).collect())
    }

    pub async fn query_image(&self, vector: &[f32], k: usize) -> Result<Vec<Hit>, IndexManagerError> {
        let store = self.image_store.read().await;
        Ok(store.query(vector, k)?.into_iter().map(Hit::from).collect())
    }

    pub async fn query_bm25(&self, text: &str, k: usize) -> Result<Vec<Hit>, IndexManagerError> {
        self.ensure_bm25_fresh().await?;
        let bm25 = self.bm25.read().await;
        if !bm25.is_ready() {
            return Ok(Vec::new());
        }
        let hits = bm25.query(text, k)?;
        Ok(hits.into_iter().map(|(node_id, score, text, metadata)| Hit { node_id, score, text, metadata }).collect())
    }
}
