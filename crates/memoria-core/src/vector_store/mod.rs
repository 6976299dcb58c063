//! Vector Store Adapter (§4.3): a persistent, named collection with upsert / delete-by-id /
//! kNN-query / full-scan, backed by an HNSW index plus a JSON payload sidecar.

mod index;

pub use index::{VectorIndexConfig, VectorIndexStats, VectorSearchError, DEFAULT_DIMENSIONS};

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use self::index::VectorIndex;

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StoreError {
    #[error("vector index error: {0}")]
    Index(#[from] VectorSearchError),
    #[error("failed to persist collection payload: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to (de)serialize collection payload: {0}")]
    Serde(#[from] serde_json::Error),
}

/// The text and metadata carried alongside a node's vector; what `query`/`scan` hand back
/// besides the id and score.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Payload {
    pub text: String,
    pub metadata: BTreeMap<String, String>,
}

/// One result row from [`Collection::query`] or [`Collection::scan`].
#[derive(Debug, Clone)]
pub struct StoredNode {
    pub node_id: String,
    pub score: f32,
    pub text: String,
    pub metadata: BTreeMap<String, String>,
}

/// A persistent, named vector collection.
///
/// The HNSW index only stores `(key, vector)`, so `Collection` keeps the `(node_id, Payload)`
/// map alongside it, loaded and saved as a single JSON sidecar file written with the same
/// write-temp-then-rename discipline as the manifest (§6).
pub struct Collection {
    name: String,
    index: VectorIndex,
    payloads: BTreeMap<String, Payload>,
}

impl Collection {
    pub fn new(name: impl Into<String>, config: VectorIndexConfig) -> Result<Self, StoreError> {
        Ok(Self {
            name: name.into(),
            index: VectorIndex::with_config(config)?,
            payloads: BTreeMap::new(),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn len(&self) -> usize {
        self.payloads.len()
    }

    pub fn is_empty(&self) -> bool {
        self.payloads.is_empty()
    }

    /// Inserts or replaces the vector, text, and metadata for `node_id`.
    pub fn upsert(
        &mut self,
        node_id: &str,
        vector: &[f32],
        text: String,
        metadata: BTreeMap<String, String>,
    ) -> Result<(), StoreError> {
        self.index.add(node_id, vector)?;
        self.payloads.insert(node_id.to_string(), Payload { text, metadata });
        Ok(())
    }

    /// Removes `node_id` if present. Returns whether it was present.
    pub fn delete(&mut self, node_id: &str) -> Result<bool, StoreError> {
        let removed_payload = self.payloads.remove(node_id).is_some();
        let removed_index = self.index.remove(node_id)?;
        Ok(removed_payload || removed_index)
    }

    pub fn contains(&self, node_id: &str) -> bool {
        self.payloads.contains_key(node_id)
    }

    /// kNN search, joining the HNSW result ids against the payload sidecar. Ids whose payload
    /// has gone missing (should not happen outside a crash-window repair scenario) are skipped.
    pub fn query(&self, vector: &[f32], k: usize) -> Result<Vec<StoredNode>, StoreError> {
        let hits = self.index.search(vector, k)?;
        Ok(hits
            .into_iter()
            .filter_map(|(node_id, score)| {
                let payload = self.payloads.get(&node_id)?;
                Some(StoredNode {
                    node_id,
                    score,
                    text: payload.text.clone(),
                    metadata: payload.metadata.clone(),
                })
            })
            .collect())
    }

    /// Iterates every node currently stored, in no particular order. Used to build the BM25
    /// corpus (§4.4) and during a full rebuild.
    pub fn scan(&self) -> impl Iterator<Item = StoredNode> + '_ {
        self.payloads.iter().map(|(node_id, payload)| StoredNode {
            node_id: node_id.clone(),
            score: 0.0,
            text: payload.text.clone(),
            metadata: payload.metadata.clone(),
        })
    }

    /// Persists the HNSW index (`<dir>/<name>.usearch`) and the payload sidecar
    /// (`<dir>/<name>.payload.json`), the latter via write-temp-then-rename.
    pub fn save(&self, dir: &Path) -> Result<(), StoreError> {
        fs::create_dir_all(dir)?;
        let index_path = dir.join(format!("{}.usearch", self.name));
        self.index.save(&index_path)?;

        let payload_path = self.payload_path(dir);
        let temp_path = payload_path.with_extension("tmp");
        let serialized = serde_json::to_string_pretty(&self.payloads)?;
        fs::write(&temp_path, serialized)?;
        fs::rename(&temp_path, &payload_path)?;

        Ok(())
    }

    /// Loads a collection previously written by [`Collection::save`]. Returns a fresh empty
    /// collection if no files exist yet at `dir` for `name`.
    pub fn load(dir: &Path, name: impl Into<String>, config: VectorIndexConfig) -> Result<Self, StoreError> {
        let name = name.into();
        let index_path = dir.join(format!("{}.usearch", name));
        let payload_path = dir.join(format!("{name}.payload.json"));

        if !index_path.exists() || !payload_path.exists() {
            return Self::new(name, config);
        }

        let index = VectorIndex::load(&index_path, config)?;
        let payload_json = fs::read_to_string(&payload_path)?;
        let payloads: BTreeMap<String, Payload> = serde_json::from_str(&payload_json)?;

        Ok(Self { name, index, payloads })
    }

    pub fn stats(&self) -> VectorIndexStats {
        self.index.stats()
    }

    fn payload_path(&self, dir: &Path) -> PathBuf {
        dir.join(format!("{}.payload.json", self.name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vector(seed: f32) -> Vec<f32> {
        (0..DEFAULT_DIMENSIONS).map(|i| ((i as f32 + seed) / DEFAULT_DIMENSIONS as f32).sin()).collect()
    }

    #[test]
    fn upsert_then_query_roundtrips_payload() {
        let mut collection = Collection::new("memo_text_test", VectorIndexConfig::default()).unwrap();
        let mut metadata = BTreeMap::new();
        metadata.insert("memo_uid".to_string(), "memos/A".to_string());

        collection.upsert("memo:memos/A", &vector(1.0), "hello world".to_string(), metadata).unwrap();

        let results = collection.query(&vector(1.0), 5).unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].node_id, "memo:memos/A");
        assert_eq!(results[0].text, "hello world");
        assert_eq!(results[0].metadata.get("memo_uid").map(String::as_str), Some("memos/A"));
    }

    #[test]
    fn delete_removes_node() {
        let mut collection = Collection::new("memo_text_test", VectorIndexConfig::default()).unwrap();
        collection.upsert("memo:memos/A", &vector(1.0), "hello".to_string(), BTreeMap::new()).unwrap();
        assert!(collection.delete("memo:memos/A").unwrap());
        assert!(!collection.contains("memo:memos/A"));
        assert!(!collection.delete("memo:memos/A").unwrap());
    }

    #[test]
    fn save_then_load_roundtrips() {
        let tmp = tempfile::tempdir().unwrap();
        let mut collection = Collection::new("memo_text_test", VectorIndexConfig::default()).unwrap();
        let mut metadata = BTreeMap::new();
        metadata.insert("memo_uid".to_string(), "memos/A".to_string());
        collection.upsert("memo:memos/A", &vector(1.0), "hello world".to_string(), metadata).unwrap();
        collection.save(tmp.path()).unwrap();

        let loaded = Collection::load(tmp.path(), "memo_text_test", VectorIndexConfig::default()).unwrap();
        assert_eq!(loaded.len(), 1);
        let results = loaded.query(&vector(1.0), 5).unwrap();
        assert_eq!(results[0].node_id, "memo:memos/A");
    }

    #[test]
    fn scan_yields_every_node() {
        let mut collection = Collection::new("memo_text_test", VectorIndexConfig::default()).unwrap();
        collection.upsert("memo:memos/A", &vector(1.0), "a".to_string(), BTreeMap::new()).unwrap();
        collection.upsert("memo:memos/B", &vector(2.0), "b".to_string(), BTreeMap::new()).unwrap();
        let ids: Vec<_> = collection.scan().map(|n| n.node_id).collect();
        assert_eq!(ids.len(), 2);
    }
}
