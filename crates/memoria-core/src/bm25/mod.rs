//! BM25 Index (§4.4): tokenize and build a sparse inverted index over the text store's nodes.
//!
//! There is no incremental update here — the corpus is rebuilt in bulk from a full scan of the
//! text vector store (§9 "BM25 freshness"). Ranking uses the standard Okapi BM25 formula with
//! configurable `k1`/`b`.

mod tokenizer;

pub use tokenizer::{whitespace_token_count, DefaultTokenizer, Tokenizer};

use std::collections::{BTreeMap, HashMap};

use thiserror::Error;

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Bm25Error {
    #[error("bm25 index has not been built yet")]
    NotReady,
}

/// Okapi BM25 tuning parameters. `k1` controls term-frequency saturation, `b` controls document
/// length normalization. `1.2`/`0.75` are the conventional defaults.
#[derive(Debug, Clone, Copy)]
pub struct Bm25Params {
    pub k1: f32,
    pub b: f32,
}

impl Default for Bm25Params {
    fn default() -> Self {
        Self { k1: 1.2, b: 0.75 }
    }
}

struct Document {
    node_id: String,
    text: String,
    metadata: BTreeMap<String, String>,
    length: usize,
    term_counts: HashMap<String, u32>,
}

/// A sparse inverted index over the text store's nodes.
///
/// `build` replaces the whole corpus; there is no per-node incremental insert, matching the
/// upstream design's bulk-rebuild-only BM25 (§4.4, §9).
pub struct InvertedIndex {
    tokenizer: Box<dyn Tokenizer>,
    params: Bm25Params,
    documents: Vec<Document>,
    postings: HashMap<String, Vec<usize>>,
    avg_doc_length: f32,
}

impl InvertedIndex {
    pub fn new(tokenizer: Box<dyn Tokenizer>, params: Bm25Params) -> Self {
        Self {
            tokenizer,
            params,
            documents: Vec::new(),
            postings: HashMap::new(),
            avg_doc_length: 0.0,
        }
    }

    pub fn tokenizer_identity(&self) -> &'static str {
        self.tokenizer.identity()
    }

    pub fn is_ready(&self) -> bool {
        !self.documents.is_empty()
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    /// Rebuilds the entire corpus from `nodes`: `(node_id, text, metadata)` triples, typically
    /// the output of a text-store [`crate::vector_store::Collection::scan`].
    pub fn build<I>(&mut self, nodes: I)
    where
        I: IntoIterator<Item = (String, String, BTreeMap<String, String>)>,
    {
        self.documents.clear();
        self.postings.clear();

        let mut total_length: usize = 0;
        for (node_id, text, metadata) in nodes {
            let tokens = self.tokenizer.tokenize(&text);
            let length = tokens.len();
            total_length += length;

            let mut term_counts: HashMap<String, u32> = HashMap::new();
            for token in tokens {
                *term_counts.entry(token).or_insert(0) += 1;
            }

            let doc_index = self.documents.len();
            for term in term_counts.keys() {
                self.postings.entry(term.clone()).or_default().push(doc_index);
            }

            self.documents.push(Document { node_id, text, metadata, length, term_counts });
        }

        self.avg_doc_length = if self.documents.is_empty() {
            0.0
        } else {
            total_length as f32 / self.documents.len() as f32
        };
    }

    /// Scores every document against `text` using Okapi BM25, returning the top `k` by raw
    /// score descending. `k` is clamped to the corpus size. Returned scores are unbounded
    /// positive raw BM25 scores, not normalized.
    pub fn query(&self, text: &str, k: usize) -> Result<Vec<(String, f32, String, BTreeMap<String, String>)>, Bm25Error> {
        if !self.is_ready() {
            return Err(Bm25Error::NotReady);
        }

        let k = k.min(self.documents.len());
        let query_terms = self.tokenizer.tokenize(text);
        if query_terms.is_empty() || k == 0 {
            return Ok(Vec::new());
        }

        let n = self.documents.len() as f32;
        let mut scores: HashMap<usize, f32> = HashMap::new();

        for term in &query_terms {
            let Some(postings) = self.postings.get(term) else { continue };
            let doc_freq = postings.len() as f32;
            let idf = ((n - doc_freq + 0.5) / (doc_freq + 0.5) + 1.0).ln();

            for &doc_index in postings {
                let doc = &self.documents[doc_index];
                let term_freq = *doc.term_counts.get(term).unwrap_or(&0) as f32;
                let length_norm = 1.0 - self.params.b + self.params.b * (doc.length as f32 / self.avg_doc_length);
                let score = idf * (term_freq * (self.params.k1 + 1.0)) / (term_freq + self.params.k1 * length_norm);
                *scores.entry(doc_index).or_insert(0.0) += score;
            }
        }

        let mut ranked: Vec<(usize, f32)> = scores.into_iter().collect();
        ranked.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
        ranked.truncate(k);

        Ok(ranked
            .into_iter()
            .map(|(doc_index, score)| {
                let doc = &self.documents[doc_index];
                (doc.node_id.clone(), score, doc.text.clone(), doc.metadata.clone())
            })
            .collect())
    }
}
