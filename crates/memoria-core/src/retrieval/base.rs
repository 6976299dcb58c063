//! The uniform query/result shapes every retrieval strategy accepts and returns (§4.7).

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// A retrieval request, common to all ten strategies.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Query {
    pub text: String,
    pub top_k: usize,
    #[serde(default)]
    pub min_score: f32,
    #[serde(default)]
    pub filters: BTreeMap<String, String>,
}

impl Query {
    pub fn new(text: impl Into<String>, top_k: usize) -> Self {
        Self { text: text.into(), top_k, min_score: 0.0, filters: BTreeMap::new() }
    }

    pub fn with_min_score(mut self, min_score: f32) -> Self {
        self.min_score = min_score;
        self
    }

    pub fn with_filter(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.filters.insert(key.into(), value.into());
        self
    }
}

/// One ranked hit. `source` names the sub-strategy that produced it (`"text"`, `"image"`,
/// `"bm25"`, `"fusion"`, …), which is useful when a merge strategy interleaves several origins.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrievalResult {
    pub node_id: String,
    pub memo_uid: String,
    pub score: f32,
    pub content: String,
    pub metadata: BTreeMap<String, String>,
    pub source: String,
}

/// Drops results whose metadata does not match every `(key, value)` pair in `filters`. A node
/// missing a filtered key is treated as non-matching, never as a wildcard match (§4.7).
pub fn filter_results(results: Vec<RetrievalResult>, filters: &BTreeMap<String, String>) -> Vec<RetrievalResult> {
    if filters.is_empty() {
        return results;
    }
    results
        .into_iter()
        .filter(|r| filters.iter().all(|(k, v)| r.metadata.get(k) == Some(v)))
        .collect()
}

pub fn drop_below_min_score(results: Vec<RetrievalResult>, min_score: f32) -> Vec<RetrievalResult> {
    results.into_iter().filter(|r| r.score >= min_score).collect()
}

/// Among results sharing a `memo_uid`, keeps the highest-scoring one; the output is re-sorted
/// by score descending and contains each `memo_uid` at most once (§4.7, invariant 6).
pub fn dedup_by_memo(results: Vec<RetrievalResult>) -> Vec<RetrievalResult> {
    let mut best: BTreeMap<String, RetrievalResult> = BTreeMap::new();
    for result in results {
        best.entry(result.memo_uid.clone())
            .and_modify(|existing| {
                if result.score > existing.score {
                    *existing = result.clone();
                }
            })
            .or_insert(result);
    }
    let mut deduped: Vec<RetrievalResult> = best.into_values().collect();
    deduped.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
    deduped
}

/// The common post-processing pipeline applied by every strategy unless documented otherwise
/// (§4.7): metadata filter, min-score drop, dedup-by-memo, truncate to `top_k`.
pub fn post_process(results: Vec<RetrievalResult>, query: &Query) -> Vec<RetrievalResult> {
    let results = filter_results(results, &query.filters);
    let results = drop_below_min_score(results, query.min_score);
    let mut results = dedup_by_memo(results);
    results.truncate(query.top_k);
    results
}
