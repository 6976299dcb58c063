//! Score normalization and fusion (§4.7): Reciprocal Rank Fusion, min-max normalization, and
//! the adaptive-alpha heuristic.

use super::base::RetrievalResult;

/// Reciprocal Rank Fusion. Each input list `L_i` carries a weight `w_i`; a document at rank `r`
/// (0-based) within `L_i` contributes `w_i / (k_rrf + r + 1)` to its fused score. The fused
/// document keeps the metadata/content of its first-seen appearance. No dedup-by-memo is
/// needed afterward since fusion is keyed on `memo_uid` (§4.7, invariant 7).
pub fn reciprocal_rank_fusion(lists: &[(Vec<RetrievalResult>, f32)], k_rrf: f32, source: &str) -> Vec<RetrievalResult> {
    use std::collections::HashMap;

    let mut fused: HashMap<String, (f32, RetrievalResult)> = HashMap::new();

    for (list, weight) in lists {
        for (rank, item) in list.iter().enumerate() {
            let contribution = weight / (k_rrf + rank as f32 + 1.0);
            fused
                .entry(item.memo_uid.clone())
                .and_modify(|(score, _)| *score += contribution)
                .or_insert_with(|| {
                    let mut first_seen = item.clone();
                    first_seen.source = source.to_string();
                    (contribution, first_seen)
                });
        }
    }

    let mut results: Vec<RetrievalResult> = fused
        .into_values()
        .map(|(score, mut item)| {
            item.score = score;
            item
        })
        .collect();
    results.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
    results
}

/// Min-max normalizes `scores` in place of copying: if every score is equal, all become `1.0`;
/// otherwise each maps to `(s - min) / (max - min)`, landing in `[0, 1]` with at least one 0.0
/// and one 1.0 (§4.7, invariant 8).
pub fn min_max_normalize(scores: &[f32]) -> Vec<f32> {
    if scores.is_empty() {
        return Vec::new();
    }
    let min = scores.iter().cloned().fold(f32::INFINITY, f32::min);
    let max = scores.iter().cloned().fold(f32::NEG_INFINITY, f32::max);
    if (max - min).abs() < f32::EPSILON {
        return vec![1.0; scores.len()];
    }
    scores.iter().map(|s| (s - min) / (max - min)).collect()
}

const ADAPTIVE_SPECIAL_CHARS: &str = "{}[]()<>=/\\|@#$%^&*`~";

/// Derives the blend parameter α for `bm25_vector_alpha` at request time from query features
/// (§4.7 "Adaptive α"). Base `0.5`; short queries (< 2 whitespace tokens) favor BM25 (α -= 0.2),
/// long queries (≥8 tokens) favor vector search (α += 0.15); code/path-like characters push
/// toward BM25 (α -= 0.25); quote characters push further toward BM25 (α -= 0.3). Clamped to
/// `[0.1, 0.9]`.
pub fn compute_adaptive_alpha(query_text: &str) -> f32 {
    let mut alpha: f32 = 0.5;

    let token_count = query_text.split_whitespace().count();
    if token_count < 2 {
        alpha -= 0.2;
    } else if token_count >= 8 {
        alpha += 0.15;
    }

    if query_text.chars().any(|c| ADAPTIVE_SPECIAL_CHARS.contains(c)) {
        alpha -= 0.25;
    }

    if query_text.contains('"') || query_text.contains('\'') {
        alpha -= 0.3;
    }

    alpha.clamp(0.1, 0.9)
}

/// `s = alpha * s_v + (1 - alpha) * s_b`, alpha clamped to `[0, 1]` defensively even though
/// callers already clamp it to `[0.1, 0.9]` upstream.
pub fn alpha_weighted_fusion(vector_score: f32, bm25_score: f32, alpha: f32) -> f32 {
    let alpha = alpha.clamp(0.0, 1.0);
    alpha * vector_score + (1.0 - alpha) * bm25_score
}

/// Score-based fusion used by `weighted`, `bm25_vector_alpha`, and `adaptive`: each input list is
/// min-max normalized independently, then combined keyed on `memo_uid` as `sum(weight_i *
/// normalized_score_i)`. A `memo_uid` missing from one list contributes `0` for that list,
/// matching the additive `s = w_t*s_t + w_i*s_i` / `s = alpha*s_v + (1-alpha)*s_b` formulas
/// (§4.7). The fused result keeps the metadata/content of its first-seen appearance, same as RRF.
pub fn weighted_score_fusion(lists: &[(Vec<RetrievalResult>, f32)], source: &str) -> Vec<RetrievalResult> {
    use std::collections::HashMap;

    let mut fused: HashMap<String, (f32, RetrievalResult)> = HashMap::new();

    for (list, weight) in lists {
        let scores: Vec<f32> = list.iter().map(|r| r.score).collect();
        let normalized = min_max_normalize(&scores);
        for (item, norm_score) in list.iter().zip(normalized) {
            let contribution = weight * norm_score;
            fused
                .entry(item.memo_uid.clone())
                .and_modify(|(score, _)| *score += contribution)
                .or_insert_with(|| {
                    let mut first_seen = item.clone();
                    first_seen.source = source.to_string();
                    (contribution, first_seen)
                });
        }
    }

    let mut results: Vec<RetrievalResult> = fused
        .into_values()
        .map(|(score, mut item)| {
            item.score = score;
            item
        })
        .collect();
    results.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
    results
}
