//! Integration-level checks of the quantified invariants (§8) that need a real index rather than
//! hand-built `RetrievalResult` lists.

use memoria_e2e_tests::{fixtures, harness::Harness};

#[tokio::test]
async fn upsert_records_exactly_the_inserted_ids_in_the_manifest() {
    let harness = Harness::new();
    let memo = fixtures::memo_with_text_attachment(
        "memos/A",
        "users/1",
        "base text",
        "attachment body",
    );
    let outcome = harness.pipeline.ingest(&memo).await.unwrap();
    assert_eq!(outcome.text_nodes, 2); // base text + one text attachment

    let info = harness.index.get("memos/A").await.unwrap();
    assert_eq!(info.text_node_ids.len(), 2);
    assert!(info.text_node_ids.contains(&"memo:memos/A".to_string()));
}

#[tokio::test]
async fn delete_removes_memo_from_every_strategy_result_set() {
    let harness = Harness::new();
    harness.pipeline.ingest(&fixtures::memo("memos/A", "users/1", "ephemeral note")).await.unwrap();
    harness.pipeline.remove("memos/A").await.unwrap();
    harness.index.rebuild_bm25().await.unwrap();

    for strategy in ["text", "image", "vector", "hybrid", "bm25", "rrf", "weighted", "bm25_vector", "bm25_vector_alpha", "adaptive"] {
        let results = harness.search(strategy, "ephemeral note", 10, Default::default()).await;
        assert!(results.iter().all(|r| r.memo_uid != "memos/A"), "strategy {strategy} still returned a deleted memo");
    }
}

#[tokio::test]
async fn upsert_is_idempotent_under_deterministic_embedding() {
    let harness = Harness::new();
    let memo = fixtures::memo("memos/A", "users/1", "idempotence check");
    harness.pipeline.ingest(&memo).await.unwrap();
    let first = harness.index.get("memos/A").await.unwrap();

    harness.pipeline.ingest(&memo).await.unwrap();
    let second = harness.index.get("memos/A").await.unwrap();

    assert_eq!(first.text_node_ids, second.text_node_ids);
    assert_eq!(first.image_node_ids, second.image_node_ids);
}

#[tokio::test]
async fn results_expose_memo_uid_consistent_with_metadata_and_the_active_filter() {
    let harness = Harness::new();
    harness.pipeline.ingest(&fixtures::memo("memos/A", "users/1", "consistency check text")).await.unwrap();

    let results = harness.search_with_creator_filter("text", "consistency check text", 10, "users/1").await;
    assert!(!results.is_empty());
    for r in &results {
        assert_eq!(r.metadata.get("memo_uid").map(String::as_str), Some(r.memo_uid.as_str()));
        assert_eq!(r.metadata.get("creator").map(String::as_str), Some("users/1"));
    }
}

#[tokio::test]
async fn every_strategy_returns_sorted_results_within_top_k() {
    let harness = Harness::new();
    for (name, creator, content) in [
        ("memos/A", "users/1", "rust async retrieval engine design notes"),
        ("memos/B", "users/1", "cooking pasta recipes for dinner parties"),
        ("memos/C", "users/2", "rust ownership and borrowing explained"),
    ] {
        harness.pipeline.ingest(&fixtures::memo(name, creator, content)).await.unwrap();
    }
    harness.index.rebuild_bm25().await.unwrap();

    for strategy in ["text", "bm25", "rrf", "weighted", "bm25_vector", "bm25_vector_alpha", "adaptive"] {
        let results = harness.search(strategy, "rust retrieval engine", 2, Default::default()).await;
        assert!(results.len() <= 2, "strategy {strategy} exceeded top_k");
        for window in results.windows(2) {
            assert!(window[0].score >= window[1].score, "strategy {strategy} is not sorted by score descending");
        }
    }
}

#[tokio::test]
async fn dedup_by_memo_keeps_each_memo_at_most_once() {
    let harness = Harness::new();
    let memo = fixtures::memo_with_text_attachment(
        "memos/A",
        "users/1",
        "shared vocabulary appears twice",
        "shared vocabulary appears twice in the attachment as well",
    );
    harness.pipeline.ingest(&memo).await.unwrap();

    let results = harness.search("text", "shared vocabulary appears twice", 10, Default::default()).await;
    let mut seen = std::collections::HashSet::new();
    for r in &results {
        assert!(seen.insert(r.memo_uid.clone()), "memo_uid {} appeared more than once", r.memo_uid);
    }
}
