//! S2 — deleting a memo removes it from every strategy's results, not just the one it was
//! ingested through.

use memoria_e2e_tests::{fixtures, harness::Harness};

#[tokio::test]
async fn delete_removes_memo_from_all_strategies() {
    let harness = Harness::new();
    let memo = fixtures::memo("memos/A", "users/1", "柏拉图的《理想国》");
    harness.pipeline.ingest(&memo).await.expect("ingest failed");

    harness.index.rebuild_bm25().await.expect("bm25 rebuild failed");
    for strategy in ["text", "bm25", "bm25_vector", "bm25_vector_alpha"] {
        let results = harness.search(strategy, "柏拉图", 5, Default::default()).await;
        assert!(
            results.iter().any(|r| r.memo_uid == "memos/A"),
            "expected memos/A to be found via {strategy} before deletion"
        );
    }

    harness.pipeline.remove("memos/A").await.expect("remove failed");
    harness.index.rebuild_bm25().await.expect("bm25 rebuild failed");

    for strategy in ["text", "bm25", "bm25_vector", "bm25_vector_alpha"] {
        let results = harness.search(strategy, "柏拉图", 5, Default::default()).await;
        assert!(
            results.iter().all(|r| r.memo_uid != "memos/A"),
            "expected memos/A to be absent from {strategy} after deletion, got {results:?}"
        );
    }
}
