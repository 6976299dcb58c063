//! S1 — upsert a memo then find it with the `text` strategy.

use memoria_e2e_tests::{fixtures, harness::Harness};

#[tokio::test]
async fn upsert_then_text_search_finds_the_memo() {
    let harness = Harness::new();
    let memo = fixtures::memo("memos/A", "users/1", "柏拉图的《理想国》");
    harness.pipeline.ingest(&memo).await.expect("ingest failed");

    let results = harness.search("text", "柏拉图", 5, Default::default()).await;

    assert!(!results.is_empty(), "expected at least one result");
    assert_eq!(results[0].memo_uid, "memos/A");
    assert_eq!(results[0].source, "text");
}
