//! S3 — a `creator` filter in `hybrid` mode keeps only the matching creator's memos, even when
//! two memos share identical content.

use memoria_e2e_tests::{fixtures, harness::Harness};

#[tokio::test]
async fn creator_filter_in_hybrid_mode_keeps_only_matching_creator() {
    let harness = Harness::new();
    let content = "quarterly planning notes for the retrieval team";
    harness.pipeline.ingest(&fixtures::memo("memos/A", "users/1", content)).await.unwrap();
    harness.pipeline.ingest(&fixtures::memo("memos/B", "users/2", content)).await.unwrap();

    let results = harness.search_with_creator_filter("hybrid", content, 10, "users/1").await;

    assert!(!results.is_empty());
    assert!(results.iter().all(|r| r.memo_uid == "memos/A"));
    for r in &results {
        assert_eq!(r.metadata.get("creator").map(String::as_str), Some("users/1"));
    }
}
