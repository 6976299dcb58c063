//! S6 — when the caption provider fails, the image node's text falls back to the attachment's
//! filename instead of failing the whole ingest.

use std::sync::Arc;

use memoria_e2e_tests::fixtures;
use memoria_e2e_tests::harness::{FailingCaptionProvider, Harness, ScriptedCaptionProvider};

#[tokio::test]
async fn failing_caption_provider_falls_back_to_filename() {
    let harness = Harness::with_caption_provider(Some(Arc::new(FailingCaptionProvider)));
    let memo = fixtures::memo_with_image("memos/A", "users/1", "a note with a photo");

    let outcome = harness.pipeline.ingest(&memo).await.expect("ingest failed");
    assert_eq!(outcome.image_nodes, 1);

    let results = harness.search("image", "photo.png", 5, Default::default()).await;
    assert!(results.iter().any(|r| r.memo_uid == "memos/A" && r.content == "photo.png"));
}

#[tokio::test]
async fn scripted_caption_provider_is_used_when_it_succeeds() {
    let harness =
        Harness::with_caption_provider(Some(Arc::new(ScriptedCaptionProvider { caption: "a red bicycle".to_string() })));
    let memo = fixtures::memo_with_image("memos/A", "users/1", "a note with a photo");

    let outcome = harness.pipeline.ingest(&memo).await.expect("ingest failed");
    assert_eq!(outcome.image_nodes, 1);

    let results = harness.search("image", "a red bicycle", 5, Default::default()).await;
    assert!(results.iter().any(|r| r.memo_uid == "memos/A" && r.content == "a red bicycle"));
}
