/*!
 * End-to-end pipeline tests: ordering, caching, fallback, retries,
 * cancellation, invalidation and sub-batch partitioning, all exercised
 * against scriptable mock backends.
 */

use std::time::Duration;

use babelflow::app_config::BackendKind;
use babelflow::backends::mock::{MockBackend, MockBehavior};
use babelflow::{Chunk, ChunkOutcome, ErrorCategory, PipelineError, SubmitRequest};

use crate::common::{dual_backend_config, mock_config, pipeline_with};

fn chunk(text: &str) -> Chunk {
    Chunk::new(text, 0, text.len())
}

fn request(unit: &str, texts: &[&str]) -> SubmitRequest {
    SubmitRequest {
        unit: unit.to_string(),
        chunks: texts.iter().map(|t| chunk(t)).collect(),
        source_language: "en".to_string(),
        target_language: "ko".to_string(),
    }
}

#[tokio::test]
async fn test_submit_withWorkingBackend_shouldTranslateEveryChunkInOrder() {
    let mock = MockBackend::working();
    let pipeline = pipeline_with(mock_config(), vec![mock.clone()]);

    let texts = ["First chunk.", "Second chunk.", "Third chunk."];
    let result = pipeline.submit(request("unit-1", &texts)).await;

    assert!(result.is_complete());
    assert_eq!(result.chunks.len(), 3);
    for (translated, text) in result.chunks.iter().zip(texts) {
        assert_eq!(
            translated.chunk.translation.as_deref(),
            Some(MockBackend::expected_translation(text, "ko").as_str())
        );
    }
}

#[tokio::test]
async fn test_submit_acrossMultipleSubBatches_shouldPreserveInputOrder() {
    let mut config = mock_config();
    config.batch.batch_size = 2;
    let mock = MockBackend::working();
    let pipeline = pipeline_with(config, vec![mock.clone()]);

    let texts: Vec<String> = (0..5).map(|i| format!("Distinct sentence number {}.", i)).collect();
    let refs: Vec<&str> = texts.iter().map(|s| s.as_str()).collect();
    let result = pipeline.submit(request("unit-order", &refs)).await;

    assert!(result.is_complete());
    for (translated, text) in result.chunks.iter().zip(&texts) {
        assert_eq!(
            translated.chunk.translation.as_deref(),
            Some(MockBackend::expected_translation(text, "ko").as_str())
        );
    }
    assert!(mock.call_count() >= 3);
}

#[tokio::test]
async fn test_submit_withBlankChunk_shouldResolveLocally() {
    let mock = MockBackend::working();
    let pipeline = pipeline_with(mock_config(), vec![mock.clone()]);

    let result = pipeline.submit(request("unit-blank", &["  "])).await;

    assert!(result.is_complete());
    assert_eq!(
        result.chunks[0].outcome,
        ChunkOutcome::Translated {
            translation: String::new(),
            backend: None,
            from_cache: false,
        }
    );
    assert_eq!(mock.call_count(), 0);
}

#[tokio::test]
async fn test_submit_withRepeatedText_shouldServeSecondFromCache() {
    let mock = MockBackend::working();
    let pipeline = pipeline_with(mock_config(), vec![mock.clone()]);

    let first = pipeline.submit(request("unit-a", &["Cache me once."])).await;
    let second = pipeline.submit(request("unit-b", &["Cache me once."])).await;

    assert!(first.is_complete());
    assert!(second.is_complete());
    assert_eq!(mock.call_count(), 1);

    match &second.chunks[0].outcome {
        ChunkOutcome::Translated { from_cache, backend, .. } => {
            assert!(*from_cache);
            assert_eq!(*backend, Some(BackendKind::Mock));
        }
        other => panic!("expected cached translation, got {:?}", other),
    }

    let stats = pipeline.cache_stats();
    assert!(stats.cached_requests >= 1);
}

#[tokio::test]
async fn test_submit_withFailingPrimary_shouldFallBackAndCacheUnderFallback() {
    let primary = MockBackend::failing(500).as_kind(BackendKind::Google);
    let fallback = MockBackend::working().as_kind(BackendKind::DeepL);
    let pipeline = pipeline_with(dual_backend_config(), vec![primary.clone(), fallback.clone()]);

    let result = pipeline.submit(request("unit-fb", &["Needs a fallback."])).await;

    assert!(result.is_complete());
    match &result.chunks[0].outcome {
        ChunkOutcome::Translated { backend, from_cache, .. } => {
            assert_eq!(*backend, Some(BackendKind::DeepL));
            assert!(!*from_cache);
        }
        other => panic!("expected fallback translation, got {:?}", other),
    }
    assert_eq!(primary.call_count(), 1);
    assert_eq!(fallback.call_count(), 1);

    // The cached entry carries the backend that actually produced it
    let again = pipeline.submit(request("unit-fb2", &["Needs a fallback."])).await;
    match &again.chunks[0].outcome {
        ChunkOutcome::Translated { backend, from_cache, .. } => {
            assert_eq!(*backend, Some(BackendKind::DeepL));
            assert!(*from_cache);
        }
        other => panic!("expected cached fallback translation, got {:?}", other),
    }
}

#[tokio::test(start_paused = true)]
async fn test_submit_withAllBackendsDown_shouldFailAfterRetryBudget() {
    let mock = MockBackend::failing(500);
    let pipeline = pipeline_with(mock_config(), vec![mock.clone()]);

    let result = pipeline.submit(request("unit-down", &["Doomed text."])).await;

    assert!(!result.is_complete());
    match &result.chunks[0].outcome {
        ChunkOutcome::Failed { category, message } => {
            assert_eq!(*category, ErrorCategory::Server);
            assert!(
                message.contains("after 3 retry cycles"),
                "message should name the retry count: {}",
                message
            );
        }
        other => panic!("expected permanent failure, got {:?}", other),
    }
    // One initial dispatch plus two re-dispatches from the retry queue
    assert_eq!(mock.call_count(), 3);
}

#[tokio::test]
async fn test_submit_withAuthFailure_shouldFailWithoutRetrying() {
    let mock = MockBackend::failing(401);
    let pipeline = pipeline_with(mock_config(), vec![mock.clone()]);

    let result = pipeline.submit(request("unit-auth", &["Locked out."])).await;

    match &result.chunks[0].outcome {
        ChunkOutcome::Failed { category, .. } => {
            assert_eq!(*category, ErrorCategory::Auth);
        }
        other => panic!("expected auth failure, got {:?}", other),
    }
    assert_eq!(mock.call_count(), 1);
}

#[tokio::test]
async fn test_submit_afterShutdown_shouldCancelEveryChunk() {
    let mock = MockBackend::working();
    let pipeline = pipeline_with(mock_config(), vec![mock.clone()]);

    pipeline.shutdown();
    assert!(!pipeline.is_active());

    let result = pipeline.submit(request("unit-late", &["Too late.", "Way too late."])).await;

    for translated in &result.chunks {
        assert_eq!(translated.outcome, ChunkOutcome::Cancelled);
    }
    assert_eq!(mock.call_count(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_submit_withInvalidatedUnit_shouldDropItsRetriesSilently() {
    let mock = MockBackend::failing(500);
    let pipeline = pipeline_with(mock_config(), vec![mock.clone()]);

    pipeline.invalidate_unit("ghost");
    let result = pipeline.submit(request("ghost", &["Orphaned text."])).await;

    assert_eq!(result.chunks[0].outcome, ChunkOutcome::Dropped);
    // The first dispatch still runs; only the retry queue filters the unit
    assert_eq!(mock.call_count(), 1);
}

#[tokio::test]
async fn test_submit_withLargeBacklog_shouldPartitionIntoFixedSubBatches() {
    let mock = MockBackend::working();
    let pipeline = pipeline_with(mock_config(), vec![mock.clone()]);

    let texts: Vec<String> = (0..25).map(|i| format!("Backlog item number {}.", i)).collect();
    let refs: Vec<&str> = texts.iter().map(|s| s.as_str()).collect();
    let result = pipeline.submit(request("unit-big", &refs)).await;

    assert!(result.is_complete());
    let sizes: Vec<usize> = mock.requests().iter().map(|r| r.texts.len()).collect();
    assert_eq!(sizes, vec![10, 10, 5]);
}

#[tokio::test(start_paused = true)]
async fn test_submit_abandonedMidDispatch_shouldNotBlockLaterSubmits() {
    let mock = MockBackend::slow(200);
    let pipeline = pipeline_with(mock_config(), vec![mock.clone()]);

    // The caller gives up while the dispatch pass sits inside the backend
    let abandoned = tokio::time::timeout(
        Duration::from_millis(10),
        pipeline.submit(request("unit-gone", &["Abandoned text."])),
    )
    .await;
    assert!(abandoned.is_err());

    let result = tokio::time::timeout(
        Duration::from_secs(5),
        pipeline.submit(request("unit-next", &["Follow-up text."])),
    )
    .await
    .expect("a dropped submit must not wedge the dispatch pass");

    assert!(result.is_complete());
}

#[tokio::test(start_paused = true)]
async fn test_submit_withShortBackendResponse_shouldFailWithCategorizedError() {
    let mock = MockBackend::new(BackendKind::Mock, MockBehavior::ShortResponse);
    let pipeline = pipeline_with(mock_config(), vec![mock.clone()]);

    let result = pipeline
        .submit(request("unit-short", &["First text.", "Second text."]))
        .await;

    assert!(!result.is_complete());
    for translated in &result.chunks {
        match &translated.outcome {
            ChunkOutcome::Failed { category, message } => {
                assert_eq!(*category, ErrorCategory::Unknown);
                assert!(
                    message.contains("translations"),
                    "message should describe the arity mismatch: {}",
                    message
                );
            }
            other => panic!("expected categorized failure, got {:?}", other),
        }
    }
}

#[tokio::test]
async fn test_submit_concurrently_shouldResolveBothCallers() {
    let mock = MockBackend::slow(5);
    let pipeline = pipeline_with(mock_config(), vec![mock.clone()]);

    let (left, right) = tokio::join!(
        pipeline.submit(request("unit-left", &["Left hand text."])),
        pipeline.submit(request("unit-right", &["Right hand text."])),
    );

    assert!(left.is_complete());
    assert!(right.is_complete());
    assert_eq!(
        left.chunks[0].chunk.translation.as_deref(),
        Some(MockBackend::expected_translation("Left hand text.", "ko").as_str())
    );
    assert_eq!(
        right.chunks[0].chunk.translation.as_deref(),
        Some(MockBackend::expected_translation("Right hand text.", "ko").as_str())
    );
}

fn demo_translation(_text: &str, _target: &str) -> String {
    "안녕 세계. 이것은 중요합니다. 안녕.".to_string()
}

#[tokio::test]
async fn test_translateUnit_endToEnd_shouldReturnReassembledTranslation() {
    let mock = MockBackend::working().with_custom_response(demo_translation);
    let pipeline = pipeline_with(mock_config(), vec![mock.clone()]);

    let translation = pipeline
        .translate_unit("demo", "Hello World. This is important. Goodbye.")
        .await
        .unwrap();

    assert_eq!(translation, "안녕 세계. 이것은 중요합니다. 안녕.");
    // Three short sentences fit the default budgets as a single chunk
    assert_eq!(mock.call_count(), 1);
    assert_eq!(mock.requests()[0].texts[0], "Hello World. This is important. Goodbye.");
}

#[tokio::test(start_paused = true)]
async fn test_translateUnit_withDeadBackend_shouldReportUnitFailure() {
    let mock = MockBackend::failing(503);
    let pipeline = pipeline_with(mock_config(), vec![mock]);

    let err = pipeline
        .translate_unit("doomed", "This will never arrive.")
        .await
        .unwrap_err();

    match err {
        PipelineError::UnitFailed { unit, failed, total } => {
            assert_eq!(unit, "doomed");
            assert_eq!(failed, 1);
            assert_eq!(total, 1);
        }
        other => panic!("expected unit failure, got {:?}", other),
    }
}

#[tokio::test]
async fn test_translateUnit_repeated_shouldHitCacheOnSecondCall() {
    let mock = MockBackend::working();
    let pipeline = pipeline_with(mock_config(), vec![mock.clone()]);

    let text = "An answer worth keeping around.";
    let first = pipeline.translate_unit("u1", text).await.unwrap();
    let second = pipeline.translate_unit("u2", text).await.unwrap();

    assert_eq!(first, second);
    assert_eq!(mock.call_count(), 1);
}

#[tokio::test]
async fn test_testConnection_shouldReflectBackendHealth() {
    let healthy = pipeline_with(mock_config(), vec![MockBackend::working()]);
    assert!(healthy.test_connection().await.is_ok());

    let broken = pipeline_with(mock_config(), vec![MockBackend::failing(503)]);
    assert!(broken.test_connection().await.is_err());
}
