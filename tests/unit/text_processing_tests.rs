/*!
 * Tests for the segment-then-chunk front of the pipeline, exercised
 * through the public pipeline surface.
 */

use babelflow::app_config::BatchConfig;
use babelflow::{Chunker, Segmenter};

use crate::common::{mock_config, pipeline_with};

#[test]
fn test_segmentThenChunk_withShortText_shouldProduceOneChunk() {
    let segmenter = Segmenter::default();
    let chunker = Chunker::default();

    let sentences = segmenter.segment("Hello World. This is important. Goodbye.");
    let chunks = chunker.chunk(&sentences);

    assert_eq!(chunks.len(), 1);
    assert_eq!(chunks[0].text, "Hello World. This is important. Goodbye.");
}

#[test]
fn test_segmentThenChunk_offsets_shouldPointIntoOriginalText() {
    let segmenter = Segmenter::default();
    let chunker = Chunker::new(30, 2);
    let text = "First sentence here. Second one follows. A third closes it out.";

    let sentences = segmenter.segment(text);
    let chunks = chunker.chunk(&sentences);

    assert!(chunks.len() > 1);
    for chunk in &chunks {
        assert!(chunk.start_index < chunk.end_index);
        assert!(chunk.end_index <= text.len());
    }
    for pair in chunks.windows(2) {
        assert!(pair[0].end_index <= pair[1].start_index);
    }
}

#[test]
fn test_prepareChunks_shouldHonorConfiguredBudgets() {
    let mut config = mock_config();
    config.batch = BatchConfig {
        max_chunk_length: 40,
        max_chunk_sentences: 2,
        ..config.batch
    };
    let pipeline = pipeline_with(config, Vec::new());

    let chunks = pipeline.prepare_chunks(
        "One short sentence. Another short one. A third short one. And the fourth.",
    );

    assert!(chunks.len() >= 2);
    for chunk in &chunks {
        assert!(chunk.len() <= 40);
    }
}

#[test]
fn test_prepareChunks_withBlankText_shouldReturnFallbackChunk() {
    let pipeline = pipeline_with(mock_config(), Vec::new());
    let chunks = pipeline.prepare_chunks("   \n ");

    assert_eq!(chunks.len(), 1);
    assert!(chunks[0].is_empty());
}

#[test]
fn test_prepareChunks_longText_shouldSplitNearDefaultBudget() {
    let pipeline = pipeline_with(mock_config(), Vec::new());
    let sentence = "This sentence is close to one hundred characters long so six of them overflow one chunk budget. ";
    let text = sentence.repeat(6);

    let chunks = pipeline.prepare_chunks(&text);

    assert!(chunks.len() >= 2);
    for chunk in &chunks {
        assert!(chunk.len() <= 500);
    }
}
