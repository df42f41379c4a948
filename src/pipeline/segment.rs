/*!
 * Sentence segmentation.
 *
 * Splits a unit of raw text into an ordered list of sentence spans with
 * exact byte offsets into the original text. Segmentation never fails for
 * non-empty input: when the boundary pass and the punctuation fallback both
 * come up empty, the whole input is returned as a single sentence.
 */

use once_cell::sync::Lazy;
use regex::Regex;
use unicode_segmentation::UnicodeSegmentation;

/// Sentence-final punctuation run followed by whitespace, the fallback
/// split point when UAX#29 boundaries produce nothing usable.
static SENTENCE_BREAK: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[.!?。？！]+[\s\n]+").expect("sentence break regex is valid"));

/// One sentence span inside a text unit. Immutable once produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sentence {
    /// Sentence text, trimmed of surrounding whitespace
    pub text: String,
    /// Byte offset of the first character in the owning text unit
    pub start_index: usize,
    /// Byte offset one past the last character in the owning text unit
    pub end_index: usize,
}

impl Sentence {
    /// Character length of the sentence text
    pub fn len(&self) -> usize {
        self.text.chars().count()
    }

    /// Whether the sentence text is empty
    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }
}

/// Splits raw text into sentence spans
#[derive(Debug, Clone)]
pub struct Segmenter {
    /// Spans shorter than this many characters are discarded
    min_text_length: usize,
}

impl Default for Segmenter {
    fn default() -> Self {
        Self { min_text_length: 3 }
    }
}

impl Segmenter {
    /// Create a segmenter with the given minimum sentence length
    pub fn new(min_text_length: usize) -> Self {
        Self { min_text_length }
    }

    /// Split text into ordered, non-overlapping sentence spans.
    ///
    /// Returns at least one sentence for any input containing non-whitespace
    /// characters; returns an empty list only for blank input.
    pub fn segment(&self, text: &str) -> Vec<Sentence> {
        if text.trim().is_empty() {
            return Vec::new();
        }

        let sentences = self.segment_by_bounds(text);
        if !sentences.is_empty() {
            return sentences;
        }

        let sentences = self.segment_by_punctuation(text);
        if !sentences.is_empty() {
            return sentences;
        }

        // Both passes filtered everything out; the unit still has content,
        // so hand it back whole.
        Self::trimmed_span(text, 0).into_iter().collect()
    }

    /// Primary pass: UAX#29 sentence boundaries
    fn segment_by_bounds(&self, text: &str) -> Vec<Sentence> {
        text.split_sentence_bound_indices()
            .filter_map(|(offset, raw)| Self::trimmed_span(raw, offset))
            .filter(|s| s.len() >= self.min_text_length)
            .collect()
    }

    /// Fallback pass: split after sentence-final punctuation runs
    fn segment_by_punctuation(&self, text: &str) -> Vec<Sentence> {
        let mut sentences = Vec::new();
        let mut cursor = 0;

        for break_match in SENTENCE_BREAK.find_iter(text) {
            let raw = &text[cursor..break_match.end()];
            if let Some(sentence) = Self::trimmed_span(raw, cursor) {
                if sentence.len() >= self.min_text_length {
                    sentences.push(sentence);
                }
            }
            cursor = break_match.end();
        }

        if cursor < text.len() {
            if let Some(sentence) = Self::trimmed_span(&text[cursor..], cursor) {
                if sentence.len() >= self.min_text_length {
                    sentences.push(sentence);
                }
            }
        }

        sentences
    }

    /// Trim a raw span and re-position its offsets against the original text
    fn trimmed_span(raw: &str, offset: usize) -> Option<Sentence> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return None;
        }

        let leading = raw.len() - raw.trim_start().len();
        let start_index = offset + leading;
        Some(Sentence {
            text: trimmed.to_string(),
            start_index,
            end_index: start_index + trimmed.len(),
        })
    }
}
