/*!
 * Chunking of sentence spans into backend-sized translation units.
 *
 * Greedy bin-packing: consecutive sentences are accumulated into a chunk
 * until either the character budget or the sentence-count budget would be
 * exceeded. A single oversized sentence becomes its own chunk; sentences are
 * never split.
 */

use once_cell::sync::Lazy;
use regex::Regex;

use super::segment::Sentence;

/// Whitespace preceding closing punctuation, normalized on reassembly
static SPACE_BEFORE_PUNCT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\s+([.,!?;:。？！、])").expect("punctuation regex is valid"));

/// Runs of whitespace collapsed on reassembly
static REPEATED_SPACE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\s{2,}").expect("whitespace regex is valid"));

/// A bounded group of consecutive sentences dispatched as one unit
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chunk {
    /// Space-joined text of the constituent sentences
    pub text: String,
    /// Byte offset of the first constituent sentence
    pub start_index: usize,
    /// Byte offset one past the last constituent sentence
    pub end_index: usize,
    /// Translated text, written exactly once by a cache hit or backend call
    pub translation: Option<String>,
}

impl Chunk {
    /// Create an untranslated chunk
    pub fn new(text: impl Into<String>, start_index: usize, end_index: usize) -> Self {
        Self {
            text: text.into(),
            start_index,
            end_index,
            translation: None,
        }
    }

    /// Character length of the chunk text
    pub fn len(&self) -> usize {
        self.text.chars().count()
    }

    /// Whether the chunk text is empty
    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }
}

/// Groups sentences into size- and count-bounded chunks
#[derive(Debug, Clone)]
pub struct Chunker {
    /// Maximum characters per chunk
    max_chunk_length: usize,
    /// Maximum sentences per chunk
    max_chunk_sentences: usize,
}

impl Default for Chunker {
    fn default() -> Self {
        Self {
            max_chunk_length: 500,
            max_chunk_sentences: 5,
        }
    }
}

impl Chunker {
    /// Create a chunker with the given budgets
    pub fn new(max_chunk_length: usize, max_chunk_sentences: usize) -> Self {
        Self {
            max_chunk_length,
            max_chunk_sentences,
        }
    }

    /// Pack sentences into chunks, preserving order.
    ///
    /// Chunk boundaries come from the first and last constituent sentence
    /// offsets, never from string search, so repeated substrings in the unit
    /// stay unambiguous.
    pub fn chunk(&self, sentences: &[Sentence]) -> Vec<Chunk> {
        if sentences.is_empty() {
            // Mirror the segmenter's no-fail guarantee with a single
            // empty fallback chunk.
            return vec![Chunk::new(String::new(), 0, 0)];
        }

        let mut chunks = Vec::new();
        let mut current: Vec<&Sentence> = Vec::new();
        let mut current_len = 0usize;

        for sentence in sentences {
            let sentence_len = sentence.len();
            let fits = current_len + sentence_len + 1 <= self.max_chunk_length
                && current.len() < self.max_chunk_sentences;

            if !current.is_empty() && !fits {
                chunks.push(Self::close(&current));
                current.clear();
                current_len = 0;
            }

            current_len += sentence_len + usize::from(!current.is_empty());
            current.push(sentence);
        }

        if !current.is_empty() {
            chunks.push(Self::close(&current));
        }

        chunks
    }

    /// Build a chunk from accumulated sentences
    fn close(sentences: &[&Sentence]) -> Chunk {
        let text = sentences
            .iter()
            .map(|s| s.text.as_str())
            .collect::<Vec<_>>()
            .join(" ");
        let start_index = sentences[0].start_index;
        let end_index = sentences[sentences.len() - 1].end_index;
        Chunk::new(text, start_index, end_index)
    }
}

/// Reassemble ordered chunk translations into one unit translation.
///
/// Joins with a single space, then normalizes whitespace before punctuation
/// and collapses repeated spaces, so that the concatenation reads as a
/// translation of the whole unit.
pub fn join_translations<'a, I>(translations: I) -> String
where
    I: IntoIterator<Item = &'a str>,
{
    let joined = translations.into_iter().collect::<Vec<_>>().join(" ");
    let no_dangling = SPACE_BEFORE_PUNCT.replace_all(&joined, "$1");
    REPEATED_SPACE.replace_all(&no_dangling, " ").trim().to_string()
}
