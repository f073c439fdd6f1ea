//! Document chunking strategies.
//!
//! This module provides the [`Chunker`] trait and two implementations:
//!
//! - [`TokenChunker`]: fixed token windows with exact overlap
//! - [`SentenceChunker`]: token windows that prefer to end on a sentence boundary
//!
//! Both count tokens with a pluggable [`Tokenizer`] and guarantee that every
//! chunk holds at most `chunk_size` tokens and that chunk `i + 1` starts with
//! the last `chunk_overlap` tokens of chunk `i`.

use std::ops::Range;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::config::{ChunkingStrategy, RagConfig};
use crate::tokenizer::{Tokenizer, WhitespaceTokenizer};

/// A contiguous slice of a document produced by a [`Chunker`].
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TextChunk {
    /// The chunk text, sliced verbatim from the source.
    pub text: String,
    /// Position of the chunk within its document, starting at zero.
    pub index: usize,
    /// Byte offset of the first token in the source text.
    pub start: usize,
    /// Byte offset just past the last token in the source text.
    pub end: usize,
    /// Number of tokens in the chunk.
    pub token_count: usize,
}

/// A strategy for splitting document text into chunks.
pub trait Chunker: Send + Sync {
    /// Split `text` into chunks in source order.
    ///
    /// Returns an empty `Vec` if the text contains no tokens.
    fn chunk(&self, text: &str) -> Vec<TextChunk>;
}

/// Build the chunker selected by `config`, sharing `tokenizer`.
pub fn chunker_for(config: &RagConfig, tokenizer: Arc<dyn Tokenizer>) -> Arc<dyn Chunker> {
    match config.chunking {
        ChunkingStrategy::Tokens => Arc::new(
            TokenChunker::new(config.chunk_size, config.chunk_overlap).with_tokenizer(tokenizer),
        ),
        ChunkingStrategy::Sentences => Arc::new(
            SentenceChunker::new(config.chunk_size, config.chunk_overlap)
                .with_tokenizer(tokenizer),
        ),
    }
}

/// Window sizes after clamping: at least one token per chunk and an overlap
/// strictly smaller than the chunk, so every step makes progress.
fn effective_window(chunk_size: usize, chunk_overlap: usize) -> (usize, usize) {
    let size = chunk_size.max(1);
    (size, chunk_overlap.min(size - 1))
}

/// Walk `spans` in windows of at most `size` tokens. `pick_end` receives the
/// window start and the hard end and returns the actual (exclusive) end token,
/// which must lie in `(start + overlap, hard_end]` unless it equals `hard_end`.
fn build_chunks(
    text: &str,
    spans: &[Range<usize>],
    size: usize,
    overlap: usize,
    mut pick_end: impl FnMut(usize, usize) -> usize,
) -> Vec<TextChunk> {
    let mut chunks = Vec::new();
    let mut start = 0;

    while start < spans.len() {
        let hard_end = (start + size).min(spans.len());
        let end = if hard_end == spans.len() { hard_end } else { pick_end(start, hard_end) };

        let byte_start = spans[start].start;
        let byte_end = spans[end - 1].end;
        chunks.push(TextChunk {
            text: text[byte_start..byte_end].to_string(),
            index: chunks.len(),
            start: byte_start,
            end: byte_end,
            token_count: end - start,
        });

        if end == spans.len() {
            break;
        }
        start = end - overlap;
    }

    chunks
}

/// Splits text into fixed windows of `chunk_size` tokens, each starting
/// `chunk_size - chunk_overlap` tokens after the previous one.
///
/// # Example
///
/// ```rust
/// use edge_rag::{Chunker, TokenChunker};
///
/// let chunker = TokenChunker::new(4, 1);
/// let chunks = chunker.chunk("one two three four five six seven");
/// assert_eq!(chunks[0].text, "one two three four");
/// assert_eq!(chunks[1].text, "four five six seven");
/// ```
#[derive(Clone)]
pub struct TokenChunker {
    chunk_size: usize,
    chunk_overlap: usize,
    tokenizer: Arc<dyn Tokenizer>,
}

impl TokenChunker {
    /// Create a new `TokenChunker` counting whitespace-separated tokens.
    ///
    /// # Arguments
    ///
    /// * `chunk_size`: maximum number of tokens per chunk
    /// * `chunk_overlap`: tokens shared by consecutive chunks; must be smaller
    ///   than `chunk_size` (values that are not are clamped to `chunk_size - 1`)
    pub fn new(chunk_size: usize, chunk_overlap: usize) -> Self {
        Self { chunk_size, chunk_overlap, tokenizer: Arc::new(WhitespaceTokenizer) }
    }

    /// Count tokens with `tokenizer` instead.
    pub fn with_tokenizer(mut self, tokenizer: Arc<dyn Tokenizer>) -> Self {
        self.tokenizer = tokenizer;
        self
    }
}

impl Chunker for TokenChunker {
    fn chunk(&self, text: &str) -> Vec<TextChunk> {
        let spans = self.tokenizer.token_spans(text);
        let (size, overlap) = effective_window(self.chunk_size, self.chunk_overlap);
        build_chunks(text, &spans, size, overlap, |_, hard_end| hard_end)
    }
}

/// Like [`TokenChunker`], but ends a chunk early on the last sentence
/// boundary inside the window when one exists past the overlap region.
///
/// A token ends a sentence if it ends with `.`, `!` or `?`, or if the
/// whitespace after it contains a newline.
#[derive(Clone)]
pub struct SentenceChunker {
    chunk_size: usize,
    chunk_overlap: usize,
    tokenizer: Arc<dyn Tokenizer>,
}

impl SentenceChunker {
    /// Create a new `SentenceChunker` counting whitespace-separated tokens.
    pub fn new(chunk_size: usize, chunk_overlap: usize) -> Self {
        Self { chunk_size, chunk_overlap, tokenizer: Arc::new(WhitespaceTokenizer) }
    }

    /// Count tokens with `tokenizer` instead.
    pub fn with_tokenizer(mut self, tokenizer: Arc<dyn Tokenizer>) -> Self {
        self.tokenizer = tokenizer;
        self
    }
}

/// For each token, whether a sentence ends right after it.
fn sentence_ends(text: &str, spans: &[Range<usize>]) -> Vec<bool> {
    spans
        .iter()
        .enumerate()
        .map(|(i, span)| {
            let token = &text[span.clone()];
            if token.ends_with(['.', '!', '?']) {
                return true;
            }
            let gap_end = spans.get(i + 1).map_or(text.len(), |next| next.start);
            text[span.end..gap_end].contains('\n')
        })
        .collect()
}

impl Chunker for SentenceChunker {
    fn chunk(&self, text: &str) -> Vec<TextChunk> {
        let spans = self.tokenizer.token_spans(text);
        let ends = sentence_ends(text, &spans);
        let (size, overlap) = effective_window(self.chunk_size, self.chunk_overlap);

        build_chunks(text, &spans, size, overlap, |start, hard_end| {
            (start + overlap + 1..=hard_end).rev().find(|&end| ends[end - 1]).unwrap_or(hard_end)
        })
    }
}
