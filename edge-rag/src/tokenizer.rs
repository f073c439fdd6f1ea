//! Token counting used by the chunker and the context assembler.
//!
//! No real model tokenizer is required: [`WhitespaceTokenizer`] is the
//! default proxy, and [`CharEstimateTokenizer`] reproduces the common
//! "four characters per token" estimate. Either can be swapped for an
//! implementation backed by the embedding model's vocabulary.

use std::ops::Range;

/// Splits text into tokens, reported as byte ranges into the input.
///
/// Ranges must be non-empty, non-overlapping, in ascending order and on
/// `char` boundaries, so that any run of consecutive tokens can be sliced
/// back out of the source text.
pub trait Tokenizer: Send + Sync {
    /// Byte ranges of every token in `text`, in source order.
    fn token_spans(&self, text: &str) -> Vec<Range<usize>>;

    /// Number of tokens in `text`.
    fn count_tokens(&self, text: &str) -> usize {
        self.token_spans(text).len()
    }
}

/// Treats every maximal run of non-whitespace characters as one token.
#[derive(Debug, Clone, Copy, Default)]
pub struct WhitespaceTokenizer;

impl Tokenizer for WhitespaceTokenizer {
    fn token_spans(&self, text: &str) -> Vec<Range<usize>> {
        let mut spans = Vec::new();
        let mut start: Option<usize> = None;

        for (i, c) in text.char_indices() {
            match (c.is_whitespace(), start) {
                (true, Some(s)) => {
                    spans.push(s..i);
                    start = None;
                }
                (false, None) => start = Some(i),
                _ => {}
            }
        }
        if let Some(s) = start {
            spans.push(s..text.len());
        }

        spans
    }

    fn count_tokens(&self, text: &str) -> usize {
        text.split_whitespace().count()
    }
}

/// Approximates one token per `chars_per_token` characters.
///
/// Tokens are consecutive groups of characters (whitespace included); the
/// final group may be shorter. Non-empty text always has at least one token.
#[derive(Debug, Clone, Copy)]
pub struct CharEstimateTokenizer {
    chars_per_token: usize,
}

impl CharEstimateTokenizer {
    /// Create an estimator. A `chars_per_token` of zero is treated as one.
    pub fn new(chars_per_token: usize) -> Self {
        Self { chars_per_token: chars_per_token.max(1) }
    }
}

impl Default for CharEstimateTokenizer {
    fn default() -> Self {
        Self::new(4)
    }
}

impl Tokenizer for CharEstimateTokenizer {
    fn token_spans(&self, text: &str) -> Vec<Range<usize>> {
        let mut spans = Vec::new();
        let mut start = 0;
        let mut chars_in_token = 0;

        for (i, _) in text.char_indices() {
            if chars_in_token == self.chars_per_token {
                spans.push(start..i);
                start = i;
                chars_in_token = 0;
            }
            chars_in_token += 1;
        }
        if chars_in_token > 0 {
            spans.push(start..text.len());
        }

        spans
    }

    fn count_tokens(&self, text: &str) -> usize {
        text.chars().count().div_ceil(self.chars_per_token)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn whitespace_spans_slice_back_to_words() {
        let text = "  alpha beta\n\tgamma ";
        let spans = WhitespaceTokenizer.token_spans(text);
        let words: Vec<&str> = spans.iter().map(|r| &text[r.clone()]).collect();
        assert_eq!(words, vec!["alpha", "beta", "gamma"]);
        assert_eq!(WhitespaceTokenizer.count_tokens(text), 3);
    }

    #[test]
    fn whitespace_handles_empty_and_blank_text() {
        assert!(WhitespaceTokenizer.token_spans("").is_empty());
        assert!(WhitespaceTokenizer.token_spans(" \n ").is_empty());
        assert_eq!(WhitespaceTokenizer.count_tokens(""), 0);
    }

    #[test]
    fn whitespace_respects_multibyte_characters() {
        let text = "café naïve 東京";
        let spans = WhitespaceTokenizer.token_spans(text);
        let words: Vec<&str> = spans.iter().map(|r| &text[r.clone()]).collect();
        assert_eq!(words, vec!["café", "naïve", "東京"]);
    }

    #[test]
    fn char_estimate_groups_characters() {
        let tokenizer = CharEstimateTokenizer::new(4);
        let text = "abcdefghij";
        let spans = tokenizer.token_spans(text);
        assert_eq!(spans, vec![0..4, 4..8, 8..10]);
        assert_eq!(tokenizer.count_tokens(text), 3);
        assert_eq!(tokenizer.count_tokens(""), 0);
    }

    #[test]
    fn char_estimate_count_agrees_with_spans() {
        let tokenizer = CharEstimateTokenizer::default();
        for text in ["a", "abcd", "abcde", "日本語のテキスト", "mixed ascii and 文字"] {
            assert_eq!(tokenizer.count_tokens(text), tokenizer.token_spans(text).len(), "{text}");
        }
    }
}
