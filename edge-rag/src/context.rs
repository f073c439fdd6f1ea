//! Token-budgeted context packing.
//!
//! [`ContextAssembler::pack`] appends retrieved chunks in rank order until the
//! next one would push the packed string over the token budget. That chunk is
//! dropped whole and packing stops, so the context is always a contiguous
//! prefix of the ranking.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::document::SearchResult;
use crate::tokenizer::{Tokenizer, WhitespaceTokenizer};

/// Separator placed between packed chunks.
pub const CONTEXT_SEPARATOR: &str = "\n\n";

/// The result of packing ranked chunks.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct PackedContext {
    /// Chunk texts joined by [`CONTEXT_SEPARATOR`]; empty if nothing fit.
    pub text: String,
    /// IDs of the chunks that were packed, in rank order.
    pub chunk_ids: Vec<String>,
    /// Token count of `text`.
    pub token_count: usize,
    /// Number of ranked chunks left out because of the budget.
    pub dropped: usize,
}

impl PackedContext {
    /// Whether no chunk was packed.
    pub fn is_empty(&self) -> bool {
        self.chunk_ids.is_empty()
    }
}

/// Packs ranked chunks into a context string under a token budget.
#[derive(Clone)]
pub struct ContextAssembler {
    tokenizer: Arc<dyn Tokenizer>,
}

impl Default for ContextAssembler {
    fn default() -> Self {
        Self::new(Arc::new(WhitespaceTokenizer))
    }
}

impl ContextAssembler {
    /// Create an assembler that counts tokens with `tokenizer`.
    pub fn new(tokenizer: Arc<dyn Tokenizer>) -> Self {
        Self { tokenizer }
    }

    /// Pack `ranked` (best first) into at most `max_tokens` tokens.
    ///
    /// The token count is measured on the actual packed string, so the
    /// budget holds for any tokenizer. The output is fully determined by the
    /// input order.
    pub fn pack(&self, ranked: &[SearchResult], max_tokens: usize) -> PackedContext {
        let mut packed = PackedContext::default();

        for (position, result) in ranked.iter().enumerate() {
            let candidate = if packed.text.is_empty() {
                result.text.clone()
            } else {
                format!("{}{CONTEXT_SEPARATOR}{}", packed.text, result.text)
            };
            let tokens = self.tokenizer.count_tokens(&candidate);
            if tokens > max_tokens {
                packed.dropped = ranked.len() - position;
                break;
            }
            packed.text = candidate;
            packed.token_count = tokens;
            packed.chunk_ids.push(result.chunk_id.clone());
        }

        packed
    }
}
