//! Embedding provider trait for generating vector embeddings from text.

use async_trait::async_trait;

use crate::error::Result;

/// A provider that generates vector embeddings from text input.
///
/// Implementations wrap an on-device embedding model behind a unified async
/// interface. The pipeline serializes every call, so implementations do not
/// need to be reentrant. The default
/// [`embed_batch`](EmbeddingProvider::embed_batch) implementation calls
/// [`embed`](EmbeddingProvider::embed) sequentially; backends that support
/// native batching should override it.
///
/// Failures should be reported as [`RagError::EmbeddingFailed`](crate::RagError::EmbeddingFailed).
///
/// # Example
///
/// ```rust,ignore
/// use edge_rag::EmbeddingProvider;
///
/// let provider = MiniLmProvider::load("/models/all-MiniLM-L6-v2.onnx")?;
/// let embedding = provider.embed("hello world").await?;
/// assert_eq!(embedding.len(), provider.dimensions());
/// ```
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Generate an embedding vector for a single text input.
    async fn embed(&self, text: &str) -> Result<Vec<f32>>;

    /// Generate embedding vectors for a batch of text inputs.
    ///
    /// The default implementation calls [`embed`](EmbeddingProvider::embed)
    /// sequentially for each input and stops at the first failure.
    async fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        let mut results = Vec::with_capacity(texts.len());
        for text in texts {
            results.push(self.embed(text).await?);
        }
        Ok(results)
    }

    /// Return the dimensionality of embeddings produced by this provider.
    fn dimensions(&self) -> usize;

    /// Provider identifier for logs and error messages.
    fn name(&self) -> &str {
        "embedding"
    }

    /// Whether the underlying model is loaded and able to serve requests.
    fn is_ready(&self) -> bool {
        true
    }
}
