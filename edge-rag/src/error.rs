//! Error types for the `edge-rag` crate.

use std::fmt;

use thiserror::Error;

/// Errors that can occur in RAG operations.
#[derive(Debug, Error)]
pub enum RagError {
    /// The operation was issued before the pipeline was created or after it
    /// was destroyed.
    #[error("Pipeline not initialized")]
    NotInitialized,

    /// A configuration validation error.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// The embedding or generation model failed to initialize.
    #[error("Model load failed ({model}): {message}")]
    ModelLoadFailed {
        /// The model that failed to load (path or provider name).
        model: String,
        /// A description of the failure.
        message: String,
    },

    /// The embedding provider failed or produced an unusable vector.
    #[error("Embedding failed ({provider}): {message}")]
    EmbeddingFailed {
        /// The embedding provider that produced the error.
        provider: String,
        /// A description of the failure.
        message: String,
    },

    /// The generation provider failed.
    ///
    /// Retrieval had already completed when this is returned, so its timing
    /// is reported; there is no generation timing.
    #[error("Generation failed ({provider}): {message}")]
    GenerationFailed {
        /// The generation provider that produced the error.
        provider: String,
        /// The provider's error message, verbatim.
        message: String,
        /// Wall-clock time spent in the retrieval phase before generation failed.
        retrieval_time_ms: Option<f64>,
    },

    /// The caller supplied unusable input (empty question, malformed metadata).
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// One or more documents of a batch failed. Documents not listed were indexed.
    #[error("{0}")]
    BatchFailed(BatchFailure),
}

impl RagError {
    /// Shorthand for an [`RagError::EmbeddingFailed`] from any displayable cause.
    pub fn embedding(provider: impl Into<String>, message: impl fmt::Display) -> Self {
        Self::EmbeddingFailed { provider: provider.into(), message: message.to_string() }
    }

    /// Shorthand for a [`RagError::GenerationFailed`] with no retrieval timing.
    pub fn generation(provider: impl Into<String>, message: impl fmt::Display) -> Self {
        Self::GenerationFailed {
            provider: provider.into(),
            message: message.to_string(),
            retrieval_time_ms: None,
        }
    }

    /// Shorthand for a [`RagError::ModelLoadFailed`].
    pub fn model_load(model: impl Into<String>, message: impl fmt::Display) -> Self {
        Self::ModelLoadFailed { model: model.into(), message: message.to_string() }
    }
}

/// Aggregate outcome of a batch add in which at least one document failed.
#[derive(Debug)]
pub struct BatchFailure {
    /// Number of documents that were indexed successfully.
    pub indexed: usize,
    /// Failing documents as `(0-based index, error)`, in batch order.
    pub failures: Vec<(usize, RagError)>,
}

impl BatchFailure {
    /// Indices of the documents that failed.
    pub fn failed_indices(&self) -> Vec<usize> {
        self.failures.iter().map(|(index, _)| *index).collect()
    }
}

impl fmt::Display for BatchFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} document(s) failed in batch (indexed {})",
            self.failures.len(),
            self.indexed
        )?;
        for (index, error) in &self.failures {
            write!(f, "; document {index}: {error}")?;
        }
        Ok(())
    }
}

/// A convenience result type for RAG operations.
pub type Result<T> = std::result::Result<T, RagError>;
