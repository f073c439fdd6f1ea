//! Configuration for the RAG pipeline.
//!
//! A [`RagConfig`] is fixed for the lifetime of a pipeline. Changing any value
//! means destroying the pipeline and creating a new one.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::error::{RagError, Result};

/// Default prompt template. Both placeholders are substituted at query time.
pub const DEFAULT_PROMPT_TEMPLATE: &str = "Context:\n{context}\n\nQuestion: {query}\n\nAnswer:";

/// Default embedding dimension (all-MiniLM-L6-v2).
pub const DEFAULT_EMBEDDING_DIMENSION: usize = 384;

/// Identifies a model to load: a filesystem path plus optional
/// provider-specific options.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ModelSpec {
    /// Path to the model file (ONNX, GGUF, ...), as supplied by the model registry.
    pub path: PathBuf,
    /// Provider-specific configuration, passed through to the loader untouched.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub options: Option<serde_json::Value>,
}

impl ModelSpec {
    /// Create a spec for the model at `path` with no extra options.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into(), options: None }
    }

    /// Attach provider-specific options.
    pub fn with_options(mut self, options: serde_json::Value) -> Self {
        self.options = Some(options);
        self
    }

    /// The path rendered for logs and error messages.
    pub fn display_name(&self) -> String {
        self.path.display().to_string()
    }
}

/// How documents are split into chunks.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ChunkingStrategy {
    /// Fixed token windows with exact overlap.
    #[default]
    Tokens,
    /// Token windows that prefer to end on a sentence boundary.
    Sentences,
}

/// Tuned similarity-threshold presets shipped by the platform bindings.
///
/// The two values are intentionally different: the default favours recall
/// for small on-device embedding models, the strict preset favours precision.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ThresholdPreset {
    /// `0.15`, the default-constructed configuration.
    Default,
    /// `0.7`, the value documented for the explicit configuration path.
    Strict,
}

impl ThresholdPreset {
    /// The cosine similarity threshold for this preset.
    pub fn value(self) -> f32 {
        match self {
            ThresholdPreset::Default => 0.15,
            ThresholdPreset::Strict => 0.7,
        }
    }
}

/// Configuration parameters for the RAG pipeline.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct RagConfig {
    /// Embedding model to load at pipeline creation.
    pub embedding_model: ModelSpec,
    /// Generation model to load at pipeline creation.
    pub generation_model: ModelSpec,
    /// Length of every embedding stored in the index.
    pub embedding_dimension: usize,
    /// Number of top results to retrieve per query.
    pub top_k: usize,
    /// Minimum cosine similarity for a result to be kept.
    pub similarity_threshold: f32,
    /// Token budget for the packed context.
    pub max_context_tokens: usize,
    /// Maximum tokens per chunk.
    pub chunk_size: usize,
    /// Tokens shared by consecutive chunks.
    pub chunk_overlap: usize,
    /// Prompt with literal `{context}` and `{query}` placeholders.
    ///
    /// A template missing either placeholder is accepted; the prompt then
    /// simply lacks that substitution point. Supplying a useful template is
    /// the caller's responsibility.
    pub prompt_template: String,
    /// Chunking strategy.
    pub chunking: ChunkingStrategy,
}

impl Default for RagConfig {
    fn default() -> Self {
        Self {
            embedding_model: ModelSpec::default(),
            generation_model: ModelSpec::default(),
            embedding_dimension: DEFAULT_EMBEDDING_DIMENSION,
            top_k: 3,
            similarity_threshold: ThresholdPreset::Default.value(),
            max_context_tokens: 2048,
            chunk_size: 512,
            chunk_overlap: 50,
            prompt_template: DEFAULT_PROMPT_TEMPLATE.to_string(),
            chunking: ChunkingStrategy::default(),
        }
    }
}

impl RagConfig {
    /// Create a new builder for constructing a [`RagConfig`].
    pub fn builder() -> RagConfigBuilder {
        RagConfigBuilder::default()
    }

    /// Parse a configuration from JSON. Missing fields take their defaults.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::InvalidConfig`] if the JSON is malformed or the
    /// resulting values fail [`validate`](Self::validate).
    pub fn from_json(json: &str) -> Result<Self> {
        let config: RagConfig = serde_json::from_str(json)
            .map_err(|e| RagError::InvalidConfig(format!("malformed config JSON: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    /// Check that the parameters are consistent.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::InvalidConfig`] if:
    /// - `chunk_size == 0`
    /// - `chunk_overlap >= chunk_size`
    /// - `embedding_dimension == 0`
    /// - `top_k == 0`
    /// - `max_context_tokens == 0`
    /// - `similarity_threshold` is not a finite value in `[-1, 1]`
    pub fn validate(&self) -> Result<()> {
        if self.chunk_size == 0 {
            return Err(RagError::InvalidConfig("chunk_size must be greater than zero".into()));
        }
        if self.chunk_overlap >= self.chunk_size {
            return Err(RagError::InvalidConfig(format!(
                "chunk_overlap ({}) must be less than chunk_size ({})",
                self.chunk_overlap, self.chunk_size
            )));
        }
        if self.embedding_dimension == 0 {
            return Err(RagError::InvalidConfig(
                "embedding_dimension must be greater than zero".into(),
            ));
        }
        if self.top_k == 0 {
            return Err(RagError::InvalidConfig("top_k must be greater than zero".into()));
        }
        if self.max_context_tokens == 0 {
            return Err(RagError::InvalidConfig(
                "max_context_tokens must be greater than zero".into(),
            ));
        }
        let threshold = self.similarity_threshold;
        if !threshold.is_finite() || !(-1.0..=1.0).contains(&threshold) {
            return Err(RagError::InvalidConfig(format!(
                "similarity_threshold ({}) must be within [-1, 1]",
                self.similarity_threshold
            )));
        }
        Ok(())
    }
}

/// Builder for constructing a validated [`RagConfig`].
#[derive(Debug, Clone, Default)]
pub struct RagConfigBuilder {
    config: RagConfig,
}

impl RagConfigBuilder {
    /// Set the embedding model.
    pub fn embedding_model(mut self, model: ModelSpec) -> Self {
        self.config.embedding_model = model;
        self
    }

    /// Set the generation model.
    pub fn generation_model(mut self, model: ModelSpec) -> Self {
        self.config.generation_model = model;
        self
    }

    /// Set the embedding dimension.
    pub fn embedding_dimension(mut self, dimension: usize) -> Self {
        self.config.embedding_dimension = dimension;
        self
    }

    /// Set the number of top results to retrieve.
    pub fn top_k(mut self, k: usize) -> Self {
        self.config.top_k = k;
        self
    }

    /// Set the minimum similarity threshold for filtering results.
    pub fn similarity_threshold(mut self, threshold: f32) -> Self {
        self.config.similarity_threshold = threshold;
        self
    }

    /// Use one of the documented threshold presets.
    pub fn threshold_preset(mut self, preset: ThresholdPreset) -> Self {
        self.config.similarity_threshold = preset.value();
        self
    }

    /// Set the token budget for the packed context.
    pub fn max_context_tokens(mut self, tokens: usize) -> Self {
        self.config.max_context_tokens = tokens;
        self
    }

    /// Set the maximum chunk size in tokens.
    pub fn chunk_size(mut self, size: usize) -> Self {
        self.config.chunk_size = size;
        self
    }

    /// Set the overlap between consecutive chunks in tokens.
    pub fn chunk_overlap(mut self, overlap: usize) -> Self {
        self.config.chunk_overlap = overlap;
        self
    }

    /// Set the prompt template.
    pub fn prompt_template(mut self, template: impl Into<String>) -> Self {
        self.config.prompt_template = template.into();
        self
    }

    /// Set the chunking strategy.
    pub fn chunking(mut self, strategy: ChunkingStrategy) -> Self {
        self.config.chunking = strategy;
        self
    }

    /// Build the [`RagConfig`], validating that parameters are consistent.
    ///
    /// # Errors
    ///
    /// See [`RagConfig::validate`].
    pub fn build(self) -> Result<RagConfig> {
        self.config.validate()?;
        Ok(self.config)
    }
}
