//! Model loading seam used when a pipeline is created from a [`RagConfig`].
//!
//! The core never opens model files itself. A host supplies a [`ModelLoader`]
//! that maps the configured [`ModelSpec`]s to live providers (ONNX Runtime,
//! llama.cpp, ...). Paths are expected to be validated by the model registry
//! beforehand.
//!
//! [`RagConfig`]: crate::RagConfig

use std::sync::Arc;

use async_trait::async_trait;

use crate::config::ModelSpec;
use crate::embedding::EmbeddingProvider;
use crate::error::Result;
use crate::generation::GenerationProvider;

/// Creates provider sessions for the models named in a configuration.
///
/// Errors returned from either method are reported by pipeline creation as
/// [`RagError::ModelLoadFailed`](crate::RagError::ModelLoadFailed).
#[async_trait]
pub trait ModelLoader: Send + Sync {
    /// Load the embedding model described by `spec`.
    async fn load_embedding(&self, spec: &ModelSpec) -> Result<Arc<dyn EmbeddingProvider>>;

    /// Load the generation model described by `spec`.
    async fn load_generation(&self, spec: &ModelSpec) -> Result<Arc<dyn GenerationProvider>>;
}
