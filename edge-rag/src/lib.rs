//! # edge-rag
//!
//! On-device Retrieval-Augmented Generation: turn local documents into
//! grounded answers from a local language model, without a network round trip.
//!
//! ## Features
//!
//! - **Chunking**: token windows with exact overlap, optionally ending on
//!   sentence boundaries
//! - **Exact vector search**: in-memory cosine index with deterministic ranking
//! - **Context packing**: greedy, rank-ordered, token-budgeted
//! - **Orchestration**: a serialized pipeline with per-phase timing and
//!   statistics
//!
//! Model runtimes plug in through [`EmbeddingProvider`], [`GenerationProvider`]
//! and [`ModelLoader`].
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use edge_rag::{RagConfig, RagPipeline, RagQuery};
//!
//! let pipeline = RagPipeline::builder()
//!     .config(RagConfig::default())
//!     .embedding_provider(Arc::new(my_embedder))
//!     .generation_provider(Arc::new(my_llm))
//!     .build()?;
//!
//! pipeline.add_document("The warranty lasts two years.", None).await?;
//! let result = pipeline.query(&RagQuery::new("How long is the warranty?")).await?;
//! println!("{}", result.answer);
//! ```

pub mod chunking;
pub mod config;
pub mod context;
pub mod document;
pub mod embedding;
pub mod error;
pub mod generation;
pub mod index;
pub mod loader;
pub mod pipeline;
pub mod prompt;
pub mod slot;
pub mod stats;
pub mod tokenizer;

pub use chunking::{Chunker, SentenceChunker, TextChunk, TokenChunker, chunker_for};
pub use config::{
    ChunkingStrategy, DEFAULT_EMBEDDING_DIMENSION, DEFAULT_PROMPT_TEMPLATE, ModelSpec, RagConfig,
    RagConfigBuilder, ThresholdPreset,
};
pub use context::{CONTEXT_SEPARATOR, ContextAssembler, PackedContext};
pub use document::{Chunk, SearchResult};
pub use embedding::EmbeddingProvider;
pub use error::{BatchFailure, RagError, Result};
pub use generation::{Generation, GenerationOptions, GenerationProvider};
pub use index::{IndexStatistics, VectorIndex, cosine_similarity};
pub use loader::ModelLoader;
pub use pipeline::{PipelineState, RagPipeline, RagPipelineBuilder, RagQuery, RagResult};
pub use prompt::PromptTemplate;
pub use slot::PipelineSlot;
pub use stats::{ConfigSnapshot, PhaseTimer, PipelineStatistics, QueryTimings};
pub use tokenizer::{CharEstimateTokenizer, Tokenizer, WhitespaceTokenizer};
