//! RAG pipeline orchestrator.
//!
//! The [`RagPipeline`] coordinates document ingestion (chunk → embed → index)
//! and question answering (embed → search → filter → pack → prompt →
//! generate). It owns one embedding session, one generation session and the
//! vector index.
//!
//! Model runtimes are not reentrant, so every operation, reads included,
//! runs under a single async mutex for its whole duration. A query can never
//! observe an index that a concurrent ingestion is halfway through changing.
//!
//! # Example
//!
//! ```rust,ignore
//! use edge_rag::{RagConfig, RagPipeline, RagQuery, ModelSpec};
//!
//! let config = RagConfig::builder()
//!     .embedding_model(ModelSpec::new("/models/all-MiniLM-L6-v2.onnx"))
//!     .generation_model(ModelSpec::new("/models/qwen2.5-0.5b-q4.gguf"))
//!     .build()?;
//! let pipeline = RagPipeline::create(config, &loader).await?;
//!
//! pipeline.add_document("Rust guarantees memory safety.", None).await?;
//! let result = pipeline.query(&RagQuery::new("Is Rust memory safe?")).await?;
//! println!("{} ({:.1} ms)", result.answer, result.total_time_ms);
//! ```

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::Mutex;
use tracing::{Instrument, debug, error, info, info_span, warn};
use uuid::Uuid;

use crate::chunking::{Chunker, chunker_for};
use crate::config::RagConfig;
use crate::context::ContextAssembler;
use crate::document::{
    Chunk, SearchResult, check_metadata, chunk_metadata, parse_metadata, source_preview,
};
use crate::embedding::EmbeddingProvider;
use crate::error::{BatchFailure, RagError, Result};
use crate::generation::{GenerationOptions, GenerationProvider};
use crate::index::VectorIndex;
use crate::loader::ModelLoader;
use crate::prompt::PromptTemplate;
use crate::stats::{ConfigSnapshot, PhaseTimer, PipelineStatistics, QueryMetrics, QueryTimings};
use crate::tokenizer::{Tokenizer, WhitespaceTokenizer};

/// Lifecycle of a pipeline: `Uninitialized → Ready → Destroyed`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum PipelineState {
    /// No pipeline has been created (or creation failed).
    Uninitialized,
    /// Providers are loaded and operations are accepted.
    Ready,
    /// Providers are released; every operation fails with `NotInitialized`.
    Destroyed,
}

/// A question plus optional sampling overrides.
///
/// Unset sampling fields take the [`GenerationOptions`] defaults.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct RagQuery {
    /// The user question.
    pub question: String,
    /// System prompt forwarded to the generation provider.
    #[serde(default)]
    pub system_prompt: Option<String>,
    /// Maximum tokens to generate.
    #[serde(default)]
    pub max_tokens: Option<u32>,
    /// Sampling temperature.
    #[serde(default)]
    pub temperature: Option<f32>,
    /// Nucleus sampling probability mass.
    #[serde(default)]
    pub top_p: Option<f32>,
    /// Top-k sampling cutoff.
    #[serde(default)]
    pub top_k: Option<u32>,
}

impl RagQuery {
    /// A query with default sampling parameters.
    pub fn new(question: impl Into<String>) -> Self {
        Self { question: question.into(), ..Self::default() }
    }

    /// Override the system prompt.
    pub fn system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.system_prompt = Some(prompt.into());
        self
    }

    /// Override the generation length limit.
    pub fn max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }

    /// Override the sampling temperature.
    pub fn temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    /// Override nucleus sampling.
    pub fn top_p(mut self, top_p: f32) -> Self {
        self.top_p = Some(top_p);
        self
    }

    /// Override top-k sampling.
    pub fn top_k(mut self, top_k: u32) -> Self {
        self.top_k = Some(top_k);
        self
    }

    /// Sampling parameters with defaults applied.
    pub fn generation_options(&self) -> GenerationOptions {
        let defaults = GenerationOptions::default();
        GenerationOptions {
            max_tokens: self.max_tokens.unwrap_or(defaults.max_tokens),
            temperature: self.temperature.unwrap_or(defaults.temperature),
            top_p: self.top_p.unwrap_or(defaults.top_p),
            top_k: self.top_k.unwrap_or(defaults.top_k),
            system_prompt: self.system_prompt.clone(),
        }
    }
}

/// The answer to a [`RagQuery`] with everything needed to explain it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RagResult {
    /// Generated answer.
    pub answer: String,
    /// Search results that passed the similarity threshold, best first. This
    /// includes chunks the context budget later left out.
    pub retrieved_chunks: Vec<SearchResult>,
    /// The packed context substituted into the prompt (may be empty).
    pub context_used: String,
    /// IDs of the chunks that made it into `context_used`.
    pub context_chunk_ids: Vec<String>,
    /// Query embedding, search and filtering, in milliseconds.
    pub retrieval_time_ms: f64,
    /// Packing, prompt rendering and generation, in milliseconds.
    pub generation_time_ms: f64,
    /// `retrieval_time_ms + generation_time_ms`.
    pub total_time_ms: f64,
    /// Tokens generated, if the provider reports it.
    pub tokens_generated: Option<u32>,
    /// Why generation stopped, if the provider reports it.
    pub stop_reason: Option<String>,
}

impl RagResult {
    /// The result's timings.
    pub fn timings(&self) -> QueryTimings {
        QueryTimings {
            retrieval_time_ms: self.retrieval_time_ms,
            generation_time_ms: self.generation_time_ms,
            total_time_ms: self.total_time_ms,
        }
    }
}

/// Everything that exists only while the pipeline is `Ready`.
struct Engine {
    embedder: Arc<dyn EmbeddingProvider>,
    generator: Arc<dyn GenerationProvider>,
    index: VectorIndex,
    next_chunk_id: u64,
    documents_ingested: usize,
    metrics: QueryMetrics,
}

enum Lifecycle {
    Ready(Box<Engine>),
    Destroyed,
}

impl Lifecycle {
    fn engine_mut(&mut self) -> Result<&mut Engine> {
        match self {
            Lifecycle::Ready(engine) => Ok(&mut **engine),
            Lifecycle::Destroyed => Err(RagError::NotInitialized),
        }
    }
}

/// The RAG pipeline orchestrator.
///
/// Construct one with [`RagPipeline::create`] (loads models through a
/// [`ModelLoader`]) or [`RagPipeline::builder`] (takes live providers).
/// Dropping the pipeline releases everything it owns; [`destroy`](Self::destroy)
/// does the same eagerly and is idempotent.
pub struct RagPipeline {
    id: Uuid,
    created_at: DateTime<Utc>,
    config: RagConfig,
    chunker: Arc<dyn Chunker>,
    assembler: ContextAssembler,
    embedding_name: String,
    generation_name: String,
    state: Mutex<Lifecycle>,
}

impl std::fmt::Debug for RagPipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RagPipeline")
            .field("id", &self.id)
            .field("embedding_provider", &self.embedding_name)
            .field("generation_provider", &self.generation_name)
            .finish_non_exhaustive()
    }
}

/// Check that freshly supplied providers can serve this configuration.
fn check_providers(
    config: &RagConfig,
    embedder: &dyn EmbeddingProvider,
    generator: &dyn GenerationProvider,
) -> Result<()> {
    if !embedder.is_ready() {
        return Err(RagError::model_load(embedder.name(), "embedding provider is not ready"));
    }
    if embedder.dimensions() != config.embedding_dimension {
        return Err(RagError::InvalidConfig(format!(
            "embedding provider '{}' produces {}-dimensional vectors but embedding_dimension is {}",
            embedder.name(),
            embedder.dimensions(),
            config.embedding_dimension
        )));
    }
    if !generator.is_ready() {
        return Err(RagError::model_load(generator.name(), "generation provider is not ready"));
    }
    Ok(())
}

/// Keep a provider's `EmbeddingFailed`, wrap anything else.
fn as_embedding_error(provider: &str, err: RagError) -> RagError {
    match err {
        err @ RagError::EmbeddingFailed { .. } => err,
        other => RagError::embedding(provider, other),
    }
}

fn as_model_load_error(model: String, err: RagError) -> RagError {
    match err {
        err @ RagError::ModelLoadFailed { .. } => err,
        other => RagError::model_load(model, other),
    }
}

impl RagPipeline {
    /// Create a new [`RagPipelineBuilder`].
    pub fn builder() -> RagPipelineBuilder {
        RagPipelineBuilder::default()
    }

    /// Validate `config`, load both models through `loader`, and return a
    /// `Ready` pipeline.
    ///
    /// Nothing is retained on failure: a model loaded before the failing step
    /// is dropped.
    ///
    /// # Errors
    ///
    /// - [`RagError::InvalidConfig`] if the config fails validation or the
    ///   embedding model's dimension disagrees with `embedding_dimension`
    /// - [`RagError::ModelLoadFailed`] if either model fails to load or is not ready
    pub async fn create(config: RagConfig, loader: &dyn ModelLoader) -> Result<Self> {
        config.validate().inspect_err(|e| error!(error = %e, "rejected pipeline config"))?;

        let embedding_model = config.embedding_model.display_name();
        let embedder = loader.load_embedding(&config.embedding_model).await.map_err(|e| {
            error!(model = %embedding_model, error = %e, "failed to load embedding model");
            as_model_load_error(embedding_model.clone(), e)
        })?;

        let generation_model = config.generation_model.display_name();
        let generator = loader.load_generation(&config.generation_model).await.map_err(|e| {
            error!(model = %generation_model, error = %e, "failed to load generation model");
            as_model_load_error(generation_model.clone(), e)
        })?;

        Self::from_parts(config, embedder, generator, Arc::new(WhitespaceTokenizer))
    }

    fn from_parts(
        config: RagConfig,
        embedder: Arc<dyn EmbeddingProvider>,
        generator: Arc<dyn GenerationProvider>,
        tokenizer: Arc<dyn Tokenizer>,
    ) -> Result<Self> {
        config.validate()?;
        check_providers(&config, embedder.as_ref(), generator.as_ref())
            .inspect_err(|e| error!(error = %e, "provider check failed"))?;

        let id = Uuid::new_v4();
        let embedding_name = embedder.name().to_string();
        let generation_name = generator.name().to_string();
        info!(
            pipeline.id = %id,
            embedding_provider = %embedding_name,
            generation_provider = %generation_name,
            dimension = config.embedding_dimension,
            chunk_size = config.chunk_size,
            "RAG pipeline created"
        );

        Ok(Self {
            id,
            created_at: Utc::now(),
            chunker: chunker_for(&config, Arc::clone(&tokenizer)),
            assembler: ContextAssembler::new(tokenizer),
            embedding_name,
            generation_name,
            state: Mutex::new(Lifecycle::Ready(Box::new(Engine {
                embedder,
                generator,
                index: VectorIndex::new(config.embedding_dimension),
                next_chunk_id: 0,
                documents_ingested: 0,
                metrics: QueryMetrics::default(),
            }))),
            config,
        })
    }

    /// Identifier of this pipeline instance, attached to its tracing spans as
    /// `pipeline.id`.
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// The configuration the pipeline was created with.
    pub fn config(&self) -> &RagConfig {
        &self.config
    }

    /// Current lifecycle state: `Ready` until [`destroy`](Self::destroy).
    pub async fn state(&self) -> PipelineState {
        match *self.state.lock().await {
            Lifecycle::Ready(_) => PipelineState::Ready,
            Lifecycle::Destroyed => PipelineState::Destroyed,
        }
    }

    /// Chunk, embed and index one document.
    ///
    /// The document is atomic: if any chunk fails to embed, none of its chunks
    /// are indexed. Empty or whitespace-only text indexes nothing and succeeds.
    /// Returns the IDs of the new chunks.
    ///
    /// # Errors
    ///
    /// - [`RagError::NotInitialized`] after [`destroy`](Self::destroy)
    /// - [`RagError::InvalidInput`] if `metadata` is neither an object nor `null`
    /// - [`RagError::EmbeddingFailed`] if the provider fails or returns a vector
    ///   of the wrong dimension
    pub async fn add_document(&self, text: &str, metadata: Option<Value>) -> Result<Vec<String>> {
        let span = info_span!("rag.add_document", pipeline.id = %self.id, text_len = text.len());
        async {
            let mut state = self.state.lock().await;
            let engine = state.engine_mut()?;
            let metadata = metadata.map(check_metadata).transpose()?.flatten();
            self.ingest(engine, text, metadata.as_ref()).await
        }
        .instrument(span)
        .await
    }

    /// [`add_document`](Self::add_document) with metadata given as JSON text.
    ///
    /// # Errors
    ///
    /// As [`add_document`](Self::add_document); malformed JSON is
    /// [`RagError::InvalidInput`].
    pub async fn add_document_json(
        &self,
        text: &str,
        metadata_json: Option<&str>,
    ) -> Result<Vec<String>> {
        let metadata = match metadata_json {
            Some(json) => parse_metadata(json)?,
            None => None,
        };
        self.add_document(text, metadata).await
    }

    /// Add documents in order, each with the same atomicity as
    /// [`add_document`](Self::add_document).
    ///
    /// A failing document does not stop the batch and does not roll back the
    /// documents already indexed. `metadata`, when given, pairs with `texts` by
    /// position. Returns the number of chunks indexed.
    ///
    /// # Errors
    ///
    /// - [`RagError::NotInitialized`] after [`destroy`](Self::destroy)
    /// - [`RagError::InvalidInput`] if `metadata` and `texts` differ in length
    /// - [`RagError::BatchFailed`] listing every failed document index
    pub async fn add_documents_batch<S: AsRef<str>>(
        &self,
        texts: &[S],
        metadata: Option<&[Option<Value>]>,
    ) -> Result<usize> {
        let span =
            info_span!("rag.add_documents_batch", pipeline.id = %self.id, documents = texts.len());
        async {
            let mut state = self.state.lock().await;
            let engine = state.engine_mut()?;

            if let Some(metadata) = metadata.filter(|m| m.len() != texts.len()) {
                return Err(RagError::InvalidInput(format!(
                    "batch has {} documents but {} metadata entries",
                    texts.len(),
                    metadata.len()
                )));
            }

            let mut chunks = 0;
            let mut indexed = 0;
            let mut failures = Vec::new();
            for (position, text) in texts.iter().enumerate() {
                let document_metadata = metadata.and_then(|m| m[position].clone());
                let outcome = match document_metadata.map(check_metadata).transpose() {
                    Ok(checked) => {
                        self.ingest(engine, text.as_ref(), checked.flatten().as_ref()).await
                    }
                    Err(e) => Err(e),
                };
                match outcome {
                    Ok(ids) => {
                        chunks += ids.len();
                        indexed += 1;
                    }
                    Err(e) => {
                        warn!(document = position, error = %e, "document failed in batch");
                        failures.push((position, e));
                    }
                }
            }

            if failures.is_empty() {
                info!(documents = indexed, chunk_count = chunks, "ingested batch");
                Ok(chunks)
            } else {
                error!(failed = failures.len(), indexed, "batch completed with failures");
                Err(RagError::BatchFailed(BatchFailure { indexed, failures }))
            }
        }
        .instrument(span)
        .await
    }

    async fn ingest(
        &self,
        engine: &mut Engine,
        text: &str,
        metadata: Option<&Value>,
    ) -> Result<Vec<String>> {
        let pieces = self.chunker.chunk(text);
        if pieces.is_empty() {
            info!(chunk_count = 0, "ingested document (empty)");
            return Ok(Vec::new());
        }

        let provider = engine.embedder.name().to_string();
        let texts: Vec<&str> = pieces.iter().map(|piece| piece.text.as_str()).collect();
        let embeddings = engine.embedder.embed_batch(&texts).await.map_err(|e| {
            error!(provider = %provider, error = %e, "failed to embed chunks");
            as_embedding_error(&provider, e)
        })?;
        if embeddings.len() != pieces.len() {
            let err = RagError::embedding(
                &provider,
                format!("expected {} embeddings, got {}", pieces.len(), embeddings.len()),
            );
            error!(error = %err, "embedding count mismatch");
            return Err(err);
        }

        let preview = source_preview(text);
        let first_id = engine.next_chunk_id;
        let document_index = engine.documents_ingested;
        let items: Vec<(Chunk, Vec<f32>)> = pieces
            .into_iter()
            .zip(embeddings)
            .enumerate()
            .map(|(offset, (piece, embedding))| {
                let chunk = Chunk {
                    id: format!("chunk_{}", first_id + offset as u64),
                    metadata: Some(chunk_metadata(metadata, piece.index, &preview)),
                    text: piece.text,
                    source_document_index: document_index,
                };
                (chunk, embedding)
            })
            .collect();
        let count = items.len() as u64;

        let ids = engine.index.insert_batch(items).map_err(|e| {
            error!(provider = %provider, error = %e, "rejected embeddings");
            as_embedding_error(&provider, e)
        })?;
        engine.next_chunk_id += count;
        engine.documents_ingested += 1;

        info!(document_index, chunk_count = ids.len(), "ingested document");
        Ok(ids)
    }

    /// Answer a question from the indexed chunks.
    ///
    /// Retrieval embeds the question, searches `top_k` and drops results below
    /// `similarity_threshold`. Generation packs the survivors under
    /// `max_context_tokens`, renders the prompt template and calls the
    /// generation provider. An empty index or an all-filtered search still
    /// generates, with an empty context.
    ///
    /// # Errors
    ///
    /// - [`RagError::NotInitialized`] after [`destroy`](Self::destroy)
    /// - [`RagError::InvalidInput`] for an empty question
    /// - [`RagError::EmbeddingFailed`] if the question cannot be embedded
    /// - [`RagError::GenerationFailed`] with the provider's message and the
    ///   retrieval time already spent
    pub async fn query(&self, query: &RagQuery) -> Result<RagResult> {
        let span = info_span!("rag.query", pipeline.id = %self.id);
        async {
            let mut state = self.state.lock().await;
            let engine = state.engine_mut()?;

            if query.question.trim().is_empty() {
                return Err(RagError::InvalidInput("question must not be empty".to_string()));
            }

            let top_k = self.config.top_k;
            let retrieval = PhaseTimer::start();
            let retrieved = match self
                .retrieve(engine, &query.question, top_k)
                .instrument(info_span!("rag.retrieval", pipeline.id = %self.id, top_k))
                .await
            {
                Ok(retrieved) => retrieved,
                Err(e) => {
                    engine.metrics.record_failure();
                    return Err(e);
                }
            };
            let retrieval_time_ms = retrieval.elapsed_ms();

            let generation = PhaseTimer::start();
            let packed = self.assembler.pack(&retrieved, self.config.max_context_tokens);
            let prompt = PromptTemplate::new(self.config.prompt_template.as_str())
                .render(&packed.text, &query.question);
            let options = query.generation_options();
            debug!(
                context_chunks = packed.chunk_ids.len(),
                context_tokens = packed.token_count,
                dropped = packed.dropped,
                "packed context"
            );

            let output = engine
                .generator
                .generate(&prompt, &options)
                .instrument(info_span!(
                    "rag.generation",
                    pipeline.id = %self.id,
                    prompt_len = prompt.len(),
                    max_tokens = options.max_tokens
                ))
                .await;
            let output = match output {
                Ok(output) => output,
                Err(e) => {
                    engine.metrics.record_failure();
                    error!(
                        provider = %engine.generator.name(),
                        error = %e,
                        retrieval_time_ms,
                        "generation failed"
                    );
                    return Err(match e {
                        RagError::GenerationFailed { provider, message, .. } => {
                            RagError::GenerationFailed {
                                provider,
                                message,
                                retrieval_time_ms: Some(retrieval_time_ms),
                            }
                        }
                        other => RagError::GenerationFailed {
                            provider: engine.generator.name().to_string(),
                            message: other.to_string(),
                            retrieval_time_ms: Some(retrieval_time_ms),
                        },
                    });
                }
            };
            let timings = QueryTimings::new(retrieval_time_ms, generation.elapsed_ms());
            engine.metrics.record(timings);

            info!(
                retrieved = retrieved.len(),
                context_chunks = packed.chunk_ids.len(),
                retrieval_time_ms = timings.retrieval_time_ms,
                generation_time_ms = timings.generation_time_ms,
                "query completed"
            );

            Ok(RagResult {
                answer: output.text,
                retrieved_chunks: retrieved,
                context_used: packed.text,
                context_chunk_ids: packed.chunk_ids,
                retrieval_time_ms: timings.retrieval_time_ms,
                generation_time_ms: timings.generation_time_ms,
                total_time_ms: timings.total_time_ms,
                tokens_generated: output.tokens_generated,
                stop_reason: output.stop_reason,
            })
        }
        .instrument(span)
        .await
    }

    /// Retrieval only: the chunks `question` would pull into a query's
    /// context candidates, best first, with `similarity_threshold` applied.
    /// No generation runs and no query metrics are recorded.
    ///
    /// # Errors
    ///
    /// - [`RagError::NotInitialized`] after [`destroy`](Self::destroy)
    /// - [`RagError::InvalidInput`] for an empty question
    /// - [`RagError::EmbeddingFailed`] if the question cannot be embedded
    pub async fn search(&self, question: &str, top_k: usize) -> Result<Vec<SearchResult>> {
        let span = info_span!("rag.search", pipeline.id = %self.id, top_k);
        async {
            let mut state = self.state.lock().await;
            let engine = state.engine_mut()?;

            if question.trim().is_empty() {
                return Err(RagError::InvalidInput("question must not be empty".to_string()));
            }
            self.retrieve(engine, question, top_k).await
        }
        .instrument(span)
        .await
    }

    async fn retrieve(
        &self,
        engine: &Engine,
        question: &str,
        top_k: usize,
    ) -> Result<Vec<SearchResult>> {
        let provider = engine.embedder.name();
        let embedding = engine.embedder.embed(question).await.map_err(|e| {
            error!(provider = %provider, error = %e, "failed to embed question");
            as_embedding_error(provider, e)
        })?;

        let results = engine.index.search(&embedding, top_k).map_err(|e| {
            error!(provider = %provider, error = %e, "unusable question embedding");
            as_embedding_error(provider, e)
        })?;

        let candidates = results.len();
        let threshold = self.config.similarity_threshold;
        let relevant: Vec<SearchResult> =
            results.into_iter().filter(|result| result.similarity_score >= threshold).collect();
        debug!(candidates, relevant = relevant.len(), threshold, "retrieved chunks");

        Ok(relevant)
    }

    /// Remove every indexed chunk and reset the document and chunk-id
    /// counters. Calling it on an empty pipeline is a no-op.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::NotInitialized`] after [`destroy`](Self::destroy).
    pub async fn clear_documents(&self) -> Result<()> {
        let span = info_span!("rag.clear", pipeline.id = %self.id);
        async {
            let mut state = self.state.lock().await;
            let engine = state.engine_mut()?;
            let removed = engine.index.size();
            engine.index.clear();
            engine.next_chunk_id = 0;
            engine.documents_ingested = 0;
            info!(removed, "cleared documents");
            Ok(())
        }
        .instrument(span)
        .await
    }

    /// Number of indexed chunks (historically named "document count").
    /// Returns `0` once the pipeline is destroyed.
    pub async fn document_count(&self) -> usize {
        match &*self.state.lock().await {
            Lifecycle::Ready(engine) => engine.index.size(),
            Lifecycle::Destroyed => 0,
        }
    }

    /// A snapshot of counts, index statistics, query latency and config.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::NotInitialized`] after [`destroy`](Self::destroy).
    pub async fn statistics(&self) -> Result<PipelineStatistics> {
        let mut state = self.state.lock().await;
        let engine = state.engine_mut()?;
        let index = engine.index.statistics();

        let mut stats = PipelineStatistics {
            pipeline_id: self.id,
            created_at: self.created_at,
            document_count: index.entries,
            chunk_count: index.entries,
            documents_ingested: engine.documents_ingested,
            index,
            queries_served: 0,
            queries_failed: 0,
            last_query: None,
            mean_retrieval_time_ms: None,
            mean_generation_time_ms: None,
            embedding_provider: self.embedding_name.clone(),
            generation_provider: self.generation_name.clone(),
            config: ConfigSnapshot::from(&self.config),
        };
        stats.fill_queries(&engine.metrics);
        Ok(stats)
    }

    /// Release both providers and the index, and move to `Destroyed`.
    ///
    /// Idempotent; a destroyed pipeline fails every later operation with
    /// [`RagError::NotInitialized`].
    pub async fn destroy(&self) {
        let span = info_span!("rag.destroy", pipeline.id = %self.id);
        async {
            let mut state = self.state.lock().await;
            let previous = std::mem::replace(&mut *state, Lifecycle::Destroyed);
            if let Lifecycle::Ready(mut engine) = previous {
                let released = engine.index.size();
                engine.index.clear();
                drop(engine);
                info!(released, "pipeline destroyed");
            } else {
                debug!("pipeline already destroyed");
            }
        }
        .instrument(span)
        .await
    }
}

/// Builder for constructing a [`RagPipeline`] from live providers.
///
/// `config`, `embedding_provider` and `generation_provider` are required; the
/// tokenizer defaults to [`WhitespaceTokenizer`].
#[derive(Default)]
pub struct RagPipelineBuilder {
    config: Option<RagConfig>,
    embedding_provider: Option<Arc<dyn EmbeddingProvider>>,
    generation_provider: Option<Arc<dyn GenerationProvider>>,
    tokenizer: Option<Arc<dyn Tokenizer>>,
}

impl RagPipelineBuilder {
    /// Set the pipeline configuration.
    pub fn config(mut self, config: RagConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Set the embedding provider.
    pub fn embedding_provider(mut self, provider: Arc<dyn EmbeddingProvider>) -> Self {
        self.embedding_provider = Some(provider);
        self
    }

    /// Set the generation provider.
    pub fn generation_provider(mut self, provider: Arc<dyn GenerationProvider>) -> Self {
        self.generation_provider = Some(provider);
        self
    }

    /// Set the tokenizer shared by chunking and context packing.
    pub fn tokenizer(mut self, tokenizer: Arc<dyn Tokenizer>) -> Self {
        self.tokenizer = Some(tokenizer);
        self
    }

    /// Build a `Ready` [`RagPipeline`].
    ///
    /// # Errors
    ///
    /// - [`RagError::InvalidConfig`] if a required field is missing, the config
    ///   fails validation, or the embedding dimension disagrees
    /// - [`RagError::ModelLoadFailed`] if a provider is not ready
    pub fn build(self) -> Result<RagPipeline> {
        let config =
            self.config.ok_or_else(|| RagError::InvalidConfig("config is required".to_string()))?;
        let embedding_provider = self
            .embedding_provider
            .ok_or_else(|| RagError::InvalidConfig("embedding_provider is required".to_string()))?;
        let generation_provider = self
            .generation_provider
            .ok_or_else(|| RagError::InvalidConfig("generation_provider is required".to_string()))?;
        let tokenizer = self.tokenizer.unwrap_or_else(|| Arc::new(WhitespaceTokenizer));

        RagPipeline::from_parts(config, embedding_provider, generation_provider, tokenizer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn query_defaults_match_generation_defaults() {
        let options = RagQuery::new("why?").generation_options();
        assert_eq!(options, GenerationOptions::default());
    }

    #[test]
    fn query_overrides_are_forwarded() {
        let options = RagQuery::new("why?")
            .max_tokens(64)
            .temperature(0.1)
            .top_p(0.5)
            .top_k(8)
            .system_prompt("Be brief.")
            .generation_options();
        assert_eq!(options.max_tokens, 64);
        assert_eq!(options.temperature, 0.1);
        assert_eq!(options.top_p, 0.5);
        assert_eq!(options.top_k, 8);
        assert_eq!(options.system_prompt.as_deref(), Some("Be brief."));
    }

    #[test]
    fn query_deserializes_with_only_a_question() {
        let query: RagQuery = serde_json::from_str(r#"{"question": "What is Rust?"}"#).unwrap();
        assert_eq!(query, RagQuery::new("What is Rust?"));
    }

    #[test]
    fn builder_requires_providers() {
        let err = RagPipeline::builder().config(RagConfig::default()).build().unwrap_err();
        assert!(matches!(err, RagError::InvalidConfig(ref m) if m.contains("embedding_provider")));
    }

    #[test]
    fn pipeline_state_serializes_snake_case() {
        let json = serde_json::to_string(&PipelineState::Uninitialized).unwrap();
        assert_eq!(json, "\"uninitialized\"");
    }
}
