//! Deterministic providers shared by the integration tests.

#![allow(dead_code)]

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use edge_rag::{
    EmbeddingProvider, Generation, GenerationOptions, GenerationProvider, ModelLoader, ModelSpec,
    RagConfig, RagError, RagPipeline, Result,
};

/// Words the [`KeywordEmbedder`] knows; one dimension each.
pub const VOCABULARY: [&str; 8] =
    ["rust", "memory", "safety", "ownership", "python", "garbage", "battery", "phone"];

/// Embeds text as counts of [`VOCABULARY`] words, so texts sharing keywords
/// are similar and texts sharing none score zero.
pub struct KeywordEmbedder;

impl KeywordEmbedder {
    pub fn vector(text: &str) -> Vec<f32> {
        let lowered = text.to_lowercase();
        let words: Vec<&str> =
            lowered.split(|c: char| !c.is_alphanumeric()).filter(|word| !word.is_empty()).collect();
        VOCABULARY
            .iter()
            .map(|keyword| words.iter().filter(|word| *word == keyword).count() as f32)
            .collect()
    }
}

#[async_trait]
impl EmbeddingProvider for KeywordEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        Ok(Self::vector(text))
    }

    fn dimensions(&self) -> usize {
        VOCABULARY.len()
    }

    fn name(&self) -> &str {
        "keyword"
    }
}

/// Bag-of-hashed-words embedder of any dimension.
pub struct HashEmbedder {
    pub dimension: usize,
}

#[async_trait]
impl EmbeddingProvider for HashEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let mut vector = vec![0.0f32; self.dimension];
        for word in text.split_whitespace() {
            let mut hasher = DefaultHasher::new();
            word.to_lowercase().hash(&mut hasher);
            vector[(hasher.finish() % self.dimension as u64) as usize] += 1.0;
        }
        Ok(vector)
    }

    fn dimensions(&self) -> usize {
        self.dimension
    }

    fn name(&self) -> &str {
        "hash"
    }
}

/// Fails for any text containing `marker`; otherwise delegates.
pub struct FailOnMarker<E> {
    pub inner: E,
    pub marker: &'static str,
}

#[async_trait]
impl<E: EmbeddingProvider> EmbeddingProvider for FailOnMarker<E> {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        if text.contains(self.marker) {
            return Err(RagError::embedding("flaky", "tensor shape mismatch"));
        }
        self.inner.embed(text).await
    }

    fn dimensions(&self) -> usize {
        self.inner.dimensions()
    }

    fn name(&self) -> &str {
        "flaky"
    }
}

/// Advertises `dimension` but returns vectors one component longer.
pub struct WrongLengthEmbedder {
    pub dimension: usize,
}

#[async_trait]
impl EmbeddingProvider for WrongLengthEmbedder {
    async fn embed(&self, _text: &str) -> Result<Vec<f32>> {
        Ok(vec![1.0; self.dimension + 1])
    }

    fn dimensions(&self) -> usize {
        self.dimension
    }
}

/// An embedder whose model never finished loading.
pub struct NotReadyEmbedder;

#[async_trait]
impl EmbeddingProvider for NotReadyEmbedder {
    async fn embed(&self, _text: &str) -> Result<Vec<f32>> {
        Err(RagError::embedding("cold", "model not loaded"))
    }

    fn dimensions(&self) -> usize {
        VOCABULARY.len()
    }

    fn name(&self) -> &str {
        "cold"
    }

    fn is_ready(&self) -> bool {
        false
    }
}

/// A prompt and options received by [`RecordingGenerator`].
#[derive(Debug, Clone)]
pub struct GenerationCall {
    pub prompt: String,
    pub options: GenerationOptions,
}

/// Answers every prompt and remembers what it was asked.
#[derive(Default)]
pub struct RecordingGenerator {
    calls: Mutex<Vec<GenerationCall>>,
}

impl RecordingGenerator {
    pub fn calls(&self) -> Vec<GenerationCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn last_prompt(&self) -> Option<String> {
        self.calls().last().map(|call| call.prompt.clone())
    }
}

#[async_trait]
impl GenerationProvider for RecordingGenerator {
    async fn generate(&self, prompt: &str, options: &GenerationOptions) -> Result<Generation> {
        let mut calls = self.calls.lock().unwrap();
        calls.push(GenerationCall { prompt: prompt.to_string(), options: options.clone() });
        Ok(Generation {
            text: format!("answer #{}", calls.len()),
            tokens_generated: Some(3),
            prompt_tokens: Some(prompt.split_whitespace().count() as u32),
            stop_reason: Some("stop".to_string()),
        })
    }

    fn name(&self) -> &str {
        "recording"
    }
}

/// Always fails with a fixed native error message.
pub struct FailingGenerator;

pub const GENERATION_ERROR: &str = "llama_decode returned -1: KV cache is full";

#[async_trait]
impl GenerationProvider for FailingGenerator {
    async fn generate(&self, _prompt: &str, _options: &GenerationOptions) -> Result<Generation> {
        Err(RagError::generation("llama", GENERATION_ERROR))
    }

    fn name(&self) -> &str {
        "llama"
    }
}

/// Tracks how many provider calls overlap in time.
#[derive(Default)]
pub struct ConcurrencyMonitor {
    in_flight: AtomicUsize,
    peak: AtomicUsize,
}

impl ConcurrencyMonitor {
    pub fn peak(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }

    async fn observe(&self) {
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
        tokio::time::sleep(Duration::from_millis(2)).await;
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Keyword embedder that reports overlapping calls to a monitor.
pub struct MonitoredEmbedder(pub Arc<ConcurrencyMonitor>);

#[async_trait]
impl EmbeddingProvider for MonitoredEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        self.0.observe().await;
        Ok(KeywordEmbedder::vector(text))
    }

    fn dimensions(&self) -> usize {
        VOCABULARY.len()
    }
}

/// Generator that reports overlapping calls to a monitor.
pub struct MonitoredGenerator(pub Arc<ConcurrencyMonitor>);

#[async_trait]
impl GenerationProvider for MonitoredGenerator {
    async fn generate(&self, _prompt: &str, _options: &GenerationOptions) -> Result<Generation> {
        self.0.observe().await;
        Ok(Generation::text("ok"))
    }
}

/// Loader handing out fixed providers, or failing on request.
pub struct MockLoader {
    pub embedder: Option<Arc<dyn EmbeddingProvider>>,
    pub generator: Option<Arc<dyn GenerationProvider>>,
    pub embedding_loads: AtomicUsize,
}

impl MockLoader {
    pub fn new(
        embedder: Arc<dyn EmbeddingProvider>,
        generator: Arc<dyn GenerationProvider>,
    ) -> Self {
        Self {
            embedder: Some(embedder),
            generator: Some(generator),
            embedding_loads: AtomicUsize::new(0),
        }
    }

    pub fn keyword() -> Self {
        Self::new(Arc::new(KeywordEmbedder), Arc::new(RecordingGenerator::default()))
    }
}

#[async_trait]
impl ModelLoader for MockLoader {
    async fn load_embedding(&self, spec: &ModelSpec) -> Result<Arc<dyn EmbeddingProvider>> {
        self.embedding_loads.fetch_add(1, Ordering::SeqCst);
        self.embedder
            .clone()
            .ok_or_else(|| RagError::model_load(spec.display_name(), "no such file or directory"))
    }

    async fn load_generation(&self, spec: &ModelSpec) -> Result<Arc<dyn GenerationProvider>> {
        self.generator.clone().ok_or_else(|| {
            RagError::generation("loader", format!("cannot open {}", spec.display_name()))
        })
    }
}

/// Config sized for [`KeywordEmbedder`] with a zero threshold.
pub fn keyword_config() -> RagConfig {
    RagConfig::builder()
        .embedding_model(ModelSpec::new("/models/keyword.onnx"))
        .generation_model(ModelSpec::new("/models/tiny.gguf"))
        .embedding_dimension(VOCABULARY.len())
        .chunk_size(10)
        .chunk_overlap(2)
        .top_k(3)
        .similarity_threshold(0.0)
        .build()
        .unwrap()
}

/// A keyword pipeline plus a handle to its generator.
pub fn keyword_pipeline(config: RagConfig) -> (RagPipeline, Arc<RecordingGenerator>) {
    let generator = Arc::new(RecordingGenerator::default());
    let pipeline = RagPipeline::builder()
        .config(config)
        .embedding_provider(Arc::new(KeywordEmbedder))
        .generation_provider(generator.clone())
        .build()
        .unwrap();
    (pipeline, generator)
}

/// `n` whitespace-separated filler words.
pub fn words(n: usize) -> String {
    (0..n).map(|i| format!("w{i}")).collect::<Vec<_>>().join(" ")
}
