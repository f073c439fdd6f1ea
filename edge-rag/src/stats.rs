//! Statistics and per-phase timing.

use std::time::Instant;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::config::{ChunkingStrategy, RagConfig};
use crate::index::IndexStatistics;

/// Wall-clock stopwatch reporting milliseconds.
#[derive(Debug, Clone, Copy)]
pub struct PhaseTimer {
    started: Instant,
}

impl PhaseTimer {
    /// Start timing now.
    pub fn start() -> Self {
        Self { started: Instant::now() }
    }

    /// Milliseconds since [`start`](Self::start).
    pub fn elapsed_ms(&self) -> f64 {
        self.started.elapsed().as_secs_f64() * 1000.0
    }
}

/// Latency of one successful query, split by phase.
///
/// Retrieval covers query embedding, search and threshold filtering.
/// Generation covers context packing, prompt rendering and the model call.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq)]
pub struct QueryTimings {
    /// Retrieval phase in milliseconds.
    pub retrieval_time_ms: f64,
    /// Generation phase in milliseconds.
    pub generation_time_ms: f64,
    /// `retrieval_time_ms + generation_time_ms`.
    pub total_time_ms: f64,
}

impl QueryTimings {
    /// Build timings from the two phase durations.
    pub fn new(retrieval_time_ms: f64, generation_time_ms: f64) -> Self {
        Self {
            retrieval_time_ms,
            generation_time_ms,
            total_time_ms: retrieval_time_ms + generation_time_ms,
        }
    }
}

/// Running query counters kept by the pipeline.
#[derive(Debug, Clone, Default)]
pub(crate) struct QueryMetrics {
    served: u64,
    failed: u64,
    retrieval_ms_sum: f64,
    generation_ms_sum: f64,
    last: Option<QueryTimings>,
}

impl QueryMetrics {
    pub(crate) fn record(&mut self, timings: QueryTimings) {
        self.served += 1;
        self.retrieval_ms_sum += timings.retrieval_time_ms;
        self.generation_ms_sum += timings.generation_time_ms;
        self.last = Some(timings);
    }

    pub(crate) fn record_failure(&mut self) {
        self.failed += 1;
    }

    fn mean(&self, sum: f64) -> Option<f64> {
        (self.served > 0).then(|| sum / self.served as f64)
    }
}

/// The configuration values reported alongside statistics.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ConfigSnapshot {
    /// Embedding dimension.
    pub embedding_dimension: usize,
    /// Results retrieved per query.
    pub top_k: usize,
    /// Similarity threshold.
    pub similarity_threshold: f32,
    /// Context token budget.
    pub max_context_tokens: usize,
    /// Tokens per chunk.
    pub chunk_size: usize,
    /// Overlap tokens.
    pub chunk_overlap: usize,
    /// Chunking strategy.
    pub chunking: ChunkingStrategy,
}

impl From<&RagConfig> for ConfigSnapshot {
    fn from(config: &RagConfig) -> Self {
        Self {
            embedding_dimension: config.embedding_dimension,
            top_k: config.top_k,
            similarity_threshold: config.similarity_threshold,
            max_context_tokens: config.max_context_tokens,
            chunk_size: config.chunk_size,
            chunk_overlap: config.chunk_overlap,
            chunking: config.chunking,
        }
    }
}

/// Point-in-time statistics of a pipeline.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PipelineStatistics {
    /// Identifier of the pipeline instance.
    pub pipeline_id: Uuid,
    /// When the pipeline was created.
    pub created_at: DateTime<Utc>,
    /// Indexed chunk count. Named "document count" for compatibility with the
    /// host bindings; it counts chunks, not source documents.
    pub document_count: usize,
    /// Indexed chunk count.
    pub chunk_count: usize,
    /// Source documents added since the last clear.
    pub documents_ingested: usize,
    /// Vector index counters.
    pub index: IndexStatistics,
    /// Successful queries since creation.
    pub queries_served: u64,
    /// Failed queries since creation.
    pub queries_failed: u64,
    /// Timings of the most recent successful query.
    pub last_query: Option<QueryTimings>,
    /// Mean retrieval latency over successful queries.
    pub mean_retrieval_time_ms: Option<f64>,
    /// Mean generation latency over successful queries.
    pub mean_generation_time_ms: Option<f64>,
    /// Embedding provider name.
    pub embedding_provider: String,
    /// Generation provider name.
    pub generation_provider: String,
    /// Effective configuration.
    pub config: ConfigSnapshot,
}

impl PipelineStatistics {
    pub(crate) fn fill_queries(&mut self, metrics: &QueryMetrics) {
        self.queries_served = metrics.served;
        self.queries_failed = metrics.failed;
        self.last_query = metrics.last;
        self.mean_retrieval_time_ms = metrics.mean(metrics.retrieval_ms_sum);
        self.mean_generation_time_ms = metrics.mean(metrics.generation_ms_sum);
    }

    /// Serialize to a JSON string.
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn total_is_sum_of_phases() {
        let timings = QueryTimings::new(12.5, 30.25);
        assert!((timings.total_time_ms - 42.75).abs() < f64::EPSILON);
    }

    #[test]
    fn metrics_average_successful_queries() {
        let mut metrics = QueryMetrics::default();
        assert_eq!(metrics.mean(metrics.retrieval_ms_sum), None);

        metrics.record(QueryTimings::new(10.0, 100.0));
        metrics.record(QueryTimings::new(20.0, 300.0));
        metrics.record_failure();

        assert_eq!(metrics.served, 2);
        assert_eq!(metrics.failed, 1);
        assert_eq!(metrics.mean(metrics.retrieval_ms_sum), Some(15.0));
        assert_eq!(metrics.mean(metrics.generation_ms_sum), Some(200.0));
        assert_eq!(metrics.last, Some(QueryTimings::new(20.0, 300.0)));
    }

    #[test]
    fn timer_is_monotonic() {
        let timer = PhaseTimer::start();
        let first = timer.elapsed_ms();
        let second = timer.elapsed_ms();
        assert!(first >= 0.0);
        assert!(second >= first);
    }
}
