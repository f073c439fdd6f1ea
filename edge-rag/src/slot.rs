//! An owned slot holding at most one pipeline.
//!
//! Host bindings usually expose a single active pipeline per process. A
//! [`PipelineSlot`] gives them that shape without a global: the binding owns
//! the slot, creates and destroys pipelines through it, and forwards every
//! call. While the slot is empty each operation fails with
//! [`RagError::NotInitialized`], exactly like a destroyed pipeline.

use serde_json::Value;
use tracing::{debug, info};

use crate::config::RagConfig;
use crate::document::SearchResult;
use crate::error::{RagError, Result};
use crate::loader::ModelLoader;
use crate::pipeline::{PipelineState, RagPipeline, RagQuery, RagResult};
use crate::stats::PipelineStatistics;

#[derive(Debug, Default)]
enum Slot {
    #[default]
    Empty,
    Ready(RagPipeline),
    Destroyed,
}

/// Owner of at most one [`RagPipeline`].
#[derive(Debug, Default)]
pub struct PipelineSlot {
    slot: Slot,
}

impl PipelineSlot {
    /// An empty, `Uninitialized` slot.
    pub fn new() -> Self {
        Self::default()
    }

    /// Lifecycle state of the slot.
    pub fn state(&self) -> PipelineState {
        match self.slot {
            Slot::Empty => PipelineState::Uninitialized,
            Slot::Ready(_) => PipelineState::Ready,
            Slot::Destroyed => PipelineState::Destroyed,
        }
    }

    /// Create a pipeline from `config`, replacing (and destroying) any current
    /// one.
    ///
    /// On failure the slot is left `Uninitialized` with nothing retained.
    ///
    /// # Errors
    ///
    /// As [`RagPipeline::create`].
    pub async fn create(&mut self, config: RagConfig, loader: &dyn ModelLoader) -> Result<()> {
        self.destroy().await;
        self.slot = Slot::Empty;
        let pipeline = RagPipeline::create(config, loader).await?;
        self.slot = Slot::Ready(pipeline);
        Ok(())
    }

    /// Put an already built pipeline in the slot, destroying any current one.
    pub async fn install(&mut self, pipeline: RagPipeline) {
        self.destroy().await;
        info!(pipeline.id = %pipeline.id(), "pipeline installed");
        self.slot = Slot::Ready(pipeline);
    }

    /// Destroy the held pipeline, if any. Never fails; an empty slot stays
    /// `Uninitialized`.
    pub async fn destroy(&mut self) {
        match std::mem::take(&mut self.slot) {
            Slot::Ready(pipeline) => {
                pipeline.destroy().await;
                self.slot = Slot::Destroyed;
            }
            Slot::Destroyed => {
                debug!("slot already destroyed");
                self.slot = Slot::Destroyed;
            }
            Slot::Empty => {}
        }
    }

    /// The held pipeline.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::NotInitialized`] unless the slot is `Ready`.
    pub fn pipeline(&self) -> Result<&RagPipeline> {
        match &self.slot {
            Slot::Ready(pipeline) => Ok(pipeline),
            Slot::Empty | Slot::Destroyed => Err(RagError::NotInitialized),
        }
    }

    /// See [`RagPipeline::add_document`].
    pub async fn add_document(&self, text: &str, metadata: Option<Value>) -> Result<Vec<String>> {
        self.pipeline()?.add_document(text, metadata).await
    }

    /// See [`RagPipeline::add_document_json`].
    pub async fn add_document_json(
        &self,
        text: &str,
        metadata_json: Option<&str>,
    ) -> Result<Vec<String>> {
        self.pipeline()?.add_document_json(text, metadata_json).await
    }

    /// See [`RagPipeline::add_documents_batch`].
    pub async fn add_documents_batch<S: AsRef<str>>(
        &self,
        texts: &[S],
        metadata: Option<&[Option<Value>]>,
    ) -> Result<usize> {
        self.pipeline()?.add_documents_batch(texts, metadata).await
    }

    /// See [`RagPipeline::query`].
    pub async fn query(&self, query: &RagQuery) -> Result<RagResult> {
        self.pipeline()?.query(query).await
    }

    /// See [`RagPipeline::search`].
    pub async fn search(&self, question: &str, top_k: usize) -> Result<Vec<SearchResult>> {
        self.pipeline()?.search(question, top_k).await
    }

    /// See [`RagPipeline::clear_documents`].
    pub async fn clear_documents(&self) -> Result<()> {
        self.pipeline()?.clear_documents().await
    }

    /// See [`RagPipeline::document_count`]; `0` when no pipeline is held.
    pub async fn document_count(&self) -> usize {
        match &self.slot {
            Slot::Ready(pipeline) => pipeline.document_count().await,
            Slot::Empty | Slot::Destroyed => 0,
        }
    }

    /// See [`RagPipeline::statistics`].
    pub async fn statistics(&self) -> Result<PipelineStatistics> {
        self.pipeline()?.statistics().await
    }
}
