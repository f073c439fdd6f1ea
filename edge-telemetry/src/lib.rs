//! # edge-telemetry
//!
//! Logging setup for `edge-rag` hosts, plus an in-memory span capture layer.
//!
//! The pipeline emits `tracing` spans (`rag.query`, `rag.retrieval`,
//! `rag.generation`, ...) tagged with `pipeline.id`. [`InMemoryTraceLayer`]
//! records closed spans into a [`SharedTraceStorage`] grouped by that id, so a
//! host or a test can read per-phase latency without an exporter.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use edge_telemetry::{SharedTraceStorage, init_with_storage};
//!
//! let storage = Arc::new(SharedTraceStorage::new());
//! init_with_storage("notes-app", storage.clone())?;
//!
//! // ... run queries ...
//! for span in storage.spans_named(&pipeline.id().to_string(), "rag.generation") {
//!     println!("generation took {:.1} ms", span.duration_ms);
//! }
//! ```

pub mod memory;

#[cfg(test)]
mod test_inmemory;
#[cfg(test)]
mod test_serialization;

use std::sync::Arc;

use thiserror::Error;
use tracing::Subscriber;
use tracing_subscriber::{
    EnvFilter, fmt, layer::SubscriberExt, registry::LookupSpan, util::SubscriberInitExt,
};

pub use memory::{InMemoryTraceLayer, PIPELINE_ID_FIELD, SharedTraceStorage, SpanData};

/// Errors from telemetry initialization.
#[derive(Debug, Error)]
pub enum TelemetryError {
    /// A global subscriber was already installed.
    #[error("telemetry already initialized: {0}")]
    AlreadyInitialized(String),
}

/// `RUST_LOG` if set, otherwise `info`.
fn env_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
}

/// Install a global human-readable log subscriber filtered by `RUST_LOG`.
///
/// # Errors
///
/// Returns [`TelemetryError::AlreadyInitialized`] if a global subscriber exists.
pub fn init_telemetry(service_name: &str) -> Result<(), TelemetryError> {
    tracing_subscriber::registry()
        .with(env_filter())
        .with(fmt::layer().with_target(true))
        .try_init()
        .map_err(|e| TelemetryError::AlreadyInitialized(e.to_string()))?;

    tracing::info!(service.name = service_name, "telemetry initialized");
    Ok(())
}

/// Like [`init_telemetry`], but emits one JSON object per line.
///
/// # Errors
///
/// Returns [`TelemetryError::AlreadyInitialized`] if a global subscriber exists.
pub fn init_json_telemetry(service_name: &str) -> Result<(), TelemetryError> {
    tracing_subscriber::registry()
        .with(env_filter())
        .with(fmt::layer().json().with_current_span(true))
        .try_init()
        .map_err(|e| TelemetryError::AlreadyInitialized(e.to_string()))?;

    tracing::info!(service.name = service_name, "telemetry initialized");
    Ok(())
}

/// Install a global subscriber that logs like [`init_telemetry`] and also
/// captures pipeline spans into `storage`.
///
/// # Errors
///
/// Returns [`TelemetryError::AlreadyInitialized`] if a global subscriber exists.
pub fn init_with_storage(
    service_name: &str,
    storage: Arc<SharedTraceStorage>,
) -> Result<(), TelemetryError> {
    tracing_subscriber::registry()
        .with(env_filter())
        .with(fmt::layer().with_target(true))
        .with(InMemoryTraceLayer::new(storage))
        .try_init()
        .map_err(|e| TelemetryError::AlreadyInitialized(e.to_string()))?;

    tracing::info!(service.name = service_name, "telemetry initialized with span capture");
    Ok(())
}

/// A subscriber that only captures spans into `storage`, for scoped use with
/// [`tracing::subscriber::with_default`] or `set_default`.
pub fn capture_subscriber(
    storage: Arc<SharedTraceStorage>,
) -> impl Subscriber + for<'a> LookupSpan<'a> + Send + Sync {
    tracing_subscriber::registry().with(InMemoryTraceLayer::new(storage))
}
