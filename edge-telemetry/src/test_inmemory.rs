use std::sync::Arc;
use std::time::Duration;

use tracing::{Instrument, info_span};

use crate::memory::SharedTraceStorage;

#[test]
fn captures_spans_under_pipeline_id() {
    let storage = Arc::new(SharedTraceStorage::new());
    let subscriber = crate::capture_subscriber(storage.clone());

    tracing::subscriber::with_default(subscriber, || {
        let span = info_span!("rag.query", pipeline.id = "pipe-123", top_k = 3u64);
        let _guard = span.enter();
        tracing::info!("query running");
    });

    let spans = storage.get_trace("pipe-123").expect("spans under pipeline id");
    assert_eq!(spans.len(), 1);

    let span = &spans[0];
    assert_eq!(span.name, "rag.query");
    assert_eq!(span.attribute("top_k"), Some(&serde_json::json!(3)));
    assert!(span.start_time > 0);
    assert!(span.end_time >= span.start_time);
    assert!(span.duration_ms >= 0.0);
}

#[test]
fn child_spans_inherit_pipeline_id() {
    let storage = Arc::new(SharedTraceStorage::new());
    let subscriber = crate::capture_subscriber(storage.clone());

    tracing::subscriber::with_default(subscriber, || {
        let parent = info_span!("rag.query", pipeline.id = "pipe-7");
        let _parent = parent.enter();
        let child = info_span!("rag.retrieval");
        let _child = child.enter();
    });

    let retrieval = storage.spans_named("pipe-7", "rag.retrieval");
    assert_eq!(retrieval.len(), 1);
    assert!(retrieval[0].parent_span_id.is_some());
    assert_eq!(storage.spans_named("pipe-7", "rag.query").len(), 1);
}

#[test]
fn spans_without_pipeline_id_are_ignored() {
    let storage = Arc::new(SharedTraceStorage::new());
    let subscriber = crate::capture_subscriber(storage.clone());

    tracing::subscriber::with_default(subscriber, || {
        let span = info_span!("unrelated.work", job = "x");
        let _guard = span.enter();
    });

    assert!(storage.keys().is_empty());
}

#[test]
fn recorded_fields_are_merged() {
    let storage = Arc::new(SharedTraceStorage::new());
    let subscriber = crate::capture_subscriber(storage.clone());

    tracing::subscriber::with_default(subscriber, || {
        let span =
            info_span!("rag.generation", pipeline.id = "pipe-9", tokens = tracing::field::Empty);
        span.record("tokens", 42u64);
        let _guard = span.enter();
    });

    let spans = storage.spans_named("pipe-9", "rag.generation");
    assert_eq!(spans[0].attribute("tokens"), Some(&serde_json::json!(42)));
}

#[test]
fn clear_forgets_captured_spans() {
    let storage = SharedTraceStorage::new();
    storage.add_span(
        "pipe-1".to_string(),
        crate::SpanData {
            span_id: "0000000000000001".to_string(),
            parent_span_id: None,
            name: "rag.clear".to_string(),
            start_time: 1,
            end_time: 2,
            duration_ms: 0.001,
            attributes: Default::default(),
        },
    );
    assert_eq!(storage.keys(), vec!["pipe-1".to_string()]);

    storage.clear();
    assert!(storage.get_trace("pipe-1").is_none());
}

#[tokio::test]
async fn global_init_captures_async_spans() {
    let storage = Arc::new(SharedTraceStorage::new());
    let result = crate::init_with_storage("test-service", storage.clone());
    assert!(result.is_ok());

    async {
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    .instrument(info_span!("rag.add_document", pipeline.id = "pipe-async"))
    .await;

    let spans = storage.spans_named("pipe-async", "rag.add_document");
    assert_eq!(spans.len(), 1);
    assert!(spans[0].duration_ms >= 5.0);

    assert!(crate::init_telemetry("second").is_err());
}
