use serde::Serialize;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use std::time::{Instant, SystemTime};
use tracing::{Id, Subscriber};
use tracing_subscriber::{Layer, layer::Context, registry::LookupSpan};

/// Span field that groups captured spans. Child spans inherit it from their
/// parent when they do not set it themselves.
pub const PIPELINE_ID_FIELD: &str = "pipeline.id";

/// Data for a captured span
#[derive(Debug, Clone, Serialize)]
pub struct SpanData {
    pub span_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent_span_id: Option<String>,
    pub name: String,

    /// Nanoseconds since the Unix epoch.
    pub start_time: u128,
    pub end_time: u128,

    /// Monotonic wall-clock duration between span creation and close.
    pub duration_ms: f64,

    pub attributes: HashMap<String, serde_json::Value>,
}

impl SpanData {
    /// A captured field value.
    pub fn attribute(&self, key: &str) -> Option<&serde_json::Value> {
        self.attributes.get(key)
    }
}

/// Shared storage for captured spans, keyed by pipeline id.
#[derive(Debug, Clone, Default)]
pub struct SharedTraceStorage {
    traces: Arc<RwLock<HashMap<String, Vec<SpanData>>>>,
}

impl SharedTraceStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// All closed spans recorded under `key`, in close order.
    pub fn get_trace(&self, key: &str) -> Option<Vec<SpanData>> {
        self.traces.read().ok()?.get(key).cloned()
    }

    /// Closed spans under `key` with the given span name.
    pub fn spans_named(&self, key: &str, name: &str) -> Vec<SpanData> {
        self.get_trace(key)
            .unwrap_or_default()
            .into_iter()
            .filter(|span| span.name == name)
            .collect()
    }

    pub fn add_span(&self, key: String, span: SpanData) {
        if let Ok(mut traces) = self.traces.write() {
            traces.entry(key).or_default().push(span);
        }
    }

    /// Keys that have at least one captured span.
    pub fn keys(&self) -> Vec<String> {
        self.traces.read().map(|traces| traces.keys().cloned().collect()).unwrap_or_default()
    }

    /// Forget every captured span.
    pub fn clear(&self) {
        if let Ok(mut traces) = self.traces.write() {
            traces.clear();
        }
    }
}

/// A tracing layer that captures spans carrying `pipeline.id` in memory
pub struct InMemoryTraceLayer {
    storage: Arc<SharedTraceStorage>,
}

impl InMemoryTraceLayer {
    pub fn new(storage: Arc<SharedTraceStorage>) -> Self {
        Self { storage }
    }
}

#[derive(Clone)]
struct SpanFields(HashMap<String, serde_json::Value>);

#[derive(Clone, Copy)]
struct SpanStart {
    at: Instant,
    unix_nanos: u128,
}

fn unix_nanos() -> u128 {
    SystemTime::now().duration_since(SystemTime::UNIX_EPOCH).unwrap_or_default().as_nanos()
}

impl<S> Layer<S> for InMemoryTraceLayer
where
    S: Subscriber + for<'a> LookupSpan<'a>,
{
    fn on_new_span(&self, attrs: &tracing::span::Attributes<'_>, id: &Id, ctx: Context<'_, S>) {
        let Some(span) = ctx.span(id) else {
            return;
        };

        let mut visitor = JsonVisitor::default();
        attrs.record(&mut visitor);
        let mut fields = visitor.0;

        if !fields.contains_key(PIPELINE_ID_FIELD) {
            let inherited = span.parent().and_then(|parent| {
                let extensions = parent.extensions();
                let value = extensions
                    .get::<SpanFields>()
                    .and_then(|f| f.0.get(PIPELINE_ID_FIELD).cloned());
                value
            });
            if let Some(value) = inherited {
                fields.insert(PIPELINE_ID_FIELD.to_string(), value);
            }
        }

        let mut extensions = span.extensions_mut();
        extensions.insert(SpanStart { at: Instant::now(), unix_nanos: unix_nanos() });
        extensions.insert(SpanFields(fields));
    }

    fn on_record(&self, id: &Id, values: &tracing::span::Record<'_>, ctx: Context<'_, S>) {
        let Some(span) = ctx.span(id) else {
            return;
        };
        let mut extensions = span.extensions_mut();
        if let Some(fields) = extensions.get_mut::<SpanFields>() {
            let mut visitor = JsonVisitor::default();
            values.record(&mut visitor);
            fields.0.extend(visitor.0);
        }
    }

    fn on_close(&self, id: Id, ctx: Context<'_, S>) {
        let Some(span) = ctx.span(&id) else {
            return;
        };
        let extensions = span.extensions();

        let Some(fields) = extensions.get::<SpanFields>() else {
            return;
        };
        let key = fields.0.get(PIPELINE_ID_FIELD).and_then(|v| v.as_str()).map(str::to_string);
        let Some(key) = key else {
            return;
        };

        let start = extensions.get::<SpanStart>().copied();
        let span_data = SpanData {
            span_id: format!("{:016x}", id.into_u64()),
            parent_span_id: span.parent().map(|p| format!("{:016x}", p.id().into_u64())),
            name: span.metadata().name().to_string(),
            start_time: start.map(|s| s.unix_nanos).unwrap_or_default(),
            end_time: unix_nanos(),
            duration_ms: start.map(|s| s.at.elapsed().as_secs_f64() * 1000.0).unwrap_or_default(),
            attributes: fields.0.clone(),
        };

        self.storage.add_span(key, span_data);
    }
}

#[derive(Default)]
struct JsonVisitor(HashMap<String, serde_json::Value>);

impl tracing::field::Visit for JsonVisitor {
    fn record_debug(&mut self, field: &tracing::field::Field, value: &dyn std::fmt::Debug) {
        self.0.insert(field.name().to_string(), serde_json::Value::String(format!("{:?}", value)));
    }

    fn record_str(&mut self, field: &tracing::field::Field, value: &str) {
        self.0.insert(field.name().to_string(), serde_json::Value::String(value.to_string()));
    }

    fn record_bool(&mut self, field: &tracing::field::Field, value: bool) {
        self.0.insert(field.name().to_string(), serde_json::Value::Bool(value));
    }

    fn record_i64(&mut self, field: &tracing::field::Field, value: i64) {
        self.0.insert(field.name().to_string(), serde_json::json!(value));
    }

    fn record_u64(&mut self, field: &tracing::field::Field, value: u64) {
        self.0.insert(field.name().to_string(), serde_json::json!(value));
    }

    fn record_f64(&mut self, field: &tracing::field::Field, value: f64) {
        self.0.insert(field.name().to_string(), serde_json::json!(value));
    }
}
