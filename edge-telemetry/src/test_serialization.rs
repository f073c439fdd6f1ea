use std::collections::HashMap;

use crate::memory::SpanData;

#[test]
fn span_data_serialization() {
    let mut attributes = HashMap::new();
    attributes.insert("pipeline.id".to_string(), serde_json::json!("pipe-1"));

    let span = SpanData {
        span_id: "000000000000002a".to_string(),
        parent_span_id: None,
        name: "rag.retrieval".to_string(),
        start_time: 1234567890000000000,
        end_time: 1234567890000001000,
        duration_ms: 0.001,
        attributes,
    };

    let json: serde_json::Value = serde_json::to_value(&span).unwrap();
    assert_eq!(json["span_id"], "000000000000002a");
    assert_eq!(json["name"], "rag.retrieval");
    assert_eq!(json["attributes"]["pipeline.id"], "pipe-1");
    assert!(json.get("parent_span_id").is_none());
}
