//! Global JSON logging. Kept in its own test binary since a process can
//! install only one global subscriber.

use edge_telemetry::{TelemetryError, init_json_telemetry, init_telemetry};

#[test]
fn json_logging_installs_once() {
    init_json_telemetry("json-host").unwrap();
    tracing::info!(pipeline.id = "pipe-json", chunk_count = 3u64, "ingested document");

    assert!(matches!(init_json_telemetry("json-host"), Err(TelemetryError::AlreadyInitialized(_))));
    assert!(matches!(init_telemetry("plain-host"), Err(TelemetryError::AlreadyInitialized(_))));
}
