//! Data types for chunks, search results, and document metadata.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{RagError, Result};

/// Number of leading characters of a document copied into each chunk's
/// `source_text` metadata field.
pub const SOURCE_PREVIEW_CHARS: usize = 100;

/// A segment of a document, the unit of indexing and retrieval.
///
/// Chunks are immutable once created. The embedding lives in the index entry,
/// not here.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Chunk {
    /// Identifier unique within the index's lifetime (`chunk_{n}`).
    pub id: String,
    /// The text content of the chunk.
    pub text: String,
    /// Document metadata plus chunk-specific fields.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Value>,
    /// Ordinal of the source document among all documents added since the
    /// last clear.
    pub source_document_index: usize,
}

/// A retrieved chunk paired with its cosine similarity to the query.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SearchResult {
    /// ID of the retrieved chunk.
    pub chunk_id: String,
    /// Text of the retrieved chunk.
    pub text: String,
    /// Cosine similarity in `[-1, 1]`; higher is more relevant.
    pub similarity_score: f32,
    /// Metadata of the retrieved chunk.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Value>,
}

/// Parse caller-supplied metadata JSON.
///
/// # Errors
///
/// Returns [`RagError::InvalidInput`] if the text is not JSON or is not an
/// object (or `null`).
pub fn parse_metadata(json: &str) -> Result<Option<Value>> {
    let value: Value = serde_json::from_str(json)
        .map_err(|e| RagError::InvalidInput(format!("malformed metadata JSON: {e}")))?;
    check_metadata(value)
}

/// Accept an object or `null` as document metadata.
///
/// # Errors
///
/// Returns [`RagError::InvalidInput`] for any other JSON value.
pub fn check_metadata(value: Value) -> Result<Option<Value>> {
    match value {
        Value::Null => Ok(None),
        Value::Object(_) => Ok(Some(value)),
        other => Err(RagError::InvalidInput(format!(
            "metadata must be a JSON object, got {}",
            json_kind(&other)
        ))),
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

/// The first [`SOURCE_PREVIEW_CHARS`] characters of a document.
pub fn source_preview(text: &str) -> String {
    text.chars().take(SOURCE_PREVIEW_CHARS).collect()
}

/// Metadata stored on a chunk: the document's fields plus `chunk_index` and
/// `source_text`.
pub fn chunk_metadata(document: Option<&Value>, chunk_index: usize, preview: &str) -> Value {
    let mut fields = match document {
        Some(Value::Object(map)) => map.clone(),
        _ => Map::new(),
    };
    fields.insert("chunk_index".to_string(), Value::from(chunk_index));
    fields.insert("source_text".to_string(), Value::from(preview));
    Value::Object(fields)
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn parses_object_and_null_metadata() {
        assert_eq!(
            parse_metadata(r#"{"title": "Guide"}"#).unwrap(),
            Some(json!({"title": "Guide"}))
        );
        assert_eq!(parse_metadata("null").unwrap(), None);
    }

    #[test]
    fn rejects_malformed_or_non_object_metadata() {
        assert!(matches!(parse_metadata("{oops"), Err(RagError::InvalidInput(_))));
        let err = parse_metadata("[1, 2]").unwrap_err();
        assert_eq!(err.to_string(), "Invalid input: metadata must be a JSON object, got an array");
    }

    #[test]
    fn chunk_metadata_merges_document_fields() {
        let doc = json!({"title": "Guide", "lang": "en"});
        let meta = chunk_metadata(Some(&doc), 2, "Intro text");
        assert_eq!(meta["title"], "Guide");
        assert_eq!(meta["lang"], "en");
        assert_eq!(meta["chunk_index"], 2);
        assert_eq!(meta["source_text"], "Intro text");

        let bare = chunk_metadata(None, 0, "");
        assert_eq!(bare, json!({"chunk_index": 0, "source_text": ""}));
    }

    #[test]
    fn preview_is_bounded_by_characters() {
        let long = "é".repeat(250);
        assert_eq!(source_preview(&long).chars().count(), SOURCE_PREVIEW_CHARS);
        assert_eq!(source_preview("short"), "short");
    }
}
