//! Request and response types for the two public operations.
//!
//! All types are serde-serializable so any transport can carry them as-is.
//! The `from_json` constructors validate raw payloads field by field, so a
//! malformed request names the field that is wrong.

use autocontext_core::{
    ContextResult, EntryId, FilterCondition, Filters, Metadata, ValidationError,
};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AddEntryRequest {
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Metadata>,
}

impl AddEntryRequest {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            metadata: None,
        }
    }

    pub fn with_metadata(mut self, metadata: Metadata) -> Self {
        self.metadata = Some(metadata);
        self
    }

    pub fn from_json(payload: &Value) -> Result<Self, ValidationError> {
        const OP: &str = "add_entry";
        let fields = object(OP, payload, &["text", "metadata"])?;
        Ok(Self {
            text: required_string(OP, fields, "text")?,
            metadata: optional_field(
                OP,
                fields,
                "metadata",
                "must map keys to scalar values (bool, integer, float or string)",
            )?,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddEntryResponse {
    pub id: EntryId,
    /// `false` when identical text was already stored.
    pub created: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GetEntryRequest {
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_entries: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filters: Option<Filters>,
}

impl GetEntryRequest {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            max_tokens: None,
            max_entries: None,
            filters: None,
        }
    }

    pub fn with_max_tokens(mut self, max_tokens: usize) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }

    pub fn with_max_entries(mut self, max_entries: usize) -> Self {
        self.max_entries = Some(max_entries);
        self
    }

    pub fn with_filter(mut self, key: impl Into<String>, condition: FilterCondition) -> Self {
        self.filters
            .get_or_insert_with(Filters::new)
            .insert(key.into(), condition);
        self
    }

    pub fn from_json(payload: &Value) -> Result<Self, ValidationError> {
        const OP: &str = "get_entry";
        let fields = object(OP, payload, &["text", "max_tokens", "max_entries", "filters"])?;
        Ok(Self {
            text: required_string(OP, fields, "text")?,
            max_tokens: optional_count(OP, fields, "max_tokens")?,
            max_entries: optional_count(OP, fields, "max_entries")?,
            filters: optional_field(
                OP,
                fields,
                "filters",
                "must map keys to a scalar or a range object {gt, gte, lt, lte}",
            )?,
        })
    }
}

/// One selected entry in a [`GetEntryResponse`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetrievedEntry {
    pub id: EntryId,
    pub text: String,
    pub score: f32,
    #[serde(default)]
    pub metadata: Metadata,
    pub token_count: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GetEntryResponse {
    /// Selected entries, most relevant first.
    pub entries: Vec<RetrievedEntry>,
    pub cumulative_tokens: usize,
    /// The selected entries rendered as one attributed text payload.
    pub context: String,
}

impl GetEntryResponse {
    pub fn from_result(result: ContextResult, context: String) -> Self {
        Self {
            entries: result
                .entries
                .into_iter()
                .map(|s| RetrievedEntry {
                    id: s.entry.id,
                    text: s.entry.text.to_string(),
                    score: s.score,
                    metadata: s.entry.metadata,
                    token_count: s.entry.token_count,
                })
                .collect(),
            cumulative_tokens: result.cumulative_tokens,
            context,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

// ── Payload validation ────────────────────────────────────────────────────

fn object<'a>(
    op: &'static str,
    payload: &'a Value,
    known: &[&str],
) -> Result<&'a Map<String, Value>, ValidationError> {
    let fields = payload
        .as_object()
        .ok_or_else(|| ValidationError::new(op, "payload", "must be a JSON object"))?;
    if let Some(unknown) = fields.keys().find(|k| !known.contains(&k.as_str())) {
        return Err(ValidationError::new(op, unknown.as_str(), "is not a recognized field"));
    }
    Ok(fields)
}

fn required_string(
    op: &'static str,
    fields: &Map<String, Value>,
    field: &str,
) -> Result<String, ValidationError> {
    match fields.get(field) {
        None | Some(Value::Null) => Err(ValidationError::new(op, field, "is required")),
        Some(Value::String(s)) => Ok(s.clone()),
        Some(_) => Err(ValidationError::new(op, field, "must be a string")),
    }
}

fn optional_count(
    op: &'static str,
    fields: &Map<String, Value>,
    field: &str,
) -> Result<Option<usize>, ValidationError> {
    match fields.get(field) {
        None | Some(Value::Null) => Ok(None),
        Some(value) => value
            .as_u64()
            .and_then(|n| usize::try_from(n).ok())
            .map(Some)
            .ok_or_else(|| ValidationError::new(op, field, "must be a non-negative integer")),
    }
}

fn optional_field<T: DeserializeOwned>(
    op: &'static str,
    fields: &Map<String, Value>,
    field: &str,
    expected: &str,
) -> Result<Option<T>, ValidationError> {
    match fields.get(field) {
        None | Some(Value::Null) => Ok(None),
        Some(value) => serde_json::from_value(value.clone())
            .map(Some)
            .map_err(|_| ValidationError::new(op, field, expected)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use autocontext_core::MetadataValue;
    use serde_json::json;

    #[test]
    fn add_request_from_json() {
        let req = AddEntryRequest::from_json(&json!({
            "text": "Rust ownership",
            "metadata": {"source": "book", "chapter": 4}
        }))
        .unwrap();
        assert_eq!(req.text, "Rust ownership");
        let metadata = req.metadata.unwrap();
        assert_eq!(metadata["chapter"], MetadataValue::Int(4));
    }

    #[test]
    fn add_request_field_errors() {
        let err = AddEntryRequest::from_json(&json!("just text")).unwrap_err();
        assert_eq!(err.field, "payload");

        let err = AddEntryRequest::from_json(&json!({})).unwrap_err();
        assert_eq!((err.field.as_str(), err.reason.as_str()), ("text", "is required"));

        let err = AddEntryRequest::from_json(&json!({"text": 42})).unwrap_err();
        assert_eq!(err.reason, "must be a string");

        let err =
            AddEntryRequest::from_json(&json!({"text": "x", "metadata": {"a": [1, 2]}})).unwrap_err();
        assert_eq!(err.field, "metadata");
        assert_eq!(err.operation, "add_entry");

        let err = AddEntryRequest::from_json(&json!({"text": "x", "tags": []})).unwrap_err();
        assert_eq!(err.field, "tags");
    }

    #[test]
    fn get_request_from_json() {
        let req = GetEntryRequest::from_json(&json!({
            "text": "ownership",
            "max_tokens": 256,
            "filters": {"source": "book", "chapter": {"gte": 2}}
        }))
        .unwrap();
        assert_eq!(req.max_tokens, Some(256));
        assert_eq!(req.max_entries, None);
        let filters = req.filters.unwrap();
        assert!(matches!(filters["chapter"], FilterCondition::Range(_)));
    }

    #[test]
    fn get_request_field_errors() {
        let err = GetEntryRequest::from_json(&json!({"text": "q", "max_tokens": -5})).unwrap_err();
        assert_eq!(err.field, "max_tokens");
        assert_eq!(err.operation, "get_entry");

        let err = GetEntryRequest::from_json(&json!({"text": "q", "max_entries": 1.5})).unwrap_err();
        assert_eq!(err.field, "max_entries");

        let err = GetEntryRequest::from_json(&json!({"text": "q", "filters": {"a": {"between": 1}}}))
            .unwrap_err();
        assert_eq!(err.field, "filters");
    }

    #[test]
    fn builders_compose() {
        let req = GetEntryRequest::new("q")
            .with_max_tokens(10)
            .with_max_entries(2)
            .with_filter("source", FilterCondition::Equals("wiki".into()));
        assert_eq!(req.max_tokens, Some(10));
        assert_eq!(req.filters.unwrap().len(), 1);
    }

    #[test]
    fn empty_response_serializes_all_fields() {
        let value = serde_json::to_value(GetEntryResponse::default()).unwrap();
        assert_eq!(value, json!({"entries": [], "cumulative_tokens": 0, "context": ""}));
    }
}
