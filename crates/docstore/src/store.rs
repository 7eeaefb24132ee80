//! The document store seam.

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

use heat_common::{HeatError, HeatResult};

/// A stored JSON object and its id. The id is not part of `data`.
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    pub id: String,
    pub data: Map<String, Value>,
}

impl Document {
    /// Deserialize into a record type that carries its own `id` field.
    pub fn into_record<T: DeserializeOwned>(self) -> HeatResult<T> {
        let mut data = self.data;
        data.insert("id".to_string(), Value::String(self.id.clone()));
        serde_json::from_value(Value::Object(data))
            .map_err(|e| HeatError::Storage(format!("Corrupt document {}: {e}", self.id)))
    }
}

/// Collections of schemaless JSON documents.
///
/// Ids are generated by the store and unique per collection. Within one
/// process every write is visible to the reads that follow it.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Insert a new document and return its id.
    async fn add(&self, collection: &str, data: Value) -> HeatResult<String>;

    async fn get(&self, collection: &str, id: &str) -> HeatResult<Option<Document>>;

    /// Every document, oldest first.
    async fn list(&self, collection: &str) -> HeatResult<Vec<Document>>;

    /// Documents whose top-level `field` equals `value`, oldest first.
    async fn query_eq(&self, collection: &str, field: &str, value: &Value) -> HeatResult<Vec<Document>>;

    /// Shallow-merge `patch` into an existing document and return the result.
    async fn update(&self, collection: &str, id: &str, patch: Value) -> HeatResult<Document>;

    /// Returns whether a document was removed.
    async fn delete(&self, collection: &str, id: &str) -> HeatResult<bool>;
}

/// Require a JSON object; the id is owned by the store, so it is dropped.
pub(crate) fn into_object(value: Value) -> HeatResult<Map<String, Value>> {
    match value {
        Value::Object(mut map) => {
            map.remove("id");
            Ok(map)
        }
        other => Err(HeatError::Storage(format!(
            "Documents must be JSON objects, got {}",
            type_name(&other)
        ))),
    }
}

/// Top-level keys of `patch` replace those of `target`; nested objects are
/// not merged.
pub fn shallow_merge(target: &mut Map<String, Value>, patch: Map<String, Value>) {
    for (key, value) in patch {
        target.insert(key, value);
    }
}

pub(crate) fn not_found(collection: &str, id: &str) -> HeatError {
    HeatError::NotFound {
        collection: collection.to_string(),
        id: id.to_string(),
    }
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_shallow_merge_replaces_nested() {
        let mut target = into_object(json!({ "a": 1, "nested": { "x": 1, "y": 2 } })).unwrap();
        let patch = into_object(json!({ "nested": { "x": 5 }, "b": true })).unwrap();
        shallow_merge(&mut target, patch);
        assert_eq!(Value::Object(target), json!({ "a": 1, "b": true, "nested": { "x": 5 } }));
    }

    #[test]
    fn test_into_object_rejects_scalars_and_drops_id() {
        assert!(into_object(json!([1, 2])).is_err());
        assert!(into_object(json!("x")).is_err());
        let map = into_object(json!({ "id": "forged", "name": "A" })).unwrap();
        assert!(!map.contains_key("id"));
    }
}
