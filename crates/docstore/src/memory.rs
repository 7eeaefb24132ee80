//! In-process document store.

use std::collections::HashMap;

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::RwLock;
use uuid::Uuid;

use heat_common::HeatResult;

use crate::store::{into_object, not_found, shallow_merge, Document, DocumentStore};

/// Documents held in memory, per collection in insertion order.
#[derive(Default)]
pub struct MemoryDocumentStore {
    collections: RwLock<HashMap<String, Vec<Document>>>,
}

impl MemoryDocumentStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl DocumentStore for MemoryDocumentStore {
    async fn add(&self, collection: &str, data: Value) -> HeatResult<String> {
        let data = into_object(data)?;
        let id = Uuid::new_v4().to_string();
        self.collections
            .write()
            .await
            .entry(collection.to_string())
            .or_default()
            .push(Document { id: id.clone(), data });
        Ok(id)
    }

    async fn get(&self, collection: &str, id: &str) -> HeatResult<Option<Document>> {
        let collections = self.collections.read().await;
        Ok(collections
            .get(collection)
            .and_then(|docs| docs.iter().find(|d| d.id == id))
            .cloned())
    }

    async fn list(&self, collection: &str) -> HeatResult<Vec<Document>> {
        let collections = self.collections.read().await;
        Ok(collections.get(collection).cloned().unwrap_or_default())
    }

    async fn query_eq(&self, collection: &str, field: &str, value: &Value) -> HeatResult<Vec<Document>> {
        let collections = self.collections.read().await;
        Ok(collections
            .get(collection)
            .map(|docs| {
                docs.iter()
                    .filter(|d| d.data.get(field) == Some(value))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn update(&self, collection: &str, id: &str, patch: Value) -> HeatResult<Document> {
        let patch = into_object(patch)?;
        let mut collections = self.collections.write().await;
        let doc = collections
            .get_mut(collection)
            .and_then(|docs| docs.iter_mut().find(|d| d.id == id))
            .ok_or_else(|| not_found(collection, id))?;
        shallow_merge(&mut doc.data, patch);
        Ok(doc.clone())
    }

    async fn delete(&self, collection: &str, id: &str) -> HeatResult<bool> {
        let mut collections = self.collections.write().await;
        let Some(docs) = collections.get_mut(collection) else {
            return Ok(false);
        };
        let before = docs.len();
        docs.retain(|d| d.id != id);
        Ok(docs.len() != before)
    }
}
