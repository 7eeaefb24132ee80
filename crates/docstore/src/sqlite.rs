//! SQLite document store.

use std::str::FromStr;

use async_trait::async_trait;
use serde_json::{Map, Value};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{FromRow, SqlitePool};
use tracing::{debug, info};
use uuid::Uuid;

use heat_common::{HeatError, HeatResult};

use crate::store::{into_object, not_found, shallow_merge, Document, DocumentStore};

/// One row per document, data kept as JSON text.
pub struct SqliteDocumentStore {
    pool: SqlitePool,
}

#[derive(FromRow)]
struct DocumentRow {
    id: String,
    data: String,
}

impl TryFrom<DocumentRow> for Document {
    type Error = HeatError;

    fn try_from(row: DocumentRow) -> HeatResult<Self> {
        let data: Map<String, Value> = serde_json::from_str(&row.data)
            .map_err(|e| HeatError::Storage(format!("Corrupt document {}: {e}", row.id)))?;
        Ok(Document { id: row.id, data })
    }
}

fn db_error(action: &str) -> impl Fn(sqlx::Error) -> HeatError + '_ {
    move |e| HeatError::Storage(format!("{action} failed: {e}"))
}

impl SqliteDocumentStore {
    /// Connect to `database_url`, creating the file if needed.
    ///
    /// In-memory databases exist per connection, so they get a pool of one.
    pub async fn connect(database_url: &str) -> HeatResult<Self> {
        let options = SqliteConnectOptions::from_str(database_url)
            .map_err(|e| HeatError::Configuration(format!("Invalid database URL {database_url}: {e}")))?
            .create_if_missing(true);
        let max_connections = if database_url.contains(":memory:") { 1 } else { 5 };

        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .connect_with(options)
            .await
            .map_err(db_error("Connection"))?;

        info!(database_url, max_connections, "Connected document store");
        Ok(Self { pool })
    }

    /// Create the schema if it does not exist yet.
    pub async fn migrate(&self) -> HeatResult<()> {
        for statement in SCHEMA_SQL.split(';') {
            let trimmed = statement.trim();
            if !trimmed.is_empty() {
                sqlx::query(trimmed)
                    .execute(&self.pool)
                    .await
                    .map_err(db_error("Migration"))?;
            }
        }
        Ok(())
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

/// `$."field"`, quoted so any key name is a single path step.
fn json_path(field: &str) -> String {
    format!("$.\"{}\"", field.replace('"', "\\\""))
}

#[async_trait]
impl DocumentStore for SqliteDocumentStore {
    async fn add(&self, collection: &str, data: Value) -> HeatResult<String> {
        let data = into_object(data)?;
        let id = Uuid::new_v4().to_string();

        sqlx::query("INSERT INTO documents (collection, id, data) VALUES (?, ?, ?)")
            .bind(collection)
            .bind(&id)
            .bind(Value::Object(data).to_string())
            .execute(&self.pool)
            .await
            .map_err(db_error("Insert"))?;

        debug!(collection, id = %id, "Document added");
        Ok(id)
    }

    async fn get(&self, collection: &str, id: &str) -> HeatResult<Option<Document>> {
        let row = sqlx::query_as::<_, DocumentRow>("SELECT id, data FROM documents WHERE collection = ? AND id = ?")
            .bind(collection)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_error("Select"))?;
        row.map(Document::try_from).transpose()
    }

    async fn list(&self, collection: &str) -> HeatResult<Vec<Document>> {
        let rows = sqlx::query_as::<_, DocumentRow>(
            "SELECT id, data FROM documents WHERE collection = ? ORDER BY rowid",
        )
        .bind(collection)
        .fetch_all(&self.pool)
        .await
        .map_err(db_error("Select"))?;
        rows.into_iter().map(Document::try_from).collect()
    }

    async fn query_eq(&self, collection: &str, field: &str, value: &Value) -> HeatResult<Vec<Document>> {
        // Matching JSON types first keeps `true` apart from `1`. A missing field
        // has no type, so only a stored `null` matches a `null` value.
        let rows = sqlx::query_as::<_, DocumentRow>(
            r#"
            SELECT id, data FROM documents
            WHERE collection = ?1
              AND json_type(data, ?2) = json_type(?3, '$')
              AND json_extract(data, ?2) IS json_extract(?3, '$')
            ORDER BY rowid
            "#,
        )
        .bind(collection)
        .bind(json_path(field))
        .bind(value.to_string())
        .fetch_all(&self.pool)
        .await
        .map_err(db_error("Query"))?;
        rows.into_iter().map(Document::try_from).collect()
    }

    async fn update(&self, collection: &str, id: &str, patch: Value) -> HeatResult<Document> {
        let patch = into_object(patch)?;
        let mut tx = self.pool.begin().await.map_err(db_error("Transaction"))?;

        let row = sqlx::query_as::<_, DocumentRow>("SELECT id, data FROM documents WHERE collection = ? AND id = ?")
            .bind(collection)
            .bind(id)
            .fetch_optional(&mut *tx)
            .await
            .map_err(db_error("Select"))?
            .ok_or_else(|| not_found(collection, id))?;

        let mut doc = Document::try_from(row)?;
        shallow_merge(&mut doc.data, patch);

        sqlx::query("UPDATE documents SET data = ? WHERE collection = ? AND id = ?")
            .bind(Value::Object(doc.data.clone()).to_string())
            .bind(collection)
            .bind(id)
            .execute(&mut *tx)
            .await
            .map_err(db_error("Update"))?;
        tx.commit().await.map_err(db_error("Commit"))?;

        debug!(collection, id, "Document updated");
        Ok(doc)
    }

    async fn delete(&self, collection: &str, id: &str) -> HeatResult<bool> {
        let result = sqlx::query("DELETE FROM documents WHERE collection = ? AND id = ?")
            .bind(collection)
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(db_error("Delete"))?;
        Ok(result.rows_affected() > 0)
    }
}

/// Database schema SQL.
const SCHEMA_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS documents (
    collection TEXT NOT NULL,
    id TEXT NOT NULL,
    data TEXT NOT NULL,
    created_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP,

    PRIMARY KEY (collection, id)
);

CREATE INDEX IF NOT EXISTS idx_documents_collection ON documents(collection)
"#;
