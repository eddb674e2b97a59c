//! # Document Tables
//!
//! JSON documents stored in a declared store, keyed by one document field.

use serde_json::Value;
use sqlx::SqlitePool;
use tracing::debug;

use tether_core::new_id;

use crate::error::{DbError, DbResult};
use crate::schema::StoreSchema;

/// Handle to one declared store.
#[derive(Debug, Clone)]
pub struct Table {
    pool: SqlitePool,
    store: StoreSchema,
}

impl Table {
    pub fn new(pool: SqlitePool, store: StoreSchema) -> Self {
        Table { pool, store }
    }

    /// Store name.
    pub fn name(&self) -> &str {
        &self.store.name
    }

    /// Inserts or replaces a document.
    ///
    /// A document without its primary key field gets a fresh id from
    /// [`new_id`] written into it.
    ///
    /// ## Returns
    /// The document's key.
    pub async fn put(&self, doc: &Value) -> DbResult<String> {
        let mut doc = doc.clone();
        let fields = doc.as_object_mut().ok_or_else(|| {
            DbError::Serialization(format!("{}: document must be a JSON object", self.store.name))
        })?;

        let key = match fields.get(&self.store.primary_key) {
            Some(Value::String(key)) if !key.is_empty() => key.clone(),
            Some(Value::Number(key)) => key.to_string(),
            None | Some(Value::Null) => {
                let key = new_id();
                fields.insert(self.store.primary_key.clone(), Value::String(key.clone()));
                key
            }
            Some(other) => {
                return Err(DbError::Serialization(format!(
                    "{}: unsupported key {}",
                    self.store.name, other
                )))
            }
        };

        debug!(store = %self.store.name, key = %key, "Putting document");

        sqlx::query(&format!(
            r#"INSERT INTO "{table}" ("{pk}", doc) VALUES (?1, ?2)
               ON CONFLICT("{pk}") DO UPDATE SET doc = excluded.doc"#,
            table = self.store.name,
            pk = self.store.primary_key
        ))
        .bind(&key)
        .bind(serde_json::to_string(&doc)?)
        .execute(&self.pool)
        .await?;

        Ok(key)
    }

    /// Gets a document by key.
    pub async fn get(&self, key: &str) -> DbResult<Option<Value>> {
        let doc: Option<String> = sqlx::query_scalar(&format!(
            r#"SELECT doc FROM "{}" WHERE "{}" = ?1"#,
            self.store.name, self.store.primary_key
        ))
        .bind(key)
        .fetch_optional(&self.pool)
        .await?;

        doc.map(|doc| serde_json::from_str(&doc).map_err(DbError::from))
            .transpose()
    }

    /// Deletes a document. Returns false if it did not exist.
    pub async fn delete(&self, key: &str) -> DbResult<bool> {
        let result = sqlx::query(&format!(
            r#"DELETE FROM "{}" WHERE "{}" = ?1"#,
            self.store.name, self.store.primary_key
        ))
        .bind(key)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Number of documents in the store.
    pub async fn count(&self) -> DbResult<u64> {
        let count: i64 = sqlx::query_scalar(&format!(r#"SELECT COUNT(*) FROM "{}""#, self.store.name))
            .fetch_one(&self.pool)
            .await?;

        Ok(count.max(0) as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::{Database, DbConfig};
    use crate::schema::SchemaVersion;
    use serde_json::json;
    use tether_core::id::is_valid_id;

    async fn friends() -> Table {
        let config = DbConfig::in_memory().version(
            SchemaVersion::new(1)
                .store(StoreSchema::new("friends").index("name"))
                .store(StoreSchema::new("pets").primary_key("tag")),
        );
        Database::new(config).await.unwrap().table("friends").unwrap()
    }

    #[tokio::test]
    async fn test_put_assigns_missing_id() {
        let table = friends().await;
        let key = table.put(&json!({ "name": "Ada" })).await.unwrap();
        assert!(is_valid_id(&key));

        let doc = table.get(&key).await.unwrap().unwrap();
        assert_eq!(doc["id"], json!(key));
        assert_eq!(doc["name"], json!("Ada"));
    }

    #[tokio::test]
    async fn test_put_replaces_existing() {
        let table = friends().await;
        table.put(&json!({ "id": "f1", "name": "Ada" })).await.unwrap();
        table
            .put(&json!({ "id": "f1", "name": "Grace" }))
            .await
            .unwrap();

        assert_eq!(table.count().await.unwrap(), 1);
        let doc = table.get("f1").await.unwrap().unwrap();
        assert_eq!(doc["name"], json!("Grace"));
    }

    #[tokio::test]
    async fn test_delete_and_rejects() {
        let table = friends().await;
        table.put(&json!({ "id": 7 })).await.unwrap();
        assert!(table.delete("7").await.unwrap());
        assert!(!table.delete("7").await.unwrap());
        assert!(table.get("7").await.unwrap().is_none());

        assert!(matches!(
            table.put(&json!(["not", "an", "object"])).await,
            Err(DbError::Serialization(_))
        ));
        assert!(table.put(&json!({ "id": true })).await.is_err());
    }
}
