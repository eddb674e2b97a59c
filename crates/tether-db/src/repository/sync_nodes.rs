//! # Sync Node Repository
//!
//! Persisted metadata for every endpoint the store has ever synced with.
//!
//! A row outlives the process: endpoints connected in an earlier run still
//! show up in `list()` until they are deleted.

use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use tracing::debug;

use tether_core::{ConnectOptions, SyncStatus};

use crate::error::{DbError, DbResult};

/// One persisted endpoint.
#[derive(Debug, Clone, PartialEq)]
pub struct SyncNode {
    pub url: String,
    pub protocol: String,
    pub status: SyncStatus,
    pub options: ConnectOptions,
    pub last_error: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// Last time the node reached `Online`.
    pub connected_at: Option<DateTime<Utc>>,
}

#[derive(sqlx::FromRow)]
struct SyncNodeRow {
    url: String,
    protocol: String,
    status: i64,
    options: String,
    last_error: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    connected_at: Option<DateTime<Utc>>,
}

impl TryFrom<SyncNodeRow> for SyncNode {
    type Error = DbError;

    fn try_from(row: SyncNodeRow) -> Result<Self, Self::Error> {
        Ok(SyncNode {
            status: SyncStatus::from_code(row.status)?,
            options: ConnectOptions::from_json(&row.options)?,
            url: row.url,
            protocol: row.protocol,
            last_error: row.last_error,
            created_at: row.created_at,
            updated_at: row.updated_at,
            connected_at: row.connected_at,
        })
    }
}

const SELECT_NODE: &str = r#"
    SELECT url, protocol, status, options, last_error,
           created_at, updated_at, connected_at
    FROM _sync_nodes
"#;

/// Repository for `_sync_nodes`.
#[derive(Debug, Clone)]
pub struct SyncNodeRepository {
    pool: SqlitePool,
}

impl SyncNodeRepository {
    pub fn new(pool: SqlitePool) -> Self {
        SyncNodeRepository { pool }
    }

    /// Inserts or refreshes a node as `Connecting`.
    ///
    /// Clears any previous error and replaces the stored options.
    pub async fn upsert_connecting(
        &self,
        url: &str,
        protocol: &str,
        options: &ConnectOptions,
    ) -> DbResult<()> {
        let now = Utc::now();
        debug!(url = %url, protocol = %protocol, "Upserting sync node");

        sqlx::query(
            r#"
            INSERT INTO _sync_nodes (
                url, protocol, status, options, last_error,
                created_at, updated_at, connected_at
            ) VALUES (?1, ?2, ?3, ?4, NULL, ?5, ?5, NULL)
            ON CONFLICT(url) DO UPDATE SET
                protocol = excluded.protocol,
                status = excluded.status,
                options = excluded.options,
                last_error = NULL,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(url)
        .bind(protocol)
        .bind(SyncStatus::Connecting.code())
        .bind(options.to_json())
        .bind(now)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Updates a node's status.
    ///
    /// ## Returns
    /// `false` if no node exists for `url`.
    pub async fn set_status(
        &self,
        url: &str,
        status: SyncStatus,
        last_error: Option<&str>,
    ) -> DbResult<bool> {
        let now = Utc::now();
        let connected_at = (status == SyncStatus::Online).then_some(now);

        let result = sqlx::query(
            r#"
            UPDATE _sync_nodes SET
                status = ?2,
                last_error = ?3,
                updated_at = ?4,
                connected_at = COALESCE(?5, connected_at)
            WHERE url = ?1
            "#,
        )
        .bind(url)
        .bind(status.code())
        .bind(last_error)
        .bind(now)
        .bind(connected_at)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Gets a node by url.
    pub async fn get(&self, url: &str) -> DbResult<Option<SyncNode>> {
        let row = sqlx::query_as::<_, SyncNodeRow>(&format!("{} WHERE url = ?1", SELECT_NODE))
            .bind(url)
            .fetch_optional(&self.pool)
            .await?;

        row.map(SyncNode::try_from).transpose()
    }

    /// Lists every node, oldest first.
    pub async fn list(&self) -> DbResult<Vec<SyncNode>> {
        let rows = sqlx::query_as::<_, SyncNodeRow>(&format!(
            "{} ORDER BY created_at ASC, url ASC",
            SELECT_NODE
        ))
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(SyncNode::try_from).collect()
    }

    /// Deletes a node.
    ///
    /// ## Returns
    /// `false` if no node existed.
    pub async fn delete(&self, url: &str) -> DbResult<bool> {
        let result = sqlx::query("DELETE FROM _sync_nodes WHERE url = ?1")
            .bind(url)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::{Database, DbConfig};
    use serde_json::json;

    const URL: &str = "https://sync.example/db1";

    async fn repo() -> SyncNodeRepository {
        Database::new(DbConfig::in_memory())
            .await
            .unwrap()
            .sync_nodes()
    }

    #[tokio::test]
    async fn test_upsert_and_get() {
        let repo = repo().await;
        assert!(repo.get(URL).await.unwrap().is_none());

        let options = ConnectOptions::merge(json!({ "batch": 10 }).as_object().cloned());
        repo.upsert_connecting(URL, "tether", &options).await.unwrap();

        let node = repo.get(URL).await.unwrap().unwrap();
        assert_eq!(node.protocol, "tether");
        assert_eq!(node.status, SyncStatus::Connecting);
        assert_eq!(node.options, options);
        assert!(node.connected_at.is_none());
    }

    #[tokio::test]
    async fn test_set_status_tracks_errors_and_connection_time() {
        let repo = repo().await;
        repo.upsert_connecting(URL, "tether", &ConnectOptions::default())
            .await
            .unwrap();

        assert!(repo.set_status(URL, SyncStatus::Online, None).await.unwrap());
        let node = repo.get(URL).await.unwrap().unwrap();
        assert!(node.connected_at.is_some());

        repo.set_status(URL, SyncStatus::Error, Some("401"))
            .await
            .unwrap();
        let node = repo.get(URL).await.unwrap().unwrap();
        assert_eq!(node.status, SyncStatus::Error);
        assert_eq!(node.last_error.as_deref(), Some("401"));
        assert!(node.connected_at.is_some());

        // Reconnecting clears the error.
        repo.upsert_connecting(URL, "tether", &ConnectOptions::default())
            .await
            .unwrap();
        let node = repo.get(URL).await.unwrap().unwrap();
        assert!(node.last_error.is_none());

        assert!(!repo
            .set_status("memory://missing", SyncStatus::Online, None)
            .await
            .unwrap());
    }

    #[tokio::test]
    async fn test_list_and_delete() {
        let repo = repo().await;
        for url in ["memory://a", "memory://b"] {
            repo.upsert_connecting(url, "tether", &ConnectOptions::default())
                .await
                .unwrap();
        }

        assert_eq!(repo.list().await.unwrap().len(), 2);
        assert!(repo.delete("memory://a").await.unwrap());
        assert!(!repo.delete("memory://a").await.unwrap());

        let urls: Vec<String> = repo.list().await.unwrap().into_iter().map(|n| n.url).collect();
        assert_eq!(urls, vec!["memory://b"]);
    }
}
