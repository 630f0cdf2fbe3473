use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{Row, SqlitePool};
use tracing::debug;

use crate::error::{Result, StockroomError};
use crate::models::group_sync::{SyncAuditRecord, SyncOutcomeStatus};

use super::repository::{GroupSyncAuditRepository, StockroomRepository};

#[derive(Clone)]
pub struct SqliteRepository {
    pool: SqlitePool,
}

impl SqliteRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

impl StockroomRepository for SqliteRepository {}

// -- Helpers --

fn parse_datetime(s: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|_| Utc::now())
}

fn datetime_to_str(dt: &DateTime<Utc>) -> String {
    dt.to_rfc3339()
}

fn list_to_json(items: &[String]) -> Result<String> {
    serde_json::to_string(items).map_err(|e| StockroomError::Serialization(e.to_string()))
}

fn json_to_list(s: &str) -> Vec<String> {
    serde_json::from_str(s).unwrap_or_default()
}

fn row_to_audit_record(r: &sqlx::sqlite::SqliteRow) -> SyncAuditRecord {
    let created: String = r.get("created_at");
    let status: String = r.get("status");
    let added: String = r.get("groups_added");
    let removed: String = r.get("groups_removed");
    let skipped: String = r.get("groups_skipped");
    let failed: String = r.get("groups_failed");
    SyncAuditRecord {
        id: Some(r.get("id")),
        executor: r.get("executor"),
        executor_ip: r.get("executor_ip"),
        from_user: r.get("from_user"),
        to_user: r.get("to_user"),
        target_dn: r.get("target_dn"),
        status: SyncOutcomeStatus::parse(&status),
        timestamp: parse_datetime(&created),
        groups_added: json_to_list(&added),
        groups_removed: json_to_list(&removed),
        groups_skipped: json_to_list(&skipped),
        groups_failed: json_to_list(&failed),
    }
}

// -- GroupSyncAuditRepository --

#[async_trait]
impl GroupSyncAuditRepository for SqliteRepository {
    async fn record_group_sync(&self, record: &SyncAuditRecord) -> Result<String> {
        let id = record
            .id
            .clone()
            .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());

        sqlx::query(
            "INSERT INTO group_sync_audit (id, executor, executor_ip, from_user, to_user, target_dn, status, created_at, groups_added, groups_removed, groups_skipped, groups_failed)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)",
        )
        .bind(&id)
        .bind(&record.executor)
        .bind(&record.executor_ip)
        .bind(&record.from_user)
        .bind(&record.to_user)
        .bind(&record.target_dn)
        .bind(record.status.as_str())
        .bind(datetime_to_str(&record.timestamp))
        .bind(list_to_json(&record.groups_added)?)
        .bind(list_to_json(&record.groups_removed)?)
        .bind(list_to_json(&record.groups_skipped)?)
        .bind(list_to_json(&record.groups_failed)?)
        .execute(&self.pool)
        .await?;

        debug!(id = %id, status = record.status.as_str(), "group sync audit recorded");
        Ok(id)
    }

    async fn get_group_sync(&self, id: &str) -> Result<Option<SyncAuditRecord>> {
        let row = sqlx::query("SELECT * FROM group_sync_audit WHERE id = ?1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.as_ref().map(row_to_audit_record))
    }

    async fn list_group_syncs(&self, limit: i64) -> Result<Vec<SyncAuditRecord>> {
        let rows = sqlx::query(
            "SELECT * FROM group_sync_audit ORDER BY created_at DESC, rowid DESC LIMIT ?1",
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.iter().map(row_to_audit_record).collect())
    }

    async fn list_group_syncs_for_user(
        &self,
        username: &str,
        limit: i64,
    ) -> Result<Vec<SyncAuditRecord>> {
        let rows = sqlx::query(
            "SELECT * FROM group_sync_audit
             WHERE from_user = ?1 COLLATE NOCASE OR to_user = ?1 COLLATE NOCASE
             ORDER BY created_at DESC, rowid DESC LIMIT ?2",
        )
        .bind(username)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.iter().map(row_to_audit_record).collect())
    }
}
