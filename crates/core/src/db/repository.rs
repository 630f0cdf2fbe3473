use async_trait::async_trait;

use crate::error::Result;
use crate::models::group_sync::SyncAuditRecord;

/// Append-only store for group sync audit records.
#[async_trait]
pub trait GroupSyncAuditRepository: Send + Sync {
    /// Persist a record and return its id. An id already set on the record is kept.
    async fn record_group_sync(&self, record: &SyncAuditRecord) -> Result<String>;
    async fn get_group_sync(&self, id: &str) -> Result<Option<SyncAuditRecord>>;
    /// Most recent first.
    async fn list_group_syncs(&self, limit: i64) -> Result<Vec<SyncAuditRecord>>;
    /// Records where `username` was either the reference or the target user, most recent first.
    async fn list_group_syncs_for_user(
        &self,
        username: &str,
        limit: i64,
    ) -> Result<Vec<SyncAuditRecord>>;
}

/// Combined repository trait for all persisted entity types.
pub trait StockroomRepository: GroupSyncAuditRepository {}
