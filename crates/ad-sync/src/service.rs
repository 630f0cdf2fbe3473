//! Group compare & sync service: the operations behind the console API and CLI.

use std::sync::Arc;

use tracing::{debug, info};

use stockroom_core::config::GroupSyncConfig;
use stockroom_core::db::repository::StockroomRepository;
use stockroom_core::error::{Result, StockroomError};
use stockroom_core::http::resolve_executor;
use stockroom_core::models::directory::{DirectoryMembership, DirectoryUser};
use stockroom_core::models::group_sync::{
    ApplyBatchRequest, ApplyBatchResponse, ComparisonResult, SyncAuditRecord,
};

use crate::client::DirectoryClient;
use crate::diff;
use crate::executor::{AuditContext, BatchSyncExecutor};

/// Upper bound on audit rows returned by one listing call.
pub const MAX_AUDIT_LIMIT: i64 = 500;

/// Wires the directory client, diff engine, batch executor and audit repository.
pub struct GroupSyncService<R: StockroomRepository, D: DirectoryClient + ?Sized> {
    repo: Arc<R>,
    directory: Arc<D>,
    executor: BatchSyncExecutor<R, D>,
    config: GroupSyncConfig,
}

impl<R: StockroomRepository, D: DirectoryClient + ?Sized> GroupSyncService<R, D> {
    pub fn new(repo: Arc<R>, directory: Arc<D>, config: GroupSyncConfig) -> Self {
        let executor = BatchSyncExecutor::new(repo.clone(), directory.clone(), config.clone());
        Self {
            repo,
            directory,
            executor,
            config,
        }
    }

    pub fn config(&self) -> &GroupSyncConfig {
        &self.config
    }

    /// Check that the directory can be reached and bound to.
    pub async fn test_connection(&self) -> Result<()> {
        self.directory.test_connection().await
    }

    /// Users matching `query`. Short queries return nothing without a directory round-trip.
    pub async fn search_users(&self, query: &str) -> Result<Vec<DirectoryUser>> {
        let query = query.trim();
        if query.chars().count() < self.config.search_min_query_len {
            debug!(query, "search query below minimum length");
            return Ok(Vec::new());
        }
        self.directory
            .search_users(query, self.config.search_result_limit)
            .await
    }

    /// Resolve both users and partition their group memberships.
    pub async fn compare(
        &self,
        reference_username: &str,
        target_username: &str,
    ) -> Result<ComparisonResult> {
        let reference = self.resolve(reference_username).await?;
        let target = self.resolve(target_username).await?;
        let result = diff::compare(reference, target);

        info!(
            reference = %reference_username,
            target = %target_username,
            shared = result.shared.len(),
            missing = result.missing_in_target.len(),
            extra = result.extra_in_target.len(),
            "group comparison computed"
        );
        Ok(result)
    }

    /// Apply the selected additions and removals to the target user.
    ///
    /// Rejects an empty selection or a blank target DN before anything runs.
    /// Everything after validation is reported through the response, never as an error.
    pub async fn apply_batch(
        &self,
        request: ApplyBatchRequest,
        executor_ip: Option<String>,
    ) -> Result<ApplyBatchResponse> {
        if request.target_user_dn.trim().is_empty() {
            return Err(StockroomError::Validation(
                "targetUserDn must not be empty".into(),
            ));
        }
        if request.groups_to_add.is_empty() && request.groups_to_remove.is_empty() {
            return Err(StockroomError::Validation(
                "no groups selected to add or remove".into(),
            ));
        }

        let context = AuditContext {
            executor: resolve_executor(request.executor.as_deref(), &self.config.default_executor),
            executor_ip,
            from_user: request.from_username,
            to_user: request.to_username,
        };

        Ok(self
            .executor
            .apply(
                &request.target_user_dn,
                &request.groups_to_add,
                &request.groups_to_remove,
                context,
            )
            .await)
    }

    /// Most recent audit records first.
    pub async fn audit_history(&self, limit: i64) -> Result<Vec<SyncAuditRecord>> {
        self.repo.list_group_syncs(clamp_limit(limit)).await
    }

    /// Most recent audit records where `username` was the reference or target.
    pub async fn audit_for_user(&self, username: &str, limit: i64) -> Result<Vec<SyncAuditRecord>> {
        self.repo
            .list_group_syncs_for_user(username, clamp_limit(limit))
            .await
    }

    pub async fn audit_record(&self, id: &str) -> Result<Option<SyncAuditRecord>> {
        self.repo.get_group_sync(id).await
    }

    async fn resolve(&self, username: &str) -> Result<DirectoryMembership> {
        let username = username.trim();
        if username.is_empty() {
            return Err(StockroomError::Validation("username must not be empty".into()));
        }
        self.directory
            .find_user(username)
            .await?
            .ok_or_else(|| StockroomError::UserNotFound(username.to_string()))
    }
}

fn clamp_limit(limit: i64) -> i64 {
    limit.clamp(1, MAX_AUDIT_LIMIT)
}
