//! Batch sync executor: applies a set of membership edits to one target user.
//!
//! Every operation runs on its own. A failure is recorded and the remaining
//! operations still run. The audit record is written whatever the outcome.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use futures_util::stream::{self, StreamExt};
use tracing::{error, info, warn};

use stockroom_core::config::GroupSyncConfig;
use stockroom_core::db::repository::StockroomRepository;
use stockroom_core::models::group_sync::{
    ApplyBatchResponse, GroupOperation, SyncAuditRecord, SyncOutcome, SyncOutcomeStatus,
};

use crate::client::DirectoryClient;
use crate::dn::dn_key;

/// Who asked for a batch and on whose behalf, as written to the audit trail.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuditContext {
    pub executor: String,
    pub executor_ip: Option<String>,
    pub from_user: String,
    pub to_user: String,
}

/// One membership edit and how it ended.
#[derive(Debug, Clone)]
struct OperationResult {
    index: usize,
    operation: GroupOperation,
    group_dn: String,
    error: Option<String>,
}

/// Applies add/remove batches through a [`DirectoryClient`] and audits them.
pub struct BatchSyncExecutor<R: StockroomRepository, D: DirectoryClient + ?Sized> {
    repo: Arc<R>,
    directory: Arc<D>,
    config: GroupSyncConfig,
}

impl<R: StockroomRepository, D: DirectoryClient + ?Sized> BatchSyncExecutor<R, D> {
    pub fn new(repo: Arc<R>, directory: Arc<D>, config: GroupSyncConfig) -> Self {
        Self {
            repo,
            directory,
            config,
        }
    }

    /// Apply `to_add` and `to_remove` to `target_user_dn`.
    ///
    /// Never fails: directory problems are reported through the outcome and an
    /// audit write failure is logged. Case-insensitive repeats within a list
    /// are not attempted and land in the skipped list.
    pub async fn apply(
        &self,
        target_user_dn: &str,
        to_add: &[String],
        to_remove: &[String],
        context: AuditContext,
    ) -> ApplyBatchResponse {
        let mut skipped = Vec::new();
        let mut planned = Vec::with_capacity(to_add.len() + to_remove.len());
        plan(GroupOperation::Add, to_add, &mut planned, &mut skipped);
        plan(GroupOperation::Remove, to_remove, &mut planned, &mut skipped);

        info!(
            target_dn = %target_user_dn,
            from = %context.from_user,
            to = %context.to_user,
            executor = %context.executor,
            adds = to_add.len(),
            removes = to_remove.len(),
            "starting group batch"
        );

        let timeout = self.config.operation_timeout();

        if let Err(message) = self.preflight(timeout).await {
            warn!(target_dn = %target_user_dn, error = %message, "directory unreachable, batch not attempted");
            skipped.extend(planned.iter().map(|(op, dn)| op.tag(dn)));
            let outcome = SyncOutcome::batch_failure(message.clone());
            let record = SyncAuditRecord {
                id: None,
                executor: context.executor,
                executor_ip: context.executor_ip,
                from_user: context.from_user,
                to_user: context.to_user,
                target_dn: target_user_dn.to_string(),
                status: outcome.status,
                timestamp: Utc::now(),
                groups_added: Vec::new(),
                groups_removed: Vec::new(),
                groups_skipped: skipped,
                groups_failed: vec![message],
            };
            let record = self.write_audit(record).await;
            return ApplyBatchResponse::new(outcome, record);
        }

        let directory = self.directory.as_ref();
        let mut results: Vec<OperationResult> = stream::iter(planned.into_iter().enumerate())
            .map(|(index, (operation, group_dn))| async move {
                let error = run_operation(directory, operation, &group_dn, target_user_dn, timeout)
                    .await
                    .err();
                OperationResult {
                    index,
                    operation,
                    group_dn,
                    error,
                }
            })
            .buffer_unordered(self.config.max_concurrency.max(1))
            .collect()
            .await;
        results.sort_by_key(|r| r.index);

        let mut groups_added = Vec::new();
        let mut groups_removed = Vec::new();
        let mut groups_failed = Vec::new();
        for result in results {
            match (&result.error, result.operation) {
                (None, GroupOperation::Add) => groups_added.push(result.group_dn),
                (None, GroupOperation::Remove) => groups_removed.push(result.group_dn),
                (Some(e), op) => {
                    warn!(
                        group = %result.group_dn,
                        user = %target_user_dn,
                        operation = op.prefix(),
                        error = %e,
                        "group membership change failed"
                    );
                    groups_failed.push(op.tag(&result.group_dn));
                }
            }
        }

        let succeeded = groups_added.len() + groups_removed.len();
        let outcome = SyncOutcome {
            status: SyncOutcomeStatus::classify(succeeded, groups_failed.len()),
            added: groups_added.len() as u32,
            removed: groups_removed.len() as u32,
            failed: groups_failed.clone(),
        };

        info!(
            target_dn = %target_user_dn,
            status = outcome.status.as_str(),
            added = outcome.added,
            removed = outcome.removed,
            failed = outcome.failed.len(),
            skipped = skipped.len(),
            "group batch completed"
        );

        let record = SyncAuditRecord {
            id: None,
            executor: context.executor,
            executor_ip: context.executor_ip,
            from_user: context.from_user,
            to_user: context.to_user,
            target_dn: target_user_dn.to_string(),
            status: outcome.status,
            timestamp: Utc::now(),
            groups_added,
            groups_removed,
            groups_skipped: skipped,
            groups_failed,
        };
        let record = self.write_audit(record).await;
        ApplyBatchResponse::new(outcome, record)
    }

    async fn preflight(&self, timeout: Duration) -> Result<(), String> {
        match tokio::time::timeout(timeout, self.directory.test_connection()).await {
            Ok(Ok(())) => Ok(()),
            Ok(Err(e)) => Err(e.to_string()),
            Err(_) => Err(format!(
                "directory unavailable: connection test timed out after {}s",
                timeout.as_secs()
            )),
        }
    }

    /// Persist the record, returning it with its id filled in when the write succeeded.
    async fn write_audit(&self, mut record: SyncAuditRecord) -> SyncAuditRecord {
        match self.repo.record_group_sync(&record).await {
            Ok(id) => record.id = Some(id),
            Err(e) => {
                error!(
                    target_dn = %record.target_dn,
                    from = %record.from_user,
                    to = %record.to_user,
                    status = record.status.as_str(),
                    error = %e,
                    "failed to write group sync audit record"
                );
            }
        }
        record
    }
}

/// Queue each distinct DN of `dns` under `operation`; repeats go to `skipped`.
fn plan(
    operation: GroupOperation,
    dns: &[String],
    planned: &mut Vec<(GroupOperation, String)>,
    skipped: &mut Vec<String>,
) {
    let mut seen = HashSet::new();
    for dn in dns {
        if seen.insert(dn_key(dn)) {
            planned.push((operation, dn.clone()));
        } else {
            skipped.push(operation.tag(dn));
        }
    }
}

async fn run_operation<D: DirectoryClient + ?Sized>(
    directory: &D,
    operation: GroupOperation,
    group_dn: &str,
    user_dn: &str,
    timeout: Duration,
) -> Result<(), String> {
    let call = async {
        match operation {
            GroupOperation::Add => directory.add_user_to_group(group_dn, user_dn).await,
            GroupOperation::Remove => directory.remove_user_from_group(group_dn, user_dn).await,
        }
    };
    match tokio::time::timeout(timeout, call).await {
        Ok(Ok(())) => Ok(()),
        Ok(Err(e)) => Err(e.to_string()),
        Err(_) => Err(format!("timed out after {}s", timeout.as_secs())),
    }
}
