//! Group compare & sync models: comparison results, apply outcomes, and audit records.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::directory::{DirectoryUser, GroupEntry};

/// Three-way partition of two users' group memberships.
///
/// Recomputed on every comparison request and never persisted.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ComparisonResult {
    pub reference_user: DirectoryUser,
    pub target_user: DirectoryUser,
    pub shared: Vec<GroupEntry>,
    pub missing_in_target: Vec<GroupEntry>,
    pub extra_in_target: Vec<GroupEntry>,
    /// Raw DNs as returned by the directory.
    pub reference_groups: Vec<String>,
    pub target_groups: Vec<String>,
}

/// Which kind of membership edit an operation performs.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum GroupOperation {
    Add,
    Remove,
}

impl GroupOperation {
    pub fn prefix(&self) -> &'static str {
        match self {
            GroupOperation::Add => "ADD:",
            GroupOperation::Remove => "REMOVE:",
        }
    }

    /// Tag a DN with this operation's prefix, e.g. `ADD:CN=VPN,DC=x`.
    pub fn tag(&self, dn: &str) -> String {
        format!("{}{dn}", self.prefix())
    }

    /// Split a tagged entry back into its operation and DN.
    pub fn parse_tagged(entry: &str) -> Option<(GroupOperation, &str)> {
        if let Some(dn) = entry.strip_prefix(GroupOperation::Add.prefix()) {
            Some((GroupOperation::Add, dn))
        } else {
            entry
                .strip_prefix(GroupOperation::Remove.prefix())
                .map(|dn| (GroupOperation::Remove, dn))
        }
    }
}

/// Aggregate classification of one apply invocation.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SyncOutcomeStatus {
    Success,
    Partial,
    Failed,
}

impl SyncOutcomeStatus {
    /// Classify from per-operation counts.
    ///
    /// `failed` if nothing succeeded (including when nothing could be attempted),
    /// `partial` if some succeeded and some failed, `success` otherwise.
    pub fn classify(succeeded: usize, failed: usize) -> Self {
        if succeeded == 0 {
            SyncOutcomeStatus::Failed
        } else if failed > 0 {
            SyncOutcomeStatus::Partial
        } else {
            SyncOutcomeStatus::Success
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SyncOutcomeStatus::Success => "success",
            SyncOutcomeStatus::Partial => "partial",
            SyncOutcomeStatus::Failed => "failed",
        }
    }

    pub fn parse(s: &str) -> Self {
        match s {
            "success" => SyncOutcomeStatus::Success,
            "partial" => SyncOutcomeStatus::Partial,
            _ => SyncOutcomeStatus::Failed,
        }
    }
}

/// Result of one apply invocation. Never mutated once produced.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SyncOutcome {
    pub status: SyncOutcomeStatus,
    pub added: u32,
    pub removed: u32,
    /// Failed operations, each tagged `ADD:` or `REMOVE:`, or a single batch-level message.
    pub failed: Vec<String>,
}

impl SyncOutcome {
    /// Outcome for a batch that could not run at all.
    pub fn batch_failure(message: impl Into<String>) -> Self {
        Self {
            status: SyncOutcomeStatus::Failed,
            added: 0,
            removed: 0,
            failed: vec![message.into()],
        }
    }
}

/// Compliance record of one apply invocation. Append-only.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SyncAuditRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub executor: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub executor_ip: Option<String>,
    pub from_user: String,
    pub to_user: String,
    pub target_dn: String,
    pub status: SyncOutcomeStatus,
    pub timestamp: DateTime<Utc>,
    pub groups_added: Vec<String>,
    pub groups_removed: Vec<String>,
    pub groups_skipped: Vec<String>,
    pub groups_failed: Vec<String>,
}

/// Body of `POST /compare`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct CompareRequest {
    pub reference_username: String,
    pub target_username: String,
}

/// Body of `POST /apply-batch`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ApplyBatchRequest {
    pub target_user_dn: String,
    #[serde(default)]
    pub groups_to_add: Vec<String>,
    #[serde(default)]
    pub groups_to_remove: Vec<String>,
    pub from_username: String,
    pub to_username: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub executor: Option<String>,
}

/// Response of `POST /apply-batch`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ApplyBatchResponse {
    pub status: SyncOutcomeStatus,
    pub added: u32,
    pub removed: u32,
    pub failed: Vec<String>,
    pub detail: SyncAuditRecord,
}

impl ApplyBatchResponse {
    pub fn new(outcome: SyncOutcome, detail: SyncAuditRecord) -> Self {
        Self {
            status: outcome.status,
            added: outcome.added,
            removed: outcome.removed,
            failed: outcome.failed,
            detail,
        }
    }

    pub fn outcome(&self) -> SyncOutcome {
        SyncOutcome {
            status: self.status,
            added: self.added,
            removed: self.removed,
            failed: self.failed.clone(),
        }
    }
}
