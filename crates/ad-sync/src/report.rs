//! Offline report of one apply: summary, per-group detail and audit trail as CSV.

use std::path::Path;

use serde::Serialize;

use stockroom_core::error::{Result, StockroomError};
use stockroom_core::models::group_sync::{
    ApplyBatchResponse, ComparisonResult, GroupOperation, SyncOutcomeStatus,
};

use crate::diff::is_privileged_group;
use crate::dn::common_name;

pub const SUMMARY_FILE: &str = "summary.csv";
pub const GROUP_DETAIL_FILE: &str = "group_detail.csv";
pub const AUDIT_TRAIL_FILE: &str = "audit_trail.csv";

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct SummaryRow {
    pub reference_user: String,
    pub target_user: String,
    pub executor: String,
    pub timestamp: String,
    pub status: SyncOutcomeStatus,
    pub pre_existing: usize,
    pub added: u32,
    pub removed: u32,
    pub failed: usize,
    pub skipped: usize,
}

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum GroupStatus {
    PreExisting,
    Added,
    Removed,
    Failed,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct GroupDetailRow {
    pub group_dn: String,
    pub group_cn: String,
    pub status: GroupStatus,
    /// `add`, `remove`, or `-` for groups the target already shared.
    pub operation: String,
    pub privileged: bool,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct AuditTrailRow {
    pub timestamp: String,
    pub executor: String,
    /// `ADD`, `REMOVE` or `FAILED`.
    pub action: String,
    pub group_dn: String,
    pub note: String,
}

/// The three report tables for one apply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncReport {
    pub summary: SummaryRow,
    pub group_detail: Vec<GroupDetailRow>,
    pub audit_trail: Vec<AuditTrailRow>,
}

impl SyncReport {
    /// Build from the comparison shown before the apply and the apply response.
    pub fn build(before: &ComparisonResult, response: &ApplyBatchResponse) -> Self {
        let detail = &response.detail;
        let timestamp = detail.timestamp.to_rfc3339();

        let mut group_detail: Vec<GroupDetailRow> = before
            .shared
            .iter()
            .map(|g| GroupDetailRow {
                group_dn: g.dn.clone(),
                group_cn: g.cn.clone(),
                status: GroupStatus::PreExisting,
                operation: "-".to_string(),
                privileged: is_privileged_group(&g.cn),
            })
            .collect();
        let mut audit_trail = Vec::new();

        for dn in &detail.groups_added {
            group_detail.push(detail_row(dn, GroupStatus::Added, GroupOperation::Add));
            audit_trail.push(trail_row(&timestamp, &detail.executor, "ADD", dn, ""));
        }
        for dn in &detail.groups_removed {
            group_detail.push(detail_row(dn, GroupStatus::Removed, GroupOperation::Remove));
            audit_trail.push(trail_row(&timestamp, &detail.executor, "REMOVE", dn, ""));
        }
        for entry in &response.failed {
            match GroupOperation::parse_tagged(entry) {
                Some((operation, dn)) => {
                    group_detail.push(detail_row(dn, GroupStatus::Failed, operation));
                    let note = match operation {
                        GroupOperation::Add => "add failed",
                        GroupOperation::Remove => "remove failed",
                    };
                    audit_trail.push(trail_row(&timestamp, &detail.executor, "FAILED", dn, note));
                }
                None => {
                    audit_trail.push(trail_row(&timestamp, &detail.executor, "FAILED", "", entry));
                }
            }
        }

        let summary = SummaryRow {
            reference_user: detail.from_user.clone(),
            target_user: detail.to_user.clone(),
            executor: detail.executor.clone(),
            timestamp,
            status: response.status,
            pre_existing: before.shared.len(),
            added: response.added,
            removed: response.removed,
            failed: response.failed.len(),
            skipped: detail.groups_skipped.len(),
        };

        Self {
            summary,
            group_detail,
            audit_trail,
        }
    }

    /// Write `summary.csv`, `group_detail.csv` and `audit_trail.csv` into `dir`.
    pub fn write_csv(&self, dir: &Path) -> Result<()> {
        std::fs::create_dir_all(dir)?;
        write_csv(&dir.join(SUMMARY_FILE), std::iter::once(&self.summary))?;
        write_csv(&dir.join(GROUP_DETAIL_FILE), self.group_detail.iter())?;
        write_csv(&dir.join(AUDIT_TRAIL_FILE), self.audit_trail.iter())?;
        Ok(())
    }
}

fn detail_row(dn: &str, status: GroupStatus, operation: GroupOperation) -> GroupDetailRow {
    let cn = common_name(dn);
    GroupDetailRow {
        group_dn: dn.to_string(),
        privileged: is_privileged_group(&cn),
        group_cn: cn,
        status,
        operation: match operation {
            GroupOperation::Add => "add",
            GroupOperation::Remove => "remove",
        }
        .to_string(),
    }
}

fn trail_row(timestamp: &str, executor: &str, action: &str, dn: &str, note: &str) -> AuditTrailRow {
    AuditTrailRow {
        timestamp: timestamp.to_string(),
        executor: executor.to_string(),
        action: action.to_string(),
        group_dn: dn.to_string(),
        note: note.to_string(),
    }
}

fn write_csv<S: Serialize>(path: &Path, rows: impl Iterator<Item = S>) -> Result<()> {
    let mut wtr =
        csv::Writer::from_path(path).map_err(|e| StockroomError::Io(std::io::Error::other(e)))?;

    for row in rows {
        wtr.serialize(row)
            .map_err(|e| StockroomError::Serialization(format!("CSV write error: {e}")))?;
    }

    wtr.flush()?;
    Ok(())
}
