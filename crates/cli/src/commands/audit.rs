use stockroom_ad_sync::service::MAX_AUDIT_LIMIT;
use stockroom_core::db::repository::GroupSyncAuditRepository;
use stockroom_core::models::group_sync::SyncAuditRecord;

use super::{load_config, open_repository};

/// Run the `audit` command: print recent group sync attempts, newest first.
pub async fn run(config_path: &str, limit: i64, user: Option<&str>) -> anyhow::Result<()> {
    let config = load_config(config_path)?;
    let repo = open_repository(&config).await?;

    let limit = limit.clamp(1, MAX_AUDIT_LIMIT);
    let records = match user {
        Some(username) => repo.list_group_syncs_for_user(username, limit).await?,
        None => repo.list_group_syncs(limit).await?,
    };

    if records.is_empty() {
        println!("No group sync attempts recorded.");
        return Ok(());
    }

    for record in &records {
        println!("{}", render_record(record));
    }
    Ok(())
}

fn render_record(record: &SyncAuditRecord) -> String {
    let mut line = format!(
        "{}  {:<7}  {} -> {}  by {}",
        record.timestamp.format("%Y-%m-%d %H:%M:%S UTC"),
        record.status.as_str(),
        record.from_user,
        record.to_user,
        record.executor,
    );
    if let Some(ip) = &record.executor_ip {
        line.push_str(&format!(" ({ip})"));
    }
    line.push_str(&format!(
        "  +{} -{}",
        record.groups_added.len(),
        record.groups_removed.len()
    ));
    if !record.groups_failed.is_empty() {
        line.push_str(&format!(" !{}", record.groups_failed.len()));
    }
    if !record.groups_skipped.is_empty() {
        line.push_str(&format!(" ~{}", record.groups_skipped.len()));
    }
    if let Some(id) = &record.id {
        line.push_str(&format!("  [{id}]"));
    }
    line
}
