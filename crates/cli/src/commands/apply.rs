use std::path::Path;
use std::sync::Arc;

use stockroom_ad_sync::reconcile::{outcome_banner, ReconcileBackend, ReconciliationController};
use stockroom_ad_sync::remote::RemoteBackend;
use stockroom_core::config::{GroupSyncConfig, StockroomConfig};
use stockroom_core::models::directory::DirectoryUser;
use stockroom_core::models::group_sync::{SyncOutcome, SyncOutcomeStatus};
use tracing::{debug, info, warn};

use super::compare::render_comparison;
use super::{load_config, local_service};

/// What to copy from the reference user to the target user.
#[derive(Debug, Clone, Default)]
pub struct ApplyOptions {
    pub reference: String,
    pub target: String,
    pub add: Vec<String>,
    pub remove: Vec<String>,
    pub all_missing: bool,
    pub all_extra: bool,
    pub executor: Option<String>,
    pub report: Option<String>,
}

/// Run the `apply` command against the local directory or a remote console.
pub async fn run(
    config_path: &str,
    server: Option<&str>,
    options: ApplyOptions,
) -> anyhow::Result<()> {
    let outcome = match server {
        Some(url) => {
            let group_sync = match StockroomConfig::load(Path::new(config_path)) {
                Ok(config) => config.group_sync,
                Err(e) => {
                    debug!(error = %e, "using default group sync settings");
                    GroupSyncConfig::default()
                }
            };
            let backend = Arc::new(RemoteBackend::new(url));
            info!(server = %backend.base_url(), "Applying through remote console");
            session(backend, &group_sync, &options).await?
        }
        None => {
            let config = load_config(config_path)?;
            let service = local_service(&config).await?;
            session(service, &config.group_sync, &options).await?
        }
    };

    match outcome {
        Some(outcome) if outcome.status == SyncOutcomeStatus::Failed => {
            anyhow::bail!("group sync failed: {}", outcome.failed.join("; "))
        }
        _ => Ok(()),
    }
}

/// Compare, select, apply and report through one reconciliation session.
///
/// Returns `None` when nothing ended up selected.
pub async fn session<B: ReconcileBackend + 'static>(
    backend: Arc<B>,
    group_sync: &GroupSyncConfig,
    options: &ApplyOptions,
) -> anyhow::Result<Option<SyncOutcome>> {
    let mut controller = ReconciliationController::new(backend, group_sync);
    if let Some(executor) = &options.executor {
        controller = controller.with_executor(executor.clone());
    }

    controller.select_reference(Some(picked(&options.reference)));
    controller.select_target(Some(picked(&options.target)));
    let comparison = controller.compare().await?;
    println!("{}", render_comparison(comparison));

    if options.all_missing {
        controller.toggle_all_add();
    }
    if options.all_extra {
        controller.toggle_all_remove();
    }
    for dn in &options.add {
        if !controller.selection().is_adding(dn) && !controller.toggle_add(dn) {
            anyhow::bail!("{dn} is not missing from {}", options.target);
        }
    }
    for dn in &options.remove {
        if !controller.selection().is_removing(dn) && !controller.toggle_remove(dn) {
            anyhow::bail!("{dn} is not an extra group of {}", options.target);
        }
    }

    let Some(outcome) = controller.apply().await? else {
        println!();
        println!("Nothing selected; no changes made.");
        return Ok(None);
    };

    println!();
    println!("{}", outcome_banner(&outcome));
    println!("  Added:   {}", outcome.added);
    println!("  Removed: {}", outcome.removed);
    for entry in &outcome.failed {
        println!("  Failed:  {entry}");
    }

    if let Some(dir) = &options.report {
        match controller.report() {
            Some(report) => {
                report.write_csv(Path::new(dir))?;
                println!("Report written to {dir}");
            }
            None => warn!("sync failed; no report written"),
        }
    }

    if outcome.status != SyncOutcomeStatus::Failed {
        if let Some(updated) = controller.comparison() {
            println!();
            println!("{}", render_comparison(updated));
        }
    }

    Ok(Some(outcome))
}

/// A user picked by username. The backend resolves the rest on compare.
fn picked(username: &str) -> DirectoryUser {
    DirectoryUser {
        username: username.to_string(),
        display_name: username.to_string(),
        dn: None,
    }
}
