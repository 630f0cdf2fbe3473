use stockroom_ad_sync::diff::is_privileged_group;
use stockroom_core::models::directory::GroupEntry;
use stockroom_core::models::group_sync::ComparisonResult;

use super::{load_config, local_service};

/// Run the `compare` command: print the shared, missing and extra groups.
pub async fn run(config_path: &str, reference: &str, target: &str) -> anyhow::Result<()> {
    let config = load_config(config_path)?;
    let service = local_service(&config).await?;

    let result = service.compare(reference, target).await?;
    println!("{}", render_comparison(&result));
    Ok(())
}

/// Human-readable partitions, privileged groups marked.
pub fn render_comparison(result: &ComparisonResult) -> String {
    let mut lines = vec![
        format!(
            "Reference: {} ({})",
            result.reference_user.display_name, result.reference_user.username
        ),
        format!(
            "Target:    {} ({})",
            result.target_user.display_name, result.target_user.username
        ),
    ];

    section(&mut lines, "Shared", &result.shared);
    section(&mut lines, "Missing in target", &result.missing_in_target);
    section(&mut lines, "Extra in target", &result.extra_in_target);
    lines.join("\n")
}

fn section(lines: &mut Vec<String>, title: &str, groups: &[GroupEntry]) {
    lines.push(String::new());
    lines.push(format!("{title} ({})", groups.len()));
    if groups.is_empty() {
        lines.push("  (none)".to_string());
    }
    for group in groups {
        let marker = if is_privileged_group(&group.cn) {
            " [PRIVILEGED]"
        } else {
            ""
        };
        lines.push(format!("  {}{marker}  {}", group.cn, group.dn));
    }
}
