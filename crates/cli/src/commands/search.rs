use stockroom_core::models::directory::DirectoryUser;

use super::{load_config, local_service};

/// Run the `search` command: list directory users matching a query.
pub async fn run(config_path: &str, query: &str) -> anyhow::Result<()> {
    let config = load_config(config_path)?;
    let service = local_service(&config).await?;

    let users = service.search_users(query).await?;
    if users.is_empty() {
        println!(
            "No users found (queries shorter than {} characters are ignored).",
            config.group_sync.search_min_query_len
        );
        return Ok(());
    }

    for line in render_users(&users) {
        println!("{line}");
    }
    Ok(())
}

fn render_users(users: &[DirectoryUser]) -> Vec<String> {
    let width = users
        .iter()
        .map(|u| u.username.len())
        .max()
        .unwrap_or(0)
        .max("USERNAME".len());

    let mut lines = vec![format!("{:<width$}  DISPLAY NAME", "USERNAME")];
    lines.extend(users.iter().map(|u| match &u.dn {
        Some(dn) => format!("{:<width$}  {} ({dn})", u.username, u.display_name),
        None => format!("{:<width$}  {}", u.username, u.display_name),
    }));
    lines
}
