use tracing::info;

use super::{directory_client, load_config};

/// Run the `test-connection` command: connect and bind to the configured directory.
pub async fn run(config_path: &str) -> anyhow::Result<()> {
    let config = load_config(config_path)?;
    let directory = directory_client(&config)?;

    info!(server = %config.directory.server, "Testing directory connection");
    directory.test_connection().await?;

    println!("Directory connection OK");
    println!("  Server:  {}", config.directory.server);
    println!("  Bind DN: {}", config.directory.bind_dn);
    println!("  Base DN: {}", config.directory.base_dn);
    Ok(())
}
