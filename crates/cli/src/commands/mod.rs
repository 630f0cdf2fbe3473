pub mod apply;
pub mod audit;
pub mod compare;
pub mod init;
pub mod search;
pub mod serve;
pub mod test_connection;

use std::path::Path;
use std::sync::Arc;

use stockroom_ad_sync::client::{AdClient, DirectoryClient};
use stockroom_ad_sync::service::GroupSyncService;
use stockroom_console::ConsoleService;
use stockroom_core::config::{DatabaseDriver, StockroomConfig};
use stockroom_core::db::sqlite::SqliteRepository;
use stockroom_core::db::DatabasePool;
use tracing::info;

/// Load and validate the configuration file.
pub fn load_config(config_path: &str) -> anyhow::Result<StockroomConfig> {
    let config = StockroomConfig::load(Path::new(config_path))?;
    config.validate()?;
    info!("Loaded configuration from {}", config_path);
    Ok(config)
}

/// Open the audit database, creating and migrating it if needed.
pub async fn open_repository(config: &StockroomConfig) -> anyhow::Result<Arc<SqliteRepository>> {
    let pool = match config.stockroom.database.driver {
        DatabaseDriver::Sqlite => {
            let path = config
                .stockroom
                .database
                .path
                .as_deref()
                .ok_or_else(|| anyhow::anyhow!("SQLite path not configured"))?;
            DatabasePool::new_sqlite(&DatabasePool::sqlite_connect_string(path)).await?
        }
    };

    let repo = match pool {
        DatabasePool::Sqlite(p) => SqliteRepository::new(p),
    };
    Ok(Arc::new(repo))
}

/// LDAP client for the configured directory.
pub fn directory_client(config: &StockroomConfig) -> anyhow::Result<Arc<dyn DirectoryClient>> {
    if !config.directory.is_configured() {
        anyhow::bail!("No directory configured. Set directory.server in the configuration file.");
    }
    Ok(Arc::new(AdClient::new(&config.directory)))
}

/// The group sync service wired the same way the console wires it.
pub async fn local_service(config: &StockroomConfig) -> anyhow::Result<Arc<ConsoleService>> {
    let directory = directory_client(config)?;
    let repo = open_repository(config).await?;
    Ok(Arc::new(GroupSyncService::new(
        repo,
        directory,
        config.group_sync.clone(),
    )))
}
