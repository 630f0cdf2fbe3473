use std::path::Path;

use stockroom_core::config::{DatabaseConfig, DatabaseDriver, StockroomConfig};
use stockroom_core::db::DatabasePool;
use tracing::info;

/// Run the `init` command: create data directory, write default config, and set up the database.
pub async fn run(data_dir: &str) -> anyhow::Result<()> {
    let data_path = Path::new(data_dir);

    if !data_path.exists() {
        std::fs::create_dir_all(data_path)?;
        info!("Created data directory: {}", data_dir);
    }

    let db_path = data_path.join("stockroom.db");
    let db_path_str = db_path.to_string_lossy().to_string();

    let mut config = StockroomConfig::generate_default();
    config.stockroom.data_dir = data_dir.to_string();
    config.stockroom.database = DatabaseConfig {
        driver: DatabaseDriver::Sqlite,
        path: Some(db_path_str.clone()),
    };

    let config_path = data_path.join("stockroom.toml");
    let toml_str = toml::to_string_pretty(&config)?;
    std::fs::write(&config_path, &toml_str)?;
    info!("Wrote configuration to {}", config_path.display());

    DatabasePool::new_sqlite(&DatabasePool::sqlite_connect_string(&db_path_str)).await?;
    info!("Database initialized at {}", db_path_str);

    println!("Stockroom initialized successfully!");
    println!("  Data directory: {}", data_dir);
    println!("  Configuration:  {}", config_path.display());
    println!("  Database:       {}", db_path_str);
    println!();
    println!("Next steps:");
    println!(
        "  1. Edit {} and fill in the [directory] section",
        config_path.display()
    );
    println!(
        "  2. Run `stockroom --config {} test-connection`",
        config_path.display()
    );
    println!("  3. Run `stockroom compare <reference> <target>` to preview a sync");

    Ok(())
}
