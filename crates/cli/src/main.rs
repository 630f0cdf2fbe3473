use clap::Parser;
use tracing_subscriber::EnvFilter;

mod commands;

#[derive(Parser)]
#[command(name = "stockroom", about = "AD group compare & sync", version)]
struct Cli {
    /// Path to configuration file
    #[arg(long, default_value = "stockroom.toml")]
    config: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::Subcommand)]
enum Commands {
    /// Initialize the data directory and write a default configuration
    Init {
        /// Data directory path
        #[arg(long, default_value = "/var/lib/stockroom")]
        data_dir: String,
    },
    /// Start the console web server
    Serve {
        /// Port to listen on
        #[arg(long, default_value = "8080")]
        port: u16,
    },
    /// Check that the directory can be reached and bound to
    TestConnection,
    /// Search directory users by username or display name
    Search {
        query: String,
    },
    /// Compare the group memberships of two users
    Compare {
        /// Username whose groups are the model
        reference: String,
        /// Username being brought in line
        target: String,
    },
    /// Copy selected group memberships from the reference user to the target user
    Apply {
        reference: String,
        target: String,
        /// Group DN to add to the target (repeatable)
        #[arg(long = "add", value_name = "DN")]
        add: Vec<String>,
        /// Group DN to remove from the target (repeatable)
        #[arg(long = "remove", value_name = "DN")]
        remove: Vec<String>,
        /// Add every group the target is missing
        #[arg(long)]
        all_missing: bool,
        /// Remove every group only the target has
        #[arg(long)]
        all_extra: bool,
        /// Name recorded as the executor in the audit trail
        #[arg(long, value_name = "NAME")]
        executor: Option<String>,
        /// Write summary, group detail and audit trail CSVs into this directory
        /// (skipped when the sync fails outright)
        #[arg(long, value_name = "DIR")]
        report: Option<String>,
        /// Run against a remote console instead of the local directory
        #[arg(long, value_name = "URL")]
        server: Option<String>,
    },
    /// Show recent group sync audit records
    Audit {
        #[arg(long, default_value = "20")]
        limit: i64,
        /// Only records where this user was the reference or target
        #[arg(long, value_name = "NAME")]
        user: Option<String>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Init { data_dir } => {
            commands::init::run(&data_dir).await?;
        }
        Commands::Serve { port } => {
            commands::serve::run(&cli.config, port).await?;
        }
        Commands::TestConnection => {
            commands::test_connection::run(&cli.config).await?;
        }
        Commands::Search { query } => {
            commands::search::run(&cli.config, &query).await?;
        }
        Commands::Compare { reference, target } => {
            commands::compare::run(&cli.config, &reference, &target).await?;
        }
        Commands::Apply {
            reference,
            target,
            add,
            remove,
            all_missing,
            all_extra,
            executor,
            report,
            server,
        } => {
            let options = commands::apply::ApplyOptions {
                reference,
                target,
                add,
                remove,
                all_missing,
                all_extra,
                executor,
                report,
            };
            commands::apply::run(&cli.config, server.as_deref(), options).await?;
        }
        Commands::Audit { limit, user } => {
            commands::audit::run(&cli.config, limit, user.as_deref()).await?;
        }
    }

    Ok(())
}
