use std::sync::Arc;

use axum::http::HeaderValue;
use stockroom_console::AppState;
use tokio::net::TcpListener;
use tower_http::set_header::SetResponseHeaderLayer;
use tracing::info;

use super::{directory_client, load_config, open_repository};

/// Run the `serve` command: start the console web server.
pub async fn run(config_path: &str, port: u16) -> anyhow::Result<()> {
    let config = load_config(config_path)?;

    let directory = directory_client(&config)?;
    let repo = open_repository(&config).await?;

    let state = Arc::new(AppState::new(repo, directory, config.clone()));
    let app = stockroom_console::router(state);

    // Add security headers
    let app = app
        .layer(SetResponseHeaderLayer::overriding(
            axum::http::header::X_FRAME_OPTIONS,
            HeaderValue::from_static("DENY"),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            axum::http::header::X_CONTENT_TYPE_OPTIONS,
            HeaderValue::from_static("nosniff"),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            axum::http::header::REFERRER_POLICY,
            HeaderValue::from_static("strict-origin-when-cross-origin"),
        ));

    let addr = format!("0.0.0.0:{}", port);
    let listener = TcpListener::bind(&addr).await?;

    println!(
        "{} console listening on http://{}",
        config.stockroom.instance_name, addr
    );
    info!(
        directory = %config.directory.server,
        "Starting server on {}", addr
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server shut down gracefully");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("Received shutdown signal");
}
