//! Stockroom Console -- JSON API for AD group compare & sync.
//!
//! Serves the search, compare and apply endpoints used by the reconciliation
//! UI, plus read access to the group sync audit trail.

use std::sync::Arc;

use axum::{routing::get, Router};
use stockroom_ad_sync::client::DirectoryClient;
use stockroom_ad_sync::service::GroupSyncService;
use stockroom_core::config::StockroomConfig;
use stockroom_core::db::sqlite::SqliteRepository;

pub mod api;

#[cfg(test)]
mod test_support;

/// Group sync service as wired by the console: SQLite audit trail, any directory.
pub type ConsoleService = GroupSyncService<SqliteRepository, dyn DirectoryClient>;

/// Shared application state for all console routes.
pub struct AppState {
    pub service: ConsoleService,
    pub config: StockroomConfig,
}

impl AppState {
    pub fn new(
        repo: Arc<SqliteRepository>,
        directory: Arc<dyn DirectoryClient>,
        config: StockroomConfig,
    ) -> Self {
        let service = GroupSyncService::new(repo, directory, config.group_sync.clone());
        Self { service, config }
    }
}

/// Build the console router with all routes.
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health))
        .merge(api::group_sync::group_sync_router())
        .with_state(state)
}

// -- Health --

async fn health() -> &'static str {
    "ok"
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{get_body, test_state};
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use tower::ServiceExt;

    #[tokio::test]
    async fn health_returns_ok() {
        let state = test_state().await;
        let app = router(state);
        let response = app
            .oneshot(
                Request::builder()
                    .uri("/health")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(get_body(response).await, "ok");
    }

    #[tokio::test]
    async fn unknown_route_is_404() {
        let state = test_state().await;
        let app = router(state);
        let response = app
            .oneshot(
                Request::builder()
                    .uri("/nope")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn state_uses_group_sync_config() {
        let state = test_state().await;
        assert_eq!(
            state.service.config().default_executor,
            state.config.group_sync.default_executor
        );
    }
}
