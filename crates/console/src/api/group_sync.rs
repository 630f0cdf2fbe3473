//! Group compare & sync JSON API.
//!
//! Errors are returned as `{ "error": "<message>" }` with a status derived from
//! the error kind.

use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, Path, Query, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use serde_json::json;
use tracing::{error, warn};

use stockroom_core::error::StockroomError;
use stockroom_core::http::extract_client_ip;
use stockroom_core::models::group_sync::{ApplyBatchRequest, CompareRequest};

use crate::AppState;

const DEFAULT_AUDIT_LIMIT: i64 = 50;

/// Build the group sync sub-router.
pub fn group_sync_router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/search-users", get(search_users))
        .route("/compare", post(compare))
        .route("/apply-batch", post(apply_batch))
        .route("/audit", get(list_audit))
        .route("/audit/:id", get(get_audit))
}

#[derive(Debug, Deserialize)]
struct SearchParams {
    #[serde(default)]
    q: String,
}

#[derive(Debug, Deserialize)]
struct AuditParams {
    limit: Option<i64>,
    user: Option<String>,
}

/// HTTP status for a service error.
pub fn status_for(e: &StockroomError) -> StatusCode {
    match e {
        StockroomError::UserNotFound(_) => StatusCode::NOT_FOUND,
        StockroomError::Validation(_) => StatusCode::BAD_REQUEST,
        StockroomError::DirectoryUnavailable(_) => StatusCode::BAD_GATEWAY,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn error_response(e: StockroomError) -> Response {
    let status = status_for(&e);
    if status.is_server_error() {
        error!(status = status.as_u16(), error = %e, "group sync request failed");
    } else {
        warn!(status = status.as_u16(), error = %e, "group sync request rejected");
    }
    (status, Json(json!({"error": e.to_string()}))).into_response()
}

fn rejection_response(rejection: JsonRejection) -> Response {
    error_response(StockroomError::Validation(rejection.body_text()))
}

// -- Search --

async fn search_users(
    State(state): State<Arc<AppState>>,
    Query(params): Query<SearchParams>,
) -> Response {
    match state.service.search_users(&params.q).await {
        Ok(users) => Json(users).into_response(),
        Err(e) => error_response(e),
    }
}

// -- Compare --

async fn compare(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<CompareRequest>, JsonRejection>,
) -> Response {
    let Json(request) = match payload {
        Ok(p) => p,
        Err(rejection) => return rejection_response(rejection),
    };
    match state
        .service
        .compare(&request.reference_username, &request.target_username)
        .await
    {
        Ok(result) => Json(result).into_response(),
        Err(e) => error_response(e),
    }
}

// -- Apply --

async fn apply_batch(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    payload: Result<Json<ApplyBatchRequest>, JsonRejection>,
) -> Response {
    let Json(request) = match payload {
        Ok(p) => p,
        Err(rejection) => return rejection_response(rejection),
    };
    let executor_ip = extract_client_ip(
        headers
            .get("x-forwarded-for")
            .and_then(|v| v.to_str().ok()),
    );
    match state.service.apply_batch(request, executor_ip).await {
        Ok(response) => Json(response).into_response(),
        Err(e) => error_response(e),
    }
}

// -- Audit --

async fn list_audit(
    State(state): State<Arc<AppState>>,
    Query(params): Query<AuditParams>,
) -> Response {
    let limit = params.limit.unwrap_or(DEFAULT_AUDIT_LIMIT);
    let result = match params.user.as_deref().map(str::trim).filter(|u| !u.is_empty()) {
        Some(user) => state.service.audit_for_user(user, limit).await,
        None => state.service.audit_history(limit).await,
    };
    match result {
        Ok(records) => Json(records).into_response(),
        Err(e) => error_response(e),
    }
}

async fn get_audit(State(state): State<Arc<AppState>>, Path(id): Path<String>) -> Response {
    match state.service.audit_record(&id).await {
        Ok(Some(record)) => Json(record).into_response(),
        Ok(None) => (
            StatusCode::NOT_FOUND,
            Json(json!({"error": format!("audit record '{id}' not found")})),
        )
            .into_response(),
        Err(e) => error_response(e),
    }
}
