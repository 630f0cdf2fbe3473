//! Typed reqwest wrapper for a remote Stockroom console's group sync API.

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Deserialize;

use stockroom_core::error::{Result, StockroomError};
use stockroom_core::models::directory::DirectoryUser;
use stockroom_core::models::group_sync::{
    ApplyBatchRequest, ApplyBatchResponse, CompareRequest, ComparisonResult,
};

use crate::reconcile::ReconcileBackend;

#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: String,
}

/// [`ReconcileBackend`] that talks to a running console over HTTP.
pub struct RemoteBackend {
    http: reqwest::Client,
    base_url: String,
}

impl RemoteBackend {
    /// Create a client for the console at `base_url`, e.g. `http://stockroom:8080`.
    pub fn new(base_url: &str) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }
}

/// Decode a success body, or turn a non-2xx response into [`StockroomError::Remote`].
async fn decode<T: DeserializeOwned>(resp: reqwest::Response, what: &str) -> Result<T> {
    let status = resp.status();
    if !status.is_success() {
        let body = resp.text().await.unwrap_or_default();
        let message = serde_json::from_str::<ErrorBody>(&body)
            .map(|b| b.error)
            .unwrap_or_else(|_| {
                if body.is_empty() {
                    format!("{what} failed")
                } else {
                    body
                }
            });
        return Err(StockroomError::Remote {
            status: status.as_u16(),
            message,
        });
    }

    resp.json::<T>()
        .await
        .map_err(|e| StockroomError::Serialization(format!("{what} parse failed: {e}")))
}

#[async_trait]
impl ReconcileBackend for RemoteBackend {
    async fn search_users(&self, query: &str) -> Result<Vec<DirectoryUser>> {
        let resp = self
            .http
            .get(self.url("/search-users"))
            .query(&[("q", query)])
            .send()
            .await?;
        decode(resp, "search users").await
    }

    async fn compare(
        &self,
        reference_username: &str,
        target_username: &str,
    ) -> Result<ComparisonResult> {
        let body = CompareRequest {
            reference_username: reference_username.to_string(),
            target_username: target_username.to_string(),
        };
        let resp = self
            .http
            .post(self.url("/compare"))
            .json(&body)
            .send()
            .await?;
        decode(resp, "compare").await
    }

    async fn apply_batch(&self, request: ApplyBatchRequest) -> Result<ApplyBatchResponse> {
        let resp = self
            .http
            .post(self.url("/apply-batch"))
            .json(&request)
            .send()
            .await?;
        decode(resp, "apply batch").await
    }
}
