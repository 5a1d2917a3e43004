//! sync::http
//!
//! REST implementation of [`BoardSync`].
//!
//! # Endpoints
//!
//! | Operation      | Request                                                   |
//! |----------------|-----------------------------------------------------------|
//! | `fetch_board`  | `GET  {api_base}/projects/{project}/board`                |
//! | `move_paper`   | `PATCH {api_base}/projects/{project}/papers/{paper}/stage` |
//!
//! The move body is `{"stage_id", "position", "expected_version"}`; the
//! response echoes the confirmed placement.
//!
//! # Status Mapping
//!
//! - `409 Conflict` → [`SyncError::Conflict`]
//! - `401` / `403` → [`SyncError::Rejected`] with a "permission denied" message
//! - any other non-success → [`SyncError::Rejected`]
//! - transport timeout → [`SyncError::Timeout`]
//! - any other transport failure → [`SyncError::Network`]
//!
//! Every request carries a fresh `x-request-id` so server logs can be
//! correlated with client logs.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION, USER_AGENT};
use reqwest::{Client, Response, StatusCode};
use serde::{Deserialize, Serialize};

use super::traits::{BoardPayload, BoardSync, MoveRequest, ServerPlacement, SyncError};
use crate::core::snapshot::PipelineSnapshot;
use crate::core::types::ProjectId;

/// User-Agent header value for API requests.
const USER_AGENT_VALUE: &str = concat!("paperboard/", env!("CARGO_PKG_VERSION"));

/// Header carrying the per-request correlation id.
pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// Board persistence over the REST API.
#[derive(Clone)]
pub struct HttpBoardSync {
    client: Client,
    api_base: String,
    token: Option<String>,
    timeout: Duration,
}

impl std::fmt::Debug for HttpBoardSync {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpBoardSync")
            .field("api_base", &self.api_base)
            .field("token", &self.token.as_ref().map(|_| "[REDACTED]"))
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl HttpBoardSync {
    /// Create a client for `api_base` with a per-request `timeout`.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::Network`] if the HTTP client cannot be built.
    pub fn new(
        api_base: impl Into<String>,
        token: Option<String>,
        timeout: Duration,
    ) -> Result<Self, SyncError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| SyncError::Network(format!("failed to build HTTP client: {}", e)))?;
        Ok(Self {
            client,
            api_base: api_base.into().trim_end_matches('/').to_string(),
            token,
            timeout,
        })
    }

    /// Create a client from loaded configuration.
    pub fn from_config(config: &crate::core::config::Config) -> Result<Self, SyncError> {
        Self::new(config.api_base(), config.token(), config.timeout())
    }

    /// The API base URL (without trailing slash).
    pub fn api_base(&self) -> &str {
        &self.api_base
    }

    fn headers(&self) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        headers.insert(USER_AGENT, HeaderValue::from_static(USER_AGENT_VALUE));
        if let Some(token) = &self.token {
            if let Ok(value) = HeaderValue::from_str(&format!("Bearer {}", token)) {
                headers.insert(AUTHORIZATION, value);
            }
        }
        let request_id = uuid::Uuid::new_v4().to_string();
        if let Ok(value) = HeaderValue::from_str(&request_id) {
            headers.insert(REQUEST_ID_HEADER, value);
        }
        headers
    }

    fn project_url(&self, project: &ProjectId, path: &str) -> String {
        format!("{}/projects/{}/{}", self.api_base, project, path)
    }

    fn transport_error(&self, err: reqwest::Error) -> SyncError {
        if err.is_timeout() {
            SyncError::Timeout(self.timeout)
        } else {
            SyncError::Network(err.to_string())
        }
    }

    async fn handle_response<T: for<'de> Deserialize<'de>>(
        &self,
        response: Response,
    ) -> Result<T, SyncError> {
        let status = response.status();
        if status.is_success() {
            response
                .json()
                .await
                .map_err(|e| SyncError::Decode(format!("failed to parse response: {}", e)))
        } else {
            Err(self.handle_error_response(response, status).await)
        }
    }

    async fn handle_error_response(&self, response: Response, status: StatusCode) -> SyncError {
        let message = match response.json::<ErrorBody>().await {
            Ok(ErrorBody {
                message: Some(message),
            }) => message,
            _ => status
                .canonical_reason()
                .unwrap_or("unknown error")
                .to_string(),
        };

        match status {
            StatusCode::CONFLICT => SyncError::Conflict(message),
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => SyncError::Rejected {
                status: status.as_u16(),
                message: format!("permission denied: {}", message),
            },
            _ => SyncError::Rejected {
                status: status.as_u16(),
                message,
            },
        }
    }
}

/// Error body shapes the service is known to return.
#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(alias = "detail", alias = "error")]
    message: Option<String>,
}

#[derive(Debug, Serialize)]
struct MoveBody<'a> {
    stage_id: &'a str,
    position: usize,
    expected_version: u64,
}

#[async_trait]
impl BoardSync for HttpBoardSync {
    fn name(&self) -> &'static str {
        "http"
    }

    async fn fetch_board(&self, project: &ProjectId) -> Result<PipelineSnapshot, SyncError> {
        let url = self.project_url(project, "board");
        tracing::debug!(%url, "fetching board");
        let response = self
            .client
            .get(&url)
            .headers(self.headers())
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;
        let payload: BoardPayload = self.handle_response(response).await?;
        payload.into_snapshot()
    }

    async fn move_paper(&self, request: MoveRequest) -> Result<ServerPlacement, SyncError> {
        let url = self.project_url(
            &request.project,
            &format!("papers/{}/stage", request.paper_id),
        );
        let body = MoveBody {
            stage_id: request.stage_id.as_str(),
            position: request.position,
            expected_version: request.expected_version,
        };
        tracing::debug!(
            %url,
            stage = %request.stage_id,
            position = request.position,
            expected_version = request.expected_version,
            "persisting move"
        );
        let response = self
            .client
            .patch(&url)
            .headers(self.headers())
            .json(&body)
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;
        self.handle_response(response).await
    }
}
