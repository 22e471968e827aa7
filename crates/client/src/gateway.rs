//! REST client for the job-control endpoints.
//!
//! Wraps the queue HTTP API (submission, status lookup, cancellation,
//! aggregate queue state, localized string tables) using [`reqwest`].
//! Every operation is a single request/response exchange with no internal
//! retry; retry policy belongs to the caller.

use std::collections::HashMap;

use serde::Deserialize;

use docq_core::job::{JobSnapshot, JobSubmission, QueueStatusSnapshot, SubmitResult};
use docq_core::types::{ClientIdentity, JobId};

/// HTTP client for one queue backend.
///
/// Holds the client identity so that submissions and cancellations are
/// correlated with the same anonymous user the server saw before.
pub struct JobGateway {
    client: reqwest::Client,
    api_url: String,
    user_key: ClientIdentity,
}

/// Errors from the job-control REST layer.
#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    /// The HTTP request itself failed (network, DNS, TLS, etc.).
    #[error("HTTP request failed: {0}")]
    Transport(#[from] reqwest::Error),

    /// The server refused the submission.
    #[error("Submission rejected: {message}")]
    Submission { message: String },

    /// The server reports no such job (evicted or never existed).
    #[error("Job {job_id} not found")]
    NotFound { job_id: JobId },

    /// The server refused the cancellation (e.g. wrong identity).
    #[error("Cancel rejected: {message}")]
    Cancel { message: String },

    /// Any other non-2xx response.
    #[error("Queue API error ({status}): {body}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// Raw response body for debugging.
        body: String,
    },
}

/// Error body shape the server uses for rejections: `{"detail": "..."}`.
#[derive(Debug, Default, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    detail: Option<String>,
}

/// Response body of `POST /queue/cancel/{id}`: `{"ok": true}` or
/// `{"ok": false, "detail": "..."}`.
#[derive(Debug, Default, Deserialize)]
struct CancelResponse {
    #[serde(default)]
    ok: Option<bool>,
    #[serde(default)]
    detail: Option<String>,
}

impl JobGateway {
    /// Create a gateway for the queue backend at `api_url`.
    pub fn new(api_url: String, user_key: ClientIdentity) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_url,
            user_key,
        }
    }

    /// Create a gateway reusing an existing [`reqwest::Client`] (useful
    /// for connection pooling across components).
    pub fn with_client(
        client: reqwest::Client,
        api_url: String,
        user_key: ClientIdentity,
    ) -> Self {
        Self {
            client,
            api_url,
            user_key,
        }
    }

    /// Submit a job for processing.
    ///
    /// Sends `POST /queue/submit` with the submission plus the client
    /// identity. The server decides whether the job starts immediately
    /// or is queued; the returned [`SubmitResult`] snapshot says which.
    pub async fn submit(&self, submission: &JobSubmission) -> Result<SubmitResult, GatewayError> {
        let body = serde_json::json!({
            "service": submission.service,
            "action": submission.action,
            "params": submission.params,
            "limits": submission.limits,
            "user_key": self.user_key,
        });

        let response = self
            .client
            .post(format!("{}/queue/submit", self.api_url))
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = Self::read_body(response).await;
            return Err(GatewayError::Submission {
                message: server_detail(status.as_u16(), &body),
            });
        }
        Ok(response.json::<SubmitResult>().await?)
    }

    /// Fetch a point-in-time snapshot of one job.
    ///
    /// Sends `GET /queue/job/{job_id}`. A 404 maps to
    /// [`GatewayError::NotFound`].
    pub async fn status(&self, job_id: &str) -> Result<JobSnapshot, GatewayError> {
        let response = self
            .client
            .get(format!("{}/queue/job/{}", self.api_url, job_id))
            .send()
            .await?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Err(GatewayError::NotFound {
                job_id: job_id.to_string(),
            });
        }
        Self::parse_response(response).await
    }

    /// Cancel a queued or running job.
    ///
    /// Sends `POST /queue/cancel/{job_id}?user_key=...` so the server can
    /// verify that only the submitting identity cancels its own job.
    pub async fn cancel(&self, job_id: &str) -> Result<(), GatewayError> {
        let response = self
            .client
            .post(format!("{}/queue/cancel/{}", self.api_url, job_id))
            .query(&[("user_key", self.user_key.as_str())])
            .send()
            .await?;

        let status = response.status();
        let body = Self::read_body(response).await;
        if !status.is_success() {
            return Err(GatewayError::Cancel {
                message: server_detail(status.as_u16(), &body),
            });
        }

        let parsed: CancelResponse = serde_json::from_str(&body).unwrap_or_default();
        if parsed.ok == Some(false) {
            return Err(GatewayError::Cancel {
                message: parsed
                    .detail
                    .unwrap_or_else(|| "cancel rejected by server".to_string()),
            });
        }
        Ok(())
    }

    /// Fetch the aggregate queue state, optionally filtered by service.
    ///
    /// Sends `GET /queue/status[?service=...]`. Read-only; no failure
    /// modes beyond transport and unexpected responses.
    pub async fn queue_status(
        &self,
        service: Option<&str>,
    ) -> Result<QueueStatusSnapshot, GatewayError> {
        let mut request = self.client.get(format!("{}/queue/status", self.api_url));
        if let Some(service) = service {
            request = request.query(&[("service", service)]);
        }
        Self::parse_response(request.send().await?).await
    }

    /// Fetch the localized string table for `lang` (`tr`/`en`).
    ///
    /// Sends `GET /queue/texts/{lang}`. The table is returned raw; text
    /// lookup and fallback are the caller's concern.
    pub async fn texts(&self, lang: &str) -> Result<HashMap<String, String>, GatewayError> {
        let response = self
            .client
            .get(format!("{}/queue/texts/{}", self.api_url, lang))
            .send()
            .await?;
        Self::parse_response(response).await
    }

    /// Identity attached to submissions and cancellations.
    pub fn user_key(&self) -> &str {
        &self.user_key
    }

    // ---- private helpers ----

    /// Parse a successful JSON response body into the expected type,
    /// mapping non-2xx statuses to [`GatewayError::Api`].
    async fn parse_response<T: serde::de::DeserializeOwned>(
        response: reqwest::Response,
    ) -> Result<T, GatewayError> {
        let status = response.status();
        if !status.is_success() {
            let body = Self::read_body(response).await;
            return Err(GatewayError::Api {
                status: status.as_u16(),
                body,
            });
        }
        Ok(response.json::<T>().await?)
    }

    /// Read the response body, substituting a marker when unreadable.
    async fn read_body(response: reqwest::Response) -> String {
        response
            .text()
            .await
            .unwrap_or_else(|_| "<unreadable body>".to_string())
    }
}

/// Pick the most useful human-readable rejection message: the server's
/// `detail` field when present, otherwise the raw body, otherwise the
/// bare status code.
fn server_detail(status: u16, body: &str) -> String {
    if let Some(detail) = serde_json::from_str::<ErrorBody>(body)
        .ok()
        .and_then(|b| b.detail)
    {
        return detail;
    }
    if body.trim().is_empty() {
        return format!("server returned status {status}");
    }
    body.to_string()
}
