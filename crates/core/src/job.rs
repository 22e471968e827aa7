//! Job lifecycle types and wire DTOs.
//!
//! The client never mutates job state locally: a job is created by a
//! submit call and then observed through [`JobSnapshot`]s and pushed
//! [`QueueEvent`]s until it reaches a terminal status.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::types::JobId;

/// Named numeric caps applied to a job class (max file size, max rows,
/// max pages). Ordered so rendered limit text is deterministic.
pub type JobLimits = BTreeMap<String, i64>;

/// Server-side job lifecycle status.
///
/// Strictly ordered: once a job reaches `done`, `fail` or `canceled` it
/// is terminal and emits no further events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Queued,
    Running,
    Done,
    Fail,
    Canceled,
}

impl JobStatus {
    /// `true` for `done`, `fail` and `canceled`.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Done | Self::Fail | Self::Canceled)
    }
}

/// A job submission as the caller describes it.
///
/// The gateway attaches the client identity before sending, so the
/// `user_key` never appears here.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobSubmission {
    /// Processing service, e.g. `"spreadsheet"`, `"pdf"`, `"ocr"`.
    pub service: String,
    /// Operation within the service, e.g. `"convert"`, `"extract"`.
    pub action: String,
    /// Free-form service-specific parameters.
    pub params: serde_json::Value,
    #[serde(default)]
    pub limits: Option<JobLimits>,
}

/// Response returned by `POST /queue/submit`.
///
/// `modal_required` is the server's veto on the waiting indicator: an
/// explicit `false` suppresses it even for a queued job.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmitResult {
    pub job_id: JobId,
    pub status: JobStatus,
    #[serde(default)]
    pub modal_required: Option<bool>,
    #[serde(default)]
    pub eta_ms: Option<i64>,
    #[serde(default)]
    pub position: Option<i64>,
    #[serde(default)]
    pub limits: Option<JobLimits>,
}

/// Point-in-time job state returned by `GET /queue/job/{id}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobSnapshot {
    pub job_id: JobId,
    pub status: JobStatus,
    #[serde(default)]
    pub position: Option<i64>,
    #[serde(default)]
    pub eta_ms: Option<i64>,
    #[serde(default)]
    pub limits: Option<JobLimits>,
}

/// A pushed lifecycle update correlated to exactly one job.
///
/// `position` is meaningful only while `status` is `queued`; absent or
/// zero means "about to run". `eta_ms` is advisory and may move in
/// either direction between events.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueueEvent {
    pub job_id: JobId,
    pub status: JobStatus,
    #[serde(default)]
    pub position: Option<i64>,
    #[serde(default)]
    pub eta_ms: Option<i64>,
    #[serde(default)]
    pub limits: Option<JobLimits>,
}

/// Aggregate queue state returned by `GET /queue/status`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueueStatusSnapshot {
    #[serde(default)]
    pub total_queued: i64,
    #[serde(default)]
    pub total_running: i64,
    #[serde(default)]
    pub eta_ms: Option<i64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_serializes_lowercase() {
        let json = serde_json::to_string(&JobStatus::Queued).unwrap();
        assert_eq!(json, r#""queued""#);
        let json = serde_json::to_string(&JobStatus::Canceled).unwrap();
        assert_eq!(json, r#""canceled""#);
    }

    #[test]
    fn terminal_statuses() {
        assert!(!JobStatus::Queued.is_terminal());
        assert!(!JobStatus::Running.is_terminal());
        assert!(JobStatus::Done.is_terminal());
        assert!(JobStatus::Fail.is_terminal());
        assert!(JobStatus::Canceled.is_terminal());
    }

    #[test]
    fn submit_result_optional_fields_default() {
        let json = r#"{"job_id":"J1","status":"queued"}"#;
        let result: SubmitResult = serde_json::from_str(json).unwrap();
        assert_eq!(result.job_id, "J1");
        assert_eq!(result.status, JobStatus::Queued);
        assert!(result.modal_required.is_none());
        assert!(result.eta_ms.is_none());
        assert!(result.position.is_none());
        assert!(result.limits.is_none());
    }

    #[test]
    fn queue_event_with_limits() {
        let json = r#"{"job_id":"J1","status":"queued","position":3,"eta_ms":90000,"limits":{"max_pages":50,"max_rows":10000}}"#;
        let event: QueueEvent = serde_json::from_str(json).unwrap();
        assert_eq!(event.position, Some(3));
        assert_eq!(event.eta_ms, Some(90000));
        let limits = event.limits.unwrap();
        assert_eq!(limits["max_pages"], 50);
        assert_eq!(limits["max_rows"], 10000);
    }

    #[test]
    fn unknown_status_is_rejected() {
        let json = r#"{"job_id":"J1","status":"paused"}"#;
        assert!(serde_json::from_str::<QueueEvent>(json).is_err());
    }
}
