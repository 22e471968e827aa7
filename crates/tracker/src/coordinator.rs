//! Waiting-indicator state machine.
//!
//! [`StatusCoordinator`] tracks at most one job and drives the singleton
//! waiting indicator through two states: `Idle` (nothing tracked,
//! indicator hidden) and `Waiting` (tracked job, indicator visible,
//! countdown running). The indicator represents *waiting*, never
//! execution: any `running` or terminal status closes it in the same
//! handling step, so stale waiting UI cannot survive an event.
//!
//! The coordinator performs no network calls, trusts the snapshots and
//! events it is given, and never panics on input: unexpected input
//! degrades to `Idle`.

use std::sync::Arc;

use docq_core::countdown::Countdown;
use docq_core::job::{JobLimits, JobStatus, QueueEvent, SubmitResult};
use docq_core::types::JobId;

use crate::ui::{IndicatorView, WaitIndicator};

/// Invoked when the indicator closes (event-driven or user cancel).
pub type CloseCallback = Box<dyn Fn() + Send + Sync>;

/// Invoked with the job id when the user cancels the wait.
pub type CancelCallback = Box<dyn Fn(&JobId) + Send + Sync>;

// ---------------------------------------------------------------------------
// State
// ---------------------------------------------------------------------------

/// The single tracked-job slot. Overwritten, never merged.
struct TrackedJob {
    job_id: JobId,
    countdown: Countdown,
    /// Whether the time line is shown; an explicit `eta_ms <= 0` from the
    /// server hides it.
    show_eta: bool,
    position: Option<i64>,
    limits: Option<JobLimits>,
}

impl TrackedJob {
    fn view(&self) -> IndicatorView {
        IndicatorView {
            queue_line: self.position.filter(|p| *p > 0).map(format_queue_line),
            eta_line: if self.show_eta {
                Some(self.countdown.display())
            } else {
                None
            },
            limits_line: self.limits.as_ref().and_then(format_limits_line),
        }
    }
}

enum State {
    Idle,
    Waiting(TrackedJob),
}

// ---------------------------------------------------------------------------
// StatusCoordinator
// ---------------------------------------------------------------------------

/// The state machine behind the waiting indicator.
pub struct StatusCoordinator {
    state: State,
    indicator: Arc<dyn WaitIndicator>,
    on_close: Option<CloseCallback>,
    on_cancel: Option<CancelCallback>,
}

impl StatusCoordinator {
    /// Create an idle coordinator rendering through `indicator`.
    pub fn new(indicator: Arc<dyn WaitIndicator>) -> Self {
        Self {
            state: State::Idle,
            indicator,
            on_close: None,
            on_cancel: None,
        }
    }

    /// Set the callback fired when the indicator closes.
    pub fn set_on_close(&mut self, callback: CloseCallback) {
        self.on_close = Some(callback);
    }

    /// Set the callback fired when the user cancels the wait.
    pub fn set_on_cancel(&mut self, callback: CancelCallback) {
        self.on_cancel = Some(callback);
    }

    /// `true` while a job is tracked and the indicator is visible.
    pub fn is_waiting(&self) -> bool {
        matches!(self.state, State::Waiting(_))
    }

    /// Id of the tracked job, if any.
    pub fn tracked_job_id(&self) -> Option<&JobId> {
        match &self.state {
            State::Idle => None,
            State::Waiting(tracked) => Some(&tracked.job_id),
        }
    }

    /// Evaluate a submission snapshot.
    ///
    /// Replaces whatever was tracked before: the slot is overwritten,
    /// never merged. The indicator opens only for a queued job whose
    /// server snapshot did not suppress it (`modal_required == false`);
    /// a job that started immediately must never show a waiting dialog.
    pub fn observe_submission(&mut self, receipt: &SubmitResult) {
        if self.is_waiting() {
            tracing::debug!(
                job_id = %receipt.job_id,
                "New submission replaces the tracked job",
            );
            self.indicator.close();
            self.state = State::Idle;
        }

        if receipt.status != JobStatus::Queued || receipt.modal_required == Some(false) {
            tracing::debug!(
                job_id = %receipt.job_id,
                status = ?receipt.status,
                "No waiting indicator for this submission",
            );
            return;
        }

        let eta_ms = receipt.eta_ms.unwrap_or(0);
        let tracked = TrackedJob {
            job_id: receipt.job_id.clone(),
            countdown: Countdown::from_eta_ms(eta_ms),
            show_eta: eta_ms > 0,
            position: receipt.position,
            limits: receipt.limits.clone(),
        };
        self.indicator.open(&tracked.view());
        self.state = State::Waiting(tracked);
    }

    /// Consume a pushed lifecycle event.
    ///
    /// Events for jobs other than the tracked one are ignored here (other
    /// dispatcher listeners still see them). A `queued` event refreshes
    /// the display and re-seeds the countdown from the server estimate;
    /// anything else ends the wait in this same call.
    pub fn handle_event(&mut self, event: &QueueEvent) {
        let tracked_matches = match &self.state {
            State::Idle => {
                tracing::trace!(job_id = %event.job_id, "No tracked job, ignoring queue event");
                return;
            }
            State::Waiting(tracked) => tracked.job_id == event.job_id,
        };
        if !tracked_matches {
            tracing::trace!(
                job_id = %event.job_id,
                "Queue event for an untracked job, ignoring",
            );
            return;
        }

        if event.status != JobStatus::Queued {
            tracing::debug!(
                job_id = %event.job_id,
                status = ?event.status,
                "Tracked job left the queue, closing the waiting indicator",
            );
            self.close_tracked();
            return;
        }

        if let State::Waiting(tracked) = &mut self.state {
            tracked.position = event.position;
            if let Some(limits) = &event.limits {
                tracked.limits = Some(limits.clone());
            }
            if let Some(eta_ms) = event.eta_ms {
                tracked.countdown.reset(eta_ms);
                tracked.show_eta = eta_ms > 0;
            }
            let view = tracked.view();
            self.indicator.update(&view);
        }
    }

    /// User-initiated cancel: optimistic local close.
    ///
    /// Fires the cancel callback with the job id, closes the indicator,
    /// and returns the id so the caller can issue the server cancel
    /// independently. A rejected server cancel does not reopen the
    /// indicator.
    pub fn request_cancel(&mut self) -> Option<JobId> {
        let job_id = match &self.state {
            State::Idle => return None,
            State::Waiting(tracked) => tracked.job_id.clone(),
        };

        if let Some(on_cancel) = &self.on_cancel {
            on_cancel(&job_id);
        }
        tracing::info!(job_id = %job_id, "Wait cancelled by user, closing indicator");
        self.close_tracked();
        Some(job_id)
    }

    /// Advance the countdown one second.
    ///
    /// No-op in `Idle`, so a tick can never land on a closed indicator.
    /// Stops on its own at zero; the next `queued` event re-seeds it.
    pub fn tick(&mut self) {
        let State::Waiting(tracked) = &mut self.state else {
            return;
        };
        if !tracked.show_eta || tracked.countdown.is_finished() {
            return;
        }
        tracked.countdown.tick();
        let view = tracked.view();
        self.indicator.update(&view);
    }

    /// Close the indicator, clear tracking, fire the close callback.
    fn close_tracked(&mut self) {
        self.indicator.close();
        self.state = State::Idle;
        if let Some(on_close) = &self.on_close {
            on_close();
        }
    }
}

// ---------------------------------------------------------------------------
// Display text
// ---------------------------------------------------------------------------

fn format_queue_line(position: i64) -> String {
    if position == 1 {
        "1 person ahead".to_string()
    } else {
        format!("{position} people ahead")
    }
}

fn format_limits_line(limits: &JobLimits) -> Option<String> {
    if limits.is_empty() {
        return None;
    }
    Some(
        limits
            .iter()
            .map(|(name, cap)| format!("{name}: {cap}"))
            .collect::<Vec<_>>()
            .join(", "),
    )
}
