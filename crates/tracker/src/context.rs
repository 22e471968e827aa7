//! The composing context for the docq client.
//!
//! [`JobTracker`] owns the identity, dispatcher, channel, gateway and
//! coordinator, and wires their lifecycles together: created once by
//! whoever composes the application shell, torn down with
//! [`shutdown`](JobTracker::shutdown). Nothing here is global: two
//! trackers are two fully independent clients.

use std::sync::{Arc, Mutex};

use docq_client::channel::{ChannelConfig, NotificationChannel};
use docq_client::config::ClientConfig;
use docq_client::gateway::{GatewayError, JobGateway};
use docq_core::identity::IdentityStore;
use docq_core::job::{JobSubmission, QueueEvent, SubmitResult};
use docq_core::types::ClientIdentity;
use docq_events::EventDispatcher;

use crate::coordinator::StatusCoordinator;
use crate::ticker::start_countdown_ticker;
use crate::ui::{Notifier, Severity, WaitIndicator};

/// One client instance: identity, event plumbing, job control and the
/// waiting-indicator state machine.
pub struct JobTracker {
    identity: ClientIdentity,
    gateway: Arc<JobGateway>,
    channel: Arc<NotificationChannel>,
    dispatcher: Arc<EventDispatcher>,
    coordinator: Arc<Mutex<StatusCoordinator>>,
    notifier: Arc<dyn Notifier>,
    ticker: tokio::task::JoinHandle<()>,
}

impl JobTracker {
    /// Compose a tracker from configuration and the shell's UI ports.
    ///
    /// Reads or creates the durable identity, subscribes the coordinator
    /// to the dispatcher and starts the countdown ticker. Must be called
    /// from within a tokio runtime. The notification channel stays closed
    /// until the first successful submission.
    pub fn new(
        config: ClientConfig,
        indicator: Arc<dyn WaitIndicator>,
        notifier: Arc<dyn Notifier>,
    ) -> Arc<Self> {
        let identity = IdentityStore::new(&config.identity_path).get_or_create();
        tracing::info!(identity = %identity, "Client identity ready");

        let dispatcher = Arc::new(EventDispatcher::new());
        let coordinator = Arc::new(Mutex::new(StatusCoordinator::new(indicator)));

        // Fan pushed events into the state machine. Other listeners can
        // subscribe alongside; the dispatcher isolates their failures.
        let coordinator_listener = Arc::clone(&coordinator);
        dispatcher.subscribe(Arc::new(move |event: &QueueEvent| {
            coordinator_listener
                .lock()
                .unwrap_or_else(|e| e.into_inner())
                .handle_event(event);
        }));

        let channel = Arc::new(NotificationChannel::new(
            ChannelConfig {
                ws_url: config.ws_url.clone(),
                reconnect_delay: config.reconnect_delay(),
            },
            identity.clone(),
            Arc::clone(&dispatcher),
        ));
        let gateway = Arc::new(JobGateway::new(config.api_url.clone(), identity.clone()));
        let ticker = start_countdown_ticker(Arc::clone(&coordinator));

        Arc::new(Self {
            identity,
            gateway,
            channel,
            dispatcher,
            coordinator,
            notifier,
            ticker,
        })
    }

    /// Submit a job and start tracking it.
    ///
    /// On success the notification channel is (lazily) connected, since a
    /// queued job is meaningless without a live event feed, and the
    /// snapshot is handed to the coordinator, which decides whether the
    /// waiting indicator opens. A gateway failure is surfaced through
    /// the notifier and returned; the coordinator never sees it.
    pub async fn submit(&self, submission: &JobSubmission) -> Result<SubmitResult, GatewayError> {
        let receipt = match self.gateway.submit(submission).await {
            Ok(receipt) => receipt,
            Err(e) => {
                self.notifier.notify(Severity::Error, &e.to_string());
                return Err(e);
            }
        };

        tracing::info!(
            job_id = %receipt.job_id,
            status = ?receipt.status,
            position = ?receipt.position,
            "Job submitted",
        );

        self.channel.connect();
        self.coordinator
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .observe_submission(&receipt);
        Ok(receipt)
    }

    /// Cancel the tracked wait, if any.
    ///
    /// The indicator closes immediately (optimistic local close); the
    /// server cancel proceeds independently and a rejection is surfaced
    /// as a notification, never by reopening the indicator.
    pub async fn cancel_tracked(&self) {
        let job_id = self
            .coordinator
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .request_cancel();

        let Some(job_id) = job_id else {
            return;
        };

        if let Err(e) = self.gateway.cancel(&job_id).await {
            self.notifier.notify(
                Severity::Warning,
                &format!("Cancel for job {job_id} was not accepted: {e}"),
            );
        }
    }

    /// Register a callback fired whenever the waiting indicator closes.
    pub fn set_close_callback(&self, callback: impl Fn() + Send + Sync + 'static) {
        self.coordinator
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .set_on_close(Box::new(callback));
    }

    /// Register a callback fired with the job id on user cancel.
    pub fn set_cancel_callback(
        &self,
        callback: impl Fn(&docq_core::types::JobId) + Send + Sync + 'static,
    ) {
        self.coordinator
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .set_on_cancel(Box::new(callback));
    }

    /// The durable client identity.
    pub fn identity(&self) -> &ClientIdentity {
        &self.identity
    }

    /// Request/response job control.
    pub fn gateway(&self) -> &Arc<JobGateway> {
        &self.gateway
    }

    /// The push-notification channel.
    pub fn channel(&self) -> &Arc<NotificationChannel> {
        &self.channel
    }

    /// The event dispatcher, for additional listeners.
    pub fn dispatcher(&self) -> &Arc<EventDispatcher> {
        &self.dispatcher
    }

    /// The waiting-indicator state machine.
    pub fn coordinator(&self) -> &Arc<Mutex<StatusCoordinator>> {
        &self.coordinator
    }

    /// Tear down background work: close the channel, stop the ticker.
    pub async fn shutdown(&self) {
        self.channel.shutdown().await;
        self.ticker.abort();
    }
}
