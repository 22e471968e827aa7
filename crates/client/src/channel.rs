//! Persistent push-notification channel.
//!
//! [`NotificationChannel`] maintains at most one WebSocket connection to
//! the queue backend per instance. The connection is opened lazily on the
//! first [`connect`](NotificationChannel::connect) call, answers liveness
//! pings, forwards `queue_update` messages to the
//! [`EventDispatcher`], and reconnects on its own after an unexpected
//! close. Correlation is by `job_id`, not by connection identity, so a
//! reconnect never orphans a tracked job.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use futures::{SinkExt, StreamExt};
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;
use tokio_util::sync::CancellationToken;

use docq_core::types::ClientIdentity;
use docq_events::EventDispatcher;

use crate::messages::{parse_message, ClientMessage, ServerMessage};
use crate::reconnect::{reconnect_loop, WsStream, DEFAULT_RECONNECT_DELAY};

/// Connection settings for the queue channel.
#[derive(Debug, Clone)]
pub struct ChannelConfig {
    /// WebSocket base URL, e.g. `ws://host:8000`.
    pub ws_url: String,
    /// Delay between a connection loss and the retry attempt.
    pub reconnect_delay: Duration,
}

impl ChannelConfig {
    /// Config with the default 5 s reconnect delay.
    pub fn new(ws_url: impl Into<String>) -> Self {
        Self {
            ws_url: ws_url.into(),
            reconnect_delay: DEFAULT_RECONNECT_DELAY,
        }
    }
}

/// Owns the single WebSocket connection task for this client.
///
/// Designed to be shared via `Arc<NotificationChannel>`. `connect` is an
/// idempotent one-shot latch: while the connection task is alive, further
/// calls are no-ops, so duplicate connections cannot exist.
pub struct NotificationChannel {
    config: ChannelConfig,
    user_key: ClientIdentity,
    dispatcher: Arc<EventDispatcher>,
    connected: Arc<AtomicBool>,
    task: Mutex<Option<tokio::task::JoinHandle<()>>>,
    cancel: CancellationToken,
}

impl NotificationChannel {
    /// Create a channel for `user_key`. No connection is made until
    /// [`connect`](Self::connect).
    pub fn new(
        config: ChannelConfig,
        user_key: ClientIdentity,
        dispatcher: Arc<EventDispatcher>,
    ) -> Self {
        Self {
            config,
            user_key,
            dispatcher,
            connected: Arc::new(AtomicBool::new(false)),
            task: Mutex::new(None),
            cancel: CancellationToken::new(),
        }
    }

    /// Start the connection task if it is not already running.
    ///
    /// Must be called from within a tokio runtime. The identity is
    /// embedded in the connection URL as the `user_key` query parameter.
    pub fn connect(&self) {
        let mut task = self.task.lock().unwrap_or_else(|e| e.into_inner());
        if task.as_ref().is_some_and(|handle| !handle.is_finished()) {
            tracing::debug!("Queue channel already running, ignoring connect request");
            return;
        }

        let url = format!("{}/ws/queue?user_key={}", self.config.ws_url, self.user_key);
        let delay = self.config.reconnect_delay;
        let dispatcher = Arc::clone(&self.dispatcher);
        let connected = Arc::clone(&self.connected);
        let cancel = self.cancel.clone();

        *task = Some(tokio::spawn(async move {
            run_connection_loop(&url, delay, &dispatcher, &connected, &cancel).await;
            tracing::info!("Queue channel task exited");
        }));
    }

    /// `true` while a WebSocket connection is established.
    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    /// `true` while the connection task (connected or reconnecting) is
    /// alive.
    pub fn is_running(&self) -> bool {
        self.task
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .as_ref()
            .is_some_and(|handle| !handle.is_finished())
    }

    /// Stop the connection task and close the socket.
    ///
    /// Waits up to 5 seconds for a clean exit.
    pub async fn shutdown(&self) {
        tracing::info!("Shutting down queue channel");
        self.cancel.cancel();

        let handle = self
            .task
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .take();
        if let Some(handle) = handle {
            let _ = tokio::time::timeout(Duration::from_secs(5), handle).await;
        }
    }
}

/// Core connection loop: connect -> process messages -> reconnect.
///
/// Runs until the cancellation token is triggered. The loop body is the
/// only place a retry is ever scheduled, so at most one reconnect is
/// pending at any moment.
async fn run_connection_loop(
    url: &str,
    delay: Duration,
    dispatcher: &EventDispatcher,
    connected: &AtomicBool,
    cancel: &CancellationToken,
) {
    // Initial attempt is immediate; failures fall into the fixed-delay loop.
    let mut next = match connect_async(url).await {
        Ok((stream, _response)) => {
            tracing::info!("Connected to queue channel");
            Some(stream)
        }
        Err(e) => {
            tracing::warn!(error = %e, "Queue channel connect failed, entering reconnect loop");
            reconnect_loop(url, delay, cancel).await
        }
    };

    while let Some(stream) = next {
        connected.store(true, Ordering::SeqCst);
        process_messages(stream, dispatcher, cancel).await;
        connected.store(false, Ordering::SeqCst);

        if cancel.is_cancelled() {
            return;
        }

        tracing::info!("Queue channel connection lost, entering reconnect loop");
        next = reconnect_loop(url, delay, cancel).await;
    }
}

/// Read frames until the connection drops or the token is cancelled.
///
/// Text frames are parsed into [`ServerMessage`]; liveness pings are
/// answered in place and `queue_update`s fan out through the dispatcher.
/// Malformed payloads are logged and dropped without closing the
/// connection. Transport-level ping/pong is handled by tungstenite.
async fn process_messages(
    mut stream: WsStream,
    dispatcher: &EventDispatcher,
    cancel: &CancellationToken,
) {
    loop {
        let frame = tokio::select! {
            _ = cancel.cancelled() => {
                let _ = stream.close(None).await;
                return;
            }
            frame = stream.next() => frame,
        };

        let Some(result) = frame else {
            // Stream exhausted without a close frame.
            return;
        };

        match result {
            Ok(Message::Text(text)) => {
                handle_text_frame(&text, &mut stream, dispatcher).await;
            }
            Ok(Message::Binary(_)) => {
                tracing::trace!("Ignoring binary frame on queue channel");
            }
            Ok(Message::Ping(_) | Message::Pong(_)) => {
                // Handled automatically by tungstenite.
            }
            Ok(Message::Close(frame)) => {
                tracing::info!(?frame, "Queue channel closed by server");
                return;
            }
            Ok(Message::Frame(_)) => {}
            Err(e) => {
                tracing::error!(error = %e, "Queue channel receive error");
                return;
            }
        }
    }
}

/// Parse and route a single text frame.
async fn handle_text_frame(text: &str, stream: &mut WsStream, dispatcher: &EventDispatcher) {
    match parse_message(text) {
        Ok(ServerMessage::Ping) => {
            // Liveness probe: answer and do not forward to listeners.
            if let Err(e) = stream
                .send(Message::Text(ClientMessage::Pong.to_text()))
                .await
            {
                tracing::warn!(error = %e, "Failed to send pong");
            }
        }
        Ok(ServerMessage::QueueUpdate(event)) => {
            tracing::trace!(
                job_id = %event.job_id,
                status = ?event.status,
                "Queue update received",
            );
            dispatcher.dispatch(&event);
        }
        Err(e) => {
            tracing::warn!(
                error = %e,
                raw_message = %text,
                "Failed to parse queue channel message",
            );
        }
    }
}
