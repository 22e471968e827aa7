//! Integration tests for the queue notification channel.
//!
//! Each test runs an in-process WebSocket server on an ephemeral port and
//! drives a real [`NotificationChannel`] against it: handshake identity,
//! ping/pong liveness, queue_update fan-out, and the fixed-delay
//! reconnect behaviour.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use futures::{SinkExt, StreamExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::handshake::server::{ErrorResponse, Request, Response};
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::WebSocketStream;

use docq_client::channel::{ChannelConfig, NotificationChannel};
use docq_core::job::{JobStatus, QueueEvent};
use docq_events::EventDispatcher;

const USER_KEY: &str = "user_1700000000000_cafebabe";

/// Bind an ephemeral listener and return it with its `ws://` URL.
async fn bind_server() -> (TcpListener, String) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let ws_url = format!("ws://{}", listener.local_addr().unwrap());
    (listener, ws_url)
}

/// Build a channel with a short reconnect delay plus a receiver for
/// everything its dispatcher fans out.
fn build_channel(ws_url: String) -> (NotificationChannel, mpsc::UnboundedReceiver<QueueEvent>) {
    let dispatcher = Arc::new(EventDispatcher::new());
    let (event_tx, event_rx) = mpsc::unbounded_channel();
    dispatcher.subscribe(Arc::new(move |event: &QueueEvent| {
        let _ = event_tx.send(event.clone());
    }));

    let channel = NotificationChannel::new(
        ChannelConfig {
            ws_url,
            reconnect_delay: Duration::from_millis(100),
        },
        USER_KEY.to_string(),
        dispatcher,
    );
    (channel, event_rx)
}

/// Accept one connection, capturing the request URI.
async fn accept_with_uri(listener: &TcpListener) -> (WebSocketStream<TcpStream>, String) {
    let (stream, _addr) = listener.accept().await.unwrap();
    let uri = Arc::new(Mutex::new(String::new()));
    let uri_capture = Arc::clone(&uri);
    let ws = tokio_tungstenite::accept_hdr_async(
        stream,
        move |req: &Request, response: Response| -> Result<Response, ErrorResponse> {
            *uri_capture.lock().unwrap() = req.uri().to_string();
            Ok(response)
        },
    )
    .await
    .unwrap();
    let uri = uri.lock().unwrap().clone();
    (ws, uri)
}

/// Accept one connection without header capture.
async fn accept_plain(listener: &TcpListener) -> WebSocketStream<TcpStream> {
    let (stream, _addr) = listener.accept().await.unwrap();
    tokio_tungstenite::accept_async(stream).await.unwrap()
}

/// Read the next text frame from the server side of the socket.
async fn next_text(ws: &mut WebSocketStream<TcpStream>) -> String {
    loop {
        let frame = tokio::time::timeout(Duration::from_secs(2), ws.next())
            .await
            .expect("timed out waiting for a frame")
            .expect("connection closed unexpectedly")
            .expect("receive error");
        if let Message::Text(text) = frame {
            return text;
        }
    }
}

// ---------------------------------------------------------------------------
// Test: handshake carries the identity, pings are answered with pongs
// ---------------------------------------------------------------------------

#[tokio::test]
async fn connect_embeds_identity_and_answers_ping() {
    let (listener, ws_url) = bind_server().await;
    let (channel, mut event_rx) = build_channel(ws_url);

    channel.connect();
    let (mut ws, uri) = accept_with_uri(&listener).await;
    assert_eq!(uri, format!("/ws/queue?user_key={USER_KEY}"));

    ws.send(Message::Text(r#"{"type":"ping"}"#.into()))
        .await
        .unwrap();

    assert_eq!(next_text(&mut ws).await, r#"{"type":"pong"}"#);
    assert!(channel.is_connected());
    // Liveness traffic must never reach the listeners.
    assert!(event_rx.try_recv().is_err());

    channel.shutdown().await;
}

// ---------------------------------------------------------------------------
// Test: queue updates fan out, malformed frames are dropped silently
// ---------------------------------------------------------------------------

#[tokio::test]
async fn queue_updates_fan_out_and_malformed_frames_are_dropped() {
    let (listener, ws_url) = bind_server().await;
    let (channel, mut event_rx) = build_channel(ws_url);

    channel.connect();
    let mut ws = accept_plain(&listener).await;

    ws.send(Message::Text(
        r#"{"type":"queue_update","job_id":"J1","status":"queued","position":3,"eta_ms":90000}"#
            .into(),
    ))
    .await
    .unwrap();

    let event = tokio::time::timeout(Duration::from_secs(2), event_rx.recv())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(event.job_id, "J1");
    assert_eq!(event.status, JobStatus::Queued);
    assert_eq!(event.position, Some(3));
    assert_eq!(event.eta_ms, Some(90000));

    // A malformed frame must not close the connection or produce an event.
    ws.send(Message::Text("not json at all".into())).await.unwrap();
    ws.send(Message::Text(
        r#"{"type":"queue_update","job_id":"J1","status":"done"}"#.into(),
    ))
    .await
    .unwrap();

    let event = tokio::time::timeout(Duration::from_secs(2), event_rx.recv())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(event.status, JobStatus::Done);

    channel.shutdown().await;
}

// ---------------------------------------------------------------------------
// Test: a dropped connection triggers exactly one reconnect
// ---------------------------------------------------------------------------

#[tokio::test]
async fn dropped_connection_triggers_exactly_one_reconnect() {
    let (listener, ws_url) = bind_server().await;
    let (channel, _event_rx) = build_channel(ws_url);

    channel.connect();
    let first = accept_plain(&listener).await;

    // Server-side drop: the client should come back after the fixed delay.
    drop(first);
    let second = tokio::time::timeout(Duration::from_secs(2), accept_plain(&listener)).await;
    let _second = second.expect("expected a reconnect after the fixed delay");
    assert!(channel.is_running());

    // While the new connection is alive no further attempts may be made.
    let third = tokio::time::timeout(Duration::from_millis(400), listener.accept()).await;
    assert!(third.is_err(), "unexpected extra connection attempt");

    channel.shutdown().await;
}

// ---------------------------------------------------------------------------
// Test: connect() is an idempotent one-shot latch
// ---------------------------------------------------------------------------

#[tokio::test]
async fn connect_is_idempotent_while_running() {
    let (listener, ws_url) = bind_server().await;
    let (channel, _event_rx) = build_channel(ws_url);

    channel.connect();
    channel.connect();
    channel.connect();

    let _ws = accept_plain(&listener).await;

    // Only the first connect spawned a task, so only one socket shows up.
    let extra = tokio::time::timeout(Duration::from_millis(400), listener.accept()).await;
    assert!(extra.is_err(), "duplicate connection attempt");

    channel.shutdown().await;
}

// ---------------------------------------------------------------------------
// Test: shutdown stops the task and prevents further reconnects
// ---------------------------------------------------------------------------

#[tokio::test]
async fn shutdown_stops_reconnecting() {
    let (listener, ws_url) = bind_server().await;
    let (channel, _event_rx) = build_channel(ws_url);

    channel.connect();
    let ws = accept_plain(&listener).await;

    channel.shutdown().await;
    drop(ws);
    assert!(!channel.is_running());

    // No reconnect may be scheduled after shutdown.
    let attempt = tokio::time::timeout(Duration::from_millis(400), listener.accept()).await;
    assert!(attempt.is_err(), "reconnect attempted after shutdown");
}
