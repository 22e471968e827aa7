//! Fixed-delay reconnection for the queue channel.
//!
//! When the WebSocket drops, the channel task calls [`reconnect_loop`]
//! to keep retrying until the connection is restored or the
//! [`CancellationToken`] is triggered. The delay is deliberately flat:
//! no backoff growth, no retry cap. An idle connection costs the server
//! nothing, so retries are cheap and indefinite.

use std::time::Duration;

use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tokio_util::sync::CancellationToken;

/// A live WebSocket stream to the queue backend.
pub type WsStream = WebSocketStream<MaybeTlsStream<tokio::net::TcpStream>>;

/// Delay between the loss of a connection and the retry attempt.
pub const DEFAULT_RECONNECT_DELAY: Duration = Duration::from_millis(5_000);

/// Retry connecting to `url` at a fixed cadence.
///
/// Each cycle waits the full `delay` first, then attempts one connect,
/// so a dropped connection is followed by exactly one pending retry at
/// any moment. Returns `Some(stream)` once a connection succeeds, or
/// `None` if `cancel` is triggered before then.
pub async fn reconnect_loop(
    url: &str,
    delay: Duration,
    cancel: &CancellationToken,
) -> Option<WsStream> {
    let mut attempt = 0u32;

    loop {
        // Wait before the attempt, respecting cancellation.
        tokio::select! {
            _ = cancel.cancelled() => {
                tracing::info!("Reconnect cancelled");
                return None;
            }
            _ = tokio::time::sleep(delay) => {}
        }

        attempt += 1;
        tracing::info!(
            attempt,
            delay_ms = delay.as_millis() as u64,
            "Reconnecting to queue channel",
        );

        tokio::select! {
            _ = cancel.cancelled() => {
                tracing::info!("Reconnect cancelled");
                return None;
            }
            result = connect_async(url) => {
                match result {
                    Ok((stream, _response)) => {
                        tracing::info!(attempt, "Reconnected to queue channel");
                        return Some(stream);
                    }
                    Err(e) => {
                        tracing::warn!(
                            attempt,
                            error = %e,
                            "Reconnect attempt failed",
                        );
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_delay_is_five_seconds() {
        assert_eq!(DEFAULT_RECONNECT_DELAY, Duration::from_millis(5_000));
    }

    #[tokio::test]
    async fn cancellation_token_stops_reconnect() {
        let cancel = CancellationToken::new();
        // Cancel up front: the loop must return None without connecting.
        cancel.cancel();

        let result = reconnect_loop("ws://localhost:9", Duration::from_millis(10), &cancel).await;
        assert!(result.is_none());
    }

    #[tokio::test]
    async fn cancellation_during_delay_stops_reconnect() {
        let cancel = CancellationToken::new();
        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            trigger.cancel();
        });

        let result = reconnect_loop("ws://localhost:9", Duration::from_secs(60), &cancel).await;
        assert!(result.is_none());
    }
}
