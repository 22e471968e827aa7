//! Queue channel message types and parser.
//!
//! The server pushes JSON messages of the shape `{"type": "<kind>", ...}`
//! over the WebSocket. This module deserializes them into a closed
//! [`ServerMessage`] enum so a new message type added later fails parsing
//! loudly instead of silently falling through.

use serde::{Deserialize, Serialize};

use docq_core::job::QueueEvent;

/// All known inbound queue channel messages.
///
/// Deserialized via the internally tagged `"type"` field.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    /// Liveness probe. Must be answered with a [`ClientMessage::Pong`]
    /// and is never forwarded to listeners.
    Ping,

    /// A job lifecycle update correlated to one `job_id`.
    QueueUpdate(QueueEvent),
}

/// Outbound application messages.
///
/// The pong reply is the only application-level message the client ever
/// sends.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    Pong,
}

impl ClientMessage {
    /// Serialize for a WebSocket text frame.
    pub fn to_text(&self) -> String {
        // A unit variant of a tagged enum cannot fail to serialize.
        serde_json::to_string(self).expect("outbound messages serialize to JSON")
    }
}

/// Parse a queue channel text frame into a typed message.
///
/// Returns `Err` for malformed JSON or unknown `type` values. Callers
/// log and drop such frames without closing the connection.
pub fn parse_message(text: &str) -> Result<ServerMessage, serde_json::Error> {
    serde_json::from_str(text)
}
