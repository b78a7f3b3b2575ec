//! Gateway wire protocol.
//!
//! JSON frames exchanged with the chat gateway over a WebSocket. The
//! gateway owns the chat network's connection and login handshake; courier
//! only speaks this protocol.

use serde::{Deserialize, Serialize};
use tokio_tungstenite::tungstenite::Message;

/// Events sent by the gateway to courier.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum GatewayEvent {
    /// The gateway's own chat link is established and authenticated.
    Connected,

    /// Heartbeat/keepalive.
    Ping,

    /// A new inbound chat message.
    Message {
        sender_id: i64,
        chat_id: i64,
        text: String,
    },
}

impl GatewayEvent {
    /// Decode a text frame payload.
    pub fn parse(raw: &str) -> serde_json::Result<Self> {
        serde_json::from_str(raw)
    }
}

/// Commands sent by courier to the gateway.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum GatewayCommand {
    /// Deliver one chunk of text to a chat.
    SendMessage {
        chat_id: i64,
        text: String,
        /// Suppress the recipient-side notification.
        silent: bool,
        /// Allow the chat client to render link previews.
        link_preview: bool,
    },

    /// Toggle the typing indicator in a chat.
    Typing { chat_id: i64, active: bool },

    /// Acknowledge a chat as read.
    MarkRead { chat_id: i64 },
}

impl GatewayCommand {
    /// Encode as a WebSocket text frame.
    pub fn to_frame(&self) -> Message {
        let json = serde_json::to_string(self).expect("gateway command serializes to JSON");
        Message::Text(json.into())
    }
}

/// An inbound chat message as surfaced to the interactive handler.
#[derive(Debug, Clone)]
pub struct InboundMessage {
    pub sender_id: i64,
    pub chat_id: i64,
    pub text: String,
}
