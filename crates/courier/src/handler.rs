//! Interactive message handling.
//!
//! Each inbound event runs the same pipeline: authorized-peer filter, read
//! acknowledgement, scoped typing indicator, dispatch under an outer
//! timeout, chunked reply. Every failure collapses into a single
//! glyph-prefixed message; nothing terminates the event loop.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tracing::{error, info, warn};

use crate::completion::CompletionApi;
use crate::transport::{InboundMessage, Outbox, SendOptions};

/// Prefix applied to successful replies.
const REPLY_PREFIX: &str = "🤖";

/// Reply sent when the outer reply timeout fires.
///
/// Distinct from the dispatcher's own timeout rendering: this one fires
/// even if the inner call hangs past its own deadline.
pub const REPLY_TIMEOUT_MESSAGE: &str =
    "⌛ Request took too long to process, please try again later";

/// Handles inbound events against the completion service.
pub struct InteractiveHandler {
    completion: Arc<dyn CompletionApi>,
    outbox: Outbox,
    authorized_peer: i64,
    reply_timeout: Duration,
}

impl InteractiveHandler {
    /// Create a new handler.
    pub fn new(
        completion: Arc<dyn CompletionApi>,
        outbox: Outbox,
        authorized_peer: i64,
        reply_timeout: Duration,
    ) -> Self {
        Self {
            completion,
            outbox,
            authorized_peer,
            reply_timeout,
        }
    }

    /// Run one inbound event to completion.
    pub async fn handle(&self, message: InboundMessage) {
        if message.sender_id != self.authorized_peer {
            warn!(
                "ignoring message from unauthorized sender {}",
                message.sender_id
            );
            return;
        }

        info!("new message from {}", message.sender_id);

        if let Err(err) = self.outbox.mark_read(message.chat_id).await {
            warn!("mark-read failed for chat {}: {}", message.chat_id, err);
        }

        let reply = self.compose_reply(&message).await;

        if let Err(err) = self
            .outbox
            .send_message(message.chat_id, reply, SendOptions::reply())
            .await
        {
            error!("failed to deliver reply to chat {}: {}", message.chat_id, err);
            return;
        }

        info!("reply delivered to {}", message.sender_id);
    }

    /// Produce the reply text, holding the typing indicator for the
    /// duration of the dispatch.
    ///
    /// Total: every failure path resolves to a user-facing string, and the
    /// indicator is released on each of them.
    async fn compose_reply(&self, message: &InboundMessage) -> String {
        let _typing = match self.outbox.begin_typing(message.chat_id).await {
            Ok(guard) => Some(guard),
            Err(err) => {
                warn!("typing indicator unavailable for chat {}: {}", message.chat_id, err);
                None
            }
        };

        match tokio::time::timeout(self.reply_timeout, self.completion.dispatch(&message.text))
            .await
        {
            Ok(Ok(text)) => format!("{REPLY_PREFIX} {text}"),
            Ok(Err(err)) => {
                error!("dispatch failed for chat {}: {}", message.chat_id, err);
                err.user_message()
            }
            Err(_) => {
                warn!("reply timed out for chat {}", message.chat_id);
                REPLY_TIMEOUT_MESSAGE.to_string()
            }
        }
    }
}

/// Dispatch inbound events to the handler, one spawned task per event, so a
/// slow dispatch never blocks the next message.
pub async fn run_event_loop(
    mut events: mpsc::Receiver<InboundMessage>,
    handler: Arc<InteractiveHandler>,
) {
    while let Some(message) = events.recv().await {
        let handler = Arc::clone(&handler);
        tokio::spawn(async move {
            handler.handle(message).await;
        });
    }
    info!("inbound event loop stopped");
}
