//! Serialized outbound path.
//!
//! Every outbound frame (message chunks, typing toggles, read receipts)
//! travels through one mpsc queue drained by the single gateway writer.
//! The writer splits each logical message into chunks itself, so chunk
//! sequences of concurrently submitted messages can never interleave.

use futures::{Sink, SinkExt};
use thiserror::Error;
use tokio::sync::{mpsc, oneshot};
use tokio_tungstenite::tungstenite::Message;

use super::chunk::chunk_text;
use super::protocol::GatewayCommand;

/// Size of the outbound command queue.
pub const OUTBOX_BUFFER_SIZE: usize = 64;

/// Error delivering through the outbox.
#[derive(Debug, Error)]
pub enum OutboxError {
    /// The outbound queue or writer went away before delivery completed.
    #[error("outbound delivery failed: queue closed")]
    Closed,
}

/// Delivery options for one logical message.
#[derive(Debug, Clone, Copy)]
pub struct SendOptions {
    /// Suppress the recipient-side notification.
    pub silent: bool,
    /// Allow link previews.
    pub link_preview: bool,
}

impl SendOptions {
    /// Options for an interactive reply.
    pub fn reply() -> Self {
        Self {
            silent: false,
            link_preview: false,
        }
    }

    /// Options for a periodic report: silent, no previews.
    pub fn report() -> Self {
        Self {
            silent: true,
            link_preview: false,
        }
    }
}

/// One unit of outbound work consumed by the writer.
#[derive(Debug)]
pub enum OutboundItem {
    /// A logical message; the writer chunks it and delivers the chunks in
    /// order before taking the next item.
    Message {
        chat_id: i64,
        text: String,
        options: SendOptions,
        /// Resolved once the full chunk sequence is on the wire.
        done: Option<oneshot::Sender<()>>,
    },

    /// A bare command forwarded as a single frame.
    Command(GatewayCommand),
}

/// Sending half of the outbound queue, shared by every producer.
#[derive(Debug, Clone)]
pub struct Outbox {
    tx: mpsc::Sender<OutboundItem>,
}

impl Outbox {
    /// Create the outbox and the receiving end for the gateway writer.
    pub fn channel(buffer: usize) -> (Self, mpsc::Receiver<OutboundItem>) {
        let (tx, rx) = mpsc::channel(buffer);
        (Self { tx }, rx)
    }

    /// Deliver one logical message to `chat_id`.
    ///
    /// Resolves after the writer has put every chunk on the wire, so
    /// callers observe full-message delivery.
    pub async fn send_message(
        &self,
        chat_id: i64,
        text: impl Into<String>,
        options: SendOptions,
    ) -> Result<(), OutboxError> {
        let (done_tx, done_rx) = oneshot::channel();
        self.tx
            .send(OutboundItem::Message {
                chat_id,
                text: text.into(),
                options,
                done: Some(done_tx),
            })
            .await
            .map_err(|_| OutboxError::Closed)?;
        done_rx.await.map_err(|_| OutboxError::Closed)
    }

    /// Toggle the typing indicator in `chat_id`.
    pub async fn set_typing(&self, chat_id: i64, active: bool) -> Result<(), OutboxError> {
        self.tx
            .send(OutboundItem::Command(GatewayCommand::Typing {
                chat_id,
                active,
            }))
            .await
            .map_err(|_| OutboxError::Closed)
    }

    /// Raise the typing indicator and return a guard that lowers it again
    /// when dropped, on every exit path.
    pub async fn begin_typing(&self, chat_id: i64) -> Result<TypingGuard, OutboxError> {
        self.set_typing(chat_id, true).await?;
        Ok(TypingGuard {
            tx: self.tx.clone(),
            chat_id,
        })
    }

    /// Acknowledge `chat_id` as read.
    pub async fn mark_read(&self, chat_id: i64) -> Result<(), OutboxError> {
        self.tx
            .send(OutboundItem::Command(GatewayCommand::MarkRead { chat_id }))
            .await
            .map_err(|_| OutboxError::Closed)
    }
}

/// Scoped typing indicator; lowers the indicator on drop.
#[derive(Debug)]
pub struct TypingGuard {
    tx: mpsc::Sender<OutboundItem>,
    chat_id: i64,
}

impl Drop for TypingGuard {
    fn drop(&mut self) {
        // Release is fire-and-forget; a saturated queue loses only the
        // indicator, never a message.
        let _ = self.tx.try_send(OutboundItem::Command(GatewayCommand::Typing {
            chat_id: self.chat_id,
            active: false,
        }));
    }
}

/// Deliver `text` through `deliver` in order-preserving chunks of at most
/// `limit` characters, awaiting each delivery before issuing the next.
pub async fn send_chunked<F, E>(mut deliver: F, text: &str, limit: usize) -> Result<(), E>
where
    F: AsyncFnMut(String) -> Result<(), E>,
{
    for chunk in chunk_text(text, limit) {
        deliver(chunk.to_string()).await?;
    }
    Ok(())
}

/// Write one outbound item to the gateway sink.
///
/// Messages are chunked and written strictly in sequence; the item's ack is
/// fired only after the last chunk.
pub async fn write_item<S>(
    sink: &mut S,
    item: OutboundItem,
    chunk_chars: usize,
) -> Result<(), S::Error>
where
    S: Sink<Message> + Unpin,
{
    match item {
        OutboundItem::Message {
            chat_id,
            text,
            options,
            done,
        } => {
            send_chunked(
                async |chunk| {
                    let command = GatewayCommand::SendMessage {
                        chat_id,
                        text: chunk,
                        silent: options.silent,
                        link_preview: options.link_preview,
                    };
                    sink.send(command.to_frame()).await
                },
                &text,
                chunk_chars,
            )
            .await?;

            if let Some(done) = done {
                let _ = done.send(());
            }
            Ok(())
        }
        OutboundItem::Command(command) => sink.send(command.to_frame()).await,
    }
}
