//! Chat gateway client.
//!
//! Owns the WebSocket link to the gateway. The run loop is the only writer
//! on the socket: it drains the outbox queue frame by frame, forwards
//! inbound message events to the handler queue, and re-dials a dropped
//! connection after a fixed delay, flipping readiness while disconnected.

use std::time::Duration;

use futures::{SinkExt, StreamExt};
use tokio::sync::{mpsc, watch};
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::{Message, Utf8Bytes};
use tracing::{debug, info, warn};

use crate::config::TransportConfig;
use crate::shutdown::sleep_or_shutdown;

use super::outbox::{OutboundItem, write_item};
use super::protocol::{GatewayEvent, InboundMessage};

/// Size of the inbound event queue.
pub const EVENT_BUFFER_SIZE: usize = 256;

/// Maximum characters of an unparseable frame kept for logging.
const FRAME_EXCERPT_CHARS: usize = 200;

/// Drive the gateway connection until shutdown is signalled.
pub async fn run(
    config: TransportConfig,
    mut outbox_rx: mpsc::Receiver<OutboundItem>,
    events_tx: mpsc::Sender<InboundMessage>,
    ready_tx: watch::Sender<bool>,
    mut shutdown: watch::Receiver<bool>,
) {
    let reconnect_delay = Duration::from_secs(config.reconnect_delay_secs);

    loop {
        if *shutdown.borrow() {
            break;
        }

        let (socket, _) = match connect_async(config.gateway_url.clone()).await {
            Ok(connection) => connection,
            Err(err) => {
                warn!(
                    "gateway connect to {} failed: {}; retrying in {}s",
                    config.gateway_url, err, config.reconnect_delay_secs
                );
                if sleep_or_shutdown(reconnect_delay, &mut shutdown).await {
                    break;
                }
                continue;
            }
        };

        info!("connected to gateway at {}", config.gateway_url);
        let _ = ready_tx.send(true);

        match pump_connection(
            socket,
            &mut outbox_rx,
            events_tx.clone(),
            &mut shutdown,
            config.chunk_chars,
        )
        .await
        {
            PumpOutcome::Stop => break,
            PumpOutcome::Reconnect => {}
        }

        let _ = ready_tx.send(false);
        warn!(
            "gateway connection lost; reconnecting in {}s",
            config.reconnect_delay_secs
        );
        if sleep_or_shutdown(reconnect_delay, &mut shutdown).await {
            break;
        }
    }

    let _ = ready_tx.send(false);
    info!("gateway client stopped");
}

/// Outcome of driving a single gateway connection to completion.
enum PumpOutcome {
    /// Shutdown was signalled or every outbox producer was dropped; stop.
    Stop,
    /// The connection was lost; the caller should reconnect.
    Reconnect,
}

/// Drive a single established connection: drain the outbox, forward inbound
/// frames, and watch for shutdown, until the link drops or shutdown fires.
///
/// The `select!` loop lives in this named `async fn` rather than inline in
/// [`run`] so its future is checked for `Send` with concrete lifetimes,
/// which is required for `run` to be spawnable.
async fn pump_connection<S>(
    socket: tokio_tungstenite::WebSocketStream<S>,
    outbox_rx: &mut mpsc::Receiver<OutboundItem>,
    events_tx: mpsc::Sender<InboundMessage>,
    shutdown: &mut watch::Receiver<bool>,
    chunk_chars: usize,
) -> PumpOutcome
where
    S: tokio::io::AsyncRead + tokio::io::AsyncWrite + Unpin,
{
    let (mut sink, mut stream) = socket.split();

    loop {
        // Pin the branch futures and select over `&mut` references to them.
        // This keeps the borrows of `shutdown`, `outbox_rx`, and `stream` out
        // of the `select!`-generated future's capture set in the shape that
        // would otherwise trip a higher-ranked `Send` inference failure when
        // the enclosing gateway task is spawned (rust-lang/rust#102211).
        let shutdown_changed = shutdown.changed();
        let next_item = outbox_rx.recv();
        let next_frame = stream.next();
        tokio::pin!(shutdown_changed, next_item, next_frame);

        tokio::select! {
            _ = &mut shutdown_changed => {
                let _ = sink.send(Message::Close(None)).await;
                return PumpOutcome::Stop;
            }
            item = &mut next_item => match item {
                Some(item) => {
                    if let Err(err) = write_item(&mut sink, item, chunk_chars).await {
                        warn!("gateway write failed: {}", err);
                        return PumpOutcome::Reconnect;
                    }
                }
                // Every producer dropped its outbox handle.
                None => return PumpOutcome::Stop,
            },
            frame = &mut next_frame => match frame {
                Some(Ok(Message::Text(raw))) => {
                    dispatch_frame(raw, events_tx.clone()).await;
                }
                Some(Ok(Message::Close(_))) | None => {
                    info!("gateway closed the connection");
                    return PumpOutcome::Reconnect;
                }
                Some(Ok(_)) => {}
                Some(Err(err)) => {
                    warn!("gateway read error: {}", err);
                    return PumpOutcome::Reconnect;
                }
            },
        }
    }
}

/// Await the next change on the shutdown receiver.
///
/// Wrapping `watch::Receiver::changed()` in a named `async fn` gives the
/// compiler a concrete future boundary, which lets it prove the enclosing
/// `select!` future is `Send` when the gateway task is spawned.
async fn wait_for_shutdown_change(shutdown: &mut watch::Receiver<bool>) {
    let _ = shutdown.changed().await;
}

/// Decode one text frame and forward message events to the handler queue.
async fn dispatch_frame(raw: Utf8Bytes, events_tx: mpsc::Sender<InboundMessage>) {
    match GatewayEvent::parse(raw.as_str()) {
        Ok(GatewayEvent::Message {
            sender_id,
            chat_id,
            text,
        }) => {
            let message = InboundMessage {
                sender_id,
                chat_id,
                text,
            };
            if events_tx.send(message).await.is_err() {
                warn!("inbound event queue closed, dropping message");
            }
        }
        Ok(GatewayEvent::Connected) => debug!("gateway reports chat link connected"),
        Ok(GatewayEvent::Ping) => debug!("gateway keepalive"),
        Err(err) => {
            let excerpt: String = raw.as_str().chars().take(FRAME_EXCERPT_CHARS).collect();
            warn!("failed to parse gateway event: {}, frame: {}", err, excerpt);
        }
    }
}
