//! Chat transport: gateway wire protocol, connection management, and the
//! serialized outbound path.

pub mod chunk;
pub mod gateway;
pub mod outbox;
pub mod protocol;

pub use chunk::chunk_text;
pub use outbox::{
    OUTBOX_BUFFER_SIZE, Outbox, OutboundItem, OutboxError, SendOptions, TypingGuard,
    send_chunked, write_item,
};
pub use protocol::{GatewayCommand, GatewayEvent, InboundMessage};
