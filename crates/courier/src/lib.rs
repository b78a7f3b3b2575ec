//! Courier relays chat messages between a single authorized correspondent
//! and a remote text-completion service, and pushes a synthetic status
//! report to that correspondent on a fixed interval.
//!
//! The crate is organized around one concurrency core: a gateway task owns
//! the chat link and is the only socket writer, an event loop runs one task
//! per inbound message, and a reporter task drives the periodic report.
//! All outbound traffic is serialized through the [`transport::Outbox`]
//! queue, which preserves chunk ordering across concurrent senders.

pub mod completion;
pub mod config;
pub mod handler;
pub mod reporter;
pub mod shutdown;
pub mod transport;
