//! Completion service client module.
//!
//! Provides the request dispatcher: a synchronous request/response wrapper
//! around the remote completion endpoint with a hard timeout and a total
//! error taxonomy.

mod client;
mod error;
mod types;

use async_trait::async_trait;

pub use client::CompletionClient;
pub use error::{CompletionError, CompletionResult};
pub use types::*;

/// Minimal completion API abstraction for testability.
#[async_trait]
pub trait CompletionApi: Send + Sync {
    async fn dispatch(&self, text: &str) -> CompletionResult<String>;
}

#[async_trait]
impl CompletionApi for CompletionClient {
    async fn dispatch(&self, text: &str) -> CompletionResult<String> {
        self.dispatch(text).await
    }
}
