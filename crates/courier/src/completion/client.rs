//! Completion service HTTP client.

use reqwest::Client;
use std::time::Duration;
use tracing::{error, warn};

use crate::config::CompletionConfig;

use super::error::{CompletionError, CompletionResult};
use super::types::{CompletionRequest, CompletionResponse};

/// Maximum characters of an upstream error body kept for logging.
const ERROR_BODY_EXCERPT_CHARS: usize = 200;

/// Client for the remote completion service.
///
/// `dispatch` is total: every failure resolves to a `CompletionError`, and
/// the call never outlives the configured request timeout.
#[derive(Debug, Clone)]
pub struct CompletionClient {
    /// HTTP client; carries the hard per-call timeout.
    client: Client,
    /// Endpoint, credential and model parameters.
    config: CompletionConfig,
}

impl CompletionClient {
    /// Create a new completion client.
    pub fn new(config: CompletionConfig) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .expect("failed to create HTTP client");

        Self { client, config }
    }

    /// Exchange `text` for a completion.
    ///
    /// Over-length input is rejected locally without touching the network.
    pub async fn dispatch(&self, text: &str) -> CompletionResult<String> {
        let length = text.chars().count();
        if length > self.config.max_input_chars {
            warn!(
                "rejecting over-length request: {} > {} characters",
                length, self.config.max_input_chars
            );
            return Err(CompletionError::TooLong(length));
        }

        let request = CompletionRequest::user(
            &self.config.model,
            text,
            self.config.max_response_tokens,
        );

        let response = self
            .client
            .post(&self.config.api_url)
            .bearer_auth(&self.config.api_key)
            .json(&request)
            .send()
            .await
            .map_err(classify_send_error)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let excerpt: String = body.chars().take(ERROR_BODY_EXCERPT_CHARS).collect();
            error!("completion service error: {} - {}", status, excerpt);
            return Err(CompletionError::UpstreamStatus(status.as_u16()));
        }

        let body: CompletionResponse = response.json().await.map_err(classify_body_error)?;

        match body.choices.into_iter().next() {
            Some(choice) => Ok(choice.message.content),
            None => {
                error!("completion response carried no choices");
                Err(CompletionError::MalformedResponse)
            }
        }
    }
}

/// Classify a failure while sending the request.
fn classify_send_error(err: reqwest::Error) -> CompletionError {
    if err.is_timeout() {
        error!("completion request timed out");
        CompletionError::Timeout
    } else {
        error!("completion request failed: {}", err);
        CompletionError::Network(err.to_string())
    }
}

/// Classify a failure while reading or decoding the response body.
fn classify_body_error(err: reqwest::Error) -> CompletionError {
    if err.is_timeout() {
        error!("completion response timed out mid-body");
        CompletionError::Timeout
    } else if err.is_decode() {
        error!("completion response failed to decode: {}", err);
        CompletionError::MalformedResponse
    } else {
        error!("unexpected completion failure: {}", err);
        CompletionError::Unknown(err.to_string())
    }
}
