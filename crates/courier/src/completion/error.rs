//! Completion client error types.

use thiserror::Error;

/// Result type for completion operations.
pub type CompletionResult<T> = Result<T, CompletionError>;

/// Everything that can go wrong during one dispatch.
///
/// The dispatcher maps every failure path onto exactly one of these
/// variants; no raw fault crosses its boundary.
#[derive(Debug, Error)]
pub enum CompletionError {
    /// Input exceeded the maximum request length; no upstream call is made.
    #[error("request of {0} characters exceeds the input limit")]
    TooLong(usize),

    /// The exchange did not complete within the request timeout.
    #[error("timed out waiting for the completion service")]
    Timeout,

    /// Connection-level failure reaching the service.
    #[error("network failure: {0}")]
    Network(String),

    /// The service answered with a non-success status code.
    #[error("completion service returned status {0}")]
    UpstreamStatus(u16),

    /// The response body did not carry a usable completion.
    #[error("malformed completion response")]
    MalformedResponse,

    /// Any other fault during the exchange.
    #[error("unexpected completion failure: {0}")]
    Unknown(String),
}

impl CompletionError {
    /// Fixed user-facing rendering of each failure kind.
    ///
    /// Total over the taxonomy: callers branch only on success vs. this
    /// pre-rendered string.
    pub fn user_message(&self) -> String {
        match self {
            Self::TooLong(_) => {
                "⚠️ Request too long. The maximum length is 2000 characters.".to_string()
            }
            Self::Timeout => "⌛ Timed out waiting for a response".to_string(),
            Self::Network(_) => "⚠️ Trouble connecting to the service".to_string(),
            Self::UpstreamStatus(code) => format!("⚠️ Service error ({code})"),
            Self::MalformedResponse => "⚠️ Unexpected response format".to_string(),
            Self::Unknown(_) => "⚠️ Internal service error".to_string(),
        }
    }
}
