//! Completion API wire types.

use serde::{Deserialize, Serialize};

/// Sampling temperature attached to every request.
pub const TEMPERATURE: f64 = 0.7;

/// Nucleus-sampling threshold attached to every request.
pub const TOP_P: f64 = 0.9;

/// Frequency penalty attached to every request.
pub const FREQUENCY_PENALTY: f64 = 0.2;

/// Presence penalty attached to every request.
pub const PRESENCE_PENALTY: f64 = 0.2;

/// One chat message in a request envelope.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    /// Create a user-role message.
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }
}

/// Request body for the completion endpoint.
#[derive(Debug, Clone, Serialize)]
pub struct CompletionRequest {
    /// Model identifier.
    pub model: String,

    /// Message envelope; always a single user message.
    pub messages: Vec<ChatMessage>,

    /// Sampling temperature.
    pub temperature: f64,

    /// Maximum output tokens.
    pub max_tokens: u32,

    /// Nucleus-sampling threshold.
    pub top_p: f64,

    /// Frequency penalty.
    pub frequency_penalty: f64,

    /// Presence penalty.
    pub presence_penalty: f64,
}

impl CompletionRequest {
    /// Wrap `text` in the fixed request envelope.
    pub fn user(model: impl Into<String>, text: impl Into<String>, max_tokens: u32) -> Self {
        Self {
            model: model.into(),
            messages: vec![ChatMessage::user(text)],
            temperature: TEMPERATURE,
            max_tokens,
            top_p: TOP_P,
            frequency_penalty: FREQUENCY_PENALTY,
            presence_penalty: PRESENCE_PENALTY,
        }
    }
}

/// Response body from the completion endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct CompletionResponse {
    /// Completion choices; a usable response carries at least one.
    #[serde(default)]
    pub choices: Vec<Choice>,
}

/// One completion choice.
#[derive(Debug, Clone, Deserialize)]
pub struct Choice {
    pub message: ChoiceMessage,
}

/// The message payload of a choice.
#[derive(Debug, Clone, Deserialize)]
pub struct ChoiceMessage {
    pub content: String,
}
