//! Runtime configuration.
//!
//! Built once at startup from an optional TOML file plus CLI/environment
//! overrides, then threaded immutably into every component.

use std::path::Path;

use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub completion: CompletionConfig,
    pub transport: TransportConfig,
    pub reporter: ReporterConfig,
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("reading config file {}", path.display()))?;
        let config: Config = toml::from_str(&content)
            .with_context(|| format!("parsing config file {}", path.display()))?;
        Ok(config)
    }

    /// Reject configurations that cannot possibly run.
    ///
    /// The credential and the authorized peer are required at startup;
    /// their absence is fatal before any connection is attempted.
    pub fn validate(&self) -> Result<()> {
        if self.completion.api_key.is_empty() {
            bail!("completion credential is not set (COURIER_API_KEY)");
        }
        if self.transport.authorized_peer == 0 {
            bail!("authorized peer is not set (COURIER_PEER_ID)");
        }
        Ok(())
    }
}

/// Completion service configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CompletionConfig {
    /// Completion endpoint URL.
    pub api_url: String,

    /// Bearer credential; supplied via CLI/environment, never the file.
    #[serde(skip)]
    pub api_key: String,

    /// Model identifier sent with every request.
    pub model: String,

    /// Hard per-call timeout in seconds.
    pub request_timeout_secs: u64,

    /// Maximum accepted input length in characters.
    pub max_input_chars: usize,

    /// Maximum output tokens requested from the service.
    pub max_response_tokens: u32,
}

impl Default for CompletionConfig {
    fn default() -> Self {
        Self {
            api_url: "https://api.deepseek.com/chat/completions".to_string(),
            api_key: String::new(),
            model: "deepseek-chat".to_string(),
            request_timeout_secs: 30,
            max_input_chars: 2000,
            max_response_tokens: 2000,
        }
    }
}

/// Chat transport configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TransportConfig {
    /// WebSocket URL of the chat gateway.
    pub gateway_url: String,

    /// Chat identifier of the authorized correspondent.
    pub authorized_peer: i64,

    /// Maximum characters per outbound frame.
    pub chunk_chars: usize,

    /// Outer ceiling on handling one inbound message, in seconds.
    ///
    /// Independent of the completion client's own request timeout.
    pub reply_timeout_secs: u64,

    /// Delay before re-dialing a dropped gateway connection, in seconds.
    pub reconnect_delay_secs: u64,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            gateway_url: "ws://127.0.0.1:41830/ws".to_string(),
            authorized_peer: 0,
            chunk_chars: 4096,
            reply_timeout_secs: 30,
            reconnect_delay_secs: 5,
        }
    }
}

/// Periodic reporter configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReporterConfig {
    /// Whether the periodic reporter runs at all.
    pub enabled: bool,

    /// Interval between successful reports, in seconds.
    pub interval_secs: u64,

    /// Cooldown after a failed report attempt, in seconds.
    pub retry_cooldown_secs: u64,

    /// Poll cadence while the transport is not ready, in seconds.
    pub ready_poll_secs: u64,
}

impl Default for ReporterConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            interval_secs: 3600,
            retry_cooldown_secs: 300,
            ready_poll_secs: 30,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn defaults_match_the_documented_limits() {
        let config = Config::default();

        assert_eq!(config.completion.request_timeout_secs, 30);
        assert_eq!(config.completion.max_input_chars, 2000);
        assert_eq!(config.completion.max_response_tokens, 2000);
        assert_eq!(config.transport.chunk_chars, 4096);
        assert_eq!(config.transport.reply_timeout_secs, 30);
        assert_eq!(config.reporter.interval_secs, 3600);
        assert_eq!(config.reporter.retry_cooldown_secs, 300);
        assert_eq!(config.reporter.ready_poll_secs, 30);
    }

    #[test]
    fn partial_file_keeps_remaining_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "[reporter]\ninterval_secs = 60\n\n[transport]\ngateway_url = \"ws://10.0.0.1:9000/ws\"\n"
        )
        .unwrap();

        let config = Config::from_file(file.path()).unwrap();

        assert_eq!(config.reporter.interval_secs, 60);
        assert_eq!(config.reporter.retry_cooldown_secs, 300);
        assert_eq!(config.transport.gateway_url, "ws://10.0.0.1:9000/ws");
        assert_eq!(config.transport.chunk_chars, 4096);
    }

    #[test]
    fn api_key_never_round_trips_through_serialization() {
        let mut config = Config::default();
        config.completion.api_key = "secret".to_string();

        let rendered = toml::to_string(&config).unwrap();
        assert!(!rendered.contains("secret"));
    }

    #[test]
    fn validation_requires_credential_and_peer() {
        let mut config = Config::default();
        assert!(config.validate().is_err());

        config.completion.api_key = "key".to_string();
        assert!(config.validate().is_err());

        config.transport.authorized_peer = 42;
        assert!(config.validate().is_ok());
    }
}
