//! Handshake timings and per-agent settings.

use plama_storage::read_text_opt;
use plama_types::files::AGENT_CONFIG_FILE;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use tracing::debug;

use crate::error::HandshakeResult;

/// Timing and process configuration shared by agents and lines.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HandshakeConfig {
    /// How long to wait for a peer's readiness file (in milliseconds).
    pub readiness_timeout_ms: u64,
    /// Poll interval while waiting for readiness or output (in milliseconds).
    pub poll_interval_ms: u64,
    /// Per-request HTTP timeout (in milliseconds).
    pub request_timeout_ms: u64,
    /// Pause before the single retry after a network failure (in milliseconds).
    pub retry_backoff_ms: u64,
    /// How long a file-drop peer has to write its output (in milliseconds).
    pub output_timeout_ms: u64,
    /// Interpreter used to launch `start.py` entry points.
    pub interpreter: String,
}

impl Default for HandshakeConfig {
    fn default() -> Self {
        Self {
            readiness_timeout_ms: 30_000,
            poll_interval_ms: 1_000,
            request_timeout_ms: 60_000,
            retry_backoff_ms: 10_000,
            output_timeout_ms: 60_000,
            interpreter: "python3".to_string(),
        }
    }
}

impl HandshakeConfig {
    #[must_use]
    pub fn readiness_timeout(&self) -> Duration {
        Duration::from_millis(self.readiness_timeout_ms)
    }

    #[must_use]
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms.max(1))
    }

    #[must_use]
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    #[must_use]
    pub fn retry_backoff(&self) -> Duration {
        Duration::from_millis(self.retry_backoff_ms)
    }

    #[must_use]
    pub fn output_timeout(&self) -> Duration {
        Duration::from_millis(self.output_timeout_ms)
    }
}

/// Settings read from an agent's `konfiguracja.txt`.
#[derive(Debug, Clone, PartialEq)]
pub struct AgentSettings {
    /// Name of the sibling server folder (`serwer=`, `server=`, `srv=`).
    pub server: Option<String>,
    /// Direct endpoint used when no server is named.
    pub url: Option<String>,
    pub temperature: f64,
    pub max_tokens: u32,
    /// Every other `key=value` pair, key case preserved, in file order.
    pub extra: Vec<(String, String)>,
}

impl Default for AgentSettings {
    fn default() -> Self {
        Self {
            server: None,
            url: None,
            temperature: 0.5,
            max_tokens: 2048,
            extra: Vec::new(),
        }
    }
}

impl AgentSettings {
    /// Parses a settings body.
    ///
    /// Blank lines, `#` comments, lines starting with `:` and lines without
    /// `=` are skipped. Unparsable numbers keep their defaults.
    #[must_use]
    pub fn parse(text: &str) -> Self {
        let mut settings = Self::default();
        for raw in text.lines() {
            let line = raw.trim();
            if line.is_empty() || line.starts_with('#') || line.starts_with(':') {
                continue;
            }
            let Some((key, value)) = line.split_once('=') else {
                continue;
            };
            let key = key.trim();
            let value = value.trim();
            match key.to_lowercase().as_str() {
                "serwer" | "server" | "srv" => settings.server = Some(value.to_string()),
                "url" => settings.url = Some(value.to_string()),
                "temp" | "temperature" => {
                    if let Ok(t) = value.parse() {
                        settings.temperature = t;
                    }
                }
                "max_token" | "maxtoken" | "max_tokens" => {
                    if let Ok(n) = value.parse() {
                        settings.max_tokens = n;
                    }
                }
                _ => settings.extra.push((key.to_string(), value.to_string())),
            }
        }
        settings.server = settings.server.filter(|s| !s.is_empty());
        settings.url = settings.url.filter(|s| !s.is_empty());
        settings
    }

    /// Reads `konfiguracja.txt` from an agent folder. A missing file gives
    /// the defaults.
    pub fn load(agent_dir: &Path) -> HandshakeResult<Self> {
        let text = read_text_opt(&agent_dir.join(AGENT_CONFIG_FILE))?.unwrap_or_default();
        let settings = Self::parse(&text);
        debug!(
            "Settings: server={:?}, url={:?}, temp={}, max_tokens={}, extra={}",
            settings.server,
            settings.url,
            settings.temperature,
            settings.max_tokens,
            settings.extra.len()
        );
        Ok(settings)
    }
}
