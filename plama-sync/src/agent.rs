//! One agent run: readiness, request, response, chaining.
//!
//! The agent marks itself `on`, resolves its peer, sends the request, writes
//! the cleaned answer to its own `wyjście.txt`, launches the next line if one
//! is configured, and goes back to `off`. Any failure writes an
//! `[AGENT ERROR]` line to the output file instead and leaves the status at
//! `error`. Every wait is bounded, so a hung peer cannot leave the agent
//! showing `on` or `lag` forever.

use crate::chain::chain_next;
use crate::config::{AgentSettings, HandshakeConfig};
use crate::error::{HandshakeError, HandshakeResult};
use crate::events::{AgentEvent, EventSink};
use crate::launcher::{DetachedLauncher, ProcessLauncher};
use crate::readiness::wait_for_readiness;
use crate::status::StatusReporter;
use crate::transport::{FileDropTransport, HttpTransport, InferenceRequest, InferenceTransport};
use plama_storage::{atomic_write, read_text_opt};
use plama_types::files::{
    FILE_API_MARKER, INPUT_FILE, INSTRUCTIONS_FILE, OBJECT_DATA_FILE, OUTPUT_FILE, READY_FILE,
};
use plama_types::ProcessStatus;
use regex_lite::Regex;
use std::path::{Path, PathBuf};
use std::sync::{Arc, LazyLock};
use tracing::{error, info, warn};

static CHAT_HEADER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<\|im_start\|>.*?\n").expect("chat header pattern is valid"));
static CHAT_END: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<\|im_end\|>").expect("chat end pattern is valid"));
static ROLE_WORD: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b(user|assistant)\b\s*").expect("role pattern is valid"));

/// Strips chat-template markers and bare role words from a model answer.
#[must_use]
pub fn clean_output(raw: &str) -> String {
    let text = CHAT_HEADER.replace_all(raw, "");
    let text = CHAT_END.replace_all(&text, "");
    let text = ROLE_WORD.replace_all(&text, "");
    text.trim().to_string()
}

/// What a successful run produced.
#[derive(Debug, Clone, PartialEq)]
pub struct AgentOutcome {
    /// The cleaned answer written to `wyjście.txt`.
    pub output: String,
    /// The next line's entry point, when one was launched.
    pub chained: Option<PathBuf>,
}

/// An agent container folder and how to run it.
#[derive(Debug, Clone)]
pub struct Agent {
    dir: PathBuf,
    config: HandshakeConfig,
    status: StatusReporter,
    events: EventSink,
    launcher: Arc<dyn ProcessLauncher>,
}

impl Agent {
    #[must_use]
    pub fn new(dir: impl Into<PathBuf>, config: HandshakeConfig) -> Self {
        let dir = dir.into();
        let launcher = Arc::new(DetachedLauncher::new(config.interpreter.clone()));
        Self {
            status: StatusReporter::new(dir.join(OBJECT_DATA_FILE), EventSink::disabled()),
            dir,
            config,
            events: EventSink::disabled(),
            launcher,
        }
    }

    /// Publishes [`AgentEvent`]s to `events`.
    #[must_use]
    pub fn with_events(mut self, events: EventSink) -> Self {
        self.status = StatusReporter::new(self.dir.join(OBJECT_DATA_FILE), events.clone());
        self.events = events;
        self
    }

    #[must_use]
    pub fn with_launcher(mut self, launcher: Arc<dyn ProcessLauncher>) -> Self {
        self.launcher = launcher;
        self
    }

    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// The folder of the server named in the settings: a sibling of the
    /// agent folder.
    #[must_use]
    pub fn peer_dir(&self, settings: &AgentSettings) -> Option<PathBuf> {
        let server = settings.server.as_deref()?;
        Some(self.dir.parent().unwrap_or(&self.dir).join(server))
    }

    /// Runs the full handshake once.
    pub async fn run(&self) -> HandshakeResult<AgentOutcome> {
        info!("Agent start: {}", self.dir.display());
        self.status.set(ProcessStatus::On);

        let output_path = self.dir.join(OUTPUT_FILE);
        let result = match self.execute().await {
            Ok(output) => atomic_write(&output_path, &output)
                .map(|()| output)
                .map_err(HandshakeError::from),
            Err(e) => Err(e),
        };

        match result {
            Ok(output) => {
                info!("Wrote {} ({} chars)", OUTPUT_FILE, output.chars().count());
                let chained = match chain_next(&self.dir, self.launcher.as_ref()) {
                    Ok(chained) => chained,
                    Err(e) => {
                        warn!("Chaining failed: {}", e);
                        None
                    }
                };
                if let Some(script) = &chained {
                    self.events.emit(AgentEvent::Chained {
                        script: script.clone(),
                    });
                }
                self.status.set(ProcessStatus::Off);
                self.events.emit(AgentEvent::Completed {
                    output_len: output.len(),
                });
                info!("Agent done");
                Ok(AgentOutcome { output, chained })
            }
            Err(e) => {
                let message = format!("[AGENT ERROR] {}: {}", e.kind(), e);
                error!("{}", message);
                if let Err(write_err) = atomic_write(&output_path, &message) {
                    warn!("Failed to write diagnostic: {}", write_err);
                }
                self.status.set(ProcessStatus::Error);
                self.events.emit(AgentEvent::Failed { message });
                Err(e)
            }
        }
    }

    async fn execute(&self) -> HandshakeResult<String> {
        let settings = AgentSettings::load(&self.dir)?;
        let request = InferenceRequest {
            instructions: read_trimmed(&self.dir.join(INSTRUCTIONS_FILE))?,
            input: read_trimmed(&self.dir.join(INPUT_FILE))?,
            temperature: settings.temperature,
            max_tokens: settings.max_tokens,
            extra: settings.extra.clone(),
        };
        info!(
            "Instructions: {} chars, input: {} chars",
            request.instructions.chars().count(),
            request.input.chars().count()
        );

        let transport = self.transport(&settings).await?;
        let raw = self.send_with_retry(transport.as_ref(), &request).await?;
        Ok(clean_output(&raw))
    }

    async fn transport(&self, settings: &AgentSettings) -> HandshakeResult<Box<dyn InferenceTransport>> {
        let peer = self.peer_dir(settings);

        if let Some(peer) = peer.as_ref().filter(|dir| dir.join(FILE_API_MARKER).exists()) {
            info!("{} found in {}, using file-drop mode", FILE_API_MARKER, peer.display());
            return Ok(Box::new(FileDropTransport::new(
                peer.clone(),
                &self.config,
                self.status.clone(),
            )));
        }

        let url = match peer {
            Some(peer) => {
                let info = wait_for_readiness(&peer, &self.config, &self.status, &self.events).await?;
                info.url
                    .ok_or_else(|| HandshakeError::ReadinessIncomplete(peer.join(READY_FILE)))?
            }
            None => settings.url.clone().ok_or_else(|| {
                HandshakeError::Config("settings name neither serwer= nor url=".into())
            })?,
        };
        info!("Endpoint: {}", url);
        Ok(Box::new(HttpTransport::new(&url, &self.config)?))
    }

    /// Sends once, and once more after the backoff if the first attempt
    /// failed at the network level.
    async fn send_with_retry(
        &self,
        transport: &dyn InferenceTransport,
        request: &InferenceRequest,
    ) -> HandshakeResult<String> {
        let target = transport.target();
        self.events.emit(AgentEvent::Dispatched {
            target: target.clone(),
        });
        match transport.send(request).await {
            Err(e) if e.is_network() => {
                let backoff = self.config.retry_backoff();
                warn!("{} -> retry in {}ms", e, backoff.as_millis());
                self.status.set(ProcessStatus::Lag);
                self.events.emit(AgentEvent::Retrying {
                    after: backoff,
                    reason: e.to_string(),
                });
                tokio::time::sleep(backoff).await;
                self.events.emit(AgentEvent::Dispatched { target });
                transport.send(request).await
            }
            other => other,
        }
    }
}

fn read_trimmed(path: &Path) -> HandshakeResult<String> {
    Ok(read_text_opt(path)?
        .map(|text| text.trim().to_string())
        .unwrap_or_default())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clean_output_strips_chat_markup() {
        let raw = "<|im_start|>assistant\nHello there<|im_end|>\n";
        assert_eq!(clean_output(raw), "Hello there");
    }

    #[test]
    fn clean_output_drops_role_words() {
        assert_eq!(clean_output("assistant: fine"), ": fine");
        assert_eq!(clean_output("  user  ok "), "ok");
        assert_eq!(clean_output("superuser stays"), "superuser stays");
    }

    #[test]
    fn peer_is_a_sibling_folder() {
        let agent = Agent::new("/m/obiekty/agent", HandshakeConfig::default());
        let settings = AgentSettings {
            server: Some("mozg".into()),
            ..AgentSettings::default()
        };
        assert_eq!(agent.peer_dir(&settings), Some(PathBuf::from("/m/obiekty/mozg")));
        assert_eq!(agent.peer_dir(&AgentSettings::default()), None);
    }
}
