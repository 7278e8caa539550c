//! Ways an agent can hand a request to its peer.
//!
//! [`HttpTransport`] talks to an inference server over HTTP;
//! [`FileDropTransport`] writes the request into the peer's folder and waits
//! for it to write an answer back.

use crate::config::HandshakeConfig;
use crate::error::{HandshakeError, HandshakeResult};
use crate::status::StatusReporter;
use async_trait::async_trait;
use plama_storage::{atomic_write, read_text};
use plama_types::files::{INPUT_FILE, OUTPUT_FILE};
use plama_types::ProcessStatus;
use reqwest::{Client, StatusCode};
use serde_json::{json, Map, Value};
use std::path::PathBuf;
use std::time::Duration;
use tokio::time::{sleep, Instant};
use tracing::{debug, info, warn};

/// JSON keys accepted as the answer from the `/run` endpoint, in order.
pub const ANSWER_KEYS: [&str; 3] = ["result", "output", "response"];

/// One request to an inference peer.
#[derive(Debug, Clone, PartialEq)]
pub struct InferenceRequest {
    pub instructions: String,
    pub input: String,
    pub temperature: f64,
    pub max_tokens: u32,
    /// Extra `key=value` settings merged into the JSON payload.
    pub extra: Vec<(String, String)>,
}

/// Sends an [`InferenceRequest`] and returns the raw answer text.
#[async_trait]
pub trait InferenceTransport: Send + Sync {
    /// Where requests go, for logs and events.
    fn target(&self) -> String;

    async fn send(&self, request: &InferenceRequest) -> HandshakeResult<String>;
}

/// HTTP transport with `/run` first and an OpenAI-style chat fallback.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: Client,
    base: String,
}

impl HttpTransport {
    /// Creates a transport for `raw_url`. A trailing `/run` is stripped to
    /// get the base URL.
    pub fn new(raw_url: &str, config: &HandshakeConfig) -> HandshakeResult<Self> {
        let client = Client::builder()
            .timeout(config.request_timeout())
            .build()?;
        Ok(Self {
            client,
            base: base_url(raw_url),
        })
    }

    #[must_use]
    pub fn base(&self) -> &str {
        &self.base
    }

    async fn post(&self, url: &str, payload: &Value) -> HandshakeResult<(StatusCode, String)> {
        debug!("POST {}", url);
        let response = self.client.post(url).json(payload).send().await?;
        let status = response.status();
        let body = response.text().await?;
        debug!("HTTP {} from {} ({} bytes)", status.as_u16(), url, body.len());
        Ok((status, body))
    }

    async fn post_run(&self, request: &InferenceRequest) -> HandshakeResult<Option<String>> {
        let url = format!("{}/run", self.base);
        let mut payload = json!({
            "instructions": request.instructions,
            "input": request.input,
            "temp": request.temperature,
            "max_token": request.max_tokens,
        });
        merge_extra(&mut payload, &request.extra);

        let (status, body) = self.post(&url, &payload).await?;
        if status == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !status.is_success() {
            return Err(HandshakeError::Status {
                status: status.as_u16(),
                url,
                body,
            });
        }
        Ok(Some(run_answer(body)))
    }

    async fn post_chat(&self, request: &InferenceRequest) -> HandshakeResult<String> {
        let url = format!("{}/v1/chat/completions", self.base);
        let mut messages = Vec::new();
        if !request.instructions.is_empty() {
            messages.push(json!({"role": "system", "content": request.instructions}));
        }
        messages.push(json!({"role": "user", "content": request.input}));
        let mut payload = json!({
            "messages": messages,
            "temperature": request.temperature,
            "max_tokens": request.max_tokens,
        });
        merge_extra(&mut payload, &request.extra);

        let (status, body) = self.post(&url, &payload).await?;
        if !status.is_success() {
            return Err(HandshakeError::Status {
                status: status.as_u16(),
                url,
                body,
            });
        }
        Ok(chat_answer(body))
    }
}

#[async_trait]
impl InferenceTransport for HttpTransport {
    fn target(&self) -> String {
        self.base.clone()
    }

    async fn send(&self, request: &InferenceRequest) -> HandshakeResult<String> {
        match self.post_run(request).await? {
            Some(answer) => Ok(answer),
            None => {
                info!("404 on /run, switching to /v1/chat/completions");
                self.post_chat(request).await
            }
        }
    }
}

/// The URL without a trailing `/run` or trailing slashes.
#[must_use]
pub fn base_url(raw: &str) -> String {
    let trimmed = raw.trim().trim_end_matches('/');
    trimmed
        .strip_suffix("/run")
        .unwrap_or(trimmed)
        .trim_end_matches('/')
        .to_string()
}

fn merge_extra(payload: &mut Value, extra: &[(String, String)]) {
    if let Value::Object(map) = payload {
        for (key, value) in extra {
            map.insert(key.clone(), Value::String(value.clone()));
        }
    }
}

fn value_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// The first of [`ANSWER_KEYS`] in a JSON object body, else the body itself.
fn run_answer(body: String) -> String {
    match serde_json::from_str::<Map<String, Value>>(&body) {
        Ok(map) => ANSWER_KEYS
            .iter()
            .find_map(|key| map.get(*key))
            .map(value_text)
            .unwrap_or(body),
        Err(_) => body,
    }
}

/// `choices[0].message.content` when present and non-empty, else the body.
fn chat_answer(body: String) -> String {
    let content = serde_json::from_str::<Value>(&body).ok().and_then(|json| {
        json.pointer("/choices/0/message/content")
            .map(value_text)
            .filter(|content| !content.is_empty())
    });
    content.unwrap_or(body)
}

/// File-drop transport for peers that carry an `api.txt` marker.
#[derive(Debug, Clone)]
pub struct FileDropTransport {
    peer_dir: PathBuf,
    status: StatusReporter,
    timeout: Duration,
    poll: Duration,
}

impl FileDropTransport {
    #[must_use]
    pub fn new(peer_dir: impl Into<PathBuf>, config: &HandshakeConfig, status: StatusReporter) -> Self {
        Self {
            peer_dir: peer_dir.into(),
            status,
            timeout: config.output_timeout(),
            poll: config.poll_interval(),
        }
    }
}

#[async_trait]
impl InferenceTransport for FileDropTransport {
    fn target(&self) -> String {
        self.peer_dir.display().to_string()
    }

    /// Writes `instrukcje:` and `wejście:` lines into the peer's input file,
    /// waits for its output file, reads it and removes it. Extra settings
    /// are not forwarded in this mode.
    async fn send(&self, request: &InferenceRequest) -> HandshakeResult<String> {
        let input = self.peer_dir.join(INPUT_FILE);
        let output = self.peer_dir.join(OUTPUT_FILE);
        atomic_write(
            &input,
            &format!("instrukcje:{}\nwejście:{}\n", request.instructions, request.input),
        )?;
        info!("Wrote request into {}", input.display());

        let started = Instant::now();
        while !output.exists() {
            let waited = started.elapsed();
            if waited >= self.timeout {
                return Err(HandshakeError::OutputTimeout { path: output, waited });
            }
            self.status.set(ProcessStatus::Lag);
            sleep(self.poll.min(self.timeout - waited)).await;
        }

        let answer = read_text(&output)?.trim().to_string();
        if let Err(e) = std::fs::remove_file(&output) {
            warn!("Failed to remove {}: {}", output.display(), e);
        }
        Ok(answer)
    }
}
