//! Readiness files (`gotowe.txt`) written by servers and polled by agents.

use crate::config::HandshakeConfig;
use crate::error::{HandshakeError, HandshakeResult};
use crate::events::{AgentEvent, EventSink};
use crate::status::StatusReporter;
use plama_storage::{atomic_write, read_text_opt};
use plama_types::files::READY_FILE;
use plama_types::ProcessStatus;
use std::path::{Path, PathBuf};
use tokio::time::{sleep, Instant};
use tracing::{debug, info};

/// What a server announced about itself.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReadinessInfo {
    pub host: Option<String>,
    pub port: Option<u16>,
    pub url: Option<String>,
}

impl ReadinessInfo {
    /// Parses a readiness file. Comment lines (`#`), list lines (`- `) and
    /// lines without `=` are skipped; a missing `url` is derived from host
    /// and port.
    #[must_use]
    pub fn parse(text: &str) -> Self {
        let mut info = Self::default();
        for raw in text.lines() {
            let line = raw.trim();
            if line.is_empty() || line.starts_with('#') || line.starts_with("- ") {
                continue;
            }
            let Some((key, value)) = line.split_once('=') else {
                continue;
            };
            let value = value.trim();
            match key.trim().to_lowercase().as_str() {
                "host" if !value.is_empty() => info.host = Some(value.to_string()),
                "port" => info.port = value.parse().ok(),
                "url" if !value.is_empty() => info.url = Some(value.to_string()),
                _ => {}
            }
        }
        if info.url.is_none() {
            if let (Some(host), Some(port)) = (&info.host, info.port) {
                info.url = Some(format!("http://{host}:{port}"));
            }
        }
        info
    }

    /// Renders the file a server writes once it accepts requests.
    #[must_use]
    pub fn render(host: &str, port: u16) -> String {
        let stamp = chrono::Local::now().format("%Y-%m-%d %H:%M:%S");
        format!("# {READY_FILE} {stamp}\nhost = {host}\nport = {port}\nurl = http://{host}:{port}\n")
    }
}

/// Writes `gotowe.txt` into `server_dir` and then sets the server's own
/// status to `on`. Returns the readiness file path.
pub fn announce(server_dir: &Path, host: &str, port: u16, status: &StatusReporter) -> HandshakeResult<PathBuf> {
    let path = server_dir.join(READY_FILE);
    atomic_write(&path, &ReadinessInfo::render(host, port))?;
    info!("Announced {}:{} in {}", host, port, path.display());
    status.set(ProcessStatus::On);
    Ok(path)
}

/// Polls for `peer_dir/gotowe.txt`, marking the caller `lag` on every poll,
/// until it appears or the configured bound elapses.
pub async fn wait_for_readiness(
    peer_dir: &Path,
    config: &HandshakeConfig,
    status: &StatusReporter,
    events: &EventSink,
) -> HandshakeResult<ReadinessInfo> {
    let path = peer_dir.join(READY_FILE);
    let bound = config.readiness_timeout();
    let started = Instant::now();

    while !path.exists() {
        let waited = started.elapsed();
        if waited >= bound {
            return Err(HandshakeError::ReadinessTimeout { path, waited });
        }
        status.set(ProcessStatus::Lag);
        events.emit(AgentEvent::WaitingForReadiness {
            path: path.clone(),
            waited,
        });
        debug!("Waiting for {}", path.display());
        sleep(config.poll_interval().min(bound - waited)).await;
    }

    let text = read_text_opt(&path)?.unwrap_or_default();
    let info = ReadinessInfo::parse(&text);
    debug!("Readiness: {:?}", info);
    Ok(info)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn url_is_derived_from_host_and_port() {
        let info = ReadinessInfo::parse("# gotowe\nhost = 127.0.0.1\nport = 3333\n- note=x\n");
        assert_eq!(info.url.as_deref(), Some("http://127.0.0.1:3333"));
    }

    #[test]
    fn explicit_url_wins() {
        let info = ReadinessInfo::parse("host=a\nport=1\nurl=http://b:2/run\n");
        assert_eq!(info.url.as_deref(), Some("http://b:2/run"));
    }

    #[test]
    fn rendered_file_parses_back() {
        let info = ReadinessInfo::parse(&ReadinessInfo::render("localhost", 8080));
        assert_eq!(info.host.as_deref(), Some("localhost"));
        assert_eq!(info.port, Some(8080));
        assert_eq!(info.url.as_deref(), Some("http://localhost:8080"));
    }

    #[test]
    fn bad_port_leaves_url_unset() {
        let info = ReadinessInfo::parse("host=a\nport=abc\n");
        assert_eq!(info.url, None);
    }
}
