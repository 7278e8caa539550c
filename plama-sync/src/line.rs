//! Line runs: moving object A's output into object B and starting B.

use crate::chain::map_root_of;
use crate::error::{HandshakeError, HandshakeResult};
use crate::events::{AgentEvent, EventSink};
use crate::launcher::ProcessLauncher;
use crate::status::StatusReporter;
use plama_storage::maintenance::line_endpoints;
use plama_storage::{atomic_write, object_folder_by_id, read_text, read_text_opt, MapLayout};
use plama_types::files::{ENTRY_SCRIPT, INPUT_FILE, LINE_DATA_FILE, OUTPUT_FILE, STATE_FILE};
use plama_types::ProcessStatus;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{error, info};

/// How data was delivered to object B.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteMode {
    /// B carries `all.txt`: the data replaces its state, input and output.
    Stateful,
    /// B's existing `wejście.txt` was overwritten and verified.
    Classic,
}

/// What a successful line run did.
#[derive(Debug, Clone, PartialEq)]
pub struct RouteOutcome {
    pub mode: RouteMode,
    /// Folder of object B.
    pub target: PathBuf,
    /// Bytes moved from A to B.
    pub bytes: usize,
    /// B's entry point, when it was launched.
    pub launched: Option<PathBuf>,
}

/// A line container folder (`<root>/linie/<name>`).
#[derive(Debug, Clone)]
pub struct LineRoute {
    dir: PathBuf,
    status: StatusReporter,
    events: EventSink,
    launcher: Arc<dyn ProcessLauncher>,
}

impl LineRoute {
    #[must_use]
    pub fn new(dir: impl Into<PathBuf>, launcher: Arc<dyn ProcessLauncher>) -> Self {
        let dir = dir.into();
        Self {
            status: StatusReporter::new(dir.join(LINE_DATA_FILE), EventSink::disabled()),
            dir,
            events: EventSink::disabled(),
            launcher,
        }
    }

    #[must_use]
    pub fn with_events(mut self, events: EventSink) -> Self {
        self.status = StatusReporter::new(self.dir.join(LINE_DATA_FILE), events.clone());
        self.events = events;
        self
    }

    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Runs the line once. Status is `on` while routing, `off` afterwards
    /// and `error` on any failure.
    pub fn run(&self) -> HandshakeResult<RouteOutcome> {
        info!("Line start: {}", self.dir.display());
        self.status.set(ProcessStatus::On);

        match self.route() {
            Ok(outcome) => {
                if let Some(script) = &outcome.launched {
                    self.events.emit(AgentEvent::Chained {
                        script: script.clone(),
                    });
                }
                self.status.set(ProcessStatus::Off);
                self.events.emit(AgentEvent::Completed {
                    output_len: outcome.bytes,
                });
                info!("Line done ({:?}, {} bytes)", outcome.mode, outcome.bytes);
                Ok(outcome)
            }
            Err(e) => {
                let message = format!("{}: {}", e.kind(), e);
                error!("Line failed: {}", message);
                self.status.set(ProcessStatus::Error);
                self.events.emit(AgentEvent::Failed { message });
                Err(e)
            }
        }
    }

    fn route(&self) -> HandshakeResult<RouteOutcome> {
        let endpoints = line_endpoints(&self.dir)?;
        info!("A={}, B={}", endpoints.a, endpoints.b);

        let layout = MapLayout::new(map_root_of(&self.dir));
        let source = resolve(&layout, &endpoints.a)?;
        let target = resolve(&layout, &endpoints.b)?;

        let output = source.join(OUTPUT_FILE);
        let Some(data) = read_text_opt(&output)? else {
            return Err(HandshakeError::Routing(format!(
                "object {} has no {}",
                endpoints.a,
                output.display()
            )));
        };
        self.events.emit(AgentEvent::Dispatched {
            target: target.display().to_string(),
        });

        let mode = if target.join(STATE_FILE).exists() {
            for name in [STATE_FILE, INPUT_FILE, OUTPUT_FILE] {
                atomic_write(&target.join(name), &data)?;
            }
            RouteMode::Stateful
        } else {
            let input = target.join(INPUT_FILE);
            if !input.is_file() {
                return Err(HandshakeError::Routing(format!(
                    "object {} has no {}",
                    endpoints.b,
                    input.display()
                )));
            }
            atomic_write(&input, &data)?;
            if read_text(&input)? != data {
                return Err(HandshakeError::Routing(format!(
                    "{} does not match after write",
                    input.display()
                )));
            }
            RouteMode::Classic
        };
        info!("Delivered {} bytes to {} ({:?})", data.len(), target.display(), mode);

        let script = target.join(ENTRY_SCRIPT);
        let launched = if script.is_file() {
            self.launcher.launch(&script)?;
            Some(script)
        } else {
            info!("{} has no {}", target.display(), ENTRY_SCRIPT);
            None
        };

        Ok(RouteOutcome {
            mode,
            target,
            bytes: data.len(),
            launched,
        })
    }
}

fn resolve(layout: &MapLayout, id: &str) -> HandshakeResult<PathBuf> {
    object_folder_by_id(layout, id)?.ok_or_else(|| {
        HandshakeError::Routing(format!(
            "no object with id={} under {}",
            id,
            layout.objects_dir().display()
        ))
    })
}
