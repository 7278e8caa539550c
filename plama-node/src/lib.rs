//! Command-line surface of the `plama` binary.
//!
//! Each subcommand is one short-lived job over a map root or a container
//! folder. Logging is installed by the binary; everything here only emits
//! through `tracing`.

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use plama_storage::{
    create_connection, maintenance, MapLayout, MapWatcher, PositionEditor, WatchConfig,
    DEFAULT_MATCH_TOLERANCE,
};
use plama_sync::{
    announce, Agent, DetachedLauncher, EventSink, HandshakeConfig, LineRoute, StatusReporter,
};
use plama_types::files::{AGENT_LOG_FILE, LINE_LOG_FILE, OBJECT_DATA_FILE};
use plama_types::Position;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use tracing::{error, info, warn};

#[derive(Parser, Debug)]
#[command(name = "plama")]
#[command(about = "File-backed map of objects, lines and agents")]
pub struct Cli {
    /// Enable verbose debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Keep obraz.txt and polaczenie.txt in step with the map until Ctrl-C
    Watch {
        #[arg(long)]
        root: PathBuf,
        /// Rescan interval in milliseconds
        #[arg(long, default_value_t = WatchConfig::default().interval_ms)]
        interval_ms: u64,
    },
    /// Rewrite both snapshots once
    Snapshot {
        #[arg(long)]
        root: PathBuf,
    },
    /// Write a dragged position back to its source file
    Move {
        #[arg(long)]
        root: PathBuf,
        #[arg(long, required_unless_present = "id", num_args = 2, value_names = ["X", "Y"], allow_negative_numbers = true)]
        from: Vec<f64>,
        #[arg(long, required = true, num_args = 2, value_names = ["X", "Y"], allow_negative_numbers = true)]
        to: Vec<f64>,
        /// Object folder to search first
        #[arg(long)]
        container: Option<String>,
        /// Move the object with this id.txt instead of matching by position
        #[arg(long, conflicts_with_all = ["from", "container"])]
        id: Option<String>,
        /// Per-axis match tolerance
        #[arg(long, default_value_t = DEFAULT_MATCH_TOLERANCE)]
        tolerance: f64,
    },
    /// Run one agent handshake in a container folder
    Agent {
        #[arg(long)]
        dir: PathBuf,
        #[command(flatten)]
        handshake: HandshakeArgs,
    },
    /// Route one line's data from object A to object B
    Line {
        #[arg(long)]
        dir: PathBuf,
        #[command(flatten)]
        handshake: HandshakeArgs,
    },
    /// Write gotowe.txt for a server and mark it on
    Announce {
        #[arg(long)]
        dir: PathBuf,
        #[arg(long, default_value = "127.0.0.1")]
        host: String,
        #[arg(long)]
        port: u16,
    },
    /// Run the maintenance sweeps once
    Sweep {
        #[arg(long)]
        root: PathBuf,
    },
    /// Create a connection between two objects from a template folder
    Connect {
        #[arg(long)]
        root: PathBuf,
        #[arg(long)]
        template: PathBuf,
        #[arg(long = "a")]
        id_a: String,
        #[arg(long = "b")]
        id_b: String,
    },
}

/// Handshake timings that can be overridden per run.
#[derive(Args, Debug, Clone)]
pub struct HandshakeArgs {
    /// How long to wait for the peer's gotowe.txt, in milliseconds
    #[arg(long, default_value_t = HandshakeConfig::default().readiness_timeout_ms)]
    pub readiness_timeout_ms: u64,

    /// Interpreter used for start.py entry points
    #[arg(long, default_value_t = HandshakeConfig::default().interpreter)]
    pub interpreter: String,
}

impl HandshakeArgs {
    #[must_use]
    pub fn config(&self) -> HandshakeConfig {
        HandshakeConfig {
            readiness_timeout_ms: self.readiness_timeout_ms,
            interpreter: self.interpreter.clone(),
            ..HandshakeConfig::default()
        }
    }
}

impl Command {
    /// The container log every line of a run is copied into, if any.
    #[must_use]
    pub fn log_file(&self) -> Option<PathBuf> {
        match self {
            Self::Agent { dir, .. } => Some(dir.join(AGENT_LOG_FILE)),
            Self::Line { dir, .. } => Some(dir.join(LINE_LOG_FILE)),
            _ => None,
        }
    }
}

/// How a command that ran to completion ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Success,
    /// The job ran but did not do its work (failed run, nothing moved).
    Failure,
}

impl From<Outcome> for ExitCode {
    fn from(outcome: Outcome) -> Self {
        match outcome {
            Outcome::Success => ExitCode::SUCCESS,
            Outcome::Failure => ExitCode::FAILURE,
        }
    }
}

fn position(values: &[f64]) -> Result<Position> {
    match values {
        [x, y] => Ok(Position::new(*x, *y)),
        _ => anyhow::bail!("expected two coordinates, got {}", values.len()),
    }
}

/// Runs one command to completion.
pub async fn run(command: Command) -> Result<Outcome> {
    match command {
        Command::Watch { root, interval_ms } => {
            let watcher = MapWatcher::new(MapLayout::new(root));
            let shutdown = async {
                if let Err(e) = tokio::signal::ctrl_c().await {
                    warn!("Ctrl-C handler failed: {}", e);
                    std::future::pending::<()>().await;
                }
            };
            watcher
                .run(WatchConfig { interval_ms }, shutdown)
                .await
                .context("Watch loop failed")?;
            Ok(Outcome::Success)
        }

        Command::Snapshot { root } => {
            let stats = MapWatcher::new(MapLayout::new(&root))
                .refresh()
                .with_context(|| format!("Failed to write snapshots under {}", root.display()))?;
            info!("Snapshots written: {} objects, {} lines", stats.objects, stats.lines);
            Ok(Outcome::Success)
        }

        Command::Move {
            root,
            from,
            to,
            container,
            id,
            tolerance,
        } => {
            let to = position(&to)?;
            let mut watcher = MapWatcher::new(MapLayout::new(root).with_match_tolerance(tolerance));
            watcher.prime().context("Failed to load the map")?;

            if let Some(id) = id {
                PositionEditor::new(watcher.repository())
                    .apply_move_by_id(&id, to)
                    .with_context(|| format!("Failed to move object {}", id))?;
                watcher.refresh().context("Failed to write snapshots")?;
                info!("Moved object {} to ({}, {})", id, to.x, to.y);
                return Ok(Outcome::Success);
            }

            let from = position(&from)?;
            let updated = watcher
                .commit_move(from, to, container.as_deref())
                .context("Failed to apply move")?;
            if updated == 0 {
                warn!("No source line at ({}, {})", from.x, from.y);
                return Ok(Outcome::Failure);
            }
            info!("Moved ({}, {}) -> ({}, {}) in {} file(s)", from.x, from.y, to.x, to.y, updated);
            Ok(Outcome::Success)
        }

        Command::Agent { dir, handshake } => {
            let agent = Agent::new(dir, handshake.config());
            match agent.run().await {
                Ok(_) => Ok(Outcome::Success),
                Err(e) => {
                    error!("Agent failed: {}", e);
                    Ok(Outcome::Failure)
                }
            }
        }

        Command::Line { dir, handshake } => {
            let launcher = Arc::new(DetachedLauncher::new(handshake.interpreter));
            match LineRoute::new(dir, launcher).run() {
                Ok(_) => Ok(Outcome::Success),
                Err(e) => {
                    error!("Line failed: {}", e);
                    Ok(Outcome::Failure)
                }
            }
        }

        Command::Announce { dir, host, port } => {
            let status = StatusReporter::new(dir.join(OBJECT_DATA_FILE), EventSink::disabled());
            announce(&dir, &host, port, &status)
                .with_context(|| format!("Failed to announce {}", dir.display()))?;
            Ok(Outcome::Success)
        }

        Command::Sweep { root } => {
            let report = maintenance::run_all(&MapLayout::new(&root))
                .with_context(|| format!("Sweep failed under {}", root.display()))?;
            info!(
                "Sweep: {} object ids, {} line ids, {} endpoints, {} pointers, {} quarantined",
                report.object_ids.len(),
                report.line_ids.len(),
                report.endpoints_synced.len(),
                report.next_pointers,
                report.quarantined.len()
            );
            Ok(Outcome::Success)
        }

        Command::Connect {
            root,
            template,
            id_a,
            id_b,
        } => {
            let folder = create_connection(&MapLayout::new(root), &template, &id_a, &id_b)
                .with_context(|| format!("Failed to connect {} -> {}", id_a, id_b))?;
            println!("{}", folder.display());
            Ok(Outcome::Success)
        }
    }
}
