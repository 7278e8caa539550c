//! Polling loop that keeps the snapshots in step with the record files.

use crate::editor::PositionEditor;
use crate::error::StorageResult;
use crate::layout::MapLayout;
use crate::repository::Repository;
use crate::signature::SourceSignature;
use crate::snapshot::{write_line_snapshot, write_object_snapshot};
use plama_types::Position;
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Configuration for [`MapWatcher::run`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WatchConfig {
    /// How often to recompute the source signature (in milliseconds).
    pub interval_ms: u64,
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self { interval_ms: 1000 }
    }
}

impl WatchConfig {
    #[must_use]
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms.max(1))
    }
}

/// Counts from one reload-and-write pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RefreshStats {
    pub objects: usize,
    pub lines: usize,
}

/// What a single [`MapWatcher::tick`] did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// Signature equal to the last accepted one.
    Unchanged,
    /// Sources changed; caches reloaded and snapshots rewritten.
    Refreshed(RefreshStats),
    /// Sources changed during a drag; the refresh waits for the drag to end.
    Deferred,
    /// The signature could not be captured; retried next tick.
    Skipped,
}

/// Owns a [`Repository`] and rewrites both snapshots when sources change.
#[derive(Debug)]
pub struct MapWatcher {
    repo: Repository,
    accepted: Option<SourceSignature>,
    dragging: bool,
    dirty: bool,
}

impl MapWatcher {
    #[must_use]
    pub fn new(layout: MapLayout) -> Self {
        Self {
            repo: Repository::new(layout),
            accepted: None,
            dragging: false,
            dirty: false,
        }
    }

    #[must_use]
    pub fn repository(&self) -> &Repository {
        &self.repo
    }

    #[must_use]
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Seeds the signature and writes the initial snapshots.
    pub fn prime(&mut self) -> StorageResult<RefreshStats> {
        let signature = match SourceSignature::capture(self.repo.layout()) {
            Ok(signature) => Some(signature),
            Err(e) => {
                warn!("Initial signature capture failed: {}", e);
                None
            }
        };
        let stats = self.refresh()?;
        self.accepted = signature;
        Ok(stats)
    }

    /// Reloads both caches and writes both snapshots.
    pub fn refresh(&mut self) -> StorageResult<RefreshStats> {
        let objects = self.repo.reload_objects();
        let lines = self.repo.reload_lines();
        let layout = self.repo.layout();
        write_object_snapshot(&layout.object_snapshot(), objects.iter())?;
        write_line_snapshot(&layout.line_snapshot(), lines.iter())?;
        self.dirty = false;
        Ok(RefreshStats {
            objects: objects.len(),
            lines: lines.len(),
        })
    }

    /// One poll: recompute the signature and refresh when it changed.
    pub fn tick(&mut self) -> StorageResult<TickOutcome> {
        let signature = match SourceSignature::capture(self.repo.layout()) {
            Ok(signature) => signature,
            Err(e) => {
                debug!("Signature capture failed, retrying next tick: {}", e);
                return Ok(TickOutcome::Skipped);
            }
        };
        if self.accepted.as_ref() == Some(&signature) {
            return Ok(TickOutcome::Unchanged);
        }
        if self.dragging {
            self.dirty = true;
            return Ok(TickOutcome::Deferred);
        }

        let stats = self.refresh()?;
        self.accepted = Some(signature);
        debug!("Snapshots rewritten: {} objects, {} lines", stats.objects, stats.lines);
        Ok(TickOutcome::Refreshed(stats))
    }

    /// Suppresses refreshes until [`end_drag`](Self::end_drag).
    pub fn begin_drag(&mut self) {
        self.dragging = true;
    }

    /// Ends a drag and runs a tick if anything changed meanwhile.
    pub fn end_drag(&mut self) -> StorageResult<TickOutcome> {
        self.dragging = false;
        if self.dirty {
            self.tick()
        } else {
            Ok(TickOutcome::Unchanged)
        }
    }

    /// Persists a drag release and ends the drag. Returns the number of files
    /// rewritten.
    pub fn commit_move(
        &mut self,
        from: Position,
        to: Position,
        container_hint: Option<&str>,
    ) -> StorageResult<usize> {
        let updated = PositionEditor::new(&self.repo).apply_move(from, to, container_hint)?;
        self.dragging = false;
        if updated > 0 {
            self.refresh()?;
            self.accepted = SourceSignature::capture(self.repo.layout()).ok();
        } else if self.dirty {
            self.tick()?;
        }
        Ok(updated)
    }

    /// Primes, then ticks on `config`'s interval until `shutdown` resolves.
    pub async fn run<F>(mut self, config: WatchConfig, shutdown: F) -> StorageResult<Self>
    where
        F: Future<Output = ()>,
    {
        let stats = self.prime()?;
        info!(
            "Watching {} ({} objects, {} lines)",
            self.repo.layout().root.display(),
            stats.objects,
            stats.lines
        );

        let mut interval = tokio::time::interval(config.interval());
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                () = &mut shutdown => {
                    info!("Watcher stopping");
                    return Ok(self);
                }
                _ = interval.tick() => {
                    // Directory walks and reads stay off the runtime threads.
                    let (watcher, result) = tokio::task::spawn_blocking(move || {
                        let result = self.tick();
                        (self, result)
                    })
                    .await?;
                    self = watcher;
                    match result {
                        Ok(TickOutcome::Refreshed(stats)) => {
                            info!("Map changed: {} objects, {} lines", stats.objects, stats.lines);
                        }
                        Ok(_) => {}
                        Err(e) => warn!("Refresh failed: {}", e),
                    }
                }
            }
        }
    }
}
