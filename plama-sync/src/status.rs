//! Writing the `proces=` field of a participant's own record file.

use crate::events::{AgentEvent, EventSink};
use plama_storage::{atomic_write, read_text_opt, StorageResult};
use plama_types::kv::upsert_key_line;
use plama_types::{FieldMap, ProcessStatus};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Records liveness into one record file.
#[derive(Debug, Clone)]
pub struct StatusReporter {
    record_file: PathBuf,
    events: EventSink,
}

impl StatusReporter {
    #[must_use]
    pub fn new(record_file: impl Into<PathBuf>, events: EventSink) -> Self {
        Self {
            record_file: record_file.into(),
            events,
        }
    }

    #[must_use]
    pub fn record_file(&self) -> &Path {
        &self.record_file
    }

    /// Sets the status. Failures are logged and swallowed: the status field
    /// is a display channel and must never end a run on its own.
    pub fn set(&self, status: ProcessStatus) {
        match self.try_set(&status) {
            Ok(previous) => {
                if !previous.can_transition_to(&status) {
                    debug!(
                        "Unusual status change in {}: {} -> {}",
                        self.record_file.display(),
                        previous,
                        status
                    );
                }
                info!("proces={}", status);
                self.events.emit(AgentEvent::StatusChanged(status));
            }
            Err(e) => warn!("Failed to write proces={}: {}", status, e),
        }
    }

    /// Replaces every `proces=` line, or appends one, atomically.
    /// Returns the status the file held before.
    pub fn try_set(&self, status: &ProcessStatus) -> StorageResult<ProcessStatus> {
        let current = read_text_opt(&self.record_file)?.unwrap_or_default();
        let previous = FieldMap::from_lines(current.lines())
            .get("proces")
            .map(ProcessStatus::parse)
            .unwrap_or_default();
        let updated = upsert_key_line(current.trim(), "proces", status.as_str());
        atomic_write(&self.record_file, &updated)?;
        Ok(previous)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn replaces_every_status_line() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("mapa_dane.txt");
        fs::write(&path, "xy=1 2\nproces=off\nikona=a\nPROCES=on\n").unwrap();

        StatusReporter::new(&path, EventSink::disabled()).set(ProcessStatus::Lag);
        assert_eq!(
            fs::read_to_string(&path).unwrap(),
            "xy=1 2\nproces=lag\nikona=a\nproces=lag\n"
        );
    }

    #[test]
    fn appends_when_missing_and_creates_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("mapa_dane.txt");

        let status = StatusReporter::new(&path, EventSink::disabled());
        status.set(ProcessStatus::On);
        assert_eq!(fs::read_to_string(&path).unwrap(), "proces=on\n");

        fs::write(&path, "xy=1 2\n\n").unwrap();
        status.set(ProcessStatus::Off);
        assert_eq!(fs::read_to_string(&path).unwrap(), "xy=1 2\nproces=off\n");
    }

    #[test]
    fn try_set_reports_the_previous_status() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("mapa_dane.txt");
        let status = StatusReporter::new(&path, EventSink::disabled());

        assert_eq!(status.try_set(&ProcessStatus::On).unwrap(), ProcessStatus::Unset);
        assert_eq!(status.try_set(&ProcessStatus::Lag).unwrap(), ProcessStatus::On);
        assert_eq!(status.try_set(&ProcessStatus::Off).unwrap(), ProcessStatus::Lag);
    }

    #[test]
    fn unusual_transition_is_still_written() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("mapa_dane.txt");
        fs::write(&path, "xy=1 2\nproces=off\n").unwrap();
        assert!(!ProcessStatus::Off.can_transition_to(&ProcessStatus::Lag));

        StatusReporter::new(&path, EventSink::disabled()).set(ProcessStatus::Lag);
        assert_eq!(fs::read_to_string(&path).unwrap(), "xy=1 2\nproces=lag\n");
    }
}
