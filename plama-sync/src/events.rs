//! Typed progress events published alongside the on-disk status field.

use plama_types::ProcessStatus;
use std::path::PathBuf;
use std::time::Duration;
use tokio::sync::mpsc;

/// Something that happened during an agent or line run.
#[derive(Debug, Clone, PartialEq)]
pub enum AgentEvent {
    StatusChanged(ProcessStatus),
    WaitingForReadiness { path: PathBuf, waited: Duration },
    /// A request went out, to a URL or into a peer folder.
    Dispatched { target: String },
    Retrying { after: Duration, reason: String },
    Completed { output_len: usize },
    Failed { message: String },
    /// A follow-up entry point was launched.
    Chained { script: PathBuf },
}

/// Optional sender for [`AgentEvent`]s. Sending never blocks and a dropped
/// receiver is ignored.
#[derive(Debug, Clone, Default)]
pub struct EventSink(Option<mpsc::UnboundedSender<AgentEvent>>);

impl EventSink {
    /// A sink that discards everything.
    #[must_use]
    pub fn disabled() -> Self {
        Self(None)
    }

    pub(crate) fn emit(&self, event: AgentEvent) {
        if let Some(tx) = &self.0 {
            let _ = tx.send(event);
        }
    }
}

/// Creates a connected sink and receiver.
#[must_use]
pub fn event_channel() -> (EventSink, mpsc::UnboundedReceiver<AgentEvent>) {
    let (tx, rx) = mpsc::unbounded_channel();
    (EventSink(Some(tx)), rx)
}
