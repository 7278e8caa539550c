//! Starting entry points as independent, unsupervised processes.

use crate::error::{HandshakeError, HandshakeResult};
use std::fmt::Debug;
use std::path::Path;
use std::process::{Command, Stdio};
use tracing::info;

/// Starts a container's entry point without waiting for it.
pub trait ProcessLauncher: Send + Sync + Debug {
    fn launch(&self, script: &Path) -> HandshakeResult<()>;
}

/// Runs `<interpreter> <script>` in the script's folder, detached from our
/// stdio. The child is never waited on.
#[derive(Debug, Clone)]
pub struct DetachedLauncher {
    interpreter: String,
}

impl DetachedLauncher {
    #[must_use]
    pub fn new(interpreter: impl Into<String>) -> Self {
        Self {
            interpreter: interpreter.into(),
        }
    }
}

impl ProcessLauncher for DetachedLauncher {
    fn launch(&self, script: &Path) -> HandshakeResult<()> {
        let mut command = Command::new(&self.interpreter);
        command
            .arg(script)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null());
        if let Some(dir) = script.parent() {
            command.current_dir(dir);
        }
        let child = command.spawn().map_err(|source| HandshakeError::Launch {
            script: script.to_path_buf(),
            source,
        })?;
        info!("Launched {} (pid {})", script.display(), child.id());
        Ok(())
    }
}
