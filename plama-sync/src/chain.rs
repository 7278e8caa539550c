//! Following an object's `następny.txt` to the line that runs next.

use crate::error::HandshakeResult;
use crate::launcher::ProcessLauncher;
use plama_storage::{line_folder_by_id, read_text_opt, MapLayout};
use plama_types::files::{ENTRY_SCRIPT, NEXT_FILE};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// The map root a container folder lives under (`<root>/obiekty/<name>`).
#[must_use]
pub fn map_root_of(container_dir: &Path) -> PathBuf {
    container_dir
        .parent()
        .and_then(Path::parent)
        .map(Path::to_path_buf)
        .unwrap_or_else(|| container_dir.to_path_buf())
}

/// Resolves the entry point of the line named by `agent_dir/następny.txt`.
///
/// `None` when there is no pointer, the pointer is empty, no line carries
/// that id, or the line has no entry point.
pub fn next_entry_point(agent_dir: &Path) -> HandshakeResult<Option<PathBuf>> {
    let Some(pointer) = read_text_opt(&agent_dir.join(NEXT_FILE))? else {
        debug!("No {}", NEXT_FILE);
        return Ok(None);
    };
    let id = pointer.trim();
    if id.is_empty() {
        return Ok(None);
    }

    let layout = MapLayout::new(map_root_of(agent_dir));
    let Some(line) = line_folder_by_id(&layout, id)? else {
        info!("No line with L_id={} under {}", id, layout.lines_dir().display());
        return Ok(None);
    };
    let script = line.join(ENTRY_SCRIPT);
    if !script.is_file() {
        info!("Line {} has no {}", line.display(), ENTRY_SCRIPT);
        return Ok(None);
    }
    Ok(Some(script))
}

/// Launches the next line, if any. Returns the launched script.
pub fn chain_next(agent_dir: &Path, launcher: &dyn ProcessLauncher) -> HandshakeResult<Option<PathBuf>> {
    let Some(script) = next_entry_point(agent_dir)? else {
        return Ok(None);
    };
    launcher.launch(&script)?;
    Ok(Some(script))
}
