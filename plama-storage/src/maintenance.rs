//! Housekeeping sweeps over a map root.
//!
//! Each sweep works folder by folder; a failure in one folder is logged and
//! the sweep moves on.

use crate::atomic::{atomic_write, read_text, read_text_opt};
use crate::error::{StorageError, StorageResult};
use crate::ids::{line_id, object_folder_by_id, object_id};
use crate::layout::{folder_name, object_data_file, MapLayout};
use plama_types::files::{
    ENDPOINTS_FILE, LINE_DATA_FILE, LINE_ID_FILE, NEXT_FILE, OBJECT_DATA_FILE, OBJECT_ID_FILE,
};
use plama_types::kv::replace_key_line_once;
use plama_types::{classify, Endpoints, FieldMap, Position, RecordShape};
use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// An id written to a folder that lacked one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdAssignment {
    pub folder: PathBuf,
    pub id: u64,
}

/// A folder moved into the trash.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Quarantined {
    pub from: PathBuf,
    pub to: PathBuf,
}

/// Everything one [`run_all`] pass changed.
#[derive(Debug, Default)]
pub struct SweepReport {
    pub object_ids: Vec<IdAssignment>,
    pub line_ids: Vec<IdAssignment>,
    pub endpoints_synced: Vec<PathBuf>,
    pub next_pointers: usize,
    pub quarantined: Vec<Quarantined>,
}

impl SweepReport {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.object_ids.is_empty()
            && self.line_ids.is_empty()
            && self.endpoints_synced.is_empty()
            && self.next_pointers == 0
            && self.quarantined.is_empty()
    }
}

/// Runs every sweep once: quarantine, ids, endpoints, next pointers.
pub fn run_all(layout: &MapLayout) -> StorageResult<SweepReport> {
    Ok(SweepReport {
        quarantined: quarantine_orphans(layout)?,
        object_ids: assign_object_ids(layout)?,
        line_ids: assign_line_ids(layout)?,
        endpoints_synced: sync_line_endpoints(layout)?,
        next_pointers: propagate_next_pointers(layout)?,
    })
}

/// Gives every object folder without `id.txt` the smallest unused positive
/// integer.
pub fn assign_object_ids(layout: &MapLayout) -> StorageResult<Vec<IdAssignment>> {
    let folders = layout.object_folders()?;
    let mut used = BTreeSet::new();
    let mut missing = Vec::new();

    for folder in folders {
        match object_id(&folder) {
            Ok(Some(id)) => match id.parse::<u64>() {
                Ok(n) => {
                    used.insert(n);
                }
                Err(_) => warn!("Ignoring non-numeric id {:?} in {}", id, folder.display()),
            },
            Ok(None) if !folder.join(OBJECT_ID_FILE).exists() => missing.push(folder),
            Ok(None) => warn!("Empty {} in {}", OBJECT_ID_FILE, folder.display()),
            Err(e) => warn!("Skipping {}: {}", folder.display(), e),
        }
    }

    let mut assigned = Vec::new();
    let mut next = 1;
    for folder in missing {
        while used.contains(&next) {
            next += 1;
        }
        match atomic_write(&folder.join(OBJECT_ID_FILE), &next.to_string()) {
            Ok(()) => {
                info!("Assigned id {} to {}", next, folder_name(&folder));
                used.insert(next);
                assigned.push(IdAssignment { folder, id: next });
            }
            Err(e) => warn!("Failed to write id for {}: {}", folder.display(), e),
        }
    }
    Ok(assigned)
}

/// Gives every line folder whose `L_id.txt` is missing, empty or not an
/// integer the next id after the current maximum.
pub fn assign_line_ids(layout: &MapLayout) -> StorageResult<Vec<IdAssignment>> {
    let folders = layout.line_folders()?;
    let mut max = 0;
    let mut missing = Vec::new();

    for folder in folders {
        match line_id(&folder) {
            Ok(Some(id)) => match id.parse::<u64>() {
                Ok(n) => max = max.max(n),
                Err(_) => missing.push(folder),
            },
            Ok(None) => missing.push(folder),
            Err(e) => warn!("Skipping {}: {}", folder.display(), e),
        }
    }

    let mut assigned = Vec::new();
    for folder in missing {
        let id = max + 1;
        match atomic_write(&folder.join(LINE_ID_FILE), &id.to_string()) {
            Ok(()) => {
                info!("Assigned line id {} to {}", id, folder_name(&folder));
                max = id;
                assigned.push(IdAssignment { folder, id });
            }
            Err(e) => warn!("Failed to write line id for {}: {}", folder.display(), e),
        }
    }
    Ok(assigned)
}

/// The integer-rounded `xy` of an object's `mapa_dane.txt`.
pub fn object_position(folder: &Path) -> StorageResult<Option<Position>> {
    let Some(text) = read_text_opt(&object_data_file(folder))? else {
        return Ok(None);
    };
    let lines: Vec<&str> = text.lines().collect();
    let value = match classify(&lines) {
        RecordShape::MultiLine => FieldMap::from_lines(lines.iter().copied())
            .get_non_empty("xy")
            .map(str::to_string),
        // First record that carries a position wins.
        RecordShape::SingleLine => lines.iter().find_map(|line| {
            FieldMap::from_pipe_line(line)
                .get_non_empty("xy")
                .map(str::to_string)
        }),
    };
    Ok(value.map(|value| {
        let (x, y) = Position::parse(&value).rounded();
        Position::new(x as f64, y as f64)
    }))
}

fn read_endpoints(folder: &Path) -> StorageResult<Option<Endpoints>> {
    let path = folder.join(ENDPOINTS_FILE);
    let Some(text) = read_text_opt(&path)? else {
        return Ok(None);
    };
    Endpoints::parse(&text)
        .map(Some)
        .map_err(|e| StorageError::record(&path, e))
}

fn endpoint_position(layout: &MapLayout, id: &str) -> StorageResult<Position> {
    let folder = object_folder_by_id(layout, id)?
        .ok_or_else(|| StorageError::NotFound(format!("object with id {id}")))?;
    object_position(&folder)?
        .ok_or_else(|| StorageError::InvalidData(format!("object {id} has no xy")))
}

/// Copies each line's endpoint object coordinates into its `xy1`/`xy2`.
/// Returns the line folders that were rewritten.
pub fn sync_line_endpoints(layout: &MapLayout) -> StorageResult<Vec<PathBuf>> {
    let mut synced = Vec::new();
    for folder in layout.line_folders()? {
        match sync_one_line(layout, &folder) {
            Ok(true) => synced.push(folder),
            Ok(false) => {}
            Err(e) => warn!("Endpoint sync failed for {}: {}", folder.display(), e),
        }
    }
    Ok(synced)
}

fn sync_one_line(layout: &MapLayout, folder: &Path) -> StorageResult<bool> {
    let data_path = folder.join(LINE_DATA_FILE);
    let Some(endpoints) = read_endpoints(folder)? else {
        return Ok(false);
    };
    let Some(text) = read_text_opt(&data_path)? else {
        return Ok(false);
    };

    let (start, end) = match (
        endpoint_position(layout, &endpoints.a),
        endpoint_position(layout, &endpoints.b),
    ) {
        (Err(e), Err(_)) => return Err(e),
        (start, end) => (resolved(folder, "A", start), resolved(folder, "B", end)),
    };

    let fields = FieldMap::from_lines(text.lines());
    let mut updated = text.clone();
    let mut changed = false;
    for (key, target) in [("xy1", &start), ("xy2", &end)] {
        let Some(target) = target else { continue };
        let current = fields.get(key).map(|value| Position::parse(value).to_field());
        if current.as_deref() != Some(target.as_str()) {
            updated = replace_key_line_once(&updated, key, target);
            changed = true;
        }
    }
    if !changed {
        return Ok(false);
    }

    atomic_write(&data_path, &updated)?;
    info!(
        "Synced endpoints of {}: {} -> {}",
        folder_name(folder),
        start.as_deref().unwrap_or("?"),
        end.as_deref().unwrap_or("?")
    );
    Ok(true)
}

/// One side's field value, or `None` (logged) when it cannot be resolved.
fn resolved(folder: &Path, side: &str, position: StorageResult<Position>) -> Option<String> {
    match position {
        Ok(position) => Some(position.to_field()),
        Err(e) => {
            warn!("Endpoint {} of {} left as is: {}", side, folder_name(folder), e);
            None
        }
    }
}

/// Writes each line's `L_id` into its start object's `następny.txt`.
/// Returns the number of pointers written or refreshed.
pub fn propagate_next_pointers(layout: &MapLayout) -> StorageResult<usize> {
    let mut written = 0;
    for folder in layout.line_folders()? {
        match next_pointer_for(layout, &folder) {
            Ok(true) => written += 1,
            Ok(false) => {}
            Err(e) => warn!("Next pointer failed for {}: {}", folder.display(), e),
        }
    }
    Ok(written)
}

fn next_pointer_for(layout: &MapLayout, folder: &Path) -> StorageResult<bool> {
    let Some(endpoints) = read_endpoints(folder)? else {
        return Ok(false);
    };
    let Some(id) = line_id(folder)? else {
        return Ok(false);
    };
    let target = object_folder_by_id(layout, &endpoints.a)?
        .ok_or_else(|| StorageError::NotFound(format!("object with id {}", endpoints.a)))?;

    let path = target.join(NEXT_FILE);
    if read_text_opt(&path)?.is_some_and(|current| current.trim() == id) {
        return Ok(false);
    }
    atomic_write(&path, &id)?;
    Ok(true)
}

/// Moves object folders that lack `mapa_dane.txt` into the trash folder.
pub fn quarantine_orphans(layout: &MapLayout) -> StorageResult<Vec<Quarantined>> {
    let mut moved = Vec::new();
    for folder in layout.object_folders()? {
        if folder.join(OBJECT_DATA_FILE).exists() {
            continue;
        }
        let trash = layout.trash_dir();
        if let Err(e) = fs::create_dir_all(&trash) {
            return Err(StorageError::io(&trash, e));
        }
        let to = free_trash_name(&trash, &folder_name(&folder));
        match fs::rename(&folder, &to) {
            Ok(()) => {
                info!("Moved orphan {} to {}", folder.display(), to.display());
                moved.push(Quarantined { from: folder, to });
            }
            Err(e) => warn!("Failed to quarantine {}: {}", folder.display(), e),
        }
    }
    Ok(moved)
}

/// `name`, `name - kopia`, `name - kopia 2`, ... whichever is free first.
fn free_trash_name(trash: &Path, name: &str) -> PathBuf {
    let plain = trash.join(name);
    if !plain.exists() {
        return plain;
    }
    let first = trash.join(format!("{name} - kopia"));
    if !first.exists() {
        return first;
    }
    (2..)
        .map(|n| trash.join(format!("{name} - kopia {n}")))
        .find(|candidate| !candidate.exists())
        .unwrap_or(first)
}

/// Reads `AB.txt` from a line folder, failing when it is absent.
pub fn line_endpoints(folder: &Path) -> StorageResult<Endpoints> {
    let path = folder.join(ENDPOINTS_FILE);
    let text = read_text(&path)?;
    Endpoints::parse(&text).map_err(|e| StorageError::record(&path, e))
}
