//! Creating a new line folder between two objects.

use crate::atomic::{atomic_write, read_text_opt};
use crate::error::{StorageError, StorageResult};
use crate::ids::object_folder_by_id;
use crate::layout::MapLayout;
use crate::maintenance::object_position;
use plama_types::files::{ENDPOINTS_FILE, LINE_DATA_FILE};
use plama_types::kv::replace_key_line_once;
use plama_types::Endpoints;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;
use walkdir::WalkDir;

/// Copies `template` to the first free `linie/linia N` and wires it between
/// the objects with ids `id_a` and `id_b`. Returns the new folder.
///
/// Both objects must exist and carry an `xy`; nothing is created otherwise.
pub fn create_connection(
    layout: &MapLayout,
    template: &Path,
    id_a: &str,
    id_b: &str,
) -> StorageResult<PathBuf> {
    if !template.is_dir() {
        return Err(StorageError::NotFound(format!(
            "template folder {}",
            template.display()
        )));
    }
    let start = resolve(layout, id_a)?;
    let end = resolve(layout, id_b)?;

    let lines_dir = layout.lines_dir();
    let target = (1..)
        .map(|n| lines_dir.join(format!("linia {n}")))
        .find(|candidate| !candidate.exists())
        .ok_or_else(|| StorageError::InvalidData("no free line folder name".into()))?;

    copy_tree(template, &target)?;

    let endpoints = Endpoints {
        a: id_a.trim().to_string(),
        b: id_b.trim().to_string(),
    };
    atomic_write(&target.join(ENDPOINTS_FILE), &endpoints.render())?;

    let data_path = target.join(LINE_DATA_FILE);
    let data = read_text_opt(&data_path)?.unwrap_or_default();
    let data = replace_key_line_once(&data, "xy1", &start);
    let data = replace_key_line_once(&data, "xy2", &end);
    atomic_write(&data_path, &data)?;

    info!(
        "Created connection {} between {} and {}",
        target.display(),
        endpoints.a,
        endpoints.b
    );
    Ok(target)
}

fn resolve(layout: &MapLayout, id: &str) -> StorageResult<String> {
    let folder = object_folder_by_id(layout, id)?
        .ok_or_else(|| StorageError::NotFound(format!("object with id {id}")))?;
    let position = object_position(&folder)?
        .ok_or_else(|| StorageError::InvalidData(format!("object {id} has no xy")))?;
    Ok(position.to_field())
}

fn copy_tree(from: &Path, to: &Path) -> StorageResult<()> {
    for entry in WalkDir::new(from) {
        let entry = entry.map_err(|e| {
            let path = e.path().unwrap_or(from).to_path_buf();
            StorageError::io(&path, e.into())
        })?;
        let relative = entry
            .path()
            .strip_prefix(from)
            .map_err(|e| StorageError::InvalidData(e.to_string()))?;
        let dest = to.join(relative);
        if entry.file_type().is_dir() {
            fs::create_dir_all(&dest).map_err(|e| StorageError::io(&dest, e))?;
        } else {
            fs::copy(entry.path(), &dest).map_err(|e| StorageError::io(&dest, e))?;
        }
    }
    Ok(())
}
