//! Stable identities: `id.txt` for objects, `L_id.txt` for lines.

use crate::atomic::read_text_opt;
use crate::error::StorageResult;
use crate::layout::MapLayout;
use plama_types::files::{LINE_ID_FILE, OBJECT_ID_FILE};
use std::path::{Path, PathBuf};

/// The trimmed content of `id.txt`, if present and non-empty.
pub fn object_id(folder: &Path) -> StorageResult<Option<String>> {
    read_id(&folder.join(OBJECT_ID_FILE))
}

/// The trimmed content of `L_id.txt`, if present and non-empty.
pub fn line_id(folder: &Path) -> StorageResult<Option<String>> {
    read_id(&folder.join(LINE_ID_FILE))
}

fn read_id(path: &Path) -> StorageResult<Option<String>> {
    Ok(read_text_opt(path)?
        .map(|text| text.trim().to_string())
        .filter(|id| !id.is_empty()))
}

/// The first object folder, in sorted order, whose `id.txt` equals `id`.
pub fn object_folder_by_id(layout: &MapLayout, id: &str) -> StorageResult<Option<PathBuf>> {
    let id = id.trim();
    for folder in layout.object_folders()? {
        if object_id(&folder)?.as_deref() == Some(id) {
            return Ok(Some(folder));
        }
    }
    Ok(None)
}

/// The first line folder, in sorted order, whose `L_id.txt` equals `id`.
pub fn line_folder_by_id(layout: &MapLayout, id: &str) -> StorageResult<Option<PathBuf>> {
    let id = id.trim();
    for folder in layout.line_folders()? {
        if line_id(&folder)?.as_deref() == Some(id) {
            return Ok(Some(folder));
        }
    }
    Ok(None)
}
