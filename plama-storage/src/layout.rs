//! Where things live under a map root, and how folders are discovered.

use crate::error::{StorageError, StorageResult};
use plama_types::files::{
    LINE_DATA_PREFIX, LINE_SNAPSHOT_FILE, LINES_DIR, OBJECT_DATA_FILE, OBJECT_SNAPSHOT_FILE,
    OBJECTS_DIR, TRASH_DIR,
};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// Per-axis distance at which a stored coordinate still matches a query.
pub const DEFAULT_MATCH_TOLERANCE: f64 = 0.1;
/// Per-axis distance used when joining snapshot rows back to cached records.
pub const DEFAULT_DISPLAY_TOLERANCE: f64 = 0.51;

/// Configuration for one map root.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MapLayout {
    /// The folder holding `obiekty/`, `linie/` and the snapshots.
    pub root: PathBuf,
    /// Tolerance for [`Repository::find_by_position`](crate::Repository::find_by_position).
    pub match_tolerance: f64,
    /// Tolerance for [`join_display`](crate::join_display).
    pub display_tolerance: f64,
}

impl Default for MapLayout {
    fn default() -> Self {
        Self::new(".")
    }
}

impl MapLayout {
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            match_tolerance: DEFAULT_MATCH_TOLERANCE,
            display_tolerance: DEFAULT_DISPLAY_TOLERANCE,
        }
    }

    #[must_use]
    pub fn with_match_tolerance(mut self, tolerance: f64) -> Self {
        self.match_tolerance = tolerance;
        self
    }

    #[must_use]
    pub fn objects_dir(&self) -> PathBuf {
        self.root.join(OBJECTS_DIR)
    }

    #[must_use]
    pub fn lines_dir(&self) -> PathBuf {
        self.root.join(LINES_DIR)
    }

    #[must_use]
    pub fn trash_dir(&self) -> PathBuf {
        self.root.join(TRASH_DIR)
    }

    #[must_use]
    pub fn object_snapshot(&self) -> PathBuf {
        self.root.join(OBJECT_SNAPSHOT_FILE)
    }

    #[must_use]
    pub fn line_snapshot(&self) -> PathBuf {
        self.root.join(LINE_SNAPSHOT_FILE)
    }

    /// Object folders in sorted order. A missing `obiekty/` is empty.
    pub fn object_folders(&self) -> StorageResult<Vec<PathBuf>> {
        subdirectories(&self.objects_dir())
    }

    /// Line folders in sorted order. A missing `linie/` is empty.
    pub fn line_folders(&self) -> StorageResult<Vec<PathBuf>> {
        subdirectories(&self.lines_dir())
    }

    /// The object folder with the given name.
    #[must_use]
    pub fn object_folder(&self, name: &str) -> PathBuf {
        self.objects_dir().join(name)
    }
}

/// The canonical record file of an object folder.
#[must_use]
pub fn object_data_file(folder: &Path) -> PathBuf {
    folder.join(OBJECT_DATA_FILE)
}

/// Every `linia_dane*` file in a line folder, sorted by name.
pub fn line_data_files(folder: &Path) -> StorageResult<Vec<PathBuf>> {
    let mut files: Vec<PathBuf> = list_entries(folder)?
        .into_iter()
        .filter(|path| {
            path.is_file()
                && path
                    .file_name()
                    .is_some_and(|name| name.to_string_lossy().starts_with(LINE_DATA_PREFIX))
        })
        .collect();
    files.sort();
    Ok(files)
}

/// Name of a folder as used for provenance.
#[must_use]
pub fn folder_name(folder: &Path) -> String {
    folder
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default()
}

pub(crate) fn subdirectories(dir: &Path) -> StorageResult<Vec<PathBuf>> {
    let mut dirs: Vec<PathBuf> = list_entries(dir)?
        .into_iter()
        .filter(|path| path.is_dir())
        .collect();
    dirs.sort();
    Ok(dirs)
}

pub(crate) fn list_entries(dir: &Path) -> StorageResult<Vec<PathBuf>> {
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(StorageError::io(dir, e)),
    };
    entries
        .map(|entry| {
            entry
                .map(|entry| entry.path())
                .map_err(|e| StorageError::io(dir, e))
        })
        .collect()
}
