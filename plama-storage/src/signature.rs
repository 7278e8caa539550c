//! Cheap change detection over the record source files.

use crate::error::{StorageError, StorageResult};
use crate::layout::{line_data_files, object_data_file, MapLayout};
use std::collections::BTreeSet;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

/// One source file's fingerprint.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SourceStamp {
    pub path: PathBuf,
    pub modified: SystemTime,
    pub len: u64,
}

/// The set of `(path, mtime, size)` stamps over every source file that
/// currently exists. Two signatures are equal when their sets are equal.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SourceSignature(BTreeSet<SourceStamp>);

impl SourceSignature {
    /// Stamps every object `mapa_dane.txt` and every line `linia_dane*` file.
    ///
    /// Missing files are omitted. Any other IO error aborts the capture so the
    /// caller can keep its previous signature and retry on the next tick.
    pub fn capture(layout: &MapLayout) -> StorageResult<Self> {
        let mut stamps = BTreeSet::new();

        for folder in layout.object_folders()? {
            if let Some(stamp) = stamp(&object_data_file(&folder))? {
                stamps.insert(stamp);
            }
        }
        for folder in layout.line_folders()? {
            for path in line_data_files(&folder)? {
                if let Some(stamp) = stamp(&path)? {
                    stamps.insert(stamp);
                }
            }
        }

        Ok(Self(stamps))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &SourceStamp> {
        self.0.iter()
    }
}

fn stamp(path: &Path) -> StorageResult<Option<SourceStamp>> {
    let meta = match fs::metadata(path) {
        Ok(meta) => meta,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(StorageError::io(path, e)),
    };
    if !meta.is_file() {
        return Ok(None);
    }
    let modified = meta.modified().map_err(|e| StorageError::io(path, e))?;
    Ok(Some(SourceStamp {
        path: path.to_path_buf(),
        modified,
        len: meta.len(),
    }))
}
