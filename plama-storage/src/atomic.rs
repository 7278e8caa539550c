//! Atomic file replacement.
//!
//! Every write this workspace performs goes through here. Content is written
//! to a sibling temp file in the target's directory and then renamed over the
//! target, so a concurrent reader sees either the old or the new content and
//! never a truncated file.

use crate::error::{StorageError, StorageResult};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

/// Writes `text` to `path` atomically, creating parent directories.
pub fn atomic_write(path: &Path, text: &str) -> StorageResult<()> {
    StagedWrite::stage(path, text)?.commit()
}

/// Reads a text file, replacing invalid UTF-8 instead of failing.
pub fn read_text(path: &Path) -> StorageResult<String> {
    let bytes = fs::read(path).map_err(|e| StorageError::io(path, e))?;
    Ok(match String::from_utf8(bytes) {
        Ok(text) => text,
        Err(e) => String::from_utf8_lossy(e.as_bytes()).into_owned(),
    })
}

/// Reads a text file, treating a missing file as `None`.
pub fn read_text_opt(path: &Path) -> StorageResult<Option<String>> {
    match read_text(path) {
        Ok(text) => Ok(Some(text)),
        Err(e) if e.is_not_found() => Ok(None),
        Err(e) => Err(e),
    }
}

/// A write whose content is on disk in a temp file but not yet visible at
/// the target path.
///
/// Dropping it without calling [`commit`](Self::commit) removes the temp file
/// and leaves the target untouched.
#[derive(Debug)]
pub struct StagedWrite {
    temp: NamedTempFile,
    target: PathBuf,
}

impl StagedWrite {
    /// Writes `text` into a temp file next to `path`.
    pub fn stage(path: &Path, text: &str) -> StorageResult<Self> {
        let dir = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        fs::create_dir_all(dir).map_err(|e| StorageError::io(dir, e))?;

        let mut temp = NamedTempFile::new_in(dir).map_err(|e| StorageError::io(dir, e))?;
        temp.write_all(text.as_bytes())
            .and_then(|()| temp.as_file().sync_all())
            .map_err(|e| StorageError::io(temp.path(), e))?;

        Ok(Self {
            temp,
            target: path.to_path_buf(),
        })
    }

    /// Path of the staged temp file.
    #[must_use]
    pub fn temp_path(&self) -> &Path {
        self.temp.path()
    }

    /// Renames the temp file over the target.
    pub fn commit(self) -> StorageResult<()> {
        let target = self.target;
        self.temp
            .persist(&target)
            .map_err(|e| StorageError::io(&target, e.error))?;
        Ok(())
    }
}
