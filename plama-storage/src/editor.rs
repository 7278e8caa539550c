//! Writing a dragged position back to the record files.
//!
//! Coordinates are the only join key between the canvas and the files, so a
//! move looks up every source line near the entity's last known position and
//! rewrites the `xy=` field on each. Two entities closer than the tolerance
//! are indistinguishable here; callers that know an object's `id.txt` should
//! use [`PositionEditor::apply_move_by_id`] instead.

use crate::atomic::{atomic_write, read_text};
use crate::error::{StorageError, StorageResult};
use crate::ids::object_folder_by_id;
use crate::layout::object_data_file;
use crate::repository::{line_position, PositionMatch, Repository};
use plama_types::kv::{replace_pipe_field, upsert_key_line};
use plama_types::{classify, Position, RecordShape};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Rewrites positions in the files a [`Repository`] reads.
#[derive(Debug, Clone, Copy)]
pub struct PositionEditor<'a> {
    repo: &'a Repository,
}

impl<'a> PositionEditor<'a> {
    #[must_use]
    pub fn new(repo: &'a Repository) -> Self {
        Self { repo }
    }

    /// Moves whatever sits at `from` to `to`.
    ///
    /// Searches the hinted container first and falls back to every object
    /// folder when that finds nothing. Returns the number of files rewritten;
    /// zero means no source line was found and the move is not persisted.
    pub fn apply_move(
        &self,
        from: Position,
        to: Position,
        container_hint: Option<&str>,
    ) -> StorageResult<usize> {
        let mut matches = self.repo.find_by_position(from, container_hint);
        if matches.is_empty() && container_hint.is_some() {
            debug!("No match in hinted container, searching all objects");
            matches = self.repo.find_by_position(from, None);
        }
        if matches.is_empty() {
            warn!("No source line found at {}", from);
            return Ok(0);
        }

        let mut by_file: BTreeMap<PathBuf, Vec<usize>> = BTreeMap::new();
        for PositionMatch { file, line_no, .. } in matches {
            by_file.entry(file).or_default().push(line_no);
        }

        let mut updated = 0;
        for (file, line_nos) in by_file {
            match self.rewrite(&file, &line_nos, from, to) {
                Ok(true) => updated += 1,
                Ok(false) => debug!("{} changed before it could be rewritten", file.display()),
                Err(e) => warn!("Failed to rewrite {}: {}", file.display(), e),
            }
        }
        if updated > 0 {
            info!("Moved {} -> {} in {} file(s)", from, to, updated);
        }
        Ok(updated)
    }

    /// Re-reads `file` and replaces the `xy=` field on the given lines, as
    /// long as they still match `from`. Returns whether anything was written.
    fn rewrite(&self, file: &Path, line_nos: &[usize], from: Position, to: Position) -> StorageResult<bool> {
        let text = read_text(file)?;
        let value = to.to_field();
        let tolerance = self.repo.layout().match_tolerance;

        let mut lines: Vec<String> = text.split('\n').map(str::to_string).collect();
        let mut changed = false;
        for &line_no in line_nos {
            let Some(index) = line_no.checked_sub(1) else {
                continue;
            };
            let Some(line) = lines.get_mut(index) else {
                continue;
            };
            let (body, cr) = match line.strip_suffix('\r') {
                Some(body) => (body.to_string(), "\r"),
                None => (line.clone(), ""),
            };
            if !line_position(&body).is_some_and(|found| found.within(&from, tolerance)) {
                continue;
            }
            if let Some(replaced) = replace_pipe_field(&body, "xy", &value) {
                *line = format!("{replaced}{cr}");
                changed = true;
            }
        }

        if changed {
            atomic_write(file, &lines.join("\n"))?;
        }
        Ok(changed)
    }

    /// Moves the object whose `id.txt` equals `id`, bypassing the coordinate
    /// join. Returns `1` on success.
    pub fn apply_move_by_id(&self, id: &str, to: Position) -> StorageResult<usize> {
        let layout = self.repo.layout();
        let folder = object_folder_by_id(layout, id)?
            .ok_or_else(|| StorageError::NotFound(format!("object with id {id}")))?;
        let path = object_data_file(&folder);
        let text = read_text(&path)?;
        let value = to.to_field();

        let lines: Vec<&str> = text.lines().collect();
        let rewritten = match classify(&lines) {
            RecordShape::MultiLine => upsert_key_line(&text, "xy", &value),
            RecordShape::SingleLine => {
                let mut out: Vec<String> = lines.iter().map(|line| (*line).to_string()).collect();
                let first = out
                    .iter()
                    .position(|line| line_position(line).is_some())
                    .ok_or_else(|| {
                        StorageError::InvalidData(format!("{} has no xy field", path.display()))
                    })?;
                if let Some(replaced) = replace_pipe_field(&out[first], "xy", &value) {
                    out[first] = replaced;
                }
                let mut joined = out.join("\n");
                joined.push('\n');
                joined
            }
        };

        atomic_write(&path, &rewritten)?;
        info!("Moved object {} to {}", id, to);
        Ok(1)
    }
}
