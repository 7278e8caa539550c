//! Consolidated snapshot files read by the renderer.

use crate::atomic::{atomic_write, read_text_opt};
use crate::error::StorageResult;
use crate::repository::ObjectCache;
use plama_types::{
    parse_line_snapshot, parse_object_source, render_line_snapshot, render_object_snapshot,
    LineRecord, ObjectRecord,
};
use std::path::Path;
use tracing::warn;

/// Replaces `path` with one pipe-delimited row per object.
pub fn write_object_snapshot<'a, I>(path: &Path, records: I) -> StorageResult<()>
where
    I: IntoIterator<Item = &'a ObjectRecord>,
{
    atomic_write(path, &render_object_snapshot(records))
}

/// Replaces `path` with one pipe-delimited row per line.
pub fn write_line_snapshot<'a, I>(path: &Path, records: I) -> StorageResult<()>
where
    I: IntoIterator<Item = &'a LineRecord>,
{
    atomic_write(path, &render_line_snapshot(records))
}

/// Reads an object snapshot. A missing file is an empty snapshot.
pub fn read_object_snapshot(path: &Path) -> StorageResult<Vec<ObjectRecord>> {
    let Some(text) = read_text_opt(path)? else {
        return Ok(Vec::new());
    };
    let lines: Vec<&str> = text.lines().collect();
    Ok(parse_object_source(path, &lines, ""))
}

/// Reads a connections snapshot. A missing file is an empty snapshot.
pub fn read_line_snapshot(path: &Path) -> StorageResult<Vec<LineRecord>> {
    let Some(text) = read_text_opt(path)? else {
        return Ok(Vec::new());
    };
    let lines: Vec<&str> = text.lines().collect();
    Ok(parse_line_snapshot(path, &lines))
}

/// Resolves snapshot rows back to the cached records they were rendered from.
///
/// Each row picks the cached record within `tolerance` on both axes with the
/// smallest Manhattan distance; the first one wins a tie. Rows without a
/// match are dropped.
#[must_use]
pub fn join_display(rows: &[ObjectRecord], cache: &ObjectCache, tolerance: f64) -> Vec<ObjectRecord> {
    let mut joined = Vec::with_capacity(rows.len());
    for row in rows {
        let best = cache
            .iter()
            .filter(|record| record.position.within(&row.position, tolerance))
            .fold(None::<&ObjectRecord>, |best, record| match best {
                Some(current)
                    if current.position.manhattan(&row.position)
                        <= record.position.manhattan(&row.position) =>
                {
                    Some(current)
                }
                _ => Some(record),
            });
        match best {
            Some(record) => joined.push(record.clone()),
            None => warn!("No source record for snapshot row at {}", row.position),
        }
    }
    joined
}
