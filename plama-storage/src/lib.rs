//! File-backed storage for the PLAMA map.
//!
//! The map has no database: every object and line is a folder of small text
//! files that independent processes read and write. This crate provides
//! the storage side of that arrangement.
//!
//! # Architecture
//!
//! - Every write is an atomic temp-file-and-rename ([`atomic_write`])
//! - [`Repository`] owns immutable, wholesale-rebuilt caches of all records
//! - Snapshots (`obraz.txt`, `polaczenie.txt`) are pure projections of a cache
//! - [`MapWatcher`] rewrites the snapshots only when the source signature
//!   (paths, mtimes, sizes) changes, and holds refreshes back during a drag
//! - [`PositionEditor`] writes dragged coordinates back to the source lines
//! - [`maintenance`] sweeps assign ids, sync line endpoints and quarantine
//!   orphaned folders

mod atomic;
mod connections;
mod editor;
mod error;
mod ids;
mod layout;
pub mod maintenance;
mod repository;
mod signature;
mod snapshot;
mod watcher;

pub use atomic::{atomic_write, read_text, read_text_opt, StagedWrite};
pub use connections::create_connection;
pub use editor::PositionEditor;
pub use error::{StorageError, StorageResult};
pub use ids::{line_folder_by_id, line_id, object_folder_by_id, object_id};
pub use layout::{
    folder_name, line_data_files, object_data_file, MapLayout, DEFAULT_DISPLAY_TOLERANCE,
    DEFAULT_MATCH_TOLERANCE,
};
pub use repository::{Cache, LineCache, ObjectCache, PositionMatch, Repository};
pub use signature::{SourceSignature, SourceStamp};
pub use snapshot::{
    join_display, read_line_snapshot, read_object_snapshot, write_line_snapshot,
    write_object_snapshot,
};
pub use watcher::{MapWatcher, RefreshStats, TickOutcome, WatchConfig};
