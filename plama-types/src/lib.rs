//! Core type definitions for the PLAMA map.
//!
//! Every entity on the map (an icon-backed object or a connecting line) lives
//! on disk as a small `key=value` text file inside its own container folder.
//! This crate defines:
//! - Fixed-schema records for objects and lines, with provenance
//! - Positions and the tolerant coordinate parser
//! - The `proces=` status enum shown as an outline colour on the canvas
//! - The key=value codec (multi-line and pipe-delimited shapes)
//! - The file and folder names shared by every participant
//!
//! Parsing never fails on malformed numbers: coordinates fall back to `0`,
//! sizes to `1`. The only fallible parsers are the ones for identity-bearing
//! files such as `AB.txt`.

pub mod codec;
pub mod files;
pub mod kv;
mod position;
mod record;
mod status;

pub use codec::{
    classify, parse_line_snapshot, parse_line_source, parse_object_source, render_line_snapshot,
    render_object_snapshot, RecordShape,
};
pub use kv::{Endpoints, FieldMap};
pub use position::Position;
pub use record::{
    format_size, parse_size, LineKey, LineRecord, ObjectKey, ObjectRecord, Provenance, MIN_SIZE,
};
pub use status::ProcessStatus;

/// Result type alias using the crate's error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while reading identity-bearing files.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A required `key=value` field is absent or empty.
    #[error("missing field: {0}")]
    MissingField(&'static str),

    /// A field that must hold an integer does not.
    #[error("invalid number in {field}: {value:?}")]
    InvalidNumber { field: &'static str, value: String },
}
