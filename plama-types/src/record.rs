//! Object and line records.

use crate::position::Position;
use crate::status::ProcessStatus;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Smallest scale an object may be drawn at.
pub const MIN_SIZE: f64 = 0.01;

/// Where a record was read from.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Provenance {
    /// Absolute path of the source file.
    pub file: PathBuf,
    /// 1-based line number; always `1` for multi-line records.
    pub line_no: usize,
    /// Name of the owning object or line folder. Empty for snapshot rows.
    pub container: String,
    /// Whether the record came from a multi-line `key=value` file.
    pub multi_line: bool,
    /// The raw text the record was parsed from.
    pub raw: String,
}

/// An icon-backed object on the map.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObjectRecord {
    pub position: Position,
    /// Icon reference (`ikona=`), possibly empty.
    pub icon: String,
    /// Scale (`rozmiar=`), always at least [`MIN_SIZE`].
    pub size: f64,
    pub status: ProcessStatus,
    pub source: Provenance,
}

/// Cache identity of an object record.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectKey {
    pub icon: String,
    pub size: String,
    pub status: ProcessStatus,
    pub file: PathBuf,
    pub line_no: usize,
    pub container: String,
}

impl ObjectRecord {
    /// Identity used to key the repository cache.
    #[must_use]
    pub fn key(&self) -> ObjectKey {
        ObjectKey {
            icon: self.icon.clone(),
            size: format_size(self.size),
            status: self.status.clone(),
            file: self.source.file.clone(),
            line_no: self.source.line_no,
            container: self.source.container.clone(),
        }
    }

    /// One pipe-delimited snapshot row, without the trailing newline.
    ///
    /// Fields are always emitted in `xy|ikona|rozmiar|proces` order with
    /// integer-rounded coordinates.
    #[must_use]
    pub fn to_snapshot_line(&self) -> String {
        format!(
            "xy={}|ikona={}|rozmiar={}|proces={}",
            self.position.to_field(),
            self.icon,
            format_size(self.size),
            self.status
        )
    }
}

/// A connection drawn between two points.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LineRecord {
    /// `xy1=`
    pub start: Position,
    /// `xy2=`
    pub end: Position,
    pub status: ProcessStatus,
    pub source: Provenance,
}

/// Cache identity of a line record.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LineKey {
    pub start: String,
    pub end: String,
    pub status: ProcessStatus,
    pub container: String,
    pub file: PathBuf,
}

impl LineRecord {
    /// Identity used to key the repository cache.
    #[must_use]
    pub fn key(&self) -> LineKey {
        LineKey {
            start: format!("{} {}", self.start.x, self.start.y),
            end: format!("{} {}", self.end.x, self.end.y),
            status: self.status.clone(),
            container: self.source.container.clone(),
            file: self.source.file.clone(),
        }
    }

    /// One pipe-delimited snapshot row, without the trailing newline.
    #[must_use]
    pub fn to_snapshot_line(&self) -> String {
        format!(
            "xy1={}|xy2={}|proces={}",
            self.start.to_field(),
            self.end.to_field(),
            self.status
        )
    }
}

/// Parses a `rozmiar=` value.
///
/// Accepts comma decimals (`1,5`). Absent or malformed values resolve to
/// `1`; the result is floor-clamped to [`MIN_SIZE`].
#[must_use]
pub fn parse_size(raw: Option<&str>) -> f64 {
    let size = raw
        .map(|value| value.trim().replace(',', "."))
        .and_then(|value| value.parse::<f64>().ok())
        .filter(|value| value.is_finite())
        .unwrap_or(1.0);
    size.max(MIN_SIZE)
}

/// Shortest textual form of a size: `1`, `1.5`, `0.01`.
#[must_use]
pub fn format_size(size: f64) -> String {
    format!("{size}")
}
