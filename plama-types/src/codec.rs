//! Parsing source files into records and rendering snapshot rows.

use crate::files::OBJECT_SNAPSHOT_FILE;
use crate::kv::FieldMap;
use crate::position::Position;
use crate::record::{parse_size, LineRecord, ObjectRecord, Provenance};
use crate::status::ProcessStatus;
use std::path::Path;

/// How the lines of a source file map onto records.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordShape {
    /// The whole file is one record, one `key=value` per line.
    MultiLine,
    /// Every non-blank line is an independent pipe-delimited record.
    SingleLine,
}

/// Decides the shape of a non-snapshot source file.
///
/// Multi-line when there is more than one non-blank line and all of them
/// contain `=`, or when the single non-blank line does not start with `xy=`.
/// A lone line such as `ikona=foo|xy=1 2` is therefore read as multi-line;
/// this mirrors how existing files on disk have always been read.
#[must_use]
pub fn classify(lines: &[&str]) -> RecordShape {
    let content: Vec<&str> = lines
        .iter()
        .copied()
        .filter(|line| !line.trim().is_empty())
        .collect();
    let multi = match content.as_slice() {
        [] => false,
        [only] => !only.trim().to_lowercase().starts_with("xy="),
        many => many.iter().all(|line| line.contains('=')),
    };
    if multi {
        RecordShape::MultiLine
    } else {
        RecordShape::SingleLine
    }
}

fn is_object_snapshot(path: &Path) -> bool {
    path.file_name()
        .map(|name| name.to_string_lossy().to_lowercase() == OBJECT_SNAPSHOT_FILE)
        .unwrap_or(false)
}

fn object_from_fields(fields: &FieldMap, source: Provenance) -> ObjectRecord {
    ObjectRecord {
        position: Position::parse(fields.get("xy").unwrap_or("0 0")),
        icon: fields.get("ikona").unwrap_or_default().to_string(),
        size: parse_size(fields.get("rozmiar")),
        status: ProcessStatus::parse(fields.get("proces").unwrap_or_default()),
        source,
    }
}

/// Parses an object source file into records.
///
/// The consolidated snapshot (`obraz.txt`) is always read one record per
/// line. Any other file is classified with [`classify`]. A record is produced
/// for every non-blank line (single-line shape) or once for the whole file
/// (multi-line shape); malformed numbers never drop a record.
#[must_use]
pub fn parse_object_source(path: &Path, lines: &[&str], container: &str) -> Vec<ObjectRecord> {
    let shape = if is_object_snapshot(path) {
        RecordShape::SingleLine
    } else {
        classify(lines)
    };

    match shape {
        RecordShape::MultiLine => {
            let fields = FieldMap::from_lines(lines.iter().copied());
            let source = Provenance {
                file: path.to_path_buf(),
                line_no: 1,
                container: container.to_string(),
                multi_line: true,
                raw: lines.join("\n"),
            };
            vec![object_from_fields(&fields, source)]
        }
        RecordShape::SingleLine => lines
            .iter()
            .enumerate()
            .filter(|(_, raw)| !raw.trim().is_empty())
            .map(|(index, raw)| {
                let fields = FieldMap::from_pipe_line(raw.trim());
                let source = Provenance {
                    file: path.to_path_buf(),
                    line_no: index + 1,
                    container: container.to_string(),
                    multi_line: false,
                    raw: (*raw).to_string(),
                };
                object_from_fields(&fields, source)
            })
            .collect(),
    }
}

fn line_from_fields(fields: &FieldMap, source: Provenance) -> LineRecord {
    LineRecord {
        start: Position::parse(fields.get("xy1").unwrap_or_default()),
        end: Position::parse(fields.get("xy2").unwrap_or_default()),
        status: ProcessStatus::parse(fields.get("proces").unwrap_or_default()),
        source,
    }
}

/// Parses a `linia_dane*` file. Line sources are always one multi-line
/// record per file.
#[must_use]
pub fn parse_line_source(path: &Path, lines: &[&str], container: &str) -> LineRecord {
    let fields = FieldMap::from_lines(lines.iter().copied());
    let source = Provenance {
        file: path.to_path_buf(),
        line_no: 1,
        container: container.to_string(),
        multi_line: true,
        raw: lines.join("\n"),
    };
    line_from_fields(&fields, source)
}

/// Parses the consolidated connections snapshot, one line per record.
#[must_use]
pub fn parse_line_snapshot(path: &Path, lines: &[&str]) -> Vec<LineRecord> {
    lines
        .iter()
        .enumerate()
        .filter(|(_, raw)| !raw.trim().is_empty())
        .map(|(index, raw)| {
            let fields = FieldMap::from_pipe_line(raw.trim());
            let source = Provenance {
                file: path.to_path_buf(),
                line_no: index + 1,
                container: String::new(),
                multi_line: false,
                raw: (*raw).to_string(),
            };
            line_from_fields(&fields, source)
        })
        .collect()
}

/// Renders object records as snapshot text, one newline-terminated row each.
#[must_use]
pub fn render_object_snapshot<'a, I>(records: I) -> String
where
    I: IntoIterator<Item = &'a ObjectRecord>,
{
    let mut out = String::new();
    for record in records {
        out.push_str(&record.to_snapshot_line());
        out.push('\n');
    }
    out
}

/// Renders line records as snapshot text, one newline-terminated row each.
#[must_use]
pub fn render_line_snapshot<'a, I>(records: I) -> String
where
    I: IntoIterator<Item = &'a LineRecord>,
{
    let mut out = String::new();
    for record in records {
        out.push_str(&record.to_snapshot_line());
        out.push('\n');
    }
    out
}
