//! The in-memory view of every object and line on the map.
//!
//! [`Repository`] is the single owner of the caches. Each reload rescans the
//! folders and builds a fresh, immutable cache that replaces the previous one
//! wholesale; readers hold an `Arc` to whichever cache was current when they
//! asked, so a reload never changes a cache out from under them.

use crate::atomic::read_text;
use crate::layout::{folder_name, line_data_files, list_entries, object_data_file, MapLayout};
use plama_types::files::OBJECT_DATA_DIR;
use plama_types::kv::is_key_line;
use plama_types::{
    parse_line_source, parse_object_source, LineKey, LineRecord, ObjectKey, ObjectRecord, Position,
};
use std::collections::{BTreeSet, HashMap};
use std::hash::Hash;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, warn};

/// Records in discovery order plus a lookup by identity key.
#[derive(Debug, Clone)]
pub struct Cache<K, R> {
    records: Vec<R>,
    by_key: HashMap<K, usize>,
}

pub type ObjectCache = Cache<ObjectKey, ObjectRecord>;
pub type LineCache = Cache<LineKey, LineRecord>;

impl<K: Eq + Hash, R> Default for Cache<K, R> {
    fn default() -> Self {
        Self {
            records: Vec::new(),
            by_key: HashMap::new(),
        }
    }
}

impl<K: Eq + Hash, R> Cache<K, R> {
    fn from_records(records: Vec<R>, key: impl Fn(&R) -> K) -> Self {
        let by_key = records
            .iter()
            .enumerate()
            .map(|(index, record)| (key(record), index))
            .collect();
        Self { records, by_key }
    }

    #[must_use]
    pub fn get(&self, key: &K) -> Option<&R> {
        self.by_key.get(key).map(|&index| &self.records[index])
    }

    /// Every record, in the order folders and files were discovered.
    #[must_use]
    pub fn records(&self) -> &[R] {
        &self.records
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &R> {
        self.records.iter()
    }
}

/// A source line whose `xy=` field matched a position query.
#[derive(Debug, Clone, PartialEq)]
pub struct PositionMatch {
    pub file: PathBuf,
    /// 1-based.
    pub line_no: usize,
    /// The matched line as it was read.
    pub raw: String,
    /// Name of the object folder the file belongs to.
    pub container: String,
    /// The parsed coordinate on that line.
    pub position: Position,
}

/// Owner of the object and line caches for one map root.
#[derive(Debug)]
pub struct Repository {
    layout: MapLayout,
    objects: Arc<ObjectCache>,
    lines: Arc<LineCache>,
}

impl Repository {
    /// Creates a repository with empty caches. Call the reload methods to
    /// populate them.
    #[must_use]
    pub fn new(layout: MapLayout) -> Self {
        Self {
            layout,
            objects: Arc::default(),
            lines: Arc::default(),
        }
    }

    #[must_use]
    pub fn layout(&self) -> &MapLayout {
        &self.layout
    }

    /// The most recently loaded object cache.
    #[must_use]
    pub fn objects(&self) -> Arc<ObjectCache> {
        Arc::clone(&self.objects)
    }

    /// The most recently loaded line cache.
    #[must_use]
    pub fn lines(&self) -> Arc<LineCache> {
        Arc::clone(&self.lines)
    }

    /// Rescans every object folder's `mapa_dane.txt` and replaces the object
    /// cache. Unreadable files are logged and skipped.
    pub fn reload_objects(&mut self) -> Arc<ObjectCache> {
        let folders = match self.layout.object_folders() {
            Ok(folders) => folders,
            Err(e) => {
                warn!("Failed to list object folders: {}", e);
                Vec::new()
            }
        };

        let mut records = Vec::new();
        for folder in folders {
            let path = object_data_file(&folder);
            if !path.is_file() {
                continue;
            }
            let Some(text) = read_or_warn(&path) else {
                continue;
            };
            let lines: Vec<&str> = text.lines().collect();
            records.extend(parse_object_source(&path, &lines, &folder_name(&folder)));
        }

        debug!("Loaded {} object records", records.len());
        self.objects = Arc::new(Cache::from_records(records, ObjectRecord::key));
        self.objects()
    }

    /// Rescans every line folder's `linia_dane*` files and replaces the line
    /// cache. Unreadable files are logged and skipped.
    pub fn reload_lines(&mut self) -> Arc<LineCache> {
        let folders = match self.layout.line_folders() {
            Ok(folders) => folders,
            Err(e) => {
                warn!("Failed to list line folders: {}", e);
                Vec::new()
            }
        };

        let mut records = Vec::new();
        for folder in folders {
            let files = match line_data_files(&folder) {
                Ok(files) => files,
                Err(e) => {
                    warn!("Skipping line folder {}: {}", folder.display(), e);
                    continue;
                }
            };
            let container = folder_name(&folder);
            for path in files {
                let Some(text) = read_or_warn(&path) else {
                    continue;
                };
                let lines: Vec<&str> = text.lines().collect();
                records.push(parse_line_source(&path, &lines, &container));
            }
        }

        debug!("Loaded {} line records", records.len());
        self.lines = Arc::new(Cache::from_records(records, LineRecord::key));
        self.lines()
    }

    /// Finds every source line, in one object folder or in all of them, whose
    /// `xy=` lies within the match tolerance of `position` on both axes.
    ///
    /// Always reads from disk, never from the cache.
    #[must_use]
    pub fn find_by_position(
        &self,
        position: Position,
        container_hint: Option<&str>,
    ) -> Vec<PositionMatch> {
        let folders = match container_hint {
            Some(name) => vec![self.layout.object_folder(name)],
            None => match self.layout.object_folders() {
                Ok(folders) => folders,
                Err(e) => {
                    warn!("Failed to list object folders: {}", e);
                    return Vec::new();
                }
            },
        };

        let tolerance = self.layout.match_tolerance;
        let mut matches = Vec::new();
        for folder in folders {
            let container = folder_name(&folder);
            for file in candidate_files(&folder) {
                let Some(text) = read_or_warn(&file) else {
                    continue;
                };
                for (index, line) in text.lines().enumerate() {
                    let Some(found) = line_position(line) else {
                        continue;
                    };
                    if found.within(&position, tolerance) {
                        matches.push(PositionMatch {
                            file: file.clone(),
                            line_no: index + 1,
                            raw: line.to_string(),
                            container: container.clone(),
                            position: found,
                        });
                    }
                }
            }
        }
        matches
    }
}

/// The coordinate on a source line, when it carries an `xy=` field.
pub(crate) fn line_position(line: &str) -> Option<Position> {
    line.split('|')
        .find(|part| is_key_line(part, "xy"))
        .and_then(|part| part.split_once('='))
        .map(|(_, value)| Position::parse(value))
}

/// Files of an object folder that may carry coordinates: `mapa_dane.txt`,
/// the files of a `mapa_dane/` subfolder (`.txt` or no extension) and every
/// other `.txt` in the folder.
fn candidate_files(folder: &Path) -> BTreeSet<PathBuf> {
    let mut files = BTreeSet::new();
    let primary = object_data_file(folder);
    if primary.is_file() {
        files.insert(primary);
    }

    let extra_dir = folder.join(OBJECT_DATA_DIR);
    if extra_dir.is_dir() {
        match list_entries(&extra_dir) {
            Ok(entries) => files.extend(entries.into_iter().filter(|path| {
                path.is_file()
                    && path
                        .extension()
                        .is_none_or(|ext| ext.eq_ignore_ascii_case("txt"))
            })),
            Err(e) => warn!("Failed to list {}: {}", extra_dir.display(), e),
        }
    }

    match list_entries(folder) {
        Ok(entries) => files.extend(entries.into_iter().filter(|path| {
            path.is_file()
                && path
                    .extension()
                    .is_some_and(|ext| ext.eq_ignore_ascii_case("txt"))
        })),
        Err(e) => warn!("Failed to list {}: {}", folder.display(), e),
    }
    files
}

fn read_or_warn(path: &Path) -> Option<String> {
    match read_text(path) {
        Ok(text) => Some(text),
        Err(e) => {
            warn!("Skipping unreadable file {}: {}", path.display(), e);
            None
        }
    }
}
