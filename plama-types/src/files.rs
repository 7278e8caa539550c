//! File and folder names shared by the map, the agents and the servers.
//!
//! These names are the on-disk protocol; unconverted peers depend on them.

/// Folder holding one subfolder per object.
pub const OBJECTS_DIR: &str = "obiekty";
/// Folder holding one subfolder per line.
pub const LINES_DIR: &str = "linie";
/// Where orphaned object folders are moved.
pub const TRASH_DIR: &str = "kosz";

/// Per-object record file.
pub const OBJECT_DATA_FILE: &str = "mapa_dane.txt";
/// Optional per-object folder of extra record files.
pub const OBJECT_DATA_DIR: &str = "mapa_dane";
/// Prefix of per-line record files (`linia_dane.txt`, `linia_dane_2`, ...).
pub const LINE_DATA_PREFIX: &str = "linia_dane";
/// The canonical per-line record file.
pub const LINE_DATA_FILE: &str = "linia_dane.txt";

/// Consolidated object snapshot read by the renderer.
pub const OBJECT_SNAPSHOT_FILE: &str = "obraz.txt";
/// Consolidated connections snapshot read by the renderer.
pub const LINE_SNAPSHOT_FILE: &str = "polaczenie.txt";

/// Stable object identity.
pub const OBJECT_ID_FILE: &str = "id.txt";
/// Stable line identity.
pub const LINE_ID_FILE: &str = "L_id.txt";
/// The two object ids a line connects.
pub const ENDPOINTS_FILE: &str = "AB.txt";
/// Chaining pointer: the id of the line to run after this object.
pub const NEXT_FILE: &str = "następny.txt";

/// Server readiness file.
pub const READY_FILE: &str = "gotowe.txt";
/// Marker that a server speaks the file-drop API instead of HTTP.
pub const FILE_API_MARKER: &str = "api.txt";
/// Agent settings.
pub const AGENT_CONFIG_FILE: &str = "konfiguracja.txt";
/// Agent instructions.
pub const INSTRUCTIONS_FILE: &str = "instrukcje.txt";
/// Request input.
pub const INPUT_FILE: &str = "wejście.txt";
/// Response output.
pub const OUTPUT_FILE: &str = "wyjście.txt";
/// Stateful-mode marker and payload on a line's target object.
pub const STATE_FILE: &str = "all.txt";

/// Agent log.
pub const AGENT_LOG_FILE: &str = "log.txt";
/// Line log.
pub const LINE_LOG_FILE: &str = "linia_log.txt";

/// Entry point launched when a container is chained to.
pub const ENTRY_SCRIPT: &str = "start.py";
