#![allow(dead_code)]

use plama_sync::{HandshakeConfig, HandshakeResult, ProcessLauncher};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tempfile::TempDir;

/// A map root with `obiekty/` and `linie/` folders.
pub struct TestMap {
    pub dir: TempDir,
}

impl TestMap {
    pub fn new() -> Self {
        let dir = TempDir::new().unwrap();
        fs::create_dir_all(dir.path().join("obiekty")).unwrap();
        fs::create_dir_all(dir.path().join("linie")).unwrap();
        Self { dir }
    }

    pub fn root(&self) -> &Path {
        self.dir.path()
    }

    /// Creates `obiekty/<name>` with a record file and the given extra files.
    pub fn object(&self, name: &str, files: &[(&str, &str)]) -> PathBuf {
        let folder = self.root().join("obiekty").join(name);
        fs::create_dir_all(&folder).unwrap();
        fs::write(folder.join("mapa_dane.txt"), "xy=1 1\nproces=off\n").unwrap();
        for (file, body) in files {
            fs::write(folder.join(file), body).unwrap();
        }
        folder
    }

    /// Creates `linie/<name>` with a record file and the given extra files.
    pub fn line(&self, name: &str, files: &[(&str, &str)]) -> PathBuf {
        let folder = self.root().join("linie").join(name);
        fs::create_dir_all(&folder).unwrap();
        fs::write(folder.join("linia_dane.txt"), "xy1=0 0\nxy2=1 1\nproces=off\n").unwrap();
        for (file, body) in files {
            fs::write(folder.join(file), body).unwrap();
        }
        folder
    }
}

pub fn read(path: impl AsRef<Path>) -> String {
    fs::read_to_string(path).unwrap()
}

/// The `proces=` value of a record file.
pub fn status_of(record: impl AsRef<Path>) -> Option<String> {
    read(record)
        .lines()
        .find_map(|line| line.strip_prefix("proces=").map(str::to_string))
}

/// Short timings so real-clock tests finish quickly.
pub fn fast_config() -> HandshakeConfig {
    HandshakeConfig {
        readiness_timeout_ms: 2_000,
        poll_interval_ms: 10,
        request_timeout_ms: 5_000,
        retry_backoff_ms: 20,
        output_timeout_ms: 2_000,
        ..HandshakeConfig::default()
    }
}

/// Records launched scripts instead of starting them.
#[derive(Debug, Default)]
pub struct RecordingLauncher {
    pub launched: Mutex<Vec<PathBuf>>,
}

impl RecordingLauncher {
    pub fn launched(&self) -> Vec<PathBuf> {
        self.launched.lock().unwrap().clone()
    }
}

impl ProcessLauncher for RecordingLauncher {
    fn launch(&self, script: &Path) -> HandshakeResult<()> {
        self.launched.lock().unwrap().push(script.to_path_buf());
        Ok(())
    }
}
