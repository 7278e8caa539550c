#![allow(dead_code)]

use plama_storage::MapLayout;
use std::fs;
use std::path::PathBuf;
use tempfile::TempDir;

pub struct TestMap {
    pub dir: TempDir,
    pub layout: MapLayout,
}

impl TestMap {
    pub fn new() -> Self {
        let dir = TempDir::new().unwrap();
        let layout = MapLayout::new(dir.path());
        Self { dir, layout }
    }

    /// Creates `obiekty/<name>/mapa_dane.txt` with the given body.
    pub fn object(&self, name: &str, body: &str) -> PathBuf {
        let folder = self.layout.object_folder(name);
        fs::create_dir_all(&folder).unwrap();
        let path = folder.join("mapa_dane.txt");
        fs::write(&path, body).unwrap();
        path
    }

    /// Creates an object folder with an `id.txt`.
    pub fn object_with_id(&self, name: &str, id: &str, body: &str) -> PathBuf {
        let path = self.object(name, body);
        fs::write(self.layout.object_folder(name).join("id.txt"), id).unwrap();
        path
    }

    /// Creates `linie/<name>/<file>` with the given body.
    pub fn line_file(&self, name: &str, file: &str, body: &str) -> PathBuf {
        let folder = self.layout.lines_dir().join(name);
        fs::create_dir_all(&folder).unwrap();
        let path = folder.join(file);
        fs::write(&path, body).unwrap();
        path
    }

    pub fn read(&self, path: impl AsRef<std::path::Path>) -> String {
        fs::read_to_string(path).unwrap()
    }
}
