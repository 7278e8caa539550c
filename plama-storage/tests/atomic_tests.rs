use plama_storage::{atomic_write, StagedWrite};
use std::fs;
use tempfile::TempDir;

#[test]
fn replaces_existing_content() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("obraz.txt");
    fs::write(&path, "old\n").unwrap();

    atomic_write(&path, "new\n").unwrap();
    assert_eq!(fs::read_to_string(&path).unwrap(), "new\n");
}

#[test]
fn crash_between_stage_and_rename_keeps_original() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("mapa_dane.txt");
    fs::write(&path, "xy=1 2\nikona=a\n").unwrap();

    let staged = StagedWrite::stage(&path, "xy=9 9\n").unwrap();
    let temp = staged.temp_path().to_path_buf();
    assert!(temp.exists());
    assert_eq!(fs::read_to_string(&path).unwrap(), "xy=1 2\nikona=a\n");

    // The process dies before the rename.
    drop(staged);

    assert_eq!(fs::read_to_string(&path).unwrap(), "xy=1 2\nikona=a\n");
    assert!(!temp.exists());
    let leftovers: Vec<_> = fs::read_dir(dir.path()).unwrap().collect();
    assert_eq!(leftovers.len(), 1);
}

#[test]
fn no_temp_files_left_after_commit() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("a.txt");
    for i in 0..5 {
        atomic_write(&path, &format!("{i}\n")).unwrap();
    }
    let names: Vec<String> = fs::read_dir(dir.path())
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    assert_eq!(names, vec!["a.txt"]);
    assert_eq!(fs::read_to_string(&path).unwrap(), "4\n");
}
