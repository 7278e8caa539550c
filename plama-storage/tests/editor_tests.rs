mod common;

use common::TestMap;
use plama_storage::{PositionEditor, Repository, StorageError};
use plama_types::Position;
use pretty_assertions::assert_eq;
use std::fs;

#[test]
fn drag_rewrites_only_the_xy_line() {
    let map = TestMap::new();
    let path = map.object("agent", "xy=100 50\nikona=foo\nproces=on\n");
    let repo = Repository::new(map.layout.clone());

    let updated = PositionEditor::new(&repo)
        .apply_move(Position::new(100.0, 50.0), Position::new(120.0, 80.0), Some("agent"))
        .unwrap();

    assert_eq!(updated, 1);
    assert_eq!(map.read(&path), "xy=120 80\nikona=foo\nproces=on\n");
}

#[test]
fn pipe_lines_keep_their_other_fields() {
    let map = TestMap::new();
    let folder = map.layout.object_folder("multi");
    fs::create_dir_all(&folder).unwrap();
    let list = folder.join("lista.txt");
    fs::write(&list, "xy=1 1|ikona=a|proces=on\nxy=40 40|ikona=b\nnote\n").unwrap();
    let repo = Repository::new(map.layout.clone());

    let updated = PositionEditor::new(&repo)
        .apply_move(Position::new(40.05, 39.95), Position::new(41.6, 10.0), None)
        .unwrap();

    assert_eq!(updated, 1);
    assert_eq!(
        map.read(&list),
        "xy=1 1|ikona=a|proces=on\nxy=42 10|ikona=b\nnote\n"
    );
}

#[test]
fn wrong_hint_falls_back_to_every_folder() {
    let map = TestMap::new();
    let path = map.object("real", "xy=5 5\nikona=r");
    map.object("other", "xy=90 90\nikona=o");
    let repo = Repository::new(map.layout.clone());

    let updated = PositionEditor::new(&repo)
        .apply_move(Position::new(5.0, 5.0), Position::new(6.0, 6.0), Some("other"))
        .unwrap();

    assert_eq!(updated, 1);
    assert!(map.read(&path).starts_with("xy=6 6"));
}

#[test]
fn nothing_at_position_updates_nothing() {
    let map = TestMap::new();
    let path = map.object("a", "xy=5 5\nikona=a");
    let repo = Repository::new(map.layout.clone());

    let updated = PositionEditor::new(&repo)
        .apply_move(Position::new(200.0, 200.0), Position::new(1.0, 1.0), None)
        .unwrap();

    assert_eq!(updated, 0);
    assert_eq!(map.read(&path), "xy=5 5\nikona=a");
}

#[test]
fn overlapping_objects_both_move() {
    let map = TestMap::new();
    let a = map.object("a", "xy=10 10\nikona=a");
    let b = map.object("b", "xy=10.05 10\nikona=b");
    let repo = Repository::new(map.layout.clone());

    let updated = PositionEditor::new(&repo)
        .apply_move(Position::new(10.0, 10.0), Position::new(0.0, 0.0), None)
        .unwrap();

    assert_eq!(updated, 2);
    assert!(map.read(&a).starts_with("xy=0 0"));
    assert!(map.read(&b).starts_with("xy=0 0"));
}

// ── By id ───────────────────────────────────────────────────────

#[test]
fn move_by_id_targets_one_object_even_when_overlapping() {
    let map = TestMap::new();
    let a = map.object_with_id("a", "1", "xy=10 10\nikona=a\n");
    let b = map.object_with_id("b", "2", "xy=10 10\nikona=b\n");
    let repo = Repository::new(map.layout.clone());

    let updated = PositionEditor::new(&repo)
        .apply_move_by_id("2", Position::new(33.0, 44.0))
        .unwrap();

    assert_eq!(updated, 1);
    assert_eq!(map.read(&a), "xy=10 10\nikona=a\n");
    assert_eq!(map.read(&b), "xy=33 44\nikona=b\n");
}

#[test]
fn move_by_id_adds_missing_xy() {
    let map = TestMap::new();
    let path = map.object_with_id("a", "7", "ikona=a\nproces=off\n");
    let repo = Repository::new(map.layout.clone());

    PositionEditor::new(&repo)
        .apply_move_by_id("7", Position::new(1.0, 2.0))
        .unwrap();

    assert_eq!(map.read(&path), "ikona=a\nproces=off\nxy=1 2\n");
}

#[test]
fn move_by_unknown_id_is_not_found() {
    let map = TestMap::new();
    map.object_with_id("a", "1", "xy=1 1");
    let repo = Repository::new(map.layout.clone());

    let err = PositionEditor::new(&repo)
        .apply_move_by_id("99", Position::new(0.0, 0.0))
        .unwrap_err();
    assert!(matches!(err, StorageError::NotFound(_)));
}
