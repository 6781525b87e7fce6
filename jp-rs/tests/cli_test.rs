//! CLI integration tests over synthetic BSD and TSP files

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use std::path::PathBuf;
use tempfile::TempDir;

fn push_i16(data: &mut Vec<u8>, v: i16) {
    data.extend_from_slice(&v.to_le_bytes());
}

fn push_i32(data: &mut Vec<u8>, v: i32) {
    data.extend_from_slice(&v.to_le_bytes());
}

fn push_vertex(data: &mut Vec<u8>, x: i16, y: i16, z: i16) {
    for v in [x, y, z, 0] {
        push_i16(data, v);
    }
}

/// A level with one empty node and a single collision triangle at y = -30
fn level_bytes() -> Vec<u8> {
    let mut data = Vec::new();
    push_i16(&mut data, 1);
    push_i16(&mut data, 2);
    for (count, offset) in [(1, 52), (0, 88), (0, 88), (0, 88), (0, 88), (1, 88)] {
        push_i32(&mut data, count);
        push_i32(&mut data, offset);
    }

    for v in [-100i16, -100, -100, 100, 100, 100] {
        push_i16(&mut data, v);
    }
    for _ in 0..3 {
        push_i32(&mut data, -1);
    }
    data.extend_from_slice(&[0; 12]);

    for v in [-100i16, -100, 100, 100, 1, 1, 3, 1, 1] {
        push_i16(&mut data, v);
    }
    for v in [!1i16, 0, 0, 42, 0, 0] {
        push_i16(&mut data, v);
    }
    push_vertex(&mut data, -90, -30, -90);
    push_vertex(&mut data, 90, -30, -90);
    push_vertex(&mut data, 0, -30, 90);
    push_vertex(&mut data, 0, -100, 0);
    for v in [0i16, 1, 2, 0, 0] {
        push_i16(&mut data, v);
    }
    data
}

/// A descriptor holding only the world object
fn scene_bytes() -> Vec<u8> {
    const RECORD: usize = 2524;
    let mut data = vec![0u8; RECORD];
    data[2520..2524].copy_from_slice(&1i32.to_le_bytes());

    let mut record = Vec::new();
    push_i32(&mut record, 0);
    for field in 1..15 {
        // The level starts right after the record
        push_i32(&mut record, if field == 3 { 2600 } else { -1 });
    }
    record.resize(0x7C8, 0);
    record.extend_from_slice(b"WORLD.TSP");
    record.resize(2124, 0);
    data.extend(record);

    // Section table, inside the record's reserved bytes
    for (i, base) in [2600, 0, 0, 0, 0, 0, 0, 0, 0, 0].into_iter().enumerate() {
        let at = 3388 + i * 8;
        data[at..at + 4].copy_from_slice(&i32::to_le_bytes(base));
    }

    data.extend(level_bytes());
    data
}

fn write_fixture(dir: &TempDir, name: &str, bytes: &[u8]) -> PathBuf {
    let path = dir.path().join(name);
    fs::write(&path, bytes).unwrap();
    path
}

fn jp_rs() -> Command {
    Command::cargo_bin("jp-rs").unwrap()
}

#[test]
fn test_tsp_info() {
    let dir = TempDir::new().unwrap();
    let path = write_fixture(&dir, "level.tsp", &level_bytes());

    jp_rs()
        .args(["tsp", "info"])
        .arg(&path)
        .assert()
        .success()
        .stdout(predicate::str::contains("TSP Level Information"))
        .stdout(predicate::str::contains("Nodes: 1"))
        .stdout(predicate::str::contains("KD Nodes: 1"));
}

#[test]
fn test_tsp_height() {
    let dir = TempDir::new().unwrap();
    let path = write_fixture(&dir, "level.tsp", &level_bytes());

    jp_rs()
        .args(["tsp", "height"])
        .arg(&path)
        .args(["0", "0"])
        .assert()
        .success()
        .stdout(predicate::str::contains("-30"))
        .stdout(predicate::str::contains("property set 42"));

    jp_rs()
        .args(["tsp", "height"])
        .arg(&path)
        .args(["500", "-500"])
        .assert()
        .success()
        .stdout(predicate::str::contains("no floor"));
}

#[test]
fn test_bsd_info_and_list() {
    let dir = TempDir::new().unwrap();
    let path = write_fixture(&dir, "scene.bsd", &scene_bytes());

    jp_rs()
        .args(["bsd", "info"])
        .arg(&path)
        .assert()
        .success()
        .stdout(predicate::str::contains("Render Objects: 1"))
        .stdout(predicate::str::contains("World Level: 2600"));

    jp_rs()
        .args(["bsd", "list"])
        .arg(&path)
        .assert()
        .success()
        .stdout(predicate::str::contains("WORLD.TSP"))
        .stdout(predicate::str::contains("world"));
}

#[test]
fn test_bsd_tree() {
    let dir = TempDir::new().unwrap();
    let path = write_fixture(&dir, "scene.bsd", &scene_bytes());

    jp_rs()
        .args(["bsd", "tree", "--no-color"])
        .arg(&path)
        .assert()
        .success()
        .stdout(predicate::str::contains("scene.bsd"))
        .stdout(predicate::str::contains("Object 0"))
        .stdout(predicate::str::contains("Collision"))
        .stdout(predicate::str::contains("WORLD.TSP"));
}

#[test]
fn test_bsd_pose_unknown_object() {
    let dir = TempDir::new().unwrap();
    let path = write_fixture(&dir, "scene.bsd", &scene_bytes());

    jp_rs()
        .args(["bsd", "pose", "--id", "9"])
        .arg(&path)
        .assert()
        .failure()
        .stderr(predicate::str::contains("No render object with id 9"));

    jp_rs()
        .args(["bsd", "pose", "--id", "0"])
        .arg(&path)
        .assert()
        .success()
        .stdout(predicate::str::contains("not animated"));
}

#[test]
fn test_bsd_wrong_layout_fails() {
    let dir = TempDir::new().unwrap();
    let path = write_fixture(&dir, "scene.bsd", &scene_bytes());

    jp_rs()
        .args(["bsd", "info", "--layout", "extended"])
        .arg(&path)
        .assert()
        .failure()
        .stderr(predicate::str::contains("Failed to read BSD catalog"));
}

#[test]
fn test_missing_file() {
    jp_rs()
        .args(["tsp", "info", "/nonexistent/level.tsp"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Failed to open file"));
}

#[test]
fn test_completions() {
    jp_rs()
        .args(["completions", "bash"])
        .assert()
        .success()
        .stdout(predicate::str::contains("jp-rs"));
}
