//! End-to-end tests that drive the `swd` binary.

use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};
use tempfile::TempDir;

// ============================================================================
// Helpers
// ============================================================================

fn swd_bin() -> PathBuf {
    PathBuf::from(env!("CARGO_BIN_EXE_swd"))
}

fn run(args: &[&str], dir: &Path) -> Output {
    Command::new(swd_bin())
        .args(args)
        .current_dir(dir)
        .output()
        .unwrap()
}

fn sample() -> Vec<u8> {
    let mut data = Vec::new();
    for i in 0..12_000u32 {
        data.push(if i % 300 < 200 { b"tile"[(i % 4) as usize] } else { (i * 7) as u8 });
    }
    data
}

fn setup(name: &str, content: &[u8]) -> TempDir {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join(name), content).unwrap();
    dir
}

// ============================================================================
// Round trips
// ============================================================================

#[test]
fn test_shrink_then_expand_next_to_input() {
    let data = sample();
    let dir = setup("level.map", &data);

    let out = run(&["shrink", "-b", "level.map"], dir.path());
    assert!(out.status.success());
    let stdout = String::from_utf8_lossy(&out.stdout);
    assert!(stdout.contains("Shrinking \"level.map\""));
    assert!(stdout.contains("operation complete"));

    let packed = fs::read(dir.path().join("level.swd")).unwrap();
    assert_eq!(&packed[..4], b"sWd\xB0");

    fs::remove_file(dir.path().join("level.map")).unwrap();
    let out = run(&["expand", "level.swd"], dir.path());
    assert!(out.status.success());
    assert_eq!(fs::read(dir.path().join("level.map")).unwrap(), data);
}

#[test]
fn test_subdirectories() {
    let data = sample();
    let dir = setup("sprites.chr", &data);

    let out = run(&["shrink", "-d", "-g", "--parallel", "-b", "sprites.chr"], dir.path());
    assert!(out.status.success());
    let packed = dir.path().join("SWD").join("sprites.chr");
    assert_eq!(&fs::read(&packed).unwrap()[..4], b"sWd\xD0");

    let out = run(&["expand", "-d", "SWD/sprites.chr"], dir.path());
    assert!(out.status.success());
    let restored = dir.path().join("SWD").join("ORG").join("sprites.chr");
    assert_eq!(fs::read(restored).unwrap(), data);
}

#[test]
fn test_auto_picks_direction() {
    let data = sample();
    let dir = setup("music.bin", &data);

    assert!(run(&["auto", "music.bin"], dir.path()).status.success());
    fs::remove_file(dir.path().join("music.bin")).unwrap();

    let out = run(&["auto", "music.swd"], dir.path());
    assert!(out.status.success());
    assert!(String::from_utf8_lossy(&out.stdout).contains("Expanding \"music.swd\""));
    assert_eq!(fs::read(dir.path().join("music.bin")).unwrap(), data);
}

#[test]
fn test_test_and_info() {
    let dir = setup("a.txt", &sample());
    assert!(run(&["shrink", "-b", "--block-size", "2k", "a.txt"], dir.path()).status.success());

    let out = run(&["test", "a.swd"], dir.path());
    assert!(out.status.success());
    assert!(String::from_utf8_lossy(&out.stdout).contains("All files OK"));

    let out = run(&["info", "--json", "a.swd"], dir.path());
    assert!(out.status.success());
    let stdout = String::from_utf8_lossy(&out.stdout);
    assert!(stdout.contains("\"block_size\": 2048"));
    assert!(stdout.contains("\"extension\": \"txt\""));
}

// ============================================================================
// Failures
// ============================================================================

#[test]
fn test_failed_output_is_removed() {
    let dir = setup("broken.dat", &sample());
    assert!(run(&["shrink", "broken.dat"], dir.path()).status.success());

    let swd = dir.path().join("broken.swd");
    let packed = fs::read(&swd).unwrap();
    fs::write(&swd, &packed[..15]).unwrap();
    fs::remove_file(dir.path().join("broken.dat")).unwrap();

    let out = run(&["expand", "broken.swd"], dir.path());
    assert_eq!(out.status.code(), Some(1));
    assert!(!dir.path().join("broken.dat").exists());
}

#[test]
fn test_refuses_to_overwrite_input() {
    let dir = setup("notes.swd", b"plain text, not a container");
    let out = run(&["shrink", "notes.swd"], dir.path());
    assert_eq!(out.status.code(), Some(1));
    assert!(String::from_utf8_lossy(&out.stderr).contains("Can't overwrite the input file"));
    assert_eq!(
        fs::read(dir.path().join("notes.swd")).unwrap(),
        b"plain text, not a container"
    );
}

#[test]
fn test_keep_going_past_missing_files() {
    let dir = setup("one.bin", &sample());

    let out = run(&["shrink", "missing.bin", "one.bin"], dir.path());
    assert_eq!(out.status.code(), Some(1));
    assert!(!dir.path().join("one.swd").exists());

    let out = run(&["shrink", "-k", "missing.bin", "one.bin"], dir.path());
    assert_eq!(out.status.code(), Some(1));
    assert!(String::from_utf8_lossy(&out.stderr).contains("File not found"));
    assert!(dir.path().join("one.swd").exists());
}

#[test]
fn test_header_extension_stays_in_file_name() {
    let data = sample();
    let dir = setup("evil.bin", &data);
    assert!(run(&["shrink", "evil.bin"], dir.path()).status.success());
    fs::remove_file(dir.path().join("evil.bin")).unwrap();

    let swd = dir.path().join("evil.swd");
    let mut packed = fs::read(&swd).unwrap();
    packed[4..8].copy_from_slice(b"a/b\0");
    fs::write(&swd, &packed).unwrap();

    let out = run(&["expand", "evil.swd"], dir.path());
    assert!(out.status.success());
    assert!(!dir.path().join("evil.a").exists());
    assert_eq!(fs::read(dir.path().join("evil.a_b")).unwrap(), data);
}

#[test]
fn test_expand_rejects_plain_files() {
    let dir = setup("plain.swd", b"hello");
    let out = run(&["expand", "plain.swd"], dir.path());
    assert_eq!(out.status.code(), Some(1));
    assert!(String::from_utf8_lossy(&out.stderr).contains("not in SWD format"));
}
