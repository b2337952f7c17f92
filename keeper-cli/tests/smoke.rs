use assert_cmd::prelude::*;
use assert_fs::prelude::*;
use predicates::prelude::*;
use rand::{rngs::StdRng, Rng, SeedableRng};
use std::process::Command;

fn write_random(path: &std::path::Path, bytes: usize, seed: u64) {
    let mut rng = StdRng::seed_from_u64(seed);
    let data: Vec<u8> = (0..bytes).map(|_| rng.gen()).collect();
    std::fs::write(path, data).unwrap();
}

#[test]
fn record_check_detect_corruption() {
    let td = assert_fs::TempDir::new().unwrap();
    let data = td.child("data");
    data.create_dir_all().unwrap();
    write_random(data.child("a.bin").path(), 64 * 1024, 1);
    write_random(data.child("b.bin").path(), 64 * 1024, 2);
    write_random(data.child("c.bin").path(), 3, 3);

    Command::cargo_bin("keeper")
        .unwrap()
        .current_dir(td.path())
        .args(["record", "data", "data/files.sfv"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Recorded 3 files"));

    data.child("files.sfv").assert(predicate::str::starts_with("; Generated by keeper\n;\na.bin "));

    Command::cargo_bin("keeper")
        .unwrap()
        .current_dir(td.path())
        .args(["check", "data/files.sfv"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Success! No errors."));

    // Corrupt one file, delete another.
    {
        use std::io::{Seek, SeekFrom, Write};
        let mut f = std::fs::OpenOptions::new()
            .read(true)
            .write(true)
            .open(data.child("b.bin").path())
            .unwrap();
        f.seek(SeekFrom::Start(8 * 1024)).unwrap();
        f.write_all(&[0xFFu8; 4096]).unwrap();
    }
    std::fs::remove_file(data.child("c.bin").path()).unwrap();

    Command::cargo_bin("keeper")
        .unwrap()
        .current_dir(td.path())
        .args(["check", "data/files.sfv", "--parallel"])
        .assert()
        .code(1)
        .stdout(predicate::str::contains("Summary: 2 errors"))
        .stderr(predicate::str::contains("checksum mismatch: b.bin expected="))
        .stderr(predicate::str::contains("file missing: c.bin"));
}

#[test]
fn json_report_is_parseable() {
    let td = assert_fs::TempDir::new().unwrap();
    td.child("x").write_binary(b"Hello World!\n").unwrap();
    td.child("m.sfv").write_str("; Generated by keeper\n;\nx 7D14DDDD\nbroken\n").unwrap();

    let out = Command::cargo_bin("keeper")
        .unwrap()
        .args(["check", td.child("m.sfv").path().to_str().unwrap(), "--json"])
        .output()
        .unwrap();
    assert_eq!(out.status.code(), Some(1));
    let v: serde_json::Value = serde_json::from_slice(&out.stdout).unwrap();
    assert_eq!(v["outcomes"][0]["path"], "x");
    assert_eq!(v["outcomes"][0]["outcome"]["status"], "match");
    assert_eq!(v["format_errors"][0]["line"], "broken");
}

#[test]
fn extra_flag_reports_new_files() {
    let td = assert_fs::TempDir::new().unwrap();
    td.child("a").write_str("a").unwrap();
    Command::cargo_bin("keeper")
        .unwrap()
        .current_dir(td.path())
        .args(["record", ".", "all.sfv"])
        .assert()
        .success();
    td.child("late").write_str("late").unwrap();

    Command::cargo_bin("keeper")
        .unwrap()
        .current_dir(td.path())
        .args(["check", "all.sfv"])
        .assert()
        .success();
    Command::cargo_bin("keeper")
        .unwrap()
        .current_dir(td.path())
        .args(["check", "all.sfv", "--extra"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("extra file: late"));
}

#[test]
fn no_arguments_prints_syntax() {
    Command::cargo_bin("keeper")
        .unwrap()
        .assert()
        .code(2)
        .stderr(predicate::str::contains("Syntax: keeper"))
        .stderr(predicate::str::contains("record"));
}

#[test]
fn record_of_missing_dir_fails() {
    let td = assert_fs::TempDir::new().unwrap();
    Command::cargo_bin("keeper")
        .unwrap()
        .current_dir(td.path())
        .args(["record", "nope", "out.sfv"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("record failed"));
    td.child("out.sfv").assert(predicate::path::missing());
}
