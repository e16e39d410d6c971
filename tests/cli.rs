// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

extern crate assert_cmd;
extern crate predicates;
extern crate tempfile;

use assert_cmd::prelude::*;
use predicates::prelude::*;
use std::fs;
use std::process::Command;

fn julia() -> Command {
    Command::cargo_bin("julia").unwrap()
}

#[test]
fn too_few_arguments_is_a_usage_error() {
    let dir = tempfile::tempdir().unwrap();
    julia()
        .current_dir(dir.path())
        .args(&["800", "600", "1", "0", "0"])
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("USAGE"));
    assert!(!dir.path().join("fractal.bmp").exists());
}

#[test]
fn too_many_arguments_is_a_usage_error() {
    let dir = tempfile::tempdir().unwrap();
    julia()
        .current_dir(dir.path())
        .args(&["800", "600", "1", "0", "0", "1000", "7"])
        .assert()
        .failure()
        .code(1);
    assert!(!dir.path().join("fractal.bmp").exists());
}

#[test]
fn unparsable_numbers_are_refused() {
    let dir = tempfile::tempdir().unwrap();
    julia()
        .current_dir(dir.path())
        .args(&["wide", "600", "1", "0", "0", "1000"])
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("width"));
}

#[test]
fn zero_zoom_is_refused() {
    let dir = tempfile::tempdir().unwrap();
    julia()
        .current_dir(dir.path())
        .args(&["16", "12", "0", "0", "0", "100"])
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("zoom"));
}

#[test]
fn zero_threads_are_refused() {
    let dir = tempfile::tempdir().unwrap();
    julia()
        .current_dir(dir.path())
        .args(&["16", "12", "1", "0", "0", "100", "--threads", "0"])
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("Thread count"));
}

#[test]
fn oversized_bitmap_fails_without_rendering() {
    let dir = tempfile::tempdir().unwrap();
    julia()
        .current_dir(dir.path())
        .args(&["2000000000", "2000000000", "1", "0", "0", "10", "--ranks", "2"])
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("Render failure"));
    assert!(!dir.path().join("fractal.bmp").exists());
}

#[test]
fn renders_the_default_file_and_reports_timings() {
    let dir = tempfile::tempdir().unwrap();
    julia()
        .current_dir(dir.path())
        .args(&["16", "12", "1.", "-0.07", ".3", "100"])
        .assert()
        .success()
        .stdout(predicate::str::is_match(r"^Compute: \d+\.\d{6}s, Savefile: \d+\.\d{6}\n$").unwrap());
    let bytes = fs::read(dir.path().join("fractal.bmp")).unwrap();
    assert_eq!(bytes.len(), 54 + 16 * 12 * 3);
    assert_eq!(&bytes[0..2], b"BM");
}

#[test]
fn ranks_and_threads_produce_the_same_file() {
    let dir = tempfile::tempdir().unwrap();
    let base = ["40", "30", "1", "0", "0", "200"];
    julia()
        .current_dir(dir.path())
        .args(&base)
        .args(&["-t", "1", "-o", "single.bmp"])
        .assert()
        .success();
    julia()
        .current_dir(dir.path())
        .args(&base)
        .args(&["--ranks", "3", "--threads", "2", "--merge", "select", "-o", "group.bmp"])
        .assert()
        .success();
    let single = fs::read(dir.path().join("single.bmp")).unwrap();
    let group = fs::read(dir.path().join("group.bmp")).unwrap();
    assert_eq!(single, group);
}

#[test]
fn unwritable_output_fails() {
    let dir = tempfile::tempdir().unwrap();
    julia()
        .current_dir(dir.path())
        .args(&["16", "12", "1", "0", "0", "50", "-o", "missing/fractal.bmp"])
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("unable to write"));
}
