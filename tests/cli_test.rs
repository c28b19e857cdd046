//! CLI argument contract. None of these invocations may touch a browser.

use assert_cmd::Command;
use predicates::prelude::*;

#[test]
fn missing_selection_fails_with_usage() {
    Command::cargo_bin("tourcap")
        .unwrap()
        .assert()
        .failure()
        .stderr(predicate::str::contains("Usage"))
        .stderr(predicate::str::contains("--tour"));
}

#[test]
fn tour_and_all_conflict() {
    Command::cargo_bin("tourcap")
        .unwrap()
        .args(["--tour=login-demo-accounts", "--all"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("cannot be used with"));
}

#[test]
fn help_prints_usage_and_succeeds() {
    Command::cargo_bin("tourcap")
        .unwrap()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("--tour"))
        .stdout(predicate::str::contains("--all"))
        .stdout(predicate::str::contains("--no-headless"))
        .stdout(predicate::str::contains("--port"))
        .stdout(predicate::str::contains("--delay"));
}

#[test]
fn unknown_tour_id_fails_before_launching_anything() {
    Command::cargo_bin("tourcap")
        .unwrap()
        .arg("--tour=does-not-exist")
        .assert()
        .failure()
        .stderr(predicate::str::contains("unknown tour id"));
}

#[test]
fn unreadable_catalog_file_fails() {
    Command::cargo_bin("tourcap")
        .unwrap()
        .args(["--all", "--catalog=/no/such/catalog.yaml"])
        .assert()
        .failure();
}
