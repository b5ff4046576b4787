//! CLI argument parsing tests for metaagent

mod common;

use assert_cmd::Command;
use predicates::prelude::*;

fn metaagent() -> Command {
    Command::new(env!("CARGO_BIN_EXE_metaagent"))
}

#[test]
fn test_help_flag() {
    metaagent()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("A recursive meta-expert agent"))
        .stdout(predicate::str::contains("ask"))
        .stdout(predicate::str::contains("serve"));
}

#[test]
fn test_version_flag() {
    metaagent()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("0.1.0"));
}

#[test]
fn test_no_args_shows_usage() {
    metaagent()
        .assert()
        .failure()
        .stderr(predicate::str::contains("Usage"));
}

#[test]
fn test_ask_help() {
    metaagent()
        .args(["ask", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Ask the agent a question"))
        .stdout(predicate::str::contains("-m, --message"));
}

#[test]
fn test_serve_help() {
    metaagent()
        .args(["serve", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("--host"))
        .stdout(predicate::str::contains("-p, --port"))
        .stdout(predicate::str::contains("-v, --verbose"));
}

#[test]
fn test_serve_rejects_bad_port() {
    metaagent()
        .args(["serve", "--port", "notaport"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("invalid value"));
}

#[test]
fn test_unknown_subcommand() {
    metaagent()
        .arg("engage")
        .assert()
        .failure()
        .stderr(predicate::str::contains("unrecognized subcommand"));
}
