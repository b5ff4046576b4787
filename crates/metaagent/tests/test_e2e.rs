//! End-to-end tests for metaagent commands

mod common;

use common::TestEnv;
use predicates::prelude::*;

#[test]
fn test_init_writes_config_and_workspace() {
    let env = TestEnv::new().expect("Failed to create test environment");

    env.command()
        .arg("init")
        .assert()
        .success()
        .stdout(predicate::str::contains("metaagent initialized"));

    assert!(env.config_file().exists());
    assert!(env.data_dir.join("workspace").is_dir());

    let json: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(env.config_file()).unwrap()).unwrap();
    assert_eq!(json["agent"]["max_recursion_depth"], 3);
    assert_eq!(json["agent"]["max_history_items"], 10);
    assert_eq!(json["server"]["port"], 5000);
}

#[test]
fn test_init_is_idempotent() {
    let env = TestEnv::new().unwrap();
    env.write_config(r#"{"agent": {"model": "custom/model"}}"#).unwrap();

    env.command().arg("init").assert().success();

    let content = std::fs::read_to_string(env.config_file()).unwrap();
    assert!(content.contains("custom/model"));
}

#[test]
fn test_status_without_config() {
    let env = TestEnv::new().unwrap();

    env.command()
        .arg("status")
        .assert()
        .success()
        .stdout(predicate::str::contains("[Missing]"))
        .stdout(predicate::str::contains("Ready"));
}

#[test]
fn test_status_reports_config() {
    let env = TestEnv::new().unwrap();
    env.write_config(
        r#"{
  "provider": {"api_key": "sk-or-test"},
  "agent": {"model": "test/model", "max_recursion_depth": 5},
  "executor": {"backend": "docker", "docker_image": "sandbox", "allowed_commands": ["ls", "cat"]}
}"#,
    )
    .unwrap();

    env.command()
        .arg("status")
        .assert()
        .success()
        .stdout(predicate::str::contains("test/model"))
        .stdout(predicate::str::contains("[Set]"))
        .stdout(predicate::str::contains("docker (sandbox)"))
        .stdout(predicate::str::contains("ls, cat"))
        .stdout(predicate::str::contains("depth 5"));
}

#[test]
fn test_status_env_override() {
    let env = TestEnv::new().unwrap();

    env.command()
        .env("OPENROUTER_MODEL", "env/model")
        .env("MAX_HISTORY_ITEMS", "4")
        .arg("status")
        .assert()
        .success()
        .stdout(predicate::str::contains("env/model"))
        .stdout(predicate::str::contains("history 4"));
}

#[test]
fn test_status_fails_on_invalid_config() {
    let env = TestEnv::new().unwrap();
    env.write_config("{ not json").unwrap();

    env.command().arg("status").assert().failure();
}

#[test]
fn test_ask_without_api_key_fails() {
    let env = TestEnv::new().unwrap();

    env.command()
        .args(["ask", "-m", "hello"])
        .assert()
        .failure()
        .stdout(predicate::str::contains("No API key configured"));
}

#[test]
fn test_ask_with_unreachable_backend_fails() {
    let env = TestEnv::new().unwrap();

    env.command()
        .env("OPENROUTER_API_KEY", "sk-or-test")
        .env("OPENROUTER_API_BASE", "http://127.0.0.1:9/api/v1")
        .args(["ask", "-m", "hello"])
        .assert()
        .failure();
}
