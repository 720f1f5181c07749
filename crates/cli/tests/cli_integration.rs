//! End-to-end tests for the `lull` binary

mod common;

use common::LullCommand;
use tempfile::TempDir;

#[test]
fn test_config_example_is_printed() {
    let temp_dir = TempDir::new().unwrap();
    let config = temp_dir.path().join("config.toml");

    LullCommand::new(&config)
        .args(&["config", "example"])
        .execute()
        .unwrap()
        .assert_success()
        .assert_stdout_contains("[tasks.Notify]")
        .assert_stdout_contains("delay_secs = 60");
}

#[test]
fn test_config_path_create_writes_example() {
    let temp_dir = TempDir::new().unwrap();
    let config = temp_dir.path().join("nested").join("config.toml");

    LullCommand::new(&config)
        .args(&["config", "path", "--create"])
        .execute()
        .unwrap()
        .assert_success();

    let written = std::fs::read_to_string(&config).unwrap();
    assert_eq!(written, lull_core::Settings::example());

    LullCommand::new(&config)
        .args(&["config", "list"])
        .execute()
        .unwrap()
        .assert_success()
        .assert_stdout_contains("[tasks.RecomputeSummary]");
}

#[test]
fn test_invalid_settings_are_rejected() {
    let temp_dir = TempDir::new().unwrap();
    let config = temp_dir.path().join("config.toml");
    std::fs::write(&config, "[tasks.\"a:b\"]\ndelay_secs = 5\n").unwrap();

    LullCommand::new(&config)
        .args(&["config", "list"])
        .execute()
        .unwrap()
        .assert_failure();
}

#[test]
fn test_simulate_runs_only_last_trigger() {
    let temp_dir = TempDir::new().unwrap();
    let config = temp_dir.path().join("config.toml");

    let result = LullCommand::new(&config)
        .args(&[
            "simulate",
            "--task",
            "Notify",
            "--triggers",
            "4",
            "--delay-secs",
            "0",
            "user-7",
        ])
        .execute()
        .unwrap();

    result.assert_success();
    assert_eq!(result.stdout.matches(" ran with ").count(), 1);
    result.assert_stdout_contains("{\"revision\":4}");
    assert!(!result.stdout.contains("{\"revision\":1}"));
}

#[test]
fn test_simulate_requires_configured_task() {
    let temp_dir = TempDir::new().unwrap();
    let config = temp_dir.path().join("config.toml");

    let result = LullCommand::new(&config)
        .args(&["simulate", "--task", "Unknown"])
        .execute()
        .unwrap();

    result.assert_failure();
    assert!(result.stderr.contains("not configured"));
}

#[test]
fn test_tickets_consumed_after_simulate() {
    let temp_dir = TempDir::new().unwrap();
    let config = temp_dir.path().join("config.toml");
    let db = temp_dir.path().join("tickets.db");
    std::fs::write(
        &config,
        format!(
            "[store]\npath = {:?}\n\n[tasks.Notify]\ndelay_secs = 0\ndelay_buffer_secs = 0\n",
            db.to_string_lossy()
        ),
    )
    .unwrap();

    LullCommand::new(&config)
        .args(&["simulate", "--task", "Notify", "--key", "u1"])
        .execute()
        .unwrap()
        .assert_success();

    LullCommand::new(&config)
        .args(&["tickets"])
        .execute()
        .unwrap()
        .assert_success()
        .assert_stdout_contains("No pending tickets");

    LullCommand::new(&config)
        .args(&["show", "Notify:u1"])
        .execute()
        .unwrap()
        .assert_success()
        .assert_stdout_contains("(no ticket)");
}

#[test]
fn test_clear_rejects_unnamespaced_key() {
    let temp_dir = TempDir::new().unwrap();
    let config = temp_dir.path().join("config.toml");
    let db = temp_dir.path().join("tickets.db");

    let result = LullCommand::new(&config)
        .args(&["clear", "no-namespace", "--db", db.to_str().unwrap()])
        .execute()
        .unwrap();

    result.assert_failure();
    assert!(result.stderr.contains("<TaskType>:<key>"));
}
