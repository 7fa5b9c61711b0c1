//! CLI integration tests

use std::path::Path;
use std::process::{Command, Output};
use tempfile::TempDir;

/// Run the built binary with an isolated home directory and no GRADECAST_* env
fn run(home: &Path, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_gradecast"))
        .args(args)
        .env("HOME", home)
        .env_remove("GRADECAST_API_URL")
        .env_remove("GRADECAST_TEACHER_ID")
        .env("NO_COLOR", "1")
        .output()
        .expect("Failed to execute command")
}

fn write_config(home: &Path, content: &str) {
    let dir = home.join(".config").join("gradecast");
    std::fs::create_dir_all(&dir).unwrap();
    std::fs::write(dir.join("config.json"), content).unwrap();
}

/// Test that the CLI shows help
#[test]
fn test_cli_help() {
    let home = TempDir::new().unwrap();
    let output = run(home.path(), &["--help"]);

    let stdout = String::from_utf8_lossy(&output.stdout);

    assert!(output.status.success(), "CLI help should succeed");
    assert!(stdout.contains("Gradecast"), "Should show app name");
    assert!(stdout.contains("predict"), "Should show predict command");
    assert!(stdout.contains("predict-all"), "Should show predict-all command");
    assert!(stdout.contains("stats"), "Should show stats command");
    assert!(stdout.contains("health"), "Should show health command");
    assert!(stdout.contains("--teacher-id"), "Should show teacher option");
}

/// Test that the CLI shows version
#[test]
fn test_cli_version() {
    let home = TempDir::new().unwrap();
    let output = run(home.path(), &["--version"]);

    let stdout = String::from_utf8_lossy(&output.stdout);

    assert!(output.status.success(), "CLI version should succeed");
    assert!(stdout.contains("gradecast"), "Should show binary name");
}

#[test]
fn test_predict_requires_student_id() {
    let home = TempDir::new().unwrap();
    let output = run(home.path(), &["predict"]);

    assert!(!output.status.success());
}

#[test]
fn test_teacher_and_admin_conflict() {
    let home = TempDir::new().unwrap();
    let output = run(home.path(), &["--teacher-id", "10", "--admin", "stats"]);

    assert!(!output.status.success());
}

#[test]
fn test_invalid_format_rejected() {
    let home = TempDir::new().unwrap();
    let output = run(home.path(), &["--format", "xml", "stats"]);

    assert!(!output.status.success());
}

#[test]
fn test_unreachable_server_fails() {
    let home = TempDir::new().unwrap();
    let output = run(
        home.path(),
        &["--api-url", "http://127.0.0.1:1", "--teacher-id", "10", "stats"],
    );

    assert!(!output.status.success());
}

#[test]
fn test_config_file_supplies_url_and_teacher() {
    let mut server = mockito::Server::new();
    let mock = server
        .mock("GET", "/api/stats")
        .match_header("x-teacher-id", "10")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"total":3,"passes":2,"fails":1,"avg_prob_pass":0.8,"avg_prob_fail":0.3}"#)
        .create();

    let home = TempDir::new().unwrap();
    write_config(
        home.path(),
        &format!(r#"{{"api_url":"{}","teacher_id":10}}"#, server.url()),
    );

    let output = run(home.path(), &["--format", "json", "stats"]);
    let stdout = String::from_utf8_lossy(&output.stdout);

    mock.assert();
    assert!(output.status.success(), "stats should succeed: {stdout}");
    assert!(stdout.contains("\"passes\": 2"));
}

#[test]
fn test_predict_prints_percentage() {
    let mut server = mockito::Server::new();
    server
        .mock("POST", "/students/1/predict")
        .match_header("x-teacher-id", "10")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"prediction":"Pass","probability":0.81}"#)
        .create();

    let home = TempDir::new().unwrap();
    let url = server.url();
    let output = run(
        home.path(),
        &["--api-url", &url, "--teacher-id", "10", "predict", "1"],
    );
    let stdout = String::from_utf8_lossy(&output.stdout);

    assert!(output.status.success(), "predict should succeed: {stdout}");
    assert!(stdout.contains("Pass"));
    assert!(stdout.contains("81.0%"));
}
