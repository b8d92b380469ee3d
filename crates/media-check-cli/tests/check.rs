use assert_cmd::Command;
use predicates::prelude::*;
use std::fs::write;

fn cli() -> Command {
    let mut cmd = Command::cargo_bin("media-check-cli").unwrap();
    cmd.env_remove("MEDIA_CHECK_BACKEND")
        .env_remove("MEDIA_CHECK_BASE_URL")
        .env_remove("MEDIA_CHECK_TIMEOUT")
        .env_remove("MEDIA_CHECK_MOCK_LATENCY_MS")
        .env_remove("RUST_LOG")
        .env("NO_COLOR", "1");
    cmd
}

#[test]
fn check_text_with_mock_backend() {
    cli()
        .env("MEDIA_CHECK_BACKEND", "mock")
        .args(["check", "text", "Our product cures everything."])
        .assert()
        .success()
        .stdout(predicate::str::contains("[PARTIAL_FAIL]"))
        .stdout(predicate::str::contains("Status: PARTIAL_FAIL • Score: 90/100"))
        .stdout(predicate::str::contains("Issues (2):"))
        .stdout(predicate::str::contains("File: text-input.txt"));
}

#[test]
fn check_text_reads_stdin_and_prints_json() {
    cli()
        .args(["--format", "json", "check", "text"])
        .write_stdin("Pasted script for review")
        .assert()
        .success()
        .stdout(predicate::str::contains("\"status\": \"partial_fail\""))
        .stdout(predicate::str::contains("\"issuesCount\": 2"))
        .stdout(predicate::str::contains("\"score\": 90"));
}

#[test]
fn check_youtube_url_with_config_file() {
    let file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
    write(file.path(), "[backend]\nkind = \"mock\"\n").unwrap();

    cli()
        .args([
            "--config",
            file.path().to_str().unwrap(),
            "check",
            "url",
            "https://www.youtube.com/watch?v=dQw4w9WgXcQ",
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("Score: 80/100"))
        .stdout(predicate::str::contains("[medium] Age"));
}

#[test]
fn blank_text_is_rejected_before_the_backend() {
    cli()
        .args(["check", "text", "   "])
        .assert()
        .failure()
        .stderr(predicate::str::contains("text to check must not be empty"));
}

#[test]
fn unsupported_file_type_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("notes.xyz");
    write(&path, "data").unwrap();

    cli()
        .args(["check", "file", path.to_str().unwrap()])
        .assert()
        .failure()
        .stderr(predicate::str::contains("unsupported file type"));
}

#[test]
fn unreachable_backend_reports_generic_message() {
    let file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
    write(
        file.path(),
        "[backend]\nkind = \"http\"\nbase_url = \"http://127.0.0.1:1/\"\ntimeout = \"5s\"\n",
    )
    .unwrap();

    cli()
        .args([
            "--config",
            file.path().to_str().unwrap(),
            "check",
            "text",
            "hello",
        ])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Unable to connect to server"));
}

#[test]
fn environment_overrides_config_file() {
    let file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
    write(
        file.path(),
        "[backend]\nkind = \"http\"\nbase_url = \"http://127.0.0.1:1/\"\n",
    )
    .unwrap();

    cli()
        .env("MEDIA_CHECK_BACKEND", "mock")
        .args([
            "--config",
            file.path().to_str().unwrap(),
            "check",
            "text",
            "hello",
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("Score: 90/100"));
}

#[test]
fn config_file_accepts_mock_latency_in_millis() {
    let file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
    write(file.path(), "[backend]\nkind = \"mock\"\nmock_latency = 5\n").unwrap();

    cli()
        .args([
            "--config",
            file.path().to_str().unwrap(),
            "check",
            "text",
            "hello",
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("Score: 90/100"));
}

#[test]
fn non_finite_duration_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("clip.mp4");
    write(&path, "data").unwrap();

    cli()
        .args(["check", "file", path.to_str().unwrap(), "--duration", "NaN"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("finite, non-negative"));
}
