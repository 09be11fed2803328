// email-check/tests/cli_integration.rs

use assert_cmd::Command;
use predicates::prelude::*;
use serde_json::{json, Value};
use std::fs;
use tempfile::{NamedTempFile, TempDir};
use wiremock::matchers::{method, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Build a command isolated from the caller's environment and config files.
fn email_check(home: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("email-check").unwrap();
    cmd.env("HOME", home.path())
        .env("XDG_CONFIG_HOME", home.path())
        .current_dir(home.path())
        .env_remove("ZERO_BOUNCE_API_KEY")
        .env_remove("EC_API_KEY")
        .env_remove("EC_PROVIDER_URL")
        .env_remove("EC_CONCURRENCY")
        .env_remove("EC_PROVIDER_ERROR_POLICY")
        .env_remove("RUST_LOG");
    cmd
}

/// Helper to create a test addresses file
fn create_addresses_file(addresses: &[&str]) -> NamedTempFile {
    let file = NamedTempFile::new().expect("Failed to create temp file");
    fs::write(file.path(), addresses.join("\n")).expect("Failed to write to temp file");
    file
}

async fn mock_status(server: &MockServer, email: &str, status: &str) {
    Mock::given(method("GET"))
        .and(query_param("email", email))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "status": status })))
        .mount(server)
        .await;
}

/// Run a blocking assert_cmd invocation off the async test runtime.
async fn run(mut cmd: Command) -> std::process::Output {
    tokio::task::spawn_blocking(move || cmd.output().unwrap())
        .await
        .unwrap()
}

#[test]
fn test_help_shows_flags() {
    let home = TempDir::new().unwrap();
    email_check(&home)
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("--rate-limit"))
        .stdout(predicate::str::contains("--concurrency"))
        .stdout(predicate::str::contains("--accept-provider-errors"))
        .stdout(predicate::str::contains("--stdin"));
}

#[test]
fn test_no_addresses_is_usage_error() {
    let home = TempDir::new().unwrap();
    email_check(&home)
        .assert()
        .code(1)
        .stderr(predicate::str::contains("You must specify email addresses"));
}

#[test]
fn test_conflicting_formats_rejected() {
    let home = TempDir::new().unwrap();
    email_check(&home)
        .args(["a@x.com", "--json", "--csv"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("multiple output formats"));
}

#[test]
fn test_missing_api_key_is_config_error() {
    let home = TempDir::new().unwrap();
    email_check(&home)
        .arg("a@x.com")
        .assert()
        .code(1)
        .stderr(predicate::str::contains("No provider API key"));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_bulk_json_output_against_mock_provider() {
    let server = MockServer::start().await;
    mock_status(&server, "a@x.com", "valid").await;
    mock_status(&server, "b@x.com", "invalid").await;
    mock_status(&server, "c@x.com", "catch-all").await;

    let home = TempDir::new().unwrap();
    let mut cmd = email_check(&home);
    cmd.env("ZERO_BOUNCE_API_KEY", "test-key")
        .env("EC_PROVIDER_URL", format!("{}/v2/validate", server.uri()))
        .args(["a@x.com", "b@x.com", "c@x.com", "--json", "-c", "2"]);

    let output = run(cmd).await;
    assert_eq!(output.status.code(), Some(0));

    let records: Value = serde_json::from_slice(&output.stdout).unwrap();
    let records = records.as_array().unwrap();
    assert_eq!(records.len(), 3);
    assert_eq!(records[0]["email"], "a@x.com");
    assert_eq!(records[0]["status"], "valid");
    assert_eq!(records[1]["status"], "invalid");
    assert_eq!(records[2]["status"], "catch-all");
}

#[tokio::test(flavor = "multi_thread")]
async fn test_invalid_address_gives_partial_failure_exit() {
    let server = MockServer::start().await;
    mock_status(&server, "a@x.com", "valid").await;

    let home = TempDir::new().unwrap();
    let mut cmd = email_check(&home);
    cmd.env("ZERO_BOUNCE_API_KEY", "test-key")
        .env("EC_PROVIDER_URL", format!("{}/v2/validate", server.uri()))
        .args(["a@x.com", "not-an-address", "--csv"]);

    let output = run(cmd).await;
    assert_eq!(output.status.code(), Some(2));

    let stdout = String::from_utf8(output.stdout).unwrap();
    assert!(stdout.starts_with("email,status,provider_error,error_kind,error"));
    assert!(stdout.contains("a@x.com,valid,,,"));
    assert!(stdout.contains("not-an-address,,,invalid_input,"));

    // The malformed address never reached the provider
    assert_eq!(server.received_requests().await.unwrap().len(), 1);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_config_file_and_address_file() {
    let server = MockServer::start().await;
    mock_status(&server, "a@x.com", "valid").await;
    mock_status(&server, "b@x.com", "valid").await;

    let home = TempDir::new().unwrap();
    let config = home.path().join("custom.toml");
    fs::write(
        &config,
        format!(
            "[provider]\napi_key = \"file-key\"\nurl = \"{}/v2/validate\"\n\n[limits]\nconcurrency = 2\n",
            server.uri()
        ),
    )
    .unwrap();
    let addresses = create_addresses_file(&["# team", "a@x.com", "", "b@x.com"]);

    let mut cmd = email_check(&home);
    cmd.arg("--config")
        .arg(&config)
        .arg("--file")
        .arg(addresses.path())
        .arg("--batch");

    let output = run(cmd).await;
    assert_eq!(output.status.code(), Some(0));

    let stdout = String::from_utf8(output.stdout).unwrap();
    assert!(stdout.contains("a@x.com valid"));
    assert!(stdout.contains("b@x.com valid"));
    assert!(stdout.contains("Summary:"));

    let requests = server.received_requests().await.unwrap();
    assert!(requests
        .iter()
        .all(|r| r.url.query_pairs().any(|(k, v)| k == "api_key" && v == "file-key")));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_provider_error_reported_in_output() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"status": "unknown", "error": "Invalid API Key"})),
        )
        .mount(&server)
        .await;

    let home = TempDir::new().unwrap();
    let mut cmd = email_check(&home);
    cmd.env("ZERO_BOUNCE_API_KEY", "bad-key")
        .env("EC_PROVIDER_URL", format!("{}/v2/validate", server.uri()))
        .args(["a@x.com", "--json"]);

    let output = run(cmd).await;
    assert_eq!(output.status.code(), Some(2));

    let records: Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(records[0]["error_kind"], "provider_error");
    assert_eq!(records[0]["provider_error"], "Invalid API Key");
}
