//! Integration tests for the `alignak-app` CLI binary.
//!
//! Argument parsing, help output, shell completions, config handling, and
//! one-shot views against a wiremock backend.
#![allow(clippy::unwrap_used)]

use assert_cmd::cargo::cargo_bin_cmd;
use predicates::prelude::*;
use serde_json::{Value, json};
use wiremock::matchers::{body_partial_json, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

// ── Helpers ─────────────────────────────────────────────────────────

const ENV_VARS: &[&str] = &[
    "ALIGNAK_APP_PROFILE",
    "ALIGNAK_APP_BACKEND",
    "ALIGNAK_APP_USERNAME",
    "ALIGNAK_APP_PASSWORD",
    "ALIGNAK_APP_TOKEN",
    "ALIGNAK_APP_CONFIG",
    "ALIGNAK_APP_OUTPUT",
    "ALIGNAK_APP_INSECURE",
    "ALIGNAK_APP_TIMEOUT",
];

/// Build a [`Command`] for the binary with env isolation.
///
/// Clears all `ALIGNAK_APP_*` env vars and points config directories at a
/// nonexistent path so tests never touch the user's real configuration.
fn app_cmd() -> assert_cmd::Command {
    let mut cmd = cargo_bin_cmd!("alignak-app");
    cmd.env("HOME", "/tmp/alignak-app-test-nonexistent")
        .env("XDG_CONFIG_HOME", "/tmp/alignak-app-test-nonexistent")
        .env_remove("RUST_LOG");
    for var in ENV_VARS {
        cmd.env_remove(var);
    }
    cmd
}

/// Concatenate stdout + stderr from a command output for flexible matching.
fn combined_output(output: &std::process::Output) -> String {
    let stdout = String::from_utf8_lossy(&output.stdout);
    let stderr = String::from_utf8_lossy(&output.stderr);
    format!("{stdout}{stderr}")
}

fn items(items: Value) -> Value {
    let total = items.as_array().map_or(0, Vec::len);
    json!({
        "_items": items,
        "_meta": { "page": 1, "max_results": 50, "total": total }
    })
}

/// Backend with an admin user, one UP host and one CRITICAL service.
async fn fake_backend() -> MockServer {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/login"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "token": "tkn" })))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/logout"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "_status": "OK" })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/user"))
        .and(query_param("where", r#"{"name":"admin"}"#))
        .respond_with(ResponseTemplate::new(200).set_body_json(items(json!([
            { "_id": "u1", "name": "admin", "alias": "Administrator", "is_admin": true }
        ]))))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/host"))
        .respond_with(ResponseTemplate::new(200).set_body_json(items(json!([
            { "_id": "h1", "name": "web", "ls_state": "UP", "ls_output": "PING OK" }
        ]))))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/service"))
        .respond_with(ResponseTemplate::new(200).set_body_json(items(json!([
            { "_id": "s1", "name": "http", "host": "h1", "ls_state": "CRITICAL",
              "ls_output": "connection refused" }
        ]))))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_json(items(json!([]))))
        .with_priority(10)
        .mount(&server)
        .await;

    server
}

/// Run the binary against `server` on a blocking thread.
async fn run_against(server: &MockServer, args: &[&str]) -> std::process::Output {
    let uri = server.uri();
    let args: Vec<String> = args.iter().map(|a| (*a).to_owned()).collect();
    tokio::task::spawn_blocking(move || {
        app_cmd()
            .args(["--backend", &uri, "--username", "admin"])
            .env("ALIGNAK_APP_PASSWORD", "admin")
            .args(&args)
            .output()
            .unwrap()
    })
    .await
    .unwrap()
}

// ── Basic invocation ────────────────────────────────────────────────

#[test]
fn test_no_args_shows_help() {
    let output = app_cmd().output().unwrap();
    assert_eq!(output.status.code(), Some(2), "Expected exit code 2");
    let text = combined_output(&output);
    assert!(text.contains("Usage"), "Expected 'Usage' in output:\n{text}");
}

#[test]
fn test_help_flag() {
    app_cmd().arg("--help").assert().success().stdout(
        predicate::str::contains("Alignak")
            .and(predicate::str::contains("problems"))
            .and(predicate::str::contains("downtime"))
            .and(predicate::str::contains("start")),
    );
}

#[test]
fn test_version_flag() {
    app_cmd()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("alignak-app"));
}

// ── Shell completions ───────────────────────────────────────────────

#[test]
fn test_completions_bash() {
    app_cmd()
        .args(["completions", "bash"])
        .assert()
        .success()
        .stdout(predicate::str::is_empty().not());
}

#[test]
fn test_completions_zsh() {
    app_cmd()
        .args(["completions", "zsh"])
        .assert()
        .success()
        .stdout(predicate::str::contains("#compdef"));
}

// ── Error cases ─────────────────────────────────────────────────────

#[test]
fn test_invalid_subcommand() {
    let output = app_cmd().arg("foobar").output().unwrap();
    assert!(!output.status.success());
    let text = combined_output(&output);
    assert!(
        text.contains("unrecognized") || text.contains("foobar"),
        "Expected error mentioning invalid subcommand:\n{text}"
    );
}

#[test]
fn test_hosts_without_config() {
    app_cmd()
        .args(["hosts"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("config init"));
}

#[test]
fn test_unknown_profile_is_reported() {
    let dir = tempfile::tempdir().unwrap();
    let config = dir.path().join("config.toml");
    std::fs::write(
        &config,
        "[profiles.lab]\nbackend = \"http://127.0.0.1:5000\"\nusername = \"admin\"\n",
    )
    .unwrap();

    app_cmd()
        .args(["--config", config.to_str().unwrap(), "--profile", "prod", "hosts"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("prod").and(predicate::str::contains("lab")));
}

// ── Config ──────────────────────────────────────────────────────────

#[test]
fn test_config_path_honors_flag() {
    app_cmd()
        .args(["--config", "/tmp/somewhere/alignak.toml", "config", "path"])
        .assert()
        .success()
        .stdout(predicate::str::contains("/tmp/somewhere/alignak.toml"));
}

#[test]
fn test_config_show_masks_secrets() {
    let dir = tempfile::tempdir().unwrap();
    let config = dir.path().join("config.toml");
    std::fs::write(
        &config,
        "default_profile = \"lab\"\n\n\
         [profiles.lab]\nbackend = \"http://127.0.0.1:5000\"\n\
         username = \"admin\"\npassword = \"s3cret\"\n",
    )
    .unwrap();

    app_cmd()
        .args(["--config", config.to_str().unwrap(), "config", "show"])
        .assert()
        .success()
        .stdout(
            predicate::str::contains("[profiles.lab]")
                .and(predicate::str::contains("password = \"****\""))
                .and(predicate::str::contains("s3cret").not()),
        );
}

#[cfg(target_os = "linux")]
#[test]
fn test_install_print() {
    app_cmd()
        .args(["--profile", "prod", "install", "--print"])
        .assert()
        .success()
        .stdout(
            predicate::str::contains("--profile prod start")
                .and(predicate::str::contains("[Service]")),
        );
}

#[cfg(not(target_os = "linux"))]
#[test]
fn test_install_is_refused_off_linux() {
    app_cmd()
        .args(["install", "--print"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("not supported"));
}

// ── One-shot views ──────────────────────────────────────────────────

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_hosts_plain_lists_names() {
    let server = fake_backend().await;
    let output = run_against(&server, &["-o", "plain", "hosts"]).await;

    assert!(output.status.success(), "{}", combined_output(&output));
    assert_eq!(String::from_utf8_lossy(&output.stdout).trim(), "web");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_problems_json_lists_critical_service() {
    let server = fake_backend().await;
    let output = run_against(&server, &["-o", "json", "problems"]).await;

    assert!(output.status.success(), "{}", combined_output(&output));
    let problems: Value = serde_json::from_slice(&output.stdout).unwrap();
    let problems = problems.as_array().unwrap();
    assert_eq!(problems.len(), 1);
    assert_eq!(problems[0]["name"], "http");
    assert_eq!(problems[0]["kind"], "service");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_host_detail_shows_services() {
    let server = fake_backend().await;
    let output = run_against(&server, &["--color", "never", "host", "web"]).await;

    assert!(output.status.success(), "{}", combined_output(&output));
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Host:      web"), "{stdout}");
    assert!(stdout.contains("http"), "{stdout}");
    assert!(stdout.contains("CRITICAL"), "{stdout}");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_ack_service_posts_action() {
    let server = fake_backend().await;
    Mock::given(method("POST"))
        .and(path("/actionacknowledge"))
        .and(body_partial_json(json!({
            "host": "h1",
            "service": "s1",
            "user": "u1",
            "comment": "looking"
        })))
        .respond_with(
            ResponseTemplate::new(201).set_body_json(json!({ "_status": "OK", "_id": "a1" })),
        )
        .expect(1)
        .mount(&server)
        .await;

    let output = run_against(&server, &["ack", "web/http", "-m", "looking"]).await;

    assert!(output.status.success(), "{}", combined_output(&output));
    assert!(String::from_utf8_lossy(&output.stderr).contains("Acknowledge requested for web/http"));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_missing_service_target_exits_not_found() {
    let server = fake_backend().await;
    let output = run_against(&server, &["ack", "web/ssh"]).await;

    assert_eq!(output.status.code(), Some(4), "{}", combined_output(&output));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_login_failure_exits_with_auth_code() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/login"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;

    let output = run_against(&server, &["user"]).await;
    assert_eq!(output.status.code(), Some(3), "{}", combined_output(&output));
}
