//! Integration tests for the `frontity` CLI binary.
//!
//! Parsing, help, completions and error handling run without a site;
//! the data commands run against a wiremock WordPress.
#![allow(clippy::unwrap_used)]

use assert_cmd::cargo::cargo_bin_cmd;
use predicates::prelude::*;
use serde_json::{Value, json};
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

// ── Helpers ─────────────────────────────────────────────────────────

/// The `frontity` binary with env isolation: no `FRONTITY_*` vars and
/// config directories pointing at a nonexistent path.
fn frontity_cmd() -> assert_cmd::Command {
    let mut cmd = cargo_bin_cmd!("frontity");
    cmd.env("HOME", "/tmp/frontity-cli-test-nonexistent")
        .env("XDG_CONFIG_HOME", "/tmp/frontity-cli-test-nonexistent")
        .env("NO_COLOR", "1")
        .env_remove("RUST_LOG")
        .env_remove("FRONTITY_PROFILE")
        .env_remove("FRONTITY_URL")
        .env_remove("FRONTITY_SOURCE_URL")
        .env_remove("FRONTITY_API")
        .env_remove("FRONTITY_REDIRECTIONS")
        .env_remove("FRONTITY_PREVIEW_TOKEN")
        .env_remove("FRONTITY_OUTPUT")
        .env_remove("FRONTITY_INSECURE")
        .env_remove("FRONTITY_TIMEOUT");
    cmd
}

fn combined_output(output: &std::process::Output) -> String {
    let stdout = String::from_utf8_lossy(&output.stdout);
    let stderr = String::from_utf8_lossy(&output.stderr);
    format!("{stdout}{stderr}")
}

fn stdout_json(output: &std::process::Output) -> Value {
    serde_json::from_slice(&output.stdout).unwrap()
}

async fn mount_post(server: &MockServer, id: u64, slug: &str) {
    Mock::given(method("GET"))
        .and(path("/wp-json/wp/v2/posts"))
        .and(query_param("slug", slug))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([{
            "id": id,
            "type": "post",
            "slug": slug,
            "link": format!("{}/{slug}/", server.uri()),
            "title": { "rendered": "Hello" },
        }])))
        .mount(server)
        .await;
}

// ── Basic invocation ────────────────────────────────────────────────

#[test]
fn test_no_args_shows_help() {
    let output = frontity_cmd().output().unwrap();
    assert_eq!(output.status.code(), Some(2));
    assert!(combined_output(&output).contains("Usage"));
}

#[test]
fn test_help_lists_commands() {
    frontity_cmd().arg("--help").assert().success().stdout(
        predicate::str::contains("normalize")
            .and(predicate::str::contains("navigate"))
            .and(predicate::str::contains("ssr"))
            .and(predicate::str::contains("config")),
    );
}

#[test]
fn test_version_flag() {
    frontity_cmd()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("frontity"));
}

#[test]
fn test_invalid_subcommand() {
    frontity_cmd().arg("publish").assert().failure().code(2);
}

#[test]
fn test_invalid_output_format() {
    frontity_cmd()
        .args(["--url", "https://site.test", "-o", "xml", "normalize", "/"])
        .assert()
        .failure()
        .code(2);
}

// ── Shell completions ───────────────────────────────────────────────

#[test]
fn test_completions_bash() {
    frontity_cmd()
        .args(["completions", "bash"])
        .assert()
        .success()
        .stdout(predicate::str::contains("frontity"));
}

#[test]
fn test_completions_zsh() {
    frontity_cmd()
        .args(["completions", "zsh"])
        .assert()
        .success()
        .stdout(predicate::str::is_empty().not());
}

// ── Config ──────────────────────────────────────────────────────────

#[test]
fn test_config_path() {
    frontity_cmd()
        .args(["config", "path"])
        .assert()
        .success()
        .stdout(predicate::str::contains("config.toml"));
}

#[test]
fn test_config_show_defaults() {
    frontity_cmd()
        .args(["config", "show"])
        .assert()
        .success()
        .stdout(predicate::str::contains("default_profile"));
}

#[test]
fn test_data_command_without_site() {
    frontity_cmd()
        .args(["get", "/hello/"])
        .assert()
        .failure()
        .code(2)
        .stderr(predicate::str::contains("No site configured"));
}

#[test]
fn test_unknown_profile() {
    frontity_cmd()
        .args(["-p", "shop", "api"])
        .assert()
        .failure()
        .code(2)
        .stderr(predicate::str::contains("shop"));
}

// ── Offline data commands ───────────────────────────────────────────

#[test]
fn test_normalize_plain() {
    frontity_cmd()
        .args([
            "--url",
            "https://site.test/blog",
            "-o",
            "plain",
            "normalize",
            "https://site.test/blog/hello?b=2&a=1",
            "/tag/some-tag#top",
        ])
        .assert()
        .success()
        .stdout("/hello/?a=1&b=2\n/tag/some-tag/\n");
}

#[test]
fn test_normalize_malformed_link() {
    frontity_cmd()
        .args(["--url", "https://site.test", "normalize", "http://["])
        .assert()
        .failure()
        .code(2);
}

#[test]
fn test_api_urls() {
    let output = frontity_cmd()
        .args(["--url", "https://site.test", "-o", "json", "api"])
        .output()
        .unwrap();
    assert!(output.status.success());

    let info = stdout_json(&output);
    assert_eq!(info["api"], "https://site.test/wp-json/");
    assert_eq!(info["sourceUrl"], "https://site.test/");
    assert_eq!(info["isWpCom"], false);
}

#[test]
fn test_api_wordpress_com() {
    frontity_cmd()
        .args(["--url", "https://blog.wordpress.com", "-o", "plain", "api"])
        .assert()
        .success()
        .stdout("https://public-api.wordpress.com/wp/v2/sites/blog.wordpress.com/\n");
}

// ── Against a mock WordPress ────────────────────────────────────────

#[tokio::test(flavor = "multi_thread")]
async fn test_get_post() {
    let server = MockServer::start().await;
    mount_post(&server, 60, "hello").await;

    let output = frontity_cmd()
        .args(["--url", &server.uri(), "-o", "json", "get", "/hello", "--entities"])
        .output()
        .unwrap();
    assert!(output.status.success(), "{}", combined_output(&output));

    let data = stdout_json(&output);
    assert_eq!(data["link"], "/hello/");
    assert_eq!(data["kind"], "postType");
    assert_eq!(data["type"], "post");
    assert_eq!(data["id"], 60);
    assert_eq!(data["isReady"], true);
    assert_eq!(data["entities"][0]["id"], 60);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_get_post_table() {
    let server = MockServer::start().await;
    mount_post(&server, 60, "hello").await;

    frontity_cmd()
        .args(["--url", &server.uri(), "get", "/hello/"])
        .assert()
        .success()
        .stdout(
            predicate::str::contains("/hello/")
                .and(predicate::str::contains("ready"))
                .and(predicate::str::contains("Hello")),
        );
}

#[tokio::test(flavor = "multi_thread")]
async fn test_get_missing_exits_not_found() {
    let server = MockServer::start().await;

    frontity_cmd()
        .args(["--url", &server.uri(), "get", "/missing/"])
        .assert()
        .failure()
        .code(4)
        .stderr(predicate::str::contains("404"));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_navigate_follows_redirection() {
    let server = MockServer::start().await;
    Mock::given(method("HEAD"))
        .and(path("/old/"))
        .respond_with(ResponseTemplate::new(301).insert_header("Location", "/hello/"))
        .mount(&server)
        .await;
    mount_post(&server, 60, "hello").await;

    let output = frontity_cmd()
        .args([
            "--url",
            &server.uri(),
            "--redirections",
            "all",
            "-o",
            "json",
            "navigate",
            "/old/",
            "--wait",
            "10",
        ])
        .output()
        .unwrap();
    assert!(output.status.success(), "{}", combined_output(&output));

    let steps = stdout_json(&output);
    assert_eq!(steps[0]["requested"], "/old/");
    assert_eq!(steps[0]["link"], "/hello/");
    assert_eq!(steps[0]["status"], "ready");
    assert_eq!(steps[0]["kind"], "post");
}

#[tokio::test(flavor = "multi_thread")]
async fn test_ssr_redirect() {
    let server = MockServer::start().await;
    Mock::given(method("HEAD"))
        .and(path("/old/"))
        .respond_with(ResponseTemplate::new(301).insert_header("Location", "/new/"))
        .mount(&server)
        .await;

    let output = frontity_cmd()
        .args([
            "--url",
            &server.uri(),
            "--redirections",
            "all",
            "-o",
            "json",
            "ssr",
            "/old/?a=1",
            "-O",
            "name=my-app",
        ])
        .output()
        .unwrap();
    assert!(output.status.success(), "{}", combined_output(&output));

    let report = stdout_json(&output);
    assert_eq!(report["status"], 301);
    assert_eq!(report["location"], "/new/?a=1&frontity_name=my-app");
    assert_eq!(report["link"], "/old/?a=1");
}

#[tokio::test(flavor = "multi_thread")]
async fn test_ssr_not_found() {
    let server = MockServer::start().await;

    frontity_cmd()
        .args(["--url", &server.uri(), "-o", "plain", "ssr", "/missing/"])
        .assert()
        .success()
        .stdout("404\n");
}
