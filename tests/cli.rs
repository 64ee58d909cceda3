#![allow(deprecated)]

use chrono::{Local, TimeZone};
use predicates::prelude::*;
use std::fs;
use std::path::Path;
use tempfile::TempDir;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn cmd(temp: &TempDir) -> assert_cmd::Command {
    let mut c = assert_cmd::Command::cargo_bin("memosync").unwrap();
    c.arg("--config")
        .arg(temp.path().join("config.json"))
        .arg("--db")
        .arg(temp.path().join("state.db"))
        .env("NO_COLOR", "1")
        .env_remove("RUST_LOG")
        .env_remove("MEMOS_ENDPOINT")
        .env_remove("MEMOS_TOKEN")
        .env_remove("MEMOSYNC_HEADING")
        .env_remove("MEMOSYNC_VAULT");
    c
}

fn set(temp: &TempDir, key: &str, value: &str) {
    cmd(temp).args(["config", "set", key, value]).assert().success();
}

fn write_vault(root: &Path) {
    fs::create_dir_all(root.join("Templates")).unwrap();
    fs::write(root.join("Templates/day.md"), "# Journal\n\n## Tasks\n").unwrap();
}

#[test]
fn version_reports_package_version() {
    let temp = TempDir::new().unwrap();
    cmd(&temp)
        .arg("version")
        .assert()
        .success()
        .stdout(predicate::str::contains(env!("CARGO_PKG_VERSION")));
}

#[test]
fn config_show_redacts_token() {
    let temp = TempDir::new().unwrap();
    set(&temp, "access_token", "supersecret-abcd");
    set(&temp, "time_format", "HH:mm:ss");

    cmd(&temp)
        .args(["config", "show"])
        .assert()
        .success()
        .stdout(predicate::str::contains("****abcd"))
        .stdout(predicate::str::contains("HH:mm:ss"))
        .stdout(predicate::str::contains("supersecret").not());

    let saved = fs::read_to_string(temp.path().join("config.json")).unwrap();
    assert!(saved.contains("supersecret-abcd"));
}

#[test]
fn config_set_rejects_unknown_key() {
    let temp = TempDir::new().unwrap();
    cmd(&temp)
        .args(["config", "set", "colour", "blue"])
        .assert()
        .code(4)
        .stderr(predicate::str::contains("INVALID_ARGUMENT"));
}

#[test]
fn sync_without_config_exits_with_config_code() {
    let temp = TempDir::new().unwrap();
    cmd(&temp)
        .arg("sync")
        .assert()
        .code(7)
        .stderr(predicate::str::contains("CONFIG_MISSING"))
        .stderr(predicate::str::contains("endpoint"));
}

#[test]
fn sync_rejects_conflicting_scopes() {
    let temp = TempDir::new().unwrap();
    cmd(&temp)
        .args(["sync", "--force", "--week"])
        .assert()
        .failure();
}

#[test]
fn status_without_history() {
    let temp = TempDir::new().unwrap();
    set(&temp, "access_token", "tok");

    cmd(&temp)
        .arg("status")
        .assert()
        .success()
        .stdout(predicate::str::contains("\"cursor\":null"))
        .stdout(predicate::str::contains("\"resume\":null"))
        .stdout(predicate::str::contains("\"runs\":[]"));
}

#[tokio::test(flavor = "multi_thread")]
async fn sync_writes_daily_note_and_records_run() {
    let server = MockServer::start().await;
    let created = Local.with_ymd_and_hms(2024, 3, 1, 9, 15, 0).unwrap().timestamp();
    Mock::given(method("GET"))
        .and(path("/api/v1/memo"))
        .and(header("authorization", "Bearer tok-e2e"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([
            {"content": "standup went fine", "createdTs": created, "resourceList": []}
        ])))
        .mount(&server)
        .await;

    let temp = TempDir::new().unwrap();
    let vault = temp.path().join("vault");
    write_vault(&vault);

    let endpoint = format!("{}/api/v1/memo", server.uri());
    let vault_root = vault.display().to_string();
    let temp = tokio::task::spawn_blocking(move || {
        set(&temp, "endpoint", &endpoint);
        set(&temp, "access_token", "tok-e2e");
        set(&temp, "heading_title", "Journal");
        set(&temp, "vault_root", &vault_root);
        set(&temp, "journal_folder", "Daily");
        set(&temp, "template_path", "Templates/day.md");

        cmd(&temp)
            .arg("sync")
            .assert()
            .success()
            .stdout(predicate::str::contains("\"outcome\":\"completed\""));

        cmd(&temp)
            .arg("status")
            .assert()
            .success()
            .stdout(predicate::str::contains("\"outcome\":\"completed\""))
            .stdout(predicate::str::contains("\"cursor\":null").not());
        temp
    })
    .await
    .unwrap();

    let note = fs::read_to_string(temp.path().join("vault/Daily/2024-03-01.md")).unwrap();
    assert_eq!(note, "# Journal\n- 09:15 standup went fine\n\n## Tasks\n");
}
