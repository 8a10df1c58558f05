#![allow(deprecated)]
//! Exit-code and output contract of the `sundai` binary.

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use std::path::Path;
use tempfile::tempdir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn sundai(cache_dir: &Path) -> Command {
    let mut cmd = Command::cargo_bin("sundai").unwrap();
    cmd.env_remove("SUNDAI_CONFIG")
        .env_remove("SUNDAI_SCOPE")
        .env_remove("SUNDAI_CACHE_VERSION")
        .env("RUST_LOG", "warn")
        .arg("--cache-dir")
        .arg(cache_dir);
    cmd
}

fn write_config(dir: &Path, scope: &str, version: &str) -> std::path::PathBuf {
    let config_path = dir.join("sundai.yaml");
    fs::write(
        &config_path,
        format!(
            "version: {version}\nscope: \"{scope}\"\nmanifest: [\"./\", \"./index.html\", \"./a.json\"]\n"
        ),
    )
    .unwrap();
    config_path
}

#[test]
fn test_offline_fetch_of_uncached_asset_exits_with_network_code() {
    let dir = tempdir().unwrap();

    sundai(&dir.path().join("caches"))
        .args(["fetch", "./b.json", "--offline"])
        .assert()
        .code(5)
        .stderr(predicate::str::contains("network error"));
}

#[test]
fn test_stores_json_on_empty_cache() {
    let dir = tempdir().unwrap();

    sundai(&dir.path().join("caches"))
        .args(["stores", "--json"])
        .assert()
        .success()
        .stdout(predicate::str::contains("[]"));
}

#[test]
fn test_config_without_shell_in_manifest_is_rejected() {
    let dir = tempdir().unwrap();
    let config_path = dir.path().join("bad.yaml");
    fs::write(&config_path, "manifest: [\"./\", \"./a.json\"]\n").unwrap();

    sundai(&dir.path().join("caches"))
        .arg("--config")
        .arg(&config_path)
        .args(["prune", "--keep", "current"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("not in the asset manifest"));
}

#[test]
fn test_invalid_retention_is_a_usage_error() {
    let dir = tempdir().unwrap();

    sundai(&dir.path().join("caches"))
        .args(["prune", "--keep", "sometimes"])
        .assert()
        .code(2);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_install_then_offline_fetch_and_prune() {
    let server = MockServer::start().await;
    for (asset, body) in [
        ("/mint/", "<html>root</html>"),
        ("/mint/index.html", "<html>shell</html>"),
        ("/mint/a.json", "{\"a\":1}"),
    ] {
        Mock::given(method("GET"))
            .and(path(asset))
            .respond_with(ResponseTemplate::new(200).set_body_string(body))
            .mount(&server)
            .await;
    }

    let dir = tempdir().unwrap();
    let root = dir.path().to_path_buf();
    let scope = format!("{}/mint/", server.uri());

    // The binary blocks; keep the mock server's runtime free to answer.
    tokio::task::spawn_blocking(move || {
        let caches = root.join("caches");
        let v5 = write_config(&root, &scope, "v5");

        sundai(&caches)
            .arg("--config")
            .arg(&v5)
            .arg("install")
            .assert()
            .success()
            .stdout(predicate::str::contains("installed sundai-v5 (3 entries)"));

        let v6 = write_config(&root, &scope, "v6");
        sundai(&caches)
            .arg("--config")
            .arg(&v6)
            .arg("install")
            .assert()
            .success()
            .stdout(predicate::str::contains("activated sundai-v6"));

        sundai(&caches)
            .arg("--config")
            .arg(&v6)
            .args(["fetch", "/mint/positions", "--navigate", "--offline"])
            .assert()
            .success()
            .stdout("<html>shell</html>");

        sundai(&caches)
            .arg("--config")
            .arg(&v6)
            .args(["stores"])
            .assert()
            .success()
            .stdout(predicate::str::contains("* sundai-v6"));

        sundai(&caches)
            .arg("--config")
            .arg(&v6)
            .args(["prune", "--keep", "current"])
            .assert()
            .success()
            .stdout("pruned sundai-v5\n");
    })
    .await
    .unwrap();
}
