//! Extract, config, init, version and completions.

use assert_cmd::Command;
use predicates::prelude::*;
use regex::Regex;
use serde_json::Value;
use tempfile::TempDir;

use crate::common::fixtures::{solid, split};

/// The binary with an isolated home and no inherited tagsync variables.
pub fn tagsync(home: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("tagsync").expect("binary not built");
    cmd.env("HOME", home.path())
        .env("XDG_CONFIG_HOME", home.path().join(".config"))
        .env("RUST_LOG", "off");
    for var in [
        "TAGSYNC_MODE",
        "TAGSYNC_VOLUME",
        "TAGSYNC_SOURCE",
        "TAGSYNC_CONFIG",
        "TAGSYNC_FORMAT",
        "TAGSYNC_LOG_FORMAT",
        "NO_COLOR",
    ] {
        cmd.env_remove(var);
    }
    cmd
}

pub fn stdout_json(output: &std::process::Output) -> Value {
    let text = String::from_utf8_lossy(&output.stdout);
    serde_json::from_str(text.trim()).unwrap_or_else(|_| panic!("Failed to parse JSON:\n{text}"))
}

#[test]
fn version_json() {
    let home = TempDir::new().unwrap();
    let output = tagsync(&home).args(["--format", "json", "version"]).output().unwrap();
    assert!(output.status.success());

    let json = stdout_json(&output);
    assert_eq!(json["name"], "tagsync");
    assert_eq!(json["version"], env!("CARGO_PKG_VERSION"));
    assert_eq!(json["modes"].as_array().map(Vec::len), Some(4));
}

#[test]
fn quick_start_without_command() {
    let home = TempDir::new().unwrap();
    tagsync(&home)
        .assert()
        .success()
        .stdout(predicate::str::contains("tagsync"));
}

#[test]
fn extract_prints_hex() {
    let home = TempDir::new().unwrap();
    let image = home.path().join("art.png");
    solid([0, 128, 255], 32).save(&image).unwrap();

    let output = tagsync(&home)
        .args(["extract", "--mode", "dominant"])
        .arg(&image)
        .output()
        .unwrap();
    assert!(output.status.success());

    let stdout = String::from_utf8_lossy(&output.stdout);
    let line = stdout.trim();
    assert!(Regex::new("^#[0-9A-F]{6}$").unwrap().is_match(line), "got {line:?}");
    assert_eq!(line, "#0080FF");
}

#[test]
fn extract_all_json() {
    let home = TempDir::new().unwrap();
    let image = home.path().join("split.png");
    split([200, 30, 30], [20, 20, 20], 0.3).save(&image).unwrap();

    let output = tagsync(&home)
        .args(["-f", "json", "extract", "--all"])
        .arg(&image)
        .output()
        .unwrap();
    assert!(output.status.success());

    let json = stdout_json(&output);
    assert_eq!(json["modes"].as_array().map(Vec::len), Some(4));
    assert_eq!(json["led_pattern"].as_array().map(Vec::len), Some(4));
    let analogous = json["analogous"].as_array().unwrap();
    assert_eq!(analogous.len(), 2);
    assert_ne!(analogous[0], analogous[1]);
    assert!(!json["candidates"].as_array().unwrap().is_empty());
}

#[test]
fn extract_missing_image_fails() {
    let home = TempDir::new().unwrap();
    tagsync(&home)
        .args(["extract", "--mode", "vibrant", "/no/such/image.png"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Error"));
}

#[test]
fn unknown_mode_rejected() {
    let home = TempDir::new().unwrap();
    tagsync(&home)
        .args(["extract", "--mode", "neon", "a.png"])
        .assert()
        .failure();
}

#[test]
fn invalid_mode_from_env_rejected() {
    let home = TempDir::new().unwrap();
    tagsync(&home)
        .env("TAGSYNC_MODE", "rainbow")
        .args(["config"])
        .assert()
        .failure();
}

#[test]
fn init_then_config() {
    let home = TempDir::new().unwrap();
    let path = home.path().join("tagsync.toml");

    tagsync(&home)
        .arg("--config")
        .arg(&path)
        .args(["init", "--volume", "/mnt/busytag"])
        .assert()
        .success();
    assert!(path.exists());

    let output = tagsync(&home)
        .arg("--config")
        .arg(&path)
        .args(["-f", "json", "config"])
        .output()
        .unwrap();
    assert!(output.status.success());
    let json = stdout_json(&output);
    assert_eq!(json["from_file"], true);
    assert_eq!(json["settings"]["device"]["volume"], "/mnt/busytag");
    assert_eq!(json["settings"]["mode"], "vibrant");

    // A second init must not clobber the file.
    tagsync(&home)
        .arg("--config")
        .arg(&path)
        .arg("init")
        .assert()
        .failure()
        .stderr(predicate::str::contains("--force"));

    tagsync(&home)
        .arg("--config")
        .arg(&path)
        .args(["init", "--force"])
        .assert()
        .success();
}

#[test]
fn config_path_default_location() {
    let home = TempDir::new().unwrap();
    let output = tagsync(&home)
        .args(["-f", "json", "config", "--path"])
        .output()
        .unwrap();
    assert!(output.status.success());

    let json = stdout_json(&output);
    assert_eq!(json["exists"], false);
    assert!(json["path"].as_str().unwrap().ends_with("config.toml"));
}

#[test]
fn missing_explicit_config_is_json_error() {
    let home = TempDir::new().unwrap();
    let output = tagsync(&home)
        .args(["-f", "json", "--config", "/no/such/config.toml", "config"])
        .output()
        .unwrap();
    assert!(!output.status.success());

    let stderr = String::from_utf8_lossy(&output.stderr);
    let json: Value = serde_json::from_str(stderr.trim().lines().last().unwrap()).unwrap();
    assert_eq!(json["error"], true);
    assert_eq!(json["suggestion"], "Run: tagsync init");
}

#[test]
fn completions_bash() {
    let home = TempDir::new().unwrap();
    tagsync(&home)
        .args(["completions", "bash"])
        .assert()
        .success()
        .stdout(predicate::str::contains("tagsync"));
}
