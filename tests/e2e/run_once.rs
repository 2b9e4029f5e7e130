//! `tagsync run --once` against a temporary volume.

use tempfile::TempDir;

use crate::commands::{stdout_json, tagsync};
use crate::common::fixtures::{NowPlayingFile, TestVolume, write_settings};

const SETTINGS: &str = r#"
mode = "dominant"

[render]
show_text = false
"#;

#[test]
fn run_once_writes_volume() {
    let home = TempDir::new().unwrap();
    let settings = write_settings(home.path(), SETTINGS);
    let volume = TestVolume::new();
    let now = NowPlayingFile::new();
    now.write("t1", "Song", [0, 200, 0], true);

    let output = tagsync(&home)
        .arg("--config")
        .arg(&settings)
        .args(["-f", "json", "run", "--once", "--volume"])
        .arg(volume.path())
        .arg("--now-playing")
        .arg(now.path())
        .output()
        .unwrap();
    assert!(
        output.status.success(),
        "stderr: {}",
        String::from_utf8_lossy(&output.stderr)
    );

    let report = stdout_json(&output);
    assert_eq!(report["outcome"], "written");
    assert_eq!(report["color"], "#00C800");
    assert_eq!(report["state"]["track_id"], "t1");
    assert_eq!(report["stats"]["writes"], 1);

    assert_eq!(volume.config()["solid_color"]["color"], "00C800");
    assert_eq!(volume.image("current_track_image.png").dimensions(), (240, 280));
}

#[test]
fn run_once_reports_unmounted_volume() {
    let home = TempDir::new().unwrap();
    let settings = write_settings(home.path(), SETTINGS);
    let now = NowPlayingFile::new();
    now.write("t1", "Song", [0, 200, 0], true);

    let output = tagsync(&home)
        .arg("--config")
        .arg(&settings)
        .args(["-f", "json", "run", "--once", "--volume"])
        .arg(home.path().join("unmounted"))
        .arg("--now-playing")
        .arg(now.path())
        .output()
        .unwrap();
    assert!(output.status.success());

    let report = stdout_json(&output);
    assert_eq!(report["outcome"], "write_failed");
    assert!(report["error"].as_str().unwrap().contains("not mounted"));
    assert_eq!(report["stats"]["failures"], 1);
}

#[test]
fn run_without_volume_fails() {
    let home = TempDir::new().unwrap();
    let now = NowPlayingFile::new();
    now.write("t1", "Song", [0, 200, 0], true);

    tagsync(&home)
        .args(["run", "--once", "--now-playing"])
        .arg(now.path())
        .assert()
        .failure();
}
