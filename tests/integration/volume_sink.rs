//! The full loop against a temporary BusyTag volume.

use tagsync::color::Rgb;
use tagsync::device::{CONFIG_FILE_NAME, DeviceSink, DeviceUpdate, VolumeSink};
use tagsync::render::ArtworkCompositor;
use tagsync::source::FileSource;
use tagsync::sync::{SyncLoop, SyncSettings, TickOutcome};

use crate::common::fixtures::{NowPlayingFile, TestVolume, solid};
use crate::common::init_test_logging;

const IMAGE: &str = "current_track_image.png";

#[tokio::test]
async fn file_source_to_volume() {
    init_test_logging();
    let volume = TestVolume::new();
    let now = NowPlayingFile::new();
    now.write("t1", "Song", [255, 0, 0], true);

    let sink = VolumeSink::new(volume.path(), IMAGE).paused_led_bits(0);
    let mut sync = SyncLoop::new(
        FileSource::new(now.path()),
        ArtworkCompositor::default(),
        sink,
        SyncSettings::default(),
    );

    assert!(matches!(sync.tick().await.unwrap(), TickOutcome::Written { .. }));
    let config = volume.config();
    assert_eq!(config["image"], IMAGE);
    assert_eq!(config["solid_color"]["color"], "FF0000");
    assert_eq!(config["solid_color"]["led_bits"], 127);

    let image = volume.image(IMAGE);
    assert_eq!(image.dimensions(), (240, 280));
    assert_eq!(image.get_pixel(120, 100).0, [255, 0, 0, 255]);

    // Pause: LEDs switch to the paused mask.
    now.write("t1", "Song", [255, 0, 0], false);
    assert!(matches!(sync.tick().await.unwrap(), TickOutcome::Written { .. }));
    assert_eq!(volume.config()["solid_color"]["led_bits"], 0);

    // Nothing playing any more: keep the last color.
    std::fs::remove_file(now.path()).unwrap();
    let outcome = sync.tick().await.unwrap();
    assert!(matches!(outcome, TickOutcome::Written { color } if color == Rgb::new(255, 0, 0)));
}

#[tokio::test]
async fn unmounted_volume_fails_then_recovers() {
    init_test_logging();
    let volume = TestVolume::new();
    let mount = volume.path().join("BUSYTAG");
    let now = NowPlayingFile::new();
    now.write("t1", "Song", [0, 0, 255], true);

    let mut sync = SyncLoop::new(
        FileSource::new(now.path()),
        ArtworkCompositor::default(),
        VolumeSink::new(&mount, IMAGE),
        SyncSettings::default(),
    );

    assert!(matches!(sync.tick().await.unwrap(), TickOutcome::WriteFailed(_)));
    assert!(sync.state().is_empty());

    std::fs::create_dir(&mount).unwrap();
    assert!(matches!(sync.tick().await.unwrap(), TickOutcome::Written { .. }));
    assert!(mount.join(CONFIG_FILE_NAME).exists());
}

#[tokio::test]
async fn existing_config_keys_survive() {
    let volume = TestVolume::new();
    std::fs::write(
        volume.path().join(CONFIG_FILE_NAME),
        r#"{"version":3,"disp_brightness":30,"activate_pattern":false}"#,
    )
    .unwrap();

    let img = solid([1, 2, 3], 4);
    let mut sink = VolumeSink::new(volume.path(), IMAGE);
    sink.write(&DeviceUpdate {
        image: &img,
        led_bits: 127,
        hex_color: "010203",
        is_playing: true,
    })
    .await
    .unwrap();

    let config = volume.config();
    assert_eq!(config["disp_brightness"], 30);
    assert_eq!(config["activate_pattern"], false);
    assert_eq!(config["solid_color"]["color"], "010203");
}
