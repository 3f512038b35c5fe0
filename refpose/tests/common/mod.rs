// NOTE: not every test uses everything in here
#![allow(unused)]

use std::path::PathBuf;
use std::process::Stdio;
use std::sync::Once;

pub const TEST_VIDEO_FRAMES: u64 = 250;
pub const TEST_VIDEO_RATE: f64 = 25.0;

/// The tmpdir cargo hands to integration tests
pub fn cargo_tmpdir() -> PathBuf {
    PathBuf::from(option_env!("CARGO_TARGET_TMPDIR").expect("cargo did not set a tmpdir"))
}

/// A 10 second test pattern at 25 fps, created once per test run. The codec
/// is mpeg4 since every ffmpeg build can both write and read that one.
pub fn create_test_video() -> PathBuf {
    let video = cargo_tmpdir().join("testvideo.mp4");

    static ONCE: Once = Once::new();
    ONCE.call_once(|| {
        std::fs::remove_file(&video).ok();
        std::process::Command::new("ffmpeg")
            .args([
                "-f",
                "lavfi",
                "-i",
                "testsrc=duration=10:rate=25",
                "-c:v",
                "mpeg4",
                video.as_os_str().to_str().expect("a plain ascii path"),
            ])
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .stdin(Stdio::null())
            .status()
            .expect("could not run the ffmpeg executable");
    });

    video
}
