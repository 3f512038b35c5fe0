mod common;

use std::num::NonZeroU32;

use common::{create_test_video, TEST_VIDEO_FRAMES, TEST_VIDEO_RATE};
use refpose::{
    sampler::{SamplePlan, SampleWindow, Verdict},
    video::{self, VideoFrames},
};

#[test]
fn reports_the_frame_rate_and_frame_count() -> video::Result<()> {
    let mut frames = VideoFrames::new(create_test_video())?;

    assert!((frames.frame_rate() - TEST_VIDEO_RATE).abs() < 0.01);
    assert_eq!(TEST_VIDEO_FRAMES, frames.total_frames());

    let mut decoded = 0;
    while frames.read_frame()?.is_some() {
        decoded += 1;
    }
    assert_eq!(TEST_VIDEO_FRAMES, decoded);

    // still at the end
    assert!(frames.read_frame()?.is_none());
    Ok(())
}

#[test]
fn frames_keep_the_video_dimensions() -> video::Result<()> {
    let mut frames = VideoFrames::new(create_test_video())?;
    let img = frames.read_frame()?.expect("the video is not empty");
    // the default testsrc size
    assert_eq!((320, 240), img.dimensions());
    Ok(())
}

#[test]
fn a_walk_keeps_as_many_frames_as_planned() -> video::Result<()> {
    let mut frames = VideoFrames::new(create_test_video())?;
    let window = SampleWindow {
        start_sec: Some(2.0),
        end_sec: Some(4.0),
    };
    let stride = NonZeroU32::new(5).unwrap();
    let plan = SamplePlan::new(frames.total_frames(), frames.frame_rate(), window, stride);

    let mut kept = 0;
    let mut index: u64 = 0;
    loop {
        match plan.verdict(index) {
            Verdict::Done => break,
            verdict => {
                if frames.read_frame()?.is_none() {
                    break;
                }
                if verdict == Verdict::Keep {
                    kept += 1;
                }
            }
        }
        index += 1;
    }

    assert_eq!(plan.planned_frames(), kept);
    // frames [50, 100] every 5:th
    assert_eq!(11, kept);
    Ok(())
}

#[test]
fn opening_a_missing_file_fails() {
    let missing = common::cargo_tmpdir().join("does-not-exist.mp4");
    assert!(VideoFrames::new(missing).is_err());
}
