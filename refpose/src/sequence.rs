use std::num::NonZeroU32;
use std::path::{Path, PathBuf};
use std::time::Instant;

use color_eyre::eyre::{self, Context};
use image::RgbImage;

use crate::pose::detector::PoseDetector;
use crate::pose::landmark::{FramePose, Sequence};
use crate::sampler::{timestamp_ms, SamplePlan, SampleWindow, Verdict};

/// A video opened for reading its frames front to back.
pub trait FrameSource {
    fn frame_rate(&self) -> f64;

    /// How many frames the video claims to have. An estimate, the stream may
    /// end earlier or later than this.
    fn total_frames(&self) -> u64;

    /// The next frame, or `None` when the video ends.
    fn next_frame(&mut self) -> eyre::Result<Option<RgbImage>>;
}

/// Walk the video once and find a pose in every frame the plan keeps. Frames
/// where no whole body is found are left out, so the result can be shorter
/// than planned, or even empty.
pub fn extract_sequence(
    source: &mut dyn FrameSource,
    detector: &mut dyn PoseDetector,
    window: SampleWindow,
    stride: NonZeroU32,
) -> eyre::Result<Sequence> {
    let fps = source.frame_rate();
    let plan = SamplePlan::new(source.total_frames(), fps, window, stride);
    log::debug!("Sampling {} at {} fps", plan, fps);

    let mut sequence = Sequence::new();
    let mut index: u64 = 0;
    loop {
        match plan.verdict(index) {
            Verdict::Done => break,
            verdict => {
                let Some(frame) = source
                    .next_frame()
                    .wrap_err_with(|| format!("Failed to read frame {index}"))?
                else {
                    break;
                };

                if verdict == Verdict::Keep {
                    let timestamp = timestamp_ms(index, fps);
                    match detector
                        .detect(&frame, timestamp)
                        .wrap_err_with(|| format!("Failed to detect in frame {index}"))?
                        .and_then(FramePose::from_landmarks)
                    {
                        Some(pose) => sequence.push(pose),
                        None => log::debug!("No whole pose in frame {index}"),
                    }
                }
            }
        }
        index += 1;
    }

    let planned = plan.planned_frames();
    if (sequence.len() as u64) < planned {
        log::debug!(
            "Kept {} of the {} planned frames",
            sequence.len(),
            planned
        );
    }
    Ok(sequence)
}

/// Extract one sequence per video with `extract_one`, skipping the ones that
/// fail or come out empty. Returns the kept sequences in input order and how
/// many videos were skipped.
pub fn collect_sequences<F>(videos: &[PathBuf], mut extract_one: F) -> (Vec<Sequence>, usize)
where
    F: FnMut(&Path) -> eyre::Result<Sequence>,
{
    let total = videos.len();
    let mut sequences = Vec::new();
    let mut skipped = 0;

    for (i, video) in videos.iter().enumerate() {
        let name = video
            .file_name()
            .unwrap_or(video.as_os_str())
            .to_string_lossy();

        let before = Instant::now();
        let extracted = extract_one(video);
        log::debug!(
            "It took {} to process '{}'",
            humantime::Duration::from(before.elapsed()),
            name
        );

        match extracted {
            Err(e) => {
                log::warn!("[{}/{}] Skipping '{}': {:?}", i + 1, total, name, e);
                skipped += 1;
            }
            Ok(sequence) if sequence.is_empty() => {
                log::warn!("[{}/{}] Skipping '{}': no poses found", i + 1, total, name);
                skipped += 1;
            }
            Ok(sequence) => {
                log::info!(
                    "[{}/{}] '{}': {} frames with a pose",
                    i + 1,
                    total,
                    name,
                    sequence.len()
                );
                sequences.push(sequence);
            }
        }
    }

    (sequences, skipped)
}
