use std::fmt;
use std::num::NonZeroU32;

/// Optional time window, in seconds, restricting which part of a video is
/// sampled. Values outside the video, inverted or otherwise nonsensical are
/// clamped to something valid instead of rejected; garbage in, the nearest
/// sensible range out.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct SampleWindow {
    pub start_sec: Option<f64>,
    pub end_sec: Option<f64>,
}

/// What to do with one frame index while walking a video front to back.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    /// Not yet inside the window, decode and discard.
    Before,
    /// Inside the window and on the stride grid, process it.
    Keep,
    /// Inside the window but off the stride grid.
    Skip,
    /// Past the window, stop walking.
    Done,
}

/// The closed frame-index range to scan and the stride to keep within it,
/// computed once per video from its metadata.
///
/// `start_frame` is `floor(start_sec * fps)` clamped to `[0, total]`,
/// `end_frame` is `floor(end_sec * fps)` clamped to `[start_frame, total]`,
/// so `start_frame <= end_frame` holds for any input. Within the range,
/// every `stride`:th frame counted from `start_frame` is kept. The range is
/// inclusive at both ends.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SamplePlan {
    start_frame: u64,
    end_frame: u64,
    total_frames: u64,
    stride: u32,
}

impl SamplePlan {
    pub fn new(
        total_frames: u64,
        fps: f64,
        window: SampleWindow,
        stride: NonZeroU32,
    ) -> Self {
        let start_frame = match window.start_sec {
            Some(sec) => frame_index(sec, fps).min(total_frames),
            None => 0,
        };
        let end_frame = match window.end_sec {
            Some(sec) => frame_index(sec, fps).clamp(start_frame, total_frames),
            None => total_frames,
        };

        Self {
            start_frame,
            end_frame,
            total_frames,
            stride: stride.get(),
        }
    }

    /// Judge one frame index. Indices must be fed in increasing order from 0
    /// for the verdicts to describe a single front-to-back walk.
    pub fn verdict(&self, index: u64) -> Verdict {
        if index > self.end_frame {
            Verdict::Done
        } else if index < self.start_frame {
            Verdict::Before
        } else if (index - self.start_frame) % u64::from(self.stride) == 0 {
            Verdict::Keep
        } else {
            Verdict::Skip
        }
    }

    /// How many frames the walk will keep, assuming all `total_frames` frames
    /// actually decode. Zero when the window lies beyond the video.
    pub fn planned_frames(&self) -> u64 {
        let Some(last_index) = self.total_frames.checked_sub(1) else {
            return 0;
        };
        let last = self.end_frame.min(last_index);
        match last.checked_sub(self.start_frame) {
            None => 0,
            Some(len) => (len + 1).div_ceil(u64::from(self.stride)),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.planned_frames() == 0
    }

    pub fn start_frame(&self) -> u64 {
        self.start_frame
    }

    pub fn end_frame(&self) -> u64 {
        self.end_frame
    }

    pub fn stride(&self) -> u32 {
        self.stride
    }
}

impl fmt::Display for SamplePlan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "frames [{}, {}] of {}, every {}:th",
            self.start_frame, self.end_frame, self.total_frames, self.stride
        )
    }
}

/// The frame a point in time falls on. Negative times land on frame 0.
fn frame_index(sec: f64, fps: f64) -> u64 {
    // NOTE: the cast saturates, so negative values and NaN become 0
    (sec * fps).floor() as u64
}

/// Millisecond timestamp of a frame, `round(1000 * index / fps)`. Strictly
/// increasing over indices for any frame rate up to 1000 fps, which is what
/// time-ordered detectors require.
pub fn timestamp_ms(index: u64, fps: f64) -> i64 {
    (1000.0 * index as f64 / fps).round() as i64
}

#[cfg(test)]
mod test {
    use super::*;

    fn stride(n: u32) -> NonZeroU32 {
        NonZeroU32::new(n).unwrap()
    }

    fn window(start: impl Into<Option<f64>>, end: impl Into<Option<f64>>) -> SampleWindow {
        SampleWindow {
            start_sec: start.into(),
            end_sec: end.into(),
        }
    }

    fn kept_indices(plan: &SamplePlan, decodable: u64) -> Vec<u64> {
        let mut kept = Vec::new();
        for index in 0..decodable {
            match plan.verdict(index) {
                Verdict::Done => break,
                Verdict::Keep => kept.push(index),
                Verdict::Before | Verdict::Skip => (),
            }
        }
        kept
    }

    #[test]
    fn no_window_covers_the_whole_video() {
        let plan = SamplePlan::new(250, 25.0, SampleWindow::default(), stride(1));
        assert_eq!(0, plan.start_frame());
        assert_eq!(250, plan.end_frame());
        assert_eq!(250, plan.planned_frames());
        assert_eq!(250, kept_indices(&plan, 250).len());
    }

    #[test]
    fn start_and_end_clamp_to_something_valid() {
        // inverted window collapses onto the start frame
        let plan = SamplePlan::new(100, 10.0, window(8.0, 2.0), stride(1));
        assert!(plan.start_frame() <= plan.end_frame());
        assert_eq!((80, 80), (plan.start_frame(), plan.end_frame()));
        assert_eq!(1, plan.planned_frames());

        // start way past the end of the video
        let plan = SamplePlan::new(100, 10.0, window(50.0, None), stride(1));
        assert_eq!((100, 100), (plan.start_frame(), plan.end_frame()));
        assert_eq!(0, plan.planned_frames());
        assert!(plan.is_empty());
        assert!(kept_indices(&plan, 100).is_empty());

        // negative start is frame 0
        let plan = SamplePlan::new(100, 10.0, window(-3.0, None), stride(1));
        assert_eq!(0, plan.start_frame());

        // end beyond the video is the video
        let plan = SamplePlan::new(100, 10.0, window(None, 1e9), stride(1));
        assert_eq!(100, plan.end_frame());
    }

    #[test]
    fn empty_video_keeps_nothing() {
        let plan = SamplePlan::new(0, 30.0, SampleWindow::default(), stride(1));
        assert_eq!(0, plan.planned_frames());
        assert!(plan.is_empty());
    }

    #[test]
    fn stride_keeps_every_nth_from_the_start_frame() {
        let plan = SamplePlan::new(10, 1.0, window(5.0, None), stride(2));
        assert_eq!(vec![5, 7, 9], kept_indices(&plan, 10));
    }

    #[test]
    fn kept_count_is_length_over_stride_rounded_up() {
        for (total, n, expected) in [
            (10, 1, 10),
            (10, 2, 5),
            (10, 3, 4),
            (10, 10, 1),
            (10, 100, 1),
            (9, 3, 3),
            (1, 3, 1),
        ] {
            let plan = SamplePlan::new(total, 30.0, SampleWindow::default(), stride(n));
            assert_eq!(
                expected,
                plan.planned_frames(),
                "total={total} stride={n}"
            );
            assert_eq!(
                expected,
                kept_indices(&plan, total).len() as u64,
                "total={total} stride={n}"
            );
        }
    }

    #[test]
    fn half_second_window_at_ten_fps() {
        let plan = SamplePlan::new(10, 10.0, window(0.5, 0.8), stride(1));
        assert_eq!(vec![5, 6, 7, 8], kept_indices(&plan, 10));
        assert_eq!(4, plan.planned_frames());
    }

    #[test]
    fn timestamps_round_to_the_nearest_millisecond() {
        assert_eq!(0, timestamp_ms(0, 30.0));
        assert_eq!(33, timestamp_ms(1, 30.0));
        assert_eq!(67, timestamp_ms(2, 30.0));
        assert_eq!(100, timestamp_ms(3, 30.0));
        assert_eq!(1000, timestamp_ms(30, 30.0));
    }

    #[test]
    fn timestamps_increase_strictly() {
        for fps in [10.0, 24.0, 29.97, 30.0, 60.0, 120.0] {
            let mut prev = -1;
            for index in 0..1000 {
                let ts = timestamp_ms(index, fps);
                assert!(ts > prev, "fps={fps} index={index}");
                prev = ts;
            }
        }
    }
}
